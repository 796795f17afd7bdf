//! The node driver: a single-threaded loop over an ordered message queue.
//!
//! Inbound blocks and attestations and the slot tick all arrive as
//! `Message`s and are processed strictly in order, so two nodes fed the same
//! message log observe the same states. Recoverable fork-choice errors
//! become pipeline waiting states; everything else is counted and dropped
//! without telling the sender why.

use beacon_fork_choice::{Error as ForkChoiceError, Store};
use helper_functions::beacon_state_accessors::get_current_epoch;
use helper_functions::crypto::hash_tree_root;
use log::{debug, info};
use types::beacon_state::BeaconState;
use types::config::Config;
use types::primitives::{Epoch, Slot, Version, H256};
use types::tree_hash_cache::BeaconTreeHashCache;
use types::types::{Attestation, BeaconBlock, Checkpoint};

use crate::attestation_pool::AttestationPool;
use crate::pipeline::{BlockPipeline, BlockStage};
use crate::storage::{ChainStorage, MemoryStore, StorageError};

/// Exit codes of the pipeline driver.
pub const EXIT_OK: i32 = 0;
pub const EXIT_TRANSITION_FAILURE: i32 = 2;
pub const EXIT_STORAGE_CORRUPTION: i32 = 3;
pub const EXIT_CONFIG_ERROR: i32 = 4;

#[derive(Debug)]
pub enum Message<C: Config> {
    Block(BeaconBlock<C>),
    Attestation(Attestation<C>),
    Tick(Slot),
}

/// A snapshot of the node's view, published to external consumers.
#[derive(Debug, PartialEq, Clone)]
pub struct Status {
    pub fork_version: Version,
    pub finalized_root: H256,
    pub finalized_epoch: Epoch,
    pub head_root: H256,
    pub head_slot: Slot,
}

/// A fatal condition: the driver terminates with the matching exit code.
#[derive(Debug)]
pub enum Fatal {
    Storage(StorageError),
}

impl Fatal {
    pub fn exit_code(&self) -> i32 {
        match self {
            Fatal::Storage(StorageError::Corrupt { .. }) => EXIT_STORAGE_CORRUPTION,
            Fatal::Storage(StorageError::Backend(_)) => EXIT_STORAGE_CORRUPTION,
        }
    }
}

pub struct Node<C: Config> {
    store: Store<C>,
    chain: ChainStorage<C, MemoryStore>,
    pipeline: BlockPipeline<C>,
    pool: AttestationPool<C>,
    observed_state: BeaconState<C>,
    observed_root: H256,
    // Owned by this node's single task; forks with the observed state.
    tree_hash_cache: BeaconTreeHashCache,
}

impl<C: Config> Node<C> {
    pub fn new(genesis_state: BeaconState<C>) -> Result<Self, Fatal> {
        let genesis_block = transition_functions::genesis::genesis_block(&genesis_state);
        let genesis_root = genesis_block.canonical_root();

        let mut chain = ChainStorage::new(MemoryStore::new());
        chain
            .put_block(genesis_root, &genesis_block)
            .map_err(Fatal::Storage)?;

        let store = Store::new(genesis_state.clone(), genesis_block);

        let mut node = Self {
            store,
            chain,
            pipeline: BlockPipeline::new(),
            pool: AttestationPool::new(),
            observed_state: genesis_state,
            observed_root: H256::zero(),
            tree_hash_cache: BeaconTreeHashCache::new::<C>(),
        };
        node.observed_root = node.observe_state_root();
        Ok(node)
    }

    /// The state of the current head as of the last applied message.
    /// External consumers receive this immutable snapshot only.
    pub fn observed_state(&self) -> &BeaconState<C> {
        &self.observed_state
    }

    pub fn block(&self, root: H256) -> Result<Option<BeaconBlock<C>>, Fatal> {
        self.chain.block(root).map_err(Fatal::Storage)
    }

    pub fn blocks_at_slot(&self, slot: Slot) -> Result<Vec<H256>, Fatal> {
        self.chain.block_roots_at_slot(slot).map_err(Fatal::Storage)
    }

    pub fn head(&self) -> H256 {
        self.store.head()
    }

    pub fn status(&self) -> Status {
        let head_state = self.observed_state();
        let Checkpoint { epoch, root } = head_state.finalized_checkpoint;
        Status {
            fork_version: head_state.fork.current_version,
            finalized_root: root,
            finalized_epoch: epoch,
            head_root: self.observed_root,
            head_slot: head_state.slot,
        }
    }

    /// Attestations for a proposer building on the current head.
    pub fn proposer_attestations(&self) -> Vec<Attestation<C>> {
        self.pool.attestations_for_proposer(self.observed_state())
    }

    pub fn handle_message(&mut self, message: Message<C>) -> Result<(), Fatal> {
        match message {
            Message::Block(block) => self.handle_block(block).map(|_| ()),
            Message::Attestation(attestation) => {
                self.handle_attestation(attestation);
                Ok(())
            }
            Message::Tick(slot) => self.handle_tick(slot),
        }
    }

    /// Moves a queued block through the intake stages and reports where it
    /// ended up.
    fn handle_block(&mut self, block: BeaconBlock<C>) -> Result<BlockStage, Fatal> {
        debug!(
            "block at slot {}: {:?} -> {:?}",
            block.slot,
            BlockStage::Queued,
            BlockStage::Verifying
        );
        match self.store.on_block(block.clone()) {
            Ok(root) => {
                self.on_block_applied(root, block)?;
                Ok(BlockStage::Applied)
            }
            Err(ForkChoiceError::UnknownBlock { .. }) => {
                self.pipeline.wait_for_parent(self.store.slot(), block);
                Ok(BlockStage::WaitingParent)
            }
            Err(ForkChoiceError::FutureSlot { .. }) => {
                self.pipeline.wait_for_slot(block);
                Ok(BlockStage::WaitingPayload)
            }
            Err(error) => {
                // Invalid blocks are dropped without detail; peers must not
                // learn why.
                info!("block rejected: {}", error);
                self.pipeline.record_rejected();
                Ok(BlockStage::Rejected)
            }
        }
    }

    fn on_block_applied(&mut self, root: H256, block: BeaconBlock<C>) -> Result<(), Fatal> {
        self.pipeline.record_applied();
        self.chain.put_block(root, &block).map_err(Fatal::Storage)?;
        self.chain
            .set_checkpoint(self.store.justified_checkpoint())
            .map_err(Fatal::Storage)?;

        // Attestations that were waiting for this block re-enter the flow.
        for attestation in self.pool.take_awaiting(root) {
            self.handle_attestation(attestation);
        }

        // Blocks that were waiting for this parent can be verified now.
        for waiting in self.pipeline.take_waiting_for_parent(root) {
            self.handle_block(waiting)?;
        }

        self.publish_observed_state();
        Ok(())
    }

    fn handle_attestation(&mut self, attestation: Attestation<C>) {
        match self.store.on_attestation(attestation.clone()) {
            Ok(()) => self.pool.insert(attestation),
            Err(ForkChoiceError::UnknownBlock { root }) => {
                self.pool.await_block(root, attestation);
            }
            Err(ForkChoiceError::FutureSlot { .. }) | Err(ForkChoiceError::FutureEpoch { .. }) => {
                // Still usable once its slot arrives; keep it for proposers
                // and the next tick.
                self.pool.insert(attestation);
            }
            Err(error) => {
                info!("attestation rejected: {}", error);
            }
        }
    }

    fn handle_tick(&mut self, slot: Slot) -> Result<(), Fatal> {
        info!("slot {} started", slot);

        if let Err(error) = self.store.on_slot(slot) {
            // A repeated or late tick; nothing to advance.
            info!("tick ignored: {}", error);
            return Ok(());
        }

        self.pool.prune(get_current_epoch(&self.observed_state));

        for block in self.pipeline.take_due(slot) {
            self.handle_block(block)?;
        }

        self.publish_observed_state();
        Ok(())
    }

    fn publish_observed_state(&mut self) {
        self.observed_state = self.store.head_state().clone();
        self.observed_root = self.observe_state_root();
    }

    /// The root of the observed state, recomputed incrementally when the
    /// config enables the cache.
    fn observe_state_root(&mut self) -> H256 {
        if !C::incremental_hasher() {
            return hash_tree_root(&self.observed_state);
        }

        match self.tree_hash_cache.recalculate(&self.observed_state) {
            Ok(root) => root,
            Err(_) => {
                // A head switch can invalidate the cache (registries never
                // shrink on one chain, but they can across forks). Start a
                // fresh cache rather than serving a stale root.
                self.tree_hash_cache = BeaconTreeHashCache::new::<C>();
                self.tree_hash_cache
                    .recalculate(&self.observed_state)
                    .unwrap_or_else(|_| hash_tree_root(&self.observed_state))
            }
        }
    }

    /// Aggregate intake counters (applied, rejected).
    pub fn counters(&self) -> (u64, u64) {
        self.pipeline.counters()
    }
}
