//! The latest-vote-weighted fork choice.
//!
//! The store keeps every accepted block and its post-state, plus the most
//! recent vote of every validator. The head is found by walking the block
//! tree down from the justified block, at each step picking the child with
//! the most attesting stake behind it.
//!
//! Conditions a caller can recover from (a missing parent, an object from a
//! future slot) are dedicated `Error` variants; the node pipeline turns them
//! into waiting states instead of discarding the object.

use core::convert::TryInto as _;
use std::collections::HashMap;

use error_utils::DebugAsError;
use helper_functions::beacon_state_accessors::{
    get_active_validator_indices, get_current_epoch, get_indexed_attestation,
};
use helper_functions::misc::{compute_epoch_at_slot, compute_start_slot_at_epoch};
use helper_functions::predicates::validate_indexed_attestation;
use log::debug;
use maplit::hashmap;
use thiserror::Error as ThisError;
use transition_functions::process_slot;
use types::beacon_state::BeaconState;
use types::config::Config;
use types::primitives::{Epoch, Gwei, Slot, ValidatorIndex, H256};
use types::types::{Attestation, BeaconBlock, Checkpoint};

#[derive(Debug, PartialEq, Clone, ThisError)]
pub enum Error {
    /// Recoverable: the block or attestation references a block the store
    /// has not seen. The caller may retry once the block arrives.
    #[error("block {root:?} is not known to the store")]
    UnknownBlock { root: H256 },
    /// Recoverable: the object belongs to a slot the store has not reached.
    #[error("object at slot {slot} is from the future (store is at {store_slot})")]
    FutureSlot { slot: Slot, store_slot: Slot },
    /// Recoverable: the attestation's epoch has not started.
    #[error("attestation targets epoch {epoch}, which has not started")]
    FutureEpoch { epoch: Epoch },

    #[error("slot {new_slot} is not later than {old_slot}")]
    SlotNotLater { old_slot: Slot, new_slot: Slot },
    #[error("block at slot {block_slot} is not a descendant of the finalized block")]
    NotDescendantOfFinalized { block_slot: Slot },
    #[error("attestation votes for a checkpoint in the wrong epoch")]
    TargetsWrongEpoch,
    #[error("attestation votes for a block from a later slot than the vote itself")]
    VotesForFutureBlock,
    #[error("attestation is invalid: {0}")]
    InvalidAttestation(DebugAsError),
    #[error("block is invalid: {0}")]
    InvalidBlock(transition_functions::Error),
}

/// <https://github.com/ethereum/eth2.0-specs/blob/v0.9.1/specs/core/0_fork-choice.md#latestmessage>
type LatestMessage = Checkpoint;

pub struct Store<C: Config> {
    slot: Slot,
    justified_checkpoint: Checkpoint,
    finalized_checkpoint: Checkpoint,
    best_justified_checkpoint: Checkpoint,
    blocks: HashMap<H256, BeaconBlock<C>>,
    // `blocks` and `block_states` could be combined into a single map.
    // They are kept separate to match the structure of the specification.
    block_states: HashMap<H256, BeaconState<C>>,
    checkpoint_states: HashMap<Checkpoint, BeaconState<C>>,
    latest_messages: HashMap<ValidatorIndex, LatestMessage>,
}

impl<C: Config> Store<C> {
    pub fn new(anchor_state: BeaconState<C>, anchor_block: BeaconBlock<C>) -> Self {
        let epoch = get_current_epoch(&anchor_state);
        let root = anchor_block.canonical_root();
        let checkpoint = Checkpoint { epoch, root };

        Self {
            slot: anchor_state.slot,
            justified_checkpoint: checkpoint,
            finalized_checkpoint: checkpoint,
            best_justified_checkpoint: checkpoint,
            blocks: hashmap! {root => anchor_block},
            block_states: hashmap! {root => anchor_state.clone()},
            checkpoint_states: hashmap! {checkpoint => anchor_state},
            latest_messages: hashmap! {},
        }
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn justified_checkpoint(&self) -> Checkpoint {
        self.justified_checkpoint
    }

    pub fn finalized_checkpoint(&self) -> Checkpoint {
        self.finalized_checkpoint
    }

    pub fn block(&self, root: H256) -> Option<&BeaconBlock<C>> {
        self.blocks.get(&root)
    }

    pub fn block_state(&self, root: H256) -> Option<&BeaconState<C>> {
        self.block_states.get(&root)
    }

    pub fn contains_block(&self, root: H256) -> bool {
        self.blocks.contains_key(&root)
    }

    pub fn head_state(&self) -> &BeaconState<C> {
        &self.block_states[&self.head()]
    }

    /// Advances the store's clock. Unlike `on_tick` in the specification
    /// this is called once per slot; the fork choice does not need a
    /// finer-grained timestamp.
    pub fn on_slot(&mut self, slot: Slot) -> Result<(), Error> {
        if slot <= self.slot {
            return Err(Error::SlotNotLater {
                old_slot: self.slot,
                new_slot: slot,
            });
        }

        self.slot = slot;

        // On epoch boundaries, adopt the best justified checkpoint seen.
        if self.slots_since_epoch_start() == 0
            && self.justified_checkpoint.epoch < self.best_justified_checkpoint.epoch
        {
            self.justified_checkpoint = self.best_justified_checkpoint;
        }

        Ok(())
    }

    /// Validates `block`, computes its post-state and adds both to the
    /// store. Returns the block root.
    pub fn on_block(&mut self, block: BeaconBlock<C>) -> Result<H256, Error> {
        let finalized_slot = Self::start_of_epoch(self.finalized_checkpoint.epoch);

        // Ignore blocks from slots not later than the finalized block. This
        // also accepts the genesis block and redelivered known blocks.
        if block.slot <= finalized_slot {
            return Ok(block.canonical_root());
        }

        if !self.block_states.contains_key(&block.parent_root) {
            return Err(Error::UnknownBlock {
                root: block.parent_root,
            });
        }

        // Blocks cannot be in the future. The pipeline delays them until
        // their slot arrives.
        if self.slot < block.slot {
            return Err(Error::FutureSlot {
                slot: block.slot,
                store_slot: self.slot,
            });
        }

        let block_root = block.canonical_root();

        // The block must descend from the finalized block at the finalized
        // slot.
        let ancestor = self.ancestor_without_lookup(block_root, &block, finalized_slot);
        if ancestor != self.finalized_checkpoint.root {
            return Err(Error::NotDescendantOfFinalized {
                block_slot: block.slot,
            });
        }

        // Compute the post-state on a copy; a failed transition leaves the
        // store untouched.
        let mut state = self.block_states[&block.parent_root].clone();
        process_slot::state_transition(&mut state, &block, true)
            .map_err(Error::InvalidBlock)?;

        let current_justified = state.current_justified_checkpoint;
        let finalized = state.finalized_checkpoint;

        debug!("block {:?} accepted at slot {}", block_root, self.slot);
        self.block_states.insert(block_root, state);
        self.blocks.insert(block_root, block);

        // Update the justified checkpoint.
        if self.justified_checkpoint.epoch < current_justified.epoch {
            if self.best_justified_checkpoint.epoch < current_justified.epoch {
                self.best_justified_checkpoint = current_justified;
            }
            if self.should_update_justified_checkpoint(current_justified) {
                self.justified_checkpoint = current_justified;
            }
        }

        // Update the finalized checkpoint.
        if self.finalized_checkpoint.epoch < finalized.epoch {
            self.finalized_checkpoint = finalized;
            let finalized_slot = Self::start_of_epoch(self.finalized_checkpoint.epoch);

            if self.justified_checkpoint.epoch < current_justified.epoch
                || self.ancestor(self.justified_checkpoint.root, finalized_slot)
                    != self.finalized_checkpoint.root
            {
                self.justified_checkpoint = current_justified;
            }
        }

        Ok(block_root)
    }

    /// Validates `attestation` and records it as the latest vote of each
    /// attesting validator.
    pub fn on_attestation(&mut self, attestation: Attestation<C>) -> Result<(), Error> {
        let target = attestation.data.target;
        let target_epoch_start = Self::start_of_epoch(target.epoch);

        // Attestations must be from the current or previous epoch.
        let current_epoch = Self::epoch_at_slot(self.slot);
        let previous_epoch = current_epoch.saturating_sub(1).max(C::genesis_epoch());
        if target.epoch < previous_epoch {
            // Too old to affect the fork choice; drop silently.
            return Ok(());
        }
        if current_epoch < target.epoch {
            return Err(Error::FutureEpoch {
                epoch: target.epoch,
            });
        }
        if target.epoch != Self::epoch_at_slot(attestation.data.slot) {
            return Err(Error::TargetsWrongEpoch);
        }

        let base_state = match self.block_states.get(&target.root) {
            Some(state) => state,
            None => return Err(Error::UnknownBlock { root: target.root }),
        };
        if self.slot < target_epoch_start {
            return Err(Error::FutureSlot {
                slot: target_epoch_start,
                store_slot: self.slot,
            });
        }

        match self.blocks.get(&attestation.data.beacon_block_root) {
            Some(ghost_vote_block) => {
                if attestation.data.slot < ghost_vote_block.slot {
                    return Err(Error::VotesForFutureBlock);
                }
            }
            None => {
                return Err(Error::UnknownBlock {
                    root: attestation.data.beacon_block_root,
                })
            }
        }

        // Attestations can only affect the fork choice of later slots.
        if self.slot <= attestation.data.slot {
            return Err(Error::FutureSlot {
                slot: attestation.data.slot + 1,
                store_slot: self.slot,
            });
        }

        // Memoize the state at the target checkpoint to validate against,
        // keeping the memo bounded.
        if !self.checkpoint_states.contains_key(&target) {
            let mut state = base_state.clone();
            process_slot::process_slots(&mut state, target_epoch_start)
                .map_err(Error::InvalidBlock)?;

            if self.checkpoint_states.len() >= C::cache_size_entries() {
                let finalized_epoch = self.finalized_checkpoint.epoch;
                let justified = self.justified_checkpoint;
                self.checkpoint_states.retain(|checkpoint, _| {
                    *checkpoint == justified || checkpoint.epoch >= finalized_epoch
                });
            }

            self.checkpoint_states.insert(target, state);
        }
        let checkpoint_state = &self.checkpoint_states[&target];

        let indexed_attestation = get_indexed_attestation(checkpoint_state, &attestation)
            .map_err(|error| Error::InvalidAttestation(DebugAsError::new(error)))?;
        validate_indexed_attestation(checkpoint_state, &indexed_attestation, true)
            .map_err(|error| Error::InvalidAttestation(DebugAsError::new(error)))?;

        let new_message = LatestMessage {
            epoch: target.epoch,
            root: attestation.data.beacon_block_root,
        };
        for index in indexed_attestation.attesting_indices.iter().copied() {
            self.latest_messages
                .entry(index)
                .and_modify(|old_message| {
                    if old_message.epoch < new_message.epoch {
                        *old_message = new_message;
                    }
                })
                .or_insert(new_message);
        }

        Ok(())
    }

    /// The LMD-GHOST head: walk down from the justified block, at each step
    /// taking the child with the most latest-vote stake, ties going to the
    /// lexicographically smallest root.
    pub fn head(&self) -> H256 {
        let justified_root = self.justified_checkpoint.root;
        let justified_slot = self.blocks[&justified_root].slot;

        let mut head = justified_root;
        loop {
            let best_child = self
                .blocks
                .iter()
                .filter(|(_, block)| block.parent_root == head && justified_slot < block.slot)
                .map(|(root, block)| (self.latest_attesting_balance(*root, block), *root))
                .max_by(|(weight_a, root_a), (weight_b, root_b)| {
                    // More weight wins; equal weight goes to the smaller root.
                    weight_a.cmp(weight_b).then_with(|| root_b.cmp(root_a))
                });

            match best_child {
                Some((_, root)) => head = root,
                None => break head,
            }
        }
    }

    /// <https://github.com/ethereum/eth2.0-specs/blob/v0.9.1/specs/core/0_fork-choice.md#get_latest_attesting_balance>
    fn latest_attesting_balance(&self, root: H256, block: &BeaconBlock<C>) -> Gwei {
        let justified_state = &self.checkpoint_states[&self.justified_checkpoint];
        let active_indices = get_active_validator_indices(
            justified_state,
            get_current_epoch(justified_state),
        );

        active_indices
            .into_iter()
            .filter_map(|index| {
                let latest_message = self.latest_messages.get(&index)?;
                if self.ancestor(latest_message.root, block.slot) == root {
                    let index: usize = index
                        .try_into()
                        .expect("validator index should fit in usize");
                    Some(justified_state.validators[index].effective_balance)
                } else {
                    None
                }
            })
            .sum()
    }

    /// <https://github.com/ethereum/eth2.0-specs/blob/v0.9.1/specs/core/0_fork-choice.md#get_ancestor>
    fn ancestor(&self, root: H256, slot: Slot) -> H256 {
        self.ancestor_without_lookup(root, &self.blocks[&root], slot)
    }

    // The extra `block` parameter lets `on_block` query ancestry before the
    // block has been added to the store. The parent must already be present.
    fn ancestor_without_lookup(&self, root: H256, block: &BeaconBlock<C>, slot: Slot) -> H256 {
        let mut root = root;
        let mut block_slot = block.slot;
        let mut parent_root = block.parent_root;

        while slot < block_slot {
            match self.blocks.get(&parent_root) {
                Some(parent) => {
                    root = parent_root;
                    block_slot = parent.slot;
                    parent_root = parent.parent_root;
                }
                None => break,
            }
        }

        root
    }

    /// To address the bouncing attack, only update conflicting justified
    /// checkpoints in the early slots of the epoch.
    fn should_update_justified_checkpoint(&self, new_justified_checkpoint: Checkpoint) -> bool {
        if self.slots_since_epoch_start() < C::safe_slots_to_update_justified() {
            return true;
        }

        let justified_slot = Self::start_of_epoch(self.justified_checkpoint.epoch);
        self.ancestor(new_justified_checkpoint.root, justified_slot)
            == self.justified_checkpoint.root
    }

    fn slots_since_epoch_start(&self) -> Slot {
        self.slot - Self::start_of_epoch(Self::epoch_at_slot(self.slot))
    }

    fn start_of_epoch(epoch: Epoch) -> Slot {
        compute_start_slot_at_epoch::<C>(epoch)
    }

    fn epoch_at_slot(slot: Slot) -> Epoch {
        compute_epoch_at_slot::<C>(slot)
    }
}
