//! The block intake state machine.
//!
//! Blocks move through QUEUED, WAITING_PARENT, WAITING_PAYLOAD, VERIFYING
//! and end APPLIED or REJECTED. This module owns the two waiting states:
//! watchers keyed by the missing parent root and blocks parked until their
//! slot arrives. Verification itself happens in the fork-choice store; a
//! block is never half-applied because the transition runs on a scratch
//! state.

use std::collections::{BTreeMap, HashMap};

use log::info;
use types::config::Config;
use types::primitives::{Slot, H256};
use types::types::BeaconBlock;

/// How many slots a watcher for a missing parent stays alive. When the
/// deadline passes without the parent appearing, the dependent block is
/// rejected; a fresh copy can always be re-queued later.
const PARENT_WATCHER_TIMEOUT_SLOTS: Slot = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStage {
    Queued,
    WaitingParent,
    WaitingPayload,
    Verifying,
    Applied,
    Rejected,
}

#[derive(Debug)]
struct PendingBlock<C: Config> {
    block: BeaconBlock<C>,
    deadline: Slot,
}

pub struct BlockPipeline<C: Config> {
    waiting_parent: HashMap<H256, Vec<PendingBlock<C>>>,
    waiting_slot: BTreeMap<Slot, Vec<BeaconBlock<C>>>,
    applied: u64,
    rejected: u64,
}

impl<C: Config> BlockPipeline<C> {
    pub fn new() -> Self {
        Self {
            waiting_parent: HashMap::new(),
            waiting_slot: BTreeMap::new(),
            applied: 0,
            rejected: 0,
        }
    }

    /// Parks a block until its parent shows up.
    pub fn wait_for_parent(&mut self, current_slot: Slot, block: BeaconBlock<C>) {
        info!(
            "block at slot {} is waiting for parent {:?}",
            block.slot, block.parent_root
        );
        self.waiting_parent
            .entry(block.parent_root)
            .or_default()
            .push(PendingBlock {
                block,
                deadline: current_slot + PARENT_WATCHER_TIMEOUT_SLOTS,
            });
    }

    /// Parks a block from a future slot until the clock reaches it.
    pub fn wait_for_slot(&mut self, block: BeaconBlock<C>) {
        info!("block at slot {} is waiting for its slot", block.slot);
        self.waiting_slot
            .entry(block.slot)
            .or_default()
            .push(block);
    }

    /// Releases the blocks that were waiting for `parent_root`.
    pub fn take_waiting_for_parent(&mut self, parent_root: H256) -> Vec<BeaconBlock<C>> {
        self.waiting_parent
            .remove(&parent_root)
            .unwrap_or_default()
            .into_iter()
            .map(|pending| pending.block)
            .collect()
    }

    /// Releases the blocks whose slot has arrived and rejects the watchers
    /// whose deadline has passed.
    pub fn take_due(&mut self, slot: Slot) -> Vec<BeaconBlock<C>> {
        let later = self.waiting_slot.split_off(&(slot + 1));
        let due = core::mem::replace(&mut self.waiting_slot, later);

        let mut expired = 0;
        self.waiting_parent.retain(|_, pending| {
            let before = pending.len();
            pending.retain(|entry| slot < entry.deadline);
            expired += before - pending.len();
            !pending.is_empty()
        });
        if expired > 0 {
            self.rejected += expired as u64;
            info!("{} blocks expired waiting for their parents", expired);
        }

        due.into_iter().flat_map(|(_, blocks)| blocks).collect()
    }

    pub fn record_applied(&mut self) {
        self.applied += 1;
    }

    pub fn record_rejected(&mut self) {
        self.rejected += 1;
    }

    /// Aggregate counters; operators see these instead of per-object reasons.
    pub fn counters(&self) -> (u64, u64) {
        (self.applied, self.rejected)
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting_parent.values().map(Vec::len).sum::<usize>()
            + self.waiting_slot.values().map(Vec::len).sum::<usize>()
    }
}

impl<C: Config> Default for BlockPipeline<C> {
    fn default() -> Self {
        Self::new()
    }
}
