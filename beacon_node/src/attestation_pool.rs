//! Staging for attestations that are waiting to be used: either by the fork
//! choice (once their referenced block arrives) or by a proposer assembling
//! a block.

use std::collections::{BTreeMap, HashMap};

use helper_functions::beacon_state_accessors::get_indexed_attestation;
use helper_functions::misc::compute_epoch_at_slot;
use helper_functions::predicates::validate_indexed_attestation;
use log::info;
use types::beacon_state::BeaconState;
use types::config::Config;
use types::primitives::{Epoch, H256};
use types::types::Attestation;

pub struct AttestationPool<C: Config> {
    by_target_epoch: BTreeMap<Epoch, Vec<Attestation<C>>>,
    awaiting_block: HashMap<H256, Vec<Attestation<C>>>,
    discarded: u64,
}

impl<C: Config> AttestationPool<C> {
    pub fn new() -> Self {
        Self {
            by_target_epoch: BTreeMap::new(),
            awaiting_block: HashMap::new(),
            discarded: 0,
        }
    }

    pub fn insert(&mut self, attestation: Attestation<C>) {
        self.by_target_epoch
            .entry(attestation.data.target.epoch)
            .or_default()
            .push(attestation);
    }

    /// Holds back an attestation that references a block the chain has not
    /// seen. It re-enters circulation when the block is applied.
    pub fn await_block(&mut self, block_root: H256, attestation: Attestation<C>) {
        self.awaiting_block
            .entry(block_root)
            .or_default()
            .push(attestation);
    }

    /// Releases the attestations that were waiting for `block_root`.
    pub fn take_awaiting(&mut self, block_root: H256) -> Vec<Attestation<C>> {
        self.awaiting_block.remove(&block_root).unwrap_or_default()
    }

    /// Drops every bucket older than one epoch below `current_epoch`, plus
    /// queued attestations whose own epoch has expired.
    pub fn prune(&mut self, current_epoch: Epoch) {
        let cutoff = current_epoch.saturating_sub(1);

        let live = self.by_target_epoch.split_off(&cutoff);
        let expired = core::mem::replace(&mut self.by_target_epoch, live);
        self.discarded += expired.values().map(Vec::len).sum::<usize>() as u64;

        self.awaiting_block.retain(|_, attestations| {
            attestations.retain(|attestation| attestation.data.target.epoch >= cutoff);
            !attestations.is_empty()
        });

        if self.discarded > 0 {
            info!("{} expired attestations discarded so far", self.discarded);
        }
    }

    /// The attestations a proposer should include on top of `state`: those
    /// the state can still verify and whose participation is not already a
    /// subset of what is on chain.
    pub fn attestations_for_proposer(&self, state: &BeaconState<C>) -> Vec<Attestation<C>> {
        self.by_target_epoch
            .values()
            .flatten()
            .filter(|attestation| !self.is_redundant(state, attestation))
            .filter(|attestation| {
                get_indexed_attestation(state, attestation)
                    .map_err(|_| ())
                    .and_then(|indexed| {
                        validate_indexed_attestation(state, &indexed, true).map_err(|_| ())
                    })
                    .is_ok()
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_target_epoch.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_target_epoch.values().all(Vec::is_empty)
    }

    fn is_redundant(&self, state: &BeaconState<C>, attestation: &Attestation<C>) -> bool {
        let epoch = compute_epoch_at_slot::<C>(state.slot);
        let accumulator = if attestation.data.target.epoch == epoch {
            &state.current_epoch_attestations
        } else {
            &state.previous_epoch_attestations
        };

        accumulator.iter().any(|pending| {
            pending.data == attestation.data
                && attestation
                    .aggregation_bits
                    .is_subset_of(&pending.aggregation_bits)
        })
    }
}

impl<C: Config> Default for AttestationPool<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use ssz_new::BitList;
    use test_case::test_case;
    use types::config::MinimalConfig;
    use types::primitives::SignatureBytes;
    use types::types::{AttestationData, Checkpoint};

    use super::*;

    type C = MinimalConfig;

    fn attestation_at_epoch(epoch: Epoch) -> Attestation<C> {
        Attestation {
            aggregation_bits: BitList::with_capacity(4).expect("within bound"),
            data: AttestationData {
                target: Checkpoint {
                    epoch,
                    ..Checkpoint::default()
                },
                ..AttestationData::default()
            },
            signature: SignatureBytes::from_bytes(&[1; 96]).expect("correct length"),
        }
    }

    #[test_case(0, 2 => 0; "all old buckets expire")]
    #[test_case(2, 2 => 2; "the previous epoch survives")]
    #[test_case(3, 2 => 2; "the current epoch survives")]
    fn pruning(epoch: Epoch, current_epoch: Epoch) -> usize {
        let mut pool = AttestationPool::<C>::new();
        pool.insert(attestation_at_epoch(epoch));
        pool.insert(attestation_at_epoch(epoch));
        pool.prune(current_epoch);
        pool.len()
    }

    #[test]
    fn awaiting_attestations_come_back_once() {
        let mut pool = AttestationPool::<C>::new();
        let root = H256::from([1; 32]);

        pool.await_block(root, attestation_at_epoch(0));
        pool.await_block(root, attestation_at_epoch(0));

        assert_eq!(pool.take_awaiting(root).len(), 2);
        assert!(pool.take_awaiting(root).is_empty());
    }

    #[test]
    fn pruning_also_expires_queued_attestations() {
        let mut pool = AttestationPool::<C>::new();
        let root = H256::from([1; 32]);

        pool.await_block(root, attestation_at_epoch(0));
        pool.await_block(root, attestation_at_epoch(5));
        pool.prune(5);

        assert_eq!(pool.take_awaiting(root).len(), 1);
    }
}
