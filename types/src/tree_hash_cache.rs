//! Incremental tree hashing for the beacon state.
//!
//! The large rings and registries carry their own caches; the remaining
//! fields are small and are rehashed directly. A clone of the cache forks
//! all per-field caches, so every logical state owns its cache.

use cached_tree_hash::{Error, MultiTreeHashCache, TreeHashCache};
use tree_hash::TreeHash;
use typenum::Unsigned;

use crate::beacon_state::BeaconState;
use crate::config::Config;
use crate::primitives::{Gwei, H256};
use crate::types::Validator;

const STATE_FIELD_COUNT: usize = 20;
const VALIDATOR_FIELD_COUNT: usize = 8;

#[derive(Debug, PartialEq, Clone)]
pub struct BeaconTreeHashCache {
    state_cache: TreeHashCache,
    block_roots: TreeHashCache,
    state_roots: TreeHashCache,
    historical_roots: TreeHashCache,
    randao_mixes: TreeHashCache,
    slashings: TreeHashCache,
    validators: MultiTreeHashCache,
    balances: TreeHashCache,
}

impl BeaconTreeHashCache {
    pub fn new<C: Config>() -> Self {
        Self {
            state_cache: TreeHashCache::new(STATE_FIELD_COUNT),
            block_roots: TreeHashCache::new(C::SlotsPerHistoricalRoot::to_usize()),
            state_roots: TreeHashCache::new(C::SlotsPerHistoricalRoot::to_usize()),
            historical_roots: TreeHashCache::new(C::HistoricalRootsLimit::to_usize()),
            randao_mixes: TreeHashCache::new(C::EpochsPerHistoricalVector::to_usize()),
            slashings: TreeHashCache::new(packed_chunk_limit::<C::EpochsPerSlashingsVector>()),
            validators: MultiTreeHashCache::new(
                C::ValidatorRegistryLimit::to_usize(),
                VALIDATOR_FIELD_COUNT,
            ),
            balances: TreeHashCache::new(packed_chunk_limit::<C::ValidatorRegistryLimit>()),
        }
    }

    /// Recomputes the state root, rehashing only what changed since the last
    /// call. The result equals `state.tree_hash_root()`.
    pub fn recalculate<C: Config>(&mut self, state: &BeaconState<C>) -> Result<H256, Error> {
        let block_roots = self.block_roots.recalculate(&state.block_roots)?;
        let state_roots = self.state_roots.recalculate(&state.state_roots)?;
        let historical_roots = mix_in_length(
            self.historical_roots.recalculate(&state.historical_roots)?,
            state.historical_roots.len(),
        );
        let randao_mixes = self.randao_mixes.recalculate(&state.randao_mixes)?;
        let slashings = self
            .slashings
            .recalculate(&packed_leaves(&state.slashings))?;
        let validators = mix_in_length(
            self.validators
                .recalculate(&state.validators, validator_leaves)?,
            state.validators.len(),
        );
        let balances = mix_in_length(
            self.balances.recalculate(&packed_leaves(&state.balances))?,
            state.balances.len(),
        );

        let leaves = vec![
            field_root(&state.genesis_time),
            field_root(&state.slot),
            field_root(&state.fork),
            field_root(&state.latest_block_header),
            block_roots,
            state_roots,
            historical_roots,
            field_root(&state.eth1_data),
            field_root(&state.eth1_data_votes),
            field_root(&state.eth1_deposit_index),
            validators,
            balances,
            randao_mixes,
            slashings,
            field_root(&state.previous_epoch_attestations),
            field_root(&state.current_epoch_attestations),
            field_root(&state.justification_bits),
            field_root(&state.previous_justified_checkpoint),
            field_root(&state.current_justified_checkpoint),
            field_root(&state.finalized_checkpoint),
        ];

        self.state_cache.recalculate(&leaves)
    }
}

fn packed_chunk_limit<N: Unsigned>() -> usize {
    // Four u64 values pack into each 32-byte chunk.
    (N::to_usize() + 3) / 4
}

fn field_root<T: TreeHash>(field: &T) -> H256 {
    H256::from_slice(&field.tree_hash_root())
}

fn mix_in_length(root: H256, length: usize) -> H256 {
    H256::from_slice(&tree_hash::mix_in_length(root.as_bytes(), length))
}

fn packed_leaves(values: &[Gwei]) -> Vec<H256> {
    values
        .chunks(4)
        .map(|values| {
            let mut chunk = [0; 32];
            for (i, value) in values.iter().enumerate() {
                chunk[i * 8..(i + 1) * 8].copy_from_slice(&value.to_le_bytes());
            }
            H256::from(chunk)
        })
        .collect()
}

fn validator_leaves(validator: &Validator) -> Vec<H256> {
    vec![
        field_root(&validator.pubkey),
        field_root(&validator.withdrawal_credentials),
        field_root(&validator.effective_balance),
        field_root(&validator.slashed),
        field_root(&validator.activation_eligibility_epoch),
        field_root(&validator.activation_epoch),
        field_root(&validator.exit_epoch),
        field_root(&validator.withdrawable_epoch),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MinimalConfig;
    use crate::primitives::PublicKeyBytes;
    use ssz_new::VariableList;

    fn sample_state() -> BeaconState<MinimalConfig> {
        let validators = (0_u8..4)
            .map(|i| Validator {
                pubkey: PublicKeyBytes::from_bytes(&[i; 48]).expect("correct length"),
                effective_balance: 32_000_000_000,
                activation_epoch: 0,
                ..Validator::default()
            })
            .collect::<Vec<_>>();

        BeaconState {
            slot: 3,
            validators: VariableList::new(validators).expect("within bound"),
            balances: VariableList::new(vec![32_000_000_000; 4]).expect("within bound"),
            ..BeaconState::default()
        }
    }

    #[test]
    fn matches_the_derived_tree_hash() {
        let state = sample_state();
        let mut cache = BeaconTreeHashCache::new::<MinimalConfig>();

        assert_eq!(
            cache.recalculate(&state),
            Ok(H256::from_slice(&state.tree_hash_root()))
        );
    }

    #[test]
    fn tracks_balance_and_registry_mutations() {
        let mut state = sample_state();
        let mut cache = BeaconTreeHashCache::new::<MinimalConfig>();
        cache.recalculate(&state).expect("state fits");

        state.balances[2] += 1_000_000;
        state.validators[1].slashed = true;
        state
            .validators
            .push(Validator::default())
            .expect("within bound");
        state.balances.push(0).expect("within bound");

        assert_eq!(
            cache.recalculate(&state),
            Ok(H256::from_slice(&state.tree_hash_root()))
        );
    }

    #[test]
    fn forked_caches_track_forked_states() {
        let mut state = sample_state();
        let mut cache = BeaconTreeHashCache::new::<MinimalConfig>();
        cache.recalculate(&state).expect("state fits");

        let mut forked_state = state.clone();
        let mut forked_cache = cache.clone();

        state.slot += 1;
        forked_state.balances[0] = 0;

        assert_eq!(
            cache.recalculate(&state),
            Ok(H256::from_slice(&state.tree_hash_root()))
        );
        assert_eq!(
            forked_cache.recalculate(&forked_state),
            Ok(H256::from_slice(&forked_state.tree_hash_root()))
        );
    }
}
