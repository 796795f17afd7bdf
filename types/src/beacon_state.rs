use serde::{Deserialize, Serialize};
use ssz_new::{BitVector, FixedVector, VariableList};
use ssz_new_derive::{SszDecode, SszEncode};
use tree_hash_derive::TreeHash;

use crate::config::Config;
use crate::consts;
use crate::primitives::*;
use crate::types::*;

#[derive(
    Debug, PartialEq, Clone, Default, Serialize, Deserialize, SszEncode, SszDecode, TreeHash,
)]
pub struct BeaconState<C: Config> {
    pub genesis_time: UnixSeconds,
    pub slot: Slot,
    pub fork: Fork,

    // History
    pub latest_block_header: BeaconBlockHeader,
    pub block_roots: FixedVector<H256, C::SlotsPerHistoricalRoot>,
    pub state_roots: FixedVector<H256, C::SlotsPerHistoricalRoot>,
    pub historical_roots: VariableList<H256, C::HistoricalRootsLimit>,

    // Eth1
    pub eth1_data: Eth1Data,
    pub eth1_data_votes: VariableList<Eth1Data, C::SlotsPerEth1VotingPeriod>,
    pub eth1_deposit_index: u64,

    // Registry
    pub validators: VariableList<Validator, C::ValidatorRegistryLimit>,
    pub balances: VariableList<Gwei, C::ValidatorRegistryLimit>,

    // Randomness
    pub randao_mixes: FixedVector<H256, C::EpochsPerHistoricalVector>,

    // Slashings
    pub slashings: FixedVector<Gwei, C::EpochsPerSlashingsVector>,

    // Attestations
    pub previous_epoch_attestations:
        VariableList<PendingAttestation<C>, C::MaxAttestationsPerEpoch>,
    pub current_epoch_attestations: VariableList<PendingAttestation<C>, C::MaxAttestationsPerEpoch>,

    // Finality
    pub justification_bits: BitVector<consts::JustificationBitsLength>,
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MinimalConfig;
    use ssz_new::{SszDecode, SszEncode};
    use tree_hash::TreeHash;

    #[test]
    fn default_state_round_trips_through_ssz() {
        let state = BeaconState::<MinimalConfig>::default();
        let bytes = state.as_ssz_bytes();
        let decoded = BeaconState::<MinimalConfig>::from_ssz_bytes(&bytes)
            .expect("the state's own serialization is decodable");
        assert_eq!(decoded, state);
    }

    #[test]
    fn tree_hash_is_deterministic() {
        let state = BeaconState::<MinimalConfig>::default();
        assert_eq!(state.tree_hash_root(), state.tree_hash_root());
    }

    #[test]
    fn tree_hash_tracks_mutations() {
        let mut state = BeaconState::<MinimalConfig>::default();
        let default_root = state.tree_hash_root();

        state.slot = 1;
        assert_ne!(state.tree_hash_root(), default_root);
    }
}
