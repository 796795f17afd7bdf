use core::fmt::Debug;

use serde::{Deserialize, Serialize};
use typenum::{
    Unsigned, U1024, U1099511627776, U16, U16777216, U2048, U32, U4096, U64, U65536, U8, U8192,
};

use crate::consts;
use crate::primitives::{DomainType, Epoch, Gwei, Slot};

/// Compile-time spec constants. List and vector bounds are typenum values so
/// the container types can carry them; scalar constants are methods.
pub trait Config: 'static + Clone + PartialEq + Eq + Default + Debug {
    type EpochsPerHistoricalVector: Unsigned + Clone + Eq + Debug + Default;
    type EpochsPerSlashingsVector: Unsigned + Clone + Eq + Debug + Default;
    type HistoricalRootsLimit: Unsigned + Clone + Eq + Debug + Default;
    type MaxAttestations: Unsigned + Clone + Eq + Debug + Default;
    type MaxAttestationsPerEpoch: Unsigned + Clone + Eq + Debug + Default;
    type MaxAttesterSlashings: Unsigned + Clone + Eq + Debug + Default;
    type MaxDeposits: Unsigned + Clone + Eq + Debug + Default;
    type MaxProposerSlashings: Unsigned + Clone + Eq + Debug + Default;
    type MaxValidatorsPerCommittee: Unsigned + Clone + Eq + Debug + Default;
    type MaxVoluntaryExits: Unsigned + Clone + Eq + Debug + Default;
    type SlotsPerEpoch: Unsigned + Clone + Eq + Debug + Default;
    type SlotsPerEth1VotingPeriod: Unsigned + Clone + Eq + Debug + Default;
    type SlotsPerHistoricalRoot: Unsigned + Clone + Eq + Debug + Default;
    type ValidatorRegistryLimit: Unsigned + Clone + Eq + Debug + Default;

    fn genesis_slot() -> Slot {
        consts::GENESIS_SLOT
    }

    fn genesis_epoch() -> Epoch {
        consts::GENESIS_EPOCH
    }

    fn far_future_epoch() -> Epoch {
        consts::FAR_FUTURE_EPOCH
    }

    // Time.
    fn seconds_per_slot() -> u64;
    fn min_attestation_inclusion_delay() -> u64 {
        1
    }
    fn min_seed_lookahead() -> Epoch {
        1
    }
    fn activation_exit_delay() -> Epoch {
        4
    }
    fn min_validator_withdrawability_delay() -> Epoch {
        256
    }
    fn shard_committee_period() -> Epoch;
    fn min_epochs_to_inactivity_penalty() -> Epoch {
        4
    }

    // Shuffling and committees.
    fn shuffle_round_count() -> u64;
    fn max_committees_per_slot() -> u64;
    fn target_committee_size() -> u64;

    // Balances.
    fn min_deposit_amount() -> Gwei {
        1_000_000_000
    }
    fn max_effective_balance() -> Gwei {
        32_000_000_000
    }
    fn effective_balance_increment() -> Gwei {
        1_000_000_000
    }
    fn ejection_balance() -> Gwei {
        16_000_000_000
    }

    // Rewards and penalties.
    fn base_reward_factor() -> u64 {
        64
    }
    fn base_rewards_per_epoch() -> u64 {
        consts::BASE_REWARDS_PER_EPOCH
    }
    fn proposer_reward_quotient() -> u64 {
        8
    }
    fn whistleblower_reward_quotient() -> u64 {
        512
    }
    fn inactivity_penalty_quotient() -> u64 {
        33_554_432
    }
    fn min_slashing_penalty_quotient() -> u64 {
        32
    }

    // Validator churn.
    fn min_per_epoch_churn_limit() -> u64 {
        4
    }
    fn churn_limit_quotient() -> u64 {
        65_536
    }

    // Fork choice.
    fn safe_slots_to_update_justified() -> Slot;

    // Signature domains.
    fn domain_beacon_proposer() -> DomainType {
        0
    }
    fn domain_beacon_attester() -> DomainType {
        1
    }
    fn domain_randao() -> DomainType {
        2
    }
    fn domain_deposit() -> DomainType {
        3
    }
    fn domain_voluntary_exit() -> DomainType {
        4
    }

    // Spec options. Signature verification can be switched off for test
    // modes; the incremental hasher can be bypassed entirely.
    fn bls_verify() -> bool {
        true
    }
    fn bls_verify_proof_of_possession() -> bool {
        false
    }
    fn incremental_hasher() -> bool {
        true
    }
    fn cache_size_entries() -> usize {
        64
    }

    // Convenience accessors for the typenum bounds.
    fn slots_per_epoch() -> u64 {
        Self::SlotsPerEpoch::to_u64()
    }
    fn slots_per_historical_root() -> u64 {
        Self::SlotsPerHistoricalRoot::to_u64()
    }
    fn slots_per_eth1_voting_period() -> u64 {
        Self::SlotsPerEth1VotingPeriod::to_u64()
    }
    fn epochs_per_historical_vector() -> u64 {
        Self::EpochsPerHistoricalVector::to_u64()
    }
    fn epochs_per_slashings_vector() -> u64 {
        Self::EpochsPerSlashingsVector::to_u64()
    }
    fn max_deposits() -> u64 {
        Self::MaxDeposits::to_u64()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct MainnetConfig;

impl Config for MainnetConfig {
    type EpochsPerHistoricalVector = U65536;
    type EpochsPerSlashingsVector = U8192;
    type HistoricalRootsLimit = U16777216;
    type MaxAttestations = typenum::U128;
    type MaxAttestationsPerEpoch = U4096;
    type MaxAttesterSlashings = typenum::U1;
    type MaxDeposits = U16;
    type MaxProposerSlashings = U16;
    type MaxValidatorsPerCommittee = U2048;
    type MaxVoluntaryExits = U16;
    type SlotsPerEpoch = U32;
    type SlotsPerEth1VotingPeriod = U1024;
    type SlotsPerHistoricalRoot = U8192;
    type ValidatorRegistryLimit = U1099511627776;

    fn seconds_per_slot() -> u64 {
        12
    }

    fn shard_committee_period() -> Epoch {
        2048
    }

    fn shuffle_round_count() -> u64 {
        90
    }

    fn max_committees_per_slot() -> u64 {
        64
    }

    fn target_committee_size() -> u64 {
        128
    }

    fn safe_slots_to_update_justified() -> Slot {
        8
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct MinimalConfig;

impl Config for MinimalConfig {
    type EpochsPerHistoricalVector = U64;
    type EpochsPerSlashingsVector = U64;
    type HistoricalRootsLimit = U16777216;
    type MaxAttestations = typenum::U128;
    type MaxAttestationsPerEpoch = U1024;
    type MaxAttesterSlashings = typenum::U1;
    type MaxDeposits = U16;
    type MaxProposerSlashings = U16;
    type MaxValidatorsPerCommittee = U2048;
    type MaxVoluntaryExits = U16;
    type SlotsPerEpoch = U8;
    type SlotsPerEth1VotingPeriod = U16;
    type SlotsPerHistoricalRoot = U64;
    type ValidatorRegistryLimit = U1099511627776;

    fn seconds_per_slot() -> u64 {
        6
    }

    fn shard_committee_period() -> Epoch {
        128
    }

    fn shuffle_round_count() -> u64 {
        10
    }

    fn max_committees_per_slot() -> u64 {
        4
    }

    fn target_committee_size() -> u64 {
        4
    }

    fn safe_slots_to_update_justified() -> Slot {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_lengths_divide_the_historical_roots() {
        assert_eq!(
            MainnetConfig::slots_per_historical_root() % MainnetConfig::slots_per_epoch(),
            0
        );
        assert_eq!(
            MinimalConfig::slots_per_historical_root() % MinimalConfig::slots_per_epoch(),
            0
        );
    }

    #[test]
    fn attestation_accumulator_covers_a_full_epoch() {
        assert_eq!(
            <MainnetConfig as Config>::MaxAttestationsPerEpoch::to_u64(),
            <MainnetConfig as Config>::MaxAttestations::to_u64() * MainnetConfig::slots_per_epoch()
        );
        assert_eq!(
            <MinimalConfig as Config>::MaxAttestationsPerEpoch::to_u64(),
            <MinimalConfig as Config>::MaxAttestations::to_u64() * MinimalConfig::slots_per_epoch()
        );
    }
}
