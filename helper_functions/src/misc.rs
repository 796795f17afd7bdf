use core::convert::TryFrom;
use std::cmp::max;

use typenum::Unsigned;
use types::beacon_state::BeaconState;
use types::config::Config;
use types::primitives::*;

use crate::crypto::hash;
use crate::error::Error;
use crate::math::{bytes_to_int, int_to_bytes};

const MAX_RANDOM_BYTE: u64 = (1 << 8) - 1;

pub fn compute_epoch_at_slot<C: Config>(slot: Slot) -> Epoch {
    slot / C::SlotsPerEpoch::to_u64()
}

pub fn compute_start_slot_at_epoch<C: Config>(epoch: Epoch) -> Slot {
    epoch * C::SlotsPerEpoch::to_u64()
}

pub fn compute_activation_exit_epoch<C: Config>(epoch: Epoch) -> Epoch {
    epoch + 1 + C::activation_exit_delay()
}

pub fn compute_domain<C: Config>(domain_type: DomainType, fork_version: Version) -> Domain {
    Domain::new(domain_type, fork_version)
}

/// The swap-or-not shuffle applied to a single index.
///
/// Deterministic, reversible and unbiased; `MAX_RANDOM_BYTE` follows the
/// reference shuffle (the full byte range).
pub fn compute_shuffled_index<C: Config>(
    index: ValidatorIndex,
    index_count: u64,
    seed: &H256,
) -> Result<ValidatorIndex, Error> {
    if index >= index_count {
        return Err(Error::IndexOutOfRange);
    }

    let mut index = index;
    for current_round in 0..C::shuffle_round_count() {
        let pivot = bytes_to_int(hash_round(seed, current_round)) % index_count;
        let flip = (pivot + index_count - index) % index_count;
        let position = max(index, flip);
        let source = hash_round_position(seed, current_round, position);
        let byte = source[usize::try_from((position % 256) / 8)
            .map_err(|_| Error::IndexOutOfRange)?];
        let bit = (byte >> (position % 8)) % 2;
        index = if bit == 0 { index } else { flip };
    }

    Ok(index)
}

fn hash_round(seed: &H256, current_round: u64) -> [u8; 8] {
    let mut preimage = seed.as_bytes().to_vec();
    preimage.append(&mut int_to_bytes(current_round, 1));
    let mut bytes = [0; 8];
    bytes.copy_from_slice(&hash(&preimage)[..8]);
    bytes
}

fn hash_round_position(seed: &H256, current_round: u64, position: u64) -> Vec<u8> {
    let mut preimage = seed.as_bytes().to_vec();
    preimage.append(&mut int_to_bytes(current_round, 1));
    preimage.append(&mut int_to_bytes(position / 256, 4));
    hash(&preimage)
}

/// The committee with the given index out of `count` committees: a slice of
/// the shuffled active set.
pub fn compute_committee<C: Config>(
    indices: &[ValidatorIndex],
    seed: &H256,
    index: u64,
    count: u64,
) -> Result<Vec<ValidatorIndex>, Error> {
    let total = indices.len() as u64;
    let start = (total * index / count) as usize;
    let end = (total * (index + 1) / count) as usize;

    let mut committee = Vec::with_capacity(end - start);
    for i in start..end {
        let shuffled = compute_shuffled_index::<C>(i as u64, total, seed)?;
        let position = usize::try_from(shuffled).map_err(|_| Error::IndexOutOfRange)?;
        committee.push(indices[position]);
    }

    Ok(committee)
}

/// Samples a proposer from `indices`, weighted by effective balance.
pub fn compute_proposer_index<C: Config>(
    state: &BeaconState<C>,
    indices: &[ValidatorIndex],
    seed: &H256,
) -> Result<ValidatorIndex, Error> {
    if indices.is_empty() {
        return Err(Error::NoActiveValidators);
    }

    let total = indices.len() as u64;
    let mut i = 0;
    loop {
        let shuffled = compute_shuffled_index::<C>(i % total, total, seed)?;
        let candidate_index =
            indices[usize::try_from(shuffled).map_err(|_| Error::IndexOutOfRange)?];

        let mut preimage = seed.as_bytes().to_vec();
        preimage.append(&mut int_to_bytes(i / 32, 8));
        let random_byte = u64::from(hash(&preimage)[(i % 32) as usize]);

        let effective_balance = state.validators
            [usize::try_from(candidate_index).map_err(|_| Error::IndexOutOfRange)?]
        .effective_balance;

        if effective_balance * MAX_RANDOM_BYTE >= C::max_effective_balance() * random_byte {
            return Ok(candidate_index);
        }

        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use types::config::MinimalConfig;

    #[test]
    fn epoch_of_slot() {
        assert_eq!(compute_epoch_at_slot::<MinimalConfig>(0), 0);
        assert_eq!(compute_epoch_at_slot::<MinimalConfig>(7), 0);
        assert_eq!(compute_epoch_at_slot::<MinimalConfig>(8), 1);
        assert_eq!(compute_epoch_at_slot::<MinimalConfig>(17), 2);
    }

    #[test]
    fn start_slot_of_epoch() {
        assert_eq!(
            compute_start_slot_at_epoch::<MinimalConfig>(10),
            10 * MinimalConfig::slots_per_epoch()
        );
    }

    #[test]
    fn activation_exit_epoch_includes_the_lookahead() {
        assert_eq!(compute_activation_exit_epoch::<MinimalConfig>(0), 5);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let seed = H256::from([0x5a; 32]);
        let count = 100;

        let shuffled = (0..count)
            .map(|i| compute_shuffled_index::<MinimalConfig>(i, count, &seed))
            .collect::<Result<BTreeSet<_>, _>>()
            .expect("indices are in range");

        assert_eq!(shuffled.len(), count as usize);
        assert!(shuffled.iter().all(|index| *index < count));
    }

    #[test]
    fn shuffle_of_a_single_element_is_identity() {
        let seed = H256::from([7; 32]);
        assert_eq!(compute_shuffled_index::<MinimalConfig>(0, 1, &seed), Ok(0));
    }

    #[test]
    fn shuffle_rejects_out_of_range_indices() {
        let seed = H256::from([7; 32]);
        assert!(compute_shuffled_index::<MinimalConfig>(1, 1, &seed).is_err());
    }

    #[test]
    fn committees_partition_the_indices() {
        let indices: Vec<ValidatorIndex> = (0..24).collect();
        let seed = H256::from([3; 32]);
        let count = 4;

        let mut seen = BTreeSet::new();
        let mut total = 0;
        for index in 0..count {
            let committee =
                compute_committee::<MinimalConfig>(&indices, &seed, index, count)
                    .expect("count divides the indices");
            total += committee.len();
            seen.extend(committee);
        }

        assert_eq!(total, indices.len());
        assert_eq!(seen, indices.iter().copied().collect());
    }
}
