use core::convert::TryFrom;
use std::cmp;
use std::collections::BTreeSet;

use ssz_new::BitList;
use typenum::Unsigned;
use types::beacon_state::BeaconState;
use types::config::Config;
use types::primitives::*;
use types::types::*;

use crate::crypto::hash;
use crate::error::Error;
use crate::math::int_to_bytes;
use crate::misc::{
    compute_committee, compute_domain, compute_epoch_at_slot, compute_proposer_index,
    compute_start_slot_at_epoch,
};
use crate::predicates::is_active_validator;

pub fn get_current_epoch<C: Config>(state: &BeaconState<C>) -> Epoch {
    compute_epoch_at_slot::<C>(state.slot)
}

pub fn get_previous_epoch<C: Config>(state: &BeaconState<C>) -> Epoch {
    let current_epoch = get_current_epoch(state);
    if current_epoch > C::genesis_epoch() {
        current_epoch - 1
    } else {
        C::genesis_epoch()
    }
}

pub fn get_block_root<C: Config>(state: &BeaconState<C>, epoch: Epoch) -> Result<H256, Error> {
    get_block_root_at_slot(state, compute_start_slot_at_epoch::<C>(epoch))
}

pub fn get_block_root_at_slot<C: Config>(
    state: &BeaconState<C>,
    slot: Slot,
) -> Result<H256, Error> {
    if !(slot < state.slot && state.slot <= slot + C::SlotsPerHistoricalRoot::to_u64()) {
        return Err(Error::SlotOutOfRange);
    }

    let index = usize::try_from(slot % C::SlotsPerHistoricalRoot::to_u64())
        .map_err(|_| Error::IndexOutOfRange)?;
    Ok(state.block_roots[index])
}

/// Looks up the RANDAO mix for `epoch`. Only the window
/// `(current_epoch - EPOCHS_PER_HISTORICAL_VECTOR, current_epoch]` is
/// readable; outside it the ring has been overwritten.
pub fn get_randao_mix<C: Config>(state: &BeaconState<C>, epoch: Epoch) -> Result<H256, Error> {
    let current_epoch = get_current_epoch(state);
    let ring_length = C::EpochsPerHistoricalVector::to_u64();

    if epoch > current_epoch || epoch + ring_length <= current_epoch {
        return Err(Error::EpochOutOfRange);
    }

    let index =
        usize::try_from(epoch % ring_length).map_err(|_| Error::IndexOutOfRange)?;
    Ok(state.randao_mixes[index])
}

pub fn get_active_validator_indices<C: Config>(
    state: &BeaconState<C>,
    epoch: Epoch,
) -> Vec<ValidatorIndex> {
    state
        .validators
        .iter()
        .enumerate()
        .filter(|(_, validator)| is_active_validator(validator, epoch))
        .map(|(index, _)| index as u64)
        .collect()
}

pub fn get_validator_churn_limit<C: Config>(state: &BeaconState<C>) -> u64 {
    let active_count = get_active_validator_indices(state, get_current_epoch(state)).len() as u64;
    cmp::max(
        C::min_per_epoch_churn_limit(),
        active_count / C::churn_limit_quotient(),
    )
}

/// The committee-shuffling seed for `epoch`: the domain type, the epoch and
/// a RANDAO mix one lookahead period old, hashed together.
pub fn get_seed<C: Config>(
    state: &BeaconState<C>,
    epoch: Epoch,
    domain_type: DomainType,
) -> H256 {
    let ring_length = C::EpochsPerHistoricalVector::to_u64();
    let mix_epoch = epoch + ring_length - C::min_seed_lookahead() - 1;
    // The ring is read directly; the lookahead epoch intentionally wraps.
    let mix = state.randao_mixes[(mix_epoch % ring_length) as usize];

    let mut preimage = int_to_bytes(u64::from(domain_type), 4);
    preimage.append(&mut int_to_bytes(epoch, 8));
    preimage.extend_from_slice(mix.as_bytes());
    H256::from_slice(&hash(&preimage))
}

pub fn get_committee_count_at_slot<C: Config>(
    state: &BeaconState<C>,
    slot: Slot,
) -> u64 {
    let epoch = compute_epoch_at_slot::<C>(slot);
    let active_count = get_active_validator_indices(state, epoch).len() as u64;

    cmp::max(
        1,
        cmp::min(
            C::max_committees_per_slot(),
            active_count / C::SlotsPerEpoch::to_u64() / C::target_committee_size(),
        ),
    )
}

pub fn get_beacon_committee<C: Config>(
    state: &BeaconState<C>,
    slot: Slot,
    index: CommitteeIndex,
) -> Result<Vec<ValidatorIndex>, Error> {
    let epoch = compute_epoch_at_slot::<C>(slot);
    let committees_per_slot = get_committee_count_at_slot(state, slot);

    if index >= committees_per_slot {
        return Err(Error::IndexOutOfRange);
    }

    compute_committee::<C>(
        &get_active_validator_indices(state, epoch),
        &get_seed(state, epoch, C::domain_beacon_attester()),
        (slot % C::SlotsPerEpoch::to_u64()) * committees_per_slot + index,
        committees_per_slot * C::SlotsPerEpoch::to_u64(),
    )
}

pub fn get_beacon_proposer_index<C: Config>(
    state: &BeaconState<C>,
) -> Result<ValidatorIndex, Error> {
    let epoch = get_current_epoch(state);

    let mut preimage = get_seed(state, epoch, C::domain_beacon_proposer())
        .as_bytes()
        .to_vec();
    preimage.append(&mut int_to_bytes(state.slot, 8));
    let seed = H256::from_slice(&hash(&preimage));

    let indices = get_active_validator_indices(state, epoch);
    compute_proposer_index(state, &indices, &seed)
}

/// The summed effective balance of `indices`, never less than one to keep
/// callers' divisions defined.
pub fn get_total_balance<C: Config>(
    state: &BeaconState<C>,
    indices: &[ValidatorIndex],
) -> Result<Gwei, Error> {
    let mut sum = 0;
    for index in indices {
        let index = usize::try_from(*index).map_err(|_| Error::IndexOutOfRange)?;
        let validator = state.validators.get(index).ok_or(Error::IndexOutOfRange)?;
        sum += validator.effective_balance;
    }
    Ok(cmp::max(1, sum))
}

pub fn get_total_active_balance<C: Config>(state: &BeaconState<C>) -> Result<Gwei, Error> {
    get_total_balance(
        state,
        &get_active_validator_indices(state, get_current_epoch(state)),
    )
}

pub fn get_domain<C: Config>(
    state: &BeaconState<C>,
    domain_type: DomainType,
    message_epoch: Option<Epoch>,
) -> Domain {
    let epoch = message_epoch.unwrap_or_else(|| get_current_epoch(state));
    let fork_version = if epoch < state.fork.epoch {
        state.fork.previous_version
    } else {
        state.fork.current_version
    };
    compute_domain::<C>(domain_type, fork_version)
}

pub fn get_attesting_indices<C: Config>(
    state: &BeaconState<C>,
    data: &AttestationData,
    bits: &BitList<C::MaxValidatorsPerCommittee>,
) -> Result<BTreeSet<ValidatorIndex>, Error> {
    let committee = get_beacon_committee(state, data.slot, data.index)?;
    if bits.len() != committee.len() {
        return Err(Error::AttestationBitsInvalid);
    }

    Ok(committee
        .iter()
        .enumerate()
        .filter_map(|(i, index)| match bits.get(i) {
            Ok(true) => Some(*index),
            _ => None,
        })
        .collect())
}

pub fn get_indexed_attestation<C: Config>(
    state: &BeaconState<C>,
    attestation: &Attestation<C>,
) -> Result<IndexedAttestation<C>, Error> {
    let attesting_indices =
        get_attesting_indices(state, &attestation.data, &attestation.aggregation_bits)?;

    // `BTreeSet` iterates in ascending order, which is the sorted-index
    // invariant `validate_indexed_attestation` checks.
    let indices: Vec<u64> = attesting_indices.into_iter().collect();

    Ok(IndexedAttestation {
        attesting_indices: ssz_new::VariableList::new(indices)
            .map_err(|_| Error::IndicesExceedMaxValidators)?,
        data: attestation.data.clone(),
        signature: attestation.signature,
    })
}
