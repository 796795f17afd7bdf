use core::mem;
use std::cmp;

use helper_functions::beacon_state_accessors::{
    get_block_root, get_current_epoch, get_randao_mix, get_total_active_balance,
    get_validator_churn_limit,
};
use helper_functions::beacon_state_mutators::{decrease_balance, initiate_validator_exit};
use helper_functions::crypto::hash_tree_root;
use helper_functions::misc::compute_activation_exit_epoch;
use helper_functions::predicates::is_active_validator;
use itertools::Itertools;
use ssz_new::{BitVector, VariableList};
use types::beacon_state::BeaconState;
use types::config::Config;
use types::consts::JustificationBitsLength;
use types::primitives::{Epoch, Gwei};
use types::types::{Checkpoint, HistoricalBatch, Validator};

use crate::attestations::AttestableBlock;
use crate::error::Error;
use crate::rewards_and_penalties::StakeholderBlock;

/// Runs end-of-epoch processing, in the mandated order.
pub fn process_epoch<C: Config>(state: &mut BeaconState<C>) -> Result<(), Error> {
    process_justification_and_finalization(state)?;
    state.process_rewards_and_penalties()?;
    process_registry_updates(state)?;
    process_slashings(state)?;
    process_final_updates(state)?;
    Ok(())
}

/// Justifies epoch boundaries that gathered a 2/3 supermajority and promotes
/// justified checkpoints to finalized per the four-bit rules.
fn process_justification_and_finalization<C: Config>(
    state: &mut BeaconState<C>,
) -> Result<(), Error> {
    let current_epoch = get_current_epoch(state);
    if current_epoch <= C::genesis_epoch() + 1 {
        return Ok(());
    }

    let previous_epoch = current_epoch - 1;
    let old_previous_justified = state.previous_justified_checkpoint;
    let old_current_justified = state.current_justified_checkpoint;

    // Justification
    state.previous_justified_checkpoint = state.current_justified_checkpoint;
    shift_justification_bits(&mut state.justification_bits);

    let total_balance = get_total_active_balance(state)?;

    let previous_boundary_balance = state
        .get_attesting_balance(&state.get_matching_target_attestations(previous_epoch)?)?;
    if previous_boundary_balance * 3 >= total_balance * 2 {
        state.current_justified_checkpoint = Checkpoint {
            epoch: previous_epoch,
            root: get_block_root(state, previous_epoch)?,
        };
        set_bit(&mut state.justification_bits, 1);
    }

    let current_boundary_balance =
        state.get_attesting_balance(&state.get_matching_target_attestations(current_epoch)?)?;
    if current_boundary_balance * 3 >= total_balance * 2 {
        state.current_justified_checkpoint = Checkpoint {
            epoch: current_epoch,
            root: get_block_root(state, current_epoch)?,
        };
        set_bit(&mut state.justification_bits, 0);
    }

    // Finalization
    let bits = &state.justification_bits;

    // The 2nd/3rd/4th most recent epochs are justified, the 4th is the source
    if all_set(bits, 1..4) && old_previous_justified.epoch + 3 == current_epoch {
        state.finalized_checkpoint = old_previous_justified;
    }
    // The 2nd/3rd most recent epochs are justified, the 3rd is the source
    if all_set(bits, 1..3) && old_previous_justified.epoch + 2 == current_epoch {
        state.finalized_checkpoint = old_previous_justified;
    }
    // The 1st/2nd/3rd most recent epochs are justified, the 3rd is the source
    if all_set(bits, 0..3) && old_current_justified.epoch + 2 == current_epoch {
        state.finalized_checkpoint = old_current_justified;
    }
    // The 1st/2nd most recent epochs are justified, the 2nd is the source
    if all_set(bits, 0..2) && old_current_justified.epoch + 1 == current_epoch {
        state.finalized_checkpoint = old_current_justified;
    }

    Ok(())
}

fn shift_justification_bits(bits: &mut BitVector<JustificationBitsLength>) {
    let mut shifted = BitVector::new();
    for i in 0..3 {
        if bits.get(i).unwrap_or(false) {
            shifted.set(i + 1, true).expect("index is within the vector");
        }
    }
    *bits = shifted;
}

fn set_bit(bits: &mut BitVector<JustificationBitsLength>, i: usize) {
    bits.set(i, true).expect("index is within the vector");
}

fn all_set(bits: &BitVector<JustificationBitsLength>, range: core::ops::Range<usize>) -> bool {
    range.into_iter().all(|i| bits.get(i).unwrap_or(false))
}

/// Promotes deposited validators into the activation queue and ejects those
/// whose balance fell too low, both bounded by churn.
fn process_registry_updates<C: Config>(state: &mut BeaconState<C>) -> Result<(), Error> {
    let current_epoch = get_current_epoch(state);

    let is_eligible = |validator: &Validator| {
        validator.activation_eligibility_epoch == C::far_future_epoch()
            && validator.effective_balance == C::max_effective_balance()
    };
    let is_exiting = |validator: &Validator| {
        is_active_validator(validator, current_epoch)
            && validator.effective_balance <= C::ejection_balance()
    };

    let mut eligible = vec![];
    let mut exiting = vec![];
    for (index, validator) in state.validators.iter().enumerate() {
        if is_eligible(validator) {
            eligible.push(index);
        }
        if is_exiting(validator) {
            exiting.push(index as u64);
        }
    }

    for index in eligible {
        state.validators[index].activation_eligibility_epoch = current_epoch;
    }
    for index in exiting {
        initiate_validator_exit(state, index)?;
    }

    // Queue validators eligible for activation and not dequeued for
    // activation prior to the finalized epoch
    let activation_queue = state
        .validators
        .iter()
        .enumerate()
        .filter(|(_, validator)| {
            validator.activation_eligibility_epoch != C::far_future_epoch()
                && validator.activation_epoch
                    >= compute_activation_exit_epoch::<C>(state.finalized_checkpoint.epoch)
        })
        .sorted_by_key(|(_, validator)| validator.activation_eligibility_epoch)
        .map(|(index, _)| index)
        .collect_vec();

    // Dequeue up to the churn limit (without resetting activation epochs)
    let churn_limit = get_validator_churn_limit(state) as usize;
    let delayed_activation_epoch = compute_activation_exit_epoch::<C>(current_epoch);
    for index in activation_queue.into_iter().take(churn_limit) {
        let validator = &mut state.validators[index];
        if validator.activation_epoch == C::far_future_epoch() {
            validator.activation_epoch = delayed_activation_epoch;
        }
    }

    Ok(())
}

/// Applies the correlated slashing penalty to validators at the midpoint of
/// their withdrawability delay.
fn process_slashings<C: Config>(state: &mut BeaconState<C>) -> Result<(), Error> {
    let epoch = get_current_epoch(state);
    let total_balance = get_total_active_balance(state)?;
    let slashings_sum: Gwei = state.slashings.iter().sum();

    let mut penalties = vec![];
    for (index, validator) in state.validators.iter().enumerate() {
        if validator.slashed
            && epoch + C::epochs_per_slashings_vector() / 2 == validator.withdrawable_epoch
        {
            let increment = C::effective_balance_increment();
            let penalty_numerator = validator.effective_balance / increment
                * cmp::min(slashings_sum * 3, total_balance);
            let penalty = penalty_numerator / total_balance * increment;
            penalties.push((index as u64, penalty));
        }
    }

    for (index, penalty) in penalties {
        decrease_balance(state, index, penalty)?;
    }

    Ok(())
}

/// Ring rotations, hysteresis and accumulator swaps that close out an epoch.
fn process_final_updates<C: Config>(state: &mut BeaconState<C>) -> Result<(), Error> {
    let current_epoch = get_current_epoch(state);
    let next_epoch: Epoch = current_epoch + 1;

    // Reset eth1 data votes
    if (state.slot + 1) % C::slots_per_eth1_voting_period() == 0 {
        state.eth1_data_votes = VariableList::default();
    }

    // Update effective balances with hysteresis
    for (index, validator) in state.validators.iter_mut().enumerate() {
        let balance = state.balances[index];
        let half_increment = C::effective_balance_increment() / 2;
        if balance < validator.effective_balance
            || validator.effective_balance + 3 * half_increment < balance
        {
            validator.effective_balance = cmp::min(
                balance - balance % C::effective_balance_increment(),
                C::max_effective_balance(),
            );
        }
    }

    // Reset slashings
    state.slashings[(next_epoch % C::epochs_per_slashings_vector()) as usize] = 0;

    // Set randao mix
    state.randao_mixes[(next_epoch % C::epochs_per_historical_vector()) as usize] =
        get_randao_mix(state, current_epoch)?;

    // Set historical root accumulator
    if next_epoch % (C::slots_per_historical_root() / C::slots_per_epoch()) == 0 {
        let historical_batch = HistoricalBatch::<C> {
            block_roots: state.block_roots.clone(),
            state_roots: state.state_roots.clone(),
        };
        state
            .historical_roots
            .push(hash_tree_root(&historical_batch))
            .map_err(|_| Error::AccumulatorFull)?;
    }

    // Rotate current/previous epoch attestations
    state.previous_epoch_attestations =
        mem::replace(&mut state.current_epoch_attestations, VariableList::default());

    Ok(())
}

#[cfg(test)]
mod tests {
    use ssz_new::VariableList;
    use types::config::MinimalConfig;

    use super::*;

    fn active_validator(effective_balance: Gwei) -> Validator {
        Validator {
            effective_balance,
            activation_epoch: 0,
            ..Validator::default()
        }
    }

    fn state_at_slot(slot: u64, count: usize) -> BeaconState<MinimalConfig> {
        BeaconState {
            slot,
            validators: VariableList::new(vec![active_validator(32_000_000_000); count])
                .expect("within bound"),
            balances: VariableList::new(vec![32_000_000_000; count]).expect("within bound"),
            ..BeaconState::default()
        }
    }

    #[test]
    fn justification_is_skipped_near_genesis() {
        let mut state = state_at_slot(8, 4);
        let before = state.clone();

        process_justification_and_finalization(&mut state)
            .expect("the early-epoch shortcut applies");
        assert_eq!(state, before);
    }

    #[test]
    fn justification_bits_shift_towards_older_epochs() {
        let mut bits: BitVector<JustificationBitsLength> = BitVector::new();
        bits.set(0, true).expect("in range");

        shift_justification_bits(&mut bits);
        assert_eq!(bits.get(0), Ok(false));
        assert_eq!(bits.get(1), Ok(true));

        shift_justification_bits(&mut bits);
        assert_eq!(bits.get(2), Ok(true));
    }

    /// Pending attestations for the boundary of the previous epoch covering
    /// the first `committees` committees fully, plus `extra` members of the
    /// following committee.
    fn boundary_attestations(
        state: &BeaconState<MinimalConfig>,
        committees: u64,
        extra: usize,
    ) -> Vec<types::types::PendingAttestation<MinimalConfig>> {
        use helper_functions::beacon_state_accessors::get_beacon_committee;

        let epoch_start = 8;
        let mut attestations = vec![];
        for i in 0..=committees {
            let slot = epoch_start + i;
            let committee = get_beacon_committee(state, slot, 0).expect("the committee exists");

            let set_bits = if i < committees { committee.len() } else { extra };
            if set_bits == 0 {
                continue;
            }

            let mut bits = ssz_new::BitList::with_capacity(committee.len())
                .expect("committees fit in the bound");
            for bit in 0..set_bits {
                bits.set(bit, true).expect("in range");
            }

            attestations.push(types::types::PendingAttestation {
                aggregation_bits: bits,
                data: types::types::AttestationData {
                    slot,
                    index: 0,
                    ..types::types::AttestationData::default()
                },
                inclusion_delay: 1,
                proposer_index: 0,
            });
        }
        attestations
    }

    #[test]
    fn justification_requires_two_thirds_of_the_stake() {
        // 24 validators, 8 committees of 3 in the previous epoch. Exactly
        // two thirds of the stake is 16 validators.
        let mut state = state_at_slot(23, 24);

        // 15 attesting validators fall short.
        let attestations = boundary_attestations(&state, 5, 0);
        for attestation in attestations {
            state
                .previous_epoch_attestations
                .push(attestation)
                .expect("within bound");
        }
        let mut short = state.clone();
        process_justification_and_finalization(&mut short).expect("processing is valid");
        assert_eq!(short.current_justified_checkpoint.epoch, 0);

        // One more validator reaches exactly two thirds and justifies.
        state.previous_epoch_attestations = VariableList::default();
        for attestation in boundary_attestations(&state, 5, 1) {
            state
                .previous_epoch_attestations
                .push(attestation)
                .expect("within bound");
        }
        process_justification_and_finalization(&mut state).expect("processing is valid");
        assert_eq!(state.current_justified_checkpoint.epoch, 1);
        assert_eq!(state.finalized_checkpoint.epoch, 0);
    }

    #[test]
    fn deposited_validators_become_eligible() {
        let mut state = state_at_slot(8, 4);
        state
            .validators
            .push(Validator {
                effective_balance: 32_000_000_000,
                ..Validator::default()
            })
            .expect("within bound");
        state.balances.push(32_000_000_000).expect("within bound");

        process_registry_updates(&mut state).expect("registry update is valid");

        assert_eq!(state.validators[4].activation_eligibility_epoch, 1);
        assert_ne!(
            state.validators[4].activation_epoch,
            MinimalConfig::far_future_epoch()
        );
    }

    #[test]
    fn low_balance_validators_are_ejected() {
        let mut state = state_at_slot(8, 4);
        state.validators[2].effective_balance = MinimalConfig::ejection_balance();

        process_registry_updates(&mut state).expect("registry update is valid");

        assert_ne!(
            state.validators[2].exit_epoch,
            MinimalConfig::far_future_epoch()
        );
    }

    #[test]
    fn effective_balance_hysteresis() {
        let mut state = state_at_slot(15, 4);
        // Far below the effective balance: drops.
        state.balances[0] = 20_000_000_000;
        // Slightly above: stays.
        state.balances[1] = 32_400_000_000;

        process_final_updates(&mut state).expect("final updates are valid");

        assert_eq!(state.validators[0].effective_balance, 20_000_000_000);
        assert_eq!(state.validators[1].effective_balance, 32_000_000_000);
    }

    #[test]
    fn attestation_accumulators_swap() {
        let mut state = state_at_slot(15, 4);
        let pending = types::types::PendingAttestation::<MinimalConfig> {
            aggregation_bits: ssz_new::BitList::with_capacity(4).expect("within bound"),
            data: Default::default(),
            inclusion_delay: 1,
            proposer_index: 0,
        };
        state
            .current_epoch_attestations
            .push(pending)
            .expect("within bound");

        process_final_updates(&mut state).expect("final updates are valid");

        assert_eq!(state.previous_epoch_attestations.len(), 1);
        assert!(state.current_epoch_attestations.is_empty());
    }

    #[test]
    fn slashings_ring_slot_for_next_epoch_is_cleared() {
        let mut state = state_at_slot(15, 4);
        let next_index =
            ((get_current_epoch(&state) + 1) % MinimalConfig::epochs_per_slashings_vector()) as usize;
        state.slashings[next_index] = 55;

        process_final_updates(&mut state).expect("final updates are valid");
        assert_eq!(state.slashings[next_index], 0);
    }
}
