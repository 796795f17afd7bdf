use core::convert::TryFrom;
use std::cmp;

use typenum::Unsigned;
use types::beacon_state::BeaconState;
use types::config::Config;
use types::primitives::*;

use crate::beacon_state_accessors::{
    get_beacon_proposer_index, get_current_epoch, get_validator_churn_limit,
};
use crate::error::Error;
use crate::misc::compute_activation_exit_epoch;

pub fn increase_balance<C: Config>(
    state: &mut BeaconState<C>,
    index: ValidatorIndex,
    delta: Gwei,
) -> Result<(), Error> {
    let index = usize::try_from(index).map_err(|_| Error::IndexOutOfRange)?;
    let balance = state
        .balances
        .iter_mut()
        .nth(index)
        .ok_or(Error::IndexOutOfRange)?;
    *balance += delta;
    Ok(())
}

pub fn decrease_balance<C: Config>(
    state: &mut BeaconState<C>,
    index: ValidatorIndex,
    delta: Gwei,
) -> Result<(), Error> {
    let index = usize::try_from(index).map_err(|_| Error::IndexOutOfRange)?;
    let balance = state
        .balances
        .iter_mut()
        .nth(index)
        .ok_or(Error::IndexOutOfRange)?;
    *balance = balance.saturating_sub(delta);
    Ok(())
}

/// Queues a validator for exit behind the churn limit.
pub fn initiate_validator_exit<C: Config>(
    state: &mut BeaconState<C>,
    index: ValidatorIndex,
) -> Result<(), Error> {
    let index = usize::try_from(index).map_err(|_| Error::IndexOutOfRange)?;
    if state.validators.get(index).ok_or(Error::IndexOutOfRange)?.exit_epoch
        != C::far_future_epoch()
    {
        // Exit already initiated; initiating again must not postpone it.
        return Ok(());
    }

    let mut exit_queue_epoch = state
        .validators
        .iter()
        .map(|validator| validator.exit_epoch)
        .filter(|epoch| *epoch != C::far_future_epoch())
        .max()
        .unwrap_or(0);
    exit_queue_epoch = cmp::max(
        exit_queue_epoch,
        compute_activation_exit_epoch::<C>(get_current_epoch(state)),
    );

    let exit_queue_churn = state
        .validators
        .iter()
        .filter(|validator| validator.exit_epoch == exit_queue_epoch)
        .count() as u64;
    if exit_queue_churn >= get_validator_churn_limit(state) {
        exit_queue_epoch += 1;
    }

    let validator = &mut state.validators[index];
    validator.exit_epoch = exit_queue_epoch;
    validator.withdrawable_epoch = exit_queue_epoch + C::min_validator_withdrawability_delay();

    Ok(())
}

/// Slashes a validator: forced exit, a flat penalty into the slashings ring,
/// and rewards for the proposer and the whistleblower (the proposer when no
/// separate whistleblower is named).
pub fn slash_validator<C: Config>(
    state: &mut BeaconState<C>,
    slashed_index: ValidatorIndex,
    whistleblower_index: Option<ValidatorIndex>,
) -> Result<(), Error> {
    initiate_validator_exit(state, slashed_index)?;

    let epoch = get_current_epoch(state);
    let index = usize::try_from(slashed_index).map_err(|_| Error::IndexOutOfRange)?;

    let effective_balance = {
        let validator = &mut state.validators[index];
        validator.slashed = true;
        validator.withdrawable_epoch = cmp::max(
            validator.withdrawable_epoch,
            epoch + C::EpochsPerSlashingsVector::to_u64(),
        );
        validator.effective_balance
    };

    let slashings_index = (epoch % C::EpochsPerSlashingsVector::to_u64()) as usize;
    state.slashings[slashings_index] += effective_balance;
    decrease_balance(
        state,
        slashed_index,
        effective_balance / C::min_slashing_penalty_quotient(),
    )?;

    let proposer_index = get_beacon_proposer_index(state)?;
    let whistleblower_reward = effective_balance / C::whistleblower_reward_quotient();

    match whistleblower_index {
        None => increase_balance(state, proposer_index, whistleblower_reward)?,
        Some(whistleblower_index) => {
            let proposer_reward = whistleblower_reward / C::proposer_reward_quotient();
            increase_balance(state, proposer_index, proposer_reward)?;
            increase_balance(
                state,
                whistleblower_index,
                whistleblower_reward - proposer_reward,
            )?;
        }
    }

    Ok(())
}
