use core::convert::TryFrom;

use helper_functions::beacon_state_accessors::{
    get_attesting_indices, get_current_epoch, get_previous_epoch, get_total_active_balance,
};
use helper_functions::beacon_state_mutators::{decrease_balance, increase_balance};
use helper_functions::math::integer_squareroot;
use helper_functions::predicates::is_active_validator;
use types::beacon_state::BeaconState;
use types::config::Config;
use types::primitives::{Gwei, ValidatorIndex};

use crate::attestations::AttestableBlock;
use crate::error::Error;

pub trait StakeholderBlock<C: Config> {
    fn get_base_reward(&self, index: ValidatorIndex) -> Result<Gwei, Error>;
    fn get_attestation_deltas(&self) -> Result<(Vec<Gwei>, Vec<Gwei>), Error>;
    fn process_rewards_and_penalties(&mut self) -> Result<(), Error>;
}

impl<C: Config> StakeholderBlock<C> for BeaconState<C> {
    fn get_base_reward(&self, index: ValidatorIndex) -> Result<Gwei, Error> {
        let total_balance = get_total_active_balance(self)?;
        let index = usize::try_from(index)
            .map_err(|_| Error::Helper(helper_functions::Error::IndexOutOfRange))?;
        let effective_balance = self
            .validators
            .get(index)
            .ok_or(Error::Helper(helper_functions::Error::IndexOutOfRange))?
            .effective_balance;

        Ok(effective_balance * C::base_reward_factor()
            / integer_squareroot(total_balance)
            / C::base_rewards_per_epoch())
    }

    fn get_attestation_deltas(&self) -> Result<(Vec<Gwei>, Vec<Gwei>), Error> {
        let previous_epoch = get_previous_epoch(self);
        let total_balance = get_total_active_balance(self)?;

        let mut rewards = vec![0 as Gwei; self.validators.len()];
        let mut penalties = vec![0 as Gwei; self.validators.len()];

        let eligible_validator_indices: Vec<ValidatorIndex> = self
            .validators
            .iter()
            .enumerate()
            .filter(|(_, validator)| {
                is_active_validator(validator, previous_epoch)
                    || (validator.slashed && previous_epoch + 1 < validator.withdrawable_epoch)
            })
            .map(|(index, _)| index as ValidatorIndex)
            .collect();

        // Micro-incentives for matching FFG source, FFG target, and head
        let matching_source_attestations =
            self.get_matching_source_attestations(previous_epoch)?;
        let matching_target_attestations =
            self.get_matching_target_attestations(previous_epoch)?;
        let matching_head_attestations = self.get_matching_head_attestations(previous_epoch)?;

        for attestations in &[
            &matching_source_attestations,
            &matching_target_attestations,
            &matching_head_attestations,
        ] {
            let unslashed_attesting_indices = self.get_unslashed_attesting_indices(attestations)?;
            let attesting_balance = self.get_attesting_balance(attestations)?;

            for index in &eligible_validator_indices {
                if unslashed_attesting_indices.contains(index) {
                    rewards[*index as usize] +=
                        self.get_base_reward(*index)? * attesting_balance / total_balance;
                } else {
                    penalties[*index as usize] += self.get_base_reward(*index)?;
                }
            }
        }

        // Proposer and inclusion delay micro-rewards
        for index in self.get_unslashed_attesting_indices(&matching_source_attestations)? {
            let mut earliest: Option<&types::types::PendingAttestation<C>> = None;
            for attestation in &matching_source_attestations {
                if !get_attesting_indices(
                    self,
                    &attestation.data,
                    &attestation.aggregation_bits,
                )?
                .contains(&index)
                {
                    continue;
                }
                earliest = match earliest {
                    Some(best) if best.inclusion_delay <= attestation.inclusion_delay => {
                        Some(best)
                    }
                    _ => Some(attestation),
                };
            }

            let attestation = earliest.expect("the index comes from these attestations");
            let base_reward = self.get_base_reward(index)?;
            let proposer_reward = base_reward / C::proposer_reward_quotient();
            rewards[attestation.proposer_index as usize] += proposer_reward;

            let max_attester_reward = base_reward - proposer_reward;
            rewards[index as usize] += max_attester_reward / attestation.inclusion_delay;
        }

        // Inactivity penalty
        let finality_delay = previous_epoch - self.finalized_checkpoint.epoch;
        if finality_delay > C::min_epochs_to_inactivity_penalty() {
            let matching_target_attesting_indices =
                self.get_unslashed_attesting_indices(&matching_target_attestations)?;

            for index in &eligible_validator_indices {
                penalties[*index as usize] +=
                    C::base_rewards_per_epoch() * self.get_base_reward(*index)?;
                if !matching_target_attesting_indices.contains(index) {
                    penalties[*index as usize] += self.validators[*index as usize]
                        .effective_balance
                        * finality_delay
                        / C::inactivity_penalty_quotient();
                }
            }
        }

        Ok((rewards, penalties))
    }

    fn process_rewards_and_penalties(&mut self) -> Result<(), Error> {
        if get_current_epoch(self) == C::genesis_epoch() {
            return Ok(());
        }

        let (rewards, penalties) = self.get_attestation_deltas()?;
        for index in 0..self.validators.len() {
            increase_balance(self, index as u64, rewards[index])?;
            decrease_balance(self, index as u64, penalties[index])?;
        }

        Ok(())
    }
}
