use std::collections::BTreeSet;

use helper_functions::beacon_state_accessors::{
    get_attesting_indices, get_block_root, get_block_root_at_slot, get_current_epoch,
    get_previous_epoch, get_total_balance,
};
use types::beacon_state::BeaconState;
use types::config::Config;
use types::primitives::{Epoch, Gwei, ValidatorIndex};
use types::types::PendingAttestation;

use crate::error::Error;

/// Views over the pending-attestation accumulators used by justification and
/// by the reward computation.
pub trait AttestableBlock<C: Config> {
    fn get_matching_source_attestations(
        &self,
        epoch: Epoch,
    ) -> Result<Vec<PendingAttestation<C>>, Error>;
    fn get_matching_target_attestations(
        &self,
        epoch: Epoch,
    ) -> Result<Vec<PendingAttestation<C>>, Error>;
    fn get_matching_head_attestations(
        &self,
        epoch: Epoch,
    ) -> Result<Vec<PendingAttestation<C>>, Error>;
    fn get_unslashed_attesting_indices(
        &self,
        attestations: &[PendingAttestation<C>],
    ) -> Result<BTreeSet<ValidatorIndex>, Error>;
    fn get_attesting_balance(
        &self,
        attestations: &[PendingAttestation<C>],
    ) -> Result<Gwei, Error>;
}

impl<C: Config> AttestableBlock<C> for BeaconState<C> {
    fn get_matching_source_attestations(
        &self,
        epoch: Epoch,
    ) -> Result<Vec<PendingAttestation<C>>, Error> {
        if epoch == get_current_epoch(self) {
            Ok(self.current_epoch_attestations.to_vec())
        } else if epoch == get_previous_epoch(self) {
            Ok(self.previous_epoch_attestations.to_vec())
        } else {
            Err(Error::TargetEpochInvalid {
                target: epoch,
                current: get_current_epoch(self),
            })
        }
    }

    fn get_matching_target_attestations(
        &self,
        epoch: Epoch,
    ) -> Result<Vec<PendingAttestation<C>>, Error> {
        let boundary_root = get_block_root(self, epoch)?;
        Ok(self
            .get_matching_source_attestations(epoch)?
            .into_iter()
            .filter(|attestation| attestation.data.target.root == boundary_root)
            .collect())
    }

    fn get_matching_head_attestations(
        &self,
        epoch: Epoch,
    ) -> Result<Vec<PendingAttestation<C>>, Error> {
        let mut head_attestations = vec![];
        for attestation in self.get_matching_source_attestations(epoch)? {
            if attestation.data.beacon_block_root
                == get_block_root_at_slot(self, attestation.data.slot)?
            {
                head_attestations.push(attestation);
            }
        }
        Ok(head_attestations)
    }

    fn get_unslashed_attesting_indices(
        &self,
        attestations: &[PendingAttestation<C>],
    ) -> Result<BTreeSet<ValidatorIndex>, Error> {
        let mut indices = BTreeSet::new();
        for attestation in attestations {
            indices.extend(get_attesting_indices(
                self,
                &attestation.data,
                &attestation.aggregation_bits,
            )?);
        }
        indices.retain(|index| !self.validators[*index as usize].slashed);
        Ok(indices)
    }

    fn get_attesting_balance(
        &self,
        attestations: &[PendingAttestation<C>],
    ) -> Result<Gwei, Error> {
        let indices: Vec<ValidatorIndex> = self
            .get_unslashed_attesting_indices(attestations)?
            .into_iter()
            .collect();
        Ok(get_total_balance(self, &indices)?)
    }
}

#[cfg(test)]
mod tests {
    use types::config::MinimalConfig;

    use super::*;

    #[test]
    fn source_attestations_come_from_the_matching_accumulator() {
        let state = BeaconState::<MinimalConfig> {
            slot: 16,
            ..BeaconState::default()
        };

        assert_eq!(
            state.get_matching_source_attestations(2),
            Ok(vec![])
        );
        assert_eq!(
            state.get_matching_source_attestations(1),
            Ok(vec![])
        );
        assert!(state.get_matching_source_attestations(0).is_err());
    }
}
