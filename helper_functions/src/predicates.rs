use core::convert::TryFrom;

use types::beacon_state::BeaconState;
use types::config::Config;
use types::primitives::*;
use types::types::{AttestationData, IndexedAttestation, Validator};
use typenum::Unsigned;

use crate::crypto::{bls_verify_multiple, hash_concat_pair, hash_tree_root};
use crate::error::Error;

pub fn is_active_validator(validator: &Validator, epoch: Epoch) -> bool {
    validator.activation_epoch <= epoch && epoch < validator.exit_epoch
}

pub fn is_slashable_validator(validator: &Validator, epoch: Epoch) -> bool {
    !validator.slashed
        && validator.activation_epoch <= epoch
        && epoch < validator.withdrawable_epoch
}

pub fn is_slashable_attestation_data(data_1: &AttestationData, data_2: &AttestationData) -> bool {
    // Double vote
    (data_1 != data_2 && data_1.target.epoch == data_2.target.epoch) ||
    // Surround vote
    (data_1.source.epoch < data_2.source.epoch && data_2.target.epoch < data_1.target.epoch)
}

/// Checks the index list and, when `verify_signature` is set, the aggregate
/// signature of an indexed attestation.
pub fn validate_indexed_attestation<C: Config>(
    state: &BeaconState<C>,
    indexed_attestation: &IndexedAttestation<C>,
    verify_signature: bool,
) -> Result<(), Error> {
    let indices = &indexed_attestation.attesting_indices;

    if indices.len() > C::MaxValidatorsPerCommittee::to_usize() {
        return Err(Error::IndicesExceedMaxValidators);
    }
    if indices.is_empty() {
        return Err(Error::IndicesEmpty);
    }
    if !indices.windows(2).all(|pair| pair[0] < pair[1]) {
        return Err(Error::IndicesNotSorted);
    }

    let mut pubkeys = Vec::with_capacity(indices.len());
    for index in indices.iter() {
        let index = usize::try_from(*index).map_err(|_| Error::IndexOutOfRange)?;
        let validator = state.validators.get(index).ok_or(Error::IndexOutOfRange)?;
        pubkeys.push(validator.pubkey);
    }

    if verify_signature {
        let message = hash_tree_root(&indexed_attestation.data);
        let domain = crate::beacon_state_accessors::get_domain(
            state,
            C::domain_beacon_attester(),
            Some(indexed_attestation.data.target.epoch),
        );
        if !bls_verify_multiple::<C>(
            &pubkeys,
            message.as_bytes(),
            &indexed_attestation.signature,
            domain,
        )? {
            return Err(Error::InvalidSignature);
        }
    }

    Ok(())
}

/// Verifies a Merkle branch of the given depth against a root, with the leaf
/// at `index` of the bottom layer.
pub fn is_valid_merkle_branch(
    leaf: &H256,
    branch: &[H256],
    depth: u64,
    index: u64,
    root: &H256,
) -> bool {
    if branch.len() < depth as usize {
        return false;
    }

    let mut value = *leaf;
    for i in 0..depth {
        value = if (index >> i) & 1 == 0 {
            hash_concat_pair(&value, &branch[i as usize])
        } else {
            hash_concat_pair(&branch[i as usize], &value)
        };
    }

    value == *root
}
