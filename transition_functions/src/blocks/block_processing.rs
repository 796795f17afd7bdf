use std::cmp;
use std::collections::BTreeSet;

use helper_functions::beacon_state_accessors::{
    get_beacon_committee, get_beacon_proposer_index, get_committee_count_at_slot,
    get_current_epoch, get_domain, get_indexed_attestation, get_previous_epoch, get_randao_mix,
};
use helper_functions::beacon_state_mutators::{
    increase_balance, initiate_validator_exit, slash_validator,
};
use helper_functions::crypto::{bls_verify, hash, hash_tree_root, signed_root};
use helper_functions::math::xor;
use helper_functions::misc::{compute_domain, compute_epoch_at_slot};
use helper_functions::predicates::{
    is_active_validator, is_slashable_attestation_data, is_slashable_validator,
    is_valid_merkle_branch, validate_indexed_attestation,
};
use types::beacon_state::BeaconState;
use types::config::Config;
use types::consts::DEPOSIT_CONTRACT_TREE_DEPTH;
use types::primitives::{ValidatorIndex, Version, H256};
use types::types::{
    Attestation, AttesterSlashing, BeaconBlock, BeaconBlockBody, Deposit, PendingAttestation,
    ProposerSlashing, Validator, VoluntaryExit,
};

use crate::error::Error;

/// Applies a block to a state already advanced to the block's slot. Stages
/// run in the mandated order and the first failure aborts the whole block.
pub fn process_block<C: Config>(
    state: &mut BeaconState<C>,
    block: &BeaconBlock<C>,
) -> Result<(), Error> {
    process_block_header(state, block)?;
    process_randao(state, &block.body)?;
    process_eth1_data(state, &block.body)?;
    process_operations(state, &block.body)?;
    Ok(())
}

fn process_block_header<C: Config>(
    state: &mut BeaconState<C>,
    block: &BeaconBlock<C>,
) -> Result<(), Error> {
    if block.slot != state.slot {
        return Err(Error::HeaderSlotMismatch {
            state_slot: state.slot,
            block_slot: block.slot,
        });
    }

    let expected_parent_root = signed_root(&state.latest_block_header);
    if block.parent_root != expected_parent_root {
        return Err(Error::ParentRootMismatch {
            expected: expected_parent_root,
            in_block: block.parent_root,
        });
    }

    state.latest_block_header = block.temporary_block_header();

    let proposer_index = get_beacon_proposer_index(state)?;
    let proposer = &state.validators[proposer_index as usize];
    if proposer.slashed {
        return Err(Error::ProposerSlashed {
            index: proposer_index,
        });
    }

    if !bls_verify::<C>(
        &proposer.pubkey,
        signed_root(block).as_bytes(),
        &block.signature,
        get_domain(state, C::domain_beacon_proposer(), None),
    )? {
        return Err(Error::SignatureInvalid { context: "block" });
    }

    Ok(())
}

fn process_randao<C: Config>(
    state: &mut BeaconState<C>,
    body: &BeaconBlockBody<C>,
) -> Result<(), Error> {
    let epoch = get_current_epoch(state);
    let proposer = &state.validators[get_beacon_proposer_index(state)? as usize];

    if !bls_verify::<C>(
        &proposer.pubkey,
        hash_tree_root(&epoch).as_bytes(),
        &body.randao_reveal,
        get_domain(state, C::domain_randao(), None),
    )? {
        return Err(Error::SignatureInvalid {
            context: "randao reveal",
        });
    }

    let mix = xor(
        get_randao_mix(state, epoch)?.as_bytes(),
        &hash(body.randao_reveal.as_bytes()),
    )
    .map_err(Error::Helper)?;
    state.randao_mixes[(epoch % C::epochs_per_historical_vector()) as usize] =
        H256::from_slice(&mix);

    Ok(())
}

fn process_eth1_data<C: Config>(
    state: &mut BeaconState<C>,
    body: &BeaconBlockBody<C>,
) -> Result<(), Error> {
    state
        .eth1_data_votes
        .push(body.eth1_data.clone())
        .map_err(|_| Error::VoteWindowFull)?;

    let num_votes = state
        .eth1_data_votes
        .iter()
        .filter(|vote| **vote == body.eth1_data)
        .count();

    if num_votes * 2 > C::slots_per_eth1_voting_period() as usize {
        state.eth1_data = body.eth1_data.clone();
    }

    Ok(())
}

fn process_operations<C: Config>(
    state: &mut BeaconState<C>,
    body: &BeaconBlockBody<C>,
) -> Result<(), Error> {
    // Outstanding deposits must be processed up to the per-block maximum.
    let expected_deposits = cmp::min(
        C::max_deposits(),
        state.eth1_data.deposit_count - state.eth1_deposit_index,
    ) as usize;
    if body.deposits.len() != expected_deposits {
        return Err(Error::DepositCountMismatch {
            expected: expected_deposits,
            in_block: body.deposits.len(),
        });
    }

    for proposer_slashing in body.proposer_slashings.iter() {
        process_proposer_slashing(state, proposer_slashing)?;
    }
    for attester_slashing in body.attester_slashings.iter() {
        process_attester_slashing(state, attester_slashing)?;
    }
    for attestation in body.attestations.iter() {
        process_attestation(state, attestation)?;
    }
    for deposit in body.deposits.iter() {
        process_deposit(state, deposit)?;
    }
    for voluntary_exit in body.voluntary_exits.iter() {
        process_voluntary_exit(state, voluntary_exit)?;
    }

    Ok(())
}

fn process_proposer_slashing<C: Config>(
    state: &mut BeaconState<C>,
    proposer_slashing: &ProposerSlashing,
) -> Result<(), Error> {
    let index = proposer_slashing.proposer_index;
    let proposer = state
        .validators
        .get(index as usize)
        .ok_or(Error::Helper(helper_functions::Error::IndexOutOfRange))?;

    if proposer_slashing.header_1.slot != proposer_slashing.header_2.slot {
        return Err(Error::SlashingHeaderSlotMismatch);
    }
    if proposer_slashing.header_1 == proposer_slashing.header_2 {
        return Err(Error::SlashingHeadersIdentical);
    }
    if !is_slashable_validator(proposer, get_current_epoch(state)) {
        return Err(Error::NotSlashable { index });
    }

    for header in &[&proposer_slashing.header_1, &proposer_slashing.header_2] {
        let domain = get_domain(
            state,
            C::domain_beacon_proposer(),
            Some(compute_epoch_at_slot::<C>(header.slot)),
        );
        if !bls_verify::<C>(
            &proposer.pubkey,
            signed_root(*header).as_bytes(),
            &header.signature,
            domain,
        )? {
            return Err(Error::SignatureInvalid {
                context: "proposer slashing header",
            });
        }
    }

    slash_validator(state, index, None)?;
    Ok(())
}

fn process_attester_slashing<C: Config>(
    state: &mut BeaconState<C>,
    attester_slashing: &AttesterSlashing<C>,
) -> Result<(), Error> {
    let attestation_1 = &attester_slashing.attestation_1;
    let attestation_2 = &attester_slashing.attestation_2;

    if !is_slashable_attestation_data(&attestation_1.data, &attestation_2.data) {
        return Err(Error::AttestationsNotSlashable);
    }
    validate_indexed_attestation(state, attestation_1, true)?;
    validate_indexed_attestation(state, attestation_2, true)?;

    let indices_1: BTreeSet<ValidatorIndex> =
        attestation_1.attesting_indices.iter().copied().collect();
    let indices_2: BTreeSet<ValidatorIndex> =
        attestation_2.attesting_indices.iter().copied().collect();

    let mut slashed_any = false;
    for index in &indices_1 & &indices_2 {
        if is_slashable_validator(&state.validators[index as usize], get_current_epoch(state)) {
            slash_validator(state, index, None)?;
            slashed_any = true;
        }
    }

    if !slashed_any {
        return Err(Error::NoSlashableIndices);
    }
    Ok(())
}

fn process_attestation<C: Config>(
    state: &mut BeaconState<C>,
    attestation: &Attestation<C>,
) -> Result<(), Error> {
    let data = &attestation.data;

    if data.index >= get_committee_count_at_slot(state, data.slot) {
        return Err(Error::CommitteeIndexInvalid);
    }
    if data.target.epoch != get_previous_epoch(state)
        && data.target.epoch != get_current_epoch(state)
    {
        return Err(Error::TargetEpochInvalid {
            target: data.target.epoch,
            current: get_current_epoch(state),
        });
    }
    if !(data.slot + C::min_attestation_inclusion_delay() <= state.slot
        && state.slot <= data.slot + C::slots_per_epoch())
    {
        return Err(Error::InclusionWindowInvalid {
            attestation_slot: data.slot,
            state_slot: state.slot,
        });
    }

    let committee = get_beacon_committee(state, data.slot, data.index)?;
    if attestation.aggregation_bits.len() != committee.len() {
        return Err(Error::BitsMismatch);
    }

    let pending_attestation = PendingAttestation {
        aggregation_bits: attestation.aggregation_bits.clone(),
        data: attestation.data.clone(),
        inclusion_delay: state.slot - data.slot,
        proposer_index: get_beacon_proposer_index(state)?,
    };

    if data.target.epoch == get_current_epoch(state) {
        if data.source != state.current_justified_checkpoint {
            return Err(Error::SourceMismatch);
        }
        state
            .current_epoch_attestations
            .push(pending_attestation)
            .map_err(|_| Error::AccumulatorFull)?;
    } else {
        if data.source != state.previous_justified_checkpoint {
            return Err(Error::SourceMismatch);
        }
        state
            .previous_epoch_attestations
            .push(pending_attestation)
            .map_err(|_| Error::AccumulatorFull)?;
    }

    let indexed_attestation = get_indexed_attestation(state, attestation)?;
    validate_indexed_attestation(state, &indexed_attestation, true)?;

    Ok(())
}

fn process_deposit<C: Config>(state: &mut BeaconState<C>, deposit: &Deposit) -> Result<(), Error> {
    let deposit_index = state.eth1_deposit_index;

    if !is_valid_merkle_branch(
        &hash_tree_root(&deposit.data),
        &deposit.proof,
        DEPOSIT_CONTRACT_TREE_DEPTH + 1,
        deposit_index,
        &state.eth1_data.deposit_root,
    ) {
        return Err(Error::DepositProofInvalid {
            index: deposit_index,
        });
    }

    // Deposits must be processed in order
    state.eth1_deposit_index += 1;

    let pubkey = deposit.data.pubkey;
    let amount = deposit.data.amount;

    if let Some(index) = state
        .validators
        .iter()
        .position(|validator| validator.pubkey == pubkey)
    {
        // A top-up for a known validator.
        increase_balance(state, index as u64, amount)?;
        return Ok(());
    }

    // Verify the deposit signature (proof of possession). The deposit
    // contract does not check signatures, so an invalid one only voids this
    // deposit rather than the block.
    if C::bls_verify_proof_of_possession() {
        let domain = compute_domain::<C>(C::domain_deposit(), Version::default());
        if !bls_verify::<C>(
            &pubkey,
            signed_root(&deposit.data).as_bytes(),
            &deposit.data.signature,
            domain,
        )? {
            return Ok(());
        }
    }

    // New validators become eligible for activation from the next epoch.
    let current_epoch = get_current_epoch(state);
    state
        .validators
        .push(Validator {
            pubkey,
            withdrawal_credentials: deposit.data.withdrawal_credentials,
            effective_balance: cmp::min(
                amount - amount % C::effective_balance_increment(),
                C::max_effective_balance(),
            ),
            slashed: false,
            activation_eligibility_epoch: current_epoch + 1,
            activation_epoch: C::far_future_epoch(),
            exit_epoch: C::far_future_epoch(),
            withdrawable_epoch: C::far_future_epoch(),
        })
        .map_err(|_| Error::RegistryFull)?;
    state.balances.push(amount).map_err(|_| Error::RegistryFull)?;

    Ok(())
}

fn process_voluntary_exit<C: Config>(
    state: &mut BeaconState<C>,
    exit: &VoluntaryExit,
) -> Result<(), Error> {
    let validator = state
        .validators
        .get(exit.validator_index as usize)
        .ok_or(Error::Helper(helper_functions::Error::IndexOutOfRange))?;
    let current_epoch = get_current_epoch(state);

    if !is_active_validator(validator, current_epoch) {
        return Err(Error::ExitValidatorNotActive);
    }
    if validator.exit_epoch != C::far_future_epoch() {
        return Err(Error::ExitAlreadyInitiated);
    }
    if current_epoch < exit.epoch {
        return Err(Error::ExitNotYetValid {
            valid_from: exit.epoch,
        });
    }
    if current_epoch < validator.activation_epoch + C::shard_committee_period() {
        return Err(Error::ExitTooEarly);
    }

    let domain = get_domain(state, C::domain_voluntary_exit(), Some(exit.epoch));
    if !bls_verify::<C>(
        &validator.pubkey,
        signed_root(exit).as_bytes(),
        &exit.signature,
        domain,
    )? {
        return Err(Error::SignatureInvalid {
            context: "voluntary exit",
        });
    }

    initiate_validator_exit(state, exit.validator_index)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use bls::{SecretKey, SignatureBytes};
    use helper_functions::crypto::hash_tree_root;
    use ssz_new::VariableList;
    use types::config::MinimalConfig;
    use types::primitives::PublicKeyBytes;
    use types::types::{BeaconBlockHeader, Checkpoint, Eth1Data};

    use super::*;

    type C = MinimalConfig;

    fn validator_with_pubkey(pubkey: PublicKeyBytes) -> Validator {
        Validator {
            pubkey,
            effective_balance: 32_000_000_000,
            activation_epoch: 0,
            ..Validator::default()
        }
    }

    fn test_state(count: u8) -> BeaconState<C> {
        let validators: Vec<Validator> = (0..count)
            .map(|i| {
                let secret_key = SecretKey::from_bytes(&[i + 1; 48]).expect("correct length");
                let pubkey = PublicKeyBytes::from_bytes(
                    bls::PublicKey::from_secret_key(&secret_key).as_bytes(),
                )
                .expect("correct length");
                validator_with_pubkey(pubkey)
            })
            .collect();

        BeaconState {
            validators: VariableList::new(validators).expect("within bound"),
            balances: VariableList::new(vec![32_000_000_000; count as usize])
                .expect("within bound"),
            ..BeaconState::default()
        }
    }

    fn nonempty_signature() -> SignatureBytes {
        SignatureBytes::from_bytes(&[1; 96]).expect("correct length")
    }

    #[test]
    fn header_requires_the_matching_slot() {
        let mut state = test_state(4);
        let block = BeaconBlock::<C> {
            slot: 3,
            ..BeaconBlock::default()
        };

        assert_eq!(
            process_block_header(&mut state, &block),
            Err(Error::HeaderSlotMismatch {
                state_slot: 0,
                block_slot: 3
            })
        );
    }

    #[test]
    fn header_requires_the_matching_parent_root() {
        let mut state = test_state(4);
        let block = BeaconBlock::<C> {
            parent_root: H256::from([0xab; 32]),
            signature: nonempty_signature(),
            ..BeaconBlock::default()
        };

        match process_block_header(&mut state, &block) {
            Err(Error::ParentRootMismatch { .. }) => {}
            other => panic!("expected a parent root mismatch, got {:?}", other),
        }
    }

    #[test]
    fn header_is_stored_with_a_zeroed_state_root() {
        let mut state = test_state(4);
        let block = BeaconBlock::<C> {
            parent_root: signed_root(&state.latest_block_header),
            signature: nonempty_signature(),
            ..BeaconBlock::default()
        };

        process_block_header(&mut state, &block).expect("the header is valid");

        assert_eq!(state.latest_block_header.state_root, H256::zero());
        assert_eq!(
            state.latest_block_header.body_root,
            hash_tree_root(&block.body)
        );
    }

    #[test]
    fn randao_reveal_is_mixed_into_the_ring() {
        let mut state = test_state(4);
        let body = BeaconBlockBody::<C> {
            randao_reveal: nonempty_signature(),
            ..BeaconBlockBody::default()
        };

        let mix_before = state.randao_mixes[0];
        process_randao(&mut state, &body).expect("the reveal is well-formed");
        assert_ne!(state.randao_mixes[0], mix_before);
    }

    #[test]
    fn empty_randao_reveal_is_rejected() {
        let mut state = test_state(4);
        let body = BeaconBlockBody::<C>::default();

        assert_eq!(
            process_randao(&mut state, &body),
            Err(Error::SignatureInvalid {
                context: "randao reveal"
            })
        );
    }

    #[test]
    fn eth1_data_needs_a_majority_of_the_window() {
        let mut state = test_state(4);
        let vote = Eth1Data {
            deposit_root: H256::from([1; 32]),
            deposit_count: 9,
            block_hash: H256::from([2; 32]),
        };

        let body = BeaconBlockBody::<C> {
            eth1_data: vote.clone(),
            ..BeaconBlockBody::default()
        };

        // Half of the 16-slot window is not enough.
        for _ in 0..8 {
            process_eth1_data(&mut state, &body).expect("window has room");
        }
        assert_ne!(state.eth1_data, vote);

        process_eth1_data(&mut state, &body).expect("window has room");
        assert_eq!(state.eth1_data, vote);
    }

    #[test]
    fn unexpected_deposit_count_fails_the_block() {
        let mut state = test_state(4);
        state.eth1_data.deposit_count = 5;
        state.eth1_deposit_index = 4;

        let body = BeaconBlockBody::<C>::default();
        assert_eq!(
            process_operations(&mut state, &body),
            Err(Error::DepositCountMismatch {
                expected: 1,
                in_block: 0
            })
        );
    }

    fn slashable_headers(proposer_index: u64) -> ProposerSlashing {
        let header_1 = BeaconBlockHeader {
            slot: 0,
            parent_root: H256::from([0xaa; 32]),
            body_root: H256::from([1; 32]),
            signature: nonempty_signature(),
            ..BeaconBlockHeader::default()
        };
        let header_2 = BeaconBlockHeader {
            body_root: H256::from([2; 32]),
            ..header_1.clone()
        };

        ProposerSlashing {
            proposer_index,
            header_1,
            header_2,
        }
    }

    #[test]
    fn proposer_slashing_penalizes_the_proposer() {
        let mut state = test_state(8);
        let slashing = slashable_headers(3);

        let balance_before = state.balances[3];
        process_proposer_slashing(&mut state, &slashing).expect("the slashing is valid");

        assert!(state.validators[3].slashed);
        assert_eq!(
            state.balances[3],
            balance_before - 32_000_000_000 / C::min_slashing_penalty_quotient()
        );
        assert_eq!(state.slashings.iter().sum::<u64>(), 32_000_000_000);

        // The block proposer earned the whistleblower reward.
        let proposer =
            get_beacon_proposer_index(&state).expect("active validators exist") as usize;
        if proposer != 3 {
            assert_eq!(
                state.balances[proposer],
                32_000_000_000 + 32_000_000_000 / C::whistleblower_reward_quotient()
            );
        }
    }

    #[test]
    fn identical_headers_are_not_slashable() {
        let mut state = test_state(8);
        let mut slashing = slashable_headers(3);
        slashing.header_2 = slashing.header_1.clone();

        assert_eq!(
            process_proposer_slashing(&mut state, &slashing),
            Err(Error::SlashingHeadersIdentical)
        );
    }

    #[test]
    fn double_slashing_the_same_proposer_fails() {
        let mut state = test_state(8);
        let slashing = slashable_headers(3);

        process_proposer_slashing(&mut state, &slashing).expect("the slashing is valid");
        assert_eq!(
            process_proposer_slashing(&mut state, &slashing),
            Err(Error::NotSlashable { index: 3 })
        );
    }

    fn indexed_attestation(
        indices: Vec<u64>,
        target_root: H256,
    ) -> types::types::IndexedAttestation<C> {
        types::types::IndexedAttestation {
            attesting_indices: VariableList::new(indices).expect("within bound"),
            data: types::types::AttestationData {
                target: Checkpoint {
                    epoch: 0,
                    root: target_root,
                },
                ..types::types::AttestationData::default()
            },
            signature: nonempty_signature(),
        }
    }

    #[test]
    fn attester_slashing_slashes_the_intersection() {
        let mut state = test_state(8);

        let slashing = AttesterSlashing::<C> {
            attestation_1: indexed_attestation(vec![1, 2, 3], H256::from([1; 32])),
            attestation_2: indexed_attestation(vec![2, 3, 4], H256::from([2; 32])),
        };

        let total_effective_before: u64 = state
            .validators
            .iter()
            .filter(|validator| !validator.slashed)
            .map(|validator| validator.effective_balance)
            .sum();

        process_attester_slashing(&mut state, &slashing).expect("the slashing is valid");

        assert!(!state.validators[1].slashed);
        assert!(state.validators[2].slashed);
        assert!(state.validators[3].slashed);
        assert!(!state.validators[4].slashed);

        // The unslashed aggregate stake strictly decreased.
        let total_effective_after: u64 = state
            .validators
            .iter()
            .filter(|validator| !validator.slashed)
            .map(|validator| validator.effective_balance)
            .sum();
        assert!(total_effective_after < total_effective_before);
    }

    #[test]
    fn attester_slashing_requires_conflicting_data() {
        let mut state = test_state(8);

        let same = indexed_attestation(vec![1, 2], H256::from([1; 32]));
        let slashing = AttesterSlashing::<C> {
            attestation_1: same.clone(),
            attestation_2: same,
        };

        assert_eq!(
            process_attester_slashing(&mut state, &slashing),
            Err(Error::AttestationsNotSlashable)
        );
    }

    #[test]
    fn attester_slashing_must_slash_someone() {
        let mut state = test_state(8);
        // The intersection is empty, so nobody can be slashed.
        let slashing = AttesterSlashing::<C> {
            attestation_1: indexed_attestation(vec![1, 2], H256::from([1; 32])),
            attestation_2: indexed_attestation(vec![3, 4], H256::from([2; 32])),
        };

        assert_eq!(
            process_attester_slashing(&mut state, &slashing),
            Err(Error::NoSlashableIndices)
        );
    }

    #[test]
    fn voluntary_exit_requires_seasoning() {
        let mut state = test_state(4);
        let exit = VoluntaryExit {
            epoch: 0,
            validator_index: 1,
            signature: nonempty_signature(),
        };

        // Validators activated at epoch 0 may not exit before the committee
        // period has passed.
        assert_eq!(
            process_voluntary_exit(&mut state, &exit),
            Err(Error::ExitTooEarly)
        );

        state.slot = (C::shard_committee_period() + 1) * C::slots_per_epoch();
        process_voluntary_exit(&mut state, &exit).expect("the exit is valid");
        assert_ne!(state.validators[1].exit_epoch, C::far_future_epoch());

        assert_eq!(
            process_voluntary_exit(&mut state, &exit),
            Err(Error::ExitAlreadyInitiated)
        );
    }
}
