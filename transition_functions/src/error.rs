use thiserror::Error;
use types::primitives::{Epoch, Slot, H256};

/// A state transition failure. Any variant other than the bookkeeping
/// conversions means the input block (or a slashing/attestation/deposit/exit
/// inside it) is invalid; the caller discards its scratch state, so no
/// partial effects survive.
#[derive(Debug, PartialEq, Clone, Error)]
pub enum Error {
    #[error("state is at slot {state_slot}, cannot rewind to {target_slot}")]
    SlotsOutOfOrder { state_slot: Slot, target_slot: Slot },
    #[error("state root in block ({in_block:?}) does not match state ({computed:?})")]
    StateRootMismatch { in_block: H256, computed: H256 },

    // Block header
    #[error("block slot {block_slot} does not match state slot {state_slot}")]
    HeaderSlotMismatch { state_slot: Slot, block_slot: Slot },
    #[error("parent root in block ({in_block:?}) does not match state ({expected:?})")]
    ParentRootMismatch { expected: H256, in_block: H256 },
    #[error("proposer {index} is slashed")]
    ProposerSlashed { index: u64 },
    #[error("invalid signature on {context}")]
    SignatureInvalid { context: &'static str },

    // Eth1 data
    #[error("eth1 data vote window is full")]
    VoteWindowFull,

    // Proposer slashings
    #[error("proposer slashing headers are for different slots")]
    SlashingHeaderSlotMismatch,
    #[error("proposer slashing headers are identical")]
    SlashingHeadersIdentical,
    #[error("validator {index} is not slashable")]
    NotSlashable { index: u64 },

    // Attester slashings
    #[error("attestations are not slashable against each other")]
    AttestationsNotSlashable,
    #[error("attester slashing slashed nobody")]
    NoSlashableIndices,

    // Attestations
    #[error("committee index is out of range")]
    CommitteeIndexInvalid,
    #[error("attestation targets epoch {target} from the state's perspective at {current}")]
    TargetEpochInvalid { target: Epoch, current: Epoch },
    #[error("attestation for slot {attestation_slot} is outside the inclusion window at {state_slot}")]
    InclusionWindowInvalid {
        attestation_slot: Slot,
        state_slot: Slot,
    },
    #[error("attestation source does not match the justified checkpoint")]
    SourceMismatch,
    #[error("aggregation bits do not match the committee size")]
    BitsMismatch,
    #[error("the per-epoch attestation accumulator is full")]
    AccumulatorFull,

    // Deposits
    #[error("block contains {in_block} deposits, expected {expected}")]
    DepositCountMismatch { expected: usize, in_block: usize },
    #[error("deposit Merkle proof is invalid at index {index}")]
    DepositProofInvalid { index: u64 },
    #[error("validator registry is full")]
    RegistryFull,

    // Voluntary exits
    #[error("exiting validator is not active")]
    ExitValidatorNotActive,
    #[error("validator has already initiated an exit")]
    ExitAlreadyInitiated,
    #[error("exit is not valid before epoch {valid_from}")]
    ExitNotYetValid { valid_from: Epoch },
    #[error("validator has not been active long enough to exit")]
    ExitTooEarly,

    #[error("helper failure: {0:?}")]
    Helper(helper_functions::Error),
}

impl From<helper_functions::Error> for Error {
    fn from(error: helper_functions::Error) -> Self {
        Error::Helper(error)
    }
}
