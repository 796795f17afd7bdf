use ethereum_types::H256 as Hash256;
use serde::{Deserialize, Serialize};
use ssz_new::{BitList, FixedVector, VariableList};
use ssz_new_derive::{SszDecode, SszEncode};
use tree_hash::{SignedRoot, TreeHash};
use tree_hash_derive::{SignedRoot, TreeHash};
use typenum::{Sum, U1};

use crate::config::Config;
use crate::consts;
use crate::primitives::*;

#[derive(Clone, PartialEq, Debug, Deserialize, Serialize, SszEncode, SszDecode, TreeHash)]
pub struct Attestation<C: Config> {
    pub aggregation_bits: BitList<C::MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub signature: AggregateSignatureBytes,
}

#[derive(
    Clone,
    PartialEq,
    Eq,
    Debug,
    Hash,
    Deserialize,
    Serialize,
    SszEncode,
    SszDecode,
    TreeHash,
    Default,
)]
pub struct AttestationData {
    pub slot: Slot,
    pub index: CommitteeIndex,
    pub beacon_block_root: H256,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

#[derive(Clone, PartialEq, Debug, Deserialize, Serialize, SszEncode, SszDecode, TreeHash)]
pub struct AttesterSlashing<C: Config> {
    pub attestation_1: IndexedAttestation<C>,
    pub attestation_2: IndexedAttestation<C>,
}

#[derive(
    Clone,
    PartialEq,
    Debug,
    Default,
    Deserialize,
    Serialize,
    SszEncode,
    SszDecode,
    TreeHash,
    SignedRoot,
)]
pub struct BeaconBlock<C: Config> {
    pub slot: Slot,
    pub parent_root: H256,
    pub state_root: H256,
    pub body: BeaconBlockBody<C>,
    pub signature: SignatureBytes,
}

impl<C: Config> BeaconBlock<C> {
    pub fn canonical_root(&self) -> Hash256 {
        Hash256::from_slice(&self.signed_root()[..])
    }

    pub fn block_header(&self) -> BeaconBlockHeader {
        BeaconBlockHeader {
            slot: self.slot,
            parent_root: self.parent_root,
            state_root: self.state_root,
            body_root: Hash256::from_slice(&self.body.tree_hash_root()[..]),
            signature: self.signature,
        }
    }

    /// The header stored in the state during block processing: the state
    /// root is zeroed (it is backfilled by the next slot processing) and the
    /// signature is elided.
    pub fn temporary_block_header(&self) -> BeaconBlockHeader {
        BeaconBlockHeader {
            state_root: H256::zero(),
            signature: SignatureBytes::empty(),
            ..self.block_header()
        }
    }
}

#[derive(
    Clone, PartialEq, Debug, Default, Deserialize, Serialize, SszEncode, SszDecode, TreeHash,
)]
pub struct BeaconBlockBody<C: Config> {
    pub randao_reveal: SignatureBytes,
    pub eth1_data: Eth1Data,
    pub graffiti: H256,
    pub proposer_slashings: VariableList<ProposerSlashing, C::MaxProposerSlashings>,
    pub attester_slashings: VariableList<AttesterSlashing<C>, C::MaxAttesterSlashings>,
    pub attestations: VariableList<Attestation<C>, C::MaxAttestations>,
    pub deposits: VariableList<Deposit, C::MaxDeposits>,
    pub voluntary_exits: VariableList<VoluntaryExit, C::MaxVoluntaryExits>,
}

#[derive(
    Clone,
    PartialEq,
    Eq,
    Debug,
    Default,
    Hash,
    Deserialize,
    Serialize,
    SszEncode,
    SszDecode,
    TreeHash,
    SignedRoot,
)]
pub struct BeaconBlockHeader {
    pub slot: Slot,
    pub parent_root: H256,
    pub state_root: H256,
    pub body_root: H256,
    pub signature: SignatureBytes,
}

impl BeaconBlockHeader {
    pub fn canonical_root(&self) -> Hash256 {
        Hash256::from_slice(&self.signed_root()[..])
    }
}

#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Debug,
    Default,
    Hash,
    Deserialize,
    Serialize,
    SszEncode,
    SszDecode,
    TreeHash,
)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: H256,
}

#[derive(Clone, PartialEq, Debug, Deserialize, Serialize, SszEncode, SszDecode, TreeHash)]
pub struct Deposit {
    pub proof: FixedVector<H256, Sum<consts::DepositContractTreeDepth, U1>>,
    pub data: DepositData,
}

#[derive(
    Clone,
    PartialEq,
    Eq,
    Debug,
    Deserialize,
    Serialize,
    SszEncode,
    SszDecode,
    TreeHash,
    SignedRoot,
    Default,
)]
pub struct DepositData {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: H256,
    pub amount: Gwei,
    pub signature: SignatureBytes,
}

#[derive(
    Clone, PartialEq, Eq, Debug, Default, Deserialize, Serialize, SszEncode, SszDecode, TreeHash,
)]
pub struct Eth1Data {
    pub deposit_root: H256,
    pub deposit_count: u64,
    pub block_hash: H256,
}

#[derive(
    Clone, PartialEq, Eq, Debug, Default, Deserialize, Serialize, SszEncode, SszDecode, TreeHash,
)]
pub struct Fork {
    pub previous_version: Version,
    pub current_version: Version,
    pub epoch: Epoch,
}

#[derive(Clone, PartialEq, Debug, Deserialize, Serialize, SszEncode, SszDecode, TreeHash)]
pub struct HistoricalBatch<C: Config> {
    pub block_roots: FixedVector<H256, C::SlotsPerHistoricalRoot>,
    pub state_roots: FixedVector<H256, C::SlotsPerHistoricalRoot>,
}

#[derive(
    Clone, PartialEq, Debug, Default, Deserialize, Serialize, SszEncode, SszDecode, TreeHash,
)]
pub struct IndexedAttestation<C: Config> {
    pub attesting_indices: VariableList<u64, C::MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub signature: AggregateSignatureBytes,
}

#[derive(Clone, PartialEq, Debug, Deserialize, Serialize, SszEncode, SszDecode, TreeHash)]
pub struct PendingAttestation<C: Config> {
    pub aggregation_bits: BitList<C::MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub inclusion_delay: u64,
    pub proposer_index: u64,
}

#[derive(
    Clone, PartialEq, Eq, Debug, Default, Deserialize, Serialize, SszEncode, SszDecode, TreeHash,
)]
pub struct ProposerSlashing {
    pub proposer_index: u64,
    pub header_1: BeaconBlockHeader,
    pub header_2: BeaconBlockHeader,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize, SszEncode, SszDecode, TreeHash)]
pub struct Validator {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: H256,
    pub effective_balance: Gwei,
    pub slashed: bool,
    pub activation_eligibility_epoch: Epoch,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            pubkey: PublicKeyBytes::empty(),
            withdrawal_credentials: H256::zero(),
            effective_balance: 0,
            slashed: false,
            activation_eligibility_epoch: consts::FAR_FUTURE_EPOCH,
            activation_epoch: consts::FAR_FUTURE_EPOCH,
            exit_epoch: consts::FAR_FUTURE_EPOCH,
            withdrawable_epoch: consts::FAR_FUTURE_EPOCH,
        }
    }
}

#[derive(
    Clone,
    PartialEq,
    Eq,
    Debug,
    Default,
    Deserialize,
    Serialize,
    SszEncode,
    SszDecode,
    TreeHash,
    SignedRoot,
)]
pub struct VoluntaryExit {
    pub epoch: Epoch,
    pub validator_index: u64,
    pub signature: SignatureBytes,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MinimalConfig;

    #[test]
    fn signed_root_elides_the_signature() {
        let mut header = BeaconBlockHeader {
            slot: 1,
            parent_root: H256::from([1; 32]),
            state_root: H256::from([2; 32]),
            body_root: H256::from([3; 32]),
            signature: SignatureBytes::empty(),
        };
        let unsigned = header.signed_root();

        header.signature = SignatureBytes::from_bytes(&[9; 96]).expect("correct length");
        assert_eq!(header.signed_root(), unsigned);
        assert_ne!(header.tree_hash_root(), unsigned);
    }

    #[test]
    fn block_header_roots_match_the_block() {
        let block = BeaconBlock::<MinimalConfig>::default();
        let header = block.block_header();

        assert_eq!(header.slot, block.slot);
        assert_eq!(
            header.body_root,
            Hash256::from_slice(&block.body.tree_hash_root())
        );
        assert_eq!(header.canonical_root(), block.canonical_root());
    }

    #[test]
    fn temporary_block_header_zeroes_the_state_root() {
        let block = BeaconBlock::<MinimalConfig> {
            state_root: H256::from([5; 32]),
            ..BeaconBlock::default()
        };
        let header = block.temporary_block_header();
        assert_eq!(header.state_root, H256::zero());
        assert_eq!(header.signature, SignatureBytes::empty());
    }

    #[test]
    fn deposit_data_signing_covers_all_but_the_signature() {
        let data = DepositData {
            pubkey: PublicKeyBytes::empty(),
            withdrawal_credentials: H256::from([1; 32]),
            amount: 32_000_000_000,
            signature: SignatureBytes::from_bytes(&[1; 96]).expect("correct length"),
        };

        let mut without_signature = data.clone();
        without_signature.signature = SignatureBytes::empty();

        assert_eq!(data.signed_root(), without_signature.signed_root());
    }

    #[test]
    fn checkpoint_zero_root_is_the_default() {
        assert_eq!(Checkpoint::default().root, H256::zero());
    }
}
