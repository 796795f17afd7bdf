use core::convert::TryFrom;

use bls::{Keypair, SecretKey};
use helper_functions::crypto::{hash, hash_concat_pair, hash_tree_root};
use helper_functions::math::int_to_bytes;
use ssz_new::{FixedVector, VariableList};
use types::beacon_state::BeaconState;
use types::config::Config;
use types::consts::DEPOSIT_CONTRACT_TREE_DEPTH;
use types::primitives::{PublicKeyBytes, UnixSeconds, H256};
use types::types::{BeaconBlock, DepositData, Eth1Data, Validator};

use crate::error::Error;

/// Deterministic keypairs for interop-style genesis: the secret key of
/// validator `i` is the little-endian encoding of `i + 1`.
pub fn interop_keypairs(count: usize) -> Vec<Keypair> {
    (0..count)
        .map(|index| {
            let secret_bytes = int_to_bytes(index as u64 + 1, 48);
            let secret_key =
                SecretKey::from_bytes(&secret_bytes).expect("the encoding is 48 bytes");
            Keypair::from_secret_key(secret_key)
        })
        .collect()
}

/// Builds a genesis state with `validator_count` active validators at the
/// maximum effective balance, the RANDAO ring seeded from the eth1 block
/// hash, and the genesis deposits already consumed.
pub fn initialize_beacon_state<C: Config>(
    genesis_time: UnixSeconds,
    eth1_block_hash: H256,
    validator_count: usize,
) -> Result<BeaconState<C>, Error> {
    let mut validators = vec![];
    let mut balances = vec![];
    for keypair in interop_keypairs(validator_count) {
        let pubkey =
            PublicKeyBytes::from_bytes(keypair.pk.as_bytes()).expect("pubkeys are 48 bytes");

        let mut withdrawal_credentials = H256::from_slice(&hash(keypair.pk.as_bytes()));
        withdrawal_credentials.as_bytes_mut()[0] = 0;

        validators.push(Validator {
            pubkey,
            withdrawal_credentials,
            effective_balance: C::max_effective_balance(),
            slashed: false,
            activation_eligibility_epoch: C::genesis_epoch(),
            activation_epoch: C::genesis_epoch(),
            exit_epoch: C::far_future_epoch(),
            withdrawable_epoch: C::far_future_epoch(),
        });
        balances.push(C::max_effective_balance());
    }

    let mut state = BeaconState {
        genesis_time,
        slot: C::genesis_slot(),
        validators: VariableList::new(validators).map_err(|_| Error::RegistryFull)?,
        balances: VariableList::new(balances).map_err(|_| Error::RegistryFull)?,
        randao_mixes: FixedVector::from(vec![
            eth1_block_hash;
            C::epochs_per_historical_vector() as usize
        ]),
        eth1_data: Eth1Data {
            deposit_root: H256::zero(),
            deposit_count: validator_count as u64,
            block_hash: eth1_block_hash,
        },
        eth1_deposit_index: validator_count as u64,
        ..BeaconState::default()
    };

    state.latest_block_header.body_root =
        hash_tree_root(&types::types::BeaconBlockBody::<C>::default());

    Ok(state)
}

// The way the genesis block is constructed makes it possible for many
// parties to independently produce the same block.
pub fn genesis_block<C: Config>(state: &BeaconState<C>) -> BeaconBlock<C> {
    // Note that `BeaconBlock.body.eth1_data` is not set to `state.eth1_data`.
    BeaconBlock {
        state_root: hash_tree_root(state),
        ..BeaconBlock::default()
    }
}

/// An eth1-style deposit tree: a sparse Merkle tree of deposit data roots at
/// a fixed depth, with the leaf count mixed into the root. Produces the
/// branches that `process_deposit` verifies.
pub struct DepositTree {
    leaves: Vec<H256>,
}

impl DepositTree {
    pub fn new() -> Self {
        Self { leaves: vec![] }
    }

    pub fn push(&mut self, data: &DepositData) {
        self.leaves.push(hash_tree_root(data));
    }

    pub fn count(&self) -> u64 {
        self.leaves.len() as u64
    }

    pub fn root(&self) -> H256 {
        let depth = usize::try_from(DEPOSIT_CONTRACT_TREE_DEPTH).expect("the depth is small");
        hash_concat_pair(&self.subtree_root(depth, 0), &self.count_chunk())
    }

    /// The Merkle branch for the leaf at `index`, including the trailing
    /// length chunk (depth + 1 elements).
    pub fn proof(
        &self,
        index: usize,
    ) -> FixedVector<H256, typenum::Sum<types::consts::DepositContractTreeDepth, typenum::U1>>
    {
        let depth = usize::try_from(DEPOSIT_CONTRACT_TREE_DEPTH).expect("the depth is small");

        let mut branch = Vec::with_capacity(depth + 1);
        for level in 0..depth {
            let sibling = (index >> level) ^ 1;
            branch.push(self.subtree_root(level, sibling));
        }
        branch.push(self.count_chunk());

        FixedVector::from(branch)
    }

    fn count_chunk(&self) -> H256 {
        H256::from_slice(&int_to_bytes(self.count(), 32))
    }

    fn subtree_root(&self, level: usize, index: usize) -> H256 {
        let first_leaf = index << level;
        if first_leaf >= self.leaves.len() {
            return zero_subtree(level);
        }

        if level == 0 {
            self.leaves[index]
        } else {
            hash_concat_pair(
                &self.subtree_root(level - 1, 2 * index),
                &self.subtree_root(level - 1, 2 * index + 1),
            )
        }
    }
}

impl Default for DepositTree {
    fn default() -> Self {
        Self::new()
    }
}

fn zero_subtree(level: usize) -> H256 {
    let mut node = H256::zero();
    for _ in 0..level {
        node = hash_concat_pair(&node, &node);
    }
    node
}
