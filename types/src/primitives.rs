use core::ops::Index;

use derive_more::Display;
use ethereum_types::{H32, H64};
use serde::{Deserialize, Serialize};
use ssz_new::{SszDecode, SszDecodeError, SszEncode};
use tree_hash::{TreeHash, TreeHashType};

pub use bls::{AggregatePublicKey, AggregateSignature, PublicKey, SecretKey, Signature};
pub use bls::{PublicKeyBytes, SignatureBytes};
pub use ethereum_types::H256;

pub type AggregateSignatureBytes = SignatureBytes;
pub type CommitteeIndex = u64;
pub type DomainType = u32;
pub type Epoch = u64;
pub type Gwei = u64;
pub type Slot = u64;
pub type UnixSeconds = u64;
pub type ValidatorIndex = u64;

type VersionAsArray = [u8; 4];

/// A fork version. Wrapped so the SSZ and tree-hash impls stay with the type
/// rather than with a bare byte array.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Display, Deserialize, Serialize)]
#[display(fmt = "{}", _0)]
pub struct Version(H32);

impl Version {
    pub fn as_array(&self) -> &VersionAsArray {
        self.0.as_fixed_bytes()
    }
}

impl From<VersionAsArray> for Version {
    fn from(array: VersionAsArray) -> Self {
        Self(array.into())
    }
}

impl From<Version> for VersionAsArray {
    fn from(version: Version) -> Self {
        version.0.to_fixed_bytes()
    }
}

impl Index<usize> for Version {
    type Output = u8;

    fn index(&self, index: usize) -> &Self::Output {
        self.as_array().index(index)
    }
}

impl SszDecode for Version {
    fn is_ssz_fixed_len() -> bool {
        <VersionAsArray as SszDecode>::is_ssz_fixed_len()
    }

    fn ssz_fixed_len() -> usize {
        <VersionAsArray as SszDecode>::ssz_fixed_len()
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, SszDecodeError> {
        VersionAsArray::from_ssz_bytes(bytes).map(Self::from)
    }
}

impl SszEncode for Version {
    fn is_ssz_fixed_len() -> bool {
        <VersionAsArray as SszEncode>::is_ssz_fixed_len()
    }

    fn as_ssz_bytes(&self) -> Vec<u8> {
        self.as_array().as_ssz_bytes()
    }
}

impl TreeHash for Version {
    fn tree_hash_type() -> TreeHashType {
        VersionAsArray::tree_hash_type()
    }

    fn tree_hash_packed_encoding(&self) -> Vec<u8> {
        self.as_array().to_vec()
    }

    fn tree_hash_packing_factor() -> usize {
        8
    }

    fn tree_hash_root(&self) -> Vec<u8> {
        self.as_array().tree_hash_root()
    }
}

type DomainAsInteger = u64;

/// An 8-byte signature domain: the 4-byte domain type followed by the fork
/// version active at the message's epoch.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct Domain(H64);

impl Domain {
    pub fn new(domain_type: DomainType, fork_version: Version) -> Self {
        let mut bytes = [0; 8];
        bytes[..4].copy_from_slice(&domain_type.to_le_bytes());
        bytes[4..].copy_from_slice(fork_version.as_array());
        Self(H64::from_slice(&bytes))
    }

    pub fn to_integer(self) -> DomainAsInteger {
        self.0.to_low_u64_le()
    }
}

impl From<DomainAsInteger> for Domain {
    fn from(integer: DomainAsInteger) -> Self {
        Self(H64::from_low_u64_le(integer))
    }
}

impl SszDecode for Domain {
    fn is_ssz_fixed_len() -> bool {
        <DomainAsInteger as SszDecode>::is_ssz_fixed_len()
    }

    fn ssz_fixed_len() -> usize {
        <DomainAsInteger as SszDecode>::ssz_fixed_len()
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, SszDecodeError> {
        DomainAsInteger::from_ssz_bytes(bytes).map(Self::from)
    }
}

impl SszEncode for Domain {
    fn is_ssz_fixed_len() -> bool {
        <DomainAsInteger as SszEncode>::is_ssz_fixed_len()
    }

    fn as_ssz_bytes(&self) -> Vec<u8> {
        self.to_integer().as_ssz_bytes()
    }
}

impl TreeHash for Domain {
    fn tree_hash_type() -> TreeHashType {
        DomainAsInteger::tree_hash_type()
    }

    fn tree_hash_packed_encoding(&self) -> Vec<u8> {
        self.to_integer().tree_hash_packed_encoding()
    }

    fn tree_hash_packing_factor() -> usize {
        DomainAsInteger::tree_hash_packing_factor()
    }

    fn tree_hash_root(&self) -> Vec<u8> {
        self.to_integer().tree_hash_root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_combines_type_and_version() {
        let domain = Domain::new(0x0000_0004, Version::from([1, 2, 3, 4]));
        let bytes = domain.to_integer().to_le_bytes();
        assert_eq!(bytes[..4], [4, 0, 0, 0]);
        assert_eq!(bytes[4..], [1, 2, 3, 4]);
    }

    #[test]
    fn version_round_trips_through_ssz() {
        let version = Version::from([9, 8, 7, 6]);
        assert_eq!(version.as_ssz_bytes(), vec![9, 8, 7, 6]);
        assert_eq!(Version::from_ssz_bytes(&[9, 8, 7, 6]), Ok(version));
    }
}
