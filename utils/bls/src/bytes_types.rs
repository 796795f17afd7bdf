use core::convert::TryFrom;
use core::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ssz_new::{SszDecode, SszDecodeError, SszEncode};
use tree_hash::{TreeHash, TreeHashType};

use crate::{Error, PublicKey, Signature, PUBLIC_KEY_BYTES_LEN, SIGNATURE_BYTES_LEN};

macro_rules! bytes_struct {
    ($name: ident, $len: expr, $doc: expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name([u8; $len]);

        impl $name {
            pub fn empty() -> Self {
                Self([0; $len])
            }

            pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
                if bytes.len() != $len {
                    return Err(Error::InvalidByteLength {
                        got: bytes.len(),
                        expected: $len,
                    });
                }
                let mut array = [0; $len];
                array.copy_from_slice(bytes);
                Ok(Self(array))
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0[..]
            }

            pub fn is_empty(&self) -> bool {
                self.0.iter().all(|byte| *byte == 0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::empty()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}(0x{})", stringify!($name), hex::encode(&self.0[..]))
            }
        }

        impl SszEncode for $name {
            fn as_ssz_bytes(&self) -> Vec<u8> {
                self.0.to_vec()
            }

            fn is_ssz_fixed_len() -> bool {
                true
            }
        }

        impl SszDecode for $name {
            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, SszDecodeError> {
                Self::from_bytes(bytes).map_err(|_| SszDecodeError::InvalidByteLength {
                    len: bytes.len(),
                    expected: $len,
                })
            }

            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                $len
            }
        }

        impl TreeHash for $name {
            fn tree_hash_type() -> TreeHashType {
                TreeHashType::Vector
            }

            fn tree_hash_packed_encoding(&self) -> Vec<u8> {
                unreachable!("key material should never be packed")
            }

            fn tree_hash_packing_factor() -> usize {
                unreachable!("key material should never be packed")
            }

            fn tree_hash_root(&self) -> Vec<u8> {
                tree_hash::merkleize_padded(&self.0[..], 0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&format!("0x{}", hex::encode(&self.0[..])))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let string = String::deserialize(deserializer)?;
                let bytes = hex::decode(string.trim_start_matches("0x"))
                    .map_err(serde::de::Error::custom)?;
                Self::from_bytes(&bytes)
                    .map_err(|error| serde::de::Error::custom(format!("{:?}", error)))
            }
        }
    };
}

bytes_struct!(
    PublicKeyBytes,
    PUBLIC_KEY_BYTES_LEN,
    "An opaque 48-byte compressed public key."
);
bytes_struct!(
    SignatureBytes,
    SIGNATURE_BYTES_LEN,
    "An opaque 96-byte compressed signature."
);

impl From<&PublicKey> for PublicKeyBytes {
    fn from(pubkey: &PublicKey) -> Self {
        Self::from_bytes(pubkey.as_bytes()).expect("public keys are always 48 bytes")
    }
}

impl TryFrom<&PublicKeyBytes> for PublicKey {
    type Error = Error;

    fn try_from(bytes: &PublicKeyBytes) -> Result<Self, Error> {
        PublicKey::from_bytes(bytes.as_bytes())
    }
}

impl From<&Signature> for SignatureBytes {
    fn from(signature: &Signature) -> Self {
        Self::from_bytes(signature.as_bytes()).expect("signatures are always 96 bytes")
    }
}

impl TryFrom<&SignatureBytes> for Signature {
    type Error = Error;

    fn try_from(bytes: &SignatureBytes) -> Result<Self, Error> {
        Signature::from_bytes(bytes.as_bytes())
    }
}
