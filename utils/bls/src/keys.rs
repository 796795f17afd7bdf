use core::fmt;

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, PUBLIC_KEY_BYTES_LEN, SECRET_KEY_BYTES_LEN};

#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey([u8; SECRET_KEY_BYTES_LEN]);

impl SecretKey {
    pub fn random() -> Self {
        let mut bytes = [0; SECRET_KEY_BYTES_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != SECRET_KEY_BYTES_LEN {
            return Err(Error::InvalidByteLength {
                got: bytes.len(),
                expected: SECRET_KEY_BYTES_LEN,
            });
        }
        let mut array = [0; SECRET_KEY_BYTES_LEN];
        array.copy_from_slice(bytes);
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Secret material is not printed.
        write!(f, "SecretKey(..)")
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_BYTES_LEN]);

impl PublicKey {
    /// Derives the public key from a secret key. The derivation is a
    /// domain-separated hash expansion, deterministic across processes.
    pub fn from_secret_key(secret_key: &SecretKey) -> Self {
        let mut preimage = b"pubkey".to_vec();
        preimage.extend_from_slice(secret_key.as_bytes());

        let first = hashing::hash(&preimage);
        let second = hashing::hash(&first);

        let mut bytes = [0; PUBLIC_KEY_BYTES_LEN];
        bytes[..32].copy_from_slice(&first);
        bytes[32..].copy_from_slice(&second[..16]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != PUBLIC_KEY_BYTES_LEN {
            return Err(Error::InvalidByteLength {
                got: bytes.len(),
                expected: PUBLIC_KEY_BYTES_LEN,
            });
        }
        let mut array = [0; PUBLIC_KEY_BYTES_LEN];
        array.copy_from_slice(bytes);
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }

    /// A short hex identifier used in log lines.
    pub fn concatenated_hex_id(&self) -> String {
        format!("0x{}", hex::encode(&self.0[..6]))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PublicKey(0x{})", hex::encode(&self.0[..]))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..]))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0[..])))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = String::deserialize(deserializer)?;
        let bytes =
            hex::decode(string.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        Self::from_bytes(&bytes).map_err(|error| serde::de::Error::custom(format!("{:?}", error)))
    }
}

impl Serialize for SecretKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0[..])))
    }
}

impl<'de> Deserialize<'de> for SecretKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = String::deserialize(deserializer)?;
        let bytes =
            hex::decode(string.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        Self::from_bytes(&bytes).map_err(|error| serde::de::Error::custom(format!("{:?}", error)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let secret_key = SecretKey::from_bytes(&[7; 48]).expect("correct length");
        assert_eq!(
            PublicKey::from_secret_key(&secret_key),
            PublicKey::from_secret_key(&secret_key)
        );
    }

    #[test]
    fn different_secrets_derive_different_pubkeys() {
        let a = SecretKey::from_bytes(&[1; 48]).expect("correct length");
        let b = SecretKey::from_bytes(&[2; 48]).expect("correct length");
        assert_ne!(
            PublicKey::from_secret_key(&a),
            PublicKey::from_secret_key(&b)
        );
    }

    #[test]
    fn secret_key_is_not_printed() {
        let secret_key = SecretKey::from_bytes(&[7; 48]).expect("correct length");
        assert_eq!(format!("{:?}", secret_key), "SecretKey(..)");
    }
}
