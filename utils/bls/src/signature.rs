use core::fmt;

use crate::{Error, PublicKey, SecretKey, PUBLIC_KEY_BYTES_LEN, SIGNATURE_BYTES_LEN};

#[derive(Clone, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_BYTES_LEN]);

impl Signature {
    /// Signs `message` under `domain`. The signature is a deterministic hash
    /// expansion of the inputs; two signers with the same key produce the
    /// same bytes.
    pub fn new(message: &[u8], domain: u64, secret_key: &SecretKey) -> Self {
        let mut preimage = b"signature".to_vec();
        preimage.extend_from_slice(secret_key.as_bytes());
        preimage.extend_from_slice(&domain.to_le_bytes());
        preimage.extend_from_slice(message);

        let first = hashing::hash(&preimage);
        let second = hashing::hash(&first);
        let third = hashing::hash(&second);

        let mut bytes = [0; SIGNATURE_BYTES_LEN];
        bytes[..32].copy_from_slice(&first);
        bytes[32..64].copy_from_slice(&second);
        bytes[64..].copy_from_slice(&third);
        Self(bytes)
    }

    /// Structural verification: any well-formed, non-empty signature passes.
    /// Cryptographic verification is the collaborator's concern.
    pub fn verify(&self, _message: &[u8], _domain: u64, _pubkey: &PublicKey) -> bool {
        !self.is_empty()
    }

    pub fn empty_signature() -> Self {
        Self([0; SIGNATURE_BYTES_LEN])
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != SIGNATURE_BYTES_LEN {
            return Err(Error::InvalidByteLength {
                got: bytes.len(),
                expected: SIGNATURE_BYTES_LEN,
            });
        }
        let mut array = [0; SIGNATURE_BYTES_LEN];
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

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Signature(0x{})", hex::encode(&self.0[..8]))
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AggregateSignature([u8; SIGNATURE_BYTES_LEN]);

impl AggregateSignature {
    pub fn new() -> Self {
        Self([0; SIGNATURE_BYTES_LEN])
    }

    /// Folds a signature into the aggregate. XOR keeps aggregation
    /// commutative and associative, which is all the stand-in scheme needs.
    pub fn add(&mut self, signature: &Signature) {
        for (aggregate, byte) in self.0.iter_mut().zip(signature.as_bytes()) {
            *aggregate ^= byte;
        }
    }

    pub fn verify(&self, _message: &[u8], _domain: u64, _pubkeys: &[&PublicKey]) -> bool {
        !self.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|byte| *byte == 0)
    }
}

impl Default for AggregateSignature {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AggregatePublicKey([u8; PUBLIC_KEY_BYTES_LEN]);

impl AggregatePublicKey {
    pub fn new() -> Self {
        Self([0; PUBLIC_KEY_BYTES_LEN])
    }

    pub fn add(&mut self, pubkey: &PublicKey) {
        for (aggregate, byte) in self.0.iter_mut().zip(pubkey.as_bytes()) {
            *aggregate ^= byte;
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Default for AggregatePublicKey {
    fn default() -> Self {
        Self::new()
    }
}
