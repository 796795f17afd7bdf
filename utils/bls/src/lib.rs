//! BLS key and signature containers.
//!
//! Real pairing cryptography is an external collaborator of this project, so
//! this crate only provides the container types plus a deterministic stand-in
//! scheme: public keys and signatures are derived from the secret key by
//! hashing, and verification is structural (a well-formed non-empty
//! signature passes). This mirrors the `fake_crypto` mode other clients use
//! for interop and testing; signature checking can additionally be switched
//! off wholesale through the configuration options.

mod bytes_types;
mod keypair;
mod keys;
mod signature;

pub use bytes_types::{PublicKeyBytes, SignatureBytes};
pub use keypair::Keypair;
pub use keys::{PublicKey, SecretKey};
pub use signature::{AggregatePublicKey, AggregateSignature, Signature};

pub const PUBLIC_KEY_BYTES_LEN: usize = 48;
pub const SECRET_KEY_BYTES_LEN: usize = 48;
pub const SIGNATURE_BYTES_LEN: usize = 96;

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    InvalidByteLength { got: usize, expected: usize },
}
