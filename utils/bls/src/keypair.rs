use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::{PublicKey, SecretKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keypair {
    pub sk: SecretKey,
    pub pk: PublicKey,
}

impl Keypair {
    /// Instantiate a Keypair using SecretKey::random().
    pub fn random() -> Self {
        let sk = SecretKey::random();
        let pk = PublicKey::from_secret_key(&sk);
        Self { sk, pk }
    }

    pub fn from_secret_key(sk: SecretKey) -> Self {
        let pk = PublicKey::from_secret_key(&sk);
        Self { sk, pk }
    }

    pub fn identifier(&self) -> String {
        self.pk.concatenated_hex_id()
    }
}

#[allow(clippy::derive_hash_xor_eq)]
impl Hash for Keypair {
    /// Note: this is distinct from consensus serialization, it will produce a different hash.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pk.as_bytes().hash(state)
    }
}

impl fmt::Display for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.pk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypair_matches_secret_key() {
        let sk = SecretKey::from_bytes(&[9; 48]).expect("correct length");
        let keypair = Keypair::from_secret_key(sk.clone());
        assert_eq!(keypair.pk, PublicKey::from_secret_key(&sk));
    }
}
