//! key hierarchy for note owners
//!
//! spending key -> nullifier key (spend side), owner key (receive side).
//! derivations are domain-separated blake3, independent of the hash oracle:
//! they never touch ledger state.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::Hash;

/// spending key - root of the hierarchy, never leaves the wallet
#[derive(Clone)]
pub struct SpendingKey {
    seed: [u8; 32],
}

impl SpendingKey {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self { seed }
    }

    /// derive from a passphrase (test wallets, fixtures)
    pub fn from_phrase(phrase: &str, password: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"shielded-ledger.spending-key.v1");
        hasher.update(phrase.as_bytes());
        hasher.update(password.as_bytes());
        Self {
            seed: *hasher.finalize().as_bytes(),
        }
    }

    /// secret that feeds nullifier derivation
    pub fn nullifier_key(&self) -> NullifierKey {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"shielded-ledger.nullifier-key.v1");
        hasher.update(&self.seed);
        NullifierKey(*hasher.finalize().as_bytes())
    }

    /// public key notes are committed to
    pub fn owner_key(&self) -> OwnerKey {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"shielded-ledger.owner-key.v1");
        hasher.update(&self.nullifier_key().0);
        OwnerKey(*hasher.finalize().as_bytes())
    }
}

impl fmt::Debug for SpendingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpendingKey").finish_non_exhaustive()
    }
}

/// nullifier derivation key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NullifierKey(pub Hash);

impl NullifierKey {
    pub fn to_bytes(&self) -> Hash {
        self.0
    }
}

/// packed public key of a note owner
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OwnerKey(pub Hash);

impl OwnerKey {
    pub fn from_bytes(bytes: Hash) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> Hash {
        self.0
    }
}
