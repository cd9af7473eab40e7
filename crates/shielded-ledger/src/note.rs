//! shielded notes
//!
//! a note is the private record behind one commitment. it never touches the
//! ledger; only [`NoteCommitment`] and [`Nullifier`] hashes circulate.

use serde::{Deserialize, Serialize};

use crate::hash::{encode_u128, Hash, HashOracle};
use crate::keys::{OwnerKey, SpendingKey};
use crate::nullifier::{Nullifier, Position};
use crate::value::TokenData;

/// a shielded note
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Note {
    /// owner public key
    pub owner: OwnerKey,
    /// value held by the note
    pub amount: u128,
    /// token the value is denominated in
    pub token: TokenData,
    /// blinding randomness
    pub random: Hash,
}

impl Note {
    pub fn new(owner: OwnerKey, amount: u128, token: TokenData, random: Hash) -> Self {
        Self {
            owner,
            amount,
            token,
            random,
        }
    }

    /// compute note commitment (published on-ledger)
    ///
    /// input order: owner, random, amount, token, token type, token sub id
    pub fn commit<H: HashOracle>(&self, hasher: &H) -> NoteCommitment {
        NoteCommitment(hasher.combine(&[
            self.owner.0,
            self.random,
            encode_u128(self.amount),
            self.token.token_address.to_word(),
            self.token.token_type.to_word(),
            encode_u128(self.token.token_sub_id),
        ]))
    }

    /// nullifier published when this note is spent from `position`
    pub fn nullifier<H: HashOracle>(
        &self,
        hasher: &H,
        spending_key: &SpendingKey,
        tree_number: u32,
        position: Position,
    ) -> Nullifier {
        Nullifier::derive(hasher, &spending_key.nullifier_key(), tree_number, position)
    }
}

/// commitment to a note (a leaf of the commitment tree)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NoteCommitment(pub Hash);

impl NoteCommitment {
    pub fn to_bytes(&self) -> Hash {
        self.0
    }

    pub fn from_bytes(bytes: Hash) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for NoteCommitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
