//! nullifiers and the nullifier ledger
//!
//! when a note is spent, its nullifier is published. a nullifier that is
//! already in the ledger, or that appears twice in one reservation, is a
//! double-spend and the whole reservation is rejected.

use core::fmt;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::hash::{encode_u64, Hash, HashOracle};
use crate::keys::NullifierKey;

/// leaf index inside one commitment tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position(pub u64);

impl Position {
    pub fn new(pos: u64) -> Self {
        Self(pos)
    }

    pub fn to_bytes(&self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

/// nullifier - unique public tag of a spent note
///
/// derived from the spender's nullifier key and the note's identity
/// (tree number + position), so only the owner can compute it and each note
/// has exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Nullifier(pub Hash);

impl Nullifier {
    pub fn derive<H: HashOracle>(
        hasher: &H,
        nk: &NullifierKey,
        tree_number: u32,
        position: Position,
    ) -> Self {
        Self(hasher.combine(&[
            nk.0,
            encode_u64(u64::from(tree_number)),
            encode_u64(position.0),
        ]))
    }

    pub fn to_bytes(&self) -> Hash {
        self.0
    }

    pub fn from_bytes(bytes: Hash) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl AsRef<[u8]> for Nullifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// why a reservation was refused
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Conflict {
    /// already recorded in the ledger
    #[error("nullifier {0} already spent")]
    AlreadySpent(Nullifier),
    /// appears more than once in the same reservation
    #[error("nullifier {0} duplicated in batch")]
    Duplicate(Nullifier),
}

impl Conflict {
    pub fn nullifier(&self) -> Nullifier {
        match self {
            Self::AlreadySpent(nf) | Self::Duplicate(nf) => *nf,
        }
    }
}

/// global set of consumed nullifiers, grows monotonically
#[derive(Clone, Debug, Default)]
pub struct NullifierLedger {
    spent: HashSet<Nullifier>,
}

impl NullifierLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// check if nullifier exists (note already spent)
    pub fn contains(&self, nullifier: &Nullifier) -> bool {
        self.spent.contains(nullifier)
    }

    /// check a candidate set without recording it
    ///
    /// reports the first conflict in input order
    pub fn check(&self, candidates: &[Nullifier]) -> Result<(), Conflict> {
        let mut seen = HashSet::with_capacity(candidates.len());
        for nf in candidates {
            if self.spent.contains(nf) {
                return Err(Conflict::AlreadySpent(*nf));
            }
            if !seen.insert(*nf) {
                return Err(Conflict::Duplicate(*nf));
            }
        }
        Ok(())
    }

    /// atomically check and insert a candidate set
    ///
    /// either every nullifier is recorded or none is
    pub fn check_and_reserve(&mut self, candidates: &[Nullifier]) -> Result<(), Conflict> {
        self.check(candidates)?;
        self.spent.extend(candidates.iter().copied());
        Ok(())
    }

    /// number of spent notes
    pub fn len(&self) -> usize {
        self.spent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spent.is_empty()
    }
}
