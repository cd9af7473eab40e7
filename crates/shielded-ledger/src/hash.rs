//! hash oracle capability
//!
//! commitments, nullifiers and tree nodes all go through one multi-input
//! hash. the ledger only sees it through [`HashOracle`]; a cryptographic
//! suite is one implementation of the trait.

use crate::HASH_DOMAIN;

/// hash-width word (32 bytes)
pub type Hash = [u8; 32];

/// all-zero word
pub const ZERO_WORD: Hash = [0u8; 32];

/// deterministic, collision-resistant multi-input hash
///
/// implementations must be pure: the same inputs always give the same
/// output, with no salts and no hidden state.
pub trait HashOracle: Clone + Send + Sync {
    /// hash an ordered list of words into one word
    fn combine(&self, inputs: &[Hash]) -> Hash;

    /// two-to-one compression used for tree nodes
    fn hash_pair(&self, left: &Hash, right: &Hash) -> Hash {
        self.combine(&[*left, *right])
    }

    /// value of an absent leaf
    ///
    /// the empty-subtree table of the commitment tree is built from this
    fn empty_leaf(&self) -> Hash {
        ZERO_WORD
    }
}

/// domain-separated blake3 suite
///
/// arity is absorbed before the inputs so that `combine(&[a, b])` and
/// `combine(&[a, b, c])` live in different domains.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Blake3Oracle;

impl HashOracle for Blake3Oracle {
    fn combine(&self, inputs: &[Hash]) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(HASH_DOMAIN);
        hasher.update(&(inputs.len() as u32).to_le_bytes());
        for input in inputs {
            hasher.update(input);
        }
        *hasher.finalize().as_bytes()
    }

    fn empty_leaf(&self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(HASH_DOMAIN);
        hasher.update(b"empty-leaf");
        *hasher.finalize().as_bytes()
    }
}

/// embed an integer into a word (little-endian, zero padded)
pub fn encode_u128(value: u128) -> Hash {
    let mut word = ZERO_WORD;
    word[..16].copy_from_slice(&value.to_le_bytes());
    word
}

/// embed a small integer into a word
pub fn encode_u64(value: u64) -> Hash {
    encode_u128(u128::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_deterministic() {
        let oracle = Blake3Oracle;
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_eq!(oracle.combine(&[a, b]), oracle.combine(&[a, b]));
        assert_ne!(oracle.combine(&[a, b]), oracle.combine(&[b, a]));
    }

    #[test]
    fn test_arity_separation() {
        let oracle = Blake3Oracle;
        let a = [1u8; 32];
        assert_ne!(oracle.combine(&[a]), oracle.combine(&[a, ZERO_WORD]));
        assert_eq!(oracle.hash_pair(&a, &a), oracle.combine(&[a, a]));
    }

    #[test]
    fn test_empty_leaf_is_not_zero() {
        assert_ne!(Blake3Oracle.empty_leaf(), ZERO_WORD);
    }

    #[test]
    fn test_encode_u128() {
        let word = encode_u128(0x0102);
        assert_eq!(word[0], 0x02);
        assert_eq!(word[1], 0x01);
        assert!(word[16..].iter().all(|b| *b == 0));
        assert_eq!(encode_u64(7), encode_u128(7));
    }
}
