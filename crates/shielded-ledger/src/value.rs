//! public identities: accounts and tokens
//!
//! amounts are plain `u128` throughout the crate

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::hash::{encode_u128, Hash, ZERO_WORD};

/// 20-byte public account or contract address
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// address with every byte set to `byte` (handy for fixtures)
    pub fn repeat(byte: u8) -> Self {
        Self([byte; 20])
    }

    pub fn to_bytes(&self) -> [u8; 20] {
        self.0
    }

    /// embed as a hash-width word (right aligned, like a uint160 in a field)
    pub fn to_word(&self) -> Hash {
        let mut word = ZERO_WORD;
        word[12..].copy_from_slice(&self.0);
        word
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// error parsing a hex address
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid address: {0}")]
pub struct AddressParseError(pub String);

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| AddressParseError(e.to_string()))?;
        let array: [u8; 20] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| AddressParseError(format!("expected 20 bytes, got {}", b.len())))?;
        Ok(Self(array))
    }
}

/// token standard of a note
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TokenType {
    /// erc20-style balance token
    #[default]
    Fungible,
    /// nft-like token, identified by its sub id
    NonFungible,
}

impl TokenType {
    pub fn to_word(&self) -> Hash {
        match self {
            Self::Fungible => encode_u128(0),
            Self::NonFungible => encode_u128(1),
        }
    }
}

/// which token a note or transfer refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TokenData {
    pub token_type: TokenType,
    pub token_address: Address,
    pub token_sub_id: u128,
}

impl TokenData {
    /// fungible token at `address`
    pub fn fungible(address: Address) -> Self {
        Self {
            token_type: TokenType::Fungible,
            token_address: address,
            token_sub_id: 0,
        }
    }

    /// nft-like token `sub_id` of collection `address`
    pub fn non_fungible(address: Address, sub_id: u128) -> Self {
        Self {
            token_type: TokenType::NonFungible,
            token_address: address,
            token_sub_id: sub_id,
        }
    }
}
