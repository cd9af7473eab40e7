//! request shapes accepted by the ledger
//!
//! a [`TransitionRequest`] is one proof-backed join/split: it consumes notes
//! (by nullifier) under a merkle root and creates new commitments, optionally
//! moving public value in or out. a [`DepositRequest`] is the proof-less
//! shield path, the ledger computes the commitment itself.

use serde::{Deserialize, Serialize};

use crate::commitment::MerkleRoot;
use crate::hash::{Hash, HashOracle};
use crate::keys::OwnerKey;
use crate::note::{Note, NoteCommitment};
use crate::nullifier::Nullifier;
use crate::proof::Proof;
use crate::value::{Address, TokenData, TokenType};

/// fields bound by the proof that concern public value
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedFields {
    /// contract allowed to submit this request, zero for anyone
    pub adaptor_contract: Address,
    /// opaque data for the adaptor contract
    pub adaptor_parameters: Hash,
    /// value entering the pool, the caller pays the deposit fee on top
    pub deposit_amount: u128,
    /// fee-inclusive amount paid out of the pool
    pub withdraw_amount: u128,
    /// token of the public movement
    pub token: TokenData,
    /// withdraw recipient
    pub output_address: Address,
}

impl SharedFields {
    /// word identifying the token in public inputs
    ///
    /// fungible tokens use their address, nft-like tokens hash in type and
    /// sub id as well
    pub fn token_field<H: HashOracle>(&self, hasher: &H) -> Hash {
        match self.token.token_type {
            TokenType::Fungible => self.token.token_address.to_word(),
            TokenType::NonFungible => hasher.combine(&[
                self.token.token_type.to_word(),
                self.token.token_address.to_word(),
                crate::hash::encode_u128(self.token.token_sub_id),
            ]),
        }
    }
}

/// notes being consumed
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinFields {
    pub tree_number: u32,
    /// anchor the spent notes are proven against
    pub merkle_root: MerkleRoot,
    pub nullifiers: Vec<Nullifier>,
}

/// notes being created
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitFields {
    pub commitments_out: Vec<NoteCommitment>,
}

/// one proof-backed state transition
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub proof: Proof,
    pub shared: SharedFields,
    pub join: JoinFields,
    pub split: SplitFields,
}

impl TransitionRequest {
    pub fn new(proof: Proof, shared: SharedFields, join: JoinFields, split: SplitFields) -> Self {
        Self {
            proof,
            shared,
            join,
            split,
        }
    }

    /// same request carrying another proof
    pub fn with_proof(mut self, proof: Proof) -> Self {
        self.proof = proof;
        self
    }
}

/// direct deposit, no proof
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub owner: OwnerKey,
    pub random: Hash,
    /// base amount, the fee is charged on top
    pub amount: u128,
    pub token: TokenData,
}

impl DepositRequest {
    pub fn new(owner: OwnerKey, random: Hash, amount: u128, token: TokenData) -> Self {
        Self {
            owner,
            random,
            amount,
            token,
        }
    }

    pub fn to_note(&self) -> Note {
        Note::new(self.owner, self.amount, self.token, self.random)
    }

    /// commitment the ledger appends for this deposit
    pub fn commitment<H: HashOracle>(&self, hasher: &H) -> NoteCommitment {
        self.to_note().commit(hasher)
    }
}
