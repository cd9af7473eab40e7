//! error types for the ledger

use thiserror::Error;

use crate::commitment::MerkleRoot;
use crate::fee::FeeError;
use crate::nullifier::Nullifier;
use crate::value::Address;

/// why a batch or governance call was rejected
///
/// every variant leaves ledger state untouched
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("empty batch")]
    EmptyBatch,

    #[error("request {index} malformed: {reason}")]
    MalformedRequest { index: usize, reason: String },

    #[error("request {index}: invalid proof")]
    ProofInvalid { index: usize },

    #[error("request {index}: verifier unavailable: {reason}")]
    VerifierUnavailable { index: usize, reason: String },

    #[error("request {index}: nullifier {nullifier} already spent or duplicated")]
    NullifierConflict { index: usize, nullifier: Nullifier },

    #[error("request {index}: stale root {got} for tree {tree_number}, expected {expected}")]
    StaleRoot {
        index: usize,
        tree_number: u32,
        expected: MerkleRoot,
        got: MerkleRoot,
    },

    #[error("request {index}: unknown tree {tree_number}")]
    UnknownTree { index: usize, tree_number: u32 },

    #[error("{caller} is not the fee governor")]
    FeeConfigUnauthorized { caller: Address },

    #[error("fee of {bps} basis points out of range")]
    FeeOutOfRange { bps: u16 },

    #[error("request {index}: token transfer failed: {reason}")]
    TokenTransferFailed { index: usize, reason: String },

    #[error("deposit {index} invalid: {reason}")]
    InvalidDeposit { index: usize, reason: String },

    #[error("amount overflow")]
    Overflow,
}

impl From<FeeError> for LedgerError {
    fn from(e: FeeError) -> Self {
        match e {
            FeeError::OutOfRange(bps) => LedgerError::FeeOutOfRange { bps },
            FeeError::Overflow => LedgerError::Overflow,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
