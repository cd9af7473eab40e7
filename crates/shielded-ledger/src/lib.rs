//! shielded ledger
//!
//! state-transition core of a shielded token pool: deposits become private
//! note commitments in an incremental merkle tree, spends publish nullifiers,
//! and value leaves the pool only under a valid proof.
//!
//! # architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       ShieldedLedger                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                               │
//! │  transact(batch)                                              │
//! │  ├─ validate: shape, anchor root, proofs (rayon)              │
//! │  ├─ nullifier check (ledger + within batch)                   │
//! │  ├─ fees + token transfers (compensated on failure)           │
//! │  └─ commit: reserve nullifiers, append commitments, events    │
//! │                                                               │
//! │  generate_deposit(notes)  fee on top, commitments on-ledger   │
//! │  change_fee / change_treasury  governor only                  │
//! │                                                               │
//! │  collaborators: HashOracle, ProofVerifier, TokenTransfer      │
//! │                                                               │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod commitment;
pub mod config;
pub mod error;
pub mod fee;
pub mod hash;
pub mod keys;
pub mod ledger;
pub mod note;
pub mod nullifier;
pub mod proof;
pub mod token;
pub mod transaction;
pub mod value;

pub use commitment::{CommitmentTree, Insertion, MerkleProof, MerkleRoot};
pub use config::{CircuitLimits, ConfigError, LedgerConfig};
pub use error::{LedgerError, Result};
pub use fee::{fee_on_base, split_total, FeeConfig, FeeError, FeeKind};
pub use hash::{Blake3Oracle, Hash, HashOracle};
pub use keys::{NullifierKey, OwnerKey, SpendingKey};
pub use ledger::{BatchReceipt, LedgerEvent, ShieldedLedger};
pub use note::{Note, NoteCommitment};
pub use nullifier::{Conflict, Nullifier, NullifierLedger, Position};
pub use proof::{Proof, ProofVerifier, PublicInputs, ShapeKeyedVerifier, VerifierError};
pub use token::{InMemoryTokens, TokenTransfer, TransferError, TransferPlan};
pub use transaction::{DepositRequest, JoinFields, SharedFields, SplitFields, TransitionRequest};
pub use value::{Address, TokenData, TokenType};

/// domain separator for the blake3 hash suite
pub const HASH_DOMAIN: &[u8] = b"shielded-ledger.hash.v1";
