//! shielded ledger - batched, all-or-nothing state transitions
//!
//! a batch goes through four phases:
//! 1. validate: shape, anchors, proofs (parallel under `parallel`)
//! 2. nullifier check against the ledger and within the batch
//! 3. fee planning and token transfers, compensated on failure. deposits
//!    pay the fee on top, withdrawals have it taken out
//! 4. commit: reserve nullifiers, append commitments, emit events
//!
//! nothing is mutated before phase 4, so any rejection leaves the tree,
//! the nullifier ledger and the event log exactly as they were.

use std::collections::HashSet;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::commitment::{CommitmentTree, MerkleRoot};
use crate::config::{ConfigError, LedgerConfig};
use crate::error::{LedgerError, Result};
use crate::fee::{base_and_fee, fee_on_base, split_total, FeeConfig, FeeKind};
use crate::hash::HashOracle;
use crate::note::{Note, NoteCommitment};
use crate::nullifier::{Conflict, Nullifier, NullifierLedger, Position};
use crate::proof::{ProofVerifier, PublicInputs, VerifierError};
use crate::token::{TokenTransfer, TransferPlan};
use crate::transaction::{DepositRequest, TransitionRequest};
use crate::value::Address;

/// observable record of a successful mutation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    /// commitments appended by a proof-backed batch
    CommitmentBatch {
        tree_number: u32,
        start_position: Position,
        commitments: Vec<NoteCommitment>,
    },
    /// commitments computed on-ledger from direct deposits
    GeneratedCommitmentBatch {
        tree_number: u32,
        start_position: Position,
        notes: Vec<Note>,
        commitments: Vec<NoteCommitment>,
    },
    /// nullifiers recorded by a batch
    Nullifiers { nullifiers: Vec<Nullifier> },
    FeeChanged {
        deposit_fee_bps: u16,
        withdraw_fee_bps: u16,
        nft_fee_bps: u16,
    },
    TreasuryChanged { treasury: Address },
}

/// outcome of an accepted batch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchReceipt {
    /// active root after the batch
    pub root: MerkleRoot,
    /// tree holding the first new commitment
    pub tree_number: u32,
    /// position of the first new commitment
    pub start_position: Position,
    pub commitments: usize,
    pub nullifiers: usize,
    /// fees credited to the treasury, summed over tokens
    pub treasury_fees: u128,
}

/// state-transition core of the shielded pool
pub struct ShieldedLedger<H: HashOracle, V: ProofVerifier> {
    tree: CommitmentTree<H>,
    nullifiers: NullifierLedger,
    fees: FeeConfig,
    config: LedgerConfig,
    verifier: V,
    events: Vec<LedgerEvent>,
}

impl<H: HashOracle, V: ProofVerifier> ShieldedLedger<H, V> {
    pub fn new(config: LedgerConfig, hasher: H, verifier: V) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let tree = CommitmentTree::new(hasher, config.tree_depth).with_root_history(config.root_history);
        info!(
            depth = config.tree_depth,
            root = %tree.current_root(),
            "shielded ledger initialized"
        );

        Ok(Self {
            tree,
            nullifiers: NullifierLedger::new(),
            fees: config.fees,
            config,
            verifier,
            events: Vec::new(),
        })
    }

    /// apply a batch of proof-backed transitions
    pub fn transact<T: TokenTransfer + ?Sized>(
        &mut self,
        caller: Address,
        requests: &[TransitionRequest],
        tokens: &mut T,
    ) -> Result<BatchReceipt> {
        let result = self.apply_transitions(caller, requests, tokens);
        match &result {
            Ok(receipt) => info!(
                requests = requests.len(),
                tree_number = receipt.tree_number,
                start = receipt.start_position.0,
                root = %receipt.root,
                "batch accepted"
            ),
            Err(e) => warn!(requests = requests.len(), error = %e, "batch rejected"),
        }
        result
    }

    fn apply_transitions<T: TokenTransfer + ?Sized>(
        &mut self,
        caller: Address,
        requests: &[TransitionRequest],
        tokens: &mut T,
    ) -> Result<BatchReceipt> {
        if requests.is_empty() {
            return Err(LedgerError::EmptyBatch);
        }

        // validate
        for (index, request) in requests.iter().enumerate() {
            self.check_shape(index, caller, request)?;
            self.check_anchor(index, request)?;
        }
        self.verify_proofs(requests)?;

        // nullifiers, read only
        let spent: Vec<Nullifier> = requests
            .iter()
            .flat_map(|r| r.join.nullifiers.iter().copied())
            .collect();
        self.nullifiers
            .check(&spent)
            .map_err(|conflict| conflict_error(requests, conflict))?;

        // fees and transfers
        let mut plan = TransferPlan::new();
        let mut treasury_fees: u128 = 0;
        let treasury = self.fees.treasury;
        for (index, request) in requests.iter().enumerate() {
            let shared = &request.shared;
            let token = shared.token;

            if shared.deposit_amount > 0 {
                let bps = self.fees.bps_for(FeeKind::Deposit, token.token_type);
                let (fee, total) = fee_on_base(shared.deposit_amount, bps)?;
                plan.transfer_in(index, token, caller, total);
                plan.transfer_out(index, token, treasury, fee);
                treasury_fees = treasury_fees.checked_add(fee).ok_or(LedgerError::Overflow)?;
            }

            if shared.withdraw_amount > 0 {
                let bps = self.fees.bps_for(FeeKind::Withdraw, token.token_type);
                let (base, fee) = split_total(shared.withdraw_amount, bps)?;
                plan.transfer_out(index, token, shared.output_address, base);
                plan.transfer_out(index, token, treasury, fee);
                treasury_fees = treasury_fees.checked_add(fee).ok_or(LedgerError::Overflow)?;
            }
        }
        plan.execute(tokens)
            .map_err(|(index, e)| LedgerError::TokenTransferFailed {
                index,
                reason: e.to_string(),
            })?;

        // commit
        if let Err(conflict) = self.nullifiers.check_and_reserve(&spent) {
            plan.revert(tokens);
            return Err(conflict_error(requests, conflict));
        }

        let commitments: Vec<NoteCommitment> = requests
            .iter()
            .flat_map(|r| r.split.commitments_out.iter().copied())
            .collect();
        let insertion = self.tree.insert_leaves(&commitments);

        self.events.push(LedgerEvent::CommitmentBatch {
            tree_number: insertion.tree_number,
            start_position: insertion.start_position,
            commitments: commitments.clone(),
        });
        self.events.push(LedgerEvent::Nullifiers {
            nullifiers: spent.clone(),
        });

        Ok(BatchReceipt {
            root: insertion.root,
            tree_number: insertion.tree_number,
            start_position: insertion.start_position,
            commitments: commitments.len(),
            nullifiers: spent.len(),
            treasury_fees,
        })
    }

    fn check_shape(&self, index: usize, caller: Address, request: &TransitionRequest) -> Result<()> {
        let limits = &self.config.limits;
        let malformed = |reason: String| LedgerError::MalformedRequest { index, reason };

        let n = request.join.nullifiers.len();
        if n == 0 || n > limits.max_nullifiers {
            return Err(malformed(format!(
                "{} nullifiers, expected 1..={}",
                n, limits.max_nullifiers
            )));
        }

        let m = request.split.commitments_out.len();
        if m == 0 || m > limits.max_commitments {
            return Err(malformed(format!(
                "{} commitments, expected 1..={}",
                m, limits.max_commitments
            )));
        }

        let shared = &request.shared;
        if !shared.adaptor_contract.is_zero() && shared.adaptor_contract != caller {
            return Err(malformed(format!(
                "adaptor contract {} is not the caller",
                shared.adaptor_contract
            )));
        }
        if shared.withdraw_amount > 0 && shared.output_address.is_zero() {
            return Err(malformed("withdraw to the zero address".into()));
        }

        Ok(())
    }

    /// anchor must be the pre-batch root of the referenced tree
    fn check_anchor(&self, index: usize, request: &TransitionRequest) -> Result<()> {
        let tree_number = request.join.tree_number;
        let expected = self
            .tree
            .root_of(tree_number)
            .ok_or(LedgerError::UnknownTree { index, tree_number })?;

        if !self.tree.is_known_root(tree_number, &request.join.merkle_root) {
            return Err(LedgerError::StaleRoot {
                index,
                tree_number,
                expected,
                got: request.join.merkle_root,
            });
        }
        Ok(())
    }

    /// verify every proof, reporting the lowest failing index
    fn verify_proofs(&self, requests: &[TransitionRequest]) -> Result<()> {
        let hasher = self.tree.hasher();
        let verifier = &self.verifier;
        let verify = |request: &TransitionRequest| -> std::result::Result<bool, VerifierError> {
            let inputs = PublicInputs::from_request(hasher, request);
            verifier.verify(&request.proof, &inputs)
        };

        #[cfg(feature = "parallel")]
        let verdicts: Vec<_> = requests.par_iter().map(verify).collect();

        #[cfg(not(feature = "parallel"))]
        let verdicts: Vec<_> = requests.iter().map(verify).collect();

        for (index, verdict) in verdicts.into_iter().enumerate() {
            match verdict {
                Ok(true) => {}
                Ok(false) => return Err(LedgerError::ProofInvalid { index }),
                Err(e) => {
                    return Err(LedgerError::VerifierUnavailable {
                        index,
                        reason: e.to_string(),
                    })
                }
            }
        }
        debug!(count = requests.len(), "proofs verified");
        Ok(())
    }

    /// shield public value without a proof
    ///
    /// the fee is charged on top: the caller pays `amount + fee` per deposit
    pub fn generate_deposit<T: TokenTransfer + ?Sized>(
        &mut self,
        caller: Address,
        deposits: &[DepositRequest],
        tokens: &mut T,
    ) -> Result<BatchReceipt> {
        let result = self.apply_deposits(caller, deposits, tokens);
        match &result {
            Ok(receipt) => info!(
                deposits = deposits.len(),
                tree_number = receipt.tree_number,
                start = receipt.start_position.0,
                root = %receipt.root,
                "deposits accepted"
            ),
            Err(e) => warn!(deposits = deposits.len(), error = %e, "deposits rejected"),
        }
        result
    }

    fn apply_deposits<T: TokenTransfer + ?Sized>(
        &mut self,
        caller: Address,
        deposits: &[DepositRequest],
        tokens: &mut T,
    ) -> Result<BatchReceipt> {
        if deposits.is_empty() {
            return Err(LedgerError::EmptyBatch);
        }

        let mut plan = TransferPlan::new();
        let mut treasury_fees: u128 = 0;
        for (index, deposit) in deposits.iter().enumerate() {
            if deposit.amount == 0 {
                return Err(LedgerError::InvalidDeposit {
                    index,
                    reason: "zero amount".into(),
                });
            }

            let bps = self.fees.bps_for(FeeKind::Deposit, deposit.token.token_type);
            let (fee, total) = fee_on_base(deposit.amount, bps)?;
            plan.transfer_in(index, deposit.token, caller, total);
            plan.transfer_out(index, deposit.token, self.fees.treasury, fee);
            treasury_fees = treasury_fees.checked_add(fee).ok_or(LedgerError::Overflow)?;
        }
        plan.execute(tokens)
            .map_err(|(index, e)| LedgerError::TokenTransferFailed {
                index,
                reason: e.to_string(),
            })?;

        let hasher = self.tree.hasher();
        let notes: Vec<Note> = deposits.iter().map(DepositRequest::to_note).collect();
        let commitments: Vec<NoteCommitment> = notes.iter().map(|n| n.commit(hasher)).collect();
        let insertion = self.tree.insert_leaves(&commitments);

        self.events.push(LedgerEvent::GeneratedCommitmentBatch {
            tree_number: insertion.tree_number,
            start_position: insertion.start_position,
            notes,
            commitments: commitments.clone(),
        });

        Ok(BatchReceipt {
            root: insertion.root,
            tree_number: insertion.tree_number,
            start_position: insertion.start_position,
            commitments: commitments.len(),
            nullifiers: 0,
            treasury_fees,
        })
    }

    /// update fee rates, governor only
    pub fn change_fee(
        &mut self,
        caller: Address,
        deposit_fee_bps: u16,
        withdraw_fee_bps: u16,
        nft_fee_bps: u16,
    ) -> Result<()> {
        self.ensure_governor(caller)?;

        let candidate = FeeConfig {
            deposit_fee_bps,
            withdraw_fee_bps,
            nft_fee_bps,
            ..self.fees
        };
        candidate.validate()?;

        // no event when nothing changes
        if candidate != self.fees {
            self.fees = candidate;
            self.events.push(LedgerEvent::FeeChanged {
                deposit_fee_bps,
                withdraw_fee_bps,
                nft_fee_bps,
            });
            info!(deposit_fee_bps, withdraw_fee_bps, nft_fee_bps, "fees changed");
        }
        Ok(())
    }

    /// redirect fees, governor only
    pub fn change_treasury(&mut self, caller: Address, treasury: Address) -> Result<()> {
        self.ensure_governor(caller)?;

        if treasury != self.fees.treasury {
            self.fees.treasury = treasury;
            self.events.push(LedgerEvent::TreasuryChanged { treasury });
            info!(%treasury, "treasury changed");
        }
        Ok(())
    }

    fn ensure_governor(&self, caller: Address) -> Result<()> {
        if caller != self.config.governor {
            warn!(%caller, "unauthorized fee change");
            return Err(LedgerError::FeeConfigUnauthorized { caller });
        }
        Ok(())
    }

    pub fn current_root(&self) -> MerkleRoot {
        self.tree.current_root()
    }

    pub fn current_tree_number(&self) -> u32 {
        self.tree.current_tree_number()
    }

    pub fn next_free_index(&self) -> u64 {
        self.tree.next_free_index()
    }

    /// `(base, fee)` at the current deposit rate
    pub fn get_base_and_fee(&self, amount: u128, is_total_inclusive: bool) -> Result<(u128, u128)> {
        Ok(base_and_fee(amount, is_total_inclusive, self.fees.deposit_fee_bps)?)
    }

    pub fn fees(&self) -> &FeeConfig {
        &self.fees
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn is_nullified(&self, nullifier: &Nullifier) -> bool {
        self.nullifiers.contains(nullifier)
    }

    pub fn nullifier_count(&self) -> usize {
        self.nullifiers.len()
    }

    pub fn tree(&self) -> &CommitmentTree<H> {
        &self.tree
    }

    pub fn hasher(&self) -> &H {
        self.tree.hasher()
    }

    /// events since the last drain, oldest first
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }
}

/// map a ledger conflict back to the request that caused it
fn conflict_error(requests: &[TransitionRequest], conflict: Conflict) -> LedgerError {
    let nullifier = conflict.nullifier();
    let mut seen = HashSet::new();
    let mut index = 0;

    'outer: for (i, request) in requests.iter().enumerate() {
        for nf in &request.join.nullifiers {
            let matched = match conflict {
                Conflict::AlreadySpent(_) => *nf == nullifier,
                // second occurrence is the offender
                Conflict::Duplicate(_) => *nf == nullifier && !seen.insert(*nf),
            };
            if matched {
                index = i;
                break 'outer;
            }
        }
    }

    LedgerError::NullifierConflict { index, nullifier }
}
