//! public token movements
//!
//! the ledger does not hold balances. it drives a [`TokenTransfer`]
//! collaborator through a [`TransferPlan`], which undoes executed steps when
//! a later one fails so a rejected batch moves no value.

use std::collections::{HashMap, HashSet};

use tracing::{debug, error};

use crate::value::{Address, TokenData};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("insufficient balance for {account}: need {needed}, have {available}")]
    InsufficientBalance {
        account: Address,
        needed: u128,
        available: u128,
    },
    #[error("insufficient pool balance: need {needed}, have {available}")]
    InsufficientPool { needed: u128, available: u128 },
    #[error("transfer rejected by {account}")]
    Rejected { account: Address },
    #[error("balance overflow")]
    Overflow,
}

/// moves public token value between accounts and the pool
pub trait TokenTransfer {
    /// pull `amount` from `from` into the pool
    fn transfer_in(&mut self, token: &TokenData, from: Address, amount: u128) -> Result<(), TransferError>;

    /// pay `amount` from the pool to `to`
    fn transfer_out(&mut self, token: &TokenData, to: Address, amount: u128) -> Result<(), TransferError>;
}

/// direction of one planned step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

/// one planned step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    /// request the step belongs to
    pub index: usize,
    pub token: TokenData,
    pub direction: Direction,
    pub account: Address,
    pub amount: u128,
}

impl Transfer {
    fn apply<T: TokenTransfer + ?Sized>(&self, tokens: &mut T) -> Result<(), TransferError> {
        match self.direction {
            Direction::In => tokens.transfer_in(&self.token, self.account, self.amount),
            Direction::Out => tokens.transfer_out(&self.token, self.account, self.amount),
        }
    }

    fn undo<T: TokenTransfer + ?Sized>(&self, tokens: &mut T) -> Result<(), TransferError> {
        match self.direction {
            Direction::In => tokens.transfer_out(&self.token, self.account, self.amount),
            Direction::Out => tokens.transfer_in(&self.token, self.account, self.amount),
        }
    }
}

/// ordered token movements of one batch
#[derive(Clone, Debug, Default)]
pub struct TransferPlan {
    steps: Vec<Transfer>,
}

impl TransferPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// plan a pull into the pool, zero amounts are skipped
    pub fn transfer_in(&mut self, index: usize, token: TokenData, from: Address, amount: u128) {
        self.push(index, token, Direction::In, from, amount);
    }

    /// plan a payout from the pool, zero amounts are skipped
    pub fn transfer_out(&mut self, index: usize, token: TokenData, to: Address, amount: u128) {
        self.push(index, token, Direction::Out, to, amount);
    }

    fn push(&mut self, index: usize, token: TokenData, direction: Direction, account: Address, amount: u128) {
        if amount == 0 {
            return;
        }
        self.steps.push(Transfer {
            index,
            token,
            direction,
            account,
            amount,
        });
    }

    pub fn steps(&self) -> &[Transfer] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// run every step in order
    ///
    /// on failure the executed steps are undone in reverse order and the
    /// failing request index is returned with the error
    pub fn execute<T: TokenTransfer + ?Sized>(&self, tokens: &mut T) -> Result<(), (usize, TransferError)> {
        for (done, step) in self.steps.iter().enumerate() {
            if let Err(e) = step.apply(tokens) {
                debug!(index = step.index, error = %e, "transfer failed, compensating");
                Self::compensate(&self.steps[..done], tokens);
                return Err((step.index, e));
            }
        }
        Ok(())
    }

    /// undo a fully executed plan
    pub fn revert<T: TokenTransfer + ?Sized>(&self, tokens: &mut T) {
        Self::compensate(&self.steps, tokens);
    }

    fn compensate<T: TokenTransfer + ?Sized>(executed: &[Transfer], tokens: &mut T) {
        for step in executed.iter().rev() {
            if let Err(e) = step.undo(tokens) {
                error!(
                    index = step.index,
                    account = %step.account,
                    amount = %step.amount,
                    error = %e,
                    "failed to compensate transfer"
                );
            }
        }
    }
}

/// in-memory balances for tests and off-ledger tooling
#[derive(Clone, Debug, Default)]
pub struct InMemoryTokens {
    balances: HashMap<(TokenData, Address), u128>,
    pool: HashMap<TokenData, u128>,
    rejecting: HashSet<Address>,
}

impl InMemoryTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// credit `amount` to `account` out of thin air
    pub fn mint(&mut self, token: TokenData, account: Address, amount: u128) {
        let balance = self.balances.entry((token, account)).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn balance_of(&self, token: &TokenData, account: Address) -> u128 {
        self.balances.get(&(*token, account)).copied().unwrap_or(0)
    }

    pub fn pool_balance(&self, token: &TokenData) -> u128 {
        self.pool.get(token).copied().unwrap_or(0)
    }

    /// make every transfer touching `account` fail
    pub fn reject(&mut self, account: Address) {
        self.rejecting.insert(account);
    }

    pub fn accept(&mut self, account: Address) {
        self.rejecting.remove(&account);
    }

    fn check_account(&self, account: Address) -> Result<(), TransferError> {
        if self.rejecting.contains(&account) {
            return Err(TransferError::Rejected { account });
        }
        Ok(())
    }
}

impl TokenTransfer for InMemoryTokens {
    fn transfer_in(&mut self, token: &TokenData, from: Address, amount: u128) -> Result<(), TransferError> {
        self.check_account(from)?;

        let available = self.balance_of(token, from);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                account: from,
                needed: amount,
                available,
            });
        }
        let pool = self
            .pool_balance(token)
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;

        self.balances.insert((*token, from), available - amount);
        self.pool.insert(*token, pool);
        Ok(())
    }

    fn transfer_out(&mut self, token: &TokenData, to: Address, amount: u128) -> Result<(), TransferError> {
        self.check_account(to)?;

        let available = self.pool_balance(token);
        if available < amount {
            return Err(TransferError::InsufficientPool {
                needed: amount,
                available,
            });
        }
        let balance = self
            .balance_of(token, to)
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;

        self.pool.insert(*token, available - amount);
        self.balances.insert((*token, to), balance);
        Ok(())
    }
}
