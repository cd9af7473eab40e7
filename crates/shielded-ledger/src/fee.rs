//! fee engine
//!
//! fees are integer basis points (1/10000). two directions:
//! - fee on top: caller names the base, pays `base + fee`
//! - fee included: caller names the total, which is split into base and fee
//!
//! everything is floor division on u128, arranged so that no intermediate
//! product can overflow for bps <= 10000.

use serde::{Deserialize, Serialize};

use crate::value::{Address, TokenType};

/// basis points denominator
pub const BASIS_POINTS: u128 = 10_000;

/// highest configurable fee (100%)
pub const MAX_FEE_BPS: u16 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FeeError {
    #[error("fee of {0} basis points exceeds 10000")]
    OutOfRange(u16),
    #[error("base plus fee overflows")]
    Overflow,
}

fn check_bps(bps: u16) -> Result<u128, FeeError> {
    if bps > MAX_FEE_BPS {
        return Err(FeeError::OutOfRange(bps));
    }
    Ok(u128::from(bps))
}

/// fee charged on top of `base`, returns `(fee, total)`
///
/// `fee = floor(base * bps / 10000)`
pub fn fee_on_base(base: u128, bps: u16) -> Result<(u128, u128), FeeError> {
    let bps = check_bps(bps)?;
    let fee = (base / BASIS_POINTS) * bps + (base % BASIS_POINTS) * bps / BASIS_POINTS;
    let total = base.checked_add(fee).ok_or(FeeError::Overflow)?;
    Ok((fee, total))
}

/// split a fee-inclusive `total` into `(base, fee)`
///
/// `base = floor(total * 10000 / (10000 + bps))`, `fee = total - base`
pub fn split_total(total: u128, bps: u16) -> Result<(u128, u128), FeeError> {
    let bps = check_bps(bps)?;
    let divisor = BASIS_POINTS + bps;
    let base = (total / divisor) * BASIS_POINTS + (total % divisor) * BASIS_POINTS / divisor;
    Ok((base, total - base))
}

/// `(base, fee)` for an amount that either includes the fee or not
pub fn base_and_fee(amount: u128, is_total_inclusive: bool, bps: u16) -> Result<(u128, u128), FeeError> {
    if is_total_inclusive {
        split_total(amount, bps)
    } else {
        let (fee, _) = fee_on_base(amount, bps)?;
        Ok((amount, fee))
    }
}

/// direction of a public value movement
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeeKind {
    Deposit,
    Withdraw,
}

/// fee schedule and where fees go
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    pub deposit_fee_bps: u16,
    pub withdraw_fee_bps: u16,
    /// flat rate for nft-like tokens, both directions
    pub nft_fee_bps: u16,
    pub treasury: Address,
}

impl FeeConfig {
    pub fn new(deposit_fee_bps: u16, withdraw_fee_bps: u16, nft_fee_bps: u16, treasury: Address) -> Self {
        Self {
            deposit_fee_bps,
            withdraw_fee_bps,
            nft_fee_bps,
            treasury,
        }
    }

    /// rate applying to a movement of `token_type` in direction `kind`
    pub fn bps_for(&self, kind: FeeKind, token_type: TokenType) -> u16 {
        match (token_type, kind) {
            (TokenType::NonFungible, _) => self.nft_fee_bps,
            (TokenType::Fungible, FeeKind::Deposit) => self.deposit_fee_bps,
            (TokenType::Fungible, FeeKind::Withdraw) => self.withdraw_fee_bps,
        }
    }

    pub fn validate(&self) -> Result<(), FeeError> {
        for bps in [self.deposit_fee_bps, self.withdraw_fee_bps, self.nft_fee_bps] {
            check_bps(bps)?;
        }
        Ok(())
    }
}
