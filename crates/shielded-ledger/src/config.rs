//! ledger configuration

use serde::{Deserialize, Serialize};

use crate::commitment::MAX_TREE_DEPTH;
use crate::fee::{FeeConfig, FeeError};
use crate::value::Address;

/// default commitment tree depth
pub const DEFAULT_TREE_DEPTH: u8 = 16;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tree depth {0} outside 1..=32")]
    InvalidDepth(u8),

    #[error("invalid fee schedule: {0}")]
    Fee(#[from] FeeError),

    #[error("circuit limit {0} must be non-zero")]
    ZeroLimit(&'static str),
}

/// largest join/split shape a verifier accepts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitLimits {
    pub max_nullifiers: usize,
    pub max_commitments: usize,
}

impl Default for CircuitLimits {
    fn default() -> Self {
        Self {
            max_nullifiers: 10,
            max_commitments: 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub tree_depth: u8,
    pub fees: FeeConfig,
    /// only address allowed to change fees and treasury
    pub governor: Address,
    /// earlier roots of the active tree still accepted as anchors (0 = exact)
    pub root_history: usize,
    pub limits: CircuitLimits,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            tree_depth: DEFAULT_TREE_DEPTH,
            fees: FeeConfig::default(),
            governor: Address::ZERO,
            root_history: 0,
            limits: CircuitLimits::default(),
        }
    }
}

impl LedgerConfig {
    /// parse and validate
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tree_depth == 0 || self.tree_depth > MAX_TREE_DEPTH {
            return Err(ConfigError::InvalidDepth(self.tree_depth));
        }
        self.fees.validate()?;
        if self.limits.max_nullifiers == 0 {
            return Err(ConfigError::ZeroLimit("max_nullifiers"));
        }
        if self.limits.max_commitments == 0 {
            return Err(ConfigError::ZeroLimit("max_commitments"));
        }
        Ok(())
    }
}
