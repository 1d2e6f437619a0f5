// 7.0 config.rs: all settings in one place. currency, rounding, retry bounds.
// 7.1 Environment presets pick sane defaults per deployment.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Shares;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    // Currency code stamped on new ledger rows
    pub currency: String,
    // Smallest currency increment allocations are rounded to (0.01 = cents)
    pub currency_increment: Decimal,
    // Transparent retries for transient store failures before surfacing them
    pub persistence_retries: u32,
    // Attempts at claiming a period number before giving up on a conflict
    pub settlement_conflict_retries: u32,
    // Smallest tradable share unit, used when the caller gives none
    pub default_share_unit: Shares,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            currency_increment: dec!(0.01),
            persistence_retries: 3,
            settlement_conflict_retries: 5,
            default_share_unit: Shares::new_unchecked(Decimal::ONE),
        }
    }
}

impl LedgerConfig {
    // Whole-unit currency with half-share trading, e.g. a members' club in JPY
    pub fn whole_units(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            currency_increment: Decimal::ONE,
            default_share_unit: Shares::new_unchecked(dec!(0.5)),
            ..Self::default()
        }
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.currency.trim().is_empty() {
            return Err(ConfigError::InvalidCurrency {
                reason: "Currency code must not be empty".to_string(),
            });
        }

        if self.currency_increment <= Decimal::ZERO {
            return Err(ConfigError::InvalidCurrency {
                reason: "Currency increment must be positive".to_string(),
            });
        }

        if self.settlement_conflict_retries == 0 {
            return Err(ConfigError::InvalidRetries {
                reason: "Need at least 1 settlement attempt".to_string(),
            });
        }

        if self.default_share_unit.is_zero() {
            return Err(ConfigError::InvalidShareUnit {
                reason: "Share unit must be positive".to_string(),
            });
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid currency: {reason}")]
    InvalidCurrency { reason: String },

    #[error("invalid retry settings: {reason}")]
    InvalidRetries { reason: String },

    #[error("invalid share unit: {reason}")]
    InvalidShareUnit { reason: String },
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn config(&self) -> LedgerConfig {
        match self {
            // fail fast locally so store hiccups are visible
            Environment::Development => LedgerConfig {
                persistence_retries: 0,
                ..LedgerConfig::default()
            },
            Environment::Staging => LedgerConfig::default(),
            Environment::Production => LedgerConfig {
                persistence_retries: 5,
                settlement_conflict_retries: 10,
                ..LedgerConfig::default()
            },
        }
    }
}
