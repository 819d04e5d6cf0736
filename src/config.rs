// 7.0 config.rs: every global limit in one place. time-locks, caps, dust, mint rules.
// 7.1 injected per deployment, never compiled in. presets for localnet/devnet/mainnet.

use serde::{Deserialize, Serialize};

use crate::types::Amount;

// 1 USDC in base units
const USDC: u64 = 1_000_000;

/// Limits enforced by every escrow in a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowConfig {
    // Seconds a delegated authority must wait before it can move funds
    pub min_authority_age: i64,
    // Seconds after a pause before unpause is accepted
    pub unpause_cooldown: i64,
    // Clock skew tolerated between callers and the ledger
    pub timestamp_tolerance: i64,
    // Per-call cap on platform fee withdrawals
    pub max_subscription_fee: Amount,
    // Per-call cap on trade withdrawals
    pub max_transaction_amount: Amount,
    // Used when initialize asks for max_balance = 0
    pub default_max_balance: Amount,
    // Hard ceiling for any escrow's max_balance
    pub max_allowed_balance: Amount,
    // Largest balance that still counts as empty for close
    pub dust_threshold: Amount,
    pub min_token_decimals: u8,
    pub max_token_decimals: u8,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            min_authority_age: 300, // 5 minutes
            unpause_cooldown: 300,  // 5 minutes
            timestamp_tolerance: 30,
            max_subscription_fee: Amount::new(1_000 * USDC),
            max_transaction_amount: Amount::new(100_000 * USDC),
            default_max_balance: Amount::new(1_000_000 * USDC),
            max_allowed_balance: Amount::new(10_000_000 * USDC),
            dust_threshold: Amount::new(10),
            min_token_decimals: 6,
            max_token_decimals: 9,
        }
    }
}

impl EscrowConfig {
    // Short locks so manual testing doesn't stall
    pub fn localnet() -> Self {
        Self {
            min_authority_age: 30,
            unpause_cooldown: 30,
            ..Self::default()
        }
    }

    // Devnet keeps mainnet timings but smaller caps
    pub fn devnet() -> Self {
        Self {
            max_subscription_fee: Amount::new(100 * USDC),
            max_transaction_amount: Amount::new(10_000 * USDC),
            default_max_balance: Amount::new(100_000 * USDC),
            max_allowed_balance: Amount::new(1_000_000 * USDC),
            ..Self::default()
        }
    }

    // Longer windows give owners more time to spot a bad delegation
    pub fn mainnet() -> Self {
        Self {
            min_authority_age: 900, // 15 minutes
            unpause_cooldown: 600,  // 10 minutes
            ..Self::default()
        }
    }

    /// Check the limits are internally consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_authority_age < 0 || self.unpause_cooldown < 0 || self.timestamp_tolerance < 0 {
            return Err(ConfigError::InvalidTiming {
                reason: "durations must be non-negative".to_string(),
            });
        }

        // a time-lock shorter than clock skew can be dodged by a fast clock
        if self.min_authority_age < self.timestamp_tolerance {
            return Err(ConfigError::InvalidTiming {
                reason: "authority time-lock shorter than timestamp tolerance".to_string(),
            });
        }

        if self.default_max_balance > self.max_allowed_balance {
            return Err(ConfigError::InvalidLimits {
                reason: "default max balance exceeds allowed max balance".to_string(),
            });
        }

        if self.max_transaction_amount >= self.default_max_balance {
            return Err(ConfigError::InvalidLimits {
                reason: "per-trade cap must be below default max balance".to_string(),
            });
        }

        if self.max_subscription_fee >= self.max_transaction_amount {
            return Err(ConfigError::InvalidLimits {
                reason: "subscription fee cap must be below per-trade cap".to_string(),
            });
        }

        if self.dust_threshold >= self.max_subscription_fee {
            return Err(ConfigError::InvalidLimits {
                reason: "dust threshold must be below subscription fee cap".to_string(),
            });
        }

        if self.min_token_decimals > self.max_token_decimals {
            return Err(ConfigError::InvalidMint {
                reason: "min decimals above max decimals".to_string(),
            });
        }

        Ok(())
    }

    pub fn accepts_decimals(&self, decimals: u8) -> bool {
        (self.min_token_decimals..=self.max_token_decimals).contains(&decimals)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid timing: {reason}")]
    InvalidTiming { reason: String },

    #[error("Invalid limits: {reason}")]
    InvalidLimits { reason: String },

    #[error("Invalid mint rules: {reason}")]
    InvalidMint { reason: String },
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Localnet,
    Devnet,
    Mainnet,
}

impl Environment {
    pub fn config(&self) -> EscrowConfig {
        match self {
            Environment::Localnet => EscrowConfig::localnet(),
            Environment::Devnet => EscrowConfig::devnet(),
            Environment::Mainnet => EscrowConfig::mainnet(),
        }
    }
}
