//! Engine configuration options.

use crate::config::{ConfigError, EscrowConfig};

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deployment limits every escrow is held to.
    pub limits: EscrowConfig,
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
}

impl EngineConfig {
    pub fn new(limits: EscrowConfig) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.limits.validate()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            limits: EscrowConfig::default(),
            max_events: 100_000,
        }
    }
}
