//! Governance configuration.
//!
//! Every tunable the protocol documentation names is configuration here, not
//! a hidden constant. Parameter changes themselves go through governance: a
//! queued action targets whatever component owns the parameter.

use quill_timelock::TimelockConfig;
use quill_types::{Address, Amount};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// Tunables of the governance engine. Durations are in seconds, the quorum
/// in basis points of the current locked supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Minimum voting power required to create a proposal
    pub proposal_threshold: u64,
    /// Minimum tokens a lock must hold
    pub min_lock_amount: Amount,
    /// Maximum actions per proposal
    pub max_actions: usize,
    /// Length of the voting window
    pub voting_period: u64,
    /// Quorum as basis points of current locked supply (400 = 4%)
    pub quorum_bps: u16,
    /// Account holding locked tokens
    pub custody: Address,
    /// Timelock delay and grace window
    pub timelock: TimelockConfig,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            proposal_threshold: 80,
            min_lock_amount: 100,
            max_actions: 10,
            voting_period: 3 * 24 * 60 * 60, // 3 days
            quorum_bps: 400,                 // 4%
            custody: Address::ZERO,
            timelock: TimelockConfig::default(),
        }
    }
}

impl GovernanceConfig {
    /// Parse a configuration from TOML.
    pub fn from_toml_str(s: &str) -> Result<Self, GovernanceError> {
        let config: Self =
            toml::from_str(s).map_err(|e| GovernanceError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.quorum_bps > 10_000 {
            return Err(GovernanceError::InvalidConfig(format!(
                "quorum_bps {} exceeds 10000",
                self.quorum_bps
            )));
        }
        if self.voting_period == 0 {
            return Err(GovernanceError::InvalidConfig(
                "voting_period must be non-zero".to_string(),
            ));
        }
        if self.max_actions == 0 {
            return Err(GovernanceError::InvalidConfig(
                "max_actions must be at least 1".to_string(),
            ));
        }
        self.timelock
            .validate()
            .map_err(GovernanceError::Timelock)
    }
}
