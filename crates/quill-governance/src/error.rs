use quill_timelock::TimelockError;
use quill_types::Amount;
use thiserror::Error;

use crate::proposal::ProposalState;

/// Errors that can occur in governance operations.
///
/// Every variant is a synchronous rejection: the operation that produced it
/// left no partial state behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Lock below minimum: minimum {minimum}, would hold {amount}")]
    BelowMinimumLock { minimum: Amount, amount: Amount },

    #[error("Insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: Amount, available: Amount },

    #[error("Unlock exceeds locked amount: locked {locked}, requested {requested}")]
    ExceedsLocked { locked: Amount, requested: Amount },

    #[error("Locked tokens in use by proposal {0}")]
    LockInUse(u64),

    #[error("Voting power below proposal threshold: required {required}, have {actual}")]
    BelowThreshold { required: u64, actual: u64 },

    #[error("Proposal not found: {0}")]
    ProposalNotFound(u64),

    #[error("Proposal has no actions")]
    NoActions,

    #[error("Too many actions: max {max}, got {actual}")]
    TooManyActions { max: usize, actual: usize },

    #[error("Voting is closed for this proposal")]
    VotingClosed,

    #[error("Already voted")]
    AlreadyVoted,

    #[error("Caller has no voting power")]
    NoVotingPower,

    #[error("Proposal in state {actual:?}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: ProposalState,
    },

    #[error("Caller may not cancel this proposal")]
    CannotCancel,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Timelock(#[from] TimelockError),
}

impl From<crate::ledger::LedgerError> for GovernanceError {
    fn from(e: crate::ledger::LedgerError) -> Self {
        match e {
            crate::ledger::LedgerError::InsufficientBalance { needed, available } => {
                GovernanceError::InsufficientBalance { needed, available }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GovernanceError::BelowThreshold { required: 80, actual: 10 };
        assert!(err.to_string().contains("80"));
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn test_timelock_error_passthrough() {
        // The retryable/permanent timing distinction must survive wrapping.
        let err = GovernanceError::from(TimelockError::NotReady { eta: 100, now: 50 });
        assert!(matches!(
            err,
            GovernanceError::Timelock(TimelockError::NotReady { .. })
        ));
    }
}
