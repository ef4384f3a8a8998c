use quill_types::{Hash, Timestamp};
use thiserror::Error;

/// Errors that can occur in timelock operations.
///
/// Timing violations are split into [`TimelockError::NotReady`] (a retry with
/// no state change may later succeed) and [`TimelockError::Stale`] (the entry
/// can never execute again); callers must not collapse the two.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimelockError {
    #[error("Caller is not the timelock admin")]
    Unauthorized,

    #[error("Eta {eta} outside allowed window [{earliest}, {latest}]")]
    EtaOutOfRange {
        eta: Timestamp,
        earliest: Timestamp,
        latest: Timestamp,
    },

    #[error("Entry already queued: {0}")]
    AlreadyQueued(Hash),

    #[error("Unknown entry: {0}")]
    UnknownEntry(Hash),

    #[error("Entry already executed: {0}")]
    AlreadyExecuted(Hash),

    #[error("Entry not ready: eta {eta}, now {now}")]
    NotReady { eta: Timestamp, now: Timestamp },

    #[error("Entry is stale: execution deadline {deadline}, now {now}")]
    Stale { deadline: Timestamp, now: Timestamp },

    #[error("Target call failed: {0}")]
    CallFailed(String),

    #[error("Minimum delay must be non-zero")]
    ZeroDelay,

    #[error("No pending admin handover")]
    NoPendingAdmin,

    #[error("Caller is not the pending admin")]
    NotPendingAdmin,
}
