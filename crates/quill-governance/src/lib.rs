//! Quill Governance - Proposal lifecycle and voting for the QUILL protocol.
//!
//! This crate provides:
//! - Locked-balance voting power with quadratic weighting
//! - Proposal lifecycle management with time-derived state
//! - The orchestrator composing voting with the timelock queue
//!
//! The token ledger and every administrative target (vesting, staking,
//! faucet, reserve manager) are external collaborators reached through the
//! [`TokenLedger`] and [`quill_timelock::CallExecutor`] seams.

pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod proposal;
pub mod stake;

pub use config::GovernanceConfig;
pub use engine::GovernanceEngine;
pub use error::GovernanceError;
pub use ledger::{InMemoryLedger, LedgerError, TokenLedger};
pub use proposal::{Proposal, ProposalAction, ProposalState, ProposalStore, VoteReceipt, VoteSupport};
pub use stake::{integer_sqrt, StakeLedger};
