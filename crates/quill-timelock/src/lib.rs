//! Quill Timelock - Delayed execution of approved administrative calls.
//!
//! This crate provides:
//! - A queue of opaque call descriptors keyed by content hash
//! - A minimum delay and grace window gating execution
//! - A single admin role with two-phase handover
//!
//! The queue never inspects the calls it holds; execution is delegated to a
//! [`CallExecutor`] supplied by the embedding host.

pub mod entry;
pub mod error;
pub mod queue;

pub use entry::{EntryState, QueuedCall};
pub use error::TimelockError;
pub use queue::{CallExecutor, Timelock, TimelockConfig};
