//! Quill Types - Core type definitions for the QUILL governance engine.
//!
//! This crate provides the fundamental types shared by the governance and
//! timelock crates:
//! - Principals (20-byte addresses, Bech32m encoded)
//! - Hashes (32-byte, blake3 digests)
//! - Token amounts and timestamps

pub mod address;
pub mod error;
pub mod hash;

pub use address::Address;
pub use error::TypesError;
pub use hash::Hash;

/// Token amount in minor units.
pub type Amount = u128;

/// Wall-clock time in seconds since the unix epoch.
///
/// The engine never reads a clock itself; callers pass `now` into every
/// time-sensitive operation so state transitions stay deterministic.
pub type Timestamp = u64;
