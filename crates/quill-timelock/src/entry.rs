//! Queued call descriptors and their content hashes.

use quill_types::{Address, Amount, Hash, Timestamp};
use serde::{Deserialize, Serialize};

/// An opaque call descriptor awaiting execution.
///
/// The timelock treats the target as a black box: `signature` is a
/// human-readable method descriptor and `call_data` its encoded arguments,
/// both interpreted only by the [`CallExecutor`](crate::CallExecutor) that
/// eventually performs the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedCall {
    /// Collaborator the call is addressed to
    pub target: Address,
    /// Token value forwarded with the call
    pub value: Amount,
    /// Human-readable method signature, e.g. "setParameter(uint256)"
    pub signature: String,
    /// Encoded call arguments
    pub call_data: Vec<u8>,
    /// Earliest execution time
    pub eta: Timestamp,
}

impl QueuedCall {
    /// Content hash uniquely identifying this call.
    ///
    /// Covers target, value, signature, arguments and eta, so re-proposing
    /// the same action with a different eta produces a distinct key.
    pub fn content_hash(&self) -> Hash {
        Hash::compute_framed(&[
            self.target.as_ref(),
            &self.value.to_le_bytes(),
            self.signature.as_bytes(),
            &self.call_data,
            &self.eta.to_le_bytes(),
        ])
    }
}

/// Derived state of a queued entry.
///
/// Canceled entries are removed from the queue and therefore have no state;
/// lookups on them report `UnknownEntry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Waiting for its execution window
    Queued,
    /// Executed exactly once
    Executed,
    /// Execution window lapsed without execution
    Expired,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_call(eta: Timestamp) -> QueuedCall {
        QueuedCall {
            target: Address::from_bytes([9u8; 20]),
            value: 0,
            signature: "setParameter(uint256)".to_string(),
            call_data: vec![0, 0, 0, 42],
            eta,
        }
    }

    #[test]
    fn test_content_hash_deterministic() {
        assert_eq!(sample_call(100).content_hash(), sample_call(100).content_hash());
    }

    #[test]
    fn test_content_hash_covers_eta() {
        assert_ne!(sample_call(100).content_hash(), sample_call(200).content_hash());
    }

    #[test]
    fn test_content_hash_covers_arguments() {
        let a = sample_call(100);
        let mut b = sample_call(100);
        b.call_data = vec![0, 0, 0, 43];
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_queued_call_serde_roundtrip() {
        let call = sample_call(100);
        let json = serde_json::to_string(&call).unwrap();
        let back: QueuedCall = serde_json::from_str(&json).unwrap();
        assert_eq!(call, back);
    }
}
