//! The timelock queue: admin-gated, delay-enforced call execution.

use std::collections::HashMap;

use quill_types::{Address, Amount, Hash, Timestamp};
use serde::{Deserialize, Serialize};

use crate::entry::{EntryState, QueuedCall};
use crate::error::TimelockError;

/// Timelock tunables, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockConfig {
    /// Minimum interval between queuing and execution
    pub min_delay: u64,
    /// Window after eta during which execution stays valid
    pub grace_period: u64,
}

impl Default for TimelockConfig {
    fn default() -> Self {
        Self {
            min_delay: 48 * 60 * 60,      // 48 hours
            grace_period: 7 * 24 * 60 * 60, // 7 days
        }
    }
}

impl TimelockConfig {
    /// Check the configuration is usable.
    ///
    /// A zero delay would collapse the public-reaction window the timelock
    /// exists to provide.
    pub fn validate(&self) -> Result<(), TimelockError> {
        if self.min_delay == 0 {
            return Err(TimelockError::ZeroDelay);
        }
        Ok(())
    }
}

/// Seam through which an executed entry is applied to its target.
///
/// Implementations own the actual collaborators (vesting, staking, faucet,
/// reserve manager, the timelock admin surface itself); the queue only hands
/// them the opaque descriptor. A returned error leaves the entry queued.
pub trait CallExecutor {
    fn call(
        &mut self,
        target: Address,
        value: Amount,
        signature: &str,
        call_data: &[u8],
    ) -> Result<(), String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Slot {
    call: QueuedCall,
    executed: bool,
}

/// Delayed-execution queue with a single admin role.
///
/// All mutating operations take the caller and the current time explicitly;
/// the queue never reads a clock and holds no ambient identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timelock {
    config: TimelockConfig,
    admin: Address,
    pending_admin: Option<Address>,
    entries: HashMap<Hash, Slot>,
}

impl Timelock {
    /// Create a new timelock controlled by `admin`.
    pub fn new(config: TimelockConfig, admin: Address) -> Result<Self, TimelockError> {
        config.validate()?;
        Ok(Self {
            config,
            admin,
            pending_admin: None,
            entries: HashMap::new(),
        })
    }

    pub fn config(&self) -> &TimelockConfig {
        &self.config
    }

    /// Current admin.
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Nominated-but-unaccepted admin, if a handover is in flight.
    pub fn pending_admin(&self) -> Option<Address> {
        self.pending_admin
    }

    /// Look up a queued or executed call by content hash.
    pub fn entry(&self, hash: &Hash) -> Option<&QueuedCall> {
        self.entries.get(hash).map(|slot| &slot.call)
    }

    /// Derived state of an entry. Canceled entries are removed and report
    /// `None`.
    pub fn state_of(&self, hash: &Hash, now: Timestamp) -> Option<EntryState> {
        self.entries.get(hash).map(|slot| {
            if slot.executed {
                EntryState::Executed
            } else if now > slot.call.eta + self.config.grace_period {
                EntryState::Expired
            } else {
                EntryState::Queued
            }
        })
    }

    /// Queue a call for delayed execution. Admin-only.
    ///
    /// `call.eta` must fall within `[now + min_delay, now + min_delay +
    /// grace_period]`.
    pub fn queue(
        &mut self,
        caller: Address,
        call: QueuedCall,
        now: Timestamp,
    ) -> Result<Hash, TimelockError> {
        self.require_admin(caller)?;

        let earliest = now + self.config.min_delay;
        let latest = earliest + self.config.grace_period;
        if call.eta < earliest || call.eta > latest {
            return Err(TimelockError::EtaOutOfRange {
                eta: call.eta,
                earliest,
                latest,
            });
        }

        let hash = call.content_hash();
        if let Some(slot) = self.entries.get(&hash) {
            if slot.executed {
                return Err(TimelockError::AlreadyExecuted(hash));
            }
            return Err(TimelockError::AlreadyQueued(hash));
        }

        tracing::info!(%hash, target = %call.target, eta = call.eta, "queued timelock entry");
        self.entries.insert(hash, Slot { call, executed: false });
        Ok(hash)
    }

    /// Execute a queued call through `executor`. Admin-only.
    ///
    /// Valid only within `[eta, eta + grace_period]` (inclusive on both
    /// ends). A failed target call leaves the entry queued and unchanged.
    pub fn execute(
        &mut self,
        caller: Address,
        hash: &Hash,
        now: Timestamp,
        executor: &mut dyn CallExecutor,
    ) -> Result<(), TimelockError> {
        self.require_admin(caller)?;

        let slot = self
            .entries
            .get_mut(hash)
            .ok_or(TimelockError::UnknownEntry(*hash))?;
        if slot.executed {
            return Err(TimelockError::AlreadyExecuted(*hash));
        }

        let eta = slot.call.eta;
        let deadline = eta + self.config.grace_period;
        if now < eta {
            return Err(TimelockError::NotReady { eta, now });
        }
        if now > deadline {
            return Err(TimelockError::Stale { deadline, now });
        }

        executor
            .call(
                slot.call.target,
                slot.call.value,
                &slot.call.signature,
                &slot.call.call_data,
            )
            .map_err(TimelockError::CallFailed)?;

        // Latch only after the call succeeded.
        slot.executed = true;
        tracing::info!(%hash, target = %slot.call.target, "executed timelock entry");
        Ok(())
    }

    /// Remove a still-pending entry. Admin-only.
    ///
    /// A canceled hash becomes unknown to the queue; later execution
    /// attempts report [`TimelockError::UnknownEntry`].
    pub fn cancel(&mut self, caller: Address, hash: &Hash) -> Result<(), TimelockError> {
        self.require_admin(caller)?;

        match self.entries.get(hash) {
            None => Err(TimelockError::UnknownEntry(*hash)),
            Some(slot) if slot.executed => Err(TimelockError::AlreadyExecuted(*hash)),
            Some(_) => {
                self.entries.remove(hash);
                tracing::info!(%hash, "canceled timelock entry");
                Ok(())
            }
        }
    }

    /// Nominate a new admin. Admin-only, first half of the handover.
    pub fn set_pending_admin(
        &mut self,
        caller: Address,
        new_admin: Address,
    ) -> Result<(), TimelockError> {
        self.require_admin(caller)?;
        tracing::info!(current = %self.admin, nominee = %new_admin, "admin handover started");
        self.pending_admin = Some(new_admin);
        Ok(())
    }

    /// Complete the handover. Callable only by the nominee.
    pub fn accept_admin(&mut self, caller: Address) -> Result<(), TimelockError> {
        let pending = self.pending_admin.ok_or(TimelockError::NoPendingAdmin)?;
        if caller != pending {
            return Err(TimelockError::NotPendingAdmin);
        }
        tracing::info!(previous = %self.admin, new = %caller, "admin handover completed");
        self.admin = caller;
        self.pending_admin = None;
        Ok(())
    }

    // Admin identity is checked against current state on every call, never
    // snapshotted at queue time; a handover in flight does not block other
    // entries.
    fn require_admin(&self, caller: Address) -> Result<(), TimelockError> {
        if caller != self.admin {
            return Err(TimelockError::Unauthorized);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: Address = Address::from_bytes([1u8; 20]);
    const OUTSIDER: Address = Address::from_bytes([2u8; 20]);

    fn timelock() -> Timelock {
        Timelock::new(TimelockConfig::default(), ADMIN).unwrap()
    }

    fn call_with_eta(eta: Timestamp) -> QueuedCall {
        QueuedCall {
            target: Address::from_bytes([9u8; 20]),
            value: 0,
            signature: "acceptAdmin()".to_string(),
            call_data: Vec::new(),
            eta,
        }
    }

    /// Executor that records every call it performs.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<(Address, String)>,
    }

    impl CallExecutor for Recorder {
        fn call(
            &mut self,
            target: Address,
            _value: Amount,
            signature: &str,
            _call_data: &[u8],
        ) -> Result<(), String> {
            self.calls.push((target, signature.to_string()));
            Ok(())
        }
    }

    struct Rejecting;

    impl CallExecutor for Rejecting {
        fn call(&mut self, _: Address, _: Amount, _: &str, _: &[u8]) -> Result<(), String> {
            Err("target refused".to_string())
        }
    }

    #[test]
    fn test_zero_delay_rejected() {
        let config = TimelockConfig { min_delay: 0, grace_period: 100 };
        assert_eq!(
            Timelock::new(config, ADMIN).unwrap_err(),
            TimelockError::ZeroDelay
        );
    }

    #[test]
    fn test_queue_requires_admin() {
        let mut tl = timelock();
        let now = 1_000;
        let call = call_with_eta(now + tl.config().min_delay);
        assert_eq!(
            tl.queue(OUTSIDER, call, now).unwrap_err(),
            TimelockError::Unauthorized
        );
    }

    #[test]
    fn test_queue_eta_bounds() {
        let mut tl = timelock();
        let now = 1_000;
        let earliest = now + tl.config().min_delay;
        let latest = earliest + tl.config().grace_period;

        // Too early and too late rejected
        assert!(matches!(
            tl.queue(ADMIN, call_with_eta(earliest - 1), now),
            Err(TimelockError::EtaOutOfRange { .. })
        ));
        assert!(matches!(
            tl.queue(ADMIN, call_with_eta(latest + 1), now),
            Err(TimelockError::EtaOutOfRange { .. })
        ));

        // Boundaries accepted
        assert!(tl.queue(ADMIN, call_with_eta(earliest), now).is_ok());
        assert!(tl.queue(ADMIN, call_with_eta(latest), now).is_ok());
    }

    #[test]
    fn test_duplicate_queue_rejected() {
        let mut tl = timelock();
        let now = 1_000;
        let call = call_with_eta(now + tl.config().min_delay);

        let hash = tl.queue(ADMIN, call.clone(), now).unwrap();
        assert_eq!(
            tl.queue(ADMIN, call, now).unwrap_err(),
            TimelockError::AlreadyQueued(hash)
        );
    }

    #[test]
    fn test_execute_window() {
        let mut tl = timelock();
        let now = 1_000;
        let eta = now + tl.config().min_delay;
        let deadline = eta + tl.config().grace_period;
        let hash = tl.queue(ADMIN, call_with_eta(eta), now).unwrap();
        let mut exec = Recorder::default();

        // Too early: retryable
        assert_eq!(
            tl.execute(ADMIN, &hash, now + 3_600, &mut exec).unwrap_err(),
            TimelockError::NotReady { eta, now: now + 3_600 }
        );
        assert!(exec.calls.is_empty());

        // Past the grace window: permanent
        assert_eq!(
            tl.execute(ADMIN, &hash, deadline + 1, &mut exec).unwrap_err(),
            TimelockError::Stale { deadline, now: deadline + 1 }
        );
        assert_eq!(tl.state_of(&hash, deadline + 1), Some(EntryState::Expired));

        // Exactly at eta: succeeds
        tl.execute(ADMIN, &hash, eta, &mut exec).unwrap();
        assert_eq!(exec.calls.len(), 1);
        assert_eq!(tl.state_of(&hash, eta), Some(EntryState::Executed));

        // Exactly at the deadline: the window is inclusive on both ends
        let mut last_minute = call_with_eta(eta);
        last_minute.call_data = vec![1];
        let hash2 = tl.queue(ADMIN, last_minute, now).unwrap();
        tl.execute(ADMIN, &hash2, deadline, &mut exec).unwrap();
        assert_eq!(exec.calls.len(), 2);
        assert_eq!(tl.state_of(&hash2, deadline), Some(EntryState::Executed));
    }

    #[test]
    fn test_execute_at_most_once() {
        let mut tl = timelock();
        let now = 1_000;
        let eta = now + tl.config().min_delay;
        let hash = tl.queue(ADMIN, call_with_eta(eta), now).unwrap();
        let mut exec = Recorder::default();

        tl.execute(ADMIN, &hash, eta, &mut exec).unwrap();
        assert_eq!(
            tl.execute(ADMIN, &hash, eta, &mut exec).unwrap_err(),
            TimelockError::AlreadyExecuted(hash)
        );
        assert_eq!(exec.calls.len(), 1);
    }

    #[test]
    fn test_failed_call_leaves_entry_queued() {
        let mut tl = timelock();
        let now = 1_000;
        let eta = now + tl.config().min_delay;
        let hash = tl.queue(ADMIN, call_with_eta(eta), now).unwrap();

        let err = tl.execute(ADMIN, &hash, eta, &mut Rejecting).unwrap_err();
        assert_eq!(err, TimelockError::CallFailed("target refused".to_string()));
        assert_eq!(tl.state_of(&hash, eta), Some(EntryState::Queued));

        // Retry once the target cooperates
        tl.execute(ADMIN, &hash, eta, &mut Recorder::default()).unwrap();
    }

    #[test]
    fn test_cancel_makes_entry_unknown() {
        let mut tl = timelock();
        let now = 1_000;
        let eta = now + tl.config().min_delay;
        let hash = tl.queue(ADMIN, call_with_eta(eta), now).unwrap();

        tl.cancel(ADMIN, &hash).unwrap();
        assert_eq!(tl.state_of(&hash, eta), None);
        assert_eq!(
            tl.execute(ADMIN, &hash, eta, &mut Recorder::default())
                .unwrap_err(),
            TimelockError::UnknownEntry(hash)
        );
    }

    #[test]
    fn test_cancel_executed_rejected() {
        let mut tl = timelock();
        let now = 1_000;
        let eta = now + tl.config().min_delay;
        let hash = tl.queue(ADMIN, call_with_eta(eta), now).unwrap();
        tl.execute(ADMIN, &hash, eta, &mut Recorder::default()).unwrap();

        assert_eq!(
            tl.cancel(ADMIN, &hash).unwrap_err(),
            TimelockError::AlreadyExecuted(hash)
        );
    }

    #[test]
    fn test_admin_handover_two_phase() {
        let mut tl = timelock();
        let nominee = Address::from_bytes([3u8; 20]);

        // Only admin may nominate
        assert_eq!(
            tl.set_pending_admin(OUTSIDER, nominee).unwrap_err(),
            TimelockError::Unauthorized
        );
        tl.set_pending_admin(ADMIN, nominee).unwrap();

        // Nomination alone changes nothing
        assert_eq!(tl.admin(), ADMIN);
        assert_eq!(tl.pending_admin(), Some(nominee));

        // Only the nominee may accept
        assert_eq!(
            tl.accept_admin(OUTSIDER).unwrap_err(),
            TimelockError::NotPendingAdmin
        );
        tl.accept_admin(nominee).unwrap();
        assert_eq!(tl.admin(), nominee);
        assert_eq!(tl.pending_admin(), None);

        // Old admin lost its authority
        let now = 1_000;
        let call = call_with_eta(now + tl.config().min_delay);
        assert_eq!(
            tl.queue(ADMIN, call.clone(), now).unwrap_err(),
            TimelockError::Unauthorized
        );
        assert!(tl.queue(nominee, call, now).is_ok());
    }

    #[test]
    fn test_accept_without_nomination() {
        let mut tl = timelock();
        assert_eq!(
            tl.accept_admin(OUTSIDER).unwrap_err(),
            TimelockError::NoPendingAdmin
        );
    }

    #[test]
    fn test_pending_handover_does_not_block_entries() {
        let mut tl = timelock();
        let now = 1_000;
        let eta = now + tl.config().min_delay;
        let hash = tl.queue(ADMIN, call_with_eta(eta), now).unwrap();

        tl.set_pending_admin(ADMIN, Address::from_bytes([3u8; 20])).unwrap();

        // Current admin keeps executing while the handover is unaccepted
        tl.execute(ADMIN, &hash, eta, &mut Recorder::default()).unwrap();
    }
}
