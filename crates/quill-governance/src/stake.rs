//! Locked-balance voting power with quadratic weighting.
//!
//! Voting power = floor(sqrt(locked_amount))
//!
//! The square-root transform caps the marginal influence of large holders
//! relative to linear weighting without requiring off-chain identity. Power
//! is derived on demand from the locked balance, never cached, so a lock
//! mutation is visible to the next read.

use std::collections::HashMap;

use quill_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;
use crate::ledger::TokenLedger;

/// A principal's locked-token position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    /// Tokens held in custody
    pub amount: Amount,
    /// Time of the first lock
    pub locked_at: Timestamp,
}

/// Integer square root using Newton's method.
/// Returns floor(sqrt(n)).
pub fn integer_sqrt(n: u128) -> u128 {
    if n <= 1 {
        return n;
    }

    // n / 2 >= sqrt(n) for n >= 4; the n = 2, 3 cases already sit at the
    // fixed point.
    let mut x = n / 2;
    let mut y = (x + n / x) / 2;

    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }

    x
}

/// Tracks locked balances per principal and derives voting power.
///
/// Locked tokens live in a custody account on the external token ledger; the
/// stake ledger records who they belong to.
#[derive(Debug, Clone)]
pub struct StakeLedger {
    custody: Address,
    min_lock: Amount,
    locks: HashMap<Address, Lock>,
    total_locked: Amount,
}

impl StakeLedger {
    pub fn new(custody: Address, min_lock: Amount) -> Self {
        Self {
            custody,
            min_lock,
            locks: HashMap::new(),
            total_locked: 0,
        }
    }

    /// Lock `amount` tokens, pulling them from the principal's balance into
    /// custody. Creates the lock on first use, increases it afterwards.
    pub fn lock(
        &mut self,
        token: &mut dyn TokenLedger,
        principal: Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        if amount == 0 {
            return Err(GovernanceError::InvalidAmount);
        }

        let held = self.locked_of(principal);
        let new_total = held + amount;
        if new_total < self.min_lock {
            return Err(GovernanceError::BelowMinimumLock {
                minimum: self.min_lock,
                amount: new_total,
            });
        }

        token.transfer(principal, self.custody, amount)?;

        self.locks
            .entry(principal)
            .and_modify(|lock| lock.amount += amount)
            .or_insert(Lock { amount, locked_at: now });
        self.total_locked += amount;

        tracing::debug!(%principal, amount, total = new_total, "tokens locked");
        Ok(())
    }

    /// Release `amount` locked tokens back to the principal.
    ///
    /// The remainder must be zero or stay above the minimum lock. The caller
    /// is responsible for refusing unlocks while the principal has live
    /// proposals.
    pub fn unlock(
        &mut self,
        token: &mut dyn TokenLedger,
        principal: Address,
        amount: Amount,
    ) -> Result<(), GovernanceError> {
        if amount == 0 {
            return Err(GovernanceError::InvalidAmount);
        }

        let held = self.locked_of(principal);
        if amount > held {
            return Err(GovernanceError::ExceedsLocked {
                locked: held,
                requested: amount,
            });
        }

        let remaining = held - amount;
        if remaining != 0 && remaining < self.min_lock {
            return Err(GovernanceError::BelowMinimumLock {
                minimum: self.min_lock,
                amount: remaining,
            });
        }

        token.transfer(self.custody, principal, amount)?;

        if remaining == 0 {
            self.locks.remove(&principal);
        } else if let Some(lock) = self.locks.get_mut(&principal) {
            lock.amount = remaining;
        }
        self.total_locked -= amount;

        tracing::debug!(%principal, amount, remaining, "tokens unlocked");
        Ok(())
    }

    /// Voting power: floor(sqrt(locked)). Zero for principals with no lock.
    pub fn voting_power_of(&self, principal: Address) -> u64 {
        // sqrt of a u128 always fits in u64
        integer_sqrt(self.locked_of(principal)) as u64
    }

    /// Tokens currently locked by `principal`.
    pub fn locked_of(&self, principal: Address) -> Amount {
        self.locks.get(&principal).map(|l| l.amount).unwrap_or(0)
    }

    /// Current governance-participating supply, the quorum base.
    pub fn total_locked(&self) -> Amount {
        self.total_locked
    }

    /// The lock record for `principal`, if any.
    pub fn lock_of(&self, principal: Address) -> Option<&Lock> {
        self.locks.get(&principal)
    }
}
