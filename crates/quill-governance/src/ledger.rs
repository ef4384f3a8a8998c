//! Token ledger collaborator contract.
//!
//! The governance engine never holds balances itself; it pulls locked tokens
//! into a custody account through this trait and reads balances for nothing
//! else. The fungible-token ledger proper (transfers, allowances, supply) is
//! an external system.

use std::collections::HashMap;

use quill_types::{Address, Amount};
use thiserror::Error;

/// Errors reported by a token ledger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: Amount, available: Amount },
}

/// Read/write contract the engine consumes from the token ledger.
pub trait TokenLedger {
    /// Current balance of `who`.
    fn balance_of(&self, who: Address) -> Amount;

    /// Move `amount` from `from` to `to`.
    ///
    /// Must be atomic: on error no balance changes.
    fn transfer(&mut self, from: Address, to: Address, amount: Amount)
        -> Result<(), LedgerError>;
}

/// Minimal in-process ledger for embedding hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    balances: HashMap<Address, Amount>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `who`.
    pub fn mint(&mut self, who: Address, amount: Amount) {
        *self.balances.entry(who).or_insert(0) += amount;
    }
}

impl TokenLedger for InMemoryLedger {
    fn balance_of(&self, who: Address) -> Amount {
        self.balances.get(&who).copied().unwrap_or(0)
    }

    fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        *self.balances.entry(from).or_insert(0) -= amount;
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }
}
