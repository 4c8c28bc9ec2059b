//! Fungible-balance ledger collaborator.
//!
//! The treasury and the reward engine are callers of the ledger, never its
//! owners. Durability and replication are outside the core.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::error::LedgerError;
use crate::identity::Principal;

/// Token amount in the smallest indivisible unit.
pub type Amount = u64;

pub trait Ledger: Send + Sync {
    /// Credit `amount` to `account`, returning the new balance.
    fn credit(&self, account: &Principal, amount: Amount) -> Result<Amount, LedgerError>;

    /// Debit `amount` from `account`, returning the new balance.
    /// Fails without effect if the balance is insufficient.
    fn debit(&self, account: &Principal, amount: Amount) -> Result<Amount, LedgerError>;

    fn balance_of(&self, account: &Principal) -> Amount;

    /// Move `amount` between accounts as one unit.
    ///
    /// The default composes `debit` and `credit` and re-credits the source
    /// if the credit fails. Implementations with a single lock should
    /// override it.
    fn transfer(&self, from: &Principal, to: &Principal, amount: Amount) -> Result<(), LedgerError> {
        self.debit(from, amount)?;
        if let Err(e) = self.credit(to, amount) {
            self.credit(from, amount)?;
            return Err(e);
        }
        Ok(())
    }
}

/// Ledger held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: RwLock<HashMap<Principal, Amount>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a ledger with opening balances.
    pub fn with_balances(balances: impl IntoIterator<Item = (Principal, Amount)>) -> Self {
        Self {
            balances: RwLock::new(balances.into_iter().collect()),
        }
    }

    /// Sum of all balances.
    pub fn total_supply(&self) -> Amount {
        self.balances
            .read()
            .map(|b| b.values().copied().fold(0, Amount::saturating_add))
            .unwrap_or(0)
    }

    fn check_account(account: &Principal) -> Result<(), LedgerError> {
        if account.is_empty() {
            return Err(LedgerError::InvalidAccount(account.clone()));
        }
        Ok(())
    }
}

impl Ledger for InMemoryLedger {
    fn credit(&self, account: &Principal, amount: Amount) -> Result<Amount, LedgerError> {
        Self::check_account(account)?;
        let mut balances = self.balances.write().map_err(|_| LedgerError::LockError)?;
        let balance = balances.entry(account.clone()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow {
                account: account.clone(),
            })?;
        debug!(account = %account, amount, balance = *balance, "Ledger credit");
        Ok(*balance)
    }

    fn debit(&self, account: &Principal, amount: Amount) -> Result<Amount, LedgerError> {
        Self::check_account(account)?;
        let mut balances = self.balances.write().map_err(|_| LedgerError::LockError)?;
        let available = balances.get(account).copied().unwrap_or(0);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: account.clone(),
                required: amount,
                available,
            });
        }
        let remaining = available - amount;
        balances.insert(account.clone(), remaining);
        debug!(account = %account, amount, balance = remaining, "Ledger debit");
        Ok(remaining)
    }

    fn balance_of(&self, account: &Principal) -> Amount {
        self.balances
            .read()
            .map(|b| b.get(account).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn transfer(&self, from: &Principal, to: &Principal, amount: Amount) -> Result<(), LedgerError> {
        Self::check_account(from)?;
        Self::check_account(to)?;
        let mut balances = self.balances.write().map_err(|_| LedgerError::LockError)?;

        let available = balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: from.clone(),
                required: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let target = balances.get(to).copied().unwrap_or(0);
        let credited = target.checked_add(amount).ok_or_else(|| LedgerError::Overflow {
            account: to.clone(),
        })?;

        balances.insert(from.clone(), available - amount);
        balances.insert(to.clone(), credited);
        debug!(from = %from, to = %to, amount, "Ledger transfer");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Principal {
        Principal::new(s)
    }

    #[test]
    fn debit_rejects_overdraft_without_effect() {
        let ledger = InMemoryLedger::with_balances([(p("alice"), 50)]);
        let err = ledger.debit(&p("alice"), 51).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance {
                required: 51,
                available: 50,
                ..
            }
        ));
        assert_eq!(ledger.balance_of(&p("alice")), 50);
    }

    #[test]
    fn transfer_moves_value() {
        let ledger = InMemoryLedger::with_balances([(p("treasury"), 100)]);
        ledger.transfer(&p("treasury"), &p("bob"), 40).unwrap();
        assert_eq!(ledger.balance_of(&p("treasury")), 60);
        assert_eq!(ledger.balance_of(&p("bob")), 40);
        assert_eq!(ledger.total_supply(), 100);
    }

    #[test]
    fn transfer_to_null_account_fails() {
        let ledger = InMemoryLedger::with_balances([(p("treasury"), 100)]);
        let err = ledger.transfer(&p("treasury"), &p(""), 1).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
        assert_eq!(ledger.balance_of(&p("treasury")), 100);
    }

    #[test]
    fn credit_overflow_is_reported() {
        let ledger = InMemoryLedger::with_balances([(p("whale"), Amount::MAX)]);
        assert!(matches!(
            ledger.credit(&p("whale"), 1),
            Err(LedgerError::Overflow { .. })
        ));
    }

    /// Ledger relying on the default `transfer`.
    struct SplitLedger(InMemoryLedger);

    impl Ledger for SplitLedger {
        fn credit(&self, account: &Principal, amount: Amount) -> Result<Amount, LedgerError> {
            self.0.credit(account, amount)
        }
        fn debit(&self, account: &Principal, amount: Amount) -> Result<Amount, LedgerError> {
            self.0.debit(account, amount)
        }
        fn balance_of(&self, account: &Principal) -> Amount {
            self.0.balance_of(account)
        }
    }

    #[test]
    fn default_transfer_restores_source_on_failed_credit() {
        let ledger = SplitLedger(InMemoryLedger::with_balances([
            (p("a"), 10),
            (p("b"), Amount::MAX),
        ]));
        assert!(ledger.transfer(&p("a"), &p("b"), 5).is_err());
        assert_eq!(ledger.balance_of(&p("a")), 10);
    }
}
