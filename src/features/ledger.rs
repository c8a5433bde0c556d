use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::prelude::*;

use super::{
    account::{Account, AccountId, AccountPatch, NewAccount},
    config::LedgerConfig,
    error::{LedgerError, LedgerResult},
    store::AccountStore,
};

/// One mutex per account id. Holding it makes a read-modify-write against the
/// store atomic with respect to every other mutation of that account.
#[derive(Debug, Default)]
struct AccountLocks {
    slots: Mutex<HashMap<AccountId, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    /// Runs `f` while holding the lock of `id`. The slot is dropped from the
    /// table once no other caller holds or waits on it.
    fn with_lock<T>(&self, id: AccountId, f: impl FnOnce() -> T) -> T {
        let slot = Arc::clone(self.slots.lock().entry(id).or_default());
        let result = {
            let _guard = slot.lock();
            f()
        };
        self.release(id, slot);
        result
    }

    fn release(&self, id: AccountId, slot: Arc<Mutex<()>>) {
        let mut slots = self.slots.lock();
        // clones are only handed out under the table lock, so a count of two
        // (table + ours) means nobody else is holding or waiting
        let unused = slots.get(&id).map_or(false, |held| {
            Arc::ptr_eq(held, &slot) && Arc::strong_count(&slot) == 2
        });
        if unused {
            slots.remove(&id);
        }
    }
}

/// Business rules over the accounts held by an [`AccountStore`].
///
/// Every operation takes `&self`; share a ledger between threads with an `Arc`.
#[derive(Debug)]
pub struct Ledger<S> {
    store: S,
    config: LedgerConfig,
    locks: AccountLocks,
}

impl<S: AccountStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    pub fn with_config(store: S, config: LedgerConfig) -> Self {
        Self {
            store,
            config,
            locks: AccountLocks::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn create(&self, new_account: NewAccount) -> LedgerResult<Account> {
        let NewAccount {
            owner_name,
            account_type,
            initial_balance,
            currency,
        } = new_account;
        let initial_balance = initial_balance.unwrap_or(Decimal::ZERO);
        Account::validate(&owner_name, account_type, initial_balance)?;

        let currency = currency.unwrap_or_else(|| self.config.default_currency().to_string());
        Account::validate_currency(&currency)?;

        let account = Account::open(
            self.store.next_id()?,
            owner_name,
            account_type,
            initial_balance,
            currency,
            Utc::now(),
        );
        let account = self.store.save(account)?;
        info!(
            "Opened {} account {} with balance {}",
            account.account_type(),
            account.id(),
            account.balance()
        );
        Ok(account)
    }

    pub fn get(&self, id: AccountId) -> LedgerResult<Account> {
        self.store.get_by_id(id)?.ok_or(LedgerError::NotFound(id))
    }

    /// Changes owner name or currency. The balance is never touched here and
    /// the account type can only be restated, not changed.
    pub fn update(&self, id: AccountId, patch: AccountPatch) -> LedgerResult<Account> {
        if let Some(owner_name) = &patch.owner_name {
            Account::validate_owner_name(owner_name)?;
        }
        if let Some(currency) = &patch.currency {
            Account::validate_currency(currency)?;
        }

        self.mutate(id, |account| {
            if let Some(account_type) = patch.account_type {
                if account_type != account.account_type() {
                    return Err(LedgerError::validation(format!(
                        "account type of {} is {} and cannot be changed to {account_type}",
                        account.id(),
                        account.account_type()
                    )));
                }
            }

            let account = match patch.owner_name {
                Some(owner_name) => account.with_owner_name(owner_name),
                None => account,
            };
            let account = match patch.currency {
                Some(currency) => account.with_currency(currency),
                None => account,
            };
            Ok(account)
        })
    }

    /// Removes the account. Deleting an unknown id is an error, not a no-op.
    pub fn delete(&self, id: AccountId) -> LedgerResult<()> {
        self.locks.with_lock(id, || -> LedgerResult<()> {
            if !self.store.delete_by_id(id)? {
                return Err(LedgerError::NotFound(id));
            }
            info!("Closed account {id}");
            Ok(())
        })
    }

    pub fn credit(&self, id: AccountId, amount: Decimal) -> LedgerResult<Account> {
        ensure_positive(amount)?;

        self.mutate(id, |account| {
            let balance = account.balance().checked_add(amount).ok_or_else(|| {
                LedgerError::validation(format!("crediting {amount} overflows the balance"))
            })?;
            Ok(account.with_balance(balance))
        })
    }

    /// Fails with [`LedgerError::InsufficientFunds`] when the new balance would
    /// fall under the floor of the account type.
    pub fn debit(&self, id: AccountId, amount: Decimal) -> LedgerResult<Account> {
        ensure_positive(amount)?;

        self.mutate(id, |account| {
            let floor = self.config.balance_floor(account.account_type());
            let available = account.balance().saturating_sub(floor);
            let balance = account
                .balance()
                .checked_sub(amount)
                .filter(|balance| *balance >= floor)
                .ok_or(LedgerError::InsufficientFunds {
                    requested: amount,
                    available,
                })?;
            Ok(account.with_balance(balance))
        })
    }

    /// Read, decide, write back, all under the account's lock. Nothing is
    /// written when `change` fails.
    fn mutate<F>(&self, id: AccountId, change: F) -> LedgerResult<Account>
    where
        F: FnOnce(Account) -> LedgerResult<Account>,
    {
        self.locks.with_lock(id, || -> LedgerResult<Account> {
            let current = self.get(id)?;
            let account = self.store.save(change(current)?)?;
            debug!("Account {} balance is now {}", account.id(), account.balance());
            Ok(account)
        })
    }
}

/// Transaction amounts must be strictly positive.
fn ensure_positive(amount: Decimal) -> LedgerResult<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "transaction amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{account::AccountType, store::InMemoryStore};
    use rust_decimal_macros::dec;
    use test_case::test_case;

    fn ledger() -> Ledger<InMemoryStore> {
        Ledger::new(InMemoryStore::new())
    }

    fn open(
        ledger: &Ledger<InMemoryStore>,
        account_type: AccountType,
        balance: Decimal,
    ) -> Account {
        ledger
            .create(NewAccount::new("Amina", account_type).with_balance(balance))
            .unwrap()
    }

    #[test]
    fn create_defaults_balance_and_currency() {
        let ledger = ledger();
        let account = ledger
            .create(NewAccount::new("Amina", AccountType::Current))
            .unwrap();

        assert_eq!(account.balance(), dec!(0));
        assert_eq!(account.currency(), "MAD");
        assert_eq!(ledger.get(account.id()).unwrap(), account);
    }

    #[test]
    fn create_rejects_invalid_input_without_saving() {
        let ledger = ledger();
        let negative = NewAccount::new("Amina", AccountType::Savings).with_balance(dec!(-10));
        let nameless = NewAccount::new("", AccountType::Current);
        let bad_currency = NewAccount::new("Amina", AccountType::Current).with_currency("euros");

        for input in [negative, nameless, bad_currency] {
            let err = ledger.create(input).unwrap_err();
            assert!(matches!(err, LedgerError::Validation(_)));
        }
        assert!(ledger.store().is_empty());
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let ledger = ledger();
        let id = ledger.store().next_id().unwrap();
        assert!(matches!(ledger.get(id), Err(LedgerError::NotFound(missing)) if missing == id));
    }

    #[test]
    fn update_changes_owner_and_currency_only() {
        let ledger = ledger();
        let account = open(&ledger, AccountType::Savings, dec!(40));

        let updated = ledger
            .update(
                account.id(),
                AccountPatch {
                    owner_name: Some("Youssef".to_string()),
                    account_type: Some(AccountType::Savings),
                    currency: Some("EUR".to_string()),
                },
            )
            .unwrap();

        assert_eq!(updated.owner_name(), "Youssef");
        assert_eq!(updated.currency(), "EUR");
        assert_eq!(updated.balance(), dec!(40));
        assert_eq!(updated.created_at(), account.created_at());
    }

    #[test]
    fn update_refuses_type_change() {
        let ledger = ledger();
        let account = open(&ledger, AccountType::Current, dec!(5));
        let patch = AccountPatch {
            account_type: Some(AccountType::Savings),
            ..AccountPatch::default()
        };

        let err = ledger.update(account.id(), patch).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(ledger.get(account.id()).unwrap(), account);
    }

    #[test]
    fn update_refuses_blank_owner() {
        let ledger = ledger();
        let account = open(&ledger, AccountType::Current, dec!(5));
        let patch = AccountPatch {
            owner_name: Some(" ".to_string()),
            ..AccountPatch::default()
        };

        assert!(matches!(
            ledger.update(account.id(), patch),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let ledger = ledger();
        let id = ledger.store().next_id().unwrap();
        assert!(matches!(
            ledger.update(id, AccountPatch::default()),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn delete_twice_fails_the_second_time() {
        let ledger = ledger();
        let account = open(&ledger, AccountType::Current, dec!(0));

        ledger.delete(account.id()).unwrap();
        assert!(matches!(ledger.delete(account.id()), Err(LedgerError::NotFound(_))));
        assert!(matches!(ledger.get(account.id()), Err(LedgerError::NotFound(_))));
    }

    #[test]
    fn lock_slots_do_not_outlive_the_call() {
        let ledger = ledger();
        let account = open(&ledger, AccountType::Current, dec!(10));
        ledger.credit(account.id(), dec!(5)).unwrap();
        ledger.debit(account.id(), dec!(5)).unwrap();
        ledger.delete(account.id()).unwrap();

        for _ in 0..1000 {
            let missing = ledger.store().next_id().unwrap();
            assert!(ledger.credit(missing, dec!(1)).is_err());
            assert!(ledger.delete(missing).is_err());
        }
        assert!(ledger.debit(account.id(), dec!(1)).is_err());
        assert!(ledger.update(account.id(), AccountPatch::default()).is_err());

        assert_eq!(ledger.locks.slots.lock().len(), 0);
    }

    #[test]
    fn savings_debit_over_balance_is_rejected() {
        let ledger = ledger();
        let account = open(&ledger, AccountType::Savings, dec!(100));

        let err = ledger.debit(account.id(), dec!(150)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds { requested, available }
                if requested == dec!(150) && available == dec!(100)
        ));
        assert_eq!(ledger.get(account.id()).unwrap().balance(), dec!(100));
    }

    #[test]
    fn current_account_cannot_go_negative_by_default() {
        let ledger = ledger();
        let account = open(&ledger, AccountType::Current, dec!(0));

        assert_eq!(ledger.credit(account.id(), dec!(50)).unwrap().balance(), dec!(50));
        assert_eq!(ledger.debit(account.id(), dec!(50)).unwrap().balance(), dec!(0));
        assert!(matches!(
            ledger.debit(account.id(), dec!(1)),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert_eq!(ledger.get(account.id()).unwrap().balance(), dec!(0));
    }

    #[test]
    fn configured_overdraft_applies_to_current_accounts_only() {
        let config = LedgerConfig::new(dec!(100), "MAD").unwrap();
        let ledger = Ledger::with_config(InMemoryStore::new(), config);
        let current = open(&ledger, AccountType::Current, dec!(0));
        let savings = open(&ledger, AccountType::Savings, dec!(0));

        assert_eq!(ledger.debit(current.id(), dec!(100)).unwrap().balance(), dec!(-100));
        assert!(matches!(
            ledger.debit(current.id(), dec!(0.01)),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert!(matches!(
            ledger.debit(savings.id(), dec!(0.01)),
            Err(LedgerError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn debit_then_credit_restores_balance_exactly() {
        let ledger = ledger();
        let account = open(&ledger, AccountType::Savings, dec!(0.3));

        ledger.debit(account.id(), dec!(0.1)).unwrap();
        ledger.credit(account.id(), dec!(0.1)).unwrap();
        assert_eq!(ledger.get(account.id()).unwrap().balance(), dec!(0.3));
    }

    #[test_case(dec!(0) ; "zero")]
    #[test_case(dec!(-1) ; "negative")]
    #[test_case(dec!(-0.0001) ; "tiny negative")]
    fn non_positive_amounts_are_rejected(amount: Decimal) {
        let ledger = ledger();
        let account = open(&ledger, AccountType::Current, dec!(20));

        assert!(matches!(
            ledger.credit(account.id(), amount),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            ledger.debit(account.id(), amount),
            Err(LedgerError::Validation(_))
        ));
        assert_eq!(ledger.get(account.id()).unwrap().balance(), dec!(20));
    }

    #[test]
    fn amount_is_checked_before_lookup() {
        let ledger = ledger();
        let id = ledger.store().next_id().unwrap();
        assert!(matches!(
            ledger.credit(id, dec!(0)),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            ledger.debit(id, dec!(5)),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn credit_overflow_is_rejected() {
        let ledger = ledger();
        let account = open(&ledger, AccountType::Current, Decimal::MAX);

        assert!(matches!(
            ledger.credit(account.id(), dec!(1)),
            Err(LedgerError::Validation(_))
        ));
        assert_eq!(ledger.get(account.id()).unwrap().balance(), Decimal::MAX);
    }
}
