use std::collections::BTreeMap;

use parking_lot::RwLock;
use uuid::Uuid;

use super::{
    account::{Account, AccountId},
    error::StoreResult,
};

/// Durable keyed storage the ledger persists accounts through.
///
/// Each call is atomic per record. Read-modify-write sequences spanning
/// several calls are serialized by the ledger, not by the store.
pub trait AccountStore: Send + Sync {
    /// Hands out a fresh id. Ids are never reused, even after a delete.
    fn next_id(&self) -> StoreResult<AccountId>;

    fn get_by_id(&self, id: AccountId) -> StoreResult<Option<Account>>;

    /// Insert or fully replace the record keyed by `account.id()`.
    fn save(&self, account: Account) -> StoreResult<Account>;

    /// Returns `true` if a record existed and was removed.
    fn delete_by_id(&self, id: AccountId) -> StoreResult<bool>;

    /// Every stored account the predicate accepts, in no particular order.
    fn scan(&self, predicate: &dyn Fn(&Account) -> bool) -> StoreResult<Vec<Account>>;
}

/// Keeps accounts in memory, keyed and ordered by id
#[derive(Debug, Default)]
pub struct InMemoryStore {
    accounts: RwLock<BTreeMap<AccountId, Account>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

impl AccountStore for InMemoryStore {
    fn next_id(&self) -> StoreResult<AccountId> {
        Ok(AccountId::new(Uuid::now_v7()))
    }

    fn get_by_id(&self, id: AccountId) -> StoreResult<Option<Account>> {
        Ok(self.accounts.read().get(&id).cloned())
    }

    fn save(&self, account: Account) -> StoreResult<Account> {
        self.accounts.write().insert(account.id(), account.clone());
        Ok(account)
    }

    fn delete_by_id(&self, id: AccountId) -> StoreResult<bool> {
        Ok(self.accounts.write().remove(&id).is_some())
    }

    fn scan(&self, predicate: &dyn Fn(&Account) -> bool) -> StoreResult<Vec<Account>> {
        Ok(self
            .accounts
            .read()
            .values()
            .filter(|account| predicate(account))
            .cloned()
            .collect())
    }
}
