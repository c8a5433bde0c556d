use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::*;
use serde::Serialize;

use super::{
    account::{round_serialize, Account, AccountId, AccountType},
    error::{LedgerError, LedgerResult},
    ledger::Ledger,
    store::AccountStore,
};

/// Output shape of a listed account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    /// Every field
    #[default]
    Full,
    /// id, owner name and balance
    Summary,
    /// id and balance
    Minimal,
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Projection::Full => f.write_str("full"),
            Projection::Summary => f.write_str("summary"),
            Projection::Minimal => f.write_str("minimal"),
        }
    }
}

impl FromStr for Projection {
    type Err = LedgerError;

    fn from_str(s: &str) -> LedgerResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Projection::Full),
            "summary" => Ok(Projection::Summary),
            "minimal" => Ok(Projection::Minimal),
            other => Err(LedgerError::validation(format!(
                "unknown projection {other:?}, expected full, summary or minimal"
            ))),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AccountSummary {
    pub id: AccountId,
    pub owner_name: String,
    #[serde(serialize_with = "round_serialize")]
    pub balance: Decimal,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AccountMinimal {
    pub id: AccountId,
    #[serde(serialize_with = "round_serialize")]
    pub balance: Decimal,
}

/// An account rendered under a [`Projection`].
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum AccountView {
    Full(Account),
    Summary(AccountSummary),
    Minimal(AccountMinimal),
}

impl AccountView {
    pub fn project(account: Account, projection: Projection) -> Self {
        match projection {
            Projection::Full => AccountView::Full(account),
            Projection::Summary => AccountView::Summary(AccountSummary {
                id: account.id(),
                owner_name: account.owner_name().to_string(),
                balance: account.balance(),
            }),
            Projection::Minimal => AccountView::Minimal(AccountMinimal {
                id: account.id(),
                balance: account.balance(),
            }),
        }
    }

    pub fn id(&self) -> AccountId {
        match self {
            AccountView::Full(account) => account.id(),
            AccountView::Summary(summary) => summary.id,
            AccountView::Minimal(minimal) => minimal.id,
        }
    }
}

/// Search criteria. A `None` field does not constrain results. Bounds are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchFilter {
    pub account_type: Option<AccountType>,
    pub min_balance: Option<Decimal>,
    pub max_balance: Option<Decimal>,
}

impl SearchFilter {
    pub fn validate(&self) -> LedgerResult<()> {
        if let (Some(min), Some(max)) = (self.min_balance, self.max_balance) {
            if min > max {
                return Err(LedgerError::validation(format!(
                    "min balance {min} is greater than max balance {max}"
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, account: &Account) -> bool {
        self.account_type
            .map_or(true, |account_type| account.account_type() == account_type)
            && self.min_balance.map_or(true, |min| account.balance() >= min)
            && self.max_balance.map_or(true, |max| account.balance() <= max)
    }
}

/// Read paths. Results always come back in ascending id order.
impl<S: AccountStore> Ledger<S> {
    pub fn list(&self, projection: Projection) -> LedgerResult<Vec<AccountView>> {
        self.search_projected(SearchFilter::default(), projection)
    }

    pub fn search(&self, filter: SearchFilter) -> LedgerResult<Vec<Account>> {
        filter.validate()?;

        let mut accounts = self.store().scan(&|account: &Account| filter.matches(account))?;
        accounts.sort_by_key(Account::id);
        Ok(accounts)
    }

    pub fn search_projected(
        &self,
        filter: SearchFilter,
        projection: Projection,
    ) -> LedgerResult<Vec<AccountView>> {
        Ok(self
            .search(filter)?
            .into_iter()
            .map(|account| AccountView::project(account, projection))
            .collect())
    }
}
