use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use super::error::{LedgerError, LedgerResult};

/// Store generated account identifier. UUIDv7, so ordering by id is ordering by creation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for AccountId {
    type Err = LedgerError;

    fn from_str(s: &str) -> LedgerResult<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| LedgerError::validation(format!("malformed account id {s:?}: {e}")))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    /// A day-to-day account. Only goes below zero when an overdraft limit is configured
    #[serde(alias = "COURANT")]
    Current,

    /// A savings account. Its balance can never be negative
    #[serde(alias = "EPARGNE")]
    Savings,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Current => f.write_str("CURRENT"),
            AccountType::Savings => f.write_str("SAVINGS"),
        }
    }
}

impl FromStr for AccountType {
    type Err = LedgerError;

    fn from_str(s: &str) -> LedgerResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CURRENT" | "COURANT" => Ok(AccountType::Current),
            "SAVINGS" | "EPARGNE" => Ok(AccountType::Savings),
            other => Err(LedgerError::validation(format!(
                "unknown account type {other:?}, expected CURRENT or SAVINGS"
            ))),
        }
    }
}

/// Bank account
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Account {
    id: AccountId,

    owner_name: String,

    account_type: AccountType,

    /// Exact decimal balance. Only credit and debit move it after creation
    #[serde(
        serialize_with = "round_serialize",
        deserialize_with = "rust_decimal::serde::str::deserialize"
    )]
    balance: Decimal,

    /// Three letter currency code, e.g. MAD or EUR
    currency: String,

    created_at: DateTime<Utc>,
}

pub(crate) fn round_serialize<S>(amount: &Decimal, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    // Serialize to 4 decimal
    let rounded_amount = amount.round_dp(4).to_string();
    s.serialize_str(rounded_amount.as_str())
}

/// Input of [`Ledger::create`](super::ledger::Ledger::create).
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub owner_name: String,
    pub account_type: AccountType,
    pub initial_balance: Option<Decimal>,
    pub currency: Option<String>,
}

impl NewAccount {
    pub fn new(owner_name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            owner_name: owner_name.into(),
            account_type,
            initial_balance: None,
            currency: None,
        }
    }

    pub fn with_balance(self, initial_balance: Decimal) -> Self {
        Self {
            initial_balance: Some(initial_balance),
            ..self
        }
    }

    pub fn with_currency(self, currency: impl Into<String>) -> Self {
        Self {
            currency: Some(currency.into()),
            ..self
        }
    }
}

/// Partial update of the non-balance fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountPatch {
    pub owner_name: Option<String>,
    pub account_type: Option<AccountType>,
    pub currency: Option<String>,
}

impl Account {
    /// Static checks shared by creation and update.
    pub fn validate(
        owner_name: &str,
        account_type: AccountType,
        initial_balance: Decimal,
    ) -> LedgerResult<()> {
        Self::validate_owner_name(owner_name)?;
        if initial_balance < Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "initial balance of a {account_type} account cannot be negative, got {initial_balance}"
            )));
        }
        Ok(())
    }

    /// Whitespace-only names count as empty.
    pub fn validate_owner_name(owner_name: &str) -> LedgerResult<()> {
        if owner_name.trim().is_empty() {
            return Err(LedgerError::validation("owner name must not be empty"));
        }
        Ok(())
    }

    pub fn validate_currency(currency: &str) -> LedgerResult<()> {
        if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase()) {
            Ok(())
        } else {
            Err(LedgerError::validation(format!(
                "currency must be a three letter uppercase code, got {currency:?}"
            )))
        }
    }

    pub(crate) fn open(
        id: AccountId,
        owner_name: String,
        account_type: AccountType,
        balance: Decimal,
        currency: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_name,
            account_type,
            balance,
            currency,
            created_at,
        }
    }

    pub(crate) fn with_balance(self, balance: Decimal) -> Self {
        Self { balance, ..self }
    }

    pub(crate) fn with_owner_name(self, owner_name: String) -> Self {
        Self { owner_name, ..self }
    }

    pub(crate) fn with_currency(self, currency: String) -> Self {
        Self { currency, ..self }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
