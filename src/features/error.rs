use rust_decimal::Decimal;
use thiserror::Error;

use super::account::AccountId;

/// Failures raised by an [`AccountStore`](super::store::AccountStore) backend.
///
/// The ledger never interprets these, it hands them back to the caller as
/// [`LedgerError::Store`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable - {0}")]
    Unavailable(String),

    #[error("Store corrupted - {0}")]
    Corrupted(String),

    #[error("Store backend failure")]
    Backend(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid input - {0}")]
    Validation(String),

    #[error("Account ({0}) not found")]
    NotFound(AccountId),

    #[error("You cannot debit {requested}. Only {available} is available in this account")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type LedgerResult<T> = Result<T, LedgerError>;
