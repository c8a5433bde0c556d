use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

use super::{
    account::{Account, AccountType},
    error::{LedgerError, LedgerResult},
};

pub const DEFAULT_CURRENCY: &str = "MAD";

/// Business settings of a [`Ledger`](super::ledger::Ledger).
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// How far below zero a CURRENT account may go. Zero unless an operator sets one
    current_overdraft_limit: Decimal,

    /// Used when an account is created without a currency
    default_currency: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            current_overdraft_limit: dec!(0),
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl LedgerConfig {
    pub fn new(
        current_overdraft_limit: Decimal,
        default_currency: impl Into<String>,
    ) -> LedgerResult<Self> {
        if current_overdraft_limit < Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "overdraft limit cannot be negative, got {current_overdraft_limit}"
            )));
        }
        let default_currency = default_currency.into();
        Account::validate_currency(&default_currency)?;

        Ok(Self {
            current_overdraft_limit,
            default_currency,
        })
    }

    pub fn current_overdraft_limit(&self) -> Decimal {
        self.current_overdraft_limit
    }

    pub fn default_currency(&self) -> &str {
        &self.default_currency
    }

    /// Lowest balance an account of this type may hold.
    pub fn balance_floor(&self, account_type: AccountType) -> Decimal {
        match account_type {
            AccountType::Savings => Decimal::ZERO,
            AccountType::Current => Decimal::ZERO - self.current_overdraft_limit,
        }
    }
}
