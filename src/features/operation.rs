use std::collections::HashMap;
use std::io;

use anyhow::Context;
use rust_decimal::prelude::*;
use serde::Deserialize;

use super::{
    account::{AccountId, AccountPatch, AccountType, NewAccount},
    error::{LedgerError, LedgerResult},
    ledger::Ledger,
    store::AccountStore,
};

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// Creates an account. Needs `owner` and `kind`, `amount` is the opening balance
    Open,

    /// Updates the owner name or currency of an account
    Rename,

    /// Deletes an account
    Close,

    /// Adds `amount` to the balance
    Credit,

    /// Takes `amount` from the balance. Fails when funds are insufficient
    Debit,
}

/// One row of an operations file.
///
/// Accounts are addressed by a reference chosen by whoever wrote the file;
/// the replay maps it to the id the store generated on `open`.
#[derive(Deserialize, Debug, Clone)]
pub struct Operation {
    #[serde(rename = "type")]
    operation_type: OperationType,

    #[serde(rename = "account")]
    reference: String,

    owner: Option<String>,

    kind: Option<String>,

    /// Kept as text so it is parsed straight into a decimal
    amount: Option<String>,

    currency: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub skipped: usize,
}

/// Applies operations to a ledger, one row at a time.
pub struct Replay<'a, S> {
    ledger: &'a Ledger<S>,
    references: HashMap<String, AccountId>,
}

impl<'a, S: AccountStore> Replay<'a, S> {
    pub fn new(ledger: &'a Ledger<S>) -> Self {
        Self {
            ledger,
            references: HashMap::new(),
        }
    }

    /// Replays every row. A row the ledger rejects is logged and skipped, a
    /// row that cannot be parsed aborts the replay.
    pub fn run<R: io::Read>(&mut self, reader: R) -> anyhow::Result<ReplaySummary> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b',')
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut summary = ReplaySummary::default();
        for (row, result) in rdr.deserialize().enumerate() {
            let operation: Operation =
                result.with_context(|| format!("Malformed operation on row {}", row + 1))?;
            match self.apply(operation) {
                Ok(()) => summary.applied += 1,
                Err(e) => {
                    warn!("Row {} skipped: {e}", row + 1);
                    summary.skipped += 1;
                }
            }
        }
        Ok(summary)
    }

    pub fn apply(&mut self, operation: Operation) -> LedgerResult<()> {
        use OperationType::*;

        match operation.operation_type {
            Open => {
                if self.references.contains_key(&operation.reference) {
                    return Err(LedgerError::validation(format!(
                        "account reference {:?} is already open",
                        operation.reference
                    )));
                }
                let owner = operation.owner.unwrap_or_default();
                let account_type: AccountType = operation
                    .kind
                    .as_deref()
                    .ok_or_else(|| LedgerError::validation("open needs an account kind"))?
                    .parse()?;
                let new_account = NewAccount {
                    owner_name: owner,
                    account_type,
                    initial_balance: parse_amount(operation.amount.as_deref())?,
                    currency: operation.currency,
                };
                let account = self.ledger.create(new_account)?;
                self.references.insert(operation.reference, account.id());
            }
            Rename => {
                let id = self.resolve(&operation.reference)?;
                let account_type = match operation.kind.as_deref() {
                    Some(kind) => Some(kind.parse()?),
                    None => None,
                };
                let patch = AccountPatch {
                    owner_name: operation.owner,
                    account_type,
                    currency: operation.currency,
                };
                self.ledger.update(id, patch)?;
            }
            Close => {
                let id = self.resolve(&operation.reference)?;
                self.ledger.delete(id)?;
                self.references.remove(&operation.reference);
            }
            Credit => {
                let id = self.resolve(&operation.reference)?;
                self.ledger.credit(id, required_amount(&operation)?)?;
            }
            Debit => {
                let id = self.resolve(&operation.reference)?;
                self.ledger.debit(id, required_amount(&operation)?)?;
            }
        };
        Ok(())
    }

    /// Id generated for a reference opened earlier in the replay.
    pub fn resolve(&self, reference: &str) -> LedgerResult<AccountId> {
        self.references.get(reference).copied().ok_or_else(|| {
            LedgerError::validation(format!("unknown account reference {reference:?}"))
        })
    }
}

fn parse_amount(raw: Option<&str>) -> LedgerResult<Option<Decimal>> {
    raw.map(|raw| {
        Decimal::from_str(raw)
            .map_err(|e| LedgerError::validation(format!("invalid amount {raw:?}: {e}")))
    })
    .transpose()
}

fn required_amount(operation: &Operation) -> LedgerResult<Decimal> {
    parse_amount(operation.amount.as_deref())?.ok_or_else(|| {
        LedgerError::validation(format!("{:?} needs an amount", operation.operation_type))
    })
}
