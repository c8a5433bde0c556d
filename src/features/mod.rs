mod account;
mod config;
mod error;
mod ledger;
mod operation;
mod query;
mod store;

pub use self::{
    account::{Account, AccountId, AccountPatch, AccountType, NewAccount},
    config::{LedgerConfig, DEFAULT_CURRENCY},
    error::{LedgerError, LedgerResult, StoreError, StoreResult},
    ledger::Ledger,
    operation::{Operation, OperationType, Replay, ReplaySummary},
    query::{AccountMinimal, AccountSummary, AccountView, Projection, SearchFilter},
    store::{AccountStore, InMemoryStore},
};
