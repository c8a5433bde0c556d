//! Bank account ledger: CURRENT and SAVINGS accounts, credit and debit under
//! balance invariants, filtered listing with several output shapes.
//!
//! [`Ledger`] holds the business rules and persists through any
//! [`AccountStore`]. [`InMemoryStore`] is the bundled backend.

#[macro_use]
extern crate log;

pub mod features;

pub use features::*;
