use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

#[macro_use]
extern crate log;

use account_ledger::{
    AccountType, AccountView, InMemoryStore, Ledger, LedgerConfig, Projection, Replay,
    SearchFilter, DEFAULT_CURRENCY,
};
use anyhow::Context;
use clap::Parser;
use rust_decimal::Decimal;

/// Replays account operations from a CSV file and prints the resulting accounts
#[derive(Parser, Debug)]
#[clap(name = "account-ledger", version)]
struct Args {
    /// Operations CSV with columns type, account, owner, kind, amount, currency.
    /// Reads stdin when absent
    #[clap(short, long, env = "LEDGER_INPUT", value_parser)]
    input: Option<PathBuf>,

    /// How far below zero CURRENT accounts may go
    #[clap(long, env = "LEDGER_OVERDRAFT_LIMIT", default_value = "0", value_parser)]
    overdraft_limit: Decimal,

    /// Currency of accounts opened without one
    #[clap(long, env = "LEDGER_DEFAULT_CURRENCY", default_value = DEFAULT_CURRENCY, value_parser)]
    default_currency: String,

    /// full, summary or minimal
    #[clap(short, long, default_value = "full", value_parser)]
    projection: Projection,

    #[clap(short, long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Only print accounts of this type
    #[clap(long = "type", value_parser)]
    account_type: Option<AccountType>,

    #[clap(long, value_parser)]
    min_balance: Option<Decimal>,

    #[clap(long, value_parser)]
    max_balance: Option<Decimal>,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Csv,
    Json,
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        error!("{e:#}");
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = LedgerConfig::new(args.overdraft_limit, args.default_currency.as_str())?;
    debug!(
        "CURRENT overdraft limit {}, default currency {}",
        config.current_overdraft_limit(),
        config.default_currency()
    );
    let ledger = Ledger::with_config(InMemoryStore::new(), config);

    let mut replay = Replay::new(&ledger);
    let summary = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Unable to open {}", path.display()))?;
            replay.run(file)?
        }
        None => replay.run(io::stdin().lock())?,
    };
    info!(
        "Applied {} operations, skipped {}",
        summary.applied, summary.skipped
    );

    let filter = SearchFilter {
        account_type: args.account_type,
        min_balance: args.min_balance,
        max_balance: args.max_balance,
    };
    let views = ledger.search_projected(filter, args.projection)?;
    write_views(&views, args.format, io::stdout().lock())
}

fn write_views<W: Write>(
    views: &[AccountView],
    format: OutputFormat,
    mut out: W,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(out);
            for view in views {
                wtr.serialize(view)?;
            }
            wtr.flush()?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, views)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
