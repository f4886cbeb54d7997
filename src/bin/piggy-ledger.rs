use std::{fs::File, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use piggy_ledger::{
    bin_utils::{CallRowError, Service, units::Unit},
    ledger::LedgerError,
};
use tracing_subscriber::EnvFilter;

/// Replay a CSV list of ledger calls and print the resulting accounts.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// CSV file with `caller,op,account,user,amount` rows
    input: PathBuf,

    /// Denomination of amounts in the input and output
    #[arg(long, value_enum, default_value_t = Unit::Ether)]
    unit: Unit,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .with_context(|| format!("Invalid log filter `{}`", args.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let file = File::open(&args.input)
        .with_context(|| format!("Failed to open `{}`", args.input.display()))?;

    let service = Service {
        input: file,
        output: &mut std::io::stdout(),
        unit: args.unit,
        error_printer: Box::new(|line, err| {
            match err {
                CallRowError::Ledger(LedgerError::AccountErr(err)) => {
                    // rejected by the ledger rules, not a problem with the input
                    tracing::info!(line, %err, "call rejected")
                }
                err => eprintln!("Error at line {line}: {err}"),
            }
        }),
    };
    service.run()
}
