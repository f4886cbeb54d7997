//! Replays a CSV list of calls against [`InMemoryLedger`] and prints the
//! resulting accounts. This could live in its own crate, it stays here so the
//! integration tests can drive it.

use std::io::{Read, Write};

use crate::{
    account::Amount,
    command::LedgerCommand,
    ledger::{Ledger, LedgerError, in_memory_ledger::InMemoryLedger},
};
use anyhow::Result;
use csv_parser::{Call, CsvCallParser};
use csv_printer::{Account, AccountKind, print_accounts};
use thiserror::Error;
use tracing::info;
use units::{AmountError, Unit};

pub mod csv_parser;
pub mod csv_printer;
pub mod units;

#[derive(Debug, Error)]
pub enum CallRowError {
    #[error("Malformed row: {0}")]
    Malformed(#[from] csv::Error),
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub struct Service<'w, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
    pub unit: Unit,
    pub error_printer: Box<dyn FnMut(u64, CallRowError)>,
}

impl<'w, R, W> Service<'w, R, W>
where
    R: Read,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<()> {
        let parser = CsvCallParser::new(self.input);

        let mut ledger: InMemoryLedger = InMemoryLedger::default();

        for (line, row) in parser {
            if let Err(err) = execute_row(&mut ledger, self.unit, line, row) {
                (self.error_printer)(line, err);
            }
        }

        let unit = self.unit;
        let private = ledger.private_accounts().map(|acc| Account {
            kind: AccountKind::Private,
            id: None,
            owner: acc.owner().clone(),
            balance: unit.format(acc.balance()),
        });
        let public = ledger.public_accounts().map(|acc| Account {
            kind: AccountKind::Public,
            id: Some(acc.id()),
            owner: acc.owner().clone(),
            balance: unit.format(acc.balance()),
        });
        print_accounts(self.output, private.chain(public))
    }
}

fn execute_row(
    ledger: &mut impl Ledger,
    unit: Unit,
    line: u64,
    row: csv::Result<Call>,
) -> Result<(), CallRowError> {
    let call = row?;
    let amount: Option<Amount> = call.amount.map(|a| unit.to_base(a)).transpose()?;
    let command = LedgerCommand::parse_command(call.op, call.account, call.user, amount)
        .map_err(LedgerError::from)?;
    let outcome = ledger.execute(&call.caller, command)?;
    for event in &outcome.events {
        info!(line, %event, "event emitted");
    }
    if let Some(balance) = outcome.balance {
        info!(line, caller = %call.caller, balance = %unit.format(balance), "balance checked");
    }
    Ok(())
}
