use std::io::Read;

use crate::{
    account::{Identity, PublicAccountId},
    command::OperationKind,
};
use csv::{DeserializeRecordsIntoIter, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;

/// One ledger call, columns `caller,op,account,user,amount`.
#[derive(Debug, Deserialize)]
pub struct Call {
    pub caller: Identity,
    pub op: OperationKind,
    pub account: Option<PublicAccountId>,
    pub user: Option<Identity>,
    pub amount: Option<Decimal>,
}

/// Parses a list of calls in CSV format, yielding each row with its line.
pub struct CsvCallParser<R> {
    iter: DeserializeRecordsIntoIter<R, Call>,
}

impl<R> CsvCallParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R> Iterator for CsvCallParser<R>
where
    R: Read,
{
    type Item = (u64, csv::Result<Call>);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|row| (curr_line, row))
    }
}
