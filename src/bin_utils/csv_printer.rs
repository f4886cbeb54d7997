use std::io::Write;

use crate::account::{Identity, PublicAccountId};
use csv::Writer;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Private,
    Public,
}

#[derive(Debug, Serialize)]
pub struct Account {
    pub kind: AccountKind,
    pub id: Option<PublicAccountId>,
    pub owner: Identity,
    pub balance: String,
}

pub fn print_accounts<W>(
    output: &mut W,
    accounts: impl Iterator<Item = Account>,
) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for acc in accounts {
        if let Err(err) = writer.serialize(acc) {
            anyhow::bail!("Failed to write to CSV: {err}")
        }
    }
    // Ensure all data is flushed to the output
    if let Err(err) = writer.flush() {
        anyhow::bail!("Failed to flush CSV writer: {err}")
    }
    Ok(())
}
