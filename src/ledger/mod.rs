use std::fmt;

use thiserror::Error;

use crate::{
    account::{AccountError, Amount, Identity, PublicAccountId},
    command::{CallError, LedgerCommand},
};

pub mod in_memory_ledger;
pub mod transfer;

pub use transfer::{RecordingTransfer, TransferError, ValueTransfer};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    CallErr(#[from] CallError),
    #[error(transparent)]
    AccountErr(#[from] AccountError),
    #[error(transparent)]
    TransferErr(#[from] TransferError),
}

/// Notifications for off-chain observers, one per successful creation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    PrivateAccountCreated {
        owner: Identity,
    },
    PublicAccountCreated {
        id: PublicAccountId,
        owner: Identity,
    },
}

impl fmt::Display for LedgerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerEvent::PrivateAccountCreated { owner } => {
                write!(f, "PrivateAccountCreated({owner})")
            }
            LedgerEvent::PublicAccountCreated { id, owner } => {
                write!(f, "PublicAccountCreated({id}, {owner})")
            }
        }
    }
}

/// Everything a committed call produced.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CallOutcome {
    pub events: Vec<LedgerEvent>,
    /// Set by balance queries.
    pub balance: Option<Amount>,
}

/// A call either commits all of its effects or, on error, none of them.
pub trait Ledger {
    fn execute(
        &mut self,
        caller: &Identity,
        command: LedgerCommand,
    ) -> Result<CallOutcome, LedgerError>;
}
