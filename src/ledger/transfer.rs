use thiserror::Error;

use crate::account::{Amount, Identity};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Transfer of {amount} to {to} failed: {reason}")]
pub struct TransferError {
    pub to: Identity,
    pub amount: Amount,
    pub reason: String,
}

/// Host mechanism paying withdrawn value out to the caller.
///
/// An error aborts the withdrawal that requested the payout.
pub trait ValueTransfer {
    fn transfer(&mut self, to: &Identity, amount: Amount) -> Result<(), TransferError>;
}

/// Keeps every payout in memory, in the order it happened.
#[derive(Debug, Default)]
pub struct RecordingTransfer {
    payouts: Vec<(Identity, Amount)>,
}

impl RecordingTransfer {
    pub fn payouts(&self) -> &[(Identity, Amount)] {
        &self.payouts
    }

    pub fn total_paid_to(&self, user: &Identity) -> Amount {
        self.payouts
            .iter()
            .filter(|(to, _)| to == user)
            .map(|(_, amount)| amount)
            .sum()
    }
}

impl ValueTransfer for RecordingTransfer {
    fn transfer(&mut self, to: &Identity, amount: Amount) -> Result<(), TransferError> {
        self.payouts.push((to.clone(), amount));
        Ok(())
    }
}
