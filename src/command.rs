use serde::Deserialize;
use thiserror::Error;

use crate::account::{Amount, Identity, PublicAccountId};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    CreateAccount,
    Deposit,
    Withdraw,
    CheckBalance,
    CreatePublicAccount,
    GrantAccess,
    RevokeAccess,
    SetDepositLimit,
    SetWithdrawLimit,
    DepositToPublic,
    WithdrawFromPublic,
    CheckPublicBalance,
}

/// Owner-only changes to a public account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessCommand {
    Grant { grantee: Identity },
    Revoke { grantee: Identity },
    SetDepositLimit { user: Identity, limit: Amount },
    SetWithdrawLimit { user: Identity, limit: Amount },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCommand {
    CreateAccount,
    Deposit {
        amount: Amount,
    },
    Withdraw {
        amount: Amount,
    },
    CheckBalance,
    CreatePublicAccount,
    ModifyAccess {
        id: PublicAccountId,
        command: AccessCommand,
    },
    DepositToPublic {
        id: PublicAccountId,
        amount: Amount,
    },
    WithdrawFromPublic {
        id: PublicAccountId,
        amount: Amount,
    },
    CheckPublicBalance {
        id: PublicAccountId,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallError {
    #[error("Amount is required for {kind:?}")]
    AmountRequired { kind: OperationKind },
    #[error("Amount must be greater than zero for {kind:?}")]
    ZeroAmount { kind: OperationKind },
    #[error("Public account id is required for {kind:?}")]
    AccountIdRequired { kind: OperationKind },
    #[error("Target user is required for {kind:?}")]
    UserRequired { kind: OperationKind },
}

/// Value moving calls must carry a non-zero amount.
pub fn ensure_positive(kind: OperationKind, amount: Amount) -> Result<Amount, CallError> {
    if amount == 0 {
        Err(CallError::ZeroAmount { kind })
    } else {
        Ok(amount)
    }
}

impl LedgerCommand {
    /// Builds a typed command from the loosely typed fields of a call.
    /// Fields an operation does not use are ignored.
    pub fn parse_command(
        kind: OperationKind,
        id: Option<PublicAccountId>,
        user: Option<Identity>,
        amount: Option<Amount>,
    ) -> Result<Self, CallError> {
        let account_id = || id.ok_or(CallError::AccountIdRequired { kind });
        let positive = |amount: Option<Amount>| {
            amount
                .ok_or(CallError::AmountRequired { kind })
                .and_then(|amount| ensure_positive(kind, amount))
        };
        // limits may legitimately be zero
        let any_amount = |amount: Option<Amount>| amount.ok_or(CallError::AmountRequired { kind });

        match kind {
            OperationKind::CreateAccount => Ok(Self::CreateAccount),
            OperationKind::Deposit => Ok(Self::Deposit {
                amount: positive(amount)?,
            }),
            OperationKind::Withdraw => Ok(Self::Withdraw {
                amount: positive(amount)?,
            }),
            OperationKind::CheckBalance => Ok(Self::CheckBalance),
            OperationKind::CreatePublicAccount => Ok(Self::CreatePublicAccount),
            OperationKind::GrantAccess | OperationKind::RevokeAccess => {
                let id = account_id()?;
                let grantee = user.ok_or(CallError::UserRequired { kind })?;
                let command = if kind == OperationKind::GrantAccess {
                    AccessCommand::Grant { grantee }
                } else {
                    AccessCommand::Revoke { grantee }
                };
                Ok(Self::ModifyAccess { id, command })
            }
            OperationKind::SetDepositLimit | OperationKind::SetWithdrawLimit => {
                let id = account_id()?;
                let user = user.ok_or(CallError::UserRequired { kind })?;
                let limit = any_amount(amount)?;
                let command = if kind == OperationKind::SetDepositLimit {
                    AccessCommand::SetDepositLimit { user, limit }
                } else {
                    AccessCommand::SetWithdrawLimit { user, limit }
                };
                Ok(Self::ModifyAccess { id, command })
            }
            OperationKind::DepositToPublic => Ok(Self::DepositToPublic {
                id: account_id()?,
                amount: positive(amount)?,
            }),
            OperationKind::WithdrawFromPublic => Ok(Self::WithdrawFromPublic {
                id: account_id()?,
                amount: positive(amount)?,
            }),
            OperationKind::CheckPublicBalance => Ok(Self::CheckPublicBalance { id: account_id()? }),
        }
    }
}
