use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command::AccessCommand;

/// Smallest currency unit (wei).
pub type Amount = u128;

pub type PublicAccountId = u64;

/// Opaque caller identifier, as supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Identity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceEventKind {
    Deposited,
    Withdrawn,
}

#[derive(Debug, Clone, Copy)]
pub struct BalanceEvent {
    amount: Amount,
    kind: BalanceEventKind,
}

impl BalanceEvent {
    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn kind(&self) -> BalanceEventKind {
        self.kind
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessEvent {
    Granted(Identity),
    Revoked(Identity),
    DepositLimitSet { user: Identity, limit: Amount },
    WithdrawLimitSet { user: Identity, limit: Amount },
}

/// Messages of `AccountNotFound`, `InsufficientBalance` and `NoAccess` are
/// matched on by external callers and must stay as they are.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("Account not found")]
    AccountNotFound,
    #[error("Account already exists")]
    AccountExists,
    #[error("Insufficient balance")]
    InsufficientBalance,
    #[error("No access")]
    NoAccess,
    #[error("Not owner")]
    NotOwner,
    #[error("Deposit limit exceeded: {amount} is above the limit of {limit}")]
    DepositLimitExceeded { amount: Amount, limit: Amount },
    #[error("Withdraw limit exceeded: {amount} is above the limit of {limit}")]
    WithdrawLimitExceeded { amount: Amount, limit: Amount },
    #[error("Balance overflow")]
    BalanceOverflow,
}

fn credit(balance: Amount, amount: Amount) -> Result<BalanceEvent, AccountError> {
    balance
        .checked_add(amount)
        .ok_or(AccountError::BalanceOverflow)?;
    Ok(BalanceEvent {
        amount,
        kind: BalanceEventKind::Deposited,
    })
}

fn debit(balance: Amount, amount: Amount) -> Result<BalanceEvent, AccountError> {
    if balance >= amount {
        Ok(BalanceEvent {
            amount,
            kind: BalanceEventKind::Withdrawn,
        })
    } else {
        Err(AccountError::InsufficientBalance)
    }
}

// events are produced by `credit`/`debit`, which already checked the bounds
fn apply_balance(balance: &mut Amount, event: &BalanceEvent) {
    match event.kind {
        BalanceEventKind::Deposited => *balance += event.amount,
        BalanceEventKind::Withdrawn => *balance -= event.amount,
    }
}

/// Single-owner account. Only its owner ever reaches it, since the ledger
/// looks it up by the caller's identity.
#[derive(Debug)]
pub struct PrivateAccount {
    owner: Identity,
    balance: Amount,
}

impl PrivateAccount {
    pub fn new(owner: Identity) -> Self {
        Self { owner, balance: 0 }
    }

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn apply(&mut self, event: &BalanceEvent) {
        apply_balance(&mut self.balance, event);
    }

    pub fn handle_deposit(&self, amount: Amount) -> Result<BalanceEvent, AccountError> {
        credit(self.balance, amount)
    }

    pub fn handle_withdraw(&self, amount: Amount) -> Result<BalanceEvent, AccountError> {
        debit(self.balance, amount)
    }
}

/// Shared account with an owner, a list of granted users and per-user limits.
///
/// The owner always has access and is never subject to limits. A limit stored
/// for a user has no effect while that user is not on the access list, and it
/// survives revocation, so a re-grant picks it up again.
#[derive(Debug)]
pub struct PublicAccount {
    id: PublicAccountId,
    owner: Identity,
    balance: Amount,
    access_list: HashSet<Identity>,
    deposit_limits: HashMap<Identity, Amount>,
    withdraw_limits: HashMap<Identity, Amount>,
}

impl PublicAccount {
    pub fn new(id: PublicAccountId, owner: Identity) -> Self {
        Self {
            id,
            owner,
            balance: 0,
            access_list: HashSet::new(),
            deposit_limits: HashMap::new(),
            withdraw_limits: HashMap::new(),
        }
    }

    pub fn id(&self) -> PublicAccountId {
        self.id
    }

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn is_owner(&self, user: &Identity) -> bool {
        &self.owner == user
    }

    pub fn has_access(&self, user: &Identity) -> bool {
        self.is_owner(user) || self.access_list.contains(user)
    }

    pub fn deposit_limit(&self, user: &Identity) -> Option<Amount> {
        self.deposit_limits.get(user).copied()
    }

    pub fn withdraw_limit(&self, user: &Identity) -> Option<Amount> {
        self.withdraw_limits.get(user).copied()
    }

    pub fn check_balance(&self, caller: &Identity) -> Result<Amount, AccountError> {
        self.ensure_access(caller)?;
        Ok(self.balance)
    }

    pub fn apply(&mut self, event: &BalanceEvent) {
        apply_balance(&mut self.balance, event);
    }

    pub fn apply_access(&mut self, event: &AccessEvent) {
        match event {
            AccessEvent::Granted(user) => {
                self.access_list.insert(user.clone());
            }
            AccessEvent::Revoked(user) => {
                self.access_list.remove(user);
            }
            AccessEvent::DepositLimitSet { user, limit } => {
                self.deposit_limits.insert(user.clone(), *limit);
            }
            AccessEvent::WithdrawLimitSet { user, limit } => {
                self.withdraw_limits.insert(user.clone(), *limit);
            }
        }
    }

    pub fn handle_deposit(
        &self,
        caller: &Identity,
        amount: Amount,
    ) -> Result<BalanceEvent, AccountError> {
        self.ensure_access(caller)?;
        if let Some(limit) = self.applicable_limit(&self.deposit_limits, caller) {
            if amount > limit {
                return Err(AccountError::DepositLimitExceeded { amount, limit });
            }
        }
        credit(self.balance, amount)
    }

    pub fn handle_withdraw(
        &self,
        caller: &Identity,
        amount: Amount,
    ) -> Result<BalanceEvent, AccountError> {
        self.ensure_access(caller)?;
        let event = debit(self.balance, amount)?;
        if let Some(limit) = self.applicable_limit(&self.withdraw_limits, caller) {
            if amount > limit {
                return Err(AccountError::WithdrawLimitExceeded { amount, limit });
            }
        }
        Ok(event)
    }

    pub fn handle_access_command(
        &self,
        caller: &Identity,
        command: AccessCommand,
    ) -> Result<AccessEvent, AccountError> {
        if !self.is_owner(caller) {
            return Err(AccountError::NotOwner);
        }
        Ok(match command {
            AccessCommand::Grant { grantee } => AccessEvent::Granted(grantee),
            AccessCommand::Revoke { grantee } => AccessEvent::Revoked(grantee),
            AccessCommand::SetDepositLimit { user, limit } => {
                AccessEvent::DepositLimitSet { user, limit }
            }
            AccessCommand::SetWithdrawLimit { user, limit } => {
                AccessEvent::WithdrawLimitSet { user, limit }
            }
        })
    }

    fn ensure_access(&self, caller: &Identity) -> Result<(), AccountError> {
        if self.has_access(caller) {
            Ok(())
        } else {
            Err(AccountError::NoAccess)
        }
    }

    fn applicable_limit(
        &self,
        limits: &HashMap<Identity, Amount>,
        caller: &Identity,
    ) -> Option<Amount> {
        if self.is_owner(caller) {
            None
        } else {
            limits.get(caller).copied()
        }
    }
}
