use std::collections::{BTreeMap, HashMap, hash_map::Entry};

use tracing::{debug, info, warn};

use crate::{
    account::{AccountError, Amount, Identity, PrivateAccount, PublicAccount, PublicAccountId},
    command::{AccessCommand, LedgerCommand, OperationKind, ensure_positive},
};

use super::{CallOutcome, Ledger, LedgerError, LedgerEvent, RecordingTransfer, ValueTransfer};

/// Ledger keeping all accounts in memory.
///
/// Every operation validates first and mutates last, so an error leaves the
/// state exactly as it was before the call. Events of successful calls queue
/// up until the host takes them with [`InMemoryLedger::take_events`].
#[derive(Debug, Default)]
pub struct InMemoryLedger<T = RecordingTransfer> {
    private_accounts: HashMap<Identity, PrivateAccount>,
    public_accounts: BTreeMap<PublicAccountId, PublicAccount>,
    next_public_id: PublicAccountId,
    events: Vec<LedgerEvent>,
    host: T,
}

impl<T> InMemoryLedger<T>
where
    T: ValueTransfer,
{
    pub fn with_transfer(host: T) -> Self {
        Self {
            private_accounts: HashMap::new(),
            public_accounts: BTreeMap::new(),
            next_public_id: 0,
            events: Vec::new(),
            host,
        }
    }

    pub fn host(&self) -> &T {
        &self.host
    }

    pub fn private_accounts(&self) -> impl Iterator<Item = &PrivateAccount> {
        self.private_accounts.values()
    }

    /// Public accounts in id order.
    pub fn public_accounts(&self) -> impl Iterator<Item = &PublicAccount> {
        self.public_accounts.values()
    }

    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn create_account(&mut self, caller: &Identity) -> Result<(), LedgerError> {
        let Entry::Vacant(entry) = self.private_accounts.entry(caller.clone()) else {
            return Err(AccountError::AccountExists.into());
        };
        entry.insert(PrivateAccount::new(caller.clone()));
        info!(owner = %caller, "private account created");
        self.events.push(LedgerEvent::PrivateAccountCreated {
            owner: caller.clone(),
        });
        Ok(())
    }

    pub fn deposit(&mut self, caller: &Identity, amount: Amount) -> Result<(), LedgerError> {
        let amount = ensure_positive(OperationKind::Deposit, amount)?;
        let acc = self
            .private_accounts
            .get_mut(caller)
            .ok_or(AccountError::AccountNotFound)?;
        let evt = acc.handle_deposit(amount)?;
        acc.apply(&evt);
        Ok(())
    }

    pub fn withdraw(&mut self, caller: &Identity, amount: Amount) -> Result<(), LedgerError> {
        let amount = ensure_positive(OperationKind::Withdraw, amount)?;
        let acc = self
            .private_accounts
            .get_mut(caller)
            .ok_or(AccountError::AccountNotFound)?;
        let evt = acc.handle_withdraw(amount)?;
        if let Err(err) = self.host.transfer(caller, amount) {
            warn!(to = %caller, amount, %err, "payout failed, withdrawal aborted");
            return Err(err.into());
        }
        acc.apply(&evt);
        Ok(())
    }

    pub fn check_balance(&self, caller: &Identity) -> Result<Amount, LedgerError> {
        self.private_accounts
            .get(caller)
            .map(PrivateAccount::balance)
            .ok_or_else(|| AccountError::AccountNotFound.into())
    }

    /// The assigned id is announced only through the
    /// [`LedgerEvent::PublicAccountCreated`] event.
    pub fn create_public_account(&mut self, caller: &Identity) -> Result<(), LedgerError> {
        let id = self.next_public_id;
        self.public_accounts
            .insert(id, PublicAccount::new(id, caller.clone()));
        self.next_public_id += 1;
        info!(id, owner = %caller, "public account created");
        self.events.push(LedgerEvent::PublicAccountCreated {
            id,
            owner: caller.clone(),
        });
        Ok(())
    }

    pub fn grant_access(
        &mut self,
        caller: &Identity,
        id: PublicAccountId,
        grantee: Identity,
    ) -> Result<(), LedgerError> {
        self.modify_access(caller, id, AccessCommand::Grant { grantee })
    }

    pub fn revoke_access(
        &mut self,
        caller: &Identity,
        id: PublicAccountId,
        grantee: Identity,
    ) -> Result<(), LedgerError> {
        self.modify_access(caller, id, AccessCommand::Revoke { grantee })
    }

    pub fn set_deposit_limit(
        &mut self,
        caller: &Identity,
        id: PublicAccountId,
        user: Identity,
        limit: Amount,
    ) -> Result<(), LedgerError> {
        self.modify_access(caller, id, AccessCommand::SetDepositLimit { user, limit })
    }

    pub fn set_withdraw_limit(
        &mut self,
        caller: &Identity,
        id: PublicAccountId,
        user: Identity,
        limit: Amount,
    ) -> Result<(), LedgerError> {
        self.modify_access(caller, id, AccessCommand::SetWithdrawLimit { user, limit })
    }

    pub fn deposit_to_public(
        &mut self,
        caller: &Identity,
        id: PublicAccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let amount = ensure_positive(OperationKind::DepositToPublic, amount)?;
        // nobody has access to an account that does not exist
        let acc = self
            .public_accounts
            .get_mut(&id)
            .ok_or(AccountError::NoAccess)?;
        let evt = acc.handle_deposit(caller, amount)?;
        acc.apply(&evt);
        Ok(())
    }

    pub fn withdraw_from_public(
        &mut self,
        caller: &Identity,
        id: PublicAccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let amount = ensure_positive(OperationKind::WithdrawFromPublic, amount)?;
        let acc = self
            .public_accounts
            .get_mut(&id)
            .ok_or(AccountError::NoAccess)?;
        let evt = acc.handle_withdraw(caller, amount)?;
        if let Err(err) = self.host.transfer(caller, amount) {
            warn!(id, to = %caller, amount, %err, "payout failed, withdrawal aborted");
            return Err(err.into());
        }
        acc.apply(&evt);
        Ok(())
    }

    pub fn check_public_balance(
        &self,
        caller: &Identity,
        id: PublicAccountId,
    ) -> Result<Amount, LedgerError> {
        let acc = self
            .public_accounts
            .get(&id)
            .ok_or(AccountError::NoAccess)?;
        Ok(acc.check_balance(caller)?)
    }

    fn modify_access(
        &mut self,
        caller: &Identity,
        id: PublicAccountId,
        command: AccessCommand,
    ) -> Result<(), LedgerError> {
        // no owner can be found for an unknown id
        let acc = self
            .public_accounts
            .get_mut(&id)
            .ok_or(AccountError::NotOwner)?;
        let evt = acc.handle_access_command(caller, command)?;
        debug!(id, ?evt, "public account access changed");
        acc.apply_access(&evt);
        Ok(())
    }
}

impl<T> Ledger for InMemoryLedger<T>
where
    T: ValueTransfer,
{
    fn execute(
        &mut self,
        caller: &Identity,
        command: LedgerCommand,
    ) -> Result<CallOutcome, LedgerError> {
        debug!(%caller, ?command, "executing call");
        let first_event = self.events.len();
        let balance = match command {
            LedgerCommand::CreateAccount => self.create_account(caller).map(|_| None),
            LedgerCommand::Deposit { amount } => self.deposit(caller, amount).map(|_| None),
            LedgerCommand::Withdraw { amount } => self.withdraw(caller, amount).map(|_| None),
            LedgerCommand::CheckBalance => self.check_balance(caller).map(Some),
            LedgerCommand::CreatePublicAccount => {
                self.create_public_account(caller).map(|_| None)
            }
            LedgerCommand::ModifyAccess { id, command } => {
                self.modify_access(caller, id, command).map(|_| None)
            }
            LedgerCommand::DepositToPublic { id, amount } => {
                self.deposit_to_public(caller, id, amount).map(|_| None)
            }
            LedgerCommand::WithdrawFromPublic { id, amount } => {
                self.withdraw_from_public(caller, id, amount).map(|_| None)
            }
            LedgerCommand::CheckPublicBalance { id } => {
                self.check_public_balance(caller, id).map(Some)
            }
        }?;
        Ok(CallOutcome {
            events: self.events.drain(first_event..).collect(),
            balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{command::CallError, ledger::TransferError};

    use super::*;

    /// Host whose payouts always bounce.
    struct RejectingTransfer;

    impl ValueTransfer for RejectingTransfer {
        fn transfer(&mut self, to: &Identity, amount: Amount) -> Result<(), TransferError> {
            Err(TransferError {
                to: to.clone(),
                amount,
                reason: "recipient rejected value".to_string(),
            })
        }
    }

    fn created_public_id(ledger: &mut InMemoryLedger<impl ValueTransfer>) -> PublicAccountId {
        ledger
            .take_events()
            .into_iter()
            .find_map(|evt| match evt {
                LedgerEvent::PublicAccountCreated { id, .. } => Some(id),
                _ => None,
            })
            .unwrap()
    }

    fn account_err(err: LedgerError) -> AccountError {
        match err {
            LedgerError::AccountErr(err) => err,
            other => panic!("expected account error, got {other:?}"),
        }
    }

    #[test]
    fn private_account_lifecycle() {
        let mut ledger = InMemoryLedger::<RecordingTransfer>::default();
        let alice = Identity::from("alice");

        let err = ledger.deposit(&alice, 10).unwrap_err();
        assert_eq!(account_err(err), AccountError::AccountNotFound);

        ledger.create_account(&alice).unwrap();
        assert_eq!(
            ledger.take_events(),
            vec![LedgerEvent::PrivateAccountCreated {
                owner: alice.clone()
            }]
        );
        assert_eq!(ledger.check_balance(&alice).unwrap(), 0);

        ledger.deposit(&alice, 10).unwrap();
        ledger.withdraw(&alice, 4).unwrap();
        assert_eq!(ledger.check_balance(&alice).unwrap(), 6);
        assert_eq!(ledger.host().payouts(), &[(alice.clone(), 4)]);

        let err = ledger.withdraw(&alice, 7).unwrap_err();
        assert_eq!(account_err(err).to_string(), "Insufficient balance");
        assert_eq!(ledger.check_balance(&alice).unwrap(), 6);
    }

    #[test]
    fn duplicate_private_account_is_rejected() {
        let mut ledger = InMemoryLedger::<RecordingTransfer>::default();
        let alice = Identity::from("alice");
        ledger.create_account(&alice).unwrap();
        ledger.deposit(&alice, 5).unwrap();
        ledger.take_events();

        let err = ledger.create_account(&alice).unwrap_err();
        assert_eq!(account_err(err), AccountError::AccountExists);
        assert!(ledger.take_events().is_empty());
        assert_eq!(ledger.check_balance(&alice).unwrap(), 5);
    }

    #[test]
    fn zero_amounts_are_rejected() {
        let mut ledger = InMemoryLedger::<RecordingTransfer>::default();
        let alice = Identity::from("alice");
        ledger.create_account(&alice).unwrap();
        let err = ledger.deposit(&alice, 0).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::CallErr(CallError::ZeroAmount {
                kind: OperationKind::Deposit
            })
        ));
    }

    #[test]
    fn failed_payout_keeps_balance() {
        let mut ledger = InMemoryLedger::with_transfer(RejectingTransfer);
        let alice = Identity::from("alice");
        ledger.create_account(&alice).unwrap();
        ledger.deposit(&alice, 10).unwrap();

        let err = ledger.withdraw(&alice, 10).unwrap_err();
        assert!(matches!(err, LedgerError::TransferErr(_)));
        assert_eq!(ledger.check_balance(&alice).unwrap(), 10);

        ledger.create_public_account(&alice).unwrap();
        let id = created_public_id(&mut ledger);
        ledger.deposit_to_public(&alice, id, 3).unwrap();
        let err = ledger.withdraw_from_public(&alice, id, 3).unwrap_err();
        assert!(matches!(err, LedgerError::TransferErr(_)));
        assert_eq!(ledger.check_public_balance(&alice, id).unwrap(), 3);
    }

    #[test]
    fn public_ids_are_sequential() {
        let mut ledger = InMemoryLedger::<RecordingTransfer>::default();
        let owner = Identity::from("owner");
        for expected in 0..3 {
            ledger.create_public_account(&owner).unwrap();
            assert_eq!(created_public_id(&mut ledger), expected);
        }
        let ids: Vec<_> = ledger.public_accounts().map(PublicAccount::id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn public_account_access_flow() {
        let mut ledger = InMemoryLedger::<RecordingTransfer>::default();
        let owner = Identity::from("owner");
        let user = Identity::from("user");
        ledger.create_public_account(&owner).unwrap();
        let id = created_public_id(&mut ledger);

        let err = ledger.check_public_balance(&user, id).unwrap_err();
        assert_eq!(account_err(err).to_string(), "No access");
        let err = ledger.grant_access(&user, id, user.clone()).unwrap_err();
        assert_eq!(account_err(err), AccountError::NotOwner);

        ledger.grant_access(&owner, id, user.clone()).unwrap();
        // granting twice changes nothing
        ledger.grant_access(&owner, id, user.clone()).unwrap();
        ledger.deposit_to_public(&user, id, 1).unwrap();
        assert_eq!(ledger.check_public_balance(&user, id).unwrap(), 1);
        ledger.deposit_to_public(&user, id, 3).unwrap();
        assert_eq!(ledger.check_public_balance(&owner, id).unwrap(), 4);

        ledger.withdraw_from_public(&user, id, 2).unwrap();
        assert_eq!(ledger.host().total_paid_to(&user), 2);

        ledger.revoke_access(&owner, id, user.clone()).unwrap();
        let err = ledger.deposit_to_public(&user, id, 1).unwrap_err();
        assert_eq!(account_err(err), AccountError::NoAccess);
        assert_eq!(ledger.check_public_balance(&owner, id).unwrap(), 2);
    }

    #[test]
    fn unknown_public_account() {
        let mut ledger = InMemoryLedger::<RecordingTransfer>::default();
        let owner = Identity::from("owner");

        let err = ledger.deposit_to_public(&owner, 7, 1).unwrap_err();
        assert_eq!(account_err(err), AccountError::NoAccess);
        let err = ledger.check_public_balance(&owner, 7).unwrap_err();
        assert_eq!(account_err(err), AccountError::NoAccess);
        let err = ledger
            .set_withdraw_limit(&owner, 7, "user".into(), 1)
            .unwrap_err();
        assert_eq!(account_err(err), AccountError::NotOwner);
    }

    #[test]
    fn public_limits() {
        let mut ledger = InMemoryLedger::<RecordingTransfer>::default();
        let owner = Identity::from("owner");
        let user = Identity::from("user");
        ledger.create_public_account(&owner).unwrap();
        let id = created_public_id(&mut ledger);
        ledger.grant_access(&owner, id, user.clone()).unwrap();
        ledger.deposit_to_public(&user, id, 10).unwrap();

        ledger.set_withdraw_limit(&owner, id, user.clone(), 5).unwrap();
        let err = ledger.withdraw_from_public(&user, id, 6).unwrap_err();
        assert!(matches!(
            account_err(err),
            AccountError::WithdrawLimitExceeded { amount: 6, limit: 5 }
        ));
        assert!(ledger.host().payouts().is_empty());
        ledger.withdraw_from_public(&user, id, 5).unwrap();

        ledger.set_deposit_limit(&owner, id, user.clone(), 5).unwrap();
        let err = ledger.deposit_to_public(&user, id, 10).unwrap_err();
        assert!(matches!(
            account_err(err),
            AccountError::DepositLimitExceeded { amount: 10, limit: 5 }
        ));
        ledger.deposit_to_public(&user, id, 5).unwrap();
        assert_eq!(ledger.check_public_balance(&user, id).unwrap(), 10);

        // owner is never limited
        ledger.set_deposit_limit(&owner, id, owner.clone(), 1).unwrap();
        ledger.deposit_to_public(&owner, id, 100).unwrap();
        assert_eq!(ledger.check_public_balance(&owner, id).unwrap(), 110);
    }

    #[test]
    fn execute_returns_outcome() {
        let mut ledger = InMemoryLedger::<RecordingTransfer>::default();
        let alice = Identity::from("alice");

        let outcome = ledger
            .execute(&alice, LedgerCommand::CreatePublicAccount)
            .unwrap();
        assert_eq!(
            outcome,
            CallOutcome {
                events: vec![LedgerEvent::PublicAccountCreated {
                    id: 0,
                    owner: alice.clone()
                }],
                balance: None,
            }
        );

        ledger
            .execute(&alice, LedgerCommand::DepositToPublic { id: 0, amount: 8 })
            .unwrap();
        let outcome = ledger
            .execute(&alice, LedgerCommand::CheckPublicBalance { id: 0 })
            .unwrap();
        assert!(outcome.events.is_empty());
        assert_eq!(outcome.balance, Some(8));

        let err = ledger
            .execute(&alice, LedgerCommand::CheckBalance)
            .unwrap_err();
        assert_eq!(account_err(err), AccountError::AccountNotFound);
    }
}
