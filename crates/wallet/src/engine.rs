//! Authorization engine - the public surface of a multisig wallet
//!
//! Flow for a transfer:
//! propose → signer check → address/amount checks → balance check → record
//! approve → signer check → completed check → balance re-check → vote → (quorum?) transfer → complete
//!
//! Each wallet serializes its operations behind one mutex. The lock is held
//! across the external balance and transfer calls, so no two operations on
//! the same wallet ever interleave.

use multisig_approval::{
    ApprovalError, LedgerStats, SignerRegistry, TransactionLedger, TransactionRecord, TxId,
};
use multisig_core::{Address, Amount};
use multisig_ledger::AssetLedger;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::outcome::ApprovalOutcome;
use crate::snapshot::WalletSnapshot;

struct EngineState {
    signers: SignerRegistry,
    transactions: TransactionLedger,
}

/// A wallet whose outgoing transfers need a quorum of signer approvals
pub struct AuthorizationEngine {
    /// The wallet's own account on the asset ledger
    account: Address,
    ledger: Arc<dyn AssetLedger>,
    state: Mutex<EngineState>,
}

impl AuthorizationEngine {
    /// Create a wallet holding funds at `account`
    pub fn new(
        account: Address,
        quorum: u32,
        signers: impl IntoIterator<Item = Address>,
        ledger: Arc<dyn AssetLedger>,
    ) -> Result<Self, WalletError> {
        if account.is_zero() {
            return Err(ApprovalError::InvalidConfiguration(
                "wallet account cannot be the zero address".to_string(),
            )
            .into());
        }

        let signers = SignerRegistry::new(quorum, signers)?;

        tracing::info!(
            wallet = %account,
            quorum,
            signers = signers.signer_count(),
            "Wallet created"
        );

        Ok(Self {
            account,
            ledger,
            state: Mutex::new(EngineState {
                signers,
                transactions: TransactionLedger::new(),
            }),
        })
    }

    pub fn from_config(
        account: Address,
        config: &WalletConfig,
        ledger: Arc<dyn AssetLedger>,
    ) -> Result<Self, WalletError> {
        Self::new(account, config.quorum, config.signers.iter().copied(), ledger)
    }

    /// Rebuild a wallet from a snapshot, re-validating every invariant
    pub fn restore(snapshot: WalletSnapshot, ledger: Arc<dyn AssetLedger>) -> Result<Self, WalletError> {
        let engine = Self::new(snapshot.account, snapshot.quorum, snapshot.signers, ledger)?;

        {
            let mut state = engine.lock();
            for record in &snapshot.transactions {
                if let Some(stranger) = record
                    .approved_by()
                    .iter()
                    .find(|a| !state.signers.is_valid_signer(a))
                {
                    return Err(ApprovalError::CorruptRecord {
                        tx_id: record.id(),
                        reason: format!("approver {} is not a signer", stranger),
                    }
                    .into());
                }
            }
            state.transactions = TransactionLedger::from_records(snapshot.transactions)?;
        }

        tracing::info!(
            wallet = %engine.account,
            transactions = engine.transaction_count(),
            "Wallet restored"
        );
        Ok(engine)
    }

    /// Capture the wallet's full state
    pub fn snapshot(&self) -> WalletSnapshot {
        let state = self.lock();
        WalletSnapshot {
            account: self.account,
            quorum: state.signers.quorum(),
            signers: state.signers.signers().to_vec(),
            transactions: state.transactions.records().to_vec(),
        }
    }

    /// Propose a transfer out of the wallet. The proposal counts as the
    /// caller's approval; with a quorum of 1 the transfer runs immediately.
    ///
    /// A failed transfer does not fail the proposal: the record stays
    /// pending and can be completed by a later approval or [`Self::execute`].
    pub fn propose(
        &self,
        caller: Address,
        amount: Amount,
        recipient: Address,
        asset: Address,
    ) -> Result<TxId, WalletError> {
        let mut guard = self.lock();
        let state = &mut *guard;

        self.authorize(&state.signers, &caller, "propose")?;

        if recipient.is_zero() || asset.is_zero() {
            return Err(WalletError::InvalidAddress);
        }
        if amount.is_zero() {
            return Err(WalletError::ZeroAmount);
        }
        self.ensure_funds(&asset, amount)?;

        let tx_id = state.transactions.create(caller, amount, recipient, asset);
        let quorum = state.signers.quorum();

        tracing::info!(
            wallet = %self.account,
            tx_id = tx_id.get(),
            proposer = %caller,
            recipient = %recipient,
            asset = %asset,
            amount = %amount,
            quorum,
            "Transfer proposed"
        );

        if quorum == 1 {
            let outcome = self.settle(&mut state.transactions, tx_id, 1)?;
            if outcome.is_deferred() {
                tracing::info!(
                    wallet = %self.account,
                    tx_id = tx_id.get(),
                    "Proposal left pending after failed transfer"
                );
            }
        }

        Ok(tx_id)
    }

    /// Approve a pending transaction; executes the transfer once quorum is met
    pub fn approve_tx(&self, caller: Address, tx_id: TxId) -> Result<ApprovalOutcome, WalletError> {
        let mut guard = self.lock();
        let state = &mut *guard;

        self.authorize(&state.signers, &caller, "approve")?;

        let (asset, amount) = {
            let record = state.transactions.get(tx_id)?;
            if record.is_completed() {
                tracing::warn!(
                    wallet = %self.account,
                    tx_id = tx_id.get(),
                    signer = %caller,
                    "Approval for completed transaction"
                );
                return Err(ApprovalError::AlreadyCompleted(tx_id).into());
            }
            (record.asset(), record.amount())
        };
        self.ensure_funds(&asset, amount)?;

        let quorum = state.signers.quorum();
        let result = state
            .transactions
            .approve(caller, tx_id, quorum)
            .inspect_err(|e| {
                tracing::warn!(
                    wallet = %self.account,
                    tx_id = tx_id.get(),
                    signer = %caller,
                    error = %e,
                    "Approval rejected"
                );
            })?;

        tracing::info!(
            wallet = %self.account,
            tx_id = tx_id.get(),
            signer = %caller,
            approvals = result.approval_count,
            quorum,
            "Transaction approved"
        );

        if !result.quorum_reached {
            return Ok(ApprovalOutcome::Pending {
                approval_count: result.approval_count,
                quorum,
            });
        }

        self.settle(&mut state.transactions, tx_id, result.approval_count)
    }

    /// Retry the transfer of a pending transaction that already has enough
    /// approvals under the current quorum. Records no vote.
    pub fn execute(&self, caller: Address, tx_id: TxId) -> Result<ApprovalOutcome, WalletError> {
        let mut guard = self.lock();
        let state = &mut *guard;

        self.authorize(&state.signers, &caller, "execute")?;

        let record = state.transactions.get(tx_id)?;
        if record.is_completed() {
            return Err(ApprovalError::AlreadyCompleted(tx_id).into());
        }

        let quorum = state.signers.quorum();
        let approvals = record.approval_count();
        if !record.meets_quorum(quorum) {
            return Err(WalletError::QuorumNotReached {
                tx_id,
                approvals,
                quorum,
            });
        }
        self.ensure_funds(&record.asset(), record.amount())?;

        self.settle(&mut state.transactions, tx_id, approvals)
    }

    /// Change the number of approvals required. Applies to pending
    /// transactions from their next evaluation on.
    pub fn update_quorum(&self, caller: Address, new_quorum: u32) -> Result<(), WalletError> {
        let mut state = self.lock();

        self.authorize(&state.signers, &caller, "update_quorum")?;
        let previous = state.signers.update_quorum(&caller, new_quorum)?;

        tracing::info!(
            wallet = %self.account,
            signer = %caller,
            previous,
            quorum = new_quorum,
            "Quorum updated"
        );
        Ok(())
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn quorum(&self) -> u32 {
        self.lock().signers.quorum()
    }

    pub fn signers(&self) -> Vec<Address> {
        self.lock().signers.signers().to_vec()
    }

    pub fn signer_count(&self) -> usize {
        self.lock().signers.signer_count()
    }

    pub fn is_valid_signer(&self, account: &Address) -> bool {
        self.lock().signers.is_valid_signer(account)
    }

    pub fn transaction(&self, tx_id: TxId) -> Option<TransactionRecord> {
        self.lock().transactions.get(tx_id).ok().cloned()
    }

    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.lock().transactions.records().to_vec()
    }

    pub fn pending_transactions(&self) -> Vec<TransactionRecord> {
        self.lock().transactions.pending().cloned().collect()
    }

    pub fn transaction_count(&self) -> usize {
        self.lock().transactions.len()
    }

    pub fn has_approved(&self, tx_id: TxId, signer: &Address) -> bool {
        self.lock()
            .transactions
            .get(tx_id)
            .map(|r| r.has_approved(signer))
            .unwrap_or(false)
    }

    pub fn stats(&self) -> LedgerStats {
        self.lock().transactions.stats()
    }

    /// Current balance of the wallet in `asset`
    pub fn balance(&self, asset: &Address) -> Amount {
        self.ledger.balance_of(asset, &self.account)
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        // Every mutation is validated before it is applied, so a panic
        // elsewhere cannot leave the state half-written.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn authorize(
        &self,
        signers: &SignerRegistry,
        caller: &Address,
        action: &'static str,
    ) -> Result<(), WalletError> {
        signers.ensure_signer(caller).map_err(|e| {
            tracing::warn!(wallet = %self.account, caller = %caller, action, "Unauthorized caller");
            WalletError::from(e)
        })
    }

    fn ensure_funds(&self, asset: &Address, required: Amount) -> Result<(), WalletError> {
        let available = self.ledger.balance_of(asset, &self.account);
        tracing::debug!(
            wallet = %self.account,
            asset = %asset,
            available = %available,
            required = %required,
            "Balance check"
        );

        if available < required {
            return Err(WalletError::InsufficientFunds {
                wallet: self.account,
                asset: *asset,
                available,
                required,
            });
        }
        Ok(())
    }

    /// Run the transfer for a transaction that met quorum. Only a
    /// successful transfer completes the record.
    fn settle(
        &self,
        transactions: &mut TransactionLedger,
        tx_id: TxId,
        approval_count: u32,
    ) -> Result<ApprovalOutcome, WalletError> {
        let (asset, recipient, amount) = {
            let record = transactions.get(tx_id)?;
            (record.asset(), record.recipient(), record.amount())
        };

        match self.ledger.transfer(&asset, &self.account, &recipient, amount) {
            Ok(()) => {
                transactions.mark_completed(tx_id)?;
                tracing::info!(
                    wallet = %self.account,
                    tx_id = tx_id.get(),
                    recipient = %recipient,
                    amount = %amount,
                    "Transfer executed"
                );
                Ok(ApprovalOutcome::Executed { approval_count })
            }
            Err(reason) => {
                tracing::warn!(
                    wallet = %self.account,
                    tx_id = tx_id.get(),
                    error = %reason,
                    "Transfer failed, execution deferred"
                );
                Ok(ApprovalOutcome::ExecutionDeferred {
                    approval_count,
                    reason,
                })
            }
        }
    }
}

impl std::fmt::Debug for AuthorizationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("AuthorizationEngine")
            .field("account", &self.account)
            .field("quorum", &state.signers.quorum())
            .field("signers", &state.signers.signer_count())
            .field("transactions", &state.transactions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multisig_ledger::{InMemoryLedger, TransferError};

    fn signer(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    fn wallet_account() -> Address {
        Address::repeat_byte(0x77)
    }

    fn recipient() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn token() -> Address {
        Address::repeat_byte(0xee)
    }

    fn setup(quorum: u32, signers: u8, funds: u64) -> (AuthorizationEngine, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger
            .mint(token(), wallet_account(), Amount::from(funds))
            .unwrap();
        let engine = AuthorizationEngine::new(
            wallet_account(),
            quorum,
            (1..=signers).map(signer),
            ledger.clone(),
        )
        .unwrap();
        (engine, ledger)
    }

    #[test]
    fn test_zero_account_rejected() {
        let ledger = Arc::new(InMemoryLedger::new());
        let result = AuthorizationEngine::new(Address::ZERO, 1, [signer(1), signer(2)], ledger);
        assert!(matches!(
            result,
            Err(WalletError::Approval(ApprovalError::InvalidConfiguration(_)))
        ));
    }

    #[test]
    fn test_propose_checks_in_order() {
        let (engine, _) = setup(2, 3, 100);

        // Non-signer is rejected before the arguments are looked at
        let err = engine
            .propose(signer(9), Amount::ZERO, Address::ZERO, token())
            .unwrap_err();
        assert!(err.is_unauthorized());

        let err = engine
            .propose(signer(1), Amount::ZERO, Address::ZERO, token())
            .unwrap_err();
        assert_eq!(err, WalletError::InvalidAddress);

        let err = engine
            .propose(signer(1), Amount::from(10), recipient(), Address::ZERO)
            .unwrap_err();
        assert_eq!(err, WalletError::InvalidAddress);

        let err = engine
            .propose(signer(1), Amount::ZERO, recipient(), token())
            .unwrap_err();
        assert_eq!(err, WalletError::ZeroAmount);

        let err = engine
            .propose(signer(1), Amount::from(101), recipient(), token())
            .unwrap_err();
        assert!(matches!(err, WalletError::InsufficientFunds { .. }));

        assert_eq!(engine.transaction_count(), 0);
    }

    #[test]
    fn test_approve_rechecks_balance() {
        let (engine, ledger) = setup(2, 3, 100);
        let tx_id = engine
            .propose(signer(1), Amount::from(80), recipient(), token())
            .unwrap();

        // Funds leave through another transaction in the meantime
        let other = engine
            .propose(signer(2), Amount::from(50), recipient(), token())
            .unwrap();
        engine.approve_tx(signer(3), other).unwrap();
        assert_eq!(ledger.balance_of(&token(), &wallet_account()), Amount::from(50));

        let err = engine.approve_tx(signer(2), tx_id).unwrap_err();
        assert!(matches!(
            err,
            WalletError::InsufficientFunds { available, required, .. }
                if available == Amount::from(50) && required == Amount::from(80)
        ));
        assert!(!engine.has_approved(tx_id, &signer(2)));
        assert_eq!(engine.transaction(tx_id).unwrap().approval_count(), 1);
    }

    #[test]
    fn test_deferred_execution_keeps_vote() {
        let (engine, ledger) = setup(2, 3, 100);
        ledger.block(recipient());

        let tx_id = engine
            .propose(signer(1), Amount::from(40), recipient(), token())
            .unwrap();
        let outcome = engine.approve_tx(signer(2), tx_id).unwrap();

        assert_eq!(
            outcome,
            ApprovalOutcome::ExecutionDeferred {
                approval_count: 2,
                reason: TransferError::Blocked(recipient()),
            }
        );
        let record = engine.transaction(tx_id).unwrap();
        assert!(!record.is_completed());
        assert_eq!(record.approval_count(), 2);

        ledger.unblock(&recipient());
        let outcome = engine.approve_tx(signer(3), tx_id).unwrap();
        assert_eq!(outcome, ApprovalOutcome::Executed { approval_count: 3 });
        assert_eq!(ledger.balance_of(&token(), &recipient()), Amount::from(40));
    }

    #[test]
    fn test_execute_retries_deferred_transfer() {
        let (engine, ledger) = setup(2, 2, 100);
        ledger.block(recipient());

        let tx_id = engine
            .propose(signer(1), Amount::from(10), recipient(), token())
            .unwrap();
        assert!(engine.approve_tx(signer(2), tx_id).unwrap().is_deferred());

        // Every signer has voted, so only a retry can finish it
        assert!(matches!(
            engine.approve_tx(signer(2), tx_id),
            Err(WalletError::Approval(ApprovalError::DuplicateApproval { .. }))
        ));

        ledger.unblock(&recipient());
        let outcome = engine.execute(signer(1), tx_id).unwrap();
        assert!(outcome.is_executed());
        assert!(engine.transaction(tx_id).unwrap().is_completed());

        assert_eq!(
            engine.execute(signer(1), tx_id),
            Err(WalletError::Approval(ApprovalError::AlreadyCompleted(tx_id)))
        );
    }

    #[test]
    fn test_execute_requires_quorum() {
        let (engine, _) = setup(3, 3, 100);
        let tx_id = engine
            .propose(signer(1), Amount::from(10), recipient(), token())
            .unwrap();

        assert_eq!(
            engine.execute(signer(2), tx_id),
            Err(WalletError::QuorumNotReached {
                tx_id,
                approvals: 1,
                quorum: 3
            })
        );
        assert!(engine.execute(signer(9), tx_id).unwrap_err().is_unauthorized());
        assert!(matches!(
            engine.execute(signer(1), TxId::new(5)),
            Err(WalletError::Approval(ApprovalError::UnknownTransaction(_)))
        ));
    }

    #[test]
    fn test_execute_after_quorum_decrease() {
        let (engine, ledger) = setup(3, 3, 100);
        let tx_id = engine
            .propose(signer(1), Amount::from(25), recipient(), token())
            .unwrap();
        engine.approve_tx(signer(2), tx_id).unwrap();

        engine.update_quorum(signer(3), 2).unwrap();
        assert!(engine.execute(signer(3), tx_id).unwrap().is_executed());
        assert_eq!(ledger.balance_of(&token(), &recipient()), Amount::from(25));
    }

    #[test]
    fn test_snapshot_restore() {
        let (engine, ledger) = setup(2, 3, 100);
        let first = engine
            .propose(signer(1), Amount::from(10), recipient(), token())
            .unwrap();
        engine.approve_tx(signer(2), first).unwrap();
        engine
            .propose(signer(3), Amount::from(20), recipient(), token())
            .unwrap();

        let snapshot = engine.snapshot();
        let restored = AuthorizationEngine::restore(snapshot.clone(), ledger).unwrap();

        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.quorum(), 2);
        assert!(restored.transaction(first).unwrap().is_completed());

        let next = restored
            .propose(signer(2), Amount::from(1), recipient(), token())
            .unwrap();
        assert_eq!(next, TxId::new(3));
    }

    #[test]
    fn test_restore_rejects_foreign_approver() {
        let (engine, ledger) = setup(2, 3, 100);
        engine
            .propose(signer(1), Amount::from(10), recipient(), token())
            .unwrap();

        let mut snapshot = engine.snapshot();
        snapshot.signers = vec![signer(2), signer(3)];

        let result = AuthorizationEngine::restore(snapshot, ledger);
        assert!(matches!(
            result,
            Err(WalletError::Approval(ApprovalError::CorruptRecord { .. }))
        ));
    }
}
