//! Transaction ledger - append-only records and the approval state machine
//!
//! ```text
//! create ──► Pending ──approve…──► quorum reached ──transfer ok──► Completed
//!               ▲                        │
//!               └──── transfer failed ───┘
//! ```
//!
//! The ledger only reports that quorum has been reached. Executing the
//! transfer and calling [`TransactionLedger::mark_completed`] is the caller's
//! job, so a failed transfer never marks a record done or loses a vote.

use chrono::Utc;
use multisig_core::{Address, Amount};
use std::collections::HashSet;

use crate::error::ApprovalError;
use crate::transaction::{TransactionRecord, TxId};

/// Result of recording one approval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalResult {
    pub tx_id: TxId,
    pub approval_count: u32,
    pub quorum: u32,
    pub quorum_reached: bool,
}

/// Counts of records per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub pending: usize,
    pub completed: usize,
}

/// Append-only store of transaction records
#[derive(Debug, Clone, Default)]
pub struct TransactionLedger {
    /// Record with id `n` lives at index `n - 1`
    records: Vec<TransactionRecord>,
}

impl TransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from previously stored records.
    ///
    /// Records must carry ids 1..=n in order and satisfy every record
    /// invariant; anything else is reported as `CorruptRecord`.
    pub fn from_records(records: Vec<TransactionRecord>) -> Result<Self, ApprovalError> {
        for (index, record) in records.iter().enumerate() {
            let expected = TxId::new(index as u64 + 1);
            if record.id != expected {
                return Err(ApprovalError::corrupt(
                    record.id,
                    format!("expected id {}", expected),
                ));
            }
            check_record(record)?;
        }

        Ok(Self { records })
    }

    /// Id the next proposal will receive
    pub fn next_id(&self) -> TxId {
        self.records
            .last()
            .map(|record| record.id().next())
            .unwrap_or(TxId::FIRST)
    }

    /// Append a new pending record approved by its proposer
    pub fn create(
        &mut self,
        proposer: Address,
        amount: Amount,
        recipient: Address,
        asset: Address,
    ) -> TxId {
        let id = self.next_id();
        self.records
            .push(TransactionRecord::new(id, proposer, amount, recipient, asset));
        id
    }

    pub fn get(&self, tx_id: TxId) -> Result<&TransactionRecord, ApprovalError> {
        tx_id
            .index()
            .and_then(|i| self.records.get(i))
            .ok_or(ApprovalError::UnknownTransaction(tx_id))
    }

    fn get_mut(&mut self, tx_id: TxId) -> Result<&mut TransactionRecord, ApprovalError> {
        tx_id
            .index()
            .and_then(|i| self.records.get_mut(i))
            .ok_or(ApprovalError::UnknownTransaction(tx_id))
    }

    /// Record `signer`'s approval and report whether `quorum` is now met.
    ///
    /// Fails without touching the record when the id is unknown, the record
    /// is completed, or the signer already approved it.
    pub fn approve(
        &mut self,
        signer: Address,
        tx_id: TxId,
        quorum: u32,
    ) -> Result<ApprovalResult, ApprovalError> {
        let record = self.get_mut(tx_id)?;

        if record.completed {
            return Err(ApprovalError::AlreadyCompleted(tx_id));
        }
        if record.has_approved(&signer) {
            return Err(ApprovalError::DuplicateApproval { signer, tx_id });
        }

        record.approved_by.push(signer);

        Ok(ApprovalResult {
            tx_id,
            approval_count: record.approval_count(),
            quorum,
            quorum_reached: record.meets_quorum(quorum),
        })
    }

    /// Freeze a record once its transfer has gone through
    pub fn mark_completed(&mut self, tx_id: TxId) -> Result<(), ApprovalError> {
        let record = self.get_mut(tx_id)?;

        if record.completed {
            return Err(ApprovalError::AlreadyCompleted(tx_id));
        }

        record.completed = true;
        record.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn pending(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.records.iter().filter(|r| !r.completed)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> LedgerStats {
        let completed = self.records.iter().filter(|r| r.completed).count();
        LedgerStats {
            pending: self.records.len() - completed,
            completed,
        }
    }
}

fn check_record(record: &TransactionRecord) -> Result<(), ApprovalError> {
    let id = record.id;

    if record.approved_by.first() != Some(&record.proposer) {
        return Err(ApprovalError::corrupt(id, "proposer must be the first approver"));
    }

    let mut seen = HashSet::with_capacity(record.approved_by.len());
    if !record.approved_by.iter().all(|signer| seen.insert(*signer)) {
        return Err(ApprovalError::corrupt(id, "duplicate approver"));
    }

    if record.amount.is_zero() {
        return Err(ApprovalError::corrupt(id, "zero amount"));
    }
    if record.recipient.is_zero() || record.asset.is_zero() {
        return Err(ApprovalError::corrupt(id, "zero recipient or asset"));
    }
    if record.completed != record.completed_at.is_some() {
        return Err(ApprovalError::corrupt(id, "completion timestamp mismatch"));
    }

    Ok(())
}
