//! Transaction record data structures

use chrono::{DateTime, Utc};
use multisig_core::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumString};

/// Transaction identifier. Ids start at 1 and increase by one per proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(u64);

impl TxId {
    pub const FIRST: Self = Self(1);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }

    pub(crate) fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Position of this id in an append-only record list
    pub(crate) fn index(&self) -> Option<usize> {
        self.0.checked_sub(1).map(|i| i as usize)
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for TxId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Lifecycle state of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Awaiting approvals, or approved but the transfer has not gone through
    Pending,
    /// Transfer executed; the record is frozen
    Completed,
}

/// A proposed transfer and its running approval state
///
/// `approved_by` holds each approving signer once, in approval order, with
/// the proposer first. The approval count is always its length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub(crate) id: TxId,
    pub(crate) proposer: Address,
    pub(crate) amount: Amount,
    pub(crate) recipient: Address,
    pub(crate) asset: Address,
    pub(crate) approved_by: Vec<Address>,
    pub(crate) completed: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
}

impl TransactionRecord {
    /// New record, approved by its proposer
    pub(crate) fn new(
        id: TxId,
        proposer: Address,
        amount: Amount,
        recipient: Address,
        asset: Address,
    ) -> Self {
        Self {
            id,
            proposer,
            amount,
            recipient,
            asset,
            approved_by: vec![proposer],
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    pub fn proposer(&self) -> Address {
        self.proposer
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn recipient(&self) -> Address {
        self.recipient
    }

    pub fn asset(&self) -> Address {
        self.asset
    }

    pub fn approved_by(&self) -> &[Address] {
        &self.approved_by
    }

    pub fn approval_count(&self) -> u32 {
        self.approved_by.len() as u32
    }

    pub fn has_approved(&self, signer: &Address) -> bool {
        self.approved_by.contains(signer)
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn status(&self) -> TransactionStatus {
        if self.completed {
            TransactionStatus::Completed
        } else {
            TransactionStatus::Pending
        }
    }

    /// Whether the approvals collected so far satisfy `quorum`
    pub fn meets_quorum(&self, quorum: u32) -> bool {
        self.approval_count() >= quorum
    }

    /// Approvals still missing under `quorum`
    pub fn approvals_remaining(&self, quorum: u32) -> u32 {
        quorum.saturating_sub(self.approval_count())
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}
