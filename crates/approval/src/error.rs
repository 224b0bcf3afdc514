//! Approval errors

use multisig_core::Address;
use thiserror::Error;

use crate::transaction::TxId;

/// Errors from the signer registry and the transaction ledger
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid quorum {quorum} for {signers} signers")]
    InvalidQuorum { quorum: u32, signers: usize },

    #[error("Not a valid signer: {0}")]
    Unauthorized(Address),

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(TxId),

    #[error("Transaction already completed: {0}")]
    AlreadyCompleted(TxId),

    #[error("Signer {signer} already approved transaction {tx_id}")]
    DuplicateApproval { signer: Address, tx_id: TxId },

    #[error("Corrupt transaction record {tx_id}: {reason}")]
    CorruptRecord { tx_id: TxId, reason: String },
}

impl ApprovalError {
    pub(crate) fn invalid_configuration(reason: impl Into<String>) -> Self {
        ApprovalError::InvalidConfiguration(reason.into())
    }

    pub(crate) fn corrupt(tx_id: TxId, reason: impl Into<String>) -> Self {
        ApprovalError::CorruptRecord {
            tx_id,
            reason: reason.into(),
        }
    }
}
