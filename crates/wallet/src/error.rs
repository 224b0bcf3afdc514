//! Wallet errors

use multisig_approval::{ApprovalError, TxId};
use multisig_core::{Address, Amount};
use thiserror::Error;

/// Errors returned by [`crate::AuthorizationEngine`] operations.
///
/// Every error is raised before the operation changes any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// Signer, quorum or record-level rejection
    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error("Address zero found")]
    InvalidAddress,

    #[error("Can't send zero amount")]
    ZeroAmount,

    #[error("Insufficient funds in {wallet}: available {available}, required {required}")]
    InsufficientFunds {
        wallet: Address,
        asset: Address,
        available: Amount,
        required: Amount,
    },

    #[error("Transaction {tx_id} has {approvals} of {quorum} required approvals")]
    QuorumNotReached {
        tx_id: TxId,
        approvals: u32,
        quorum: u32,
    },
}

impl WalletError {
    /// The wrapped approval error, if any
    pub fn approval(&self) -> Option<&ApprovalError> {
        match self {
            WalletError::Approval(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, WalletError::Approval(ApprovalError::Unauthorized(_)))
    }
}
