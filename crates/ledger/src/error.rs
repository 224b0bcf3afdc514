//! Transfer error types

use multisig_core::{Address, Amount};
use thiserror::Error;

/// Reasons an asset transfer can fail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// Sender does not hold enough of the asset
    #[error("Insufficient balance in {account}: available {available}, required {required}")]
    InsufficientBalance {
        account: Address,
        available: Amount,
        required: Amount,
    },

    /// Account is barred from sending or receiving
    #[error("Account is blocked: {0}")]
    Blocked(Address),

    /// Zero address used as asset, sender or receiver
    #[error("Transfer touches the zero address")]
    InvalidAddress,

    /// Receiver balance would overflow
    #[error("Balance overflow for {0}")]
    Overflow(Address),
}
