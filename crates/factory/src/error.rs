//! Factory errors

use multisig_core::Address;
use multisig_wallet::WalletError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    /// The new wallet's configuration was rejected
    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("Clone limit reached: {limit} wallets already created")]
    CloneLimitReached { limit: usize },

    #[error("Clone {position} should live at {expected}, snapshot has {found}")]
    RegistryMismatch {
        position: usize,
        expected: Address,
        found: Address,
    },
}
