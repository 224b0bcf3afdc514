//! Store errors

use multisig_approval::TxId;
use multisig_core::{Address, AddressError};
use multisig_factory::{FactoryError, WalletHandle};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid stored address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("Wallet not found: {0}")]
    NotFound(Address),

    /// The snapshot has fewer records than the store already holds
    #[error("Stale snapshot for {account}: store has {stored} transactions, snapshot has {snapshot}")]
    StaleSnapshot {
        account: Address,
        stored: usize,
        snapshot: usize,
    },

    /// The snapshot would drop approvals already recorded for a pending transaction
    #[error("Stale snapshot for {account}: transaction {tx_id} has {stored} stored approvals, snapshot has {snapshot}")]
    StaleRecord {
        account: Address,
        tx_id: TxId,
        stored: u32,
        snapshot: u32,
    },

    #[error("Signer set of {0} cannot change")]
    SignerSetChanged(Address),

    #[error("Clone registry of {factory} has {stored} at position {position}, got {given}")]
    RegistryConflict {
        factory: Address,
        position: usize,
        stored: WalletHandle,
        given: WalletHandle,
    },

    #[error(transparent)]
    Factory(#[from] FactoryError),
}
