//! # Multisig Wallet
//!
//! A wallet whose outgoing transfers execute only after a quorum of its
//! signers approved them.
//!
//! ## Operations
//! - `propose`: a signer opens a transfer and approves it in the same step
//! - `approve_tx`: another signer votes; the vote that reaches quorum runs
//!   the transfer
//! - `execute`: retry a transfer whose execution was deferred
//! - `update_quorum`: any signer changes the approval threshold
//!
//! Funds live on an external [`multisig_ledger::AssetLedger`]. The wallet
//! never caches balances; every check reads the ledger.

mod config;
mod engine;
mod error;
mod outcome;
mod snapshot;

pub use config::WalletConfig;
pub use engine::AuthorizationEngine;
pub use error::WalletError;
pub use outcome::ApprovalOutcome;
pub use snapshot::WalletSnapshot;
