//! # Multisig Approval
//!
//! Quorum bookkeeping for multi-signature wallets.
//!
//! ## Scope
//! - `SignerRegistry`: who may propose and approve, and how many approvals
//!   a transfer needs
//! - `TransactionLedger`: append-only transaction records and their
//!   approval state
//!
//! ## Rules
//! - A proposal counts as the proposer's approval
//! - Each signer approves a transaction at most once
//! - Completed records never change again
//! - Quorum is read at approval time, not at proposal time

mod error;
mod ledger;
mod signers;
mod transaction;

pub use error::ApprovalError;
pub use ledger::{ApprovalResult, LedgerStats, TransactionLedger};
pub use signers::{SignerRegistry, MIN_SIGNERS};
pub use transaction::{TransactionRecord, TransactionStatus, TxId};
