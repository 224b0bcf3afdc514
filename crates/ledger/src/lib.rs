//! Multisig Asset Ledger
//!
//! The token ledger is an external collaborator: wallets ask it for balances
//! and ask it to move funds, but never keep balances of their own.
//! `InMemoryLedger` is the bundled implementation for tests and local setups.

mod error;
mod memory;
mod traits;

pub use error::TransferError;
pub use memory::InMemoryLedger;
pub use traits::AssetLedger;
