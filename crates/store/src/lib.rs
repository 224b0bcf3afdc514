//! # Multisig Store
//!
//! SQLite persistence for wallet snapshots and factory clone registries.
//! Rows are only ever inserted or updated, never deleted.

mod error;
mod store;

pub use error::StoreError;
pub use store::WalletStore;
