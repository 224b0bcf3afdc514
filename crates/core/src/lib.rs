//! Multisig Core - Domain types
//!
//! Value types shared by every multisig crate:
//! - `Address`: 20-byte account identifier (signers, recipients, tokens, wallets)
//! - `Amount`: Non-negative decimal quantity of an asset

pub mod address;
pub mod amount;

pub use address::{Address, AddressError};
pub use amount::{Amount, AmountError};
