//! # Multisig Factory
//!
//! One template, many wallets. The factory creates independently owned
//! [`multisig_wallet::AuthorizationEngine`] instances, keeps them in a
//! [`WalletArena`], and remembers only their handles in creation order.

mod arena;
mod config;
mod error;
mod factory;

pub use arena::{WalletArena, WalletHandle};
pub use config::FactoryConfig;
pub use error::FactoryError;
pub use factory::InstanceFactory;
