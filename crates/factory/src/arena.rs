//! Wallet arena - independently owned engines indexed by handle

use multisig_core::Address;
use multisig_wallet::AuthorizationEngine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Opaque reference to a wallet created by a factory.
///
/// The handle is the wallet's account address, so it stays meaningful
/// across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletHandle(Address);

impl WalletHandle {
    pub const fn new(account: Address) -> Self {
        Self(account)
    }

    pub const fn address(&self) -> Address {
        self.0
    }
}

impl fmt::Display for WalletHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Address> for WalletHandle {
    fn from(account: Address) -> Self {
        Self(account)
    }
}

/// Owns every wallet engine. Engines share nothing with each other;
/// each one serializes its own operations.
#[derive(Default)]
pub struct WalletArena {
    wallets: RwLock<HashMap<WalletHandle, Arc<AuthorizationEngine>>>,
}

impl WalletArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an engine under its account address. Returns `false` and leaves
    /// the arena untouched if the handle is taken.
    pub fn insert(&self, engine: AuthorizationEngine) -> (WalletHandle, bool) {
        let handle = WalletHandle(engine.account());
        let mut wallets = self.wallets.write().unwrap_or_else(PoisonError::into_inner);

        if wallets.contains_key(&handle) {
            return (handle, false);
        }
        wallets.insert(handle, Arc::new(engine));
        (handle, true)
    }

    pub fn get(&self, handle: &WalletHandle) -> Option<Arc<AuthorizationEngine>> {
        self.wallets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handle)
            .cloned()
    }

    pub fn contains(&self, handle: &WalletHandle) -> bool {
        self.wallets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.wallets.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
