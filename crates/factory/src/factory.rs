//! Instance factory
//!
//! Each clone gets its own account, derived from the factory address and a
//! per-factory nonce, so two clones of one factory never share funds.

use multisig_core::Address;
use multisig_ledger::AssetLedger;
use multisig_wallet::{AuthorizationEngine, WalletSnapshot};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::arena::{WalletArena, WalletHandle};
use crate::config::FactoryConfig;
use crate::error::FactoryError;

struct Registry {
    clones: Vec<WalletHandle>,
    nonce: u64,
}

pub struct InstanceFactory {
    address: Address,
    ledger: Arc<dyn AssetLedger>,
    arena: Arc<WalletArena>,
    registry: Mutex<Registry>,
    max_clones: Option<usize>,
}

impl InstanceFactory {
    /// Create a factory at a fresh random address
    pub fn new(ledger: Arc<dyn AssetLedger>) -> Self {
        let seed = Uuid::new_v4();
        Self::with_address(Address::derive(&[b"multisig-factory", seed.as_bytes()]), ledger)
    }

    pub fn with_address(address: Address, ledger: Arc<dyn AssetLedger>) -> Self {
        tracing::debug!(factory = %address, "Factory created");
        Self {
            address,
            ledger,
            arena: Arc::new(WalletArena::new()),
            registry: Mutex::new(Registry {
                clones: Vec::new(),
                nonce: 0,
            }),
            max_clones: None,
        }
    }

    /// Cap the number of clones this factory will create
    pub fn with_max_clones(mut self, limit: usize) -> Self {
        self.max_clones = Some(limit);
        self
    }

    /// Build a factory and create every wallet listed in `config`, in order
    pub fn deploy(
        address: Address,
        config: &FactoryConfig,
        ledger: Arc<dyn AssetLedger>,
    ) -> Result<Self, FactoryError> {
        let mut factory = Self::with_address(address, ledger);
        factory.max_clones = config.max_clones;

        for wallet in &config.wallets {
            factory.create_wallet(wallet.quorum, wallet.signers.iter().copied())?;
        }

        tracing::info!(
            factory = %address,
            wallets = config.wallets.len(),
            "Factory deployed"
        );
        Ok(factory)
    }

    /// Rebuild a factory from wallet snapshots given in registry order.
    ///
    /// Each snapshot must sit at the address the factory would have derived
    /// for its position. Snapshots carry no clone limit; chain
    /// [`Self::with_max_clones`] to reinstate one.
    pub fn restore(
        address: Address,
        ledger: Arc<dyn AssetLedger>,
        snapshots: impl IntoIterator<Item = WalletSnapshot>,
    ) -> Result<Self, FactoryError> {
        let factory = Self::with_address(address, ledger);

        {
            let mut registry = factory.lock();
            for (position, snapshot) in snapshots.into_iter().enumerate() {
                let nonce = registry.nonce + 1;
                let expected = factory.clone_address(nonce);
                if snapshot.account != expected {
                    return Err(FactoryError::RegistryMismatch {
                        position,
                        expected,
                        found: snapshot.account,
                    });
                }

                let engine = AuthorizationEngine::restore(snapshot, factory.ledger.clone())?;
                let (handle, _) = factory.arena.insert(engine);
                registry.clones.push(handle);
                registry.nonce = nonce;
            }
        }

        tracing::info!(
            factory = %address,
            wallets = factory.clone_count(),
            "Factory restored"
        );
        Ok(factory)
    }

    /// Create an independent wallet and record its handle.
    ///
    /// Validation failures leave the registry unchanged.
    pub fn create_wallet(
        &self,
        quorum: u32,
        signers: impl IntoIterator<Item = Address>,
    ) -> Result<WalletHandle, FactoryError> {
        let mut registry = self.lock();

        if let Some(limit) = self.max_clones {
            if registry.clones.len() >= limit {
                tracing::warn!(factory = %self.address, limit, "Clone limit reached");
                return Err(FactoryError::CloneLimitReached { limit });
            }
        }

        let nonce = registry.nonce + 1;
        let account = self.clone_address(nonce);
        let engine = AuthorizationEngine::new(account, quorum, signers, self.ledger.clone())?;

        let (handle, inserted) = self.arena.insert(engine);
        debug_assert!(inserted, "nonce reused for {}", handle);

        registry.clones.push(handle);
        registry.nonce = nonce;

        tracing::info!(
            factory = %self.address,
            wallet = %handle,
            quorum,
            clones = registry.clones.len(),
            "Wallet cloned"
        );
        Ok(handle)
    }

    /// Handles of every wallet this factory created, in creation order
    pub fn list_clones(&self) -> Vec<WalletHandle> {
        self.lock().clones.clone()
    }

    pub fn wallet(&self, handle: &WalletHandle) -> Option<Arc<AuthorizationEngine>> {
        if !self.lock().clones.contains(handle) {
            return None;
        }
        self.arena.get(handle)
    }

    pub fn clone_count(&self) -> usize {
        self.lock().clones.len()
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn max_clones(&self) -> Option<usize> {
        self.max_clones
    }

    pub fn arena(&self) -> Arc<WalletArena> {
        Arc::clone(&self.arena)
    }

    /// Snapshots of every clone, in registry order
    pub fn snapshots(&self) -> Vec<WalletSnapshot> {
        self.list_clones()
            .iter()
            .filter_map(|handle| self.arena.get(handle))
            .map(|engine| engine.snapshot())
            .collect()
    }

    fn clone_address(&self, nonce: u64) -> Address {
        Address::derive(&[self.address.as_bytes(), &nonce.to_be_bytes()])
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for InstanceFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceFactory")
            .field("address", &self.address)
            .field("clones", &self.clone_count())
            .field("max_clones", &self.max_clones)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multisig_approval::ApprovalError;
    use multisig_ledger::InMemoryLedger;
    use multisig_wallet::WalletError;

    fn a(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    fn factory() -> InstanceFactory {
        InstanceFactory::with_address(a(0xfa), Arc::new(InMemoryLedger::new()))
    }

    #[test]
    fn test_random_factories_differ() {
        let ledger: Arc<dyn AssetLedger> = Arc::new(InMemoryLedger::new());
        let first = InstanceFactory::new(ledger.clone());
        let second = InstanceFactory::new(ledger);
        assert_ne!(first.address(), second.address());
    }

    #[test]
    fn test_clone_addresses_are_deterministic() {
        let first = factory();
        let second = factory();

        let h1 = first.create_wallet(1, [a(1), a(2)]).unwrap();
        let h2 = second.create_wallet(2, [a(3), a(4)]).unwrap();
        assert_eq!(h1, h2);
        assert_ne!(h1.address(), first.address());
    }

    #[test]
    fn test_invalid_wallet_not_registered() {
        let rejecting = factory();

        let err = rejecting.create_wallet(3, [a(1), a(2)]).unwrap_err();
        assert!(matches!(
            err,
            FactoryError::Wallet(WalletError::Approval(ApprovalError::InvalidConfiguration(_)))
        ));
        assert_eq!(rejecting.clone_count(), 0);
        assert!(rejecting.arena().is_empty());

        // Nonce was not consumed
        let handle = rejecting.create_wallet(1, [a(1), a(2)]).unwrap();
        assert_eq!(handle, factory().create_wallet(2, [a(5), a(6)]).unwrap());
    }

    #[test]
    fn test_clone_limit() {
        let factory = factory().with_max_clones(1);
        factory.create_wallet(1, [a(1), a(2)]).unwrap();

        let err = factory.create_wallet(1, [a(1), a(2)]).unwrap_err();
        assert_eq!(err, FactoryError::CloneLimitReached { limit: 1 });
        assert_eq!(factory.list_clones().len(), 1);
    }

    #[test]
    fn test_wallet_lookup_is_scoped_to_factory() {
        let first = factory();
        let other = InstanceFactory::with_address(a(0xfb), Arc::new(InMemoryLedger::new()));

        let handle = first.create_wallet(1, [a(1), a(2)]).unwrap();
        assert!(first.wallet(&handle).is_some());
        assert!(other.wallet(&handle).is_none());
    }

    #[test]
    fn test_restore_rejects_foreign_snapshot() {
        let source = factory();
        let handle = source.create_wallet(1, [a(1), a(2)]).unwrap();
        let snapshot = source.wallet(&handle).unwrap().snapshot();

        let result = InstanceFactory::restore(a(0xfb), Arc::new(InMemoryLedger::new()), [snapshot]);
        assert!(matches!(
            result,
            Err(FactoryError::RegistryMismatch { position: 0, .. })
        ));
    }
}
