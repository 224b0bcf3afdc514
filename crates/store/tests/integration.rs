//! Integration tests for factory persistence across store reopen

use std::sync::Arc;

use multisig_approval::TransactionStatus;
use multisig_core::{Address, Amount};
use multisig_factory::{FactoryError, InstanceFactory};
use multisig_ledger::{AssetLedger, InMemoryLedger};
use multisig_store::{StoreError, WalletStore};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn a(n: u8) -> Address {
    Address::repeat_byte(n)
}

fn token() -> Address {
    a(0xe0)
}

#[test]
fn test_factory_survives_reopen() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("multisig.db");
    let ledger = Arc::new(InMemoryLedger::new());

    let factory = InstanceFactory::with_address(a(0xf0), ledger.clone());
    let first = factory.create_wallet(3, [a(1), a(2), a(3), a(4)])?;
    let second = factory.create_wallet(2, [a(1), a(2)])?;

    let wallet = factory.wallet(&first).unwrap();
    ledger.mint(token(), wallet.account(), Amount::from(500))?;
    let tx = wallet.propose(a(1), Amount::from(100), a(0xaa), token())?;
    wallet.approve_tx(a(2), tx)?;

    {
        let store = WalletStore::open(&path)?;
        store.save_factory(&factory)?;
    }

    let store = WalletStore::open(&path)?;
    let mut wallets = store.list_wallets()?;
    wallets.sort();
    let mut expected = vec![first.address(), second.address()];
    expected.sort();
    assert_eq!(wallets, expected);

    let restored = store.load_factory(a(0xf0), ledger.clone())?;
    assert_eq!(restored.list_clones(), vec![first, second]);

    let wallet = restored.wallet(&first).unwrap();
    assert_eq!(wallet.quorum(), 3);
    assert_eq!(wallet.transaction(tx).unwrap().approval_count(), 2);

    // Voting continues on the restored wallet
    assert!(wallet.approve_tx(a(3), tx)?.is_executed());
    assert_eq!(ledger.balance_of(&token(), &a(0xaa)), Amount::from(100));
    assert_eq!(
        wallet.transaction(tx).unwrap().status(),
        TransactionStatus::Completed
    );

    store.save_factory(&restored)?;
    assert_eq!(store.count_pending(&first.address())?, 0);
    Ok(())
}

#[test]
fn test_unknown_factory_loads_empty() -> anyhow::Result<()> {
    let store = WalletStore::in_memory()?;
    let ledger: Arc<dyn AssetLedger> = Arc::new(InMemoryLedger::new());

    let factory = store.load_factory(a(0xf9), ledger)?;
    assert_eq!(factory.clone_count(), 0);
    Ok(())
}

#[test]
fn test_registry_grows_but_never_reorders() -> anyhow::Result<()> {
    let store = WalletStore::in_memory()?;
    let ledger = Arc::new(InMemoryLedger::new());

    let factory = InstanceFactory::with_address(a(0xf0), ledger);
    factory.create_wallet(1, [a(1), a(2)])?;
    store.save_factory(&factory)?;

    factory.create_wallet(2, [a(3), a(4)])?;
    store.save_factory(&factory)?;
    assert_eq!(store.load_clone_registry(&a(0xf0))?, factory.list_clones());

    let result = store.save_clone_registry(&a(0xf0), &[factory.list_clones()[1]]);
    assert!(matches!(
        result,
        Err(StoreError::RegistryConflict { position: 0, .. })
    ));
    Ok(())
}

#[test]
fn test_clone_limit_survives_reload() -> anyhow::Result<()> {
    let store = WalletStore::in_memory()?;
    let ledger = Arc::new(InMemoryLedger::new());

    let factory = InstanceFactory::with_address(a(0xf0), ledger.clone()).with_max_clones(2);
    factory.create_wallet(1, [a(1), a(2)])?;
    store.save_factory(&factory)?;

    let restored = store.load_factory(a(0xf0), ledger)?;
    assert_eq!(restored.max_clones(), Some(2));

    restored.create_wallet(1, [a(1), a(2)])?;
    assert_eq!(
        restored.create_wallet(1, [a(1), a(2)]),
        Err(FactoryError::CloneLimitReached { limit: 2 })
    );
    Ok(())
}
