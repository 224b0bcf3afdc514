//! SQLite storage for wallets and clone registries

use crate::error::StoreError;
use multisig_approval::TransactionRecord;
use multisig_core::Address;
use multisig_factory::{InstanceFactory, WalletHandle};
use multisig_ledger::AssetLedger;
use multisig_wallet::WalletSnapshot;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// SQLite storage for wallet snapshots
pub struct WalletStore {
    conn: Connection,
}

impl WalletStore {
    /// Open (or create) a store at the given database path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS wallets (
                account TEXT PRIMARY KEY,
                quorum INTEGER NOT NULL,
                signers_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS transactions (
                account TEXT NOT NULL REFERENCES wallets(account),
                tx_id INTEGER NOT NULL,
                status TEXT NOT NULL,
                record_json TEXT NOT NULL,
                PRIMARY KEY (account, tx_id)
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_status
                ON transactions(account, status);

            CREATE TABLE IF NOT EXISTS factories (
                address TEXT PRIMARY KEY,
                max_clones INTEGER
            );

            CREATE TABLE IF NOT EXISTS clone_registry (
                factory TEXT NOT NULL,
                position INTEGER NOT NULL,
                wallet TEXT NOT NULL,
                PRIMARY KEY (factory, position)
            );",
        )?;

        Ok(())
    }

    /// Save a wallet snapshot atomically.
    ///
    /// Transaction records are append-only and pending records only gain
    /// approvals, so a snapshot that would drop either is rejected as stale.
    /// The signer set of a stored wallet never changes.
    pub fn save_wallet(&self, snapshot: &WalletSnapshot) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        write_wallet(&tx, snapshot)?;
        tx.commit()?;

        tracing::debug!(
            wallet = %snapshot.account,
            transactions = snapshot.transactions.len(),
            "Wallet saved"
        );
        Ok(())
    }

    /// Load a wallet snapshot by account
    pub fn load_wallet(&self, account: &Address) -> Result<WalletSnapshot, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT quorum, signers_json FROM wallets WHERE account = ?1",
                params![account.to_string()],
                |row| Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let (quorum, signers_json) = row.ok_or(StoreError::NotFound(*account))?;
        let signers = serde_json::from_str(&signers_json)?;

        let mut stmt = self.conn.prepare(
            "SELECT record_json FROM transactions WHERE account = ?1 ORDER BY tx_id",
        )?;
        let rows = stmt.query_map(params![account.to_string()], |row| row.get::<_, String>(0))?;

        let mut transactions = Vec::new();
        for json in rows {
            transactions.push(serde_json::from_str(&json?)?);
        }

        Ok(WalletSnapshot {
            account: *account,
            quorum,
            signers,
            transactions,
        })
    }

    /// Accounts of every stored wallet
    pub fn list_wallets(&self) -> Result<Vec<Address>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT account FROM wallets ORDER BY account")?;

        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut accounts = Vec::new();
        for account in rows {
            accounts.push(Address::from_str(&account?)?);
        }

        Ok(accounts)
    }

    /// Count a wallet's stored transactions that are still pending
    pub fn count_pending(&self, account: &Address) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE account = ?1 AND status = 'pending'",
            params![account.to_string()],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    /// Record a factory's clone registry.
    ///
    /// Stored positions must match `handles`; new positions are appended.
    pub fn save_clone_registry(
        &self,
        factory: &Address,
        handles: &[WalletHandle],
    ) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        write_registry(&tx, factory, handles)?;
        tx.commit()?;
        Ok(())
    }

    /// Clone handles of a factory in creation order; empty when unknown
    pub fn load_clone_registry(&self, factory: &Address) -> Result<Vec<WalletHandle>, StoreError> {
        read_registry(&self.conn, factory)
    }

    /// Save every clone of a factory together with its registry, atomically
    pub fn save_factory(&self, factory: &InstanceFactory) -> Result<(), StoreError> {
        let handles = factory.list_clones();
        let snapshots = factory.snapshots();

        let tx = self.conn.unchecked_transaction()?;
        for snapshot in &snapshots {
            write_wallet(&tx, snapshot)?;
        }
        write_registry(&tx, &factory.address(), &handles)?;
        tx.execute(
            "INSERT INTO factories (address, max_clones) VALUES (?1, ?2)
             ON CONFLICT(address) DO UPDATE SET max_clones = excluded.max_clones",
            params![
                factory.address().to_string(),
                factory.max_clones().map(|limit| limit as i64)
            ],
        )?;
        tx.commit()?;

        tracing::info!(
            factory = %factory.address(),
            wallets = handles.len(),
            "Factory saved"
        );
        Ok(())
    }

    /// Rebuild a factory, its clone limit and all of its clones from the store
    pub fn load_factory(
        &self,
        factory: Address,
        ledger: Arc<dyn AssetLedger>,
    ) -> Result<InstanceFactory, StoreError> {
        let snapshots = read_registry(&self.conn, &factory)?
            .iter()
            .map(|handle| self.load_wallet(&handle.address()))
            .collect::<Result<Vec<_>, _>>()?;

        let max_clones = self
            .conn
            .query_row(
                "SELECT max_clones FROM factories WHERE address = ?1",
                params![factory.to_string()],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?
            .flatten();

        let restored = InstanceFactory::restore(factory, ledger, snapshots)?;
        Ok(match max_clones {
            Some(limit) => restored.with_max_clones(limit as usize),
            None => restored,
        })
    }
}

fn write_wallet(conn: &Connection, snapshot: &WalletSnapshot) -> Result<(), StoreError> {
    let account = snapshot.account.to_string();

    let stored: i64 = conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE account = ?1",
        params![account],
        |row| row.get(0),
    )?;
    if stored as usize > snapshot.transactions.len() {
        return Err(StoreError::StaleSnapshot {
            account: snapshot.account,
            stored: stored as usize,
            snapshot: snapshot.transactions.len(),
        });
    }

    // The signer set is fixed when a wallet is created
    let stored_signers = conn
        .query_row(
            "SELECT signers_json FROM wallets WHERE account = ?1",
            params![account],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    if let Some(json) = stored_signers {
        let stored: Vec<Address> = serde_json::from_str(&json)?;
        if stored != snapshot.signers {
            return Err(StoreError::SignerSetChanged(snapshot.account));
        }
    }

    for record in &snapshot.transactions {
        ensure_votes_kept(conn, snapshot.account, record)?;
    }

    conn.execute(
        "INSERT INTO wallets (account, quorum, signers_json, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(account) DO UPDATE SET
             quorum = excluded.quorum,
             updated_at = excluded.updated_at",
        params![
            account,
            snapshot.quorum,
            serde_json::to_string(&snapshot.signers)?,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;

    // Completed records are frozen
    let mut stmt = conn.prepare(
        "INSERT INTO transactions (account, tx_id, status, record_json)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(account, tx_id) DO UPDATE SET
             status = excluded.status,
             record_json = excluded.record_json
         WHERE transactions.status = 'pending'",
    )?;
    for record in &snapshot.transactions {
        stmt.execute(params![
            account,
            record.id().get() as i64,
            record.status().to_string(),
            serde_json::to_string(record)?,
        ])?;
    }

    Ok(())
}

/// A pending record may only gain approvals. Completed records are skipped
/// because the upsert never touches them.
fn ensure_votes_kept(
    conn: &Connection,
    account: Address,
    record: &TransactionRecord,
) -> Result<(), StoreError> {
    let stored_json = conn
        .query_row(
            "SELECT record_json FROM transactions
             WHERE account = ?1 AND tx_id = ?2 AND status = 'pending'",
            params![account.to_string(), record.id().get() as i64],
            |row| row.get::<_, String>(0),
        )
        .optional()?;

    let Some(json) = stored_json else {
        return Ok(());
    };
    let stored: TransactionRecord = serde_json::from_str(&json)?;

    if !record.approved_by().starts_with(stored.approved_by()) {
        return Err(StoreError::StaleRecord {
            account,
            tx_id: record.id(),
            stored: stored.approval_count(),
            snapshot: record.approval_count(),
        });
    }
    Ok(())
}

fn read_registry(conn: &Connection, factory: &Address) -> Result<Vec<WalletHandle>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT wallet FROM clone_registry WHERE factory = ?1 ORDER BY position",
    )?;

    let rows = stmt.query_map(params![factory.to_string()], |row| row.get::<_, String>(0))?;

    let mut handles = Vec::new();
    for wallet in rows {
        handles.push(WalletHandle::new(Address::from_str(&wallet?)?));
    }

    Ok(handles)
}

fn write_registry(
    conn: &Connection,
    factory: &Address,
    handles: &[WalletHandle],
) -> Result<(), StoreError> {
    let stored = read_registry(conn, factory)?;

    for (position, (stored, given)) in stored.iter().zip(handles).enumerate() {
        if stored != given {
            return Err(StoreError::RegistryConflict {
                factory: *factory,
                position,
                stored: *stored,
                given: *given,
            });
        }
    }

    let mut stmt = conn.prepare(
        "INSERT INTO clone_registry (factory, position, wallet) VALUES (?1, ?2, ?3)",
    )?;
    for (position, handle) in handles.iter().enumerate().skip(stored.len()) {
        stmt.execute(params![
            factory.to_string(),
            position as i64,
            handle.to_string()
        ])?;
    }

    Ok(())
}
