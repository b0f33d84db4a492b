//! SQLite-based wallet store.

use super::{
    new_record_id, now_string, ConnectedWallet, NewConnectedWallet, NewWallet, StoreError,
    StoreResult, WalletRecord, WalletStore,
};
use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS wallets (
    id TEXT PRIMARY KEY NOT NULL,
    owner TEXT NOT NULL UNIQUE,
    encrypted_jwk TEXT NOT NULL,
    salt TEXT NOT NULL,
    public_key TEXT NOT NULL,
    address TEXT NOT NULL,
    created TEXT NOT NULL,
    updated TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS connected_wallets (
    id TEXT PRIMARY KEY NOT NULL,
    owner TEXT NOT NULL,
    address TEXT NOT NULL,
    public_key TEXT NOT NULL,
    signature TEXT NOT NULL,
    created TEXT NOT NULL,
    UNIQUE (owner, address)
);

CREATE INDEX IF NOT EXISTS idx_connected_wallets_owner ON connected_wallets(owner, created DESC);
"#;

const WALLET_COLUMNS: &str =
    "id, owner, encrypted_jwk, salt, public_key, address, created, updated";

pub struct SqliteWalletStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteWalletStore {
    pub async fn new(base_dir: PathBuf) -> StoreResult<Self> {
        let db_path = base_dir.join("wallets.db");

        tokio::fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to create store dir: {}", e)))?;

        // Open database in blocking task
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path).map_err(|e| {
                StoreError::Backend(format!("Failed to open SQLite database: {}", e))
            })?;
            conn.execute_batch(SCHEMA)
                .map_err(|e| StoreError::Backend(format!("Failed to run schema: {}", e)))?;
            tracing::debug!(path = %db_path.display(), "Opened wallet database");
            Ok::<_, StoreError>(conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Task join error: {}", e)))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?
    }
}

fn backend(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Map constraint violations to `Conflict`, everything else to `Backend`.
fn classify(e: rusqlite::Error, conflict: impl FnOnce() -> String) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            StoreError::Conflict(conflict())
        }
        _ => backend(e),
    }
}

fn wallet_from_row(row: &Row<'_>) -> rusqlite::Result<WalletRecord> {
    Ok(WalletRecord {
        id: row.get(0)?,
        owner: row.get(1)?,
        encrypted_jwk: row.get(2)?,
        salt: row.get(3)?,
        public_key: row.get(4)?,
        address: row.get(5)?,
        created: row.get(6)?,
        updated: row.get(7)?,
    })
}

fn connected_from_row(row: &Row<'_>) -> rusqlite::Result<ConnectedWallet> {
    Ok(ConnectedWallet {
        id: row.get(0)?,
        owner: row.get(1)?,
        address: row.get(2)?,
        public_key: row.get(3)?,
        signature: row.get(4)?,
        created: row.get(5)?,
    })
}

#[async_trait]
impl WalletStore for SqliteWalletStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn find_wallet_by_owner(&self, owner: &str) -> StoreResult<Option<WalletRecord>> {
        let owner = owner.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM wallets WHERE owner = ?1", WALLET_COLUMNS),
                params![owner],
                wallet_from_row,
            )
            .optional()
            .map_err(backend)
        })
        .await
    }

    async fn get_wallet(&self, id: &str) -> StoreResult<Option<WalletRecord>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM wallets WHERE id = ?1", WALLET_COLUMNS),
                params![id],
                wallet_from_row,
            )
            .optional()
            .map_err(backend)
        })
        .await
    }

    async fn insert_wallet(&self, wallet: NewWallet) -> StoreResult<WalletRecord> {
        let now = now_string();
        let record = WalletRecord {
            id: new_record_id(),
            owner: wallet.owner,
            encrypted_jwk: wallet.encrypted_jwk,
            salt: wallet.salt,
            public_key: wallet.public_key,
            address: wallet.address,
            created: now.clone(),
            updated: now,
        };
        self.with_conn(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO wallets ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    WALLET_COLUMNS
                ),
                params![
                    record.id,
                    record.owner,
                    record.encrypted_jwk,
                    record.salt,
                    record.public_key,
                    record.address,
                    record.created,
                    record.updated,
                ],
            )
            .map_err(|e| {
                classify(e, || format!("Identity {} already has a wallet", record.owner))
            })?;
            Ok(record)
        })
        .await
    }

    async fn list_connected_wallets(&self, owner: &str) -> StoreResult<Vec<ConnectedWallet>> {
        let owner = owner.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, owner, address, public_key, signature, created
                     FROM connected_wallets
                     WHERE owner = ?1
                     ORDER BY created DESC",
                )
                .map_err(backend)?;
            let rows = stmt
                .query_map(params![owner], connected_from_row)
                .map_err(backend)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(backend)?;
            Ok(rows)
        })
        .await
    }

    async fn insert_connected_wallet(
        &self,
        wallet: NewConnectedWallet,
    ) -> StoreResult<ConnectedWallet> {
        let record = ConnectedWallet {
            id: new_record_id(),
            owner: wallet.owner,
            address: wallet.address,
            public_key: wallet.public_key,
            signature: wallet.signature,
            created: now_string(),
        };
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO connected_wallets (id, owner, address, public_key, signature, created)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.owner,
                    record.address,
                    record.public_key,
                    record.signature,
                    record.created,
                ],
            )
            .map_err(|e| classify(e, || format!("Wallet {} is already connected", record.address)))?;
            Ok(record)
        })
        .await
    }

    async fn delete_connected_wallet(&self, owner: &str, id: &str) -> StoreResult<bool> {
        let owner = owner.to_string();
        let id = id.to_string();
        self.with_conn(move |conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM connected_wallets WHERE id = ?1 AND owner = ?2",
                    params![id, owner],
                )
                .map_err(backend)?;
            Ok(deleted > 0)
        })
        .await
    }
}
