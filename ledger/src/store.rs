//! Durable keyed storage for ledger entries.
//!
//! The ledger only needs put / get / list-by-prefix. Keys are ordered, so a
//! zero-padded sequence in the key yields append order on `list`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

/// Error types for storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Backend rejected or failed the operation
    #[error("Backend error: {0}")]
    Backend(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(e: sled::Error) -> Self {
        StorageError::Backend(e.to_string())
    }
}

/// Keyed storage the ledger persists into.
///
/// `put` must not return `Ok` until the value is durable for this backend.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Backend identifier for logs.
    fn name(&self) -> &str;

    /// Store a value under a key.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Fetch a value by key.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// All `(key, value)` pairs whose key starts with `prefix`, in key order.
    async fn list(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError>;
}

/// In-memory store for tests and ephemeral ledgers.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        records.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let records = self.records.read().await;
        Ok(records.get(key).cloned())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

/// Store backed by an embedded sled database.
///
/// Every `put` is flushed before returning, so sled's background flusher is
/// disabled and dropping the store releases the database lock at once.
pub struct SledStore {
    /// Database handle; owns the file lock
    db: sled::Db,
    /// Ledger records tree
    entries: sled::Tree,
}

impl SledStore {
    /// Name of the sled tree holding ledger records.
    const TREE: &'static str = "ledger";

    /// Open or create a store at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let db = sled::Config::new().path(path).flush_every_ms(None).open()?;
        let entries = db.open_tree(Self::TREE)?;

        info!(path = %path.display(), "Ledger store opened");

        Ok(Self { db, entries })
    }

    /// Bytes the database occupies on disk.
    pub fn size_on_disk(&self) -> Result<u64, StorageError> {
        Ok(self.db.size_on_disk()?)
    }
}

#[async_trait]
impl LedgerStore for SledStore {
    fn name(&self) -> &str {
        "sled"
    }

    /// Insert and flush run as one blocking task. If the caller stops
    /// waiting (a storage timeout), the task still finishes and the record
    /// may land; the ledger reloads its chain head after any failed put.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let entries = self.entries.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            entries.insert(key.as_bytes(), value)?;
            entries.flush()?;
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Backend(format!("sled write task failed: {e}")))?
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        self.entries
            .scan_prefix(prefix.as_bytes())
            .map(|item| -> Result<(String, Vec<u8>), StorageError> {
                let (key, value) = item?;
                Ok((String::from_utf8_lossy(&key).into_owned(), value.to_vec()))
            })
            .collect()
    }
}
