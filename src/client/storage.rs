//! Client-side key/value persistence.
//!
//! Two keys matter to WAuth:
//! - [`STRATEGY_ID_KEY`] names the wallet strategy that was last connected
//! - [`PERSISTED_SESSION_KEY`] holds the auth session the SDK restores on startup
//!
//! [`FileStorage`] persists to a JSON file at `{dir}/client-storage.json`,
//! taking an exclusive `fs2` lock around every write so that two clients
//! sharing a directory never interleave.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use fs2::FileExt;

use super::provider::Provider;

/// Key under which the wallet kit records the active strategy id.
pub const STRATEGY_ID_KEY: &str = "wallet_kit_strategy_id";

/// Key under which the auth SDK persists its session.
pub const PERSISTED_SESSION_KEY: &str = "pocketbase_auth";

/// Synchronous string key/value storage.
pub trait ClientStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> std::io::Result<()>;
    fn remove(&self, key: &str) -> std::io::Result<()>;
}

pub type SharedClientStorage = Arc<dyn ClientStorage>;

/// The provider whose strategy id is persisted, if it is a WAuth strategy.
pub fn active_provider(storage: &dyn ClientStorage) -> Option<Provider> {
    storage
        .get(STRATEGY_ID_KEY)
        .and_then(|id| Provider::from_strategy_id(&id))
}

/// Whether an auth session is persisted.
pub fn has_persisted_session(storage: &dyn ClientStorage) -> bool {
    storage
        .get(PERSISTED_SESSION_KEY)
        .is_some_and(|v| !v.trim().is_empty())
}

fn read_guard<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|p| p.into_inner())
}

fn write_guard<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|p| p.into_inner())
}

/// Volatile storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        read_guard(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        write_guard(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        write_guard(&self.values).remove(key);
        Ok(())
    }
}

/// JSON-file storage.
#[derive(Debug)]
pub struct FileStorage {
    values: RwLock<HashMap<String, String>>,
    storage_path: PathBuf,
}

impl FileStorage {
    /// Open storage under `dir`, loading any existing file.
    pub fn open(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let storage_path = dir.join("client-storage.json");

        let values = if storage_path.exists() {
            match Self::load_from_path(&storage_path) {
                Ok(values) => {
                    tracing::debug!("Loaded client storage from {}", storage_path.display());
                    values
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to load client storage from {}: {}, starting empty",
                        storage_path.display(),
                        e
                    );
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            values: RwLock::new(values),
            storage_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    fn load_from_path(path: &Path) -> std::io::Result<HashMap<String, String>> {
        let mut file = File::open(path)?;
        FileExt::lock_shared(&file)?;
        let mut contents = String::new();
        let read = file.read_to_string(&mut contents);
        FileExt::unlock(&file)?;
        read?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Apply `change` and write the result while holding the file lock.
    fn update(&self, change: impl FnOnce(&mut HashMap<String, String>)) -> std::io::Result<()> {
        let mut values = write_guard(&self.values);
        change(&mut values);

        let contents = serde_json::to_string_pretty(&*values)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.storage_path)?;
        FileExt::lock_exclusive(&file)?;
        let written = overwrite(&mut file, contents.as_bytes());
        FileExt::unlock(&file)?;
        written
    }
}

fn overwrite(file: &mut File, contents: &[u8]) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(contents)?;
    file.sync_all()
}

impl ClientStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        read_guard(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        self.update(|values| {
            values.remove(key);
        })
    }
}
