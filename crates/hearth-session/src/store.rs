//! Persistent store adapters.
//!
//! The session never talks to a storage medium directly. Everything goes
//! through [`SessionStore`], a string-keyed map that every context of the
//! same origin shares. [`MemoryStore`] shares a map between in-process
//! contexts; [`FileStore`] shares a JSON file between processes.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::trace;

use crate::error::{Error, Result};

/// A value held under a store key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl StoreValue {
    /// The value as a boolean. Only a stored `Bool` qualifies.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StoreValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The value as an integer.
    ///
    /// Numeric text is accepted: older writers stored timestamps as
    /// decimal strings.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StoreValue::Int(i) => Some(*i),
            StoreValue::Text(s) => s.trim().parse().ok(),
            StoreValue::Bool(_) => None,
        }
    }

    /// The value as text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StoreValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for StoreValue {
    fn from(b: bool) -> Self {
        StoreValue::Bool(b)
    }
}

impl From<i64> for StoreValue {
    fn from(i: i64) -> Self {
        StoreValue::Int(i)
    }
}

impl From<String> for StoreValue {
    fn from(s: String) -> Self {
        StoreValue::Text(s)
    }
}

impl From<&str> for StoreValue {
    fn from(s: &str) -> Self {
        StoreValue::Text(s.to_string())
    }
}

/// Trait for persistent store backends.
///
/// Implementations must make writes visible to every context sharing the
/// store. No atomicity is required beyond per-key read/write visibility.
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Read a key. `Ok(None)` means the key is absent.
    fn get(&self, key: &str) -> Result<Option<StoreValue>>;

    /// Write a key.
    fn set(&self, key: &str, value: StoreValue) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

/// Shared store handle.
pub type SharedStore = Arc<dyn SessionStore>;

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory store. Clones share the same map, so each clone behaves like
/// another context of the same origin.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<RwLock<HashMap<String, StoreValue>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<StoreValue>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: StoreValue) -> Result<()> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.values.write().remove(key);
        Ok(())
    }
}

// ============================================================================
// FileStore
// ============================================================================

/// Default store file name within the hearth data directory.
pub const STORE_FILE: &str = "session-store.json";

/// JSON-file store shared by every process on the machine.
///
/// Each read goes back to disk so that writes from other processes are
/// observed. A write holds an exclusive advisory lock on a sibling
/// `.lock` file for the whole read-modify-write, then publishes the new
/// content through a uniquely named temporary file and a rename, so
/// concurrent writers never drop each other's keys and readers never see
/// a torn file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by `STORE_FILE` inside `data_dir`.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(STORE_FILE),
        }
    }

    /// Create a store backed by an explicit file path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the store file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, StoreValue>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(Error::Store(format!("Failed to read store file: {}", e))),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content)
            .map_err(|e| Error::Store(format!("Failed to parse store file: {}", e)))
    }

    fn write_all(&self, values: &BTreeMap<String, StoreValue>) -> Result<()> {
        let json = serde_json::to_string_pretty(values)?;

        let mut tmp = NamedTempFile::new_in(self.parent_dir())
            .map_err(|e| Error::Store(format!("Failed to create temporary store file: {}", e)))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| Error::Store(format!("Failed to write store file: {}", e)))?;
        tmp.persist(&self.path)
            .map_err(|e| Error::Store(format!("Failed to replace store file: {}", e)))?;

        trace!(path = %self.path.display(), keys = values.len(), "Store file written");
        Ok(())
    }

    /// Run `apply` against the current content under the writer lock.
    ///
    /// The file is rewritten only when `apply` reports a change.
    fn update<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, StoreValue>) -> bool,
    {
        std::fs::create_dir_all(self.parent_dir())
            .map_err(|e| Error::Store(format!("Failed to create store directory: {}", e)))?;

        let guard = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())
            .map_err(|e| Error::Store(format!("Failed to open store lock: {}", e)))?;
        guard
            .lock()
            .map_err(|e| Error::Store(format!("Failed to lock store: {}", e)))?;

        let mut values = self.read_all()?;
        if apply(&mut values) {
            self.write_all(&values)?;
        }
        // Dropping the handle releases the advisory lock.
        drop(guard);
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<StoreValue>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: StoreValue) -> Result<()> {
        self.update(|values| {
            values.insert(key.to_string(), value);
            true
        })
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.update(|values| values.remove(key).is_some())
    }
}
