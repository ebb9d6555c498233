//! Record store for the four persisted collections.
//!
//! Every collection is rewritten wholesale on each save. There is no file
//! locking: two processes sharing a data directory overwrite each other
//! (last writer wins).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// A persisted record collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Filament spools.
    Spools,
    /// Deferred job queue.
    Queue,
    /// Sales and failure history.
    History,
    /// Maintenance log (owned by an external collaborator).
    Maintenance,
}

impl Collection {
    /// All collections, in backup order.
    pub const ALL: [Collection; 4] = [
        Collection::Spools,
        Collection::History,
        Collection::Maintenance,
        Collection::Queue,
    ];

    /// File name used by [`JsonFileStore`].
    pub fn file_name(self) -> &'static str {
        match self {
            Collection::Spools => "filament_inventory.json",
            Collection::Queue => "job_queue.json",
            Collection::History => "sales_history.json",
            Collection::Maintenance => "maintenance_log.json",
        }
    }
}

/// Raw storage backend for serialized collections.
pub trait RecordStore: Send + Sync {
    /// Read a collection. `Ok(None)` means it was never written.
    fn read(&self, collection: Collection) -> Result<Option<String>>;

    /// Replace a collection's contents.
    fn write(&self, collection: Collection, contents: &str) -> Result<()>;
}

/// Store that keeps one JSON file per collection in a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (and create if needed) a data directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of a collection file.
    pub fn path_of(&self, collection: Collection) -> PathBuf {
        self.dir.join(collection.file_name())
    }
}

impl RecordStore for JsonFileStore {
    fn read(&self, collection: Collection) -> Result<Option<String>> {
        let path = self.path_of(collection);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn write(&self, collection: Collection, contents: &str) -> Result<()> {
        fs::write(self.path_of(collection), contents)?;
        Ok(())
    }
}

/// In-memory store, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Collection, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with an IO error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Seed a collection with raw contents.
    pub fn insert_raw(&self, collection: Collection, contents: impl Into<String>) {
        if let Ok(mut map) = self.collections.lock() {
            map.insert(collection, contents.into());
        }
    }
}

impl RecordStore for MemoryStore {
    fn read(&self, collection: Collection) -> Result<Option<String>> {
        let map = self
            .collections
            .lock()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        Ok(map.get(&collection).cloned())
    }

    fn write(&self, collection: Collection, contents: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("store is read-only").into());
        }
        let mut map = self
            .collections
            .lock()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        map.insert(collection, contents.to_string());
        Ok(())
    }
}

/// Load a collection, degrading to empty on any read or parse failure.
pub fn load_collection<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
) -> Vec<T> {
    let raw = match store.read(collection) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(?collection, error = %e, "record store unreadable, starting empty");
            return Vec::new();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(?collection, error = %e, "record collection corrupt, starting empty");
            Vec::new()
        }
    }
}

/// Serialize and write a whole collection.
pub fn save_collection<T: Serialize>(
    store: &dyn RecordStore,
    collection: Collection,
    records: &[T],
) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut ser)?;
    let contents = String::from_utf8(buf).map_err(|e| std::io::Error::other(e.to_string()))?;
    store.write(collection, &contents)
}
