//! Collaborator traits: preference/history persistence and folder
//! hierarchy lookup.
//!
//! The engine degrades to built-in defaults when a store read fails;
//! durability of learning state is best-effort by design.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cs_common::{Error, Result};

/// Key-value JSON persistence for preferences and conflict history.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// A folder as seen by the hierarchy lookup collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRef {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
}

/// Parent lookup over the folder tree.
///
/// The caller guarantees acyclic data; the hierarchy strategy still caps
/// its walks and treats a revisited id as a circular dependency.
pub trait HierarchyLookup: Send + Sync {
    fn parent_of(&self, folder_id: &str) -> Result<Option<FolderRef>>;
}

// ── In-memory implementations ───────────────────────────────────────────

/// Mutex-guarded map store, the default for tests and embedders that
/// persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(key.to_string(), value);
        Ok(())
    }
}

/// Static folder tree for tests and embedders without a live store.
#[derive(Debug, Default)]
pub struct StaticHierarchy {
    nodes: BTreeMap<String, FolderRef>,
}

impl StaticHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, folder: FolderRef) {
        self.nodes.insert(folder.id.clone(), folder);
    }

    /// Convenience builder for `(id, name, parent)` triples.
    pub fn from_folders<'a>(
        folders: impl IntoIterator<Item = (&'a str, &'a str, Option<&'a str>)>,
    ) -> Self {
        let mut h = Self::new();
        for (id, name, parent) in folders {
            h.insert(FolderRef {
                id: id.to_string(),
                name: name.to_string(),
                parent_id: parent.map(String::from),
            });
        }
        h
    }
}

impl HierarchyLookup for StaticHierarchy {
    fn parent_of(&self, folder_id: &str) -> Result<Option<FolderRef>> {
        let node = match self.nodes.get(folder_id) {
            Some(n) => n,
            None => return Ok(None),
        };
        Ok(node
            .parent_id
            .as_ref()
            .and_then(|pid| self.nodes.get(pid))
            .cloned())
    }
}

// ── File-backed store ───────────────────────────────────────────────────

/// Single-document JSON store: the whole key space lives in one
/// pretty-printed file, loaded on open and written through on every set.
///
/// A corrupt or unreadable document degrades to an empty store with a
/// warning rather than failing the engine.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    cache: Mutex<BTreeMap<String, Value>>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = match Self::load_document(&path) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "preference document unreadable; starting empty"
                );
                BTreeMap::new()
            }
        };
        Self {
            path,
            cache: Mutex::new(cache),
        }
    }

    fn load_document(path: &Path) -> Result<BTreeMap<String, Value>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn flush(&self, map: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let serialized = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, serialized)?;
        Ok(())
    }
}

impl PreferenceStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let map = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut map = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(key.to_string(), value);
        self.flush(&map)
            .map_err(|e| Error::Store(format!("write-through failed: {e}")))
    }
}
