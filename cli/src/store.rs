use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use ledger_core::events::EventCreatePayload;
use ledger_core::filters::{FILTERS_STORAGE_KEY, FilterState, SEARCH_STORAGE_KEY};
use ledger_core::undo::UNDO_STORAGE_KEY;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable string entries that survive restarts.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// All entries in one JSON object file, rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt state file");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let data = serde_json::to_string_pretty(&self.entries)?;

        // Write with restricted permissions (0o600)
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&self.path)
            .map_err(io_err)?;
        file.write_all(data.as_bytes()).map_err(io_err)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Initial filters and search text, falling back to defaults when nothing
/// usable was persisted.
pub fn load_view_state(store: &impl KeyValueStore) -> (FilterState, String) {
    let filters = store
        .get(FILTERS_STORAGE_KEY)
        .and_then(|raw| {
            let parsed = FilterState::from_persisted(&raw);
            if parsed.is_none() {
                tracing::debug!("persisted filters did not parse, using defaults");
            }
            parsed
        })
        .unwrap_or_default();
    let search = store.get(SEARCH_STORAGE_KEY).unwrap_or_default();
    (filters, search)
}

pub fn load_undo(store: &impl KeyValueStore) -> Option<EventCreatePayload> {
    let raw = store.get(UNDO_STORAGE_KEY)?;
    serde_json::from_str(&raw)
        .inspect_err(|e| tracing::debug!(error = %e, "dropping unreadable undo payload"))
        .ok()
}

/// Persistence is fire-and-forget: failures are logged, never surfaced.
pub fn persist(store: &mut impl KeyValueStore, key: &str, value: Option<&str>) {
    let result = match value {
        Some(v) => store.set(key, v),
        None => store.remove(key),
    };
    if let Err(e) = result {
        tracing::warn!(key, error = %e, "failed to persist view state");
    }
}

// Unix-specific imports for file permissions
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

// No-op on non-unix (won't compile for Windows without this)
#[cfg(not(unix))]
trait OpenOptionsExt {
    fn mode(&mut self, _mode: u32) -> &mut Self;
}

#[cfg(not(unix))]
impl OpenOptionsExt for std::fs::OpenOptions {
    fn mode(&mut self, _mode: u32) -> &mut Self {
        self
    }
}
