//! Key-value persistence for dashboard state.
//!
//! The dashboard keeps a handful of JSON documents under string keys, the
//! same way a browser keeps them in local storage. Callers receive the store
//! they should use; nothing in the crate reaches for a global.

mod questionnaire;
mod strategies;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

pub use questionnaire::{
    DEFAULT_RISK_LEVEL, QUESTIONNAIRE_KEY, questionnaire_answers, risk_level,
    save_questionnaire_answers,
};
pub use strategies::{ACTIVATED_STRATEGIES_KEY, activate, activate_at, activated_strategies};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Stored value is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// All keys live in one JSON object on disk. Every read goes back to the
/// file so edits made by another process are picked up.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), keys = entries.len(), "store written");
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value);
        self.save(&entries)
    }
}

#[cfg(test)]
pub(crate) fn scratch_path(label: &str) -> PathBuf {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "roadmap-{label}-{}-{n}.json",
        std::process::id()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_values() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("missing").expect("get"), None);
        store.set("k", "v1".to_string()).expect("set");
        store.set("k", "v2".to_string()).expect("set");
        assert_eq!(store.get("k").expect("get").as_deref(), Some("v2"));
    }

    #[test]
    fn file_store_treats_missing_file_as_empty() {
        let store = JsonFileStore::new(scratch_path("missing"));
        assert_eq!(store.get("anything").expect("get"), None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let path = scratch_path("persist");
        let mut store = JsonFileStore::new(&path);
        store.set("alpha", "[1,2]".to_string()).expect("set");
        store.set("beta", "{}".to_string()).expect("set");

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("alpha").expect("get").as_deref(), Some("[1,2]"));
        assert_eq!(reopened.get("beta").expect("get").as_deref(), Some("{}"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn file_store_reports_corrupt_file() {
        let path = scratch_path("corrupt");
        fs::write(&path, "not json").expect("write");
        let store = JsonFileStore::new(&path);
        let err = store.get("alpha").expect_err("corrupt file must fail");
        assert!(matches!(err, StoreError::Serialization(_)));
        let _ = fs::remove_file(&path);
    }
}
