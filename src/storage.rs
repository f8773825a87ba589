//! Local key-value settings cache.
//!
//! A single JSON object on disk, one entry per storage key. Values are
//! rewritten in full on every `set`.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::Result;

pub struct KeyValueStore {
    path: Option<PathBuf>,
    entries: Mutex<Map<String, Value>>,
}

impl KeyValueStore {
    /// Open (or lazily create) the store at `path`. A missing or corrupt
    /// file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = read_entries(&path);
        debug!("Opened settings store {} ({} keys)", path.display(), entries.len());
        Self {
            path: Some(path),
            entries: Mutex::new(entries),
        }
    }

    /// A store that never touches disk.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Map::new()),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries.lock().get(key).cloned()?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Ignoring malformed value for '{key}': {e}");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value);
        self.flush(&entries)
    }

    fn flush(&self, entries: &Map<String, Value>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

fn read_entries(path: &Path) -> Map<String, Value> {
    let Ok(contents) = fs::read_to_string(path) else {
        return Map::new();
    };
    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            warn!("Settings store {} is not a JSON object, starting empty", path.display());
            Map::new()
        }
    }
}
