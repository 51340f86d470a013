//! Key-value string store remembering the controller address across sessions

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::endpoint::{Endpoint, EndpointError};

/// Key of the last used controller address
pub const BASE_URL_KEY: &str = "base_url";

/// Address used when nothing was stored yet
pub const DEFAULT_ADDRESS: &str = "http://led.local";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("error parsing store: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("error serializing store: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to find default path")]
    InvalidDefaultPath,
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Store kept as a flat TOML table, rewritten on every change
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let values: BTreeMap<String, String> = if path.is_file() {
            toml::from_str(&std::fs::read_to_string(path)?)?
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), keys = values.len(), "opened store");

        Ok(Self {
            path: path.to_owned(),
            values,
        })
    }

    /// Open `store.toml` in the user configuration directory
    pub fn open_default() -> Result<Self, StoreError> {
        let path = dirs::config_dir()
            .map(|mut path| {
                path.push("ledctrl");
                path.push("store.toml");
                path
            })
            .ok_or(StoreError::InvalidDefaultPath)?;

        Self::open(&path)
    }

    fn write(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&self.path, toml::to_string(&self.values)?)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_owned(), value.to_owned());
        self.write()
    }
}

/// Store the canonical form of `endpoint` as the last used address
pub fn remember_endpoint(
    store: &mut impl KeyValueStore,
    endpoint: &Endpoint,
) -> Result<(), StoreError> {
    store.set(BASE_URL_KEY, &endpoint.to_string())
}

/// Resolve the last used address, or the default one
pub fn recall_endpoint(store: &impl KeyValueStore) -> Result<Endpoint, EndpointError> {
    Endpoint::resolve(
        store
            .get(BASE_URL_KEY)
            .as_deref()
            .unwrap_or(DEFAULT_ADDRESS),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recall_defaults_to_led_local() {
        let store = MemoryStore::new();
        assert_eq!(recall_endpoint(&store).unwrap().to_string(), DEFAULT_ADDRESS);
    }

    #[test]
    fn remembers_canonical_form() {
        let mut store = MemoryStore::new();
        let endpoint = Endpoint::resolve(" 192.168.4.1/ ").unwrap();

        remember_endpoint(&mut store, &endpoint).unwrap();

        assert_eq!(
            store.get(BASE_URL_KEY).as_deref(),
            Some("http://192.168.4.1")
        );
        assert_eq!(recall_endpoint(&store).unwrap(), endpoint);
    }

    #[test]
    fn file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.toml");

        {
            let mut store = FileStore::open(&path).unwrap();
            assert_eq!(store.get(BASE_URL_KEY), None);
            store.set(BASE_URL_KEY, "https://led.local:8443").unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(
            recall_endpoint(&store).unwrap().to_string(),
            "https://led.local:8443"
        );
    }

    #[test]
    fn file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.toml");
        std::fs::write(&path, "base_url = [").unwrap();

        assert!(matches!(FileStore::open(&path), Err(StoreError::Parse(_))));
    }
}
