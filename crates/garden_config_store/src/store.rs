//! Typed key-value file store backed by a single JSON object.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ConfigStoreError;

/// A JSON-file-backed key-value store.
///
/// Used for linked local module/project source paths and cached secrets
/// (`config-store.json` under the project's `.garden` directory). Every
/// mutation reads the whole file, applies the change, and writes it back
/// under a new name followed by a rename, so readers never observe a
/// partially-written file.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Opens (without yet reading) the store file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads a single key, deserialized as `T`. Returns `Ok(None)` if the
    /// key is absent or the store file does not exist yet.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigStoreError> {
        let map = self.load()?;
        let Some(value) = map.get(key) else {
            return Ok(None);
        };
        serde_json::from_value(value.clone()).map(Some).map_err(|source| ConfigStoreError::TypeMismatch {
            key: key.to_string(),
            source,
        })
    }

    /// Sets `key` to `value`, creating the store file if it does not exist.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigStoreError> {
        let mut map = self.load()?;
        let encoded = serde_json::to_value(value).map_err(|source| ConfigStoreError::TypeMismatch {
            key: key.to_string(),
            source,
        })?;
        map.insert(key.to_string(), encoded);
        self.persist(&map)
    }

    /// Removes `key` if present. No-op if the key or the store file does
    /// not exist.
    pub fn delete(&self, key: &str) -> Result<(), ConfigStoreError> {
        let mut map = self.load()?;
        if map.remove(key).is_some() {
            self.persist(&map)?;
        }
        Ok(())
    }

    /// Returns every key currently stored.
    pub fn keys(&self) -> Result<Vec<String>, ConfigStoreError> {
        Ok(self.load()?.keys().cloned().collect())
    }

    fn load(&self) -> Result<BTreeMap<String, Value>, ConfigStoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| ConfigStoreError::Corrupt {
                    path: self.path.clone(),
                    source,
                })
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(source) => Err(ConfigStoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn persist(&self, map: &BTreeMap<String, Value>) -> Result<(), ConfigStoreError> {
        write_atomic(&self.path, map)
    }
}

fn write_atomic(path: &Path, map: &BTreeMap<String, Value>) -> Result<(), ConfigStoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigStoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(map).expect("BTreeMap<String, Value> always serializes");
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, json.as_bytes()).map_err(|source| ConfigStoreError::Write {
        path: temp_path.clone(),
        source,
    })?;
    fs::rename(&temp_path, path).map_err(|source| ConfigStoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}
