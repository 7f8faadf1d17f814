// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

/// Errors raised by key-value store backends
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Failed to encode value for {key}: {reason}")]
    Encoding { key: String, reason: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Trait for durable key-value backends
///
/// Keys are `/`-separated relative paths such as `training/cat/training_000.jpg`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key does not exist
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write a value, replacing any previous one
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Delete a value, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Delete every key under a prefix, returning the number of removed keys
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, StoreError>;

    /// List keys under a prefix
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// Read and decode a JSON value
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Encoding {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// Encode and write a JSON value
pub async fn put_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Encoding {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.put(key, &bytes).await
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.trim_matches('/').is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part == "..")
    {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// File-based store: each key is a file below `base_path`
pub struct FileKeyValueStore {
    base_path: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.base_path.join(key.trim_end_matches('/')))
    }

    async fn collect_files(&self, dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
        let mut files = Vec::new();
        let mut pending = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if path.extension().and_then(|s| s.to_str()) != Some("tmp") {
                    files.push(path);
                }
            }
        }

        Ok(files)
    }

    fn relative_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_path).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.key_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let path = self.key_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write atomically using a temp file
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(value).await?;
        file.sync_all().await?;

        fs::rename(temp_path, path).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        let path = self.key_path(prefix)?;
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            let removed = self.collect_files(&path).await?.len();
            fs::remove_dir_all(&path).await?;
            Ok(removed)
        } else {
            fs::remove_file(&path).await?;
            Ok(1)
        }
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let root = if prefix.is_empty() {
            self.base_path.clone()
        } else {
            self.key_path(prefix)?
        };

        let mut keys: Vec<String> = self
            .collect_files(&root)
            .await?
            .iter()
            .filter_map(|path| self.relative_key(path))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// In-memory store, used by tests and ephemeral deployments
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        validate_key(key)?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        validate_key(key)?;
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        validate_key(key)?;
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        validate_key(prefix)?;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before - entries.len())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}
