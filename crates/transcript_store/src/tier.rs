use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// One key-value storage tier in the prioritized fallback list.
///
/// Reads walk the tiers in priority order and stop at the first non-empty
/// snapshot; writes target specific tiers chosen by the store.
pub trait StorageTier {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
    /// All keys currently held by this tier, in no particular order.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Makes a session key safe to use as a file name.
#[must_use]
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            ':' | '/' | '\\' | ' ' | '.' => '-',
            _ => c,
        })
        .collect()
}

const SNAPSHOT_EXT: &str = "json";

/// Durable tier: one JSON snapshot file per key under a root directory, with
/// an optional byte budget across all snapshots.
#[derive(Debug)]
pub struct DurableDirStore {
    root: PathBuf,
    quota_bytes: Option<u64>,
}

impl DurableDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|source| StoreError::io("creating store directory", &root, source))?;
        Ok(Self {
            root,
            quota_bytes: None,
        })
    }

    #[must_use]
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{SNAPSHOT_EXT}", sanitize_key(key)))
    }

    /// Bytes held by all snapshots except `excluding`.
    fn used_bytes_excluding(&self, excluding: &Path) -> Result<u64, StoreError> {
        let mut used = 0;
        for key in self.keys()? {
            let path = self.key_path(&key);
            if path == excluding {
                continue;
            }
            let metadata = fs::metadata(&path)
                .map_err(|source| StoreError::io("inspecting snapshot", &path, source))?;
            used += metadata.len();
        }
        Ok(used)
    }
}

impl StorageTier for DurableDirStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.key_path(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::io("reading snapshot", &path, source)),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.key_path(key);
        let needed = value.len() as u64;

        if let Some(quota) = self.quota_bytes {
            let used = self.used_bytes_excluding(&path)?;
            if used + needed > quota {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available: quota.saturating_sub(used),
                });
            }
        }

        fs::write(&path, value).map_err(|source| StoreError::io("writing snapshot", &path, source))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.key_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::io("removing snapshot", &path, source)),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let entries = fs::read_dir(&self.root)
            .map_err(|source| StoreError::io("listing store directory", &self.root, source))?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|source| StoreError::io("listing store directory", &self.root, source))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(SNAPSHOT_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                keys.push(stem.to_string());
            }
        }
        Ok(keys)
    }
}

/// Volatile last-resort tier: an in-memory map that survives identity churn
/// within one process but not a restart.
#[derive(Debug, Default)]
pub struct VolatileStore {
    values: HashMap<String, String>,
}

impl VolatileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageTier for VolatileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.values.keys().cloned().collect())
    }
}
