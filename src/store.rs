use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cleanup;
use crate::quota;
use crate::storage::{Storage, StorageError};

/// Every key this application persists carries the namespace prefix so
/// usage accounting can tell its data apart from anything else sharing
/// the substrate.
pub const NAMESPACE_PREFIX: &str = "tack:";
pub const DATA_PREFIX: &str = "tack:data:";
pub const CACHE_PREFIX: &str = "tack:cache:";
pub const TMP_PREFIX: &str = "tack:tmp:";
pub const RESOURCE_PREFIX: &str = "tack:resource:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKey {
    Projects,
    Tasks,
    Posts,
}

impl CollectionKey {
    pub const ALL: [CollectionKey; 3] = [
        CollectionKey::Projects,
        CollectionKey::Tasks,
        CollectionKey::Posts,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CollectionKey::Projects => "projects",
            CollectionKey::Tasks => "tasks",
            CollectionKey::Posts => "posts",
        }
    }

    pub fn storage_key(self) -> String {
        format!("{}{}", DATA_PREFIX, self.as_str())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "projects" => Some(CollectionKey::Projects),
            "tasks" => Some(CollectionKey::Tasks),
            "posts" => Some(CollectionKey::Posts),
            _ => None,
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum StoreError {
    Storage(StorageError),
    Json(serde_json::Error),
    QuotaExceeded {
        used_bytes: u64,
        capacity_bytes: u64,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Storage(err) => write!(f, "storage error: {}", err),
            StoreError::Json(err) => write!(f, "JSON error: {}", err),
            StoreError::QuotaExceeded {
                used_bytes,
                capacity_bytes,
            } => write!(
                f,
                "quota exceeded: {} of {} bytes in use after cleanup; archive, export, or delete data to continue",
                used_bytes, capacity_bytes
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Storage(err) => Some(err),
            StoreError::Json(err) => Some(err),
            StoreError::QuotaExceeded { .. } => None,
        }
    }
}

impl From<StorageError> for StoreError {
    fn from(value: StorageError) -> Self {
        StoreError::Storage(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Json(value)
    }
}

impl StoreError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded { .. })
    }
}

/// Load a collection map. A missing key is an empty collection.
pub fn load_collection<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: CollectionKey,
) -> Result<BTreeMap<String, T>, StoreError> {
    match storage.get(&key.storage_key())? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(BTreeMap::new()),
    }
}

/// Serialize and commit one collection through the quota-aware writer.
pub fn commit_collection<T: Serialize>(
    storage: &dyn Storage,
    capacity_bytes: u64,
    key: CollectionKey,
    map: &BTreeMap<String, T>,
) -> Result<(), StoreError> {
    let payload = serde_json::to_string(map)?;
    commit_value(storage, capacity_bytes, &key.storage_key(), &payload)
}

/// The quota-aware writer. Usage is re-measured up front; a commit
/// attempted under critical health runs auto cleanup first. On a quota
/// failure the ladder is: auto cleanup -> retry -> emergency cleanup ->
/// retry -> surface `QuotaExceeded`. Bounded, synchronous, and never
/// allowed to drop primary data.
pub fn commit_value(
    storage: &dyn Storage,
    capacity_bytes: u64,
    key: &str,
    payload: &str,
) -> Result<(), StoreError> {
    if !quota::measure(storage, capacity_bytes)?.can_write() {
        let summary = cleanup::auto_cleanup(storage)?;
        tracing::info!(
            removed = summary.removed_keys.len(),
            reclaimed_bytes = summary.reclaimed_bytes,
            "usage critical before write; auto cleanup ran"
        );
    }

    match storage.set(key, payload) {
        Ok(()) => return Ok(()),
        Err(err) if err.is_quota_exceeded() => {}
        Err(err) => return Err(err.into()),
    }

    let auto = cleanup::auto_cleanup(storage)?;
    tracing::warn!(
        key,
        reclaimed_bytes = auto.reclaimed_bytes,
        "write rejected by storage quota; retrying after auto cleanup"
    );
    match storage.set(key, payload) {
        Ok(()) => return Ok(()),
        Err(err) if err.is_quota_exceeded() => {}
        Err(err) => return Err(err.into()),
    }

    let emergency = cleanup::emergency_cleanup(storage)?;
    tracing::warn!(
        key,
        reclaimed_bytes = emergency.reclaimed_bytes,
        "retry rejected; retrying after emergency cleanup"
    );
    match storage.set(key, payload) {
        Ok(()) => Ok(()),
        Err(err) if err.is_quota_exceeded() => {
            let usage = quota::measure(storage, capacity_bytes)?;
            Err(StoreError::QuotaExceeded {
                used_bytes: usage.used_bytes,
                capacity_bytes,
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Multi-collection write batch: every payload is serialized before the
/// first write, and a mid-batch failure restores the keys already
/// written from their captured prior values. Used wherever logically
/// related collections must move together (cascade deletes, restore).
#[derive(Debug, Default)]
pub struct WriteBatch {
    ops: Vec<(String, String)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn put_collection<T: Serialize>(
        &mut self,
        key: CollectionKey,
        map: &BTreeMap<String, T>,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(map)?;
        self.ops.push((key.storage_key(), payload));
        Ok(())
    }

    pub fn put_raw(&mut self, storage_key: String, payload: String) {
        self.ops.push((storage_key, payload));
    }

    pub fn commit(
        self,
        storage: &dyn Storage,
        capacity_bytes: u64,
    ) -> Result<(), StoreError> {
        let mut priors: Vec<(String, Option<String>)> = Vec::with_capacity(self.ops.len());
        for (key, _) in &self.ops {
            priors.push((key.clone(), storage.get(key)?));
        }

        for (index, (key, payload)) in self.ops.iter().enumerate() {
            if let Err(err) = commit_value(storage, capacity_bytes, key, payload) {
                restore_priors(storage, &priors[..=index]);
                return Err(err);
            }
        }
        Ok(())
    }
}

fn restore_priors(storage: &dyn Storage, written: &[(String, Option<String>)]) {
    for (key, prior) in written.iter().rev() {
        let restored = match prior {
            Some(value) => storage.set(key, value).is_ok(),
            None => storage.remove(key).is_ok(),
        };
        if !restored {
            tracing::error!(key, "batch rollback could not restore the prior value");
        }
    }
}
