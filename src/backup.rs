use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::now_utc_rfc3339;
use crate::storage::{Storage, StorageError};
use crate::store::{CollectionKey, StoreError, WriteBatch};

pub const BACKUP_SCHEMA_VERSION: &str = "1";

/// One-document dump of the entity graph. Collection payloads are the
/// raw stored strings; nothing is re-validated entity by entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupDocument {
    pub version: String,
    #[serde(default, rename = "exportDate")]
    pub export_date: String,
    pub collections: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Debug)]
pub enum BackupError {
    Corrupt(String),
    Storage(StorageError),
    Store(StoreError),
    Json(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupError::Corrupt(message) => write!(f, "corrupt backup document: {}", message),
            BackupError::Storage(err) => write!(f, "storage error: {}", err),
            BackupError::Store(err) => write!(f, "{}", err),
            BackupError::Json(err) => write!(f, "JSON error: {}", err),
            BackupError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl Error for BackupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BackupError::Corrupt(_) => None,
            BackupError::Storage(err) => Some(err),
            BackupError::Store(err) => Some(err),
            BackupError::Json(err) => Some(err),
            BackupError::Io(err) => Some(err),
        }
    }
}

impl From<StorageError> for BackupError {
    fn from(value: StorageError) -> Self {
        BackupError::Storage(value)
    }
}

impl From<StoreError> for BackupError {
    fn from(value: StoreError) -> Self {
        BackupError::Store(value)
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(value: serde_json::Error) -> Self {
        BackupError::Json(value)
    }
}

impl From<std::io::Error> for BackupError {
    fn from(value: std::io::Error) -> Self {
        BackupError::Io(value)
    }
}

/// Serialize every stored collection into one document.
pub fn export(storage: &dyn Storage) -> Result<BackupDocument, BackupError> {
    let mut collections = BTreeMap::new();
    for key in CollectionKey::ALL {
        if let Some(raw) = storage.get(&key.storage_key())? {
            collections.insert(key.as_str().to_string(), raw);
        }
    }
    Ok(BackupDocument {
        version: BACKUP_SCHEMA_VERSION.to_string(),
        export_date: now_utc_rfc3339(),
        collections,
    })
}

/// Parse and validate a backup document. Validation completes before
/// anything is applied; a document missing `version` or `collections`
/// is rejected outright.
pub fn parse_document(raw: &str) -> Result<BackupDocument, BackupError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|err| BackupError::Corrupt(err.to_string()))?;
    let Some(object) = value.as_object() else {
        return Err(BackupError::Corrupt(
            "top level must be a JSON object".to_string(),
        ));
    };
    if !object.contains_key("version") {
        return Err(BackupError::Corrupt("missing 'version' key".to_string()));
    }
    if !object.get("collections").is_some_and(Value::is_object) {
        return Err(BackupError::Corrupt(
            "missing 'collections' object".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(|err| BackupError::Corrupt(err.to_string()))
}

/// Overwrite the named collections from a document. Every payload is
/// checked to be valid JSON first, then all collections move through
/// one write batch, so a failing restore leaves the store as it was.
pub fn import(
    storage: &dyn Storage,
    capacity_bytes: u64,
    document: &BackupDocument,
) -> Result<ImportSummary, BackupError> {
    let mut summary = ImportSummary {
        imported: Vec::new(),
        skipped: Vec::new(),
    };
    let mut batch = WriteBatch::new();

    for (name, payload) in &document.collections {
        let Some(key) = CollectionKey::from_name(name) else {
            summary.skipped.push(name.clone());
            continue;
        };
        serde_json::from_str::<Value>(payload).map_err(|err| {
            BackupError::Corrupt(format!("collection '{}' is not valid JSON: {}", name, err))
        })?;
        batch.put_raw(key.storage_key(), payload.clone());
        summary.imported.push(name.clone());
    }

    if !batch.is_empty() {
        batch.commit(storage, capacity_bytes)?;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::{export, import, parse_document, BackupError};
    use crate::storage::{MemoryStorage, Storage};

    #[test]
    fn export_import_round_trips_collections() {
        let storage = MemoryStorage::new();
        storage
            .set("tack:data:projects", "{\"P-1\":{\"id\":\"P-1\"}}")
            .expect("seed should succeed");
        storage
            .set("tack:data:tasks", "{\"T-1\":{\"id\":\"T-1\"}}")
            .expect("seed should succeed");

        let document = export(&storage).expect("export should succeed");
        assert_eq!(document.version, "1");
        assert_eq!(document.collections.len(), 2);

        let restored = MemoryStorage::new();
        let summary = import(&restored, 1_000_000, &document).expect("import should succeed");
        assert_eq!(summary.imported.len(), 2);
        assert_eq!(
            restored.get("tack:data:projects").expect("get should succeed"),
            storage.get("tack:data:projects").expect("get should succeed")
        );
        assert_eq!(
            restored.get("tack:data:tasks").expect("get should succeed"),
            storage.get("tack:data:tasks").expect("get should succeed")
        );
    }

    #[test]
    fn documents_missing_version_are_rejected() {
        let err = parse_document("{\"collections\":{}}")
            .expect_err("missing version should be rejected");
        assert!(matches!(err, BackupError::Corrupt(_)));
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn documents_missing_collections_are_rejected() {
        let err = parse_document("{\"version\":\"1\",\"export_date\":\"x\"}")
            .expect_err("missing collections should be rejected");
        assert!(matches!(err, BackupError::Corrupt(_)));
        assert!(err.to_string().contains("collections"));
    }

    #[test]
    fn unknown_collections_are_skipped_not_applied() {
        let storage = MemoryStorage::new();
        let document = parse_document(
            "{\"version\":\"1\",\"export_date\":\"2026-01-01T00:00:00Z\",\"collections\":{\"sessions\":\"{}\"}}",
        )
        .expect("document should parse");
        let summary = import(&storage, 1_000_000, &document).expect("import should succeed");
        assert_eq!(summary.skipped, vec!["sessions".to_string()]);
        assert!(summary.imported.is_empty());
        assert!(storage.keys().expect("keys should succeed").is_empty());
    }

    #[test]
    fn invalid_payload_fails_before_any_write() {
        let storage = MemoryStorage::new();
        storage
            .set("tack:data:projects", "{\"P-1\":{}}")
            .expect("seed should succeed");
        let document = parse_document(
            "{\"version\":\"1\",\"export_date\":\"2026-01-01T00:00:00Z\",\"collections\":{\"projects\":\"{broken\"}}",
        )
        .expect("document shape should parse");
        let err = import(&storage, 1_000_000, &document)
            .expect_err("broken payload should fail");
        assert!(matches!(err, BackupError::Corrupt(_)));
        assert_eq!(
            storage.get("tack:data:projects").expect("get should succeed"),
            Some("{\"P-1\":{}}".to_string())
        );
    }
}
