use std::error::Error;
use std::fmt;
use std::time::Duration;

use rusqlite::{params, Connection, DatabaseName, OptionalExtension};

/// Synchronous string-keyed, string-valued persistent map. The true
/// platform capacity is not queryable; `set` fails with
/// `StorageError::QuotaExceeded` when the backing store refuses the
/// write.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<bool, StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

#[derive(Debug)]
pub enum StorageError {
    QuotaExceeded { attempted_bytes: u64, limit_bytes: u64 },
    Db(rusqlite::Error),
    Io(std::io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::QuotaExceeded {
                attempted_bytes,
                limit_bytes,
            } => write!(
                f,
                "storage quota exceeded: write would use {} of {} bytes",
                attempted_bytes, limit_bytes
            ),
            StorageError::Db(err) => write!(f, "database error: {}", err),
            StorageError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StorageError::QuotaExceeded { .. } => None,
            StorageError::Db(err) => Some(err),
            StorageError::Io(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        StorageError::Db(value)
    }
}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl StorageError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }
}

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 1] = [Migration {
    version: 1,
    name: "baseline_kv_schema_v1",
    sql: r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#,
}];

/// SQLite-backed substrate. The hard byte cap stands in for the
/// platform limit a browser-style store enforces but will not report.
pub struct SqliteStorage {
    conn: Connection,
    hard_limit_bytes: u64,
}

impl SqliteStorage {
    pub fn open(path: &str, hard_limit_bytes: u64) -> Result<Self, StorageError> {
        let mut conn = Connection::open(path)?;
        configure_for_speed(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn,
            hard_limit_bytes,
        })
    }

    fn used_bytes_excluding(&self, key: &str) -> Result<u64, StorageError> {
        let used: i64 = self.conn.query_row(
            r#"
SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
FROM kv
WHERE key != ?1
"#,
            params![key],
            |row| row.get(0),
        )?;
        Ok(used.max(0) as u64)
    }
}

impl Storage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let attempted =
            self.used_bytes_excluding(key)? + key.len() as u64 + value.len() as u64;
        if attempted > self.hard_limit_bytes {
            return Err(StorageError::QuotaExceeded {
                attempted_bytes: attempted,
                limit_bytes: self.hard_limit_bytes,
            });
        }
        self.conn.execute(
            r#"
INSERT INTO kv (key, value)
VALUES (?1, ?2)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let removed = self
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let mut rows = stmt.query([])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(row.get(0)?);
        }
        Ok(result)
    }
}

fn configure_for_speed(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "temp_store", "MEMORY")?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> Result<(), rusqlite::Error> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#,
    )?;

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![
                migration.version,
                migration.name,
                crate::domain::now_utc_rfc3339()
            ],
        )?;
    }

    tx.commit()
}

/// In-memory substrate with an optional byte cap, for tests that feed
/// the quota policy synthetic usage.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: std::cell::RefCell<std::collections::BTreeMap<String, String>>,
    hard_limit_bytes: Option<u64>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(hard_limit_bytes: u64) -> Self {
        Self {
            hard_limit_bytes: Some(hard_limit_bytes),
            ..Self::default()
        }
    }

    fn used_bytes_excluding(&self, key: &str) -> u64 {
        self.entries
            .borrow()
            .iter()
            .filter(|(existing, _)| existing.as_str() != key)
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum()
    }
}

#[cfg(test)]
impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(limit) = self.hard_limit_bytes {
            let attempted =
                self.used_bytes_excluding(key) + key.len() as u64 + value.len() as u64;
            if attempted > limit {
                return Err(StorageError::QuotaExceeded {
                    attempted_bytes: attempted,
                    limit_bytes: limit,
                });
            }
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.borrow_mut().remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries.borrow().keys().cloned().collect())
    }
}
