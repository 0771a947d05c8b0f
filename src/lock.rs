use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::domain::{now_utc_rfc3339, parse_rfc3339};

/// Locks older than this are presumed abandoned by a crashed process
/// and reclaimed.
const STALE_AFTER: time::Duration = time::Duration::minutes(10);

#[derive(Debug)]
pub enum LockError {
    Busy(PathBuf),
    Io(std::io::Error),
}

impl std::fmt::Display for LockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockError::Busy(path) => write!(
                f,
                "store is locked by another process: {}",
                path.display()
            ),
            LockError::Io(err) => write!(f, "lock I/O error: {}", err),
        }
    }
}

impl std::error::Error for LockError {}

impl From<std::io::Error> for LockError {
    fn from(value: std::io::Error) -> Self {
        LockError::Io(value)
    }
}

/// Single-writer guard for the store directory. The lock file records
/// the holder's pid and acquisition time so a stale lock left by a
/// crashed writer can be reclaimed instead of wedging the store.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    _file: File,
}

impl StoreLock {
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        let start = Instant::now();
        loop {
            match try_acquire(path)? {
                Some(guard) => return Ok(guard),
                None if start.elapsed() >= timeout => {
                    return Err(LockError::Busy(path.to_path_buf()));
                }
                None => thread::sleep(Duration::from_millis(10)),
            }
        }
    }

    #[allow(dead_code)]
    pub fn try_acquire(path: &Path) -> Result<Option<Self>, LockError> {
        try_acquire(path)
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn try_acquire(path: &Path) -> Result<Option<StoreLock>, LockError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            let stamp = format!("{} {}\n", std::process::id(), now_utc_rfc3339());
            file.write_all(stamp.as_bytes())?;
            Ok(Some(StoreLock {
                path: path.to_path_buf(),
                _file: file,
            }))
        }
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            if lock_is_stale(path) {
                let _ = std::fs::remove_file(path);
                return try_acquire(path);
            }
            Ok(None)
        }
        Err(err) => Err(LockError::Io(err)),
    }
}

fn lock_is_stale(path: &Path) -> bool {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return false;
    };
    let Some(acquired_at) = contents
        .split_whitespace()
        .nth(1)
        .and_then(parse_rfc3339)
    else {
        // No parseable stamp at all: treat as abandoned debris.
        return true;
    };
    let Some(now) = parse_rfc3339(&now_utc_rfc3339()) else {
        return false;
    };
    now - acquired_at > STALE_AFTER
}
