use serde::Serialize;

use crate::storage::{Storage, StorageError};
use crate::store::NAMESPACE_PREFIX;

/// Policy constants, not measurements.
pub const WARNING_RATIO: f64 = 0.75;
pub const CRITICAL_RATIO: f64 = 0.90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    Healthy,
    Warning,
    Critical,
}

impl HealthLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthLevel::Healthy => "healthy",
            HealthLevel::Warning => "warning",
            HealthLevel::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct UsageReport {
    pub used_bytes: u64,
    pub capacity_bytes: u64,
}

impl UsageReport {
    pub fn ratio(&self) -> f64 {
        if self.capacity_bytes == 0 {
            return 1.0;
        }
        self.used_bytes as f64 / self.capacity_bytes as f64
    }

    pub fn level(&self) -> HealthLevel {
        let ratio = self.ratio();
        if ratio >= CRITICAL_RATIO {
            HealthLevel::Critical
        } else if ratio >= WARNING_RATIO {
            HealthLevel::Warning
        } else {
            HealthLevel::Healthy
        }
    }

    pub fn can_write(&self) -> bool {
        self.level() != HealthLevel::Critical
    }
}

/// Sum key + value bytes over every key in this application's
/// namespace. Usage can grow from any collection, so callers re-measure
/// on every write instead of caching.
pub fn measure(storage: &dyn Storage, capacity_bytes: u64) -> Result<UsageReport, StorageError> {
    let mut used_bytes = 0u64;
    for key in storage.keys()? {
        if !key.starts_with(NAMESPACE_PREFIX) {
            continue;
        }
        let value_len = storage.get(&key)?.map_or(0, |value| value.len() as u64);
        used_bytes += key.len() as u64 + value_len;
    }
    Ok(UsageReport {
        used_bytes,
        capacity_bytes,
    })
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KeyUsage {
    pub key: String,
    pub bytes: u64,
}

/// Per-key byte breakdown for the status command, largest first.
pub fn breakdown(storage: &dyn Storage) -> Result<Vec<KeyUsage>, StorageError> {
    let mut entries = Vec::new();
    for key in storage.keys()? {
        if !key.starts_with(NAMESPACE_PREFIX) {
            continue;
        }
        let value_len = storage.get(&key)?.map_or(0, |value| value.len() as u64);
        entries.push(KeyUsage {
            bytes: key.len() as u64 + value_len,
            key,
        });
    }
    entries.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.key.cmp(&b.key)));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::{measure, HealthLevel, UsageReport};
    use crate::storage::{MemoryStorage, Storage};

    #[test]
    fn classification_bands_follow_policy_constants() {
        let healthy = UsageReport {
            used_bytes: 74,
            capacity_bytes: 100,
        };
        assert_eq!(healthy.level(), HealthLevel::Healthy);
        assert!(healthy.can_write());

        let warning = UsageReport {
            used_bytes: 75,
            capacity_bytes: 100,
        };
        assert_eq!(warning.level(), HealthLevel::Warning);
        assert!(warning.can_write());

        let critical = UsageReport {
            used_bytes: 90,
            capacity_bytes: 100,
        };
        assert_eq!(critical.level(), HealthLevel::Critical);
        assert!(!critical.can_write());
    }

    #[test]
    fn zero_capacity_reads_as_critical() {
        let report = UsageReport {
            used_bytes: 0,
            capacity_bytes: 0,
        };
        assert_eq!(report.level(), HealthLevel::Critical);
    }

    #[test]
    fn measure_only_counts_namespaced_keys() {
        let storage = MemoryStorage::new();
        storage.set("tack:data:projects", "abcd").expect("set should succeed");
        storage.set("unrelated-app:key", "ignored").expect("set should succeed");
        let report = measure(&storage, 1_000).expect("measure should succeed");
        assert_eq!(report.used_bytes, "tack:data:projects".len() as u64 + 4);
    }
}
