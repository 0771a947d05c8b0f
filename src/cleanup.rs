use std::collections::BTreeMap;

use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::domain::parse_rfc3339;
use crate::domain::project::{Project, ProjectStatus};
use crate::storage::{Storage, StorageError};
use crate::store::{CACHE_PREFIX, DATA_PREFIX, RESOURCE_PREFIX, TMP_PREFIX};

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CleanupSummary {
    pub removed_keys: Vec<String>,
    pub reclaimed_bytes: u64,
}

/// Transient keys are safe to delete without consulting the data model:
/// one-time probes, stale feature-flag markers, expired demo markers.
pub fn is_transient_key(key: &str) -> bool {
    key.starts_with(TMP_PREFIX)
}

/// Non-essential cached payloads (listing caches, stored perf reports).
/// Rebuildable, so the emergency tier may reclaim them.
pub fn is_cache_key(key: &str) -> bool {
    key.starts_with(CACHE_PREFIX)
}

/// Primary data: entity collections and resource markers. Never deleted
/// by any cleanup tier.
pub fn is_primary_key(key: &str) -> bool {
    key.starts_with(DATA_PREFIX) || key.starts_with(RESOURCE_PREFIX)
}

/// Non-destructive tier: removes transient keys only.
pub fn auto_cleanup(storage: &dyn Storage) -> Result<CleanupSummary, StorageError> {
    remove_matching(storage, is_transient_key)
}

/// Destructive last resort: reclaims non-essential cache payloads.
/// Primary collections are out of bounds; if this is not enough the
/// write fails and the caller surfaces the quota error.
pub fn emergency_cleanup(storage: &dyn Storage) -> Result<CleanupSummary, StorageError> {
    remove_matching(storage, |key| is_cache_key(key) && !is_primary_key(key))
}

fn remove_matching(
    storage: &dyn Storage,
    matches: impl Fn(&str) -> bool,
) -> Result<CleanupSummary, StorageError> {
    let mut summary = CleanupSummary::default();
    for key in storage.keys()? {
        if !matches(&key) {
            continue;
        }
        let value_len = storage.get(&key)?.map_or(0, |value| value.len() as u64);
        if storage.remove(&key)? {
            summary.reclaimed_bytes += key.len() as u64 + value_len;
            summary.removed_keys.push(key);
        }
    }
    Ok(summary)
}

/// Pure selection behind `archive --days`: completed projects whose
/// last update is older than the threshold. Unparseable timestamps are
/// skipped rather than archived.
pub fn select_archivable(
    projects: &BTreeMap<String, Project>,
    age_threshold_days: i64,
    now: OffsetDateTime,
) -> Vec<String> {
    let cutoff = now - Duration::days(age_threshold_days.max(0));
    let mut ids: Vec<String> = projects
        .values()
        .filter(|project| project.status == ProjectStatus::Completed)
        .filter(|project| {
            parse_rfc3339(&project.updated_at)
                .map(|updated| updated < cutoff)
                .unwrap_or(false)
        })
        .map(|project| project.id.clone())
        .collect();
    ids.sort();
    ids
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use time::format_description::well_known::Rfc3339;
    use time::OffsetDateTime;

    use super::{
        auto_cleanup, emergency_cleanup, is_primary_key, is_transient_key, select_archivable,
    };
    use crate::domain::project::{NewProject, Project, ProjectStatus};
    use crate::storage::{MemoryStorage, Storage};

    fn project(id: &str, status: ProjectStatus, updated_at: &str) -> Project {
        let mut project = Project::create(
            id.to_string(),
            NewProject {
                owner: "u-1".to_string(),
                title: id.to_string(),
                ..NewProject::default()
            },
        );
        project.status = status;
        project.updated_at = updated_at.to_string();
        project
    }

    #[test]
    fn auto_cleanup_removes_only_transient_keys() {
        let storage = MemoryStorage::new();
        storage.set("tack:tmp:probe", "1").expect("set should succeed");
        storage.set("tack:tmp:flag:beta", "on").expect("set should succeed");
        storage.set("tack:cache:perf", "{}").expect("set should succeed");
        storage.set("tack:data:projects", "{}").expect("set should succeed");

        let summary = auto_cleanup(&storage).expect("cleanup should succeed");
        assert_eq!(summary.removed_keys.len(), 2);
        assert!(summary.reclaimed_bytes > 0);
        assert!(storage.get("tack:cache:perf").expect("get should succeed").is_some());
        assert!(storage.get("tack:data:projects").expect("get should succeed").is_some());
    }

    #[test]
    fn emergency_cleanup_never_touches_primary_data() {
        let storage = MemoryStorage::new();
        storage.set("tack:cache:perf", "{}").expect("set should succeed");
        storage.set("tack:cache:listing", "[]").expect("set should succeed");
        storage.set("tack:data:projects", "{}").expect("set should succeed");
        storage.set("tack:resource:P-1:ab12", "logo.png").expect("set should succeed");

        let summary = emergency_cleanup(&storage).expect("cleanup should succeed");
        assert_eq!(summary.removed_keys.len(), 2);
        assert!(storage.get("tack:data:projects").expect("get should succeed").is_some());
        assert!(storage
            .get("tack:resource:P-1:ab12")
            .expect("get should succeed")
            .is_some());
    }

    #[test]
    fn key_classes_do_not_overlap() {
        assert!(is_transient_key("tack:tmp:probe"));
        assert!(!is_transient_key("tack:data:projects"));
        assert!(is_primary_key("tack:data:tasks"));
        assert!(is_primary_key("tack:resource:P-1:ab12"));
        assert!(!is_primary_key("tack:cache:perf"));
    }

    #[test]
    fn archivable_selection_is_age_and_status_gated() {
        let now =
            OffsetDateTime::parse("2026-03-01T12:00:00Z", &Rfc3339).expect("now should parse");
        let mut projects = BTreeMap::new();
        projects.insert(
            "P-old-done".to_string(),
            project("P-old-done", ProjectStatus::Completed, "2025-11-01T00:00:00Z"),
        );
        projects.insert(
            "P-fresh-done".to_string(),
            project("P-fresh-done", ProjectStatus::Completed, "2026-02-25T00:00:00Z"),
        );
        projects.insert(
            "P-old-active".to_string(),
            project("P-old-active", ProjectStatus::Active, "2025-11-01T00:00:00Z"),
        );

        let ids = select_archivable(&projects, 30, now);
        assert_eq!(ids, vec!["P-old-done".to_string()]);
    }

    #[test]
    fn unparseable_timestamps_are_never_archived() {
        let now =
            OffsetDateTime::parse("2026-03-01T12:00:00Z", &Rfc3339).expect("now should parse");
        let mut projects = BTreeMap::new();
        projects.insert(
            "P-bad".to_string(),
            project("P-bad", ProjectStatus::Completed, "not-a-date"),
        );
        assert!(select_archivable(&projects, 30, now).is_empty());
    }
}
