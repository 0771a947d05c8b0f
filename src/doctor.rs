use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::app::{App, AppError};
use crate::cleanup;
use crate::domain::post::Post;
use crate::domain::project::Project;
use crate::domain::task::Task;
use crate::quota::{self, HealthLevel};
use crate::store::{self, CollectionKey};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DoctorStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DoctorCheck {
    pub name: String,
    pub status: DoctorStatus,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DoctorReport {
    pub checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    pub fn failure_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|check| check.status == DoctorStatus::Fail)
            .count()
    }
}

pub fn run_doctor(app: &App) -> Result<DoctorReport, AppError> {
    let checks = vec![
        check_usage(app)?,
        check_collections(app),
        check_orphans(app)?,
        check_reclaimable(app)?,
    ];
    Ok(DoctorReport { checks })
}

fn check_usage(app: &App) -> Result<DoctorCheck, AppError> {
    let usage = app.usage()?;
    let status = match usage.level() {
        HealthLevel::Healthy => DoctorStatus::Pass,
        HealthLevel::Warning => DoctorStatus::Warn,
        HealthLevel::Critical => DoctorStatus::Fail,
    };
    Ok(DoctorCheck {
        name: "storage_usage".to_string(),
        status,
        detail: format!(
            "{} of {} bytes used ({})",
            usage.used_bytes,
            usage.capacity_bytes,
            usage.level().as_str()
        ),
    })
}

fn check_collections(app: &App) -> DoctorCheck {
    let mut broken = Vec::new();
    if store::load_collection::<Project>(app.storage(), CollectionKey::Projects).is_err() {
        broken.push(CollectionKey::Projects.as_str());
    }
    if store::load_collection::<Task>(app.storage(), CollectionKey::Tasks).is_err() {
        broken.push(CollectionKey::Tasks.as_str());
    }
    if store::load_collection::<Post>(app.storage(), CollectionKey::Posts).is_err() {
        broken.push(CollectionKey::Posts.as_str());
    }

    if broken.is_empty() {
        DoctorCheck {
            name: "collections".to_string(),
            status: DoctorStatus::Pass,
            detail: "all collections deserialize".to_string(),
        }
    } else {
        DoctorCheck {
            name: "collections".to_string(),
            status: DoctorStatus::Fail,
            detail: format!("unreadable collection payloads: {}", broken.join(", ")),
        }
    }
}

fn check_orphans(app: &App) -> Result<DoctorCheck, AppError> {
    let projects: BTreeMap<String, Project> =
        store::load_collection(app.storage(), CollectionKey::Projects).unwrap_or_default();
    let tasks: BTreeMap<String, Task> =
        store::load_collection(app.storage(), CollectionKey::Tasks).unwrap_or_default();
    let known: BTreeSet<&str> = projects.keys().map(String::as_str).collect();

    let orphans: Vec<&str> = tasks
        .values()
        .filter(|task| !known.contains(task.project_id.as_str()))
        .map(|task| task.id.as_str())
        .collect();

    if orphans.is_empty() {
        Ok(DoctorCheck {
            name: "orphaned_tasks".to_string(),
            status: DoctorStatus::Pass,
            detail: "every task resolves to a project".to_string(),
        })
    } else {
        Ok(DoctorCheck {
            name: "orphaned_tasks".to_string(),
            status: DoctorStatus::Warn,
            detail: format!(
                "{} task(s) reference missing projects: {}",
                orphans.len(),
                orphans.join(", ")
            ),
        })
    }
}

fn check_reclaimable(app: &App) -> Result<DoctorCheck, AppError> {
    let mut transient_bytes = 0u64;
    let mut cache_bytes = 0u64;
    for entry in quota::breakdown(app.storage())? {
        if cleanup::is_transient_key(&entry.key) {
            transient_bytes += entry.bytes;
        } else if cleanup::is_cache_key(&entry.key) {
            cache_bytes += entry.bytes;
        }
    }
    Ok(DoctorCheck {
        name: "reclaimable".to_string(),
        status: DoctorStatus::Pass,
        detail: format!(
            "{} transient bytes, {} cache bytes reclaimable by cleanup",
            transient_bytes, cache_bytes
        ),
    })
}
