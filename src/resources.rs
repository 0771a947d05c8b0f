use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::storage::{Storage, StorageError};
use crate::store::RESOURCE_PREFIX;

/// The attachment store itself is external; the core only records
/// existence markers so the status rules can ask "does this project
/// have at least one resource."
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResourceMarker {
    pub project_id: String,
    pub resource_id: String,
    pub name: String,
}

fn marker_prefix(project_id: &str) -> String {
    format!("{}{}:", RESOURCE_PREFIX, project_id)
}

fn marker_key(project_id: &str, resource_id: &str) -> String {
    format!("{}{}", marker_prefix(project_id), resource_id)
}

/// Short content-addressed id for a marker, derived from the resource
/// name the way entity short hashes are derived elsewhere.
pub fn resource_id(name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.trim().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..8].to_string()
}

pub fn has_any_resources(storage: &dyn Storage, project_id: &str) -> Result<bool, StorageError> {
    let prefix = marker_prefix(project_id);
    Ok(storage.keys()?.iter().any(|key| key.starts_with(&prefix)))
}

pub fn attach(
    storage: &dyn Storage,
    project_id: &str,
    name: &str,
) -> Result<ResourceMarker, StorageError> {
    let resource_id = resource_id(name);
    storage.set(&marker_key(project_id, &resource_id), name.trim())?;
    Ok(ResourceMarker {
        project_id: project_id.to_string(),
        resource_id,
        name: name.trim().to_string(),
    })
}

pub fn detach(
    storage: &dyn Storage,
    project_id: &str,
    resource_id: &str,
) -> Result<bool, StorageError> {
    storage.remove(&marker_key(project_id, resource_id))
}

pub fn list(storage: &dyn Storage, project_id: &str) -> Result<Vec<ResourceMarker>, StorageError> {
    let prefix = marker_prefix(project_id);
    let mut markers = Vec::new();
    for key in storage.keys()? {
        let Some(resource_id) = key.strip_prefix(&prefix) else {
            continue;
        };
        let name = storage.get(&key)?.unwrap_or_default();
        markers.push(ResourceMarker {
            project_id: project_id.to_string(),
            resource_id: resource_id.to_string(),
            name,
        });
    }
    Ok(markers)
}

/// Remove every marker for a project. Called from the cascade path when
/// the project itself goes away.
pub fn detach_all(storage: &dyn Storage, project_id: &str) -> Result<u64, StorageError> {
    let prefix = marker_prefix(project_id);
    let mut removed = 0u64;
    for key in storage.keys()? {
        if key.starts_with(&prefix) && storage.remove(&key)? {
            removed += 1;
        }
    }
    Ok(removed)
}
