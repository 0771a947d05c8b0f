use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::backup::{self, BackupDocument, BackupError, ImportSummary};
use crate::cleanup::{self, CleanupSummary};
use crate::config::{self, Config, ConfigError};
use crate::domain::post::Post;
use crate::domain::project::{
    NewProject, ParseStatusError, Project, ProjectPatch, ProjectStatus,
};
use crate::domain::task::{NewTask, Task, TaskPatch, TaskStatus};
use crate::domain::{new_entity_id, now_utc_rfc3339};
use crate::lock::{LockError, StoreLock};
use crate::quota::{self, KeyUsage, UsageReport};
use crate::resources::{self, ResourceMarker};
use crate::status::compute_status;
use crate::storage::{SqliteStorage, Storage, StorageError};
use crate::store::{self, CollectionKey, StoreError, WriteBatch, TMP_PREFIX};

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct App {
    storage: SqliteStorage,
    config: Config,
    _lock: StoreLock,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusView {
    pub used_bytes: u64,
    pub capacity_bytes: u64,
    pub ratio: f64,
    pub level: &'static str,
    pub largest: Vec<KeyUsage>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub archived: u64,
    pub ids: Vec<String>,
}

impl App {
    pub fn open(store_root: &Path) -> Result<Self, AppError> {
        let config = config::load(store_root)?;
        let tack_dir = store_root.join(".tack");
        std::fs::create_dir_all(&tack_dir)?;
        let lock = StoreLock::acquire(&tack_dir.join("store.lock"), LOCK_TIMEOUT)?;
        let db_path = tack_dir.join("store.sqlite");
        let storage = SqliteStorage::open(
            db_path.to_str().ok_or_else(|| {
                AppError::InvalidArgument("store path is not valid UTF-8".to_string())
            })?,
            config.hard_limit_bytes,
        )?;

        // One-time availability probe; a leftover probe key from a
        // crashed run is reclaimed by auto cleanup.
        let probe_key = format!("{}probe", TMP_PREFIX);
        match storage.set(&probe_key, "1") {
            Ok(()) => {
                storage.remove(&probe_key)?;
            }
            Err(err) if err.is_quota_exceeded() => {}
            Err(err) => return Err(err.into()),
        }

        Ok(Self {
            storage,
            config,
            _lock: lock,
        })
    }

    pub fn storage(&self) -> &dyn Storage {
        &self.storage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn capacity(&self) -> u64 {
        self.config.capacity_bytes
    }

    // ---- projects -------------------------------------------------

    pub fn create_project(&self, input: NewProject) -> Result<Project, AppError> {
        if input.title.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "project title cannot be empty".to_string(),
            ));
        }
        if input.owner.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "project owner cannot be empty".to_string(),
            ));
        }
        let mut projects: BTreeMap<String, Project> =
            store::load_collection(&self.storage, CollectionKey::Projects)?;
        let project = Project::create(new_entity_id("P"), input);
        projects.insert(project.id.clone(), project.clone());
        store::commit_collection(
            &self.storage,
            self.capacity(),
            CollectionKey::Projects,
            &projects,
        )?;
        Ok(project)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>, AppError> {
        let projects: BTreeMap<String, Project> =
            store::load_collection(&self.storage, CollectionKey::Projects)?;
        Ok(projects.into_values().collect())
    }

    pub fn show_project(&self, id: &str) -> Result<Option<Project>, AppError> {
        let projects: BTreeMap<String, Project> =
            store::load_collection(&self.storage, CollectionKey::Projects)?;
        Ok(projects.get(id).cloned())
    }

    /// Merge a partial update. A missing id is a `None` return, never an
    /// error; identity and ownership fields are not patchable.
    pub fn update_project(
        &self,
        id: &str,
        patch: ProjectPatch,
    ) -> Result<Option<Project>, AppError> {
        if !patch.has_changes() {
            return Err(AppError::InvalidArgument(
                "update requires at least one field change".to_string(),
            ));
        }
        let mut projects: BTreeMap<String, Project> =
            store::load_collection(&self.storage, CollectionKey::Projects)?;
        let Some(project) = projects.get_mut(id) else {
            return Ok(None);
        };
        patch.apply(project);
        let updated = project.clone();
        store::commit_collection(
            &self.storage,
            self.capacity(),
            CollectionKey::Projects,
            &projects,
        )?;
        Ok(Some(updated))
    }

    /// Delete a project and cascade to its tasks. Both collections move
    /// in one write batch so a failure cannot leave orphans behind.
    pub fn delete_project(&self, id: &str) -> Result<bool, AppError> {
        let mut projects: BTreeMap<String, Project> =
            store::load_collection(&self.storage, CollectionKey::Projects)?;
        if projects.remove(id).is_none() {
            return Ok(false);
        }
        let mut tasks: BTreeMap<String, Task> =
            store::load_collection(&self.storage, CollectionKey::Tasks)?;
        tasks.retain(|_, task| task.project_id != id);

        let mut batch = WriteBatch::new();
        batch.put_collection(CollectionKey::Projects, &projects)?;
        batch.put_collection(CollectionKey::Tasks, &tasks)?;
        batch.commit(&self.storage, self.capacity())?;

        resources::detach_all(&self.storage, id)?;
        Ok(true)
    }

    /// Explicit archive. Refuses while tasks are incomplete unless
    /// forced; archived is sticky afterwards.
    pub fn archive_project(&self, id: &str, force: bool) -> Result<Project, AppError> {
        let mut projects: BTreeMap<String, Project> =
            store::load_collection(&self.storage, CollectionKey::Projects)?;
        let Some(project) = projects.get_mut(id) else {
            return Err(AppError::NotFound(id.to_string()));
        };
        if !force {
            let open_tasks = self
                .tasks_of(id)?
                .iter()
                .filter(|task| task.status != TaskStatus::Completed)
                .count();
            if open_tasks > 0 {
                return Err(AppError::InvalidArgument(format!(
                    "project '{}' has {} incomplete task(s); complete them or pass --force",
                    id, open_tasks
                )));
            }
        }
        project.status = ProjectStatus::Archived;
        project.touch();
        let archived = project.clone();
        store::commit_collection(
            &self.storage,
            self.capacity(),
            CollectionKey::Projects,
            &projects,
        )?;
        Ok(archived)
    }

    /// Flip completed projects older than the threshold to archived.
    /// A status mutation, never a deletion.
    pub fn archive_old_projects(
        &self,
        age_threshold_days: i64,
    ) -> Result<ArchiveSummary, AppError> {
        let mut projects: BTreeMap<String, Project> =
            store::load_collection(&self.storage, CollectionKey::Projects)?;
        let now = OffsetDateTime::parse(&now_utc_rfc3339(), &Rfc3339)
            .expect("freshly formatted timestamp should parse");
        let ids = cleanup::select_archivable(&projects, age_threshold_days, now);
        for id in &ids {
            if let Some(project) = projects.get_mut(id) {
                project.status = ProjectStatus::Archived;
                project.touch();
            }
        }
        if !ids.is_empty() {
            store::commit_collection(
                &self.storage,
                self.capacity(),
                CollectionKey::Projects,
                &projects,
            )?;
        }
        Ok(ArchiveSummary {
            archived: ids.len() as u64,
            ids,
        })
    }

    // ---- tasks ----------------------------------------------------

    pub fn create_task(&self, input: NewTask) -> Result<Task, AppError> {
        if input.title.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "task title cannot be empty".to_string(),
            ));
        }
        let project_id = input.project_id.trim().to_string();
        if self.show_project(&project_id)?.is_none() {
            return Err(AppError::NotFound(project_id));
        }
        let mut tasks: BTreeMap<String, Task> =
            store::load_collection(&self.storage, CollectionKey::Tasks)?;
        let task = Task::create(new_entity_id("T"), input);
        tasks.insert(task.id.clone(), task.clone());
        store::commit_collection(&self.storage, self.capacity(), CollectionKey::Tasks, &tasks)?;
        self.sync_project_status(&task.project_id)?;
        Ok(task)
    }

    /// Tasks, optionally scoped to one project. Tasks whose project no
    /// longer resolves are filtered out, not surfaced as errors.
    pub fn list_tasks(&self, project_id: Option<&str>) -> Result<Vec<Task>, AppError> {
        let tasks: BTreeMap<String, Task> =
            store::load_collection(&self.storage, CollectionKey::Tasks)?;
        let projects: BTreeMap<String, Project> =
            store::load_collection(&self.storage, CollectionKey::Projects)?;
        let known: BTreeSet<&str> = projects.keys().map(String::as_str).collect();

        let mut result = Vec::new();
        for task in tasks.into_values() {
            if !known.contains(task.project_id.as_str()) {
                tracing::warn!(
                    task = %task.id,
                    project = %task.project_id,
                    "orphaned task filtered from listing"
                );
                continue;
            }
            if project_id.is_some_and(|id| task.project_id != id) {
                continue;
            }
            result.push(task);
        }
        Ok(result)
    }

    pub fn show_task(&self, id: &str) -> Result<Option<Task>, AppError> {
        let tasks: BTreeMap<String, Task> =
            store::load_collection(&self.storage, CollectionKey::Tasks)?;
        Ok(tasks.get(id).cloned())
    }

    pub fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Option<Task>, AppError> {
        if !patch.has_changes() {
            return Err(AppError::InvalidArgument(
                "update requires at least one field change".to_string(),
            ));
        }
        self.mutate_task(id, |task| {
            patch.apply(task);
        })
    }

    pub fn start_task(&self, id: &str) -> Result<Option<Task>, AppError> {
        self.mutate_task(id, Task::start_timer)
    }

    pub fn stop_task(&self, id: &str) -> Result<Option<Task>, AppError> {
        self.mutate_task(id, Task::stop_timer)
    }

    pub fn complete_task(&self, id: &str) -> Result<Option<Task>, AppError> {
        self.mutate_task(id, Task::complete)
    }

    pub fn delete_task(&self, id: &str) -> Result<bool, AppError> {
        let mut tasks: BTreeMap<String, Task> =
            store::load_collection(&self.storage, CollectionKey::Tasks)?;
        let Some(removed) = tasks.remove(id) else {
            return Ok(false);
        };
        store::commit_collection(&self.storage, self.capacity(), CollectionKey::Tasks, &tasks)?;
        self.sync_project_status(&removed.project_id)?;
        Ok(true)
    }

    fn mutate_task(
        &self,
        id: &str,
        mutate: impl FnOnce(&mut Task),
    ) -> Result<Option<Task>, AppError> {
        let mut tasks: BTreeMap<String, Task> =
            store::load_collection(&self.storage, CollectionKey::Tasks)?;
        let Some(task) = tasks.get_mut(id) else {
            return Ok(None);
        };
        mutate(task);
        let updated = task.clone();
        store::commit_collection(&self.storage, self.capacity(), CollectionKey::Tasks, &tasks)?;
        self.sync_project_status(&updated.project_id)?;
        Ok(Some(updated))
    }

    fn tasks_of(&self, project_id: &str) -> Result<Vec<Task>, AppError> {
        let tasks: BTreeMap<String, Task> =
            store::load_collection(&self.storage, CollectionKey::Tasks)?;
        Ok(tasks
            .into_values()
            .filter(|task| task.project_id == project_id)
            .collect())
    }

    /// Re-derive the owning project's status from the current sibling
    /// list. Only the status field may change, and the timestamp is
    /// refreshed only when the derived value actually differs.
    fn sync_project_status(&self, project_id: &str) -> Result<(), AppError> {
        let mut projects: BTreeMap<String, Project> =
            store::load_collection(&self.storage, CollectionKey::Projects)?;
        let Some(project) = projects.get_mut(project_id) else {
            // The parent is already gone; the task was an orphan.
            tracing::warn!(project = %project_id, "status sync skipped for missing project");
            return Ok(());
        };
        let tasks = self.tasks_of(project_id)?;
        let has_resources = resources::has_any_resources(&self.storage, project_id)?;
        let next = compute_status(&tasks, has_resources, project.status);
        if next == project.status {
            return Ok(());
        }
        tracing::debug!(
            project = %project_id,
            from = project.status.as_str(),
            to = next.as_str(),
            "derived status changed"
        );
        project.status = next;
        project.touch();
        store::commit_collection(
            &self.storage,
            self.capacity(),
            CollectionKey::Projects,
            &projects,
        )?;
        Ok(())
    }

    // ---- posts ----------------------------------------------------

    pub fn create_post(&self, owner: &str, content: &str) -> Result<Post, AppError> {
        if content.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "post content cannot be empty".to_string(),
            ));
        }
        let mut posts: BTreeMap<String, Post> =
            store::load_collection(&self.storage, CollectionKey::Posts)?;
        let post = Post::create(new_entity_id("B"), owner, content);
        posts.insert(post.id.clone(), post.clone());
        store::commit_collection(&self.storage, self.capacity(), CollectionKey::Posts, &posts)?;
        Ok(post)
    }

    pub fn list_posts(&self) -> Result<Vec<Post>, AppError> {
        let posts: BTreeMap<String, Post> =
            store::load_collection(&self.storage, CollectionKey::Posts)?;
        Ok(posts.into_values().collect())
    }

    pub fn like_post(&self, id: &str, user: &str) -> Result<Option<Post>, AppError> {
        self.mutate_post(id, |post| {
            post.like(user);
        })
    }

    pub fn unlike_post(&self, id: &str, user: &str) -> Result<Option<Post>, AppError> {
        self.mutate_post(id, |post| {
            post.unlike(user);
        })
    }

    pub fn comment_post(
        &self,
        id: &str,
        owner: &str,
        content: &str,
    ) -> Result<Option<Post>, AppError> {
        if content.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "comment content cannot be empty".to_string(),
            ));
        }
        let comment_id = new_entity_id("C");
        self.mutate_post(id, move |post| {
            post.add_comment(comment_id, owner, content);
        })
    }

    pub fn delete_post(&self, id: &str) -> Result<bool, AppError> {
        let mut posts: BTreeMap<String, Post> =
            store::load_collection(&self.storage, CollectionKey::Posts)?;
        if posts.remove(id).is_none() {
            return Ok(false);
        }
        store::commit_collection(&self.storage, self.capacity(), CollectionKey::Posts, &posts)?;
        Ok(true)
    }

    fn mutate_post(
        &self,
        id: &str,
        mutate: impl FnOnce(&mut Post),
    ) -> Result<Option<Post>, AppError> {
        let mut posts: BTreeMap<String, Post> =
            store::load_collection(&self.storage, CollectionKey::Posts)?;
        let Some(post) = posts.get_mut(id) else {
            return Ok(None);
        };
        mutate(post);
        let updated = post.clone();
        store::commit_collection(&self.storage, self.capacity(), CollectionKey::Posts, &posts)?;
        Ok(Some(updated))
    }

    // ---- resources ------------------------------------------------

    pub fn attach_resource(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<ResourceMarker, AppError> {
        if self.show_project(project_id)?.is_none() {
            return Err(AppError::NotFound(project_id.to_string()));
        }
        let marker = resources::attach(&self.storage, project_id, name)?;
        self.sync_project_status(project_id)?;
        Ok(marker)
    }

    pub fn detach_resource(
        &self,
        project_id: &str,
        resource_id: &str,
    ) -> Result<bool, AppError> {
        let removed = resources::detach(&self.storage, project_id, resource_id)?;
        if removed {
            self.sync_project_status(project_id)?;
        }
        Ok(removed)
    }

    pub fn list_resources(&self, project_id: &str) -> Result<Vec<ResourceMarker>, AppError> {
        Ok(resources::list(&self.storage, project_id)?)
    }

    // ---- quota, cleanup, backup ----------------------------------

    pub fn usage(&self) -> Result<UsageReport, AppError> {
        Ok(quota::measure(&self.storage, self.capacity())?)
    }

    pub fn status_view(&self) -> Result<StatusView, AppError> {
        let usage = self.usage()?;
        let mut largest = quota::breakdown(&self.storage)?;
        largest.truncate(10);
        Ok(StatusView {
            used_bytes: usage.used_bytes,
            capacity_bytes: usage.capacity_bytes,
            ratio: usage.ratio(),
            level: usage.level().as_str(),
            largest,
        })
    }

    pub fn run_cleanup(&self, emergency: bool) -> Result<CleanupSummary, AppError> {
        let summary = if emergency {
            cleanup::emergency_cleanup(&self.storage)?
        } else {
            cleanup::auto_cleanup(&self.storage)?
        };
        Ok(summary)
    }

    pub fn export(&self) -> Result<BackupDocument, AppError> {
        Ok(backup::export(&self.storage)?)
    }

    pub fn import(&self, document: &BackupDocument) -> Result<ImportSummary, AppError> {
        Ok(backup::import(&self.storage, self.capacity(), document)?)
    }
}

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Storage(StorageError),
    Store(StoreError),
    Backup(BackupError),
    Config(ConfigError),
    Lock(LockError),
    ParseStatus(ParseStatusError),
    InvalidArgument(String),
    NotFound(String),
}

impl AppError {
    /// True when the failure is the quota error the UI should answer
    /// with archive/export/delete guidance.
    pub fn is_quota_exceeded(&self) -> bool {
        match self {
            AppError::Storage(err) => err.is_quota_exceeded(),
            AppError::Store(err) => err.is_quota_exceeded(),
            AppError::Backup(BackupError::Store(err)) => err.is_quota_exceeded(),
            _ => false,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Storage(err) => write!(f, "storage error: {}", err),
            AppError::Store(err) => write!(f, "{}", err),
            AppError::Backup(err) => write!(f, "{}", err),
            AppError::Config(err) => write!(f, "config error: {}", err),
            AppError::Lock(err) => write!(f, "{}", err),
            AppError::ParseStatus(err) => write!(f, "{}", err),
            AppError::InvalidArgument(message) => write!(f, "{}", message),
            AppError::NotFound(id) => write!(f, "'{}' not found in the store", id),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Storage(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Backup(err) => Some(err),
            AppError::Config(err) => Some(err),
            AppError::Lock(err) => Some(err),
            AppError::ParseStatus(err) => Some(err),
            AppError::InvalidArgument(_) => None,
            AppError::NotFound(_) => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<StorageError> for AppError {
    fn from(value: StorageError) -> Self {
        AppError::Storage(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        AppError::Store(value)
    }
}

impl From<BackupError> for AppError {
    fn from(value: BackupError) -> Self {
        AppError::Backup(value)
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<LockError> for AppError {
    fn from(value: LockError) -> Self {
        AppError::Lock(value)
    }
}

impl From<ParseStatusError> for AppError {
    fn from(value: ParseStatusError) -> Self {
        AppError::ParseStatus(value)
    }
}

#[cfg(test)]
mod tests;
