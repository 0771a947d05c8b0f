use std::str::FromStr;

use crate::domain::project::{Project, ProjectStatus};
use crate::domain::task::{Task, TaskStatus};

/// Stored iteration order is whatever the collection map yields, so the
/// listing layer always sorts explicitly: most recently updated first.
pub fn sort_projects(projects: &mut [Project]) {
    projects.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectListFilter {
    pub include_archived: bool,
    pub status: Option<String>,
    pub owner: Option<String>,
    pub tag: Option<String>,
    pub query: Option<String>,
}

pub fn apply_project_filters(projects: Vec<Project>, filter: &ProjectListFilter) -> Vec<Project> {
    // Status names are normalized at the boundary, so `in-progress`
    // filters the same rows as `active`.
    let status = filter
        .status
        .as_deref()
        .and_then(|raw| ProjectStatus::from_str(raw).ok());
    let owner = normalize_scalar(filter.owner.as_deref());
    let tag = normalize_scalar(filter.tag.as_deref());
    let query = normalize_scalar(filter.query.as_deref());

    let mut result: Vec<Project> = projects
        .into_iter()
        .filter(|project| {
            if let Some(expected) = status {
                if project.status != expected {
                    return false;
                }
            } else if project.status == ProjectStatus::Archived && !filter.include_archived {
                return false;
            }
            if let Some(expected) = owner.as_deref() {
                if project.owner.to_ascii_lowercase() != expected {
                    return false;
                }
            }
            if let Some(expected) = tag.as_deref() {
                if !project.tags.iter().any(|tag| tag == expected) {
                    return false;
                }
            }
            if let Some(needle) = query.as_deref() {
                let haystack = format!(
                    "{} {}",
                    project.title.to_ascii_lowercase(),
                    project.description.to_ascii_lowercase()
                );
                if !haystack.contains(needle) {
                    return false;
                }
            }
            true
        })
        .collect();
    sort_projects(&mut result);
    result
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListFilter {
    pub status: Option<String>,
    pub tag: Option<String>,
}

pub fn apply_task_filters(tasks: Vec<Task>, filter: &TaskListFilter) -> Vec<Task> {
    let status = filter
        .status
        .as_deref()
        .and_then(|raw| TaskStatus::from_str(raw).ok());
    let tag = normalize_scalar(filter.tag.as_deref());

    let mut result: Vec<Task> = tasks
        .into_iter()
        .filter(|task| {
            if let Some(expected) = status {
                if task.status != expected {
                    return false;
                }
            }
            if let Some(expected) = tag.as_deref() {
                if !task.tags.iter().any(|tag| tag == expected) {
                    return false;
                }
            }
            true
        })
        .collect();
    sort_tasks(&mut result);
    result
}

fn normalize_scalar(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::{apply_project_filters, apply_task_filters, ProjectListFilter, TaskListFilter};
    use crate::domain::project::{NewProject, Project, ProjectStatus};
    use crate::domain::task::{NewTask, Task, TaskStatus};

    fn project(id: &str, status: ProjectStatus, updated_at: &str) -> Project {
        let mut project = Project::create(
            id.to_string(),
            NewProject {
                owner: "u-1".to_string(),
                title: format!("{id} title"),
                tags: vec!["web".to_string()],
                ..NewProject::default()
            },
        );
        project.status = status;
        project.updated_at = updated_at.to_string();
        project
    }

    fn task(id: &str, status: TaskStatus) -> Task {
        let mut task = Task::create(
            id.to_string(),
            NewTask {
                project_id: "P-1".to_string(),
                owner: "u-1".to_string(),
                title: id.to_string(),
                ..NewTask::default()
            },
        );
        task.status = status;
        task
    }

    #[test]
    fn archived_projects_are_hidden_by_default() {
        let projects = vec![
            project("P-a", ProjectStatus::Active, "2026-01-02T00:00:00Z"),
            project("P-b", ProjectStatus::Archived, "2026-01-03T00:00:00Z"),
        ];
        let visible = apply_project_filters(projects, &ProjectListFilter::default());
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "P-a");
    }

    #[test]
    fn in_progress_filter_matches_active_projects() {
        let projects = vec![
            project("P-a", ProjectStatus::Active, "2026-01-02T00:00:00Z"),
            project("P-b", ProjectStatus::Planning, "2026-01-03T00:00:00Z"),
        ];
        let visible = apply_project_filters(
            projects,
            &ProjectListFilter {
                status: Some("in-progress".to_string()),
                ..ProjectListFilter::default()
            },
        );
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "P-a");
    }

    #[test]
    fn listings_sort_most_recent_first() {
        let projects = vec![
            project("P-old", ProjectStatus::Active, "2026-01-01T00:00:00Z"),
            project("P-new", ProjectStatus::Active, "2026-02-01T00:00:00Z"),
        ];
        let visible = apply_project_filters(projects, &ProjectListFilter::default());
        assert_eq!(visible[0].id, "P-new");
        assert_eq!(visible[1].id, "P-old");
    }

    #[test]
    fn task_status_filter_applies() {
        let tasks = vec![
            task("T-a", TaskStatus::Todo),
            task("T-b", TaskStatus::Completed),
        ];
        let visible = apply_task_filters(
            tasks,
            &TaskListFilter {
                status: Some("done".to_string()),
                ..TaskListFilter::default()
            },
        );
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "T-b");
    }
}
