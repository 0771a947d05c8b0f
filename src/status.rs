use crate::domain::project::ProjectStatus;
use crate::domain::task::{Task, TaskStatus};

/// Derive a project's status from its tasks and resource existence.
///
/// Rules, in priority order:
/// - `archived` is sticky and never auto-overridden
/// - no tasks: `planning` when resources exist, else `not_started`
/// - all tasks completed (and at least one): `completed`
/// - any task in progress or completed: `active`
/// - all tasks still todo: `planning`
///
/// Pure and idempotent; callers pass the full current sibling list, not
/// an incrementally patched one.
pub fn compute_status(
    tasks: &[Task],
    has_resources: bool,
    current: ProjectStatus,
) -> ProjectStatus {
    if current.is_sticky() {
        return current;
    }

    if tasks.is_empty() {
        return if has_resources {
            ProjectStatus::Planning
        } else {
            ProjectStatus::NotStarted
        };
    }

    let total = tasks.len();
    let completed = tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Completed)
        .count();
    let in_progress = tasks
        .iter()
        .filter(|task| task.status == TaskStatus::InProgress)
        .count();

    if completed == total {
        ProjectStatus::Completed
    } else if in_progress > 0 || completed > 0 {
        ProjectStatus::Active
    } else {
        ProjectStatus::Planning
    }
}
