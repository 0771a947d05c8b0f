use std::str::FromStr;

use crate::app::AppError;
use crate::cli::{ProjectUpdateArgs, TaskUpdateArgs};
use crate::domain::project::{Priority, ProjectPatch};
use crate::domain::task::{TaskPatch, TaskStatus};

pub fn parse_priority(raw: Option<&str>) -> Result<Option<Priority>, AppError> {
    raw.map(Priority::from_str)
        .transpose()
        .map_err(AppError::from)
}

pub fn parse_task_status(raw: Option<&str>) -> Result<Option<TaskStatus>, AppError> {
    raw.map(TaskStatus::from_str)
        .transpose()
        .map_err(AppError::from)
}

/// Repeatable CLI list flags replace the stored set only when given.
pub fn replacement_list(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

pub fn project_patch(args: ProjectUpdateArgs) -> Result<ProjectPatch, AppError> {
    Ok(ProjectPatch {
        title: args.title,
        description: args.desc,
        notes: args.notes,
        priority: parse_priority(args.priority.as_deref())?,
        tags: replacement_list(args.tags),
        tech: replacement_list(args.tech),
        public: args.public,
    })
}

pub fn task_patch(args: TaskUpdateArgs) -> Result<TaskPatch, AppError> {
    Ok(TaskPatch {
        title: args.title,
        description: args.desc,
        status: parse_task_status(args.status.as_deref())?,
        priority: parse_priority(args.priority.as_deref())?,
        tags: replacement_list(args.tags),
        due_date: args.due,
        depends_on: replacement_list(args.depends_on),
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_priority, parse_task_status, replacement_list};
    use crate::domain::project::Priority;
    use crate::domain::task::TaskStatus;

    #[test]
    fn priority_parsing_is_optional_and_validated() {
        assert_eq!(parse_priority(None).expect("none should pass"), None);
        assert_eq!(
            parse_priority(Some("high")).expect("high should parse"),
            Some(Priority::High)
        );
        assert!(parse_priority(Some("urgent")).is_err());
    }

    #[test]
    fn task_status_aliases_fold_at_the_cli_boundary() {
        assert_eq!(
            parse_task_status(Some("in-progress")).expect("alias should parse"),
            Some(TaskStatus::InProgress)
        );
    }

    #[test]
    fn empty_repeatable_flags_leave_stored_lists_alone() {
        assert_eq!(replacement_list(Vec::new()), None);
        assert_eq!(
            replacement_list(vec!["web".to_string()]),
            Some(vec!["web".to_string()])
        );
    }
}
