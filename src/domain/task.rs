use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::project::{ParseStatusError, Priority};
use super::{
    clamp_id_list, clamp_tag_list, now_utc_rfc3339, parse_rfc3339, truncate_chars,
    MAX_DEPENDENCIES, MAX_DESCRIPTION_CHARS, MAX_LIST_ITEMS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ParseStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" | "doing" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            _ => Err(ParseStatusError {
                value: value.to_string(),
                expected: "task status",
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub owner: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_started_at: Option<String>,
    pub time_spent_minutes: u64,
    pub depends_on: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Default for Task {
    fn default() -> Self {
        Self {
            id: String::new(),
            project_id: String::new(),
            owner: String::new(),
            title: String::new(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: Priority::default(),
            tags: Vec::new(),
            due_date: None,
            timer_started_at: None,
            time_spent_minutes: 0,
            depends_on: Vec::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub project_id: String,
    pub owner: String,
    pub title: String,
    pub description: String,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub due_date: Option<String>,
    pub depends_on: Vec<String>,
}

impl Task {
    pub fn create(id: String, input: NewTask) -> Self {
        let now = now_utc_rfc3339();
        Self {
            id,
            project_id: input.project_id.trim().to_string(),
            owner: input.owner.trim().to_string(),
            title: input.title.trim().to_string(),
            description: truncate_chars(input.description.trim(), MAX_DESCRIPTION_CHARS),
            status: TaskStatus::Todo,
            priority: input.priority.unwrap_or_default(),
            tags: clamp_tag_list(&input.tags, MAX_LIST_ITEMS),
            due_date: input.due_date.and_then(|raw| {
                parse_rfc3339(&raw).map(|_| raw.trim().to_string())
            }),
            timer_started_at: None,
            time_spent_minutes: 0,
            depends_on: clamp_id_list(&input.depends_on, MAX_DEPENDENCIES),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = now_utc_rfc3339();
    }

    /// Start the work timer. A running timer implies `in_progress`, so
    /// the status moves with it.
    pub fn start_timer(&mut self) {
        let now = now_utc_rfc3339();
        self.timer_started_at = Some(now.clone());
        self.status = TaskStatus::InProgress;
        self.updated_at = now;
    }

    /// Stop the timer, folding the elapsed whole minutes into
    /// `time_spent_minutes`. A no-op when no timer is running.
    pub fn stop_timer(&mut self) {
        if let Some(started) = self.timer_started_at.take() {
            self.time_spent_minutes += elapsed_minutes(&started, &now_utc_rfc3339());
            self.touch();
        }
    }

    /// Complete the task. If a timer is still running its elapsed time
    /// is folded in before the timer is cleared.
    pub fn complete(&mut self) {
        self.stop_timer();
        self.status = TaskStatus::Completed;
        self.touch();
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Completed => self.complete(),
            TaskStatus::InProgress => {
                self.status = TaskStatus::InProgress;
                self.touch();
            }
            TaskStatus::Todo => {
                // Leaving in_progress stops any running timer first.
                self.stop_timer();
                self.status = TaskStatus::Todo;
                self.touch();
            }
        }
    }
}

fn elapsed_minutes(started_at: &str, now: &str) -> u64 {
    let (Some(started), Some(now)) = (parse_rfc3339(started_at), parse_rfc3339(now)) else {
        return 0;
    };
    let minutes = (now - started).whole_minutes();
    u64::try_from(minutes).unwrap_or(0)
}

/// Partial update; `id`, `project_id`, `owner`, and `created_at` are not
/// patchable, and timer state only moves through the timer operations.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub due_date: Option<String>,
    pub depends_on: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.status.is_some()
            || self.priority.is_some()
            || self.tags.is_some()
            || self.due_date.is_some()
            || self.depends_on.is_some()
    }

    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            task.description = truncate_chars(description.trim(), MAX_DESCRIPTION_CHARS);
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(tags) = self.tags {
            task.tags = clamp_tag_list(&tags, MAX_LIST_ITEMS);
        }
        if let Some(due_date) = self.due_date {
            task.due_date = parse_rfc3339(&due_date).map(|_| due_date.trim().to_string());
        }
        if let Some(depends_on) = self.depends_on {
            task.depends_on = clamp_id_list(&depends_on, MAX_DEPENDENCIES);
        }
        if let Some(status) = self.status {
            task.set_status(status);
        } else {
            task.touch();
        }
    }
}
