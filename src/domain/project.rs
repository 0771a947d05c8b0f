use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{
    clamp_tag_list, now_utc_rfc3339, truncate_chars, MAX_DESCRIPTION_CHARS, MAX_LIST_ITEMS,
    MAX_NOTES_CHARS,
};

/// Derived project lifecycle. `Active` is the canonical label for the
/// historical `active`/`in-progress` pair; parsing folds the aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    NotStarted,
    Planning,
    Active,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::NotStarted => "not_started",
            ProjectStatus::Planning => "planning",
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }

    /// Archived is sticky: it is never overwritten by the derived-status
    /// pass, only by an explicit unarchive-style update.
    pub fn is_sticky(self) -> bool {
        matches!(self, ProjectStatus::Archived)
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = ParseStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let status = match normalized.as_str() {
            "not_started" => ProjectStatus::NotStarted,
            "planning" => ProjectStatus::Planning,
            "active" | "in_progress" => ProjectStatus::Active,
            "completed" => ProjectStatus::Completed,
            "archived" => ProjectStatus::Archived,
            _ => {
                return Err(ParseStatusError {
                    value: value.to_string(),
                    expected: "project status",
                })
            }
        };
        Ok(status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" | "med" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(ParseStatusError {
                value: value.to_string(),
                expected: "priority",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    pub value: String,
    pub expected: &'static str,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} '{}'", self.expected, self.value)
    }
}

impl Error for ParseStatusError {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Project {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub tech: Vec<String>,
    pub public: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            id: String::new(),
            owner: String::new(),
            title: String::new(),
            description: String::new(),
            notes: None,
            status: ProjectStatus::NotStarted,
            priority: Priority::default(),
            tags: Vec::new(),
            tech: Vec::new(),
            public: false,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}

/// Caller-supplied fields for a new project; everything else is
/// generated or defaulted.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub owner: String,
    pub title: String,
    pub description: String,
    pub notes: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub tech: Vec<String>,
    pub public: bool,
}

impl Project {
    pub fn create(id: String, input: NewProject) -> Self {
        let now = now_utc_rfc3339();
        Self {
            id,
            owner: input.owner.trim().to_string(),
            title: input.title.trim().to_string(),
            description: truncate_chars(input.description.trim(), MAX_DESCRIPTION_CHARS),
            notes: input
                .notes
                .as_deref()
                .map(|raw| truncate_chars(raw.trim(), MAX_NOTES_CHARS)),
            status: ProjectStatus::NotStarted,
            priority: input.priority.unwrap_or_default(),
            tags: clamp_tag_list(&input.tags, MAX_LIST_ITEMS),
            tech: clamp_tag_list(&input.tech, MAX_LIST_ITEMS),
            public: input.public,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = now_utc_rfc3339();
    }
}

/// Partial update; `id`, `owner`, and `created_at` are not patchable.
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub tech: Option<Vec<String>>,
    pub public: Option<bool>,
}

impl ProjectPatch {
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.notes.is_some()
            || self.priority.is_some()
            || self.tags.is_some()
            || self.tech.is_some()
            || self.public.is_some()
    }

    pub fn apply(self, project: &mut Project) {
        if let Some(title) = self.title {
            project.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            project.description = truncate_chars(description.trim(), MAX_DESCRIPTION_CHARS);
        }
        if let Some(notes) = self.notes {
            let trimmed = notes.trim();
            project.notes = if trimmed.is_empty() {
                None
            } else {
                Some(truncate_chars(trimmed, MAX_NOTES_CHARS))
            };
        }
        if let Some(priority) = self.priority {
            project.priority = priority;
        }
        if let Some(tags) = self.tags {
            project.tags = clamp_tag_list(&tags, MAX_LIST_ITEMS);
        }
        if let Some(tech) = self.tech {
            project.tech = clamp_tag_list(&tech, MAX_LIST_ITEMS);
        }
        if let Some(public) = self.public {
            project.public = public;
        }
        project.touch();
    }
}
