use std::io::{self, IsTerminal};

use crate::domain::post::Post;
use crate::domain::project::Project;
use crate::domain::task::Task;
use crate::listing::{ProjectListFilter, TaskListFilter};

pub fn print_project_list(projects: &[Project], filter: &ProjectListFilter) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Projects"));
    if let Some(summary) = project_filter_summary(filter) {
        println!("{}", palette.dim(&format!("filters: {summary}")));
    }

    if projects.is_empty() {
        println!("{}", palette.dim("no projects matched"));
        return;
    }

    for project in projects {
        let mut line = format!(
            "{} {} {}",
            palette.id(&project.id),
            palette.status(project.status.as_str()),
            project.title
        );
        if !project.tags.is_empty() {
            line.push(' ');
            line.push_str(&palette.tags(&format!("#{}", project.tags.join(" #"))));
        }
        println!("{line}");
    }
    println!("{}", palette.dim(&format!("{} project(s)", projects.len())));
}

pub fn print_task_list(tasks: &[Task], filter: &TaskListFilter) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Tasks"));
    if let Some(summary) = task_filter_summary(filter) {
        println!("{}", palette.dim(&format!("filters: {summary}")));
    }

    if tasks.is_empty() {
        println!("{}", palette.dim("no tasks matched"));
        return;
    }

    for task in tasks {
        let mut line = format!(
            "{} {} {}",
            palette.id(&task.id),
            palette.status(task.status.as_str()),
            task.title
        );
        if task.time_spent_minutes > 0 {
            line.push(' ');
            line.push_str(&palette.dim(&format!("{}m", task.time_spent_minutes)));
        }
        if task.timer_started_at.is_some() {
            line.push(' ');
            line.push_str(&palette.timer("⏱"));
        }
        println!("{line}");
    }
    println!("{}", palette.dim(&format!("{} task(s)", tasks.len())));
}

pub fn print_post_list(posts: &[Post]) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Posts"));
    if posts.is_empty() {
        println!("{}", palette.dim("no posts yet"));
        return;
    }
    for post in posts {
        let preview: String = post.content.chars().take(60).collect();
        println!(
            "{} {} {}",
            palette.id(&post.id),
            preview,
            palette.dim(&format!(
                "({} like(s), {} comment(s))",
                post.likes.len(),
                post.comments.len()
            ))
        );
    }
}

fn project_filter_summary(filter: &ProjectListFilter) -> Option<String> {
    let mut parts = Vec::new();
    if filter.include_archived {
        parts.push("archived=true".to_string());
    }
    if let Some(status) = filter.status.as_deref().and_then(non_empty) {
        parts.push(format!("status={status}"));
    }
    if let Some(owner) = filter.owner.as_deref().and_then(non_empty) {
        parts.push(format!("owner={owner}"));
    }
    if let Some(tag) = filter.tag.as_deref().and_then(non_empty) {
        parts.push(format!("tag={tag}"));
    }
    if let Some(query) = filter.query.as_deref().and_then(non_empty) {
        parts.push(format!("query={query}"));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn task_filter_summary(filter: &TaskListFilter) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(status) = filter.status.as_deref().and_then(non_empty) {
        parts.push(format!("status={status}"));
    }
    if let Some(tag) = filter.tag.as_deref().and_then(non_empty) {
        parts.push(format!("tag={tag}"));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn non_empty(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    pub fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    pub fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    pub fn status(&self, status: &str) -> String {
        let upper = status.to_ascii_uppercase();
        self.paint(status_color_code(status), &format!("[{upper}]"))
    }

    fn timer(&self, text: &str) -> String {
        self.paint("33", text)
    }

    fn tags(&self, text: &str) -> String {
        self.paint("90", text)
    }
}

fn status_color_code(status: &str) -> &'static str {
    match status.trim().to_ascii_lowercase().as_str() {
        "not_started" | "todo" => "34",
        "planning" => "36",
        "active" | "in_progress" => "33",
        "completed" => "32",
        "archived" => "90",
        _ => "37",
    }
}

#[cfg(test)]
mod tests {
    use super::{project_filter_summary, task_filter_summary};
    use crate::listing::{ProjectListFilter, TaskListFilter};

    #[test]
    fn project_summary_formats_only_active_filters() {
        let filter = ProjectListFilter {
            include_archived: true,
            status: Some("active".to_string()),
            owner: Some("u-1".to_string()),
            tag: Some("web".to_string()),
            query: Some("site".to_string()),
        };
        let summary = project_filter_summary(&filter).expect("summary should exist");
        assert_eq!(
            summary,
            "archived=true status=active owner=u-1 tag=web query=site"
        );
    }

    #[test]
    fn empty_filters_produce_no_summary() {
        assert!(project_filter_summary(&ProjectListFilter::default()).is_none());
        assert!(task_filter_summary(&TaskListFilter::default()).is_none());
    }
}
