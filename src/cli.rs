use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, CommandFactory, Parser, Subcommand};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

pub fn styled_command() -> clap::Command {
    Cli::command()
}

#[derive(Debug, Parser)]
#[command(name = "tack")]
#[command(bin_name = "tack")]
#[command(version)]
#[command(about = "A local-first, quota-aware workspace store")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'C',
        long,
        env = "TACK_STORE_ROOT",
        default_value = ".",
        help = "Directory that contains (or will contain) .tack/."
    )]
    pub store_root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Initialize the local store and default config.")]
    Init,
    #[command(about = "Remove the local store and everything in it.")]
    Uninit,
    #[command(subcommand, about = "Manage projects.")]
    Project(ProjectCommands),
    #[command(subcommand, about = "Manage tasks.")]
    Task(TaskCommands),
    #[command(subcommand, about = "Manage posts and comments.")]
    Post(PostCommands),
    #[command(subcommand, about = "Manage project resource markers.")]
    Resource(ResourceCommands),
    #[command(about = "Show storage usage and health.")]
    Status,
    #[command(about = "Run store health diagnostics.")]
    Doctor,
    #[command(about = "Remove transient keys (or cache keys with --emergency).")]
    Cleanup(CleanupArgs),
    #[command(about = "Archive completed projects older than a threshold.")]
    Archive(ArchiveArgs),
    #[command(about = "Export every collection to one JSON document.")]
    Export(ExportArgs),
    #[command(about = "Import a previously exported document.")]
    Import(ImportArgs),
    #[command(about = "Run performance harness checks.")]
    Perf(PerfArgs),
    #[command(about = "Generate or install shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommands {
    #[command(about = "Create a new project.")]
    New(ProjectNewArgs),
    #[command(about = "List projects with filtering.")]
    Ls(ProjectListArgs),
    #[command(about = "Show one project by id.")]
    Show(IdArg),
    #[command(about = "Update project fields.")]
    Update(ProjectUpdateArgs),
    #[command(about = "Delete a project and its tasks.")]
    Delete(IdArg),
    #[command(about = "Archive one project (requires completed tasks unless forced).")]
    Archive(ProjectArchiveArgs),
}

#[derive(Debug, Args)]
pub struct IdArg {
    #[arg(help = "Entity id.")]
    pub id: String,
}

#[derive(Debug, Args)]
pub struct ProjectNewArgs {
    #[arg(help = "Project title.")]
    pub title: String,

    #[arg(short = 'o', long, env = "TACK_OWNER", default_value = "local", help = "Owner id.")]
    pub owner: String,

    #[arg(short = 'd', long = "desc", default_value = "", help = "Description text.")]
    pub desc: String,

    #[arg(long, help = "Free-form notes.")]
    pub notes: Option<String>,

    #[arg(short = 'p', long, help = "Priority (low, medium, high).")]
    pub priority: Option<String>,

    #[arg(short = 't', long = "tag", help = "Tag (repeatable).")]
    pub tags: Vec<String>,

    #[arg(long = "tech", help = "Tech stack entry (repeatable).")]
    pub tech: Vec<String>,

    #[arg(long, help = "Mark the project publicly visible.")]
    pub public: bool,
}

#[derive(Debug, Args)]
pub struct ProjectListArgs {
    #[arg(short = 'a', long, help = "Include archived projects.")]
    pub all: bool,

    #[arg(short = 's', long, help = "Filter by status (aliases accepted).")]
    pub status: Option<String>,

    #[arg(short = 'o', long, help = "Filter by owner id.")]
    pub owner: Option<String>,

    #[arg(short = 't', long, help = "Filter by tag.")]
    pub tag: Option<String>,

    #[arg(short = 'q', long, help = "Substring match on title/description.")]
    pub query: Option<String>,

    #[arg(long, help = "Print JSON instead of the table view.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ProjectUpdateArgs {
    #[arg(help = "Project id.")]
    pub id: String,

    #[arg(long, help = "New title.")]
    pub title: Option<String>,

    #[arg(short = 'd', long = "desc", help = "New description.")]
    pub desc: Option<String>,

    #[arg(long, help = "New notes (empty string clears them).")]
    pub notes: Option<String>,

    #[arg(short = 'p', long, help = "New priority.")]
    pub priority: Option<String>,

    #[arg(short = 't', long = "tag", help = "Replacement tag set (repeatable).")]
    pub tags: Vec<String>,

    #[arg(long = "tech", help = "Replacement tech set (repeatable).")]
    pub tech: Vec<String>,

    #[arg(long, help = "Set the public flag.")]
    pub public: Option<bool>,
}

#[derive(Debug, Args)]
pub struct ProjectArchiveArgs {
    #[arg(help = "Project id.")]
    pub id: String,

    #[arg(short = 'f', long, help = "Archive even with incomplete tasks.")]
    pub force: bool,
}

#[derive(Debug, Subcommand)]
pub enum TaskCommands {
    #[command(about = "Create a new task under a project.")]
    New(TaskNewArgs),
    #[command(about = "List tasks with filtering.")]
    Ls(TaskListArgs),
    #[command(about = "Show one task by id.")]
    Show(IdArg),
    #[command(about = "Update task fields.")]
    Update(TaskUpdateArgs),
    #[command(about = "Delete a task.")]
    Delete(IdArg),
    #[command(about = "Start the work timer (moves the task to in_progress).")]
    Start(IdArg),
    #[command(about = "Stop the work timer, folding elapsed minutes in.")]
    Stop(IdArg),
    #[command(about = "Complete a task (folds any running timer).")]
    Done(IdArg),
}

#[derive(Debug, Args)]
pub struct TaskNewArgs {
    #[arg(help = "Owning project id.")]
    pub project: String,

    #[arg(help = "Task title.")]
    pub title: String,

    #[arg(short = 'o', long, env = "TACK_OWNER", default_value = "local", help = "Owner id.")]
    pub owner: String,

    #[arg(short = 'd', long = "desc", default_value = "", help = "Description text.")]
    pub desc: String,

    #[arg(short = 'p', long, help = "Priority (low, medium, high).")]
    pub priority: Option<String>,

    #[arg(short = 't', long = "tag", help = "Tag (repeatable).")]
    pub tags: Vec<String>,

    #[arg(long, help = "Due date (RFC3339).")]
    pub due: Option<String>,

    #[arg(long = "depends-on", help = "Task dependency id (repeatable).")]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Args)]
pub struct TaskListArgs {
    #[arg(short = 'P', long, help = "Scope to one project id.")]
    pub project: Option<String>,

    #[arg(short = 's', long, help = "Filter by status (aliases accepted).")]
    pub status: Option<String>,

    #[arg(short = 't', long, help = "Filter by tag.")]
    pub tag: Option<String>,

    #[arg(long, help = "Print JSON instead of the table view.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TaskUpdateArgs {
    #[arg(help = "Task id.")]
    pub id: String,

    #[arg(long, help = "New title.")]
    pub title: Option<String>,

    #[arg(short = 'd', long = "desc", help = "New description.")]
    pub desc: Option<String>,

    #[arg(short = 's', long, help = "New status (todo, in_progress, completed).")]
    pub status: Option<String>,

    #[arg(short = 'p', long, help = "New priority.")]
    pub priority: Option<String>,

    #[arg(short = 't', long = "tag", help = "Replacement tag set (repeatable).")]
    pub tags: Vec<String>,

    #[arg(long, help = "New due date (RFC3339).")]
    pub due: Option<String>,

    #[arg(long = "depends-on", help = "Replacement dependency set (repeatable).")]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum PostCommands {
    #[command(about = "Create a new post.")]
    New(PostNewArgs),
    #[command(about = "List posts.")]
    Ls(PostListArgs),
    #[command(about = "Like a post.")]
    Like(PostUserArgs),
    #[command(about = "Remove a like from a post.")]
    Unlike(PostUserArgs),
    #[command(about = "Comment on a post.")]
    Comment(PostCommentArgs),
    #[command(about = "Delete a post.")]
    Delete(IdArg),
}

#[derive(Debug, Args)]
pub struct PostNewArgs {
    #[arg(help = "Post content.")]
    pub content: String,

    #[arg(short = 'o', long, env = "TACK_OWNER", default_value = "local", help = "Owner id.")]
    pub owner: String,
}

#[derive(Debug, Args)]
pub struct PostListArgs {
    #[arg(long, help = "Print JSON instead of the table view.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct PostUserArgs {
    #[arg(help = "Post id.")]
    pub id: String,

    #[arg(short = 'u', long, env = "TACK_OWNER", default_value = "local", help = "Acting user id.")]
    pub user: String,
}

#[derive(Debug, Args)]
pub struct PostCommentArgs {
    #[arg(help = "Post id.")]
    pub id: String,

    #[arg(help = "Comment content.")]
    pub content: String,

    #[arg(short = 'o', long, env = "TACK_OWNER", default_value = "local", help = "Owner id.")]
    pub owner: String,
}

#[derive(Debug, Subcommand)]
pub enum ResourceCommands {
    #[command(about = "Record a resource marker for a project.")]
    Attach(ResourceAttachArgs),
    #[command(about = "Remove a resource marker.")]
    Detach(ResourceDetachArgs),
    #[command(about = "List a project's resource markers.")]
    Ls(IdArg),
}

#[derive(Debug, Args)]
pub struct ResourceAttachArgs {
    #[arg(help = "Project id.")]
    pub project: String,

    #[arg(help = "Resource name (e.g. a file name).")]
    pub name: String,
}

#[derive(Debug, Args)]
pub struct ResourceDetachArgs {
    #[arg(help = "Project id.")]
    pub project: String,

    #[arg(help = "Resource id (short hash from attach/ls).")]
    pub resource: String,
}

#[derive(Debug, Args)]
pub struct CleanupArgs {
    #[arg(long, help = "Also reclaim non-essential cache keys.")]
    pub emergency: bool,
}

#[derive(Debug, Args)]
pub struct ArchiveArgs {
    #[arg(
        long,
        help = "Age threshold in days (defaults to the configured window)."
    )]
    pub days: Option<i64>,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(short = 'O', long = "out", help = "Write to a file instead of stdout.")]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[arg(help = "Path to an exported JSON document.")]
    pub file: PathBuf,

    #[arg(
        short = 'y',
        long = "yes",
        help = "Confirm overwriting the named collections."
    )]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct PerfArgs {
    #[arg(short = 'n', long, default_value_t = 10, help = "Iterations per measurement.")]
    pub iterations: u32,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(help = "Shell name (bash, zsh, fish). Auto-detected if omitted.")]
    pub shell: Option<String>,

    #[arg(
        short = 'i',
        long = "install",
        help = "Write completions to the canonical path for the shell."
    )]
    pub install: bool,
}
