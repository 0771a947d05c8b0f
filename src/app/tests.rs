use std::collections::BTreeMap;
use std::path::PathBuf;

use uuid::Uuid;

use super::{App, AppError};
use crate::config::{self, Config};
use crate::domain::project::{NewProject, Project, ProjectPatch, ProjectStatus};
use crate::domain::task::{NewTask, TaskPatch, TaskStatus};
use crate::quota::HealthLevel;
use crate::store::{self, CollectionKey};

fn unique_workspace() -> PathBuf {
    let root = std::env::temp_dir().join(format!("tack-app-test-{}", Uuid::now_v7()));
    std::fs::create_dir_all(&root).expect("workspace should be creatable");
    root
}

fn open_app(root: &PathBuf) -> App {
    App::open(root).expect("app should open")
}

fn new_project(title: &str) -> NewProject {
    NewProject {
        owner: "u-1".to_string(),
        title: title.to_string(),
        ..NewProject::default()
    }
}

fn new_task(app: &App, project_id: &str, title: &str) -> String {
    app.create_task(NewTask {
        project_id: project_id.to_string(),
        owner: "u-1".to_string(),
        title: title.to_string(),
        ..NewTask::default()
    })
    .expect("task should be created")
    .id
}

#[test]
fn create_then_show_round_trips_the_project() {
    let root = unique_workspace();
    let app = open_app(&root);
    let created = app
        .create_project(NewProject {
            owner: "u-1".to_string(),
            title: "Portfolio site".to_string(),
            description: "d".repeat(2000),
            tags: vec!["Web".to_string(), "rust".to_string()],
            ..NewProject::default()
        })
        .expect("project should be created");

    // Generated fields exist; bounded fields were truncated.
    assert!(created.id.starts_with("P-"));
    assert_eq!(created.description.chars().count(), 500);
    assert_eq!(created.created_at, created.updated_at);

    let shown = app
        .show_project(&created.id)
        .expect("show should succeed")
        .expect("project should exist");
    assert_eq!(shown, created);
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn three_todo_tasks_put_the_project_in_planning() {
    let root = unique_workspace();
    let app = open_app(&root);
    let project = app.create_project(new_project("A")).expect("create should succeed");
    for title in ["one", "two", "three"] {
        new_task(&app, &project.id, title);
    }
    let status = app
        .show_project(&project.id)
        .expect("show should succeed")
        .expect("project should exist")
        .status;
    assert_eq!(status, ProjectStatus::Planning);
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn one_task_in_progress_makes_the_project_active() {
    let root = unique_workspace();
    let app = open_app(&root);
    let project = app.create_project(new_project("B")).expect("create should succeed");
    let first = new_task(&app, &project.id, "one");
    new_task(&app, &project.id, "two");
    new_task(&app, &project.id, "three");

    app.update_task(
        &first,
        TaskPatch {
            status: Some(TaskStatus::InProgress),
            ..TaskPatch::default()
        },
    )
    .expect("update should succeed")
    .expect("task should exist");

    let status = app
        .show_project(&project.id)
        .expect("show should succeed")
        .expect("project should exist")
        .status;
    assert_eq!(status, ProjectStatus::Active);
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn completing_every_task_completes_the_project() {
    let root = unique_workspace();
    let app = open_app(&root);
    let project = app.create_project(new_project("C")).expect("create should succeed");
    let ids: Vec<String> = ["one", "two", "three"]
        .iter()
        .map(|title| new_task(&app, &project.id, title))
        .collect();
    for id in &ids {
        app.complete_task(id)
            .expect("complete should succeed")
            .expect("task should exist");
    }
    let status = app
        .show_project(&project.id)
        .expect("show should succeed")
        .expect("project should exist")
        .status;
    assert_eq!(status, ProjectStatus::Completed);
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn archived_projects_ignore_new_todo_tasks() {
    let root = unique_workspace();
    let app = open_app(&root);
    let project = app.create_project(new_project("D")).expect("create should succeed");
    app.archive_project(&project.id, false)
        .expect("archive should succeed");
    new_task(&app, &project.id, "late arrival");

    let status = app
        .show_project(&project.id)
        .expect("show should succeed")
        .expect("project should exist")
        .status;
    assert_eq!(status, ProjectStatus::Archived);
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn resources_alone_move_an_empty_project_to_planning() {
    let root = unique_workspace();
    let app = open_app(&root);
    let project = app.create_project(new_project("E")).expect("create should succeed");
    assert_eq!(project.status, ProjectStatus::NotStarted);

    let marker = app
        .attach_resource(&project.id, "mockup.png")
        .expect("attach should succeed");
    assert_eq!(
        app.show_project(&project.id)
            .expect("show should succeed")
            .expect("project should exist")
            .status,
        ProjectStatus::Planning
    );

    app.detach_resource(&project.id, &marker.resource_id)
        .expect("detach should succeed");
    assert_eq!(
        app.show_project(&project.id)
            .expect("show should succeed")
            .expect("project should exist")
            .status,
        ProjectStatus::NotStarted
    );
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn deleting_a_project_cascades_to_its_tasks_only() {
    let root = unique_workspace();
    let app = open_app(&root);
    let doomed = app.create_project(new_project("doomed")).expect("create should succeed");
    let kept = app.create_project(new_project("kept")).expect("create should succeed");
    new_task(&app, &doomed.id, "a");
    new_task(&app, &doomed.id, "b");
    let survivor = new_task(&app, &kept.id, "c");

    assert!(app.delete_project(&doomed.id).expect("delete should succeed"));
    assert!(!app.delete_project(&doomed.id).expect("second delete should succeed"));

    let remaining = app.list_tasks(None).expect("list should succeed");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, survivor);
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn update_and_delete_on_missing_ids_are_no_ops() {
    let root = unique_workspace();
    let app = open_app(&root);
    let updated = app
        .update_project(
            "P-missing",
            ProjectPatch {
                title: Some("x".to_string()),
                ..ProjectPatch::default()
            },
        )
        .expect("update should not error");
    assert!(updated.is_none());
    assert!(!app.delete_task("T-missing").expect("delete should not error"));
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn empty_patches_are_rejected() {
    let root = unique_workspace();
    let app = open_app(&root);
    let err = app
        .update_project("P-any", ProjectPatch::default())
        .expect_err("empty patch should be rejected");
    assert!(matches!(err, AppError::InvalidArgument(_)));
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn redundant_status_sync_does_not_touch_updated_at() {
    let root = unique_workspace();
    let app = open_app(&root);
    let project = app.create_project(new_project("steady")).expect("create should succeed");
    let task = new_task(&app, &project.id, "only");
    app.complete_task(&task)
        .expect("complete should succeed")
        .expect("task should exist");

    let stamped = app
        .show_project(&project.id)
        .expect("show should succeed")
        .expect("project should exist")
        .updated_at;

    // Completing again changes no task status, so the derived value is
    // unchanged and the project must not be rewritten.
    app.complete_task(&task)
        .expect("second complete should succeed")
        .expect("task should exist");
    let unchanged = app
        .show_project(&project.id)
        .expect("show should succeed")
        .expect("project should exist")
        .updated_at;
    assert_eq!(stamped, unchanged);
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn archive_refuses_open_tasks_unless_forced() {
    let root = unique_workspace();
    let app = open_app(&root);
    let project = app.create_project(new_project("guarded")).expect("create should succeed");
    new_task(&app, &project.id, "open work");

    let err = app
        .archive_project(&project.id, false)
        .expect_err("archive should refuse open tasks");
    assert!(matches!(err, AppError::InvalidArgument(_)));

    let archived = app
        .archive_project(&project.id, true)
        .expect("forced archive should succeed");
    assert_eq!(archived.status, ProjectStatus::Archived);
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn archive_old_projects_only_touches_stale_completed_ones() {
    let root = unique_workspace();
    let app = open_app(&root);
    let stale = app.create_project(new_project("stale")).expect("create should succeed");
    let fresh = app.create_project(new_project("fresh")).expect("create should succeed");

    // Age the first project by editing the stored collection directly.
    let mut projects: BTreeMap<String, Project> =
        store::load_collection(app.storage(), CollectionKey::Projects)
            .expect("load should succeed");
    for (id, status, updated) in [
        (&stale.id, ProjectStatus::Completed, "2025-01-01T00:00:00Z"),
        (&fresh.id, ProjectStatus::Completed, ""),
    ] {
        let project = projects.get_mut(id).expect("project should exist");
        project.status = status;
        if !updated.is_empty() {
            project.updated_at = updated.to_string();
        }
    }
    store::commit_collection(
        app.storage(),
        app.config().capacity_bytes,
        CollectionKey::Projects,
        &projects,
    )
    .expect("commit should succeed");

    let summary = app
        .archive_old_projects(30)
        .expect("archive pass should succeed");
    assert_eq!(summary.archived, 1);
    assert_eq!(summary.ids, vec![stale.id.clone()]);
    assert_eq!(
        app.show_project(&fresh.id)
            .expect("show should succeed")
            .expect("project should exist")
            .status,
        ProjectStatus::Completed
    );
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn export_import_reproduces_every_collection() {
    let source_root = unique_workspace();
    let target_root = unique_workspace();
    {
        let app = open_app(&source_root);
        let project = app.create_project(new_project("exported")).expect("create should succeed");
        new_task(&app, &project.id, "carry me");
        app.create_post("u-1", "hello world").expect("post should be created");

        let document = app.export().expect("export should succeed");

        let target = open_app(&target_root);
        let summary = target.import(&document).expect("import should succeed");
        assert_eq!(summary.imported.len(), 3);

        let source_projects = app.list_projects().expect("list should succeed");
        let target_projects = target.list_projects().expect("list should succeed");
        assert_eq!(source_projects, target_projects);
        assert_eq!(
            app.list_tasks(None).expect("list should succeed"),
            target.list_tasks(None).expect("list should succeed")
        );
        assert_eq!(
            app.list_posts().expect("list should succeed"),
            target.list_posts().expect("list should succeed")
        );
    }
    let _ = std::fs::remove_dir_all(source_root);
    let _ = std::fs::remove_dir_all(target_root);
}

#[test]
fn quota_exhaustion_surfaces_a_distinct_error_and_loses_nothing() {
    let root = unique_workspace();
    config::save(
        &root,
        &Config {
            capacity_bytes: 400,
            hard_limit_bytes: 500,
            archive_after_days: 90,
        },
    )
    .expect("config should save");
    let app = open_app(&root);
    let project = app.create_project(new_project("tiny")).expect("create should succeed");

    let err = app
        .create_post("u-1", &"x".repeat(900))
        .expect_err("oversized post should fail");
    assert!(err.is_quota_exceeded());

    // The failed write dropped nothing that was already stored.
    assert!(app
        .show_project(&project.id)
        .expect("show should succeed")
        .is_some());
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn usage_reports_track_written_bytes() {
    let root = unique_workspace();
    let app = open_app(&root);
    let before = app.usage().expect("usage should succeed");
    assert_eq!(before.level(), HealthLevel::Healthy);
    app.create_post("u-1", &"p".repeat(500)).expect("post should be created");
    let after = app.usage().expect("usage should succeed");
    assert!(after.used_bytes > before.used_bytes);
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn task_creation_requires_an_existing_project() {
    let root = unique_workspace();
    let app = open_app(&root);
    let err = app
        .create_task(NewTask {
            project_id: "P-ghost".to_string(),
            owner: "u-1".to_string(),
            title: "floating".to_string(),
            ..NewTask::default()
        })
        .expect_err("task for a missing project should fail");
    assert!(matches!(err, AppError::NotFound(_)));
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn orphaned_tasks_are_filtered_from_listings() {
    let root = unique_workspace();
    let app = open_app(&root);
    let project = app.create_project(new_project("parent")).expect("create should succeed");
    new_task(&app, &project.id, "child");

    // Simulate the legacy two-pass cascade failure: remove the project
    // while leaving its task behind.
    let mut projects: BTreeMap<String, Project> =
        store::load_collection(app.storage(), CollectionKey::Projects)
            .expect("load should succeed");
    projects.remove(&project.id);
    store::commit_collection(
        app.storage(),
        app.config().capacity_bytes,
        CollectionKey::Projects,
        &projects,
    )
    .expect("commit should succeed");

    assert!(app.list_tasks(None).expect("list should succeed").is_empty());
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn timers_fold_into_time_spent_on_completion() {
    let root = unique_workspace();
    let app = open_app(&root);
    let project = app.create_project(new_project("timed")).expect("create should succeed");
    let task_id = new_task(&app, &project.id, "clocked");

    app.start_task(&task_id)
        .expect("start should succeed")
        .expect("task should exist");

    // Backdate the running timer so elapsed minutes are non-zero.
    let mut tasks: BTreeMap<String, crate::domain::task::Task> =
        store::load_collection(app.storage(), CollectionKey::Tasks).expect("load should succeed");
    tasks
        .get_mut(&task_id)
        .expect("task should exist")
        .timer_started_at = Some("2026-01-01T00:00:00Z".to_string());
    store::commit_collection(
        app.storage(),
        app.config().capacity_bytes,
        CollectionKey::Tasks,
        &tasks,
    )
    .expect("commit should succeed");

    let done = app
        .complete_task(&task_id)
        .expect("complete should succeed")
        .expect("task should exist");
    assert_eq!(done.status, TaskStatus::Completed);
    assert!(done.timer_started_at.is_none());
    assert!(done.time_spent_minutes > 0);
    let _ = std::fs::remove_dir_all(root);
}
