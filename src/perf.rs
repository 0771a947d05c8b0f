use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use crate::app::App;
use crate::domain::project::NewProject;
use crate::domain::task::NewTask;
use crate::storage::Storage;
use crate::store::CACHE_PREFIX;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PerfMeasurement {
    pub name: String,
    pub elapsed_ms: f64,
    pub budget_ms: f64,
    pub within_budget: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PerfReport {
    pub iterations: u32,
    pub measurements: Vec<PerfMeasurement>,
}

impl PerfReport {
    pub fn over_budget_count(&self) -> usize {
        self.measurements
            .iter()
            .filter(|m| !m.within_budget)
            .count()
    }
}

#[derive(Debug)]
pub enum PerfError {
    Io(std::io::Error),
    Other(String),
}

impl fmt::Display for PerfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerfError::Io(err) => write!(f, "I/O error: {}", err),
            PerfError::Other(message) => write!(f, "{}", message),
        }
    }
}

impl Error for PerfError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PerfError::Io(err) => Some(err),
            PerfError::Other(_) => None,
        }
    }
}

impl From<std::io::Error> for PerfError {
    fn from(value: std::io::Error) -> Self {
        PerfError::Io(value)
    }
}

/// Exercise the write, read, and status-derivation paths against their
/// budgets in a throwaway workspace. The report also lands under
/// `tack:cache:perf` in the caller's store so the latest numbers are
/// inspectable later; that key is fair game for emergency cleanup.
pub fn run_perf_harness(app: &App, iterations: u32) -> Result<PerfReport, PerfError> {
    let iterations = iterations.max(1);
    let root = setup_workspace()?;
    let scratch = App::open(&root).map_err(|err| PerfError::Other(err.to_string()))?;

    let write_elapsed = benchmark_write_path(&scratch, iterations)?;
    let read_elapsed = benchmark_list_path(&scratch, iterations)?;
    let derive_elapsed = benchmark_status_path(&scratch, iterations)?;

    let measurements = vec![
        measurement("write_avg", write_elapsed, 150.0),
        measurement("list_avg", read_elapsed, 20.0),
        measurement("status_derive_avg", derive_elapsed, 50.0),
    ];

    let report = PerfReport {
        iterations,
        measurements,
    };

    let payload =
        serde_json::to_string(&report).map_err(|err| PerfError::Other(err.to_string()))?;
    if let Err(err) = app.storage().set(&format!("{CACHE_PREFIX}perf"), &payload) {
        // A full store must not fail the harness; the report is cache.
        tracing::warn!(error = %err, "perf report not cached");
    }

    let _ = std::fs::remove_dir_all(root);
    Ok(report)
}

fn benchmark_write_path(app: &App, iterations: u32) -> Result<f64, PerfError> {
    let mut total_ms = 0.0;
    for idx in 0..iterations {
        let start = Instant::now();
        let project = app
            .create_project(NewProject {
                owner: "perf".to_string(),
                title: format!("perf-write-{idx}"),
                ..NewProject::default()
            })
            .map_err(|err| PerfError::Other(err.to_string()))?;
        app.create_task(NewTask {
            project_id: project.id,
            owner: "perf".to_string(),
            title: format!("perf-task-{idx}"),
            ..NewTask::default()
        })
        .map_err(|err| PerfError::Other(err.to_string()))?;
        total_ms += start.elapsed().as_secs_f64() * 1000.0;
    }
    Ok(total_ms / f64::from(iterations))
}

fn benchmark_list_path(app: &App, iterations: u32) -> Result<f64, PerfError> {
    let start = Instant::now();
    for _ in 0..iterations {
        app.list_projects()
            .map_err(|err| PerfError::Other(err.to_string()))?;
        app.list_tasks(None)
            .map_err(|err| PerfError::Other(err.to_string()))?;
    }
    Ok((start.elapsed().as_secs_f64() * 1000.0) / f64::from(iterations))
}

fn benchmark_status_path(app: &App, iterations: u32) -> Result<f64, PerfError> {
    let project = app
        .create_project(NewProject {
            owner: "perf".to_string(),
            title: "perf-status".to_string(),
            ..NewProject::default()
        })
        .map_err(|err| PerfError::Other(err.to_string()))?;
    let task = app
        .create_task(NewTask {
            project_id: project.id,
            owner: "perf".to_string(),
            title: "perf-status-task".to_string(),
            ..NewTask::default()
        })
        .map_err(|err| PerfError::Other(err.to_string()))?;

    let start = Instant::now();
    for _ in 0..iterations {
        // Each round trips through the derived-status pass twice.
        app.start_task(&task.id)
            .map_err(|err| PerfError::Other(err.to_string()))?;
        app.stop_task(&task.id)
            .map_err(|err| PerfError::Other(err.to_string()))?;
    }
    Ok((start.elapsed().as_secs_f64() * 1000.0) / f64::from(iterations))
}

fn setup_workspace() -> Result<PathBuf, PerfError> {
    let root = std::env::temp_dir().join(format!("tack-perf-test-{}", Uuid::now_v7()));
    std::fs::create_dir_all(&root)?;
    Ok(root)
}

fn measurement(name: &str, elapsed_ms: f64, budget_ms: f64) -> PerfMeasurement {
    PerfMeasurement {
        name: name.to_string(),
        elapsed_ms,
        budget_ms,
        within_budget: elapsed_ms <= budget_ms,
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::path::PathBuf;

    use uuid::Uuid;

    use super::{run_perf_harness, PerfError, PerfMeasurement, PerfReport};
    use crate::app::App;
    use crate::storage::Storage;

    fn unique_workspace() -> PathBuf {
        let root = std::env::temp_dir().join(format!("tack-perf-host-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&root).expect("workspace should be creatable");
        root
    }

    #[test]
    fn produces_measurements_and_caches_the_report() {
        let root = unique_workspace();
        let app = App::open(&root).expect("app should open");
        let report = run_perf_harness(&app, 2).expect("perf harness should run");
        assert_eq!(report.measurements.len(), 3);
        assert!(report
            .measurements
            .iter()
            .all(|measurement| measurement.elapsed_ms >= 0.0));
        assert!(app
            .storage()
            .get("tack:cache:perf")
            .expect("get should succeed")
            .is_some());
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn over_budget_and_error_helpers_cover_edge_paths() {
        let report = PerfReport {
            iterations: 1,
            measurements: vec![
                PerfMeasurement {
                    name: "ok".to_string(),
                    elapsed_ms: 1.0,
                    budget_ms: 2.0,
                    within_budget: true,
                },
                PerfMeasurement {
                    name: "slow".to_string(),
                    elapsed_ms: 3.0,
                    budget_ms: 2.0,
                    within_budget: false,
                },
            ],
        };
        assert_eq!(report.over_budget_count(), 1);

        let io_err: PerfError = std::io::Error::other("disk").into();
        assert!(io_err.to_string().contains("I/O error"));
        assert!(io_err.source().is_some());

        let other = PerfError::Other("other".to_string());
        assert_eq!(other.to_string(), "other");
        assert!(other.source().is_none());
    }
}
