//! High-level task management interface
//!
//! This module provides the [`TaskManager`] which serves as the primary interface
//! for the CLI. It owns the loaded configuration and ties host resolution, the
//! shell task body and the process orchestrator together.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use volley_core::progress::{ConsoleReporter, Verbosity};
//! use volley_core::task_manager::{TaskManager, TaskManagerConfig};
//! use std::path::PathBuf;
//!
//! # async fn example() -> volley_core::types::VolleyResult<()> {
//! let manager = TaskManager::new(TaskManagerConfig {
//!     config_path: PathBuf::from("volley.yml"),
//! })?;
//!
//! // Show where a task would run
//! let resolution = manager.resolve_hosts("deploy")?;
//!
//! // Run it
//! let outcome = manager
//!     .execute("deploy", Arc::new(ConsoleReporter::new(Verbosity::Normal)))
//!     .await?;
//! std::process::exit(outcome.exit_code());
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::configs::{load_volley_config, VolleyConfig};
use crate::execution::{CancellationController, ProcessOrchestrator, ShellTaskBody, TaskBody};
use crate::hosts::{HostResolver, Resolution};
use crate::progress::Reporter;
use crate::results::{ExecutionOutcome, TaskInfo, TaskListResult};
use crate::types::VolleyResult;

/// Configuration for initializing a task manager
pub struct TaskManagerConfig {
    pub config_path: PathBuf,
}

/// High-level task manager that encapsulates all task operations
pub struct TaskManager {
    pub config: VolleyConfig,
    /// Directory task commands run in; the directory holding the config file.
    pub root: PathBuf,
}

impl TaskManager {
    /// Load the configuration file and build a task manager
    pub fn new(config: TaskManagerConfig) -> VolleyResult<Self> {
        let volley_config = load_volley_config(&config.config_path)?;
        let root = config
            .config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        info!(
            path = %config.config_path.display(),
            tasks = volley_config.tasks.len(),
            roles = volley_config.roles.len(),
            "configuration loaded"
        );
        Ok(Self::from_config(volley_config, root))
    }

    pub fn from_config(config: VolleyConfig, root: PathBuf) -> Self {
        Self { config, root }
    }

    /// List all tasks, sorted by name
    pub fn list_tasks(&self) -> TaskListResult {
        let tasks = self
            .config
            .tasks
            .iter()
            .map(|(name, task)| TaskInfo {
                name: name.clone(),
                description: task.description.clone(),
                hosts: task.options.hosts.as_ref().map(|h| h.to_vec()),
                roles: task.options.roles.as_ref().map(|r| r.to_vec()),
            })
            .collect();

        TaskListResult { tasks }
    }

    /// Resolve the target hosts of a defined task
    pub fn resolve_hosts(&self, task_name: &str) -> VolleyResult<Resolution> {
        self.config.task(task_name)?;
        Ok(HostResolver::new(&self.config).resolve(task_name))
    }

    /// Run a task with its configured command on every target host
    pub async fn execute(
        &self,
        task_name: &str,
        reporter: Arc<dyn Reporter>,
    ) -> VolleyResult<ExecutionOutcome> {
        let body = match self.config.task(task_name).and_then(|task| {
            ShellTaskBody::new(task_name, task, &self.config.settings, &self.root)
        }) {
            Ok(body) => body,
            Err(e) => {
                reporter.fatal(&e);
                return Err(e);
            }
        };
        self.execute_with(task_name, &body, reporter, CancellationController::new())
            .await
    }

    /// Run a task with a custom task body and cancellation controller
    pub async fn execute_with(
        &self,
        task_name: &str,
        body: &dyn TaskBody,
        reporter: Arc<dyn Reporter>,
        cancellation: CancellationController,
    ) -> VolleyResult<ExecutionOutcome> {
        reporter.task_started(task_name);

        let resolution = match self.resolve_hosts(task_name) {
            Ok(resolution) => resolution,
            Err(e) => {
                reporter.fatal(&e);
                return Err(e);
            }
        };
        reporter.hosts_resolved(&resolution);

        let mut orchestrator = ProcessOrchestrator::new(reporter.clone(), cancellation);
        let outcome = orchestrator
            .run(&resolution.hosts, task_name, body, resolution.local_run)
            .await;

        match &outcome {
            Ok(outcome @ ExecutionOutcome::Completed { .. }) => {
                reporter.task_completed(task_name, outcome)
            }
            Ok(ExecutionOutcome::Cancelled { .. }) => {}
            Err(e) => reporter.fatal(e),
        }
        outcome
    }
}
