//! Result types for task manager operations
//!
//! This module contains the result types returned by the task manager and the
//! orchestrator, providing a centralized location for output structures.

use std::process::ExitStatus;

use serde::Serialize;

use crate::execution::cancellation::SignalKind;
use crate::execution::worker::WorkerHandle;

/// Summary of a configured task
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub name: String,
    pub description: Option<String>,
    pub hosts: Option<Vec<String>>,
    pub roles: Option<Vec<String>>,
}

impl TaskInfo {
    /// Neither hosts nor roles are configured
    pub fn is_local(&self) -> bool {
        self.hosts.is_none() && self.roles.is_none()
    }
}

/// Result of listing the tasks in a configuration
#[derive(Debug, Clone, Serialize)]
pub struct TaskListResult {
    pub tasks: Vec<TaskInfo>,
}

/// Completion record of one worker
#[derive(Debug, Clone)]
pub struct HostReport {
    pub handle: WorkerHandle,
    pub status: ExitStatus,
}

impl HostReport {
    pub fn host(&self) -> &str {
        &self.handle.host
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Outcome of running a task across its hosts
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// Every worker was reaped. Reports are in completion order.
    Completed { reports: Vec<HostReport> },
    /// A termination signal arrived; `signalled` lists the workers that were
    /// still outstanding and received SIGTERM.
    Cancelled {
        signal: SignalKind,
        signalled: Vec<WorkerHandle>,
    },
}

impl ExecutionOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutionOutcome::Cancelled { .. })
    }

    /// Reports of workers that exited unsuccessfully
    pub fn failed_hosts(&self) -> Vec<&HostReport> {
        match self {
            ExecutionOutcome::Completed { reports } => {
                reports.iter().filter(|r| !r.success()).collect()
            }
            ExecutionOutcome::Cancelled { .. } => Vec::new(),
        }
    }

    /// Process exit code for the driver: 0 on completion, 128 + signal number on cancellation
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecutionOutcome::Completed { .. } => 0,
            ExecutionOutcome::Cancelled { signal, .. } => 128 + signal.number(),
        }
    }
}
