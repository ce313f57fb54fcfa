//! Shell command task body
//!
//! Builds the worker process for a task defined with a `command`. Local runs
//! execute the command directly; remote runs hand it to the configured remote
//! shell (`ssh` by default) together with the host name.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::configs::tasks::{Command as TaskCommand, TaskConfig};
use crate::configs::Settings;
use crate::execution::worker::{TaskBody, WorkerContext};
use crate::types::{VolleyError, VolleyResult};

/// Task body that runs a configured shell command on each host
pub struct ShellTaskBody {
    command: TaskCommand,
    remote_shell: Vec<String>,
    env_prefix: String,
    working_dir: PathBuf,
}

impl ShellTaskBody {
    pub fn new(
        task_name: &str,
        task: &TaskConfig,
        settings: &Settings,
        working_dir: &Path,
    ) -> VolleyResult<Self> {
        let command = match &task.command {
            Some(TaskCommand::Multiple(cmds)) if cmds.is_empty() => None,
            other => other.clone(),
        }
        .ok_or_else(|| {
            VolleyError::Task(format!("Task '{}' has no command to execute", task_name))
        })?;

        Ok(Self {
            command,
            remote_shell: settings.effective_remote_shell(),
            env_prefix: settings.effective_env_prefix().to_string(),
            working_dir: working_dir.to_path_buf(),
        })
    }

    /// Program and arguments the worker executes
    pub fn argv(&self, context: &WorkerContext) -> Vec<String> {
        if context.local_run {
            return match &self.command {
                TaskCommand::Single(cmd) => vec!["sh".to_string(), "-c".to_string(), cmd.clone()],
                TaskCommand::Multiple(cmds) => cmds.clone(),
            };
        }

        let remote_command = match &self.command {
            TaskCommand::Single(cmd) => cmd.clone(),
            TaskCommand::Multiple(cmds) => cmds.join(" "),
        };
        let mut argv = self.remote_shell.clone();
        argv.push(context.host.clone());
        argv.push("--".to_string());
        argv.push(remote_command);
        argv
    }

    /// Environment variables exported to the worker
    pub fn env(&self, context: &WorkerContext) -> Vec<(String, String)> {
        let local_run = if context.local_run { "1" } else { "0" };
        vec![
            (format!("{}_TASK", self.env_prefix), context.task_name.clone()),
            (format!("{}_HOST", self.env_prefix), context.host.clone()),
            (format!("{}_LOCAL_RUN", self.env_prefix), local_run.to_string()),
        ]
    }
}

impl TaskBody for ShellTaskBody {
    fn command(&self, context: &WorkerContext) -> VolleyResult<Command> {
        // The remote shell would parse such a host as one of its own options
        if !context.local_run && context.host.starts_with('-') {
            return Err(VolleyError::Task(format!(
                "Host '{}' of task '{}' must not start with '-'",
                context.host, context.task_name
            )));
        }

        let argv = self.argv(context);
        let (program, args) = argv.split_first().ok_or_else(|| {
            VolleyError::Task(format!("Task '{}' has an empty command", context.task_name))
        })?;

        let mut command = Command::new(program);
        command.args(args).current_dir(&self.working_dir);
        for (key, value) in self.env(context) {
            command.env(key, value);
        }
        Ok(command)
    }
}
