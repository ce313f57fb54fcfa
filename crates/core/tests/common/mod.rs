#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::process::Command;
use volley_core::execution::{CancellationHandle, SignalKind, TaskBody, WorkerContext, WorkerHandle};
use volley_core::hosts::{HostSet, Resolution};
use volley_core::progress::{OutputStream, Reporter, Verbosity};
use volley_core::results::{ExecutionOutcome, HostReport};
use volley_core::VolleyError;

/// Task body running a per-host shell script; hosts without a script exit 0
#[derive(Default)]
pub struct ScriptBody {
    scripts: HashMap<String, String>,
    missing_program: Option<String>,
    pub contexts: Mutex<Vec<WorkerContext>>,
}

impl ScriptBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, host: &str, script: &str) -> Self {
        self.scripts.insert(host.to_string(), script.to_string());
        self
    }

    /// Spawning the worker for `host` fails because its program does not exist
    pub fn unspawnable(mut self, host: &str) -> Self {
        self.missing_program = Some(host.to_string());
        self
    }

    pub fn contexts(&self) -> Vec<WorkerContext> {
        self.contexts.lock().unwrap().clone()
    }
}

impl TaskBody for ScriptBody {
    fn command(&self, context: &WorkerContext) -> volley_core::VolleyResult<Command> {
        self.contexts.lock().unwrap().push(context.clone());
        if self.missing_program.as_deref() == Some(context.host.as_str()) {
            return Ok(Command::new("/nonexistent/volley-test-program"));
        }
        let script = self
            .scripts
            .get(&context.host)
            .cloned()
            .unwrap_or_else(|| "exit 0".to_string());
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        Ok(command)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    TaskStarted(String),
    HostsResolved(Resolution),
    HandlersInstalled,
    Spawned(WorkerHandle),
    Output(String, String),
    Reaped(WorkerHandle, bool),
    SignalReceived(SignalKind),
    Signalled(WorkerHandle),
    Completed(String),
    Fatal(String),
}

/// Reporter that records every event and can cancel the run at a given point
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<Event>>,
    cancel_after_reaps: Option<(usize, CancellationHandle)>,
    cancel_after_spawns: Option<(usize, CancellationHandle)>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger SIGINT cancellation once `reaps` workers have been reaped
    pub fn cancel_after_reaps(reaps: usize, handle: CancellationHandle) -> Self {
        Self {
            cancel_after_reaps: Some((reaps, handle)),
            ..Self::default()
        }
    }

    /// Trigger SIGINT cancellation once `spawns` workers have been spawned
    pub fn cancel_after_spawns(spawns: usize, handle: CancellationHandle) -> Self {
        Self {
            cancel_after_spawns: Some((spawns, handle)),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn spawned(&self) -> Vec<WorkerHandle> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Spawned(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    pub fn reaped(&self) -> Vec<WorkerHandle> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Reaped(h, _) => Some(h),
                _ => None,
            })
            .collect()
    }

    pub fn signalled(&self) -> Vec<WorkerHandle> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Signalled(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    pub fn output(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Output(host, line) => Some((host, line)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl Reporter for RecordingReporter {
    fn verbosity(&self) -> Verbosity {
        Verbosity::Debug
    }

    fn task_started(&self, task_name: &str) {
        self.push(Event::TaskStarted(task_name.to_string()));
    }

    fn hosts_resolved(&self, resolution: &Resolution) {
        self.push(Event::HostsResolved(resolution.clone()));
    }

    fn signal_handlers_installed(&self) {
        self.push(Event::HandlersInstalled);
    }

    fn worker_spawned(&self, handle: &WorkerHandle) {
        self.push(Event::Spawned(handle.clone()));
        if let Some((after, handle)) = &self.cancel_after_spawns {
            if self.spawned().len() == *after {
                handle.trigger(SignalKind::Interrupt);
            }
        }
    }

    fn worker_output(&self, host: &str, _stream: OutputStream, line: &str) {
        self.push(Event::Output(host.to_string(), line.to_string()));
    }

    fn worker_reaped(&self, report: &HostReport) {
        self.push(Event::Reaped(report.handle.clone(), report.success()));
        if let Some((after, handle)) = &self.cancel_after_reaps {
            if self.reaped().len() == *after {
                handle.trigger(SignalKind::Interrupt);
            }
        }
    }

    fn signal_received(&self, signal: SignalKind) {
        self.push(Event::SignalReceived(signal));
    }

    fn worker_signalled(&self, handle: &WorkerHandle) {
        self.push(Event::Signalled(handle.clone()));
    }

    fn task_completed(&self, task_name: &str, _outcome: &ExecutionOutcome) {
        self.push(Event::Completed(task_name.to_string()));
    }

    fn fatal(&self, error: &VolleyError) {
        self.push(Event::Fatal(error.to_string()));
    }
}

pub fn hosts(names: &[&str]) -> HostSet {
    names.iter().map(|h| h.to_string()).collect()
}
