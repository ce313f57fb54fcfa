//! Fan-out orchestration
//!
//! [`ProcessOrchestrator`] spawns one worker per host, tracks the running
//! workers in a [`WorkerRegistry`] keyed by pid, and reaps them in whatever
//! order they finish. Cancellation is checked between every two spawns and
//! raced against every wait.
//!
//! A worker leaves the registry as soon as it has been reaped; its remaining
//! output is drained afterwards. Termination is requested through a per-run
//! token that each wait task observes, so SIGTERM only ever reaches workers
//! that have not been reaped.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::execution::cancellation::{CancellationController, SignalKind};
use crate::execution::worker::{TaskBody, Worker, WorkerExit, WorkerHandle};
use crate::hosts::HostSet;
use crate::platform::ensure_process_control;
use crate::progress::Reporter;
use crate::results::{ExecutionOutcome, HostReport};
use crate::types::{VolleyError, VolleyResult};

/// Workers that have been spawned and not yet reaped, keyed by pid
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: HashMap<u32, String>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: &WorkerHandle) {
        self.workers.insert(handle.pid, handle.host.clone());
    }

    /// Remove a reaped worker, returning its host
    pub fn remove(&mut self, pid: u32) -> Option<String> {
        self.workers.remove(&pid)
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.workers.contains_key(&pid)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Tracked workers ordered by pid
    pub fn handles(&self) -> Vec<WorkerHandle> {
        let mut handles: Vec<WorkerHandle> = self
            .workers
            .iter()
            .map(|(pid, host)| WorkerHandle {
                pid: *pid,
                host: host.clone(),
            })
            .collect();
        handles.sort_by_key(|h| h.pid);
        handles
    }
}

/// Runs one worker per host and waits for all of them
pub struct ProcessOrchestrator {
    reporter: Arc<dyn Reporter>,
    cancellation: CancellationController,
    registry: WorkerRegistry,
}

impl ProcessOrchestrator {
    pub fn new(reporter: Arc<dyn Reporter>, cancellation: CancellationController) -> Self {
        Self {
            reporter,
            cancellation,
            registry: WorkerRegistry::new(),
        }
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    pub fn cancellation(&self) -> &CancellationController {
        &self.cancellation
    }

    /// Spawn a worker for every host in `hosts`, in order, and reap them all.
    ///
    /// Returns `Completed` once every worker was reaped, or `Cancelled` as soon
    /// as a termination signal is observed. Spawn, wait and registry errors
    /// abort the run after signalling the workers still outstanding.
    pub async fn run(
        &mut self,
        hosts: &HostSet,
        task_name: &str,
        body: &dyn TaskBody,
        local_run: bool,
    ) -> VolleyResult<ExecutionOutcome> {
        ensure_process_control()?;
        if hosts.is_empty() {
            return Err(VolleyError::NoHosts(task_name.to_string()));
        }

        // Handlers go in before the first spawn so no signal is missed mid-loop
        self.cancellation.install()?;
        self.reporter.signal_handlers_installed();

        let cancellation = self.cancellation.handle();
        let mut run = RunState::default();

        for host in hosts {
            if cancellation.is_cancelled() {
                return Ok(self.cancel(&mut run).await);
            }

            let worker = Worker::new(task_name, host, local_run);
            let spawned = match worker.spawn(body, self.reporter.clone()) {
                Ok(spawned) => spawned,
                Err(e) => return Err(self.abort(e, &mut run).await),
            };
            let handle = spawned.handle().clone();
            self.registry.insert(&handle);
            self.reporter.worker_spawned(&handle);
            run.waits.spawn(spawned.wait(run.terminate.clone()));

            // Give the signal listener a chance to run between hosts
            tokio::task::yield_now().await;
        }
        info!(task = task_name, workers = self.registry.len(), "all workers spawned");

        let mut reports = Vec::with_capacity(hosts.len());
        while !self.registry.is_empty() {
            let joined = tokio::select! {
                biased;
                _ = cancellation.cancelled() => None,
                joined = run.waits.join_next() => Some(joined),
            };
            let Some(joined) = joined else {
                return Ok(self.cancel(&mut run).await);
            };

            let (report, output) = match joined {
                Some(Ok(Ok(WorkerExit::Exited { report, output }))) => (report, output),
                Some(Ok(Ok(WorkerExit::Signalled(handle)))) => {
                    let error = VolleyError::Wait(std::io::Error::other(format!(
                        "worker {} for {} was terminated outside of cancellation",
                        handle.pid, handle.host
                    )));
                    return Err(self.abort(error, &mut run).await);
                }
                Some(Ok(Err(e))) => return Err(self.abort(e, &mut run).await),
                Some(Err(join_error)) => {
                    let error = VolleyError::Wait(std::io::Error::other(join_error));
                    return Err(self.abort(error, &mut run).await);
                }
                None => {
                    let error = VolleyError::Wait(std::io::Error::other("no worker left to wait for"));
                    return Err(self.abort(error, &mut run).await);
                }
            };

            if let Err(e) = self.reap(&report) {
                return Err(self.abort(e, &mut run).await);
            }
            run.drains.spawn(output.finish());
            reports.push(report);
        }

        while run.drains.join_next().await.is_some() {}
        debug!(task = task_name, reaped = reports.len(), "all workers reaped");
        Ok(ExecutionOutcome::Completed { reports })
    }

    fn reap(&mut self, report: &HostReport) -> VolleyResult<()> {
        let pid = report.handle.pid;
        if self.registry.remove(pid).is_none() {
            return Err(VolleyError::RegistryInconsistency { pid });
        }
        self.reporter.worker_reaped(report);
        Ok(())
    }

    async fn cancel(&mut self, run: &mut RunState) -> ExecutionOutcome {
        let signal = self
            .cancellation
            .received_signal()
            .unwrap_or(SignalKind::Terminate);
        self.reporter.signal_received(signal);
        let signalled = self.terminate_outstanding(run).await;
        self.cancellation.mark_terminated();
        info!(signal = signal.name(), signalled = signalled.len(), "run cancelled");
        ExecutionOutcome::Cancelled { signal, signalled }
    }

    async fn abort(&mut self, error: VolleyError, run: &mut RunState) -> VolleyError {
        let signalled = self.terminate_outstanding(run).await;
        if !signalled.is_empty() {
            warn!(signalled = signalled.len(), error = %error, "run aborted");
        }
        error
    }

    /// Have every outstanding worker sent SIGTERM, host by host.
    ///
    /// Workers that exited before their wait task saw the request are reaped
    /// instead of signalled. Signalled workers stay in the registry.
    async fn terminate_outstanding(&mut self, run: &mut RunState) -> Vec<WorkerHandle> {
        run.terminate.cancel();

        let mut signalled = Vec::new();
        while let Some(joined) = run.waits.join_next().await {
            match joined {
                Ok(Ok(WorkerExit::Signalled(handle))) => {
                    self.reporter.worker_signalled(&handle);
                    signalled.push(handle);
                }
                Ok(Ok(WorkerExit::Exited { report, .. })) => {
                    if self.registry.remove(report.handle.pid).is_some() {
                        self.reporter.worker_reaped(&report);
                    }
                }
                Ok(Err(e)) => warn!(error = %e, "failed to wait for worker during shutdown"),
                Err(e) => warn!(error = %e, "worker wait task failed during shutdown"),
            }
        }
        signalled
    }
}

/// In-flight work of a single run
#[derive(Default)]
struct RunState {
    /// Fired to have every outstanding worker sent SIGTERM
    terminate: CancellationToken,
    waits: JoinSet<VolleyResult<WorkerExit>>,
    drains: JoinSet<()>,
}
