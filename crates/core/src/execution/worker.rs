//! Per-host workers
//!
//! A [`Worker`] runs the task body for exactly one host as an isolated child
//! process. Its stdout and stderr are forwarded line by line to the reporter;
//! nothing else is shared with the orchestrating process.
//!
//! Only the task waiting on a worker ever reaps or signals it, so a worker is
//! never sent SIGTERM after its pid was released.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::execution::cancellation::terminate_pid;
use crate::progress::{OutputStream, Reporter};
use crate::results::HostReport;
use crate::types::{VolleyError, VolleyResult};

/// How long to keep draining worker output after the worker exited.
/// A background grandchild may hold the pipes open indefinitely.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Identity of a spawned worker
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerHandle {
    pub pid: u32,
    pub host: String,
}

/// Everything a task body knows about the worker it runs in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerContext {
    pub task_name: String,
    pub host: String,
    /// The task has no remote targets and must not use the remote shell.
    pub local_run: bool,
}

/// Builds the process a worker runs
pub trait TaskBody: Send + Sync {
    fn command(&self, context: &WorkerContext) -> VolleyResult<Command>;
}

pub struct Worker {
    context: WorkerContext,
}

impl Worker {
    pub fn new(task_name: &str, host: &str, local_run: bool) -> Self {
        Self {
            context: WorkerContext {
                task_name: task_name.to_string(),
                host: host.to_string(),
                local_run,
            },
        }
    }

    pub fn context(&self) -> &WorkerContext {
        &self.context
    }

    /// Start the task body in a child process
    pub fn spawn(
        self,
        body: &dyn TaskBody,
        reporter: Arc<dyn Reporter>,
    ) -> VolleyResult<SpawnedWorker> {
        let host = self.context.host.clone();
        let mut command = body.command(&self.context)?;
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|source| VolleyError::Spawn {
            host: host.clone(),
            source,
        })?;
        let pid = child.id().ok_or_else(|| VolleyError::Spawn {
            host: host.clone(),
            source: std::io::Error::other("worker exited before its pid was read"),
        })?;
        debug!(pid, host = %host, task = %self.context.task_name, "spawned worker");

        let mut forwarders = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            forwarders.push(forward_lines(stdout, host.clone(), OutputStream::Stdout, reporter.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            forwarders.push(forward_lines(stderr, host.clone(), OutputStream::Stderr, reporter));
        }

        Ok(SpawnedWorker {
            handle: WorkerHandle { pid, host },
            child,
            forwarders,
        })
    }
}

/// A running worker process
pub struct SpawnedWorker {
    handle: WorkerHandle,
    child: Child,
    forwarders: Vec<JoinHandle<()>>,
}

/// How a worker left the orchestrator's hands
#[derive(Debug)]
pub enum WorkerExit {
    /// The worker exited and was reaped; its output may still be in flight
    Exited {
        report: HostReport,
        output: OutputDrain,
    },
    /// The worker was still running when termination was requested and got SIGTERM
    Signalled(WorkerHandle),
}

impl SpawnedWorker {
    pub fn handle(&self) -> &WorkerHandle {
        &self.handle
    }

    /// Wait for the worker to exit, or send it SIGTERM once `terminate` fires.
    ///
    /// Returns as soon as the worker is reaped; the remaining output is left to
    /// the returned [`OutputDrain`].
    pub async fn wait(mut self, terminate: CancellationToken) -> VolleyResult<WorkerExit> {
        let exited = tokio::select! {
            biased;
            status = self.child.wait() => Some(status.map_err(VolleyError::Wait)?),
            _ = terminate.cancelled() => None,
        };

        let status = match exited {
            Some(status) => status,
            None => match self.child.try_wait().map_err(VolleyError::Wait)? {
                Some(status) => status,
                None => {
                    terminate_pid(&self.handle);
                    return Ok(WorkerExit::Signalled(self.handle));
                }
            },
        };

        debug!(pid = self.handle.pid, host = %self.handle.host, %status, "worker exited");
        Ok(WorkerExit::Exited {
            output: OutputDrain {
                host: self.handle.host.clone(),
                forwarders: self.forwarders,
            },
            report: HostReport {
                handle: self.handle,
                status,
            },
        })
    }
}

/// Output forwarders of a worker that already exited
#[derive(Debug)]
pub struct OutputDrain {
    host: String,
    forwarders: Vec<JoinHandle<()>>,
}

impl OutputDrain {
    /// Flush what is left of the worker's output
    pub async fn finish(self) {
        for forwarder in self.forwarders {
            let abort = forwarder.abort_handle();
            if tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, forwarder).await.is_err() {
                warn!(host = %self.host, "worker output still open after exit, detaching");
                abort.abort();
            }
        }
    }
}

fn forward_lines<R>(
    reader: R,
    host: String,
    stream: OutputStream,
    reporter: Arc<dyn Reporter>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => reporter.worker_output(&host, stream, &line),
                Ok(None) => break,
                Err(e) => {
                    warn!(host = %host, error = %e, "failed to read worker output");
                    break;
                }
            }
        }
    })
}
