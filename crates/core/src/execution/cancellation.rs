//! Signal-driven cancellation
//!
//! [`CancellationController`] listens for SIGINT and SIGTERM on a background
//! task and bridges them to a [`CancellationToken`]. The orchestrator checks
//! the token between spawns and races it against every wait; once it fires
//! the orchestrator has its outstanding workers sent SIGTERM and stops
//! waiting.
//!
//! State machine: `Armed -> Cancelling -> Terminated`.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, warn};

use crate::execution::worker::WorkerHandle;
use crate::types::{VolleyError, VolleyResult};

/// Termination-class signals that cancel a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Interrupt,
    Terminate,
}

impl SignalKind {
    pub fn number(&self) -> i32 {
        match self {
            SignalKind::Interrupt => 2,
            SignalKind::Terminate => 15,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SignalKind::Interrupt => "SIGINT",
            SignalKind::Terminate => "SIGTERM",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            SignalKind::Interrupt => 1,
            SignalKind::Terminate => 2,
        }
    }

    fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(SignalKind::Interrupt),
            2 => Some(SignalKind::Terminate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CancelState {
    Armed = 0,
    Cancelling = 1,
    Terminated = 2,
}

impl CancelState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => CancelState::Armed,
            1 => CancelState::Cancelling,
            _ => CancelState::Terminated,
        }
    }
}

#[derive(Debug)]
struct Shared {
    token: CancellationToken,
    state: AtomicU8,
    signal: AtomicU8,
}

/// Cloneable view of a controller: observe or trigger cancellation
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    shared: Arc<Shared>,
}

impl CancellationHandle {
    /// Record `signal` and fire the token. Repeated triggers only re-fire it.
    pub fn trigger(&self, signal: SignalKind) {
        let _ = self.shared.signal.compare_exchange(
            0,
            signal.to_u8(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        let _ = self.shared.state.compare_exchange(
            CancelState::Armed as u8,
            CancelState::Cancelling as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        self.shared.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.token.is_cancelled()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.shared.token.cancelled()
    }

    pub fn state(&self) -> CancelState {
        CancelState::from_u8(self.shared.state.load(Ordering::SeqCst))
    }

    /// The first signal that triggered cancellation
    pub fn received_signal(&self) -> Option<SignalKind> {
        SignalKind::from_u8(self.shared.signal.load(Ordering::SeqCst))
    }

    fn mark_terminated(&self) {
        self.shared
            .state
            .store(CancelState::Terminated as u8, Ordering::SeqCst);
    }
}

/// Owns the signal listener for one run
#[derive(Debug)]
pub struct CancellationController {
    handle: CancellationHandle,
    listener: Option<JoinHandle<()>>,
}

impl Default for CancellationController {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationController {
    pub fn new() -> Self {
        Self {
            handle: CancellationHandle {
                shared: Arc::new(Shared {
                    token: CancellationToken::new(),
                    state: AtomicU8::new(CancelState::Armed as u8),
                    signal: AtomicU8::new(0),
                }),
            },
            listener: None,
        }
    }

    pub fn handle(&self) -> CancellationHandle {
        self.handle.clone()
    }

    pub fn is_installed(&self) -> bool {
        self.listener.is_some()
    }

    /// Install SIGINT and SIGTERM handlers. Calling it again is a no-op.
    ///
    /// Must be called from within a tokio runtime. The handlers are registered
    /// before this returns, so a signal delivered afterwards is never lost.
    pub fn install(&mut self) -> VolleyResult<()> {
        if self.listener.is_some() {
            return Ok(());
        }
        self.listener = Some(spawn_listener(self.handle.clone())?);
        debug!("signal handlers installed");
        Ok(())
    }

    pub fn trigger(&self, signal: SignalKind) {
        self.handle.trigger(signal);
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    pub fn state(&self) -> CancelState {
        self.handle.state()
    }

    pub fn received_signal(&self) -> Option<SignalKind> {
        self.handle.received_signal()
    }

    /// Record that every outstanding worker has been sent SIGTERM
    pub fn mark_terminated(&self) {
        self.handle.mark_terminated();
    }
}

impl Drop for CancellationController {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

#[cfg(unix)]
fn spawn_listener(handle: CancellationHandle) -> VolleyResult<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind as UnixSignalKind};

    let install_error = |e: std::io::Error| {
        VolleyError::Environment(format!("Failed to install signal handler: {}", e))
    };
    let mut interrupt = signal(UnixSignalKind::interrupt()).map_err(install_error)?;
    let mut terminate = signal(UnixSignalKind::terminate()).map_err(install_error)?;

    Ok(tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                Some(()) = interrupt.recv() => SignalKind::Interrupt,
                Some(()) = terminate.recv() => SignalKind::Terminate,
                else => break,
            };
            warn!(signal = received.name(), "received termination signal");
            handle.trigger(received);
        }
    }))
}

#[cfg(not(unix))]
fn spawn_listener(handle: CancellationHandle) -> VolleyResult<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            warn!(signal = "SIGINT", "received termination signal");
            handle.trigger(SignalKind::Interrupt);
        }
    }))
}

/// Send SIGTERM to a worker. ESRCH is ignored.
#[cfg(unix)]
pub(crate) fn terminate_pid(handle: &WorkerHandle) {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(handle.pid) else {
        warn!(pid = handle.pid, "pid out of range, not signalling");
        return;
    };
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => debug!(pid = handle.pid, host = %handle.host, "sent SIGTERM"),
        Err(Errno::ESRCH) => debug!(pid = handle.pid, "worker already gone"),
        Err(e) => warn!(pid = handle.pid, host = %handle.host, error = %e, "failed to signal worker"),
    }
}

#[cfg(not(unix))]
pub(crate) fn terminate_pid(handle: &WorkerHandle) {
    warn!(pid = handle.pid, "signalling workers is not supported on this platform");
}
