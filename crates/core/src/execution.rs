//! Task execution module
//!
//! This module handles running a task across its hosts: one worker process per
//! host, orchestration of their lifecycle, and signal-driven cancellation.

pub mod cancellation;
pub mod command;
pub mod orchestrator;
pub mod worker;

pub use cancellation::{CancelState, CancellationController, CancellationHandle, SignalKind};
pub use command::ShellTaskBody;
pub use orchestrator::{ProcessOrchestrator, WorkerRegistry};
pub use worker::{OutputDrain, SpawnedWorker, TaskBody, Worker, WorkerContext, WorkerExit, WorkerHandle};
