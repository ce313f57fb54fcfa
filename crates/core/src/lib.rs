//! Volley Core Library
//!
//! This is the core library for the Volley remote task runner. Given a named
//! task it resolves the target hosts, runs one isolated worker process per
//! host in parallel, waits for all of them, and propagates SIGINT/SIGTERM to
//! the workers still running.
//!
//! ## Architecture
//!
//! The core library is organized into several modules:
//!
//! - [`task_manager`] - High-level interface used by the CLI
//! - [`hosts`] - Host resolution from direct host lists and roles
//! - [`execution`] - Workers, the process orchestrator and cancellation
//! - [`facts`] - Path-addressed configuration lookups
//! - [`configs`] - Configuration parsing for `volley.yml`
//! - [`progress`] - Progress reporting and host colors
//! - [`platform`] - Process control capability checks
//! - [`results`] - Result types for task operations
//! - [`types`] - Common error types and type aliases
//!
//! ## Usage
//!
//! ```rust,no_run
//! use volley_core::task_manager::{TaskManager, TaskManagerConfig};
//! use std::path::PathBuf;
//!
//! # fn example() -> volley_core::types::VolleyResult<()> {
//! let manager = TaskManager::new(TaskManagerConfig {
//!     config_path: PathBuf::from("volley.yml"),
//! })?;
//!
//! let tasks = manager.list_tasks();
//! # Ok(())
//! # }
//! ```

pub mod configs;
pub mod execution;
pub mod facts;
pub mod hosts;
pub mod platform;
pub mod progress;
pub mod results;
pub mod task_manager;
pub mod types;

// Re-export the main types for easier usage
pub use types::{VolleyError, VolleyResult};
pub use task_manager::{TaskManager, TaskManagerConfig};
