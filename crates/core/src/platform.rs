//! Platform checks for worker process control
//!
//! Workers are child processes that the orchestrator must be able to signal
//! individually, which needs unix process semantics.

use std::env;

use crate::types::{VolleyError, VolleyResult};

/// Information about the current platform's process control support
#[derive(Debug, Clone)]
pub struct PlatformInfo {
    /// Operating system name (e.g., "linux", "macos")
    pub os: &'static str,
    /// Whether child processes can be spawned and sent termination signals
    pub process_control: bool,
}

impl PlatformInfo {
    /// Detect the current platform
    pub fn current() -> Self {
        Self::from_os(env::consts::OS)
    }

    /// Create platform info from an OS name
    pub fn from_os(os: &'static str) -> Self {
        let process_control = matches!(
            os,
            "linux" | "macos" | "freebsd" | "netbsd" | "openbsd" | "dragonfly" | "solaris" | "illumos"
        );
        Self { os, process_control }
    }

    pub fn ensure_process_control(&self) -> VolleyResult<()> {
        if self.process_control {
            Ok(())
        } else {
            Err(VolleyError::Environment(format!(
                "Per-host worker processes need unix process control, which '{}' does not provide",
                self.os
            )))
        }
    }
}

/// Fail with an environment error unless this platform can run workers
pub fn ensure_process_control() -> VolleyResult<()> {
    if cfg!(unix) {
        Ok(())
    } else {
        PlatformInfo::current().ensure_process_control()
    }
}
