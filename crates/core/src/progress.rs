//! Progress reporting and host color management
//!
//! The orchestrator reports everything the user sees through the [`Reporter`]
//! trait. [`ConsoleReporter`] is the terminal implementation; embedders and
//! tests supply their own.

use colored::*;

use crate::execution::cancellation::SignalKind;
use crate::execution::worker::WorkerHandle;
use crate::hosts::Resolution;
use crate::results::{ExecutionOutcome, HostReport};
use crate::types::VolleyError;

/// How much the reporter prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Debug,
}

impl Verbosity {
    /// Map `-v` occurrences and `--quiet` to a verbosity level
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Verbosity::Quiet;
        }
        match verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    }
}

/// Which stream of a worker a line of output came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Write-only sink for orchestration progress.
///
/// Output forwarding runs on background tasks, so implementations must be
/// shareable across threads.
pub trait Reporter: Send + Sync {
    fn verbosity(&self) -> Verbosity;

    fn task_started(&self, task_name: &str);
    fn hosts_resolved(&self, resolution: &Resolution);
    fn signal_handlers_installed(&self);
    fn worker_spawned(&self, handle: &WorkerHandle);
    fn worker_output(&self, host: &str, stream: OutputStream, line: &str);
    fn worker_reaped(&self, report: &HostReport);
    fn signal_received(&self, signal: SignalKind);
    fn worker_signalled(&self, handle: &WorkerHandle);
    fn task_completed(&self, task_name: &str, outcome: &ExecutionOutcome);
    fn fatal(&self, error: &VolleyError);
}

/// Get a consistent color for a host name
pub fn get_host_color(host: &str) -> Color {
    // Use a simple hash of the host name bytes for consistent colors
    let hash = host
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));

    // Label colors, kept clear of the red/yellow/green used for status lines
    let colors = [
        Color::TrueColor {
            r: 147,
            g: 112,
            b: 219,
        },
        Color::TrueColor {
            r: 64,
            g: 224,
            b: 208,
        },
        Color::TrueColor {
            r: 255,
            g: 140,
            b: 0,
        },
        Color::TrueColor {
            r: 199,
            g: 21,
            b: 133,
        },
        Color::TrueColor {
            r: 72,
            g: 209,
            b: 204,
        },
        Color::TrueColor {
            r: 138,
            g: 43,
            b: 226,
        },
    ];

    colors[(hash % colors.len() as u64) as usize]
}

/// Reporter that prints to the terminal
#[derive(Debug, Clone, Default)]
pub struct ConsoleReporter {
    verbosity: Verbosity,
}

impl ConsoleReporter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    fn debug_line(&self, message: impl std::fmt::Display) {
        if self.verbosity >= Verbosity::Debug {
            println!("  {} {}", "Debug:".yellow(), message);
        }
    }
}

impl Reporter for ConsoleReporter {
    fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    fn task_started(&self, task_name: &str) {
        if self.verbosity > Verbosity::Quiet {
            println!("- {} {}", "Starting task".bold(), task_name.cyan());
        }
    }

    fn hosts_resolved(&self, resolution: &Resolution) {
        if resolution.local_run {
            self.debug_line("Running at the localhost only. This task does not connect to remote servers.");
        }
        if self.verbosity > Verbosity::Quiet {
            let hosts: Vec<String> = resolution
                .hosts
                .iter()
                .map(|h| h.color(get_host_color(h)).to_string())
                .collect();
            println!(
                "  Found {} target hosts: {}",
                resolution.hosts.len().to_string().cyan(),
                hosts.join("/")
            );
        }
    }

    fn signal_handlers_installed(&self) {
        self.debug_line("Signal handlers installed for SIGINT and SIGTERM.");
    }

    fn worker_spawned(&self, handle: &WorkerHandle) {
        self.debug_line(format!(
            "Spawned worker: {} ({})",
            handle.host.color(get_host_color(&handle.host)),
            format!("pid:{}", handle.pid).yellow()
        ));
    }

    fn worker_output(&self, host: &str, stream: OutputStream, line: &str) {
        if self.verbosity == Verbosity::Quiet && stream == OutputStream::Stdout {
            return;
        }
        let prefix = format!("[{}]", host).color(get_host_color(host));
        match stream {
            OutputStream::Stdout => println!("{} {}", prefix, line),
            OutputStream::Stderr => eprintln!("{} {}", prefix, line),
        }
    }

    fn worker_reaped(&self, report: &HostReport) {
        let host = report.host().color(get_host_color(report.host()));
        if !report.success() {
            eprintln!("{} {} {}", "✗".red().bold(), host, format!("exited with {}", report.status).red());
        } else if self.verbosity >= Verbosity::Verbose {
            println!("{} {}", "✓".green().bold(), host);
        }
        self.debug_line(format!(
            "Finished worker: {} ({})",
            host,
            format!("pid:{}", report.handle.pid).yellow()
        ));
    }

    fn signal_received(&self, signal: SignalKind) {
        eprintln!("{}", format!("Got {}.", signal.name()).red().bold());
    }

    fn worker_signalled(&self, handle: &WorkerHandle) {
        eprintln!(
            "Sending SIGTERM to {} ({})",
            handle.host.color(get_host_color(&handle.host)),
            format!("pid:{}", handle.pid).yellow()
        );
    }

    fn task_completed(&self, task_name: &str, outcome: &ExecutionOutcome) {
        if let ExecutionOutcome::Completed { reports } = outcome {
            let failed = outcome.failed_hosts();
            if !failed.is_empty() {
                eprintln!(
                    "  {}",
                    format!("{} of {} hosts failed", failed.len(), reports.len()).red()
                );
            }
        }
        if self.verbosity > Verbosity::Quiet {
            println!("- {} {}", "Completed task".bold(), task_name.cyan());
        }
    }

    fn fatal(&self, error: &VolleyError) {
        eprintln!("{} {}", "Error:".red().bold(), error);
    }
}
