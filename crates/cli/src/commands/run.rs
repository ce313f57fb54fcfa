use std::sync::Arc;

use anyhow::Result;
use colored::*;
use tracing::debug;
use volley_core::progress::{ConsoleReporter, Verbosity};
use volley_core::results::ExecutionOutcome;
use volley_core::task_manager::TaskManager;

/// Run a task and return the process exit code
pub async fn execute(manager: &TaskManager, task: &str, verbosity: Verbosity) -> Result<i32> {
    let reporter = Arc::new(ConsoleReporter::new(verbosity));

    // Core errors are already printed by the console reporter
    let outcome = match manager.execute(task, reporter).await {
        Ok(outcome) => outcome,
        Err(e) => {
            debug!(task, error = ?e, "run failed");
            return Ok(1);
        }
    };

    if let ExecutionOutcome::Completed { reports } = &outcome {
        let failed = outcome.failed_hosts().len();
        if failed == 0 && verbosity > Verbosity::Quiet {
            println!(
                "{} {}",
                "✓".green().bold(),
                format!("{} completed on {} host(s)", task, reports.len()).green().bold()
            );
        }
    }

    Ok(outcome.exit_code())
}
