use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use volley_core::progress::Verbosity;
use volley_core::task_manager::{TaskManager, TaskManagerConfig};

mod commands;
mod logging;

/// Volley - Run a task on many hosts in parallel
#[derive(Parser)]
#[command(name = "volley")]
#[command(about = "Run a task on many hosts in parallel, one worker process per host")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "VOLLEY_CONFIG", default_value = "volley.yml")]
    config: PathBuf,

    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print worker errors and failures
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    debug: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task on all of its target hosts
    Run {
        /// Name of the task to run
        task: String,
    },
    /// List the tasks in the configuration
    List,
    /// Show the hosts a task would run on, without running it
    Hosts {
        /// Name of the task to resolve
        task: String,
        /// Print the resolution as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the JSON schema of the configuration file
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.debug, cli.log_json)?;

    // The schema does not depend on a configuration file
    if let Commands::Schema = cli.command {
        return commands::schema::execute();
    }

    let manager = TaskManager::new(TaskManagerConfig {
        config_path: cli.config,
    })
    .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    match cli.command {
        Commands::Run { task } => {
            let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
            let code = commands::run::execute(&manager, &task, verbosity).await?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::List => commands::list::execute(&manager),
        Commands::Hosts { task, json } => commands::hosts::execute(&manager, &task, json),
        Commands::Schema => commands::schema::execute(),
    }
}
