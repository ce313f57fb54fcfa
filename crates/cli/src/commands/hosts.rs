use anyhow::Result;
use colored::*;
use volley_core::progress::get_host_color;
use volley_core::task_manager::TaskManager;

pub fn execute(manager: &TaskManager, task: &str, json: bool) -> Result<()> {
    let resolution = manager
        .resolve_hosts(task)
        .map_err(|e| anyhow::anyhow!("Failed to resolve hosts: {}", e))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
        return Ok(());
    }

    println!("{} {}", "Target hosts for".bold(), task.cyan());
    if resolution.local_run {
        println!("  {}", "local run (no remote shell)".dimmed());
    }
    if resolution.hosts.is_empty() {
        println!("  {}", "No hosts resolved".red());
        return Ok(());
    }
    for (i, host) in resolution.hosts.iter().enumerate() {
        println!("  {}. {}", i + 1, host.color(get_host_color(host)));
    }

    Ok(())
}
