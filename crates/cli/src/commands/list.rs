use anyhow::Result;
use colored::*;
use volley_core::task_manager::TaskManager;

pub fn execute(manager: &TaskManager) -> Result<()> {
    let result = manager.list_tasks();

    println!("{}", "Tasks".bold().underline());

    if result.tasks.is_empty() {
        println!("  {}", "No tasks defined".dimmed());
        return Ok(());
    }

    for task in &result.tasks {
        match &task.description {
            Some(description) => println!("{} {}", task.name.blue().bold(), description.dimmed()),
            None => println!("{}", task.name.blue().bold()),
        }

        if task.is_local() {
            println!("  {}", "local run".dimmed());
            continue;
        }
        if let Some(hosts) = &task.hosts {
            println!("  {} {}", "hosts:".bright_black(), hosts.join(", "));
        }
        if let Some(roles) = &task.roles {
            println!("  {} {}", "roles:".bright_black(), roles.join(", "));
        }
    }

    Ok(())
}
