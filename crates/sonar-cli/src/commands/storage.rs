use crate::formatters::{human, print_json};
use anyhow::Result;
use clap::Subcommand;
use colored::*;
use sonar_engine::DiscoveryEngine;
use std::io::{self, Write};

#[derive(Subcommand, Debug)]
pub enum StorageCommand {
    /// Show cache location, size and contents
    Info,

    /// Copy the current cache to a named backup
    Backup {
        /// Backup file name (defaults to a timestamped name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Reset the discovery state (a backup of the old state is kept)
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

pub async fn handle_storage_command(
    engine: &DiscoveryEngine,
    cmd: StorageCommand,
    json: bool,
) -> Result<()> {
    match cmd {
        StorageCommand::Info => {
            let info = engine.storage_info().await?;
            if json {
                return print_json(&info);
            }
            human::print_storage_info(&info);
        }
        StorageCommand::Backup { name } => {
            let path = engine.create_backup(name.as_deref()).await?;
            if json {
                return print_json(&serde_json::json!({ "backup": path }));
            }
            match path {
                Some(path) => println!("✓ Backup written to {}", path.display()),
                None => println!("Nothing to back up yet (no cache file)"),
            }
        }
        StorageCommand::Clear { yes } => {
            if !yes && !confirm("Clear all repositories, components and dependencies?")? {
                println!("Aborted");
                return Ok(());
            }
            let backup = engine.clear().await?;
            if json {
                return print_json(&serde_json::json!({ "cleared": true, "backup": backup }));
            }
            println!("✓ {}", "Discovery state cleared".green());
            if let Some(path) = backup {
                println!("  Previous state saved to {}", path.display());
            }
        }
    }
    Ok(())
}

fn confirm(question: &str) -> io::Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let response = input.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}
