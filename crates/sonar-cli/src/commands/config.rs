use crate::formatters::print_json;
use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use sonar_config::{ConfigManager, LOCAL_CONFIG_FILE};
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a config file with default settings
    Init {
        /// Write ~/.sonar/config.toml instead of ./sonar.toml
        #[arg(long)]
        global: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the active configuration
    Show,

    /// Print where the active configuration comes from
    Path,
}

pub async fn handle_config_command(
    cmd: ConfigCommand,
    explicit: Option<&Path>,
    json: bool,
) -> Result<()> {
    match cmd {
        ConfigCommand::Init { global, force } => {
            let path = init_path(explicit, global)?;
            let manager = ConfigManager::init_at(&path, force)
                .await
                .with_context(|| format!("Failed to initialize {}", path.display()))?;
            if json {
                return print_json(&serde_json::json!({ "path": manager.config_path() }));
            }
            println!("✓ Created {}", manager.config_path().display());
        }
        ConfigCommand::Show => {
            let manager = ConfigManager::resolve(explicit).await?;
            if json {
                return print_json(manager.config());
            }
            println!(
                "# {} ({})",
                manager.config_path().display(),
                manager.source().to_string().dimmed()
            );
            let text = toml::to_string_pretty(manager.config())
                .context("Failed to serialize configuration")?;
            print!("{}", text);
        }
        ConfigCommand::Path => {
            let manager = ConfigManager::resolve(explicit).await?;
            if json {
                return print_json(&serde_json::json!({
                    "path": manager.config_path(),
                    "source": manager.source().to_string(),
                }));
            }
            println!("{} ({})", manager.config_path().display(), manager.source());
        }
    }
    Ok(())
}

fn init_path(explicit: Option<&Path>, global: bool) -> Result<PathBuf> {
    match (explicit, global) {
        (Some(path), _) => Ok(path.to_path_buf()),
        (None, true) => Ok(ConfigManager::global_config_path()?),
        (None, false) => Ok(PathBuf::from(LOCAL_CONFIG_FILE)),
    }
}
