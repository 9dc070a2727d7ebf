//! Sonar CLI - repository discovery with persistent memory.

mod commands;
mod formatters;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{ComponentCommand, ConfigCommand, DependencyCommand, ReportArgs, StorageCommand};
use sonar_config::ConfigManager;
use sonar_engine::DiscoveryEngine;
use std::path::PathBuf;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sonar")]
#[command(about = "Discover, classify and remember what lives in a directory of repositories", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the repositories (overrides scan.repos_path)
    #[arg(long, global = true, value_name = "DIR")]
    repos: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Manage sonar configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    #[command(flatten)]
    Engine(EngineCommand),
}

/// Commands that work on the discovery state
#[derive(clap::Subcommand, Debug)]
enum EngineCommand {
    /// Scan the repositories root (cached after the first run)
    Scan {
        /// Rescan even when a cached analysis exists
        #[arg(long)]
        force: bool,
    },

    /// List repositories
    Repos {
        /// Only repositories without stored insights
        #[arg(long)]
        unanalyzed: bool,
    },

    /// Store insights for a repository
    ///
    /// Example: sonar insights orders-api '{"business_domain": "orders"}'
    Insights {
        repository: String,

        /// JSON object, or @FILE to read one from disk
        insights: String,
    },

    /// Store a deep analysis write-up for a repository
    Deep {
        repository: String,

        /// Markdown file with the analysis
        #[arg(long, value_name = "FILE")]
        summary_file: PathBuf,

        /// Structured findings as a JSON object, or @FILE
        #[arg(long, value_name = "JSON")]
        insights: Option<String>,
    },

    /// Manage logical components
    Component {
        #[command(subcommand)]
        command: ComponentCommand,
    },

    /// Record dependencies between repositories
    Dependency {
        #[command(subcommand)]
        command: DependencyCommand,
    },

    /// Show one repository with its dependencies
    Details { repository: String },

    /// Show the repository dependency graph
    Graph {
        /// Print Mermaid text only
        #[arg(long)]
        mermaid: bool,

        /// Include evidence on edges
        #[arg(long)]
        evidence: bool,
    },

    /// Check component assignments and sizing
    Validate,

    /// Generate the markdown discovery report
    Report(ReportArgs),

    /// Inspect, back up or clear the discovery cache
    Storage {
        #[command(subcommand)]
        command: StorageCommand,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = Runtime::new().context("Failed to create tokio runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let command = match cli.command {
        Command::Config { command } => {
            return commands::handle_config_command(command, cli.config.as_deref(), cli.json).await
        }
        Command::Engine(command) => command,
    };

    let manager = ConfigManager::resolve(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    tracing::debug!(source = %manager.source(), path = %manager.config_path().display(), "Configuration resolved");
    let mut config = manager.into_config();
    if let Some(repos) = cli.repos {
        config.scan.repos_path = Some(repos);
    }

    let engine = DiscoveryEngine::from_config(&config)
        .await
        .context("Failed to start discovery engine")?;
    let json = cli.json;

    match command {
        EngineCommand::Scan { force } => commands::scan(&engine, force, json).await,
        EngineCommand::Repos { unanalyzed } => {
            commands::list_repositories(&engine, unanalyzed, json).await
        }
        EngineCommand::Insights {
            repository,
            insights,
        } => commands::store_insights(&engine, &repository, &insights, json).await,
        EngineCommand::Deep {
            repository,
            summary_file,
            insights,
        } => {
            commands::store_deep_analysis(&engine, &repository, &summary_file, insights.as_deref(), json)
                .await
        }
        EngineCommand::Component { command } => {
            commands::handle_component_command(&engine, command, json).await
        }
        EngineCommand::Dependency { command } => {
            commands::handle_dependency_command(&engine, command, json).await
        }
        EngineCommand::Details { repository } => {
            commands::show_details(&engine, &repository, json).await
        }
        EngineCommand::Graph { mermaid, evidence } => {
            commands::show_graph(&engine, mermaid, evidence, json).await
        }
        EngineCommand::Validate => commands::validate(&engine, json).await,
        EngineCommand::Report(args) => commands::report(&engine, args).await,
        EngineCommand::Storage { command } => {
            commands::handle_storage_command(&engine, command, json).await
        }
    }
}

/// Logs go to stderr so `--json` output stays parseable. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn default_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["sonar", "repos", "--unanalyzed", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Command::Engine(EngineCommand::Repos { unanalyzed: true })
        ));
    }

    #[test]
    fn test_component_subcommands() {
        let cli = Cli::try_parse_from([
            "sonar", "component", "add", "payments", "--purpose", "Card processing",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Engine(EngineCommand::Component {
                command: ComponentCommand::Add { ref name, .. }
            }) if name == "payments"
        ));
    }

    #[test]
    fn test_dependency_kind_is_checked() {
        let result = Cli::try_parse_from([
            "sonar", "dependency", "add", "web", "api", "--kind", "telepathy",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(0), "warn");
        assert_eq!(default_log_level(1), "info");
        assert_eq!(default_log_level(5), "trace");
    }
}
