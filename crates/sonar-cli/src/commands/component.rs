use crate::formatters::{human, print_json};
use anyhow::{Context, Result};
use clap::Subcommand;
use sonar_core::DependencyKind;
use sonar_engine::DiscoveryEngine;

#[derive(Subcommand, Debug)]
pub enum ComponentCommand {
    /// Create a component
    Add {
        /// Letters, digits, '-' and '_' (at most 64)
        name: String,

        /// What the component does
        #[arg(long, default_value = "")]
        purpose: String,

        /// Why these repositories belong together
        #[arg(long, default_value = "")]
        rationale: String,
    },

    /// Add a repository to a component
    Assign { repository: String, component: String },

    /// Remove a repository from a component
    Unassign { repository: String, component: String },

    /// Mark a single-repository component as intentional
    Standalone {
        component: String,

        /// Clear the flag instead of setting it
        #[arg(long)]
        unset: bool,
    },

    /// Show every component with sizing and technology
    List,
}

#[derive(Subcommand, Debug)]
pub enum DependencyCommand {
    /// Record that SOURCE depends on TARGET
    Add {
        source: String,
        target: String,

        #[arg(long, default_value = "unknown", value_parser = ["build", "runtime", "config", "unknown"])]
        kind: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Where the dependency was observed (file, config key, ...)
        #[arg(long, default_value = "")]
        evidence: String,
    },
}

pub async fn handle_component_command(
    engine: &DiscoveryEngine,
    cmd: ComponentCommand,
    json: bool,
) -> Result<()> {
    match cmd {
        ComponentCommand::Add {
            name,
            purpose,
            rationale,
        } => {
            let component = engine
                .add_component(&name, &purpose, &rationale)
                .await
                .with_context(|| format!("Failed to add component '{}'", name))?;
            if json {
                return print_json(&component);
            }
            println!("✓ Added component: {}", component.name);
        }
        ComponentCommand::Assign {
            repository,
            component,
        } => {
            let added = engine
                .assign_repository_to_component(&repository, &component)
                .await
                .with_context(|| format!("Failed to assign '{}' to '{}'", repository, component))?;
            if json {
                return print_json(&serde_json::json!({ "changed": added }));
            }
            if added {
                println!("✓ Assigned {} to {}", repository, component);
            } else {
                println!("{} is already in {}", repository, component);
            }
        }
        ComponentCommand::Unassign {
            repository,
            component,
        } => {
            let removed = engine
                .unassign_repository(&repository, &component)
                .await
                .with_context(|| format!("Failed to unassign '{}' from '{}'", repository, component))?;
            if json {
                return print_json(&serde_json::json!({ "changed": removed }));
            }
            if removed {
                println!("✓ Removed {} from {}", repository, component);
            } else {
                println!("{} was not in {}", repository, component);
            }
        }
        ComponentCommand::Standalone { component, unset } => {
            engine
                .set_component_standalone(&component, !unset)
                .await
                .with_context(|| format!("Failed to update component '{}'", component))?;
            if json {
                return print_json(&serde_json::json!({ "component": component, "standalone": !unset }));
            }
            let state = if unset { "no longer standalone" } else { "standalone" };
            println!("✓ {} is {}", component, state);
        }
        ComponentCommand::List => {
            let summary = engine.get_components_summary().await;
            if json {
                return print_json(&summary);
            }
            human::print_components(&summary);
        }
    }
    Ok(())
}

pub async fn handle_dependency_command(
    engine: &DiscoveryEngine,
    cmd: DependencyCommand,
    json: bool,
) -> Result<()> {
    match cmd {
        DependencyCommand::Add {
            source,
            target,
            kind,
            description,
            evidence,
        } => {
            let record = engine
                .add_repository_dependency(
                    &source,
                    &target,
                    DependencyKind::from_name(&kind),
                    &description,
                    &evidence,
                )
                .await
                .with_context(|| format!("Failed to record {} → {}", source, target))?;
            if json {
                return print_json(&record);
            }
            println!("✓ Recorded {} → {} ({})", record.source_repo, record.target_repo, record.kind);
        }
    }
    Ok(())
}
