//! Sonar Engine - repository discovery with persistent memory
//!
//! [`DiscoveryEngine`] is the single entry point for collaborators: it scans
//! a directory of repositories once, remembers everything in a JSON cache,
//! and accumulates insights, components and dependencies on top.
//!
//! # Example
//!
//! ```no_run
//! use sonar_config::SonarConfig;
//! use sonar_engine::DiscoveryEngine;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = SonarConfig::default();
//!     config.scan.repos_path = Some("/srv/repos".into());
//!
//!     let engine = DiscoveryEngine::from_config(&config).await?;
//!
//!     // First call scans; later calls read the cache
//!     let repos = engine.get_all_repositories().await?;
//!     println!("{} repositories", repos.len());
//!
//!     engine.add_component("payments", "Card processing", "Shared ledger").await?;
//!     engine.assign_repository_to_component("ledger-api", "payments").await?;
//!
//!     println!("{}", engine.generate_discovery_report().await?);
//!     Ok(())
//! }
//! ```

mod engine;
mod error;

pub use engine::{AnalysisSummary, DiscoveryEngine, FailedScan};
pub use error::{EngineError, Result};

pub use sonar_report::DeepReportOptions;
pub use sonar_scan::ScanProgress;
