//! Sonar Scan - repository discovery and parallel analysis
//!
//! ```text
//! repos root ──find_repositories──► [paths]
//!                                      │
//!                         AnalysisCoordinator (≤ 8 workers)
//!                                      │
//!                  RepositoryScanner ×N (spawn_blocking, no shared state)
//!                    ├─ walk (ignore::WalkBuilder, file cap, size ceiling)
//!                    ├─ FrameworkDetector on recognised manifests
//!                    └─ classify
//!                                      │
//!                        ScanOutcome {name, path, result}
//! ```

pub mod classify;
pub mod coordinator;
pub mod discover;
mod error;
pub mod filters;
pub mod scanner;

pub use classify::{classify, Classification, RepositoryProfile};
pub use coordinator::{
    AnalysisCoordinator, BatchResult, ScanFailure, ScanOutcome, ScanProgress, DEFAULT_WORKERS,
    MAX_WORKERS,
};
pub use discover::{find_repositories, repository_name};
pub use error::{Result, ScanError};
pub use filters::IgnoreRules;
pub use scanner::{count_lines, extension_key, fold_histogram, RepositoryScanner, ScanOptions};
