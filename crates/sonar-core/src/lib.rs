//! Sonar Core - data model and validation for repository discovery.
//!
//! This crate holds the types persisted in the discovery cache and the
//! read-only logic computed over them:
//!
//! - [`AnalysisState`]: the aggregate root (repositories, components, dependencies)
//! - [`ProgressMetrics`]: analysis, investigation and assignment progress
//! - [`ValidationEngine`]: coverage, component sizing and consistency checks
//! - [`CycleDetector`]: dependency cycle detection over repository names
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  sonar-cli  │  (User interface)
//! └──────┬──────┘
//!        ▼
//! ┌─────────────┐     ┌──────────────┐
//! │sonar-engine │────▶│ sonar-report │
//! └──┬───────┬──┘     └──────┬───────┘
//!    ▼       ▼               │
//! ┌──────┐ ┌───────────┐     │
//! │ scan │ │   store   │     │
//! └──┬───┘ └─────┬─────┘     │
//!    ▼           ▼           ▼
//! ┌─────────────────────────────┐
//! │ sonar-core (this crate)     │
//! └─────────────────────────────┘
//! ```

pub mod cycles;
pub mod error;
pub mod metrics;
pub mod names;
pub mod technology;
pub mod types;
pub mod validation;

pub use cycles::CycleDetector;
pub use error::{EntityKind, Error, Result};
pub use metrics::{percentage, ProgressMetrics};
pub use names::validate_component_name;
pub use technology::language_for_extension;
pub use types::{
    AnalysisState, AnalysisStatus, ComponentRecord, DeepAnalysis, DependencyKind,
    DependencyRecord, InsightValue, Insights, RepositoryRecord, RepositoryType, StateMetadata,
    NO_EXTENSION, OTHERS_BUCKET, SCHEMA_VERSION,
};
pub use validation::{
    ComponentAssessment, SizeCategory, ValidationEngine, ValidationPolicy, ValidationReport,
};
