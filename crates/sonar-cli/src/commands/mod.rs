pub mod analysis;
pub mod component;
pub mod config;
pub mod storage;
pub mod views;

pub use analysis::{list_repositories, scan, store_deep_analysis, store_insights};
pub use component::{
    handle_component_command, handle_dependency_command, ComponentCommand, DependencyCommand,
};
pub use config::{handle_config_command, ConfigCommand};
pub use storage::{handle_storage_command, StorageCommand};
pub use views::{report, show_details, show_graph, validate, ReportArgs};
