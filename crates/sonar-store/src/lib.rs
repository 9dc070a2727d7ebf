//! Sonar Store - the persistent discovery cache.
//!
//! One JSON document holds every repository record, component and dependency
//! edge. [`AnalysisStateStore`] is the only writer: it serialises mutations,
//! writes atomically and keeps a rolling backup it can recover from.
//!
//! ```text
//! .discovery_cache/
//! ├── discovery_cache.json          current state
//! ├── discovery_cache.json.backup   previous state (rolling)
//! ├── discovery_cache.json.tmp      in-flight write
//! └── discovery_backup_<ts>.json    snapshots taken on request
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sonar_store::AnalysisStateStore;
//!
//! # #[tokio::main]
//! # async fn main() -> sonar_store::Result<()> {
//! let store = AnalysisStateStore::open_default(".discovery_cache").await?;
//! store.add_component("payments", "Card processing", "Shared PCI scope").await?;
//! println!("{} components", store.snapshot().await.components.len());
//! # Ok(())
//! # }
//! ```

mod error;
pub mod persistence;
pub mod registry;
mod store;

pub use error::{Result, StoreError};
pub use persistence::{CacheFiles, LoadSource, DEFAULT_CACHE_DIR, DEFAULT_CACHE_FILE};
pub use registry::ComponentRegistry;
pub use store::{AnalysisStateStore, StorageInfo};
