//! Async filesystem abstraction for Sonar.
//!
//! The discovery cache and the configuration manager never touch `std::fs`
//! directly; they go through the [`FileSystem`] trait so every path is checked
//! against a root directory and blocking I/O stays off the async runtime.
//!
//! # Example
//!
//! ```no_run
//! use sonar_fs::{FileSystem, NativeFileSystem};
//! use std::sync::Arc;
//! use std::path::Path;
//!
//! # #[tokio::main]
//! # async fn main() -> std::io::Result<()> {
//! let fs = Arc::new(NativeFileSystem::new(".discovery_cache")?);
//! let contents = fs.read_to_string(Path::new("discovery_cache.json")).await?;
//! println!("{}", contents);
//! # Ok(())
//! # }
//! ```

mod file_system;
pub use file_system::{FileMetadata, FileSystem};

pub mod native;
pub use native::NativeFileSystem;
