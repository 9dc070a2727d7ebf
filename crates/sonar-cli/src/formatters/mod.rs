//! Output formatters for discovery results.

pub mod human;
pub mod json;

pub use json::print_json;
