//! CLI layer
//!
//! Loads an index snapshot, runs one navigation or refactoring request and
//! prints the response envelope as JSON.

pub mod cli;

// Re-exports
pub use cli::{execute, load_snapshot, parse_target, Cli, Commands};
