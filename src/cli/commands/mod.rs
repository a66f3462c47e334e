//! CLI command implementations
//!
//! Each command module handles argument parsing and execution for a
//! specific CLI command.

pub mod build;
pub mod clear;
pub mod completions;
pub mod config;
pub mod search;
pub mod status;

// Re-export argument types for use in mod.rs
pub use build::BuildArgs;
pub use clear::ClearArgs;
pub use completions::CompletionsArgs;
pub use config::ConfigArgs;
pub use search::SearchArgs;
pub use status::StatusArgs;
