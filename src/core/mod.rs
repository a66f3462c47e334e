//! Core domain logic (interface-agnostic)
//!
//! This module contains all indexing and search logic that is
//! independent of the command-line front end.
//!
//! # Architecture
//!
//! - **config**: Configuration loading (TOML + environment)
//! - **error**: Error types, error codes and Result alias
//! - **types**: Domain data structures
//! - **xdg**: XDG directory handling
//! - **cancel**: Cooperative build cancellation
//! - **storage**: Engine contract, Tantivy engine, index locations
//! - **search**: Query validation and result filtering
//! - **indexer**: File walking, chunking and build pipeline
//! - **services**: Per-workspace handle tying it all together

pub mod cancel;
pub mod config;
pub mod error;
pub mod indexer;
pub mod search;
pub mod services;
pub mod storage;
pub mod types;
pub mod xdg;

// Re-export key types for convenience
pub use cancel::CancellationToken;
pub use config::Config;
pub use error::{ErrorCode, IndexError, Result};
pub use services::{BuildHandle, Workspace};
