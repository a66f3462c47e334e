//! codeindex - BM25 code search for a workspace
//!
//! Walks a directory tree, splits every eligible file into
//! overlapping line-bounded chunks, indexes them with BM25 via
//! Tantivy and answers ranked term queries. Builds run as
//! cancellable background tasks with streamed progress, and each
//! workspace's index is persisted to a single snapshot file.
//!
//! # Architecture
//!
//! - **core**: Domain logic (interface-agnostic)
//!   - config, error, types, xdg, cancel
//!   - storage (engine contract, Tantivy engine, index files)
//!   - search (query validation, result filters)
//!   - indexer (file walking, chunking, build pipeline)
//!   - services (per-workspace handle)
//!
//! - **cli**: Command-line adapter (depends on core)
//!
//! # Example
//!
//! ```no_run
//! use codeindex::core::config::IndexOptionsOverride;
//! use codeindex::{Config, SearchRequest, Workspace};
//!
//! # async fn demo() -> codeindex::Result<()> {
//! let workspace: Workspace = Workspace::open("/path/to/repo", Config::load()?)?;
//!
//! let build = workspace
//!     .build_index(&IndexOptionsOverride::default(), None)
//!     .await;
//! assert!(build.success);
//!
//! let response = workspace.search(&SearchRequest::new("parse_config")).await?;
//! for hit in response.results {
//!     println!("{} {:.2}", hit.document.file_path, hit.score);
//! }
//! # Ok(())
//! # }
//! ```

// Core domain logic (interface-agnostic)
pub mod core;

// Command-line adapter
pub mod cli;

// Re-export commonly used types for convenience
pub use core::config::Config;
pub use core::error::{ErrorCode, IndexError, Result};
pub use core::services::{BuildHandle, Workspace};
pub use core::types::*;
