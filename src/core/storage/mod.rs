//! Storage layer for BM25 indexing.
//!
//! This module provides the engine contract the pipeline drives,
//! its Tantivy implementation, and the on-disk layout of each
//! workspace's persisted index.
//!
//! # Architecture
//!
//! - **IndexEngine**: Trait every ranking engine implements
//! - **TantivyEngine**: In-RAM Tantivy index with JSON snapshots
//! - **IndexPaths**: Snapshot and metadata locations per workspace
//! - **BuildMetadata**: Sidecar describing the last successful build

mod engine;
mod metadata;
mod tantivy;

pub use engine::{EngineQuery, IndexEngine, RestoreOutcome};
pub use metadata::{workspace_key, BuildMetadata, IndexPaths, METADATA_VERSION};
pub use self::tantivy::{TantivyEngine, SNAPSHOT_VERSION};
