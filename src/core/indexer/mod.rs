//! Document indexing module.
//!
//! Handles file traversal, text chunking and build orchestration.
//! Key features:
//!
//! - UTF-8 safe, line-bounded chunking with configurable overlap
//! - File system walking with glob exclusion and extension gating
//! - Batched, cancellable build into a fresh engine generation
//! - Progress reporting over a channel
//!
//! # Safety
//!
//! Chunk sizes are measured in characters, never bytes, so files
//! containing emojis or other multi-byte sequences cannot skew
//! chunk boundaries.

pub mod chunker;
pub mod language;
pub mod pipeline;
pub mod walker;

pub use chunker::Chunker;
pub use language::language_for_path;
pub use pipeline::{BuiltGeneration, IndexingPipeline, ProgressReceiver, ProgressSender};
pub use walker::FileWalker;
