//! Contract between the indexing pipeline and the ranking engine.
//!
//! The build orchestrator and the query service only ever talk to
//! an engine through [`IndexEngine`]. Every operation takes `&self`
//! so one engine generation can be shared behind an `Arc` while
//! searches run concurrently.

use std::path::Path;

use crate::core::error::Result;
use crate::core::types::{Document, SearchHit, SearchProperty};

/// Parameters for a single engine search
#[derive(Debug, Clone, PartialEq)]
pub struct EngineQuery {
    /// Fields the query runs against
    pub properties: Vec<SearchProperty>,

    /// Maximum number of hits
    pub limit: usize,

    /// Fraction of query terms a hit may miss, in `[0, 1]`
    pub threshold: f32,
}

impl Default for EngineQuery {
    fn default() -> Self {
        Self {
            properties: vec![SearchProperty::Content, SearchProperty::FilePath],
            limit: 10,
            threshold: 0.0,
        }
    }
}

/// Outcome of restoring an engine from disk
#[derive(Debug)]
pub enum RestoreOutcome<E> {
    Restored(E),
    FileMissing,
    Corrupt(String),
}

/// Full-text ranking engine
pub trait IndexEngine: Send + Sync + Sized + 'static {
    /// Create an empty, queryable engine
    fn create() -> Result<Self>;

    /// Bulk add; empty input is a no-op and an existing id is replaced
    fn insert_many(&self, documents: &[Document]) -> Result<()>;

    /// Bulk delete by document id
    fn remove_many(&self, ids: &[String]) -> Result<()>;

    /// Drop every document, leaving the engine empty but usable
    fn clear(&self) -> Result<()>;

    /// Current document count
    fn count(&self) -> usize;

    /// Ranked hits for `term`; an empty engine yields no hits
    fn search(&self, term: &str, query: &EngineQuery) -> Result<Vec<SearchHit>>;

    /// Serialize the full engine state to a single file
    fn persist(&self, path: &Path) -> Result<()>;

    /// Rebuild an engine from a file written by [`IndexEngine::persist`]
    fn restore(path: &Path) -> RestoreOutcome<Self>;
}
