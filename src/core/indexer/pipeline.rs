//! Indexing pipeline orchestration.
//!
//! Coordinates one build from scratch into a fresh engine
//! generation:
//! 1. Walk directory tree
//! 2. Read file contents batch by batch
//! 3. Chunk text into documents
//! 4. Bulk insert into the engine
//! 5. Persist the engine snapshot
//!
//! The pipeline never touches the live engine. The caller decides
//! whether the returned generation replaces it.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::core::cancel::CancellationToken;
use crate::core::config::IndexOptions;
use crate::core::error::{IndexError, Result};
use crate::core::indexer::language::language_for_path;
use crate::core::indexer::walker::relative_path;
use crate::core::indexer::{Chunker, FileWalker};
use crate::core::storage::{IndexEngine, IndexPaths};
use crate::core::types::{Document, IndexProgress, ProgressPhase};

/// Progress stream sender; the receiver sees the stream end when
/// the build drops it
pub type ProgressSender = mpsc::UnboundedSender<IndexProgress>;

/// Receiving end of a build's progress stream
pub type ProgressReceiver = mpsc::UnboundedReceiver<IndexProgress>;

/// Share of the progress bar covered by the indexing phase
const INDEXING_SPAN: usize = 90;

/// A completed, persisted engine generation
#[derive(Debug)]
pub struct BuiltGeneration<E> {
    pub engine: Arc<E>,
    pub file_count: usize,
    pub document_count: usize,
}

/// Orchestrates the indexing pipeline
pub struct IndexingPipeline {
    walker: Arc<FileWalker>,
    chunker: Chunker,
    batch_size: usize,
}

impl IndexingPipeline {
    /// Create a pipeline for one build
    ///
    /// # Returns
    ///
    /// A new `IndexingPipeline`, or a configuration error when the
    /// options do not validate
    pub fn new(options: &IndexOptions) -> Result<Self> {
        options.validate()?;

        Ok(Self {
            walker: Arc::new(FileWalker::new(options)?),
            chunker: Chunker::new(options.chunk_size, options.chunk_overlap),
            batch_size: options.batch_size,
        })
    }

    /// Index `root` into a new engine generation and persist it
    ///
    /// Cancellation is observed before scanning, between scanned
    /// entries, between batches and once more before persisting. A
    /// batch that has started always completes. Nothing is written
    /// to `paths` unless the build reaches the persist step.
    ///
    /// Per-file read failures are logged and the file skipped; only
    /// engine failures and cancellation fail the build.
    pub async fn run<E: IndexEngine>(
        &self,
        root: &Path,
        paths: &IndexPaths,
        cancel: &CancellationToken,
        progress: Option<&ProgressSender>,
    ) -> Result<BuiltGeneration<E>> {
        let reporter = ProgressReporter { tx: progress };

        cancel.check()?;
        reporter.emit(ProgressPhase::Scanning, 0, 0, None, 0);

        // Step 1: Prepare an empty generation
        let engine = blocking(|| {
            let engine = E::create()?;
            engine.clear()?;
            Ok(Arc::new(engine))
        })
        .await?;

        // Step 2: Collect files
        tracing::info!("Starting file collection from {:?}", root);
        let files = {
            let walker = Arc::clone(&self.walker);
            let root = root.to_path_buf();
            let cancel = cancel.clone();
            blocking(move || walker.collect_files(&root, &cancel)).await?
        };
        let total = files.len();
        tracing::info!("Found {} files to index", total);
        reporter.emit(ProgressPhase::Scanning, 0, total, None, 0);

        // Step 3: Read and chunk files in batches
        let updated_at = Utc::now();
        let mut documents = Vec::new();
        let mut file_count = 0;
        let mut processed = 0;

        for batch in files.chunks(self.batch_size) {
            cancel.check()?;

            for path in batch {
                let file_docs = self.process_file(root, path, updated_at).await;
                if !file_docs.is_empty() {
                    file_count += 1;
                    documents.extend(file_docs);
                }
            }

            processed += batch.len();
            let current = batch.last().and_then(|p| relative_path(root, p));
            reporter.emit(
                ProgressPhase::Indexing,
                processed,
                total,
                current,
                indexing_percentage(processed, total),
            );
        }

        if total == 0 {
            reporter.emit(ProgressPhase::Indexing, 0, 0, None, INDEXING_SPAN as u8);
        }

        // Step 4: Bulk insert
        let document_count = documents.len();
        tracing::info!(
            "Inserting {} documents from {} files",
            document_count,
            file_count
        );
        {
            let engine = Arc::clone(&engine);
            blocking(move || engine.insert_many(&documents)).await?;
        }

        cancel.check()?;

        // Step 5: Persist
        reporter.emit(ProgressPhase::Persisting, processed, total, None, INDEXING_SPAN as u8);
        paths.ensure_dir()?;
        {
            let engine = Arc::clone(&engine);
            let index_file = paths.index_file.clone();
            blocking(move || engine.persist(&index_file)).await?;
        }
        reporter.emit(ProgressPhase::Persisting, processed, total, None, 100);

        Ok(BuiltGeneration {
            engine,
            file_count,
            document_count,
        })
    }

    /// Read and chunk a single file
    ///
    /// Unreadable, non-UTF-8 and whitespace-only files yield no
    /// documents.
    async fn process_file(
        &self,
        root: &Path,
        path: &Path,
        updated_at: DateTime<Utc>,
    ) -> Vec<Document> {
        let Some(relative) = relative_path(root, path) else {
            tracing::warn!("Skipping file outside workspace or with non-UTF-8 path: {:?}", path);
            return Vec::new();
        };

        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                tracing::warn!("Skipping non-UTF-8 file: {}", relative);
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", relative, e);
                return Vec::new();
            }
        };

        if contents.trim().is_empty() {
            tracing::debug!("Skipping empty file: {}", relative);
            return Vec::new();
        }

        let language = language_for_path(path);
        let documents: Vec<Document> = self
            .chunker
            .chunk_text(&contents)
            .into_iter()
            .map(|chunk| Document::from_chunk(&relative, language, chunk, updated_at))
            .collect();

        tracing::debug!("Indexed {} ({} chunks)", relative, documents.len());
        documents
    }
}

/// Indexing progress scaled onto 0-90
fn indexing_percentage(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return INDEXING_SPAN as u8;
    }
    (processed.min(total) * INDEXING_SPAN / total) as u8
}

/// Run blocking engine or file system work off the async workers
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| IndexError::Engine(format!("Blocking task failed: {e}")))?
}

struct ProgressReporter<'a> {
    tx: Option<&'a ProgressSender>,
}

impl ProgressReporter<'_> {
    fn emit(
        &self,
        phase: ProgressPhase,
        processed_files: usize,
        total_files: usize,
        current_file: Option<String>,
        percentage: u8,
    ) {
        let Some(tx) = self.tx else {
            return;
        };

        // A dropped receiver only means nobody is watching
        let _ = tx.send(IndexProgress {
            phase,
            processed_files,
            total_files,
            current_file,
            percentage,
        });
    }
}
