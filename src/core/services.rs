//! Per-workspace service handle.
//!
//! A [`Workspace`] owns everything one indexed root needs: the live
//! engine generation, the build status, the on-disk index location
//! and the query service. Front ends hold it in an `Arc` and call
//! into it from any task.
//!
//! # Concurrency
//!
//! - At most one build runs at a time. The check happens under the
//!   status lock, so a concurrent second request is rejected
//!   without touching any state.
//! - The live engine sits behind `RwLock<Arc<E>>`. Searches clone
//!   the `Arc` and query without holding the lock; a build fills a
//!   separate generation and swaps it in only after it persisted.

use chrono::Utc;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::cancel::CancellationToken;
use crate::core::config::{Config, IndexOptions, IndexOptionsOverride};
use crate::core::error::{IndexError, Result};
use crate::core::indexer::{BuiltGeneration, IndexingPipeline, ProgressReceiver, ProgressSender};
use crate::core::search::QueryService;
use crate::core::storage::{
    BuildMetadata, IndexEngine, IndexPaths, RestoreOutcome, TantivyEngine, METADATA_VERSION,
};
use crate::core::types::{
    BuildResponse, IndexState, IndexStatus, SearchRequest, SearchResponse,
};

/// Mutable build bookkeeping, guarded by one lock
#[derive(Debug, Default)]
struct BuildState {
    status: IndexStatus,

    /// Token of the in-flight build
    active: Option<CancellationToken>,

    /// The live engine holds a complete generation
    has_generation: bool,

    /// A clear arrived while the active build was running
    cleared_during_build: bool,
}

/// A build running on the tokio runtime
#[derive(Debug)]
pub struct BuildHandle {
    /// Progress events; the stream ends when the build concludes
    pub progress: ProgressReceiver,

    /// Cancels this build
    pub cancel: CancellationToken,

    pub task: JoinHandle<BuildResponse>,
}

impl BuildHandle {
    /// Wait for the final build response
    pub async fn wait(self) -> BuildResponse {
        match self.task.await {
            Ok(response) => response,
            Err(e) => BuildResponse::failure(
                &IndexError::Engine(format!("Build task failed: {e}")),
                0,
                0,
                0,
            ),
        }
    }
}

/// Index and search handle for one workspace root
pub struct Workspace<E: IndexEngine = TantivyEngine> {
    root: PathBuf,
    config: Arc<Config>,
    paths: IndexPaths,
    query: QueryService,
    engine: RwLock<Arc<E>>,
    state: Mutex<BuildState>,
}

impl<E: IndexEngine> std::fmt::Debug for Workspace<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("root", &self.root)
            .field("index_file", &self.paths.index_file)
            .finish()
    }
}

impl<E: IndexEngine> Workspace<E> {
    /// Open the handle for `root`, restoring a persisted index
    ///
    /// A missing index opens an empty, idle engine. An index that
    /// cannot be read or parsed is logged and treated the same
    /// way; the next successful build overwrites it.
    pub fn open(root: impl AsRef<Path>, config: Config) -> Result<Self> {
        let root = resolve_root(root.as_ref());
        let paths = IndexPaths::for_workspace(&config.storage.index_dir, &root);
        let mut state = BuildState::default();

        let engine = match E::restore(&paths.index_file) {
            RestoreOutcome::Restored(engine) => {
                state.has_generation = true;
                state.status = IndexStatus {
                    state: IndexState::Ready,
                    document_count: engine.count(),
                    index_file_path: Some(paths.index_file.clone()),
                    ..IndexStatus::default()
                };

                match paths.read_metadata() {
                    Ok(Some(metadata)) => {
                        state.status.file_count = metadata.file_count;
                        state.status.last_build_time = Some(metadata.last_build_time);
                    }
                    Ok(None) => tracing::debug!("No build metadata for {:?}", root),
                    Err(e) => tracing::warn!("Ignoring unreadable build metadata: {}", e),
                }

                tracing::info!(
                    "Restored index for {:?} ({} documents)",
                    root,
                    engine.count()
                );
                engine
            }
            RestoreOutcome::FileMissing => {
                tracing::debug!("No persisted index at {:?}", paths.index_file);
                E::create()?
            }
            RestoreOutcome::Corrupt(reason) => {
                tracing::warn!(
                    "Discarding unreadable index {:?}: {}",
                    paths.index_file,
                    reason
                );
                E::create()?
            }
        };

        Ok(Self {
            root,
            query: QueryService::new(&config.search),
            config: Arc::new(config),
            paths,
            engine: RwLock::new(Arc::new(engine)),
            state: Mutex::new(state),
        })
    }

    /// Resolved workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Where this workspace's index is persisted
    pub fn index_paths(&self) -> &IndexPaths {
        &self.paths
    }

    /// Build the index and wait for the result
    ///
    /// Failures come back as an unsuccessful [`BuildResponse`]
    /// carrying an error code, never as a panic or `Err`. The
    /// progress sender, if any, is dropped before this returns.
    pub async fn build_index(
        &self,
        overrides: &IndexOptionsOverride,
        progress: Option<ProgressSender>,
    ) -> BuildResponse {
        let start = Instant::now();

        match self.begin_build(overrides) {
            Ok((options, cancel)) => self.run_build(options, cancel, progress, start).await,
            Err(e) => {
                tracing::warn!("Build rejected: {}", e);
                BuildResponse::failure(&e, 0, 0, elapsed_ms(start))
            }
        }
    }

    /// Start a build on the runtime and return immediately
    ///
    /// The single-flight check runs before this returns, so an
    /// `Err` means nothing was started.
    pub fn spawn_build(self: &Arc<Self>, overrides: &IndexOptionsOverride) -> Result<BuildHandle> {
        let start = Instant::now();
        let (options, cancel) = self.begin_build(overrides)?;
        let (tx, rx) = mpsc::unbounded_channel();

        let workspace = Arc::clone(self);
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            workspace.run_build(options, token, Some(tx), start).await
        });

        Ok(BuildHandle {
            progress: rx,
            cancel,
            task,
        })
    }

    /// Request cancellation of the in-flight build
    ///
    /// Returns whether a build was running.
    pub fn cancel_build(&self) -> bool {
        match &self.lock_state().active {
            Some(token) => {
                tracing::info!("Cancellation requested for build of {:?}", self.root);
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Drop the index from memory and disk
    ///
    /// Idempotent. An in-flight build is asked to cancel and its
    /// result is discarded even if it already persisted; new builds
    /// are accepted once it has wound down.
    pub fn clear_index(&self) -> Result<()> {
        let mut state = self.lock_state();

        if let Some(token) = &state.active {
            token.cancel();
            state.cleared_during_build = true;
        }

        self.live_engine().clear()?;
        self.paths.remove_files()?;

        state.has_generation = false;
        state.status = IndexStatus::default();

        tracing::info!("Cleared index for {:?}", self.root);
        Ok(())
    }

    /// Current status with a live document count
    pub fn get_status(&self) -> IndexStatus {
        let mut status = self.lock_state().status.clone();
        status.document_count = self.live_engine().count();
        status
    }

    /// Search the live generation
    ///
    /// While a rebuild runs, searches are answered from the previous
    /// generation; with no previous generation they are rejected
    /// with `IndexBuilding`.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.query.validate(request)?;

        let engine = {
            let state = self.lock_state();
            match state.status.state {
                IndexState::Ready => {}
                IndexState::Building if state.has_generation => {}
                IndexState::Building => return Err(IndexError::IndexBuilding),
                IndexState::Idle | IndexState::Error => {
                    return Err(IndexError::IndexNotFound(self.root.display().to_string()))
                }
            }
            self.live_engine()
        };

        let query = self.query.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || query.search(engine.as_ref(), &request))
            .await
            .map_err(|e| IndexError::Engine(format!("Search task failed: {e}")))?
    }

    /// Validate and claim the single build slot
    fn begin_build(
        &self,
        overrides: &IndexOptionsOverride,
    ) -> Result<(IndexOptions, CancellationToken)> {
        if !self.root.is_dir() {
            return Err(IndexError::WorkspaceNotFound(
                self.root.display().to_string(),
            ));
        }

        let options = self.config.indexing.merged(overrides);
        options.validate()?;

        let mut state = self.lock_state();
        if state.active.is_some() {
            return Err(IndexError::BuildInProgress);
        }

        let token = CancellationToken::new();
        state.active = Some(token.clone());
        state.cleared_during_build = false;
        state.status.state = IndexState::Building;
        state.status.error_message = None;

        tracing::info!("Starting index build for {:?}", self.root);
        Ok((options, token))
    }

    async fn run_build(
        &self,
        options: IndexOptions,
        cancel: CancellationToken,
        progress: Option<ProgressSender>,
        start: Instant,
    ) -> BuildResponse {
        let result = match IndexingPipeline::new(&options) {
            Ok(pipeline) => {
                pipeline
                    .run::<E>(&self.root, &self.paths, &cancel, progress.as_ref())
                    .await
            }
            Err(e) => Err(e),
        };

        // Ends the caller's progress stream
        drop(progress);

        self.finish_build(result, options, elapsed_ms(start))
    }

    /// Record the outcome and, on success, swap in the new generation
    fn finish_build(
        &self,
        result: Result<BuiltGeneration<E>>,
        options: IndexOptions,
        build_time_ms: u64,
    ) -> BuildResponse {
        let mut state = self.lock_state();
        state.active = None;

        // The clear already reset the status; anything this build
        // wrote after the clear removed the old files goes too
        if std::mem::take(&mut state.cleared_during_build) {
            if let Err(e) = self.paths.remove_files() {
                tracing::warn!("Failed to remove index written after clear: {}", e);
            }
            tracing::info!("Index build discarded after clear ({}ms)", build_time_ms);
            return BuildResponse::failure(&IndexError::Cancelled, 0, 0, build_time_ms);
        }

        match result {
            Ok(built) => {
                let now = Utc::now();
                let metadata = BuildMetadata {
                    workspace_root: self.root.clone(),
                    file_count: built.file_count,
                    document_count: built.document_count,
                    last_build_time: now,
                    options,
                    format_version: METADATA_VERSION,
                };
                if let Err(e) = self.paths.write_metadata(&metadata) {
                    tracing::warn!("Failed to write build metadata: {}", e);
                }

                *self.engine.write().unwrap_or_else(|e| e.into_inner()) = built.engine;

                state.has_generation = true;
                state.status = IndexStatus {
                    state: IndexState::Ready,
                    document_count: built.document_count,
                    file_count: built.file_count,
                    last_build_time: Some(now),
                    index_file_path: Some(self.paths.index_file.clone()),
                    error_message: None,
                };

                tracing::info!(
                    "Index build complete: {} files, {} documents in {}ms",
                    built.file_count,
                    built.document_count,
                    build_time_ms
                );

                BuildResponse::success(
                    built.document_count,
                    built.file_count,
                    build_time_ms,
                    self.paths.index_file.clone(),
                )
            }
            Err(e) if e.is_cancelled() => {
                state.status.state = IndexState::Idle;
                tracing::info!("Index build cancelled after {}ms", build_time_ms);
                BuildResponse::failure(&e, 0, 0, build_time_ms)
            }
            Err(e) => {
                state.status.state = IndexState::Error;
                state.status.error_message = Some(e.message());
                tracing::error!("Index build failed: {}", e);
                BuildResponse::failure(&e, 0, 0, build_time_ms)
            }
        }
    }

    fn live_engine(&self) -> Arc<E> {
        Arc::clone(&self.engine.read().unwrap_or_else(|e| e.into_inner()))
    }

    fn lock_state(&self) -> MutexGuard<'_, BuildState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Canonical absolute root; falls back to an absolute spelling when
/// the path does not exist yet
fn resolve_root(root: &Path) -> PathBuf {
    fs::canonicalize(root).unwrap_or_else(|_| {
        if root.is_absolute() {
            root.to_path_buf()
        } else {
            env::current_dir()
                .map(|cwd| cwd.join(root))
                .unwrap_or_else(|_| root.to_path_buf())
        }
    })
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
