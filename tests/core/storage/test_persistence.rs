// Integration tests for index persistence and failure isolation

use crate::common::{build_default, create_test_workspace, test_config, TestRepo};
use codeindex::core::config::IndexOptionsOverride;
use codeindex::core::services::Workspace;
use codeindex::core::storage::{
    workspace_key, EngineQuery, IndexEngine, RestoreOutcome, TantivyEngine, METADATA_VERSION,
    SNAPSHOT_VERSION,
};
use codeindex::{
    Document, ErrorCode, IndexError, IndexState, Result, SearchHit, SearchRequest,
};
use std::path::Path;
use tempfile::TempDir;

/// Engine whose persist step always fails
struct FailingEngine(TantivyEngine);

impl IndexEngine for FailingEngine {
    fn create() -> Result<Self> {
        Ok(Self(TantivyEngine::create()?))
    }

    fn insert_many(&self, documents: &[Document]) -> Result<()> {
        self.0.insert_many(documents)
    }

    fn remove_many(&self, ids: &[String]) -> Result<()> {
        self.0.remove_many(ids)
    }

    fn clear(&self) -> Result<()> {
        self.0.clear()
    }

    fn count(&self) -> usize {
        self.0.count()
    }

    fn search(&self, term: &str, query: &EngineQuery) -> Result<Vec<SearchHit>> {
        self.0.search(term, query)
    }

    fn persist(&self, _path: &Path) -> Result<()> {
        Err(IndexError::Engine("simulated disk failure".to_string()))
    }

    fn restore(path: &Path) -> RestoreOutcome<Self> {
        match TantivyEngine::restore(path) {
            RestoreOutcome::Restored(engine) => RestoreOutcome::Restored(Self(engine)),
            RestoreOutcome::FileMissing => RestoreOutcome::FileMissing,
            RestoreOutcome::Corrupt(reason) => RestoreOutcome::Corrupt(reason),
        }
    }
}

#[tokio::test]
async fn test_reopen_restores_persisted_index() {
    let repo = TestRepo::small();
    let store = TempDir::new().unwrap();

    let first: Workspace = Workspace::open(repo.path(), test_config(&store)).unwrap();
    let response = first
        .build_index(&IndexOptionsOverride::default(), None)
        .await;
    assert!(response.success);
    drop(first);

    let reopened: Workspace = Workspace::open(repo.path(), test_config(&store)).unwrap();
    let status = reopened.get_status();
    assert_eq!(status.state, IndexState::Ready);
    assert_eq!(status.document_count, response.document_count);
    assert_eq!(status.file_count, response.file_count);
    assert_eq!(status.index_file_path, response.index_file_path);

    let results = reopened
        .search(&SearchRequest::new("load_config"))
        .await
        .unwrap();
    assert!(!results.results.is_empty());
}

#[tokio::test]
async fn test_snapshot_and_metadata_layout() {
    let repo = TestRepo::with_files(&[("lib.rs", "pub fn layout() {}")]);
    let test = create_test_workspace(repo.path());
    build_default(&test).await;

    let paths = test.workspace.index_paths();
    let key = workspace_key(test.workspace.root());
    assert_eq!(key.len(), 16);
    assert_eq!(
        paths.index_file.file_name().unwrap().to_str().unwrap(),
        format!("{key}.json")
    );

    let snapshot: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&paths.index_file).unwrap()).unwrap();
    assert_eq!(snapshot["formatVersion"], SNAPSHOT_VERSION);
    assert_eq!(snapshot["documents"].as_array().unwrap().len(), 1);
    assert_eq!(snapshot["documents"][0]["filePath"], "lib.rs");

    let metadata = paths.read_metadata().unwrap().expect("metadata written");
    assert_eq!(metadata.format_version, METADATA_VERSION);
    assert_eq!(metadata.file_count, 1);
    assert_eq!(metadata.document_count, 1);
    assert_eq!(metadata.workspace_root, test.workspace.root());
    assert_eq!(metadata.options.chunk_size, 1000);

    // No temp file is left behind
    let leftovers: Vec<_> = std::fs::read_dir(paths.index_file.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_distinct_roots_get_distinct_files() {
    let repo_a = TestRepo::with_files(&[("a.rs", "fn a() {}")]);
    let repo_b = TestRepo::with_files(&[("b.rs", "fn b() {}")]);
    let store = TempDir::new().unwrap();

    let a: Workspace = Workspace::open(repo_a.path(), test_config(&store)).unwrap();
    let b: Workspace = Workspace::open(repo_b.path(), test_config(&store)).unwrap();
    assert_ne!(a.index_paths().index_file, b.index_paths().index_file);

    let again: Workspace = Workspace::open(repo_a.path(), test_config(&store)).unwrap();
    assert_eq!(a.index_paths().index_file, again.index_paths().index_file);
}

#[tokio::test]
async fn test_corrupt_index_is_replaced_by_next_build() {
    let repo = TestRepo::with_files(&[("lib.rs", "pub fn recover() {}")]);
    let store = TempDir::new().unwrap();

    let probe: Workspace = Workspace::open(repo.path(), test_config(&store)).unwrap();
    let index_file = probe.index_paths().index_file.clone();
    probe.index_paths().ensure_dir().unwrap();
    std::fs::write(&index_file, b"{\"documents\": [").unwrap();
    drop(probe);

    let workspace: Workspace = Workspace::open(repo.path(), test_config(&store)).unwrap();
    assert_eq!(workspace.get_status().state, IndexState::Idle);

    let response = workspace
        .build_index(&IndexOptionsOverride::default(), None)
        .await;
    assert!(response.success);
    assert!(matches!(
        TantivyEngine::restore(&index_file),
        RestoreOutcome::Restored(_)
    ));
}

#[tokio::test]
async fn test_persist_failure_keeps_previous_index() {
    let repo = TestRepo::with_files(&[("lib.rs", "pub fn original() {}")]);
    let store = TempDir::new().unwrap();

    // A good first build
    let good: Workspace = Workspace::open(repo.path(), test_config(&store)).unwrap();
    let response = good.build_index(&IndexOptionsOverride::default(), None).await;
    assert!(response.success);
    let index_file = good.index_paths().index_file.clone();
    let before = std::fs::read(&index_file).unwrap();
    drop(good);

    std::fs::write(repo.path().join("extra.rs"), "pub fn added() {}").unwrap();

    let failing: Workspace<FailingEngine> =
        Workspace::open(repo.path(), test_config(&store)).unwrap();
    assert_eq!(failing.get_status().state, IndexState::Ready);

    let response = failing
        .build_index(&IndexOptionsOverride::default(), None)
        .await;
    assert!(!response.success);
    assert_eq!(response.error_code, Some(ErrorCode::DatabaseError));
    assert!(response
        .error_message
        .as_deref()
        .unwrap()
        .contains("simulated disk failure"));

    let status = failing.get_status();
    assert_eq!(status.state, IndexState::Error);
    assert!(status.error_message.is_some());
    // The live generation was not replaced
    assert_eq!(status.document_count, 1);

    assert_eq!(std::fs::read(&index_file).unwrap(), before);
}

#[tokio::test]
async fn test_rebuild_after_failure_recovers() {
    let repo = TestRepo::with_files(&[("lib.rs", "pub fn retry() {}")]);
    let store = TempDir::new().unwrap();

    let failing: Workspace<FailingEngine> =
        Workspace::open(repo.path(), test_config(&store)).unwrap();
    let response = failing
        .build_index(&IndexOptionsOverride::default(), None)
        .await;
    assert_eq!(response.error_code, Some(ErrorCode::DatabaseError));
    assert!(!failing.index_paths().index_file.exists());
    drop(failing);

    let workspace: Workspace = Workspace::open(repo.path(), test_config(&store)).unwrap();
    let response = workspace
        .build_index(&IndexOptionsOverride::default(), None)
        .await;
    assert!(response.success);
    assert_eq!(workspace.get_status().state, IndexState::Ready);
}
