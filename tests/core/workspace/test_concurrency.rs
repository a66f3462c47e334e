// Integration tests for cancellation, single-flight builds and
// searches that overlap a rebuild.
//
// Most run on the current-thread runtime, so a spawned build only
// advances while the test task is parked on an await.

use crate::common::{
    build_default, create_test_workspace, open_test_workspace, search_paths, TestRepo,
};
use codeindex::core::config::IndexOptionsOverride;
use codeindex::core::storage::{EngineQuery, IndexEngine, RestoreOutcome, TantivyEngine};
use codeindex::{
    Document, ErrorCode, IndexError, IndexState, Result, SearchHit, SearchRequest,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static SNAPSHOT_WRITTEN: AtomicBool = AtomicBool::new(false);
static RELEASE_PERSIST: AtomicBool = AtomicBool::new(false);

/// Engine that writes its snapshot, then holds the build until released
struct PausingEngine(TantivyEngine);

impl IndexEngine for PausingEngine {
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

    fn persist(&self, path: &Path) -> Result<()> {
        self.0.persist(path)?;
        SNAPSHOT_WRITTEN.store(true, Ordering::SeqCst);
        while !RELEASE_PERSIST.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(())
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
async fn test_cancel_keeps_previous_index() {
    let repo = TestRepo::medium();
    let test = create_test_workspace(repo.path());
    let first = build_default(&test).await;

    let index_file = test.workspace.index_paths().index_file.clone();
    let before = std::fs::read(&index_file).unwrap();

    std::fs::write(repo.path().join("src/extra.rs"), "pub fn extra() {}").unwrap();

    let mut handle = test
        .workspace
        .spawn_build(&IndexOptionsOverride::default())
        .unwrap();

    // Wait until the build is actually running, then cancel
    let event = handle.progress.recv().await;
    assert!(event.is_some());
    handle.cancel.cancel();

    let response = handle.wait().await;
    assert!(!response.success);
    assert!(response.is_cancelled());
    assert_eq!(response.error_code, Some(ErrorCode::Cancelled));

    let status = test.workspace.get_status();
    assert_eq!(status.state, IndexState::Idle);
    assert_eq!(status.document_count, first.document_count);
    assert_eq!(std::fs::read(&index_file).unwrap(), before);
}

#[tokio::test]
async fn test_cancel_build_through_workspace() {
    let repo = TestRepo::medium();
    let test = create_test_workspace(repo.path());

    let mut handle = test
        .workspace
        .spawn_build(&IndexOptionsOverride::default())
        .unwrap();
    handle.progress.recv().await;

    assert!(test.workspace.cancel_build());
    let response = handle.wait().await;
    assert_eq!(response.error_code, Some(ErrorCode::Cancelled));
    assert!(!test.workspace.cancel_build());

    // The slot is free again
    let response = build_default(&test).await;
    assert_eq!(response.file_count, 50);
}

#[tokio::test]
async fn test_single_flight() {
    let repo = TestRepo::medium();
    let test = create_test_workspace(repo.path());

    let handle = test
        .workspace
        .spawn_build(&IndexOptionsOverride::default())
        .unwrap();

    let second = test
        .workspace
        .build_index(&IndexOptionsOverride::default(), None)
        .await;
    assert!(!second.success);
    assert_eq!(second.error_code, Some(ErrorCode::IndexBuilding));

    let err = test
        .workspace
        .spawn_build(&IndexOptionsOverride::default())
        .unwrap_err();
    assert!(matches!(err, IndexError::BuildInProgress));
    assert_eq!(err.code(), ErrorCode::IndexBuilding);

    let first = handle.wait().await;
    assert!(first.success, "{first:?}");
    assert_eq!(first.file_count, 50);
    assert_eq!(test.workspace.get_status().state, IndexState::Ready);
}

#[tokio::test]
async fn test_search_during_first_build() {
    let repo = TestRepo::small();
    let test = create_test_workspace(repo.path());

    let handle = test
        .workspace
        .spawn_build(&IndexOptionsOverride::default())
        .unwrap();

    let err = test
        .workspace
        .search(&SearchRequest::new("config"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::IndexBuilding);

    assert!(handle.wait().await.success);
    assert!(!search_paths(&test, "config").await.is_empty());
}

#[tokio::test]
async fn test_search_during_rebuild_sees_previous_generation() {
    let repo = TestRepo::with_files(&[("old.rs", "fn alpha() {}")]);
    let test = create_test_workspace(repo.path());
    build_default(&test).await;

    std::fs::remove_file(repo.path().join("old.rs")).unwrap();
    std::fs::write(repo.path().join("new.rs"), "fn beta() {}").unwrap();

    let handle = test
        .workspace
        .spawn_build(&IndexOptionsOverride::default())
        .unwrap();

    // Answered from the generation that was live when the search began
    assert_eq!(search_paths(&test, "alpha").await, vec!["old.rs"]);

    assert!(handle.wait().await.success);
    assert!(search_paths(&test, "alpha").await.is_empty());
    assert_eq!(search_paths(&test, "beta").await, vec!["new.rs"]);
}

#[tokio::test]
async fn test_clear_during_build() {
    let repo = TestRepo::medium();
    let test = create_test_workspace(repo.path());

    let handle = test
        .workspace
        .spawn_build(&IndexOptionsOverride::default())
        .unwrap();
    test.workspace.clear_index().unwrap();

    let response = handle.wait().await;
    assert!(response.is_cancelled());

    let status = test.workspace.get_status();
    assert_eq!(status.state, IndexState::Idle);
    assert_eq!(status.document_count, 0);
    assert!(!test.workspace.index_paths().index_file.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_searches_while_building() {
    let repo = TestRepo::medium();
    let test = create_test_workspace(repo.path());
    build_default(&test).await;

    let handle = test
        .workspace
        .spawn_build(&IndexOptionsOverride::default())
        .unwrap();

    let searches: Vec<_> = (0..8)
        .map(|i| {
            let workspace = test.workspace.clone();
            tokio::spawn(async move {
                workspace
                    .search(&SearchRequest::new(format!("function_{i}")))
                    .await
            })
        })
        .collect();

    for search in searches {
        let response = search.await.unwrap().unwrap();
        assert!(!response.results.is_empty());
    }

    assert!(handle.wait().await.success);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_clear_after_snapshot_written_discards_build() {
    let repo = TestRepo::with_files(&[("lib.rs", "pub fn paused() {}")]);
    let test = open_test_workspace::<PausingEngine>(repo.path());
    let paths = test.workspace.index_paths().clone();

    let handle = test
        .workspace
        .spawn_build(&IndexOptionsOverride::default())
        .unwrap();

    // The build is now past its last cancellation check
    while !SNAPSHOT_WRITTEN.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert!(paths.index_file.exists());

    test.workspace.clear_index().unwrap();
    RELEASE_PERSIST.store(true, Ordering::SeqCst);

    let response = handle.wait().await;
    assert!(!response.success);
    assert!(response.is_cancelled());

    let status = test.workspace.get_status();
    assert_eq!(status.state, IndexState::Idle);
    assert_eq!(status.document_count, 0);
    assert!(status.index_file_path.is_none());
    assert!(!paths.index_file.exists());
    assert!(!paths.meta_file.exists());

    let err = test
        .workspace
        .search(&SearchRequest::new("paused"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::IndexNotFound);

    // The next build is unaffected by the earlier clear
    let response = build_default(&test).await;
    assert_eq!(response.file_count, 1);
    assert!(paths.index_file.exists());
    assert!(paths.meta_file.exists());
}
