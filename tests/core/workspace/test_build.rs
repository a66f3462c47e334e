// Integration tests for the build lifecycle

use crate::common::{build_default, create_test_workspace, search_paths, TestRepo};
use codeindex::core::config::IndexOptionsOverride;
use codeindex::{ErrorCode, IndexProgress, IndexState, ProgressPhase};
use std::collections::BTreeSet;
use std::path::Path;

/// Document ids in a persisted snapshot
fn snapshot_ids(index_file: &Path) -> BTreeSet<String> {
    let snapshot: serde_json::Value =
        serde_json::from_slice(&std::fs::read(index_file).unwrap()).unwrap();
    snapshot["documents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|doc| doc["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_status_transitions() {
    let repo = TestRepo::small();
    let test = create_test_workspace(repo.path());

    let status = test.workspace.get_status();
    assert_eq!(status.state, IndexState::Idle);
    assert!(status.last_build_time.is_none());

    let handle = test
        .workspace
        .spawn_build(&IndexOptionsOverride::default())
        .unwrap();
    assert_eq!(test.workspace.get_status().state, IndexState::Building);

    let response = handle.wait().await;
    assert!(response.success, "{response:?}");
    assert!(response.error_code.is_none());

    let status = test.workspace.get_status();
    assert_eq!(status.state, IndexState::Ready);
    assert_eq!(status.file_count, 4);
    assert_eq!(status.document_count, response.document_count);
    assert!(status.last_build_time.is_some());
    assert_eq!(status.index_file_path, response.index_file_path);
    assert!(status.error_message.is_none());
}

#[tokio::test]
async fn test_rebuild_is_idempotent() {
    let repo = TestRepo::medium();
    let test = create_test_workspace(repo.path());

    let first = build_default(&test).await;
    let index_file = test.workspace.index_paths().index_file.clone();
    let first_ids = snapshot_ids(&index_file);

    let second = build_default(&test).await;
    let second_ids = snapshot_ids(&index_file);

    assert_eq!(first.document_count, second.document_count);
    assert_eq!(first.file_count, second.file_count);
    assert_eq!(first_ids, second_ids);
    assert_eq!(first_ids.len(), first.document_count);
}

#[tokio::test]
async fn test_rebuild_picks_up_changes() {
    let repo = TestRepo::with_files(&[
        ("keep.rs", "fn stays() {}"),
        ("gone.rs", "fn disappears() {}"),
    ]);
    let test = create_test_workspace(repo.path());
    build_default(&test).await;
    assert_eq!(search_paths(&test, "disappears").await, vec!["gone.rs"]);

    std::fs::remove_file(repo.path().join("gone.rs")).unwrap();
    std::fs::write(repo.path().join("new.rs"), "fn arrives() {}").unwrap();

    let response = build_default(&test).await;
    assert_eq!(response.file_count, 2);
    assert!(search_paths(&test, "disappears").await.is_empty());
    assert_eq!(search_paths(&test, "arrives").await, vec!["new.rs"]);
}

#[tokio::test]
async fn test_progress_events_are_monotonic() {
    let repo = TestRepo::medium();
    let test = create_test_workspace(repo.path());

    let overrides = IndexOptionsOverride {
        batch_size: Some(7),
        ..Default::default()
    };
    let mut handle = test.workspace.spawn_build(&overrides).unwrap();

    let mut events: Vec<IndexProgress> = Vec::new();
    while let Some(event) = handle.progress.recv().await {
        events.push(event);
    }
    let response = handle.wait().await;
    assert!(response.success);

    let first = events.first().unwrap();
    assert_eq!(first.phase, ProgressPhase::Scanning);
    assert_eq!(first.percentage, 0);

    let last = events.last().unwrap();
    assert_eq!(last.phase, ProgressPhase::Persisting);
    assert_eq!(last.percentage, 100);

    for pair in events.windows(2) {
        assert!(pair[0].percentage <= pair[1].percentage, "{events:?}");
    }

    let indexing: Vec<&IndexProgress> = events
        .iter()
        .filter(|e| e.phase == ProgressPhase::Indexing)
        .collect();
    // 50 files in batches of 7
    assert_eq!(indexing.len(), 8);
    assert!(indexing.iter().all(|e| e.total_files == 50));
    assert_eq!(indexing.last().unwrap().processed_files, 50);
    assert_eq!(indexing.last().unwrap().percentage, 90);
}

#[tokio::test]
async fn test_build_with_progress_sender() {
    let repo = TestRepo::small();
    let test = create_test_workspace(repo.path());

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let response = test
        .workspace
        .build_index(&IndexOptionsOverride::default(), Some(tx))
        .await;
    assert!(response.success);

    let mut count = 0;
    while let Some(event) = rx.recv().await {
        assert!(event.percentage <= 100);
        count += 1;
    }
    assert!(count >= 4);
}

#[tokio::test]
async fn test_build_missing_workspace() {
    let store = tempfile::TempDir::new().unwrap();
    let test = create_test_workspace(&store.path().join("missing"));

    let response = test
        .workspace
        .build_index(&IndexOptionsOverride::default(), None)
        .await;
    assert!(!response.success);
    assert_eq!(response.error_code, Some(ErrorCode::WorkspaceNotFound));
    assert!(response.index_file_path.is_none());
    assert!(!test.workspace.index_paths().index_file.exists());
}

#[tokio::test]
async fn test_build_rejects_invalid_options() {
    let repo = TestRepo::small();
    let test = create_test_workspace(repo.path());

    for overrides in [
        IndexOptionsOverride {
            batch_size: Some(0),
            ..Default::default()
        },
        IndexOptionsOverride {
            chunk_size: Some(100),
            chunk_overlap: Some(200),
            ..Default::default()
        },
        IndexOptionsOverride {
            exclude_patterns: Some(vec!["[unclosed".to_string()]),
            ..Default::default()
        },
    ] {
        let response = test.workspace.build_index(&overrides, None).await;
        assert_eq!(response.error_code, Some(ErrorCode::InvalidOptions));
    }

    assert_eq!(test.workspace.get_status().state, IndexState::Idle);
}

#[tokio::test]
async fn test_clear_removes_index() {
    let repo = TestRepo::small();
    let test = create_test_workspace(repo.path());
    build_default(&test).await;

    let paths = test.workspace.index_paths().clone();
    assert!(paths.index_file.exists());
    assert!(paths.meta_file.exists());

    test.workspace.clear_index().unwrap();
    test.workspace.clear_index().unwrap();

    let status = test.workspace.get_status();
    assert_eq!(status.state, IndexState::Idle);
    assert_eq!(status.document_count, 0);
    assert!(status.last_build_time.is_none());
    assert!(!paths.index_file.exists());
    assert!(!paths.meta_file.exists());
}
