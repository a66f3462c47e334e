// UTF-8 safety tests: emoji, multibyte and mixed content
//
// Validates that indexing never panics on multi-byte characters and
// that chunk sizes are measured in characters.

use crate::common::{build_default, create_test_workspace, TestRepo, Utf8TestData};
use codeindex::core::config::IndexOptionsOverride;
use codeindex::SearchRequest;

#[tokio::test]
async fn test_index_emoji_in_comments() {
    let repo = TestRepo::with_files(&[(
        "emoji.rs",
        "// 🚀 Rocket launch\nfn main() { /* 🎉 Party */ }",
    )]);
    let test = create_test_workspace(repo.path());

    let response = build_default(&test).await;
    assert_eq!(response.file_count, 1);

    let results = test
        .workspace
        .search(&SearchRequest::new("Rocket"))
        .await
        .unwrap();
    assert_eq!(results.results.len(), 1);
    assert!(results.results[0].document.content.contains('🚀'));
}

#[tokio::test]
async fn test_index_all_utf8_samples() {
    let data = Utf8TestData::new();
    let samples: Vec<&str> = data
        .emoji
        .iter()
        .chain(&data.multibyte)
        .chain(&data.mixed)
        .copied()
        .collect();

    let files: Vec<(String, String)> = samples
        .iter()
        .enumerate()
        .map(|(i, text)| (format!("sample_{i}.rs"), format!("// {text}\nfn sample_{i}() {{}}\n")))
        .collect();
    let refs: Vec<(&str, &str)> = files
        .iter()
        .map(|(p, c)| (p.as_str(), c.as_str()))
        .collect();

    let repo = TestRepo::with_files(&refs);
    let test = create_test_workspace(repo.path());

    let response = build_default(&test).await;
    assert_eq!(response.file_count, samples.len());
    assert_eq!(response.document_count, samples.len());
}

#[tokio::test]
async fn test_search_cyrillic_words() {
    let repo = TestRepo::with_files(&[
        ("russian.rs", "// Привет мир\nfn main() {}"),
        ("english.rs", "// Hello world\nfn main() {}"),
    ]);
    let test = create_test_workspace(repo.path());
    build_default(&test).await;

    let results = test
        .workspace
        .search(&SearchRequest::new("привет"))
        .await
        .unwrap();
    assert_eq!(results.results.len(), 1);
    assert_eq!(results.results[0].document.file_path, "russian.rs");
}

#[tokio::test]
async fn test_chunk_size_counts_characters() {
    // 30 lines of 10 CJK characters: 30 bytes per line, 11 characters with the break
    let line = "中文测试中文测试中文";
    let content = vec![line; 30].join("\n");
    let repo = TestRepo::with_files(&[("cjk.md", &content)]);
    let test = create_test_workspace(repo.path());

    let overrides = IndexOptionsOverride {
        chunk_size: Some(110),
        chunk_overlap: Some(0),
        ..Default::default()
    };
    let response = test.workspace.build_index(&overrides, None).await;
    assert!(response.success);
    // 10 lines per chunk when measured in characters
    assert_eq!(response.document_count, 3);
}

#[tokio::test]
async fn test_long_emoji_line_at_chunk_boundary() {
    let mut content = String::from("fn boundary() {\n");
    content.push_str(&"🦀".repeat(120));
    content.push_str("\n}\n");

    let repo = TestRepo::with_files(&[("crab.rs", &content)]);
    let test = create_test_workspace(repo.path());

    let overrides = IndexOptionsOverride {
        chunk_size: Some(50),
        chunk_overlap: Some(10),
        ..Default::default()
    };
    let response = test.workspace.build_index(&overrides, None).await;
    assert!(response.success, "{response:?}");
    assert!(response.document_count >= 2);
}
