//! Core data types for the codeindex service.
//!
//! This module defines the data structures shared by the indexer,
//! the engine and the query service: chunks and documents, build
//! status and progress, and search requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::error::{ErrorCode, IndexError};

/// A line-bounded slice of one file's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// The actual text content
    pub content: String,

    /// First line covered (1-based, inclusive)
    pub start_line: usize,

    /// Last line covered (1-based, inclusive)
    pub end_line: usize,

    /// Sequential chunk number within the file
    pub chunk_index: usize,
}

/// The indexed record for one chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,

    /// Path relative to the workspace root, `/`-separated
    pub file_path: String,

    pub content: String,
    pub language: String,
    pub start_line: usize,
    pub end_line: usize,
    pub chunk_index: usize,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Stable document id for a chunk of a file
    pub fn make_id(relative_path: &str, chunk_index: usize) -> String {
        format!("{relative_path}:{chunk_index}")
    }

    /// Build a document from a chunk of the file at `relative_path`
    pub fn from_chunk(
        relative_path: &str,
        language: &str,
        chunk: Chunk,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Self::make_id(relative_path, chunk.chunk_index),
            file_path: relative_path.to_string(),
            content: chunk.content,
            language: language.to_string(),
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            chunk_index: chunk.chunk_index,
            updated_at,
        }
    }
}

/// Lifecycle state of a workspace index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexState {
    #[default]
    Idle,
    Building,
    Ready,
    Error,
}

impl std::fmt::Display for IndexState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IndexState::Idle => "idle",
            IndexState::Building => "building",
            IndexState::Ready => "ready",
            IndexState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Current status of a workspace index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatus {
    pub state: IndexState,
    pub document_count: usize,
    pub file_count: usize,
    pub last_build_time: Option<DateTime<Utc>>,
    pub index_file_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Phase of an in-flight build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    Scanning,
    Indexing,
    Persisting,
}

/// Progress event emitted during a build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexProgress {
    pub phase: ProgressPhase,
    pub processed_files: usize,

    /// Zero until the scan has completed
    pub total_files: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,

    /// 0-100, non-decreasing within a build
    pub percentage: u8,
}

/// Final response of a build request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResponse {
    pub success: bool,
    pub document_count: usize,
    pub file_count: usize,
    pub build_time_ms: u64,
    pub index_file_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

impl BuildResponse {
    /// Successful build
    pub fn success(
        document_count: usize,
        file_count: usize,
        build_time_ms: u64,
        index_file_path: PathBuf,
    ) -> Self {
        Self {
            success: true,
            document_count,
            file_count,
            build_time_ms,
            index_file_path: Some(index_file_path),
            error_message: None,
            error_code: None,
        }
    }

    /// Failed or cancelled build
    pub fn failure(
        error: &IndexError,
        document_count: usize,
        file_count: usize,
        build_time_ms: u64,
    ) -> Self {
        Self {
            success: false,
            document_count,
            file_count,
            build_time_ms,
            index_file_path: None,
            error_message: Some(error.message()),
            error_code: Some(error.code()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.error_code == Some(ErrorCode::Cancelled)
    }
}

/// Document field a search can run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchProperty {
    Content,
    FilePath,
}

/// Optional search parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    pub limit: Option<usize>,
    pub threshold: Option<f32>,
    #[serde(default)]
    pub filter_extensions: Vec<String>,
    #[serde(default)]
    pub filter_paths: Vec<String>,
    pub properties: Option<Vec<SearchProperty>>,
}

/// Request to search the workspace index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub options: SearchOptions,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            options: SearchOptions::default(),
        }
    }
}

/// One ranked hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub document: Document,

    /// BM25 relevance score (higher = more relevant)
    pub score: f32,
}

/// Response from a search operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub total_matches: usize,
    pub execution_time_ms: u64,
    pub query: String,
}
