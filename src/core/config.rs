//! Configuration management for the codeindex service.
//!
//! This module handles loading configuration from TOML files and
//! environment variables, with sensible defaults for all settings.
//! [`IndexOptions`] doubles as the per-build option set: a build
//! request carries an [`IndexOptionsOverride`] that is merged onto
//! the configured defaults.

use crate::core::error::{IndexError, Result};
use crate::core::xdg::{XdgDirs, CONFIG_FILE_ENV};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub indexing: IndexOptions,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Indexing options (defaults for every build)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOptions {
    /// Files processed per indexing round
    #[serde(default = "default_batch_size", alias = "batch_size")]
    pub batch_size: usize,

    /// Characters per chunk (not bytes!)
    #[serde(default = "default_chunk_size", alias = "chunk_size")]
    pub chunk_size: usize,

    /// Approximate character overlap between consecutive chunks
    #[serde(default = "default_chunk_overlap", alias = "chunk_overlap")]
    pub chunk_overlap: usize,

    /// Files above this size are skipped
    #[serde(
        default = "default_max_file_size_kb",
        rename = "maxFileSizeKB",
        alias = "max_file_size_kb"
    )]
    pub max_file_size_kb: u64,

    /// Globs matched against root-relative paths
    #[serde(default = "default_exclude_patterns", alias = "exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Extension allow-list; empty means every extension
    #[serde(default = "default_include_extensions", alias = "include_extensions")]
    pub include_extensions: Vec<String>,
}

/// Partial [`IndexOptions`] supplied with a build request
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOptionsOverride {
    pub batch_size: Option<usize>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    #[serde(rename = "maxFileSizeKB")]
    pub max_file_size_kb: Option<u64>,
    pub exclude_patterns: Option<Vec<String>>,
    pub include_extensions: Option<Vec<String>>,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding persisted workspace indexes
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,
}

/// Search configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Number of results when the request gives no limit
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Maximum results per query
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Maximum query string length
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,

    /// Fraction of query terms a hit may miss (0 = all required)
    #[serde(default)]
    pub default_threshold: f32,
}

// Default value functions
fn default_batch_size() -> usize {
    50
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_max_file_size_kb() -> u64 {
    1024
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("./data/indexes")
}

fn default_limit() -> usize {
    10
}

fn default_max_limit() -> usize {
    100
}

fn default_max_query_length() -> usize {
    500
}

fn default_include_extensions() -> Vec<String> {
    [
        ".rs", ".toml", ".md", ".txt", ".js", ".jsx", ".mjs", ".cjs", ".ts", ".tsx", ".py",
        ".go", ".java", ".kt", ".c", ".h", ".cpp", ".hpp", ".cs", ".rb", ".php", ".swift",
        ".scala", ".sh", ".sql", ".json", ".yaml", ".yml", ".html", ".css", ".scss", ".vue",
        ".svelte",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        // Version control
        "**/.git".to_string(),
        "**/.git/**".to_string(),
        "**/.svn".to_string(),
        "**/.svn/**".to_string(),
        "**/.hg".to_string(),
        "**/.hg/**".to_string(),
        // Dependencies and build artifacts
        "**/node_modules".to_string(),
        "**/node_modules/**".to_string(),
        "**/target".to_string(),
        "**/target/**".to_string(),
        "**/vendor".to_string(),
        "**/vendor/**".to_string(),
        "**/build".to_string(),
        "**/build/**".to_string(),
        "**/dist".to_string(),
        "**/dist/**".to_string(),
        "**/out".to_string(),
        "**/out/**".to_string(),
        "**/.next".to_string(),
        "**/.next/**".to_string(),
        "**/__pycache__".to_string(),
        "**/__pycache__/**".to_string(),
        "**/.venv".to_string(),
        "**/.venv/**".to_string(),
        "**/coverage".to_string(),
        "**/coverage/**".to_string(),
        // Generated and lock files
        "**/*.min.js".to_string(),
        "**/*.map".to_string(),
        "**/package-lock.json".to_string(),
        "**/yarn.lock".to_string(),
        "**/pnpm-lock.yaml".to_string(),
        "**/Cargo.lock".to_string(),
        // Binary formats
        "**/*.png".to_string(),
        "**/*.jpg".to_string(),
        "**/*.jpeg".to_string(),
        "**/*.gif".to_string(),
        "**/*.ico".to_string(),
        "**/*.pdf".to_string(),
        "**/*.zip".to_string(),
        "**/*.gz".to_string(),
        "**/*.exe".to_string(),
        "**/*.dll".to_string(),
        "**/*.so".to_string(),
        "**/*.woff".to_string(),
        "**/*.woff2".to_string(),
    ]
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_file_size_kb: default_max_file_size_kb(),
            exclude_patterns: default_exclude_patterns(),
            include_extensions: default_include_extensions(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            max_query_length: default_max_query_length(),
            default_threshold: 0.0,
        }
    }
}

impl IndexOptions {
    /// Apply a build request's overrides on top of these options
    pub fn merged(&self, overrides: &IndexOptionsOverride) -> Self {
        Self {
            batch_size: overrides.batch_size.unwrap_or(self.batch_size),
            chunk_size: overrides.chunk_size.unwrap_or(self.chunk_size),
            chunk_overlap: overrides.chunk_overlap.unwrap_or(self.chunk_overlap),
            max_file_size_kb: overrides.max_file_size_kb.unwrap_or(self.max_file_size_kb),
            exclude_patterns: overrides
                .exclude_patterns
                .clone()
                .unwrap_or_else(|| self.exclude_patterns.clone()),
            include_extensions: overrides
                .include_extensions
                .clone()
                .unwrap_or_else(|| self.include_extensions.clone()),
        }
    }

    /// Validate option values
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(IndexError::ConfigError(
                "Batch size must be non-zero".to_string(),
            ));
        }

        if self.chunk_size == 0 {
            return Err(IndexError::ConfigError(
                "Chunk size must be non-zero".to_string(),
            ));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(IndexError::ConfigError(
                "Chunk overlap must be less than chunk size".to_string(),
            ));
        }

        for pattern in &self.exclude_patterns {
            glob::Pattern::new(pattern).map_err(|e| {
                IndexError::ConfigError(format!("Invalid exclude pattern '{pattern}': {e}"))
            })?;
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| IndexError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load config with priority: env vars > TOML > defaults
    pub fn load() -> Result<Self> {
        let xdg = XdgDirs::new();
        Self::load_with_xdg(&xdg)
    }

    /// Load config with explicit XDG directories
    ///
    /// Priority order:
    /// 1. CODEINDEX_CONFIG env var (must exist when set)
    /// 2. XDG config file (~/.config/codeindex/config.toml)
    /// 3. ./codeindex.toml
    /// 4. Defaults
    pub fn load_with_xdg(xdg: &XdgDirs) -> Result<Self> {
        let config_file = xdg.config_file();
        let mut config = if env::var(CONFIG_FILE_ENV).is_ok() || config_file.exists() {
            Self::from_file(&config_file)?
        } else if Path::new("codeindex.toml").exists() {
            Self::from_file("codeindex.toml")?
        } else {
            Self::default()
        };

        // Use the XDG data directory unless the file set one
        if env::var("CODEINDEX_DATA_DIR").is_err() && config.storage.index_dir == default_index_dir()
        {
            config.storage.index_dir = xdg.indexes_dir();
        }

        config.merge_env();
        config.validate()?;

        Ok(config)
    }

    /// Merge configuration with environment variables
    pub fn merge_env(&mut self) {
        if let Ok(batch_size) = env::var("CODEINDEX_BATCH_SIZE") {
            if let Ok(size) = batch_size.parse() {
                self.indexing.batch_size = size;
            }
        }
        if let Ok(chunk_size) = env::var("CODEINDEX_CHUNK_SIZE") {
            if let Ok(size) = chunk_size.parse() {
                self.indexing.chunk_size = size;
            }
        }
        if let Ok(overlap) = env::var("CODEINDEX_CHUNK_OVERLAP") {
            if let Ok(o) = overlap.parse() {
                self.indexing.chunk_overlap = o;
            }
        }
        if let Ok(max_size) = env::var("CODEINDEX_MAX_FILE_SIZE_KB") {
            if let Ok(size) = max_size.parse() {
                self.indexing.max_file_size_kb = size;
            }
        }

        if let Ok(data_dir) = env::var("CODEINDEX_DATA_DIR") {
            self.storage.index_dir = PathBuf::from(data_dir).join("indexes");
        }

        if let Ok(limit) = env::var("CODEINDEX_DEFAULT_LIMIT") {
            if let Ok(k) = limit.parse() {
                self.search.default_limit = k;
            }
        }
        if let Ok(max_limit) = env::var("CODEINDEX_MAX_LIMIT") {
            if let Ok(k) = max_limit.parse() {
                self.search.max_limit = k;
            }
        }
        if let Ok(max_query_len) = env::var("CODEINDEX_MAX_QUERY_LENGTH") {
            if let Ok(len) = max_query_len.parse() {
                self.search.max_query_length = len;
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.indexing.validate()?;

        if self.search.default_limit == 0 {
            return Err(IndexError::ConfigError(
                "Default limit must be non-zero".to_string(),
            ));
        }

        if self.search.default_limit > self.search.max_limit {
            return Err(IndexError::ConfigError(
                "Default limit cannot exceed max limit".to_string(),
            ));
        }

        if self.search.max_query_length == 0 {
            return Err(IndexError::ConfigError(
                "Max query length must be non-zero".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.search.default_threshold) {
            return Err(IndexError::ConfigError(
                "Default threshold must be between 0 and 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Log the effective configuration
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Batch size: {} files", self.indexing.batch_size);
        tracing::info!("  Chunk size: {} chars", self.indexing.chunk_size);
        tracing::info!("  Chunk overlap: {} chars", self.indexing.chunk_overlap);
        tracing::info!("  Max file size: {} KB", self.indexing.max_file_size_kb);
        tracing::info!(
            "  Include extensions: {} entries",
            self.indexing.include_extensions.len()
        );
        tracing::info!(
            "  Exclude patterns: {} patterns",
            self.indexing.exclude_patterns.len()
        );
        tracing::info!("  Index dir: {:?}", self.storage.index_dir);
        tracing::info!("  Default limit: {}", self.search.default_limit);
        tracing::info!("  Max limit: {}", self.search.max_limit);
        tracing::info!("  Max query length: {}", self.search.max_query_length);
    }
}
