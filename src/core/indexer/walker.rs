//! File system walker with glob exclusion and extension gating.
//!
//! Traverses a workspace depth-first and returns the files worth
//! indexing. Unreadable directories, unstatable files and oversized
//! files are logged and skipped; none of them fails the scan. The
//! walk polls a [`CancellationToken`] before every entry, so a deep
//! traversal stops promptly once cancellation is requested.

use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::core::cancel::CancellationToken;
use crate::core::config::IndexOptions;
use crate::core::error::{IndexError, Result};

/// Dotfiles are matched like any other name
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// File system walker with pattern-based filtering
pub struct FileWalker {
    /// Globs matched against root-relative paths
    exclude_patterns: Vec<Pattern>,

    /// Lower-cased extensions without the leading dot
    include_extensions: Vec<String>,

    /// Maximum file size in bytes (skip larger files)
    max_file_size_bytes: u64,
}

impl FileWalker {
    /// Create a walker from indexing options
    ///
    /// # Returns
    ///
    /// A new `FileWalker` or a configuration error if an exclude
    /// pattern is not a valid glob
    pub fn new(options: &IndexOptions) -> Result<Self> {
        let exclude_patterns = options
            .exclude_patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| {
                    IndexError::ConfigError(format!("Invalid exclude pattern '{p}': {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let include_extensions = options
            .include_extensions
            .iter()
            .map(|e| normalize_extension(e))
            .filter(|e| !e.is_empty())
            .collect();

        Ok(Self {
            exclude_patterns,
            include_extensions,
            max_file_size_bytes: options.max_file_size_kb.saturating_mul(1024),
        })
    }

    /// Collect all matching files from a directory
    ///
    /// # Arguments
    ///
    /// * `root` - Root directory to start traversal
    /// * `cancel` - Polled before each directory entry
    ///
    /// # Returns
    ///
    /// Absolute paths in depth-first, name-sorted order, or
    /// `IndexError::Cancelled` if cancellation was observed
    pub fn collect_files(&self, root: &Path, cancel: &CancellationToken) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_excluded_entry(e, root));

        for entry in walker {
            cancel.check()?;

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // Unreadable subtree, keep walking the rest
                    tracing::warn!("Walk error: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();

            if !self.matches_extension(path) {
                continue;
            }

            match entry.metadata() {
                Ok(metadata) if metadata.len() > self.max_file_size_bytes => {
                    tracing::info!(
                        "Skipping large file: {:?} ({} bytes)",
                        path,
                        metadata.len()
                    );
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Skipping unstatable file {:?}: {}", path, e);
                    continue;
                }
            }

            files.push(path.to_path_buf());
        }

        Ok(files)
    }

    /// Whether an entry (and its subtree) is excluded
    ///
    /// The root itself is never excluded.
    fn is_excluded_entry(&self, entry: &DirEntry, root: &Path) -> bool {
        let Some(relative) = relative_path(root, entry.path()) else {
            return false;
        };
        if relative.is_empty() {
            return false;
        }

        let excluded = self.is_excluded(&relative);
        if excluded && entry.file_type().is_dir() {
            tracing::debug!("Skipping excluded directory: {}", relative);
        }
        excluded
    }

    /// Check a root-relative, `/`-separated path against the exclude globs
    pub fn is_excluded(&self, relative: &str) -> bool {
        self.exclude_patterns
            .iter()
            .any(|p| p.matches_with(relative, MATCH_OPTIONS))
    }

    fn matches_extension(&self, path: &Path) -> bool {
        if self.include_extensions.is_empty() {
            return true;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let ext = e.to_ascii_lowercase();
                self.include_extensions.iter().any(|allowed| *allowed == ext)
            })
            .unwrap_or(false)
    }
}

/// `path` relative to `root` with `/` separators
///
/// Returns `None` if `path` is not under `root` or is not valid
/// UTF-8.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

/// `".TS"` and `"ts"` both become `"ts"`
fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}
