//! Post-ranking hit filters.
//!
//! Extension and path filters run after the engine has ranked its
//! candidates, so they only ever remove hits and never change the
//! relative order of the ones that remain.

use crate::core::types::SearchHit;

/// Extension and path-prefix filters for one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultFilter {
    /// `.ts`-style suffixes, lower-cased, dot included
    extensions: Vec<String>,

    /// Root-relative prefixes
    path_prefixes: Vec<String>,
}

impl ResultFilter {
    /// Build a filter from raw request values
    ///
    /// Extensions are accepted with or without a leading dot and
    /// compared case-insensitively. Path prefixes may start with
    /// `./`. Blank entries are ignored.
    pub fn new(extensions: &[String], path_prefixes: &[String]) -> Self {
        let extensions = extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .map(|e| format!(".{e}"))
            .collect();

        let path_prefixes = path_prefixes
            .iter()
            .map(|p| p.trim().trim_start_matches("./").to_string())
            .filter(|p| !p.is_empty())
            .collect();

        Self {
            extensions,
            path_prefixes,
        }
    }

    /// True when no filter is configured
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty() && self.path_prefixes.is_empty()
    }

    /// Whether a hit passes every configured filter
    pub fn matches(&self, hit: &SearchHit) -> bool {
        let path = hit.document.file_path.as_str();

        let extension_ok = self.extensions.is_empty() || {
            let lower = path.to_ascii_lowercase();
            self.extensions.iter().any(|ext| lower.ends_with(ext))
        };

        let path_ok = self.path_prefixes.is_empty()
            || self.path_prefixes.iter().any(|prefix| path.starts_with(prefix));

        extension_ok && path_ok
    }

    /// Keep matching hits in their ranked order
    pub fn apply(&self, hits: Vec<SearchHit>) -> Vec<SearchHit> {
        if self.is_empty() {
            return hits;
        }
        hits.into_iter().filter(|h| self.matches(h)).collect()
    }
}
