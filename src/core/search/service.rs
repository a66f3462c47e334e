//! BM25 query service.
//!
//! Validates a search request, resolves its defaults against the
//! search configuration, runs it on an engine and post-filters the
//! ranked hits.

use std::time::Instant;

use crate::core::config::SearchConfig;
use crate::core::error::{IndexError, Result};
use crate::core::search::filter::ResultFilter;
use crate::core::storage::{EngineQuery, IndexEngine};
use crate::core::types::{SearchRequest, SearchResponse};

/// BM25 search service
#[derive(Debug, Clone)]
pub struct QueryService {
    default_limit: usize,
    max_limit: usize,
    max_query_length: usize,
    default_threshold: f32,
}

impl QueryService {
    /// Create a new query service
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            default_limit: config.default_limit,
            max_limit: config.max_limit,
            max_query_length: config.max_query_length,
            default_threshold: config.default_threshold,
        }
    }

    /// Reject requests that can never reach the engine
    pub fn validate(&self, request: &SearchRequest) -> Result<()> {
        if request.query.trim().is_empty() {
            return Err(IndexError::EmptyQuery);
        }

        let length = request.query.chars().count();
        if length > self.max_query_length {
            return Err(IndexError::QueryTooLong {
                length,
                max: self.max_query_length,
            });
        }

        Ok(())
    }

    /// Engine parameters for a request, defaults applied and clamped
    pub fn engine_query(&self, request: &SearchRequest) -> EngineQuery {
        let options = &request.options;

        let limit = options
            .limit
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1));

        let threshold = options.threshold.unwrap_or(self.default_threshold);
        let threshold = if threshold.is_nan() {
            self.default_threshold
        } else {
            threshold.clamp(0.0, 1.0)
        };

        let properties = match &options.properties {
            Some(properties) if !properties.is_empty() => properties.clone(),
            _ => EngineQuery::default().properties,
        };

        EngineQuery {
            properties,
            limit,
            threshold,
        }
    }

    /// Execute a search against `engine`
    ///
    /// `execution_time_ms` covers the engine call only. With
    /// extension or path filters the engine is asked for every
    /// candidate so filtering cannot starve the result page.
    pub fn search<E: IndexEngine>(
        &self,
        engine: &E,
        request: &SearchRequest,
    ) -> Result<SearchResponse> {
        self.validate(request)?;

        let mut query = self.engine_query(request);
        let limit = query.limit;
        let filter = ResultFilter::new(
            &request.options.filter_extensions,
            &request.options.filter_paths,
        );
        if !filter.is_empty() {
            query.limit = engine.count().max(limit);
        }

        let start = Instant::now();
        let hits = engine.search(request.query.trim(), &query)?;
        let execution_time_ms = start.elapsed().as_millis() as u64;

        let mut results = filter.apply(hits);
        results.truncate(limit);

        tracing::debug!(
            "Query {:?} returned {} results in {}ms",
            request.query,
            results.len(),
            execution_time_ms
        );

        Ok(SearchResponse {
            total_matches: results.len(),
            results,
            execution_time_ms,
            query: request.query.clone(),
        })
    }
}
