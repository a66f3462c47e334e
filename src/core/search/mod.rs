//! Search module for BM25 full-text search.
//!
//! This module validates search requests, runs them on the live
//! engine and applies extension and path filters to the ranked
//! hits.

mod filter;
mod service;

pub use filter::ResultFilter;
pub use service::QueryService;
