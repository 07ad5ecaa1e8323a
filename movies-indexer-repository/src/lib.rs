//! # Movies Indexer Repository
//!
//! This crate provides traits and implementations for interacting with the
//! search index and the document cache. It includes definitions for errors,
//! interfaces, bulk payloads, a concrete implementation for OpenSearch and a
//! Redis-backed cache, plus the cache-aside catalog read service.

pub mod bulk;
pub mod cache;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod service;
pub mod utils;

pub use bulk::{BulkPayload, BulkResponseSummary};
pub use config::CatalogServiceConfig;
pub use errors::{CacheError, SearchIndexError};
pub use interfaces::{CacheProvider, SearchIndexProvider};
pub use opensearch::{IndexConfig, OpenSearchProvider};
pub use service::CatalogService;
pub use utils::{cache_key, parse_document_id};
