//! OpenSearch implementation of the search index provider.
//!
//! This module provides a concrete implementation of `SearchIndexProvider`
//! using OpenSearch as the backend.

mod index_config;
mod provider;

pub use index_config::{
    genres_index_settings, movies_index_settings, persons_index_settings, IndexConfig,
    GENRES_INDEX, MOVIES_INDEX, PERSONS_INDEX,
};
pub use provider::OpenSearchProvider;
