//! Interface definitions for the search index and cache providers.
//!
//! These traits allow for dependency injection and swappable backends. The
//! pipeline and the read path only ever hold `Arc<dyn ...>` handles.

mod cache_provider;
mod search_index_provider;

pub use cache_provider::CacheProvider;
pub use search_index_provider::SearchIndexProvider;
