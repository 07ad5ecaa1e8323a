//! Catalog read service.
//!
//! This module provides the read path over the search index: point lookups
//! by id through a cache-aside layer, paginated full-text search, and a
//! filtered, sortable film listing.
//!
//! # Note on Caching
//!
//! Only point lookups are cached. A lookup checks the cache first. On a miss
//! it reads the index and stores the document for `cache_ttl`. Cache failures
//! are logged and treated as misses, so the cache can never fail a read.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::config::CatalogServiceConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::{CacheProvider, SearchIndexProvider};
use crate::opensearch::{GENRES_INDEX, MOVIES_INDEX, PERSONS_INDEX};
use crate::utils::{cache_key, parse_document_id};
use movies_indexer_shared::{
    GenreDocument, MovieDocument, MovieFilter, PersonDocument, SearchQuery,
};

/// The main service for reading the catalog.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use movies_indexer_repository::cache::{RedisCache, RedisConfig};
/// use movies_indexer_repository::opensearch::{IndexConfig, OpenSearchProvider};
/// use movies_indexer_repository::CatalogService;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = OpenSearchProvider::new("http://localhost:9200", IndexConfig::all()).await?;
/// let cache = RedisCache::connect(RedisConfig::default()).await?;
/// let service = CatalogService::new(Arc::new(provider), Arc::new(cache));
///
/// let film = service.get_movie("550e8400-e29b-41d4-a716-446655440000").await?;
/// # Ok(())
/// # }
/// ```
pub struct CatalogService {
    provider: Arc<dyn SearchIndexProvider>,
    cache: Arc<dyn CacheProvider>,
    config: CatalogServiceConfig,
}

impl CatalogService {
    /// Create a new CatalogService with the default 5 minute cache lifetime.
    pub fn new(provider: Arc<dyn SearchIndexProvider>, cache: Arc<dyn CacheProvider>) -> Self {
        Self {
            provider,
            cache,
            config: CatalogServiceConfig::default(),
        }
    }

    /// Create a new CatalogService with custom configuration.
    pub fn with_config(
        provider: Arc<dyn SearchIndexProvider>,
        cache: Arc<dyn CacheProvider>,
        config: CatalogServiceConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            config,
        }
    }

    /// Return the cached value for `key`, or load it and populate the cache.
    ///
    /// `loader` runs only on a miss. A loader result of `None` is returned
    /// as-is and not cached.
    pub async fn get_or_load<T, F, Fut>(
        &self,
        key: &str,
        loader: F,
    ) -> Result<Option<T>, SearchIndexError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, SearchIndexError>>,
    {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    debug!(key, "Cache hit");
                    return Ok(Some(value));
                }
                Err(e) => warn!(key, error = %e, "Discarding undecodable cache entry"),
            },
            Ok(None) => debug!(key, "Cache miss"),
            Err(e) => warn!(key, error = %e, "Cache read failed, falling back to index"),
        }

        let Some(value) = loader().await? else {
            return Ok(None);
        };

        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(e) = self.cache.set(key, &raw, self.config.cache_ttl).await {
                    warn!(key, error = %e, "Cache write failed");
                }
            }
            Err(e) => warn!(key, error = %e, "Could not encode value for cache"),
        }

        Ok(Some(value))
    }

    async fn load_document<T: DeserializeOwned>(
        &self,
        index: &str,
        id: &str,
    ) -> Result<Option<T>, SearchIndexError> {
        match self.provider.get_document(index, id).await? {
            Some(source) => serde_json::from_value(source)
                .map(Some)
                .map_err(|e| SearchIndexError::parse(format!("{} document {}: {}", index, id, e))),
            None => Ok(None),
        }
    }

    async fn get_by_id<T>(&self, index: &str, id: &str) -> Result<Option<T>, SearchIndexError>
    where
        T: Serialize + DeserializeOwned,
    {
        let id = parse_document_id(id)?;
        let key = cache_key(index, &id);
        self.get_or_load(&key, || self.load_document(index, &id))
            .await
    }

    /// Look up a film by id.
    #[instrument(skip(self))]
    pub async fn get_movie(&self, id: &str) -> Result<Option<MovieDocument>, SearchIndexError> {
        self.get_by_id(MOVIES_INDEX, id).await
    }

    /// Look up a genre by id.
    #[instrument(skip(self))]
    pub async fn get_genre(&self, id: &str) -> Result<Option<GenreDocument>, SearchIndexError> {
        self.get_by_id(GENRES_INDEX, id).await
    }

    /// Look up a person by id.
    #[instrument(skip(self))]
    pub async fn get_person(&self, id: &str) -> Result<Option<PersonDocument>, SearchIndexError> {
        self.get_by_id(PERSONS_INDEX, id).await
    }

    async fn search_index<T: DeserializeOwned>(
        &self,
        index: &str,
        body: Option<Value>,
    ) -> Result<Vec<T>, SearchIndexError> {
        let Some(body) = body else {
            return Ok(Vec::new());
        };

        self.provider
            .search(index, body)
            .await?
            .into_iter()
            .map(|source| {
                serde_json::from_value(source)
                    .map_err(|e| SearchIndexError::parse(format!("{} hit: {}", index, e)))
            })
            .collect()
    }

    /// Close the cache connection. A failure is logged, never returned.
    pub async fn close(&self) {
        if let Err(e) = self.cache.close().await {
            warn!(error = %e, "Failed to close cache connection");
        }
    }

    /// Full-text search over film titles and descriptions.
    #[instrument(skip(self))]
    pub async fn search_movies(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<MovieDocument>, SearchIndexError> {
        self.search_index(MOVIES_INDEX, movie_search_body(query))
            .await
    }

    /// List films matching every filter in `filter`, one page at a time.
    ///
    /// Only `query`'s paging is used; its text is ignored.
    #[instrument(skip(self))]
    pub async fn list_movies(
        &self,
        filter: &MovieFilter,
        query: &SearchQuery,
    ) -> Result<Vec<MovieDocument>, SearchIndexError> {
        self.search_index(MOVIES_INDEX, movie_list_body(filter, query))
            .await
    }

    /// Full-text search over person names.
    #[instrument(skip(self))]
    pub async fn search_persons(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<PersonDocument>, SearchIndexError> {
        self.search_index(PERSONS_INDEX, person_search_body(query))
            .await
    }

    /// List genres, optionally filtered by name.
    #[instrument(skip(self))]
    pub async fn list_genres(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<GenreDocument>, SearchIndexError> {
        self.search_index(GENRES_INDEX, genre_search_body(query))
            .await
    }
}

/// Build a paginated search body over `fields`.
///
/// Returns `None` when the requested page lies outside the result window.
fn search_body(query: &SearchQuery, fields: &[&str]) -> Option<Value> {
    let page = query.window();
    if page.is_empty() {
        return None;
    }

    let matcher = match query.text_query() {
        Some(text) => json!({
            "simple_query_string": {
                "query": text,
                "fields": fields,
                "default_operator": "or"
            }
        }),
        None => json!({"match_all": {}}),
    };

    Some(json!({
        "from": page.from,
        "size": page.size,
        "query": matcher
    }))
}

/// Search body for the `movies` index.
pub fn movie_search_body(query: &SearchQuery) -> Option<Value> {
    search_body(query, &["title", "description"])
}

/// Listing body for the `movies` index.
///
/// Each filter becomes a `must` clause. Person ids are matched inside the
/// nested `actors`/`writers` objects. Returns `None` when the requested page
/// lies outside the result window.
pub fn movie_list_body(filter: &MovieFilter, query: &SearchQuery) -> Option<Value> {
    let page = query.window();
    if page.is_empty() {
        return None;
    }

    let mut must = Vec::new();
    if let Some(title) = filter.title_text() {
        must.push(json!({"match": {"title": title}}));
    }
    for genre in &filter.genres {
        must.push(json!({"term": {"genre": genre}}));
    }
    if let Some(director) = filter.director_text() {
        must.push(json!({"match": {"director": director}}));
    }
    for (path, ids) in [("actors", &filter.actor_ids), ("writers", &filter.writer_ids)] {
        let field = format!("{}.id", path);
        for id in ids {
            must.push(json!({
                "nested": {
                    "path": path,
                    "query": {"term": {field.as_str(): id}}
                }
            }));
        }
    }

    let matcher = if must.is_empty() {
        json!({"match_all": {}})
    } else {
        json!({"bool": {"must": must}})
    };

    let mut body = json!({
        "from": page.from,
        "size": page.size,
        "query": matcher
    });
    if let Some(order) = filter.rating_order {
        body["sort"] = json!([{"imdb_rating": {"order": order.as_str()}}]);
    }
    Some(body)
}

/// Search body for the `persons` index.
pub fn person_search_body(query: &SearchQuery) -> Option<Value> {
    search_body(query, &["full_name"])
}

/// Search body for the `genres` index.
pub fn genre_search_body(query: &SearchQuery) -> Option<Value> {
    search_body(query, &["name", "description"])
}
