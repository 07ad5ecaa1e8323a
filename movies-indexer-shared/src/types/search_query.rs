//! Search query types for the catalog read path.
//!
//! This module defines the query structure used to search the movies and
//! persons indices, the filters for listing films, and the pagination window
//! derived from them.

use serde::{Deserialize, Serialize};

/// Largest `from + size` the index accepts for a plain search.
pub const MAX_RESULT_WINDOW: usize = 10_000;

/// Search query parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free-text query. Empty or missing matches everything.
    #[serde(default)]
    pub query: Option<String>,

    /// 1-based page number.
    #[serde(default = "default_page_number")]
    pub page_number: usize,

    /// Number of hits per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_number() -> usize {
    1
}

fn default_page_size() -> usize {
    50
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: None,
            page_number: default_page_number(),
            page_size: default_page_size(),
        }
    }
}

impl SearchQuery {
    /// Create a full-text query for the first page.
    ///
    /// # Example
    ///
    /// ```
    /// use movies_indexer_shared::SearchQuery;
    ///
    /// let query = SearchQuery::text("star wars").page(2, 10);
    /// assert_eq!(query.window().from, 10);
    /// ```
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    /// Set the page number and size.
    pub fn page(mut self, page_number: usize, page_size: usize) -> Self {
        self.page_number = page_number;
        self.page_size = page_size;
        self
    }

    /// The trimmed query text, if there is any.
    pub fn text_query(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    /// The `from`/`size` window, clamped to [`MAX_RESULT_WINDOW`].
    pub fn window(&self) -> SearchPage {
        let page_number = self.page_number.max(1);
        let from = (page_number - 1)
            .saturating_mul(self.page_size)
            .min(MAX_RESULT_WINDOW);
        let size = self.page_size.min(MAX_RESULT_WINDOW - from);
        SearchPage { from, size }
    }
}

/// Offset and size of a page of hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchPage {
    pub from: usize,
    pub size: usize,
}

impl SearchPage {
    /// Whether the page falls entirely outside the result window.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Direction of a sort on `imdb_rating`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RatingOrder {
    Asc,
    Desc,
}

impl RatingOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatingOrder::Asc => "asc",
            RatingOrder::Desc => "desc",
        }
    }
}

/// Filters for listing films.
///
/// Every filter that is set must match. With no filter set the listing
/// covers the whole catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MovieFilter {
    /// Analyzed match on the title.
    #[serde(default)]
    pub title: Option<String>,

    /// Exact genre names; a film must carry all of them.
    #[serde(default)]
    pub genres: Vec<String>,

    /// Analyzed match on the director field.
    #[serde(default)]
    pub director: Option<String>,

    /// Person ids that must appear among the actors.
    #[serde(default)]
    pub actor_ids: Vec<String>,

    /// Person ids that must appear among the writers.
    #[serde(default)]
    pub writer_ids: Vec<String>,

    /// Sort by rating; index order when unset.
    #[serde(default)]
    pub rating_order: Option<RatingOrder>,
}

impl MovieFilter {
    /// The trimmed title filter, if there is any.
    pub fn title_text(&self) -> Option<&str> {
        non_blank(&self.title)
    }

    /// The trimmed director filter, if there is any.
    pub fn director_text(&self) -> Option<&str> {
        non_blank(&self.director)
    }

    /// Whether no filter restricts the listing.
    pub fn is_unfiltered(&self) -> bool {
        self.title_text().is_none()
            && self.director_text().is_none()
            && self.genres.is_empty()
            && self.actor_ids.is_empty()
            && self.writer_ids.is_empty()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page() {
        let query = SearchQuery::text("matrix").page(1, 20);
        assert_eq!(query.window(), SearchPage { from: 0, size: 20 });
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let query = SearchQuery::default().page(0, 20);
        assert_eq!(query.window(), SearchPage { from: 0, size: 20 });
    }

    #[test]
    fn test_window_is_clamped() {
        let query = SearchQuery::default().page(167, 60);
        assert_eq!(query.window(), SearchPage { from: 9_960, size: 40 });

        let beyond = SearchQuery::default().page(1_000, 50);
        assert!(beyond.window().is_empty());
    }

    #[test]
    fn test_blank_query_matches_all() {
        assert_eq!(SearchQuery::text("   ").text_query(), None);
        assert_eq!(SearchQuery::text(" dune ").text_query(), Some("dune"));
    }

    #[test]
    fn test_blank_filter_is_unfiltered() {
        let filter = MovieFilter {
            title: Some("  ".to_string()),
            rating_order: Some(RatingOrder::Desc),
            ..Default::default()
        };
        assert!(filter.is_unfiltered());

        let by_genre = MovieFilter {
            genres: vec!["Sci-Fi".to_string()],
            ..Default::default()
        };
        assert!(!by_genre.is_unfiltered());
    }
}
