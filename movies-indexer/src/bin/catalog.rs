//! # Catalog CLI (`catalog`)
//!
//! Read path over the indexed catalog: point lookups go through the Redis
//! cache, searches go straight to OpenSearch. Results are printed as JSON.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `catalog movie <id>` | Fetch one film |
//! | `catalog genre <id>` | Fetch one genre |
//! | `catalog person <id>` | Fetch one person |
//! | `catalog movies [--genre ..] [--sort desc]` | List films by filter |
//! | `catalog search-movies [query]` | Full-text search over films |
//! | `catalog search-persons [query]` | Full-text search over persons |
//! | `catalog genres [query]` | List genres |
//!
//! Connection settings come from the same environment variables as the
//! indexer (`OPENSEARCH_URL`, `REDIS_HOST`, `REDIS_PORT`, ...).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use movies_indexer::config::connect_to_opensearch;
use movies_indexer::{IndexingError, IngestError, Settings};
use movies_indexer_repository::cache::RedisCache;
use movies_indexer_repository::{
    CacheError, CacheProvider, CatalogService, CatalogServiceConfig, SearchIndexError,
};
use movies_indexer_shared::{MovieFilter, RatingOrder, SearchQuery};

/// Query the movie catalog's search indices.
#[derive(Parser)]
#[command(name = "catalog", version)]
struct Cli {
    /// Skip Redis and always read from the index.
    #[arg(long, global = true)]
    no_cache: bool,

    /// Lifetime of cached point lookups, in seconds.
    #[arg(long, global = true, default_value_t = 300)]
    cache_ttl_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a film by id.
    Movie { id: String },
    /// Fetch a genre by id.
    Genre { id: String },
    /// Fetch a person by id.
    Person { id: String },
    /// List films, filtered and optionally sorted by rating.
    Movies(ListArgs),
    /// Search films by title and description.
    SearchMovies(SearchArgs),
    /// Search persons by name.
    SearchPersons(SearchArgs),
    /// List genres, optionally filtered by name.
    Genres(SearchArgs),
}

#[derive(Args)]
struct SearchArgs {
    /// Free-text query. Omit to match everything.
    query: Option<String>,

    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Hits per page.
    #[arg(long, default_value_t = 50)]
    size: usize,
}

impl From<SearchArgs> for SearchQuery {
    fn from(args: SearchArgs) -> Self {
        SearchQuery {
            query: args.query,
            page_number: args.page,
            page_size: args.size,
        }
    }
}

#[derive(Args)]
struct ListArgs {
    /// Match on the title.
    #[arg(long)]
    title: Option<String>,

    /// Required genre; repeat to require several.
    #[arg(long = "genre")]
    genres: Vec<String>,

    /// Match on the director.
    #[arg(long)]
    director: Option<String>,

    /// Id of a person who must be among the actors; repeatable.
    #[arg(long = "actor")]
    actor_ids: Vec<String>,

    /// Id of a person who must be among the writers; repeatable.
    #[arg(long = "writer")]
    writer_ids: Vec<String>,

    /// Sort by IMDb rating.
    #[arg(long, value_enum)]
    sort: Option<SortOrder>,

    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Hits per page.
    #[arg(long, default_value_t = 50)]
    size: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortOrder {
    Asc,
    Desc,
}

impl ListArgs {
    fn into_filter(self) -> (MovieFilter, SearchQuery) {
        let filter = MovieFilter {
            title: self.title,
            genres: self.genres,
            director: self.director,
            actor_ids: self.actor_ids,
            writer_ids: self.writer_ids,
            rating_order: self.sort.map(|order| match order {
                SortOrder::Asc => RatingOrder::Asc,
                SortOrder::Desc => RatingOrder::Desc,
            }),
        };
        (filter, SearchQuery::default().page(self.page, self.size))
    }
}

/// Cache that never hits, used when Redis is disabled or unreachable.
struct NoCache;

#[async_trait]
impl CacheProvider for NoCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), IndexingError> {
    dotenv().ok();

    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    let provider = connect_to_opensearch(&settings).await?;
    let cache: Arc<dyn CacheProvider> = if cli.no_cache {
        Arc::new(NoCache)
    } else {
        match RedisCache::connect(settings.redis.clone()).await {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                warn!(error = %e, "Redis unavailable, reading without cache");
                Arc::new(NoCache)
            }
        }
    };

    let service = CatalogService::with_config(
        Arc::new(provider),
        cache,
        CatalogServiceConfig::with_cache_ttl(Duration::from_secs(cli.cache_ttl_secs)),
    );

    let outcome = match cli.command {
        Commands::Movie { id } => print_json(service.get_movie(&id).await),
        Commands::Genre { id } => print_json(service.get_genre(&id).await),
        Commands::Person { id } => print_json(service.get_person(&id).await),
        Commands::Movies(args) => {
            let (filter, query) = args.into_filter();
            print_json(service.list_movies(&filter, &query).await)
        }
        Commands::SearchMovies(args) => print_json(service.search_movies(&args.into()).await),
        Commands::SearchPersons(args) => print_json(service.search_persons(&args.into()).await),
        Commands::Genres(args) => print_json(service.list_genres(&args.into()).await),
    };

    service.close().await;
    outcome
}

fn print_json<T: Serialize>(result: Result<T, SearchIndexError>) -> Result<(), IndexingError> {
    let value = result.map_err(IngestError::from)?;
    let rendered = serde_json::to_string_pretty(&value)
        .map_err(|e| IndexingError::config(format!("Failed to render result: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movies_command_builds_filter() {
        let cli = Cli::parse_from([
            "catalog", "movies", "--genre", "Drama", "--genre", "Comedy", "--actor", "a1",
            "--sort", "desc", "--page", "2", "--size", "10",
        ]);
        let Commands::Movies(args) = cli.command else {
            panic!("expected the movies command");
        };

        let (filter, query) = args.into_filter();

        assert_eq!(filter.genres, vec!["Drama", "Comedy"]);
        assert_eq!(filter.actor_ids, vec!["a1"]);
        assert_eq!(filter.rating_order, Some(RatingOrder::Desc));
        assert!(filter.title.is_none());
        assert_eq!(query.window().from, 10);
    }
}
