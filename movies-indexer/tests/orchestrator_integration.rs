//! Integration tests for the movies indexer orchestrator.
//!
//! These tests use the real Orchestrator, processor, loader and file-backed
//! checkpoint store, with mock dependencies (ChangeReader and
//! SearchIndexProvider) standing in for Postgres and OpenSearch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::stream;
use serde_json::Value;
use tempfile::TempDir;
use tokio::time::timeout;

use movies_indexer::checkpoint::{CheckpointStore, JsonFileStore};
use movies_indexer::loader::BulkIndexer;
use movies_indexer::orchestrator::{Orchestrator, OrchestratorConfig, PassOutcome, SyncTarget};
use movies_indexer::processor::DocumentProcessor;
use movies_indexer::reader::{ChangeBatch, ChangeReader, ChangeStream, ReaderError};
use movies_indexer::backoff::BackoffPolicy;
use movies_indexer_repository::{
    BulkPayload, BulkResponseSummary, SearchIndexError, SearchIndexProvider,
};
use movies_indexer_shared::{
    Checkpoint, FilmCredit, FilmWorkRow, GenreRow, PersonCredit, PersonRow, RawRow,
};

const FILM_1: &str = "3d825f60-9fff-4dfe-b294-1a45fa1e115d";
const FILM_2: &str = "0312ed51-8833-413f-bff5-0e139c11264a";
const FILM_3: &str = "025c58cd-1b7e-43be-9ffb-8571a613579b";
const PERSON_1: &str = "a5a8f573-3cee-4ccc-8a2b-91cb9f55250a";
const PERSON_2: &str = "26e83050-29ef-4163-a99d-b546cac208f8";
const GENRE_1: &str = "3d8d9bf5-0d90-4353-88ba-4ccc5d2c07ff";

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn film(id: &str, title: &str, secs: i64) -> RawRow {
    RawRow::FilmWork(FilmWorkRow {
        id: Some(id.to_string()),
        title: Some(title.to_string()),
        description: Some(format!("{} description", title)),
        rating: Some(8.1),
        kind: Some("movie".to_string()),
        updated_at: at(secs),
        persons: vec![
            PersonCredit::new(PERSON_1, "Mark Hamill", "actor"),
            PersonCredit::new(PERSON_2, "George Lucas", "director"),
            PersonCredit::new(PERSON_2, "George Lucas", "writer"),
        ],
        genres: Some(vec!["Sci-Fi".to_string()]),
    })
}

fn genre(id: &str, name: &str, secs: i64) -> RawRow {
    RawRow::Genre(GenreRow {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        description: None,
        updated_at: at(secs),
    })
}

fn person(id: &str, name: &str, secs: i64, films: Vec<FilmCredit>) -> RawRow {
    RawRow::Person(PersonRow {
        id: Some(id.to_string()),
        full_name: Some(name.to_string()),
        updated_at: at(secs),
        films,
    })
}

/// Mock database: rows per target, editable between cycles.
#[derive(Default)]
struct MockReader {
    rows: Mutex<HashMap<SyncTarget, Vec<RawRow>>>,
    unavailable: Mutex<bool>,
    reads: Mutex<Vec<(SyncTarget, Checkpoint)>>,
}

impl MockReader {
    fn with_rows(rows: Vec<(SyncTarget, Vec<RawRow>)>) -> Self {
        Self {
            rows: Mutex::new(rows.into_iter().collect()),
            ..Default::default()
        }
    }

    fn upsert(&self, target: SyncTarget, row: RawRow) {
        let mut rows = self.rows.lock().unwrap();
        let rows = rows.entry(target).or_default();
        rows.retain(|existing| existing.id() != row.id());
        rows.push(row);
    }

    fn reads_for(&self, target: SyncTarget) -> Vec<Checkpoint> {
        self.reads
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == target)
            .map(|(_, since)| *since)
            .collect()
    }
}

impl ChangeReader for MockReader {
    fn read(&self, target: SyncTarget, since: Checkpoint, batch_size: usize) -> ChangeStream<'_> {
        self.reads.lock().unwrap().push((target, since));

        if *self.unavailable.lock().unwrap() {
            return Box::pin(stream::iter(vec![Err(ReaderError::connection(
                "connection refused",
            ))]));
        }

        // Same contract as the SQL: strictly after `since`, oldest first.
        let mut rows: Vec<RawRow> = self
            .rows
            .lock()
            .unwrap()
            .get(&target)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|row| Checkpoint::new(row.updated_at()) > since)
            .collect();
        rows.sort_by_key(|row| (row.updated_at(), row.id().map(str::to_string)));

        let batches: Vec<Result<ChangeBatch, ReaderError>> = rows
            .chunks(batch_size)
            .filter_map(|chunk| ChangeBatch::new(chunk.to_vec()))
            .map(Ok)
            .collect();
        Box::pin(stream::iter(batches))
    }
}

/// Mock search index keeping the latest document per `(index, id)`.
#[derive(Default)]
struct MockSearchIndex {
    documents: Mutex<HashMap<(String, String), Value>>,
    requests: Mutex<usize>,
    /// Reject every bulk request after this many have succeeded.
    reject_after: Mutex<Option<usize>>,
}

impl MockSearchIndex {
    fn document(&self, index: &str, id: &str) -> Option<Value> {
        self.documents
            .lock()
            .unwrap()
            .get(&(index.to_string(), id.to_string()))
            .cloned()
    }

    fn count(&self, index: &str) -> usize {
        self.documents
            .lock()
            .unwrap()
            .keys()
            .filter(|(i, _)| i == index)
            .count()
    }
}

#[async_trait]
impl SearchIndexProvider for MockSearchIndex {
    async fn ensure_indices(&self) -> Result<(), SearchIndexError> {
        Ok(())
    }

    async fn bulk_index(
        &self,
        payload: &BulkPayload,
    ) -> Result<BulkResponseSummary, SearchIndexError> {
        let mut requests = self.requests.lock().unwrap();
        if let Some(limit) = *self.reject_after.lock().unwrap() {
            if *requests >= limit {
                return Err(SearchIndexError::request_failed(
                    "Bulk",
                    400,
                    "mapper_parsing_exception",
                ));
            }
        }
        *requests += 1;

        let mut documents = self.documents.lock().unwrap();
        for pair in payload.lines().chunks(2) {
            let action = &pair[0]["index"];
            let key = (
                action["_index"].as_str().unwrap_or_default().to_string(),
                action["_id"].as_str().unwrap_or_default().to_string(),
            );
            documents.insert(key, pair[1].clone());
        }

        Ok(BulkResponseSummary {
            items: payload.document_count(),
            ..Default::default()
        })
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, SearchIndexError> {
        Ok(self.document(index, id))
    }

    async fn search(&self, _index: &str, _body: Value) -> Result<Vec<Value>, SearchIndexError> {
        Ok(Vec::new())
    }
}

fn build_orchestrator(
    reader: Arc<MockReader>,
    index: Arc<MockSearchIndex>,
    store: Arc<JsonFileStore>,
    batch_size: usize,
) -> Orchestrator {
    let backoff = BackoffPolicy::new(Duration::from_millis(10), 2, Duration::from_millis(40));
    Orchestrator::new(
        reader,
        DocumentProcessor::default(),
        BulkIndexer::with_backoff(index, backoff),
        store,
        OrchestratorConfig {
            batch_size,
            sync_interval: Duration::from_secs(60),
            backoff,
            ..Default::default()
        },
    )
}

fn catalog() -> MockReader {
    MockReader::with_rows(vec![
        (
            SyncTarget::MoviesByFilmWork,
            vec![
                film(FILM_1, "Star Wars", 100),
                film(FILM_2, "The Empire Strikes Back", 200),
                film(FILM_3, "Return of the Jedi", 300),
            ],
        ),
        (SyncTarget::Genres, vec![genre(GENRE_1, "Sci-Fi", 150)]),
        (
            SyncTarget::Persons,
            vec![person(
                PERSON_1,
                "Mark Hamill",
                250,
                vec![
                    FilmCredit::new(FILM_1, "actor"),
                    FilmCredit::new(FILM_1, "writer"),
                    FilmCredit::new(FILM_2, "actor"),
                ],
            )],
        ),
    ])
}

#[tokio::test]
async fn test_cycle_indexes_catalog_and_saves_checkpoints() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path().join("state.json")));
    let index = Arc::new(MockSearchIndex::default());
    let orchestrator = build_orchestrator(Arc::new(catalog()), index.clone(), store.clone(), 2);

    let report = orchestrator.run_cycle().await;

    assert_eq!(report.failures(), 0);
    assert_eq!(report.documents(), 5);
    assert_eq!(index.count("movies"), 3);
    assert_eq!(index.count("genres"), 1);
    assert_eq!(index.count("persons"), 1);

    let movie = index.document("movies", FILM_1).unwrap();
    assert_eq!(movie["title"], "Star Wars");
    assert_eq!(movie["imdb_rating"], 8.1);
    assert_eq!(movie["director"], "George Lucas");
    assert_eq!(movie["actors_names"], "Mark Hamill");
    assert_eq!(movie["writers"][0]["id"], PERSON_2);

    let person = index.document("persons", PERSON_1).unwrap();
    assert_eq!(person["films"].as_array().unwrap().len(), 2);
    assert_eq!(person["films"][0]["roles"], serde_json::json!(["actor", "writer"]));

    assert_eq!(
        store.get("film_work").await.unwrap(),
        Some(Checkpoint::new(at(300)))
    );
    assert_eq!(store.get("genres").await.unwrap(), Some(Checkpoint::new(at(150))));
    assert_eq!(store.get("persons").await.unwrap(), Some(Checkpoint::new(at(250))));
    assert_eq!(store.get("person").await.unwrap(), None);

    let state: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("state.json")).unwrap())
            .unwrap();
    assert_eq!(state["film_work"], "1970-01-01T00:05:00.000000Z");
}

#[tokio::test]
async fn test_second_cycle_reads_only_new_changes() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path().join("state.json")));
    let reader = Arc::new(catalog());
    let index = Arc::new(MockSearchIndex::default());
    let orchestrator = build_orchestrator(reader.clone(), index.clone(), store.clone(), 100);

    orchestrator.run_cycle().await;
    reader.upsert(
        SyncTarget::MoviesByFilmWork,
        film(FILM_1, "Star Wars: A New Hope", 400),
    );

    let outcome = orchestrator
        .run_pass(SyncTarget::MoviesByFilmWork)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        PassOutcome::Synced {
            documents: 1,
            skipped: 0,
            checkpoint: Checkpoint::new(at(400)),
        }
    );
    assert_eq!(
        index.document("movies", FILM_1).unwrap()["title"],
        "Star Wars: A New Hope"
    );
    assert_eq!(
        reader.reads_for(SyncTarget::MoviesByFilmWork),
        vec![Checkpoint::epoch(), Checkpoint::new(at(300))]
    );
    assert_eq!(
        orchestrator.run_pass(SyncTarget::Genres).await.unwrap(),
        PassOutcome::UpToDate
    );
}

#[tokio::test]
async fn test_restart_after_failed_pass_loses_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    let reader = Arc::new(catalog());
    let index = Arc::new(MockSearchIndex::default());
    *index.reject_after.lock().unwrap() = Some(1);

    let first = build_orchestrator(
        reader.clone(),
        index.clone(),
        Arc::new(JsonFileStore::new(&path)),
        2,
    );
    let result = first.run_pass(SyncTarget::MoviesByFilmWork).await;
    assert!(result.is_err());
    assert_eq!(index.count("movies"), 2);
    drop(first);

    // Fresh process, same state file.
    *index.reject_after.lock().unwrap() = None;
    let store = Arc::new(JsonFileStore::new(&path));
    assert_eq!(store.get("film_work").await.unwrap(), None);
    let second = build_orchestrator(reader.clone(), index.clone(), store.clone(), 2);

    let outcome = second
        .run_pass(SyncTarget::MoviesByFilmWork)
        .await
        .unwrap();

    assert!(matches!(outcome, PassOutcome::Synced { documents: 3, .. }));
    assert_eq!(index.count("movies"), 3);
    assert!(index.document("movies", FILM_3).is_some());
    assert_eq!(
        store.get("film_work").await.unwrap(),
        Some(Checkpoint::new(at(300)))
    );
}

#[tokio::test(start_paused = true)]
async fn test_pass_backs_off_while_database_is_down_then_recovers() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path().join("state.json")));
    let reader = Arc::new(catalog());
    *reader.unavailable.lock().unwrap() = true;
    let index = Arc::new(MockSearchIndex::default());
    let orchestrator = Arc::new(build_orchestrator(
        reader.clone(),
        index.clone(),
        store.clone(),
        100,
    ));

    let running = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.run().await })
    };

    // The first pass restarts at 0, 10, 30 and 70 ms instead of waiting for
    // the 60 s sync interval; later targets wait for it to succeed.
    tokio::time::sleep(Duration::from_millis(75)).await;
    let attempts = reader.reads_for(SyncTarget::MoviesByFilmWork);
    assert_eq!(attempts, vec![Checkpoint::epoch(); 4]);
    assert!(reader.reads_for(SyncTarget::Genres).is_empty());
    assert_eq!(index.count("movies"), 0);

    *reader.unavailable.lock().unwrap() = false;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(index.count("movies"), 3);
    assert_eq!(store.get("genres").await.unwrap(), Some(Checkpoint::new(at(150))));

    orchestrator.shutdown();
    timeout(Duration::from_secs(1), running)
        .await
        .expect("orchestrator did not stop")
        .unwrap()
        .unwrap();
}
