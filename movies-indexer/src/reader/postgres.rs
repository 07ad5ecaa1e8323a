use async_stream::try_stream;
use chrono::{DateTime, Utc};
use futures::{Stream, TryStreamExt};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ChangeBatch, ChangeReader, ChangeStream, ReaderError};
use crate::backoff::{retry_transient, BackoffPolicy};
use crate::orchestrator::SyncTarget;
use crate::processor::EntityKind;
use movies_indexer_shared::{
    Checkpoint, FilmCredit, FilmWorkRow, GenreRow, PersonCredit, PersonRow, RawRow,
};

/// Change reader over the catalog's Postgres schema.
///
/// Rows are streamed from a single pooled connection and grouped into
/// batches as they arrive, so memory use is bounded by the batch size.
pub struct PostgresChangeReader {
    pool: PgPool,
    backoff: BackoffPolicy,
}

impl PostgresChangeReader {
    pub fn new(pool: PgPool, backoff: BackoffPolicy) -> Self {
        Self { pool, backoff }
    }
}

impl ChangeReader for PostgresChangeReader {
    fn read(&self, target: SyncTarget, since: Checkpoint, batch_size: usize) -> ChangeStream<'_> {
        let pool = self.pool.clone();
        let backoff = self.backoff;

        boxed(try_stream! {
            let mut conn = retry_transient(
                &backoff,
                "postgres_acquire",
                || pool.acquire(),
                is_connection_error,
            )
            .await
            .map_err(classify)?;

            info!(sync_target = %target, since = %since, batch_size, "Reading changes");

            let mut chunks = sqlx::query(target.query())
                .bind(since.as_datetime())
                .fetch(&mut *conn)
                .try_chunks(batch_size.max(1));

            while let Some(rows) = chunks.try_next().await.map_err(|e| classify(e.1))? {
                let rows = rows
                    .iter()
                    .map(|row| decode_row(target.kind(), row))
                    .collect::<Result<Vec<_>, _>>()?;

                if let Some(batch) = ChangeBatch::new(rows) {
                    debug!(
                        sync_target = %target,
                        rows = batch.len(),
                        max_updated_at = %batch.max_updated_at,
                        "Read batch"
                    );
                    yield batch;
                }
            }
        })
    }
}

fn boxed<S>(stream: S) -> ChangeStream<'static>
where
    S: Stream<Item = Result<ChangeBatch, ReaderError>> + Send + 'static,
{
    Box::pin(stream)
}

fn is_connection_error(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::WorkerCrashed
    )
}

fn classify(error: sqlx::Error) -> ReaderError {
    if is_connection_error(&error) {
        return ReaderError::connection(error.to_string());
    }
    match error {
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Decode(_)
        | sqlx::Error::TypeNotFound { .. } => ReaderError::decode(error.to_string()),
        other => ReaderError::query(other.to_string()),
    }
}

fn decode_row(kind: EntityKind, row: &PgRow) -> Result<RawRow, ReaderError> {
    let decode = |e: sqlx::Error| ReaderError::decode(format!("{} row: {}", kind, e));

    let id = row
        .try_get::<Option<Uuid>, _>("id")
        .map_err(decode)?
        .map(|id| id.to_string());
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(decode)?;

    let raw = match kind {
        EntityKind::Movie => {
            let persons: Json<Vec<PersonCredit>> = row.try_get("persons").map_err(decode)?;
            RawRow::FilmWork(FilmWorkRow {
                id,
                title: row.try_get("title").map_err(decode)?,
                description: row.try_get("description").map_err(decode)?,
                rating: row.try_get("rating").map_err(decode)?,
                kind: row.try_get("type").map_err(decode)?,
                updated_at,
                persons: persons.0,
                genres: row.try_get("genres").map_err(decode)?,
            })
        }
        EntityKind::Genre => RawRow::Genre(GenreRow {
            id,
            name: row.try_get("name").map_err(decode)?,
            description: row.try_get("description").map_err(decode)?,
            updated_at,
        }),
        EntityKind::Person => {
            let films: Json<Vec<FilmCredit>> = row.try_get("films").map_err(decode)?;
            RawRow::Person(PersonRow {
                id,
                full_name: row.try_get("full_name").map_err(decode)?,
                updated_at,
                films: films.0,
            })
        }
    };

    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_are_transient() {
        assert!(classify(sqlx::Error::PoolTimedOut).is_transient());
        assert!(is_connection_error(&sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset by peer"
        ))));
    }

    #[test]
    fn test_decode_errors_are_terminal() {
        let error = classify(sqlx::Error::ColumnNotFound("persons".to_string()));
        assert!(matches!(error, ReaderError::DecodeError(_)));
        assert!(!error.is_transient());
    }

    #[test]
    fn test_other_errors_are_query_errors() {
        assert!(matches!(
            classify(sqlx::Error::RowNotFound),
            ReaderError::QueryError(_)
        ));
    }
}
