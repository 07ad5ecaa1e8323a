//! Processor module for the movies indexer.
//!
//! Transforms raw catalog rows into search documents.

mod transform;

pub use transform::{
    row_kind, transform, transform_genre, transform_movie, transform_person, EntityKind,
    TransformError,
};

use std::fmt;
use std::str::FromStr;

use tracing::{debug, error, instrument};

use movies_indexer_shared::{RawRow, SearchDocument};

/// What to do with a row that cannot be transformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedRowPolicy {
    /// Fail the batch, leaving the checkpoint where it was.
    #[default]
    Halt,
    /// Drop the row, log it and keep going.
    SkipAndLog,
}

impl FromStr for MalformedRowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "halt" => Ok(Self::Halt),
            "skip" | "skip-and-log" => Ok(Self::SkipAndLog),
            other => Err(format!(
                "unknown malformed row policy '{}', expected 'halt' or 'skip'",
                other
            )),
        }
    }
}

impl fmt::Display for MalformedRowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Halt => f.write_str("halt"),
            Self::SkipAndLog => f.write_str("skip"),
        }
    }
}

/// Documents produced from one batch of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedBatch {
    pub documents: Vec<SearchDocument>,
    /// Rows dropped under [`MalformedRowPolicy::SkipAndLog`].
    pub skipped: usize,
}

/// Turns batches of raw rows into documents of a single kind.
#[derive(Debug, Clone, Default)]
pub struct DocumentProcessor {
    policy: MalformedRowPolicy,
}

impl DocumentProcessor {
    pub fn new(policy: MalformedRowPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MalformedRowPolicy {
        self.policy
    }

    /// Transform every row of a batch into a document of `kind`.
    ///
    /// Under `Halt` the first bad row fails the whole batch. Under
    /// `SkipAndLog` bad rows are counted in [`ProcessedBatch::skipped`].
    #[instrument(skip(self, rows), fields(row_count = rows.len()))]
    pub fn process_batch(
        &self,
        kind: EntityKind,
        rows: &[RawRow],
    ) -> Result<ProcessedBatch, TransformError> {
        let mut batch = ProcessedBatch {
            documents: Vec::with_capacity(rows.len()),
            skipped: 0,
        };

        for row in rows {
            let result = if row_kind(row) == kind {
                transform(row)
            } else {
                Err(TransformError::UnexpectedRow {
                    expected: kind,
                    actual: row_kind(row),
                    id: row.id().map(str::to_string),
                })
            };

            match result {
                Ok(document) => batch.documents.push(document),
                Err(e) => match self.policy {
                    MalformedRowPolicy::Halt => return Err(e),
                    MalformedRowPolicy::SkipAndLog => {
                        error!(
                            kind = %kind,
                            row_id = e.row_id().unwrap_or("<unknown>"),
                            error = %e,
                            "Skipping malformed row"
                        );
                        batch.skipped += 1;
                    }
                },
            }
        }

        debug!(
            documents = batch.documents.len(),
            skipped = batch.skipped,
            "Processed batch"
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use movies_indexer_shared::GenreRow;

    fn genre(id: &str, name: Option<&str>) -> RawRow {
        RawRow::Genre(GenreRow {
            id: Some(id.to_string()),
            name: name.map(str::to_string),
            ..Default::default()
        })
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("halt".parse::<MalformedRowPolicy>(), Ok(MalformedRowPolicy::Halt));
        assert_eq!(
            "SKIP".parse::<MalformedRowPolicy>(),
            Ok(MalformedRowPolicy::SkipAndLog)
        );
        assert!("ignore".parse::<MalformedRowPolicy>().is_err());
        assert_eq!(MalformedRowPolicy::default(), MalformedRowPolicy::Halt);
    }

    #[test]
    fn test_halt_fails_on_first_bad_row() {
        let processor = DocumentProcessor::new(MalformedRowPolicy::Halt);
        let rows = vec![
            genre("g1", Some("Drama")),
            genre("g2", None),
            genre("g3", Some("Comedy")),
        ];

        let err = processor.process_batch(EntityKind::Genre, &rows).unwrap_err();

        assert_eq!(err.row_id(), Some("g2"));
    }

    #[test]
    fn test_skip_drops_bad_rows() {
        let processor = DocumentProcessor::new(MalformedRowPolicy::SkipAndLog);
        let rows = vec![
            genre("g1", Some("Drama")),
            genre("g2", None),
            genre("g3", Some("Comedy")),
        ];

        let batch = processor.process_batch(EntityKind::Genre, &rows).unwrap();

        let ids: Vec<&str> = batch.documents.iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["g1", "g3"]);
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn test_row_of_wrong_kind_is_malformed() {
        let processor = DocumentProcessor::default();

        let err = processor
            .process_batch(EntityKind::Person, &[genre("g1", Some("Drama"))])
            .unwrap_err();

        assert!(matches!(
            err,
            TransformError::UnexpectedRow {
                expected: EntityKind::Person,
                actual: EntityKind::Genre,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_batch() {
        let batch = DocumentProcessor::default()
            .process_batch(EntityKind::Movie, &[])
            .unwrap();
        assert_eq!(batch, ProcessedBatch::default());
    }
}
