use std::fmt;

use crate::processor::EntityKind;
use crate::reader::queries;
use movies_indexer_repository::opensearch::{GENRES_INDEX, MOVIES_INDEX, PERSONS_INDEX};

/// One kind of change the sync driver replicates.
///
/// Films are re-indexed when the film itself, one of its persons or one of
/// its genres changes, so the `movies` index is fed by three targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncTarget {
    MoviesByFilmWork,
    MoviesByPerson,
    MoviesByGenre,
    Genres,
    Persons,
}

impl SyncTarget {
    /// Every target, in the order a cycle runs them.
    pub const ALL: [SyncTarget; 5] = [
        SyncTarget::MoviesByFilmWork,
        SyncTarget::MoviesByPerson,
        SyncTarget::MoviesByGenre,
        SyncTarget::Genres,
        SyncTarget::Persons,
    ];

    /// Change detection query, taking the checkpoint as `$1`.
    pub fn query(&self) -> &'static str {
        match self {
            SyncTarget::MoviesByFilmWork => queries::MOVIES_BY_FILM_WORK,
            SyncTarget::MoviesByPerson => queries::MOVIES_BY_PERSON,
            SyncTarget::MoviesByGenre => queries::MOVIES_BY_GENRE,
            SyncTarget::Genres => queries::GENRES,
            SyncTarget::Persons => queries::PERSONS,
        }
    }

    /// Shape of the rows the query returns.
    pub fn kind(&self) -> EntityKind {
        match self {
            SyncTarget::MoviesByFilmWork | SyncTarget::MoviesByPerson | SyncTarget::MoviesByGenre => {
                EntityKind::Movie
            }
            SyncTarget::Genres => EntityKind::Genre,
            SyncTarget::Persons => EntityKind::Person,
        }
    }

    /// Index the documents are written to.
    pub fn index(&self) -> &'static str {
        match self.kind() {
            EntityKind::Movie => MOVIES_INDEX,
            EntityKind::Genre => GENRES_INDEX,
            EntityKind::Person => PERSONS_INDEX,
        }
    }

    /// Key of this target's checkpoint.
    pub fn state_key(&self) -> &'static str {
        match self {
            SyncTarget::MoviesByFilmWork => "film_work",
            SyncTarget::MoviesByPerson => "person",
            SyncTarget::MoviesByGenre => "genre",
            SyncTarget::Genres => "genres",
            SyncTarget::Persons => "persons",
        }
    }
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.state_key())
    }
}
