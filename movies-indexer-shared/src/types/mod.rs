//! Core data structures used across the movies indexer.

pub mod checkpoint;
pub mod documents;
pub mod raw_rows;
pub mod search_query;
