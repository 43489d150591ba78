//! Identifier normalization and result merging

pub mod canonical;
pub mod deduplicator;

pub use canonical::CanonicalIdentifier;
pub use deduplicator::{Provenance, ResultDeduplicator, ResultEntry, SearchResult};
