//! Error types produced by the ingest crate.
//!
//! Malformed *names* are not errors: null, blank and (opt-in) oversized names
//! are filtered and counted in [`IngestStats`](crate::IngestStats). Errors here
//! mean the record itself cannot be projected (no source or record id) or the
//! table cannot be built at all.
use thiserror::Error;

/// Errors that can occur while building the unique-name table.
///
/// # Examples
///
/// ```rust
/// use ingest::IngestError;
///
/// let err = IngestError::MissingField { field: "record_id", position: 3 };
/// assert_eq!(err.to_string(), "record 3 has an empty record_id");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    /// `source` or `record_id` is empty after sanitization.
    ///
    /// `position` is the zero-based index of the record in the input sequence.
    #[error("record {position} has an empty {field}")]
    MissingField {
        field: &'static str,
        position: usize,
    },

    /// The same `(source, record_id)` appeared twice.
    ///
    /// Records are keyed by source and id in the projection tables, so a
    /// repeated key would make `record_firm` ambiguous.
    #[error("duplicate record {record_source}/{record_id}")]
    DuplicateRecord {
        record_source: String,
        record_id: String,
    },

    /// More distinct names than fit in a [`NameId`](crate::NameId).
    #[error("name table overflow: more than {limit} distinct names")]
    TooManyNames { limit: u64 },

    /// Invalid ingest configuration.
    #[error("invalid ingest config: {0}")]
    InvalidConfig(String),
}
