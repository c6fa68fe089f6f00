//! Unique-name stage.
//!
//! Raw records enter here. Each record's name is weak-normalized through a
//! [`canonical::Normalizer`]; records with identical weak forms share one
//! dense [`NameId`]. The stage emits two tables:
//!
//! - the `name` table: one [`NameEntry`] per distinct weak form, ids in
//!   first-seen order;
//! - the `record_name` table: one [`RecordLink`] per kept record.
//!
//! Null, blank, normalize-to-empty and (when `max_name_bytes` is set)
//! oversized names never reach the name table. They are counted in
//! [`IngestStats`] and logged at `debug`.
//!
//! ```
//! use canonical::FirmNormalizer;
//! use ingest::{unique_names, IngestConfig, RawNameRecord};
//!
//! let records = vec![
//!     RawNameRecord::new("apply", "A1", "Acme Corp"),
//!     RawNameRecord::new("grant", "G1", "Acme Corp."),
//!     RawNameRecord::without_name("grant", "G2"),
//! ];
//! let table = unique_names(records, &FirmNormalizer::default(), &IngestConfig::default())?;
//! assert_eq!(table.names.len(), 1);
//! assert_eq!(table.links.len(), 2);
//! assert_eq!(table.stats.null_names, 1);
//! # Ok::<(), ingest::IngestError>(())
//! ```

mod config;
mod error;
mod names;
mod types;

pub use crate::config::IngestConfig;
pub use crate::error::IngestError;
pub use crate::names::{unique_names, NameTableBuilder, PROGRESS_INTERVAL};
pub use crate::types::{IngestStats, NameEntry, NameId, NameTable, RawNameRecord, RecordLink};
