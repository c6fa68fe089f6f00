//! # Candidate generation for firm names
//!
//! Turns a name table into a set of candidate pairs without comparing every
//! name with every other one.
//!
//! ## Pipeline
//!
//! 1. **Features**: each weak-normalized name yields weighted character
//!    shingles and whitespace tokens ([`extract_features`]).
//! 2. **Signature**: `bands` independent weighted MinHash values per name
//!    ([`signature`]). Names sharing heavy features pick the same feature
//!    in most bands.
//! 3. **Banding**: signatures are bucketed by every combination of
//!    `agreement` bands ([`LshBlocker`]); bucket mates holding equal values
//!    on at least `agreement` bands become candidate pairs.
//!
//! The output is a pure function of `(names, config)`: sorted, deduplicated,
//! free of self-pairs, identical for sequential and parallel runs.
//!
//! ```
//! use ingest::NameEntry;
//! use perceptual::{block_names, BlockingConfig};
//!
//! let names = vec![
//!     NameEntry { id: 0, text: "ACME CORP".into() },
//!     NameEntry { id: 1, text: "ACME CORPORATION".into() },
//!     NameEntry { id: 2, text: "ZENITH LLC".into() },
//!     NameEntry { id: 3, text: "".into() },
//! ];
//! let out = block_names(&names, &BlockingConfig::default()).unwrap();
//! assert_eq!(out.pairs.len(), 1);
//! assert_eq!(out.stats.unblockable, 1);
//! ```
pub mod config;
pub mod features;
pub mod lsh;
pub mod minhash;

pub use crate::config::{BlockingConfig, PerceptualError, MAX_BANDS, MAX_TABLES};
pub use crate::features::{extract_features, FeatureSet};
pub use crate::lsh::{block_names, BlockingOutput, BlockingStats, CandidatePair, LshBlocker};
pub use crate::minhash::{agreement, signature, Signature};
