//! Firm-name normalization.
//!
//! The clustering pipeline never looks at raw names directly. It consumes a
//! [`Normalizer`] with two forms:
//!
//! - **weak**: light canonicalization (case, punctuation, whitespace). Raw
//!   records whose weak forms are byte-equal share one name id, and the
//!   blocking stage shingles the weak form.
//! - **strong**: aggressive canonicalization (weak plus corporate-designator
//!   removal). The verifier scores edit distance on strong forms.
//!
//! [`FirmNormalizer`] is the reference implementation. Callers with their own
//! rules implement the trait and hand it to the pipeline.
//!
//! Both forms are pure functions of the input and the config: no I/O, no
//! locale, no clock.

mod config;
mod error;
mod normalizer;
mod whitespace;

pub use crate::config::{NormalizerConfig, DEFAULT_CORPORATE_SUFFIXES};
pub use crate::error::CanonicalError;
pub use crate::normalizer::{FirmNormalizer, Normalizer};
pub use crate::whitespace::collapse_whitespace;
