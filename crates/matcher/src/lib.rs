//! # Verification and firm assignment (`matcher`)
//!
//! Takes the candidate pairs produced by blocking and turns them into firms:
//!
//! 1. [`verify_pairs`]: strong-normalize every involved name once, score each
//!    pair with a bounded Levenshtein similarity and keep pairs scoring
//!    strictly above [`MatchConfig::threshold`].
//! 2. [`connected_components`]: union-find over the kept edges, components
//!    ordered by size (descending) then discovery.
//! 3. [`grouped_firms`] / [`merge_firms`]: components get ids `0..C`; every
//!    other name is a singleton firm `id + base_offset`.
//!
//! [`find_groups`] runs steps 1 to 3 up to the `match` table.
//!
//! ```
//! use canonical::FirmNormalizer;
//! use matcher::{find_groups, merge_firms, MatchConfig, NamedPair};
//! use perceptual::CandidatePair;
//!
//! let pairs = vec![NamedPair {
//!     pair: CandidatePair { a: 0, b: 1 },
//!     name1: "ACME CORP".into(),
//!     name2: "ACME CORPORATION".into(),
//! }];
//! let cfg = MatchConfig::default();
//! let groups = find_groups(&pairs, &FirmNormalizer::default(), &cfg)?;
//! let firms = merge_firms(0..3, &groups.matches, cfg.base_offset)?;
//! assert_eq!(firms[0].firm_num, 0);
//! assert_eq!(firms[1].firm_num, 0);
//! assert_eq!(firms[2].firm_num, 1_000_002);
//! # Ok::<(), matcher::MatchError>(())
//! ```

pub mod components;
pub mod distance;
pub mod firms;
mod groups;
pub mod types;
pub mod verify;

pub use crate::components::{connected_components, DisjointSet};
pub use crate::distance::{bounded_levenshtein, similarity};
pub use crate::firms::{grouped_firms, merge_firms};
pub use crate::groups::{find_groups, GroupOutput};
pub use crate::types::{FirmAssignment, FirmId, MatchConfig, MatchError, NamedPair, VerifiedEdge};
pub use crate::verify::{verify_pairs, StrongForms, VerifyOutput, VerifyStats};
