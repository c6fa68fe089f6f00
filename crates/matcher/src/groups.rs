use std::time::Instant;

use canonical::Normalizer;
use ingest::NameId;
use tracing::info;

use crate::components::connected_components;
use crate::firms::grouped_firms;
use crate::types::{FirmAssignment, MatchConfig, MatchError, NamedPair, VerifiedEdge};
use crate::verify::{verify_pairs, VerifyStats};

/// Output of [`find_groups`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupOutput {
    pub edges: Vec<VerifiedEdge>,
    /// Multi-member components, largest first.
    pub components: Vec<Vec<NameId>>,
    /// Rows of the `match` table.
    pub matches: Vec<FirmAssignment>,
    pub verify: VerifyStats,
}

/// Verifies candidate pairs, extracts components and numbers them.
///
/// Fails with [`MatchError::OffsetTooSmall`] before producing any rows when
/// the configured offset does not exceed the component count.
pub fn find_groups<N>(
    pairs: &[NamedPair],
    normalizer: &N,
    cfg: &MatchConfig,
) -> Result<GroupOutput, MatchError>
where
    N: Normalizer + ?Sized,
{
    let start = Instant::now();
    let verified = verify_pairs(pairs, normalizer, cfg)?;
    let components = connected_components(verified.edges.iter().map(|e| e.pair));
    let matches = grouped_firms(&components, cfg.base_offset)?;

    info!(
        edges = verified.edges.len(),
        components = components.len(),
        grouped_names = matches.len(),
        largest = components.first().map_or(0, Vec::len),
        elapsed_micros = start.elapsed().as_micros(),
        "find_groups"
    );
    Ok(GroupOutput {
        edges: verified.edges,
        components,
        matches,
        verify: verified.stats,
    })
}
