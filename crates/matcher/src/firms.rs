//! Firm id assignment.
//!
//! Multi-member components receive dense ids `0..C` in component order.
//! Every other name is its own firm with id `name_id + base_offset`. The
//! offset must exceed `C`, otherwise a singleton could land on a grouped id.

use std::collections::BTreeMap;
use std::time::Instant;

use ingest::NameId;
use tracing::info;

use crate::types::{FirmAssignment, FirmId, MatchError};

fn check_offset(base_offset: u64, components: usize) -> Result<(), MatchError> {
    if (components as u64) >= base_offset {
        return Err(MatchError::OffsetTooSmall {
            base_offset,
            components,
        });
    }
    Ok(())
}

/// Rows of the `match` table for ordered components, sorted by
/// `(firm_num, id)`.
pub fn grouped_firms(
    components: &[Vec<NameId>],
    base_offset: u64,
) -> Result<Vec<FirmAssignment>, MatchError> {
    check_offset(base_offset, components.len())?;
    let mut rows = Vec::with_capacity(components.iter().map(Vec::len).sum());
    for (firm_num, members) in components.iter().enumerate() {
        rows.extend(members.iter().map(|&id| FirmAssignment {
            firm_num: firm_num as FirmId,
            id,
        }));
    }
    Ok(rows)
}

/// Total mapping from every name id to its firm, sorted by name id.
///
/// `matches` holds the grouped rows; names not listed there become singleton
/// firms. The offset check is repeated here because the grouped rows may
/// come from a table written by an earlier run.
pub fn merge_firms<I>(
    name_ids: I,
    matches: &[FirmAssignment],
    base_offset: u64,
) -> Result<Vec<FirmAssignment>, MatchError>
where
    I: IntoIterator<Item = NameId>,
{
    let start = Instant::now();
    let mut grouped: BTreeMap<NameId, FirmId> = BTreeMap::new();
    let mut firm_nums: Vec<FirmId> = Vec::new();
    for row in matches {
        if row.firm_num >= base_offset {
            return Err(MatchError::GroupedIdOutOfRange {
                firm_num: row.firm_num,
                base_offset,
            });
        }
        if let Some(&first) = grouped.get(&row.id) {
            if first != row.firm_num {
                return Err(MatchError::ConflictingFirm {
                    id: row.id,
                    first,
                    second: row.firm_num,
                });
            }
        }
        grouped.insert(row.id, row.firm_num);
        firm_nums.push(row.firm_num);
    }
    firm_nums.sort_unstable();
    firm_nums.dedup();
    check_offset(base_offset, firm_nums.len())?;

    let mut ids: Vec<NameId> = name_ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();

    let mut firms = Vec::with_capacity(ids.len());
    let mut singletons = 0usize;
    for id in ids {
        let firm_num = match grouped.remove(&id) {
            Some(firm_num) => firm_num,
            None => {
                singletons += 1;
                base_offset
                    .checked_add(u64::from(id))
                    .ok_or(MatchError::FirmIdOverflow { id, base_offset })?
            }
        };
        firms.push(FirmAssignment { firm_num, id });
    }
    // Anything left was grouped but is missing from the name table.
    if let Some((&id, _)) = grouped.iter().next() {
        return Err(MatchError::UnknownName { id });
    }

    info!(
        names = firms.len(),
        grouped_firms = firm_nums.len(),
        singletons,
        base_offset,
        elapsed_micros = start.elapsed().as_micros(),
        "merge_firms"
    );
    Ok(firms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(firm_num: FirmId, id: NameId) -> FirmAssignment {
        FirmAssignment { firm_num, id }
    }

    // ==================== Grouped Firm Tests ====================

    #[test]
    fn grouped_ids_follow_component_order() {
        let comps = vec![vec![4, 5, 6], vec![0, 1]];
        let rows = grouped_firms(&comps, 1_000_000).unwrap();
        assert_eq!(
            rows,
            vec![row(0, 4), row(0, 5), row(0, 6), row(1, 0), row(1, 1)]
        );
    }

    #[test]
    fn offset_must_exceed_component_count() {
        let comps = vec![vec![0, 1], vec![2, 3]];
        assert!(grouped_firms(&comps, 3).is_ok());
        let err = grouped_firms(&comps, 2).unwrap_err();
        assert_eq!(
            err,
            MatchError::OffsetTooSmall {
                base_offset: 2,
                components: 2
            }
        );
    }

    // ==================== Merge Tests ====================

    #[test]
    fn merge_covers_every_name_once() {
        let matches = vec![row(0, 0), row(0, 1)];
        let firms = merge_firms(0..3, &matches, 1_000_000).unwrap();
        assert_eq!(firms, vec![row(0, 0), row(0, 1), row(1_000_002, 2)]);
    }

    #[test]
    fn singleton_ids_are_offset_and_disjoint() {
        let matches = vec![row(0, 3), row(0, 7), row(1, 2), row(1, 9)];
        let firms = merge_firms(0..10, &matches, 100).unwrap();
        assert_eq!(firms.len(), 10);
        for f in &firms {
            if f.firm_num < 100 {
                assert!(matches.contains(f));
            } else {
                assert_eq!(f.firm_num - 100, u64::from(f.id));
            }
        }
    }

    #[test]
    fn merge_without_groups_is_all_singletons() {
        let firms = merge_firms([2, 0, 1], &[], 10).unwrap();
        assert_eq!(firms, vec![row(10, 0), row(11, 1), row(12, 2)]);
    }

    #[test]
    fn merge_rechecks_offset() {
        let matches = vec![row(0, 0), row(0, 1), row(1, 2), row(1, 3)];
        let err = merge_firms(0..4, &matches, 2).unwrap_err();
        assert_eq!(
            err,
            MatchError::OffsetTooSmall {
                base_offset: 2,
                components: 2
            }
        );
    }

    #[test]
    fn merge_rejects_grouped_id_in_singleton_range() {
        let matches = vec![row(5, 0), row(5, 1)];
        let err = merge_firms(0..2, &matches, 3).unwrap_err();
        assert_eq!(
            err,
            MatchError::GroupedIdOutOfRange {
                firm_num: 5,
                base_offset: 3
            }
        );
    }

    #[test]
    fn merge_rejects_conflicting_rows() {
        let matches = vec![row(0, 0), row(1, 0)];
        let err = merge_firms(0..2, &matches, 100).unwrap_err();
        assert_eq!(
            err,
            MatchError::ConflictingFirm {
                id: 0,
                first: 0,
                second: 1
            }
        );
    }

    #[test]
    fn merge_rejects_unknown_grouped_name() {
        let matches = vec![row(0, 0), row(0, 42)];
        let err = merge_firms(0..3, &matches, 100).unwrap_err();
        assert_eq!(err, MatchError::UnknownName { id: 42 });
    }

    #[test]
    fn merge_reports_overflow() {
        let err = merge_firms([5], &[], u64::MAX - 1).unwrap_err();
        assert!(matches!(err, MatchError::FirmIdOverflow { id: 5, .. }));
    }
}
