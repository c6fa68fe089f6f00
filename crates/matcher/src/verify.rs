//! Candidate verification on strong-normalized names.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::time::Instant;

use canonical::Normalizer;
use fxhash::FxHashMap;
use ingest::NameId;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::distance::similarity;
use crate::types::{MatchConfig, MatchError, NamedPair, VerifiedEdge};

const PROGRESS_INTERVAL: usize = 100_000;

/// Strong form of every name taking part in at least one candidate pair,
/// stored as Unicode scalars. Each name is normalized exactly once.
#[derive(Debug, Clone, Default)]
pub struct StrongForms {
    forms: FxHashMap<NameId, Vec<char>>,
}

impl StrongForms {
    /// Collects the distinct names of `pairs` and normalizes them.
    ///
    /// Fails when one id is carried with two different texts, which means the
    /// pair table was not produced from a single name table.
    pub fn build<N>(pairs: &[NamedPair], normalizer: &N, parallel: bool) -> Result<Self, MatchError>
    where
        N: Normalizer + ?Sized,
    {
        let mut texts: BTreeMap<NameId, &str> = BTreeMap::new();
        for p in pairs {
            for (id, text) in [(p.pair.a, p.name1.as_str()), (p.pair.b, p.name2.as_str())] {
                match texts.entry(id) {
                    Entry::Vacant(slot) => {
                        slot.insert(text);
                    }
                    Entry::Occupied(seen) if *seen.get() != text => {
                        return Err(MatchError::InconsistentName {
                            id,
                            first: (*seen.get()).to_string(),
                            second: text.to_string(),
                        });
                    }
                    Entry::Occupied(_) => {}
                }
            }
        }

        let distinct: Vec<(NameId, &str)> = texts.into_iter().collect();
        let strong = |&(id, text): &(NameId, &str)| {
            (id, normalizer.strong(text).chars().collect::<Vec<char>>())
        };
        let forms: Vec<(NameId, Vec<char>)> = if parallel {
            distinct.par_iter().map(strong).collect()
        } else {
            distinct.iter().map(strong).collect()
        };
        Ok(Self {
            forms: forms.into_iter().collect(),
        })
    }

    pub fn get(&self, id: NameId) -> Option<&[char]> {
        self.forms.get(&id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

/// Counters from one verification run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyStats {
    pub candidates: usize,
    pub names: usize,
    pub verified: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerifyOutput {
    /// Sorted by pair, one edge per pair.
    pub edges: Vec<VerifiedEdge>,
    pub stats: VerifyStats,
}

fn score_pair(
    p: &NamedPair,
    forms: &StrongForms,
    threshold: f64,
) -> Result<Option<VerifiedEdge>, MatchError> {
    let a = forms
        .get(p.pair.a)
        .ok_or(MatchError::UnknownName { id: p.pair.a })?;
    let b = forms
        .get(p.pair.b)
        .ok_or(MatchError::UnknownName { id: p.pair.b })?;
    let score = similarity(a, b, threshold);
    Ok((score > threshold).then_some(VerifiedEdge {
        pair: p.pair,
        score,
    }))
}

/// Keeps the candidate pairs whose strong forms score above the threshold.
pub fn verify_pairs<N>(
    pairs: &[NamedPair],
    normalizer: &N,
    cfg: &MatchConfig,
) -> Result<VerifyOutput, MatchError>
where
    N: Normalizer + ?Sized,
{
    cfg.validate()?;
    let start = Instant::now();
    let forms = StrongForms::build(pairs, normalizer, cfg.use_parallel)?;
    debug!(names = forms.len(), "strong_forms_ready");

    let mut edges: Vec<VerifiedEdge> = if cfg.use_parallel {
        pairs
            .par_iter()
            .map(|p| score_pair(p, &forms, cfg.threshold))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect()
    } else {
        let mut kept = Vec::new();
        for (i, p) in pairs.iter().enumerate() {
            kept.extend(score_pair(p, &forms, cfg.threshold)?);
            if (i + 1) % PROGRESS_INTERVAL == 0 {
                debug!(pairs = i + 1, verified = kept.len(), "verify_progress");
            }
        }
        kept
    };
    edges.sort_by_key(|e| e.pair);
    edges.dedup_by_key(|e| e.pair);

    let stats = VerifyStats {
        candidates: pairs.len(),
        names: forms.len(),
        verified: edges.len(),
    };
    info!(
        candidates = stats.candidates,
        names = stats.names,
        verified = stats.verified,
        threshold = cfg.threshold,
        elapsed_micros = start.elapsed().as_micros(),
        "verify"
    );
    Ok(VerifyOutput { edges, stats })
}
