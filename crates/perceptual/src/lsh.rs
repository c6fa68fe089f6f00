//! Banded bucket tables over weighted MinHash signatures.
//!
//! Two names are a candidate pair when their signatures hold the same value
//! on at least `agreement` of the `bands` bands. Such a pair shares every
//! band of at least one `agreement`-sized combination, so one table per
//! combination, keyed by the values on those bands, finds every such pair
//! without comparing all pairs. Bucket hits are confirmed by counting equal
//! bands, which makes the output exactly the set of pairs meeting the
//! agreement, whatever the insertion order.

use std::collections::BTreeSet;
use std::time::Instant;

use fxhash::FxHashMap;
use ingest::{NameEntry, NameId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{BlockingConfig, PerceptualError};
use crate::features::{extract_features, FeatureSet};
use crate::minhash::{agreement, signature, splitmix64, Signature};

/// Names processed between two progress events.
const PROGRESS_INTERVAL: usize = 100_000;

/// Unordered candidate pair, stored with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidatePair {
    pub a: NameId,
    pub b: NameId,
}

impl CandidatePair {
    /// Orders the two ids; `None` for a self-pair.
    pub fn new(x: NameId, y: NameId) -> Option<Self> {
        match x.cmp(&y) {
            std::cmp::Ordering::Less => Some(Self { a: x, b: y }),
            std::cmp::Ordering::Greater => Some(Self { a: y, b: x }),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Band combinations, one per bucket table, in lexicographic order.
/// Exhaustive mode has a single empty combination, which puts every
/// signature in the same bucket.
pub(crate) fn band_combinations(cfg: &BlockingConfig) -> Vec<Vec<usize>> {
    let keep = cfg.agreement;
    let mut out = Vec::with_capacity(cfg.table_count());
    let mut combo: Vec<usize> = (0..keep).collect();
    loop {
        out.push(combo.clone());
        // Advance to the next combination in lexicographic order.
        let mut i = keep;
        loop {
            if i == 0 {
                return out;
            }
            i -= 1;
            if combo[i] < cfg.bands - keep + i {
                break;
            }
        }
        combo[i] += 1;
        for j in i + 1..keep {
            combo[j] = combo[j - 1] + 1;
        }
    }
}

/// Bucket key of `sig` in the table for `combo`.
#[inline]
fn bucket_key(sig: &[u64], combo: &[usize]) -> u64 {
    combo
        .iter()
        .fold(combo.len() as u64, |acc, &band| splitmix64(acc ^ sig[band]))
}

#[inline]
fn is_candidate(x: &[u64], y: &[u64], needed: usize) -> bool {
    needed == 0 || agreement(x, y) >= needed
}

/// Incremental blocking engine.
///
/// ```
/// use perceptual::{extract_features, BlockingConfig, CandidatePair, LshBlocker};
///
/// let mut blocker = LshBlocker::new(&BlockingConfig::default()).unwrap();
/// assert!(blocker.add(0, &extract_features("ACME CORP", 2)));
/// assert!(blocker.add(1, &extract_features("ACME CORP", 2)));
/// assert!(!blocker.add(2, &extract_features("", 2)));
/// assert_eq!(blocker.unions(), vec![CandidatePair { a: 0, b: 1 }]);
/// ```
#[derive(Debug, Clone)]
pub struct LshBlocker {
    seed: u64,
    bands: usize,
    needed: usize,
    combos: Vec<Vec<usize>>,
    tables: Vec<FxHashMap<u64, Vec<usize>>>,
    entries: Vec<(NameId, Signature)>,
    pairs: BTreeSet<CandidatePair>,
    unblockable: usize,
}

impl LshBlocker {
    pub fn new(cfg: &BlockingConfig) -> Result<Self, PerceptualError> {
        cfg.validate()?;
        let combos = band_combinations(cfg);
        let tables = vec![FxHashMap::default(); combos.len()];
        Ok(Self {
            seed: cfg.seed,
            bands: cfg.bands,
            needed: cfg.agreement,
            combos,
            tables,
            entries: Vec::new(),
            pairs: BTreeSet::new(),
            unblockable: 0,
        })
    }

    /// Signs `features` and inserts `id`. Returns `false` (and records the id
    /// as unblockable) when the features carry no signature.
    pub fn add(&mut self, id: NameId, features: &FeatureSet<'_>) -> bool {
        match signature(features, self.bands, self.seed) {
            Some(sig) => {
                self.insert(id, sig);
                true
            }
            None => {
                self.unblockable += 1;
                false
            }
        }
    }

    /// Inserts a precomputed signature. Its length must equal the configured
    /// band count.
    pub fn add_signature(&mut self, id: NameId, sig: &[u64]) -> Result<(), PerceptualError> {
        if sig.len() != self.bands {
            return Err(PerceptualError::SignatureLength {
                expected: self.bands,
                got: sig.len(),
            });
        }
        self.insert(id, sig.to_vec());
        Ok(())
    }

    fn insert(&mut self, id: NameId, sig: Signature) {
        let pos = self.entries.len();
        for (table, combo) in self.tables.iter_mut().zip(self.combos.iter()) {
            let bucket = table.entry(bucket_key(&sig, combo)).or_default();
            for &other_pos in bucket.iter() {
                let (other, other_sig) = &self.entries[other_pos];
                if is_candidate(&sig, other_sig, self.needed) {
                    if let Some(pair) = CandidatePair::new(id, *other) {
                        self.pairs.insert(pair);
                    }
                }
            }
            bucket.push(pos);
        }
        self.entries.push((id, sig));
    }

    /// Candidate pairs found so far, sorted and deduplicated.
    pub fn unions(&self) -> Vec<CandidatePair> {
        self.pairs.iter().copied().collect()
    }

    /// Number of ids holding a signature.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn unblockable(&self) -> usize {
        self.unblockable
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

/// Pairs found in one bucket table built over all `entries`.
fn scan_table(
    combo: &[usize],
    entries: &[(NameId, Signature)],
    needed: usize,
) -> Vec<CandidatePair> {
    let mut buckets: FxHashMap<u64, Vec<usize>> = FxHashMap::default();
    for (pos, (_, sig)) in entries.iter().enumerate() {
        buckets.entry(bucket_key(sig, combo)).or_default().push(pos);
    }
    let mut out = Vec::new();
    for bucket in buckets.values() {
        for (i, &p) in bucket.iter().enumerate() {
            let (x, xs) = &entries[p];
            for &q in &bucket[i + 1..] {
                let (y, ys) = &entries[q];
                if is_candidate(xs, ys, needed) {
                    out.extend(CandidatePair::new(*x, *y));
                }
            }
        }
    }
    out
}

/// Counters from one blocking run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingStats {
    pub names: usize,
    pub unblockable: usize,
    pub tables: usize,
    pub candidates: usize,
}

/// Output of [`block_names`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockingOutput {
    /// Sorted, deduplicated, no self-pairs.
    pub pairs: Vec<CandidatePair>,
    pub stats: BlockingStats,
}

/// Runs the blocking stage over a name table.
///
/// With `use_parallel`, signatures are computed on the rayon pool and each
/// bucket table is scanned by its own task; the merged result is identical to
/// the sequential run. All tables are alive at once on that path, so memory
/// peaks at `table_count()` bucket entries per name.
pub fn block_names(
    names: &[NameEntry],
    cfg: &BlockingConfig,
) -> Result<BlockingOutput, PerceptualError> {
    cfg.validate()?;
    let start = Instant::now();

    let sign = |entry: &NameEntry| {
        let features = extract_features(&entry.text, cfg.k);
        (entry.id, signature(&features, cfg.bands, cfg.seed))
    };
    let signatures: Vec<(NameId, Option<Signature>)> = if cfg.use_parallel {
        names.par_iter().map(sign).collect()
    } else {
        names.iter().map(sign).collect()
    };

    let mut unblockable = 0usize;
    let mut entries = Vec::with_capacity(signatures.len());
    for (id, sig) in signatures {
        match sig {
            Some(sig) => entries.push((id, sig)),
            None => {
                unblockable += 1;
                debug!(id, "unblockable_name");
            }
        }
    }

    let (pairs, tables) = if cfg.use_parallel {
        let combos = band_combinations(cfg);
        let per_table: Vec<Vec<CandidatePair>> = combos
            .par_iter()
            .map(|combo| scan_table(combo, &entries, cfg.agreement))
            .collect();
        let merged: BTreeSet<CandidatePair> = per_table.into_iter().flatten().collect();
        (merged.into_iter().collect::<Vec<_>>(), combos.len())
    } else {
        let mut blocker = LshBlocker::new(cfg)?;
        for (i, (id, sig)) in entries.into_iter().enumerate() {
            blocker.insert(id, sig);
            if (i + 1) % PROGRESS_INTERVAL == 0 {
                debug!(names = i + 1, candidates = blocker.pairs.len(), "blocking_progress");
            }
        }
        (blocker.unions(), blocker.table_count())
    };

    let stats = BlockingStats {
        names: names.len(),
        unblockable,
        tables,
        candidates: pairs.len(),
    };
    info!(
        names = stats.names,
        unblockable = stats.unblockable,
        tables = stats.tables,
        candidates = stats.candidates,
        parallel = cfg.use_parallel,
        elapsed_micros = start.elapsed().as_micros(),
        "blocking"
    );
    Ok(BlockingOutput { pairs, stats })
}
