//! Weighted MinHash band values.
//!
//! Band `j` hashes every feature under its own key, maps the hash to a
//! uniform draw `u` in (0, 1) and scores the feature `-ln(u) / weight`. The
//! band value is the hash of the lowest-scoring feature. Heavy features win
//! more bands, and two names pick the same feature in a band with a
//! probability that grows with their weighted overlap.

use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::features::FeatureSet;

/// One value per band.
pub type Signature = Vec<u64>;

/// Key for band `band`, spread over the seed space with a golden-ratio step.
#[inline]
pub(crate) fn band_seed(seed: u64, band: usize) -> u64 {
    let step = (band as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    splitmix64(seed.wrapping_add(step))
}

/// Derives the key used for the token class so a token and a shingle with
/// the same text hash differently.
#[inline]
pub(crate) fn token_seed(seed: u64) -> u64 {
    splitmix64(seed ^ 0x9E37_79B9_7F4A_7C15)
}

/// SplitMix64 finalizer.
#[inline]
pub(crate) fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Top 53 bits of `h` as a float strictly inside (0, 1).
#[inline]
fn unit_interval(h: u64) -> f64 {
    ((h >> 11) as f64 + 0.5) * (1.0 / (1u64 << 53) as f64)
}

/// Computes `bands` band values, or `None` when no feature carries weight
/// (such a name cannot be placed in any bucket meaningfully).
pub fn signature(features: &FeatureSet<'_>, bands: usize, seed: u64) -> Option<Signature> {
    if features.is_empty() || features.total_weight() <= 0.0 {
        return None;
    }
    let mut out = Vec::with_capacity(bands);
    for band in 0..bands {
        let key = band_seed(seed, band);
        let shingle = lowest(&features.shingles, key);
        let token = lowest(&features.tokens, token_seed(key));
        let winner = match (shingle, token) {
            (Some(s), Some(t)) => {
                if t.0 < s.0 {
                    t
                } else {
                    s
                }
            }
            (Some(s), None) => s,
            (None, Some(t)) => t,
            // Unreachable while total_weight > 0.
            (None, None) => return None,
        };
        out.push(winner.1);
    }
    Some(out)
}

/// Lowest `(score, hash)` over the features with positive weight.
fn lowest(features: &[(&str, f64)], key: u64) -> Option<(f64, u64)> {
    let mut best: Option<(f64, u64)> = None;
    for &(text, w) in features {
        if w <= 0.0 {
            continue;
        }
        let h = xxh3_64_with_seed(text.as_bytes(), key);
        let score = -unit_interval(h).ln() / w;
        if best.is_none_or(|(b, _)| score < b) {
            best = Some((score, h));
        }
    }
    best
}

/// Number of bands on which `x` and `y` hold the same value.
#[inline]
pub fn agreement(x: &[u64], y: &[u64]) -> usize {
    x.iter().zip(y).filter(|(a, b)| a == b).count()
}
