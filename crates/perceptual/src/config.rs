//! Configuration and error types for the blocking stage.
//!
//! Like the rest of the crate this module is free of I/O: candidate generation
//! is a pure function of `(names, config)`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on the number of bucket tables a configuration may require.
///
/// Banding keeps one table per combination of `agreement` bands, which grows
/// combinatorially with `bands`.
pub const MAX_TABLES: usize = 4096;

/// Largest supported number of bands.
pub const MAX_BANDS: usize = 64;

/// Configuration for [`LshBlocker`](crate::LshBlocker) and
/// [`block_names`](crate::block_names).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BlockingConfig {
    /// Configuration schema version.
    ///
    /// Any change that can move a signature must bump this, so persisted pair
    /// tables can be traced to the settings that produced them.
    pub version: u32,
    /// Characters per shingle.
    pub k: usize,
    /// Number of independent weighted MinHash values per name.
    pub bands: usize,
    /// How many band values two names must share to become a candidate
    /// pair. `0` switches to exhaustive mode, where every pair of blockable
    /// names is a candidate.
    pub agreement: usize,
    /// Seed for feature hashing.
    pub seed: u64,
    /// Compute signatures and scan bucket tables on the rayon pool.
    ///
    /// The parallel scan builds every bucket table at once, so peak memory
    /// holds `table_count()` entries per name instead of one table's worth
    /// at a time.
    pub use_parallel: bool,
}

impl BlockingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shingle length. Short names dominate firm data, so 2 or 3.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_bands(mut self, bands: usize) -> Self {
        self.bands = bands;
        self
    }

    /// Fewer agreeing bands = higher recall and more candidates.
    pub fn with_agreement(mut self, agreement: usize) -> Self {
        self.agreement = agreement;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    /// Every pair of blockable names becomes a candidate. Quadratic; meant
    /// for small corpora and tests.
    pub fn exhaustive(mut self) -> Self {
        self.agreement = 0;
        self
    }

    pub fn is_exhaustive(&self) -> bool {
        self.agreement == 0
    }

    /// Number of bucket tables this configuration needs.
    pub fn table_count(&self) -> usize {
        if self.agreement > self.bands {
            return 0;
        }
        binomial_capped(self.bands, self.agreement, MAX_TABLES + 1)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), PerceptualError> {
        if self.version < 1 {
            return Err(PerceptualError::InvalidConfigVersion {
                version: self.version,
            });
        }
        if self.k < 1 {
            return Err(PerceptualError::InvalidConfigK { k: self.k });
        }
        if self.bands < 1 || self.bands > MAX_BANDS {
            return Err(PerceptualError::InvalidConfigBands { bands: self.bands });
        }
        if self.agreement > self.bands {
            return Err(PerceptualError::InvalidConfigAgreement {
                agreement: self.agreement,
                bands: self.bands,
            });
        }
        if self.table_count() > MAX_TABLES {
            return Err(PerceptualError::TooManyTables {
                bands: self.bands,
                agreement: self.agreement,
                limit: MAX_TABLES,
            });
        }
        Ok(())
    }
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            version: 1,
            k: 2,
            bands: 8,
            agreement: 4,
            seed: 0xF00D_BAAD_F00D_BAAD,
            use_parallel: false,
        }
    }
}

/// `n choose r`, saturating at `cap`.
fn binomial_capped(n: usize, r: usize, cap: usize) -> usize {
    let r = r.min(n - r);
    let mut acc: u128 = 1;
    for i in 0..r {
        // Exact at every step: acc * (n - i) is divisible by (i + 1).
        acc = acc * (n - i) as u128 / (i + 1) as u128;
        if acc >= cap as u128 {
            return cap;
        }
    }
    acc as usize
}

/// Errors returned by the blocking stage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PerceptualError {
    #[error("invalid config: k must be >= 1 (got {k})")]
    InvalidConfigK { k: usize },

    #[error("invalid config: bands must be in 1..=64 (got {bands})")]
    InvalidConfigBands { bands: usize },

    #[error("invalid config: agreement must be <= bands (got {agreement} of {bands})")]
    InvalidConfigAgreement { agreement: usize, bands: usize },

    #[error("invalid config version {version}; expected >= 1")]
    InvalidConfigVersion { version: u32 },

    #[error("signature has {got} band values; expected {expected}")]
    SignatureLength { expected: usize, got: usize },

    #[error(
        "invalid config: bands={bands} agreement={agreement} needs more than {limit} bucket tables"
    )]
    TooManyTables {
        bands: usize,
        agreement: usize,
        limit: usize,
    },
}
