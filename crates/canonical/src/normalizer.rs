use std::borrow::Cow;
use std::sync::Arc;

use fxhash::FxHashSet;
use unicode_categories::UnicodeCategories;
use unicode_normalization::UnicodeNormalization;

use crate::config::NormalizerConfig;
use crate::error::CanonicalError;
use crate::whitespace::{collapse_whitespace, join_words};

/// Turns raw firm names into the two canonical forms the pipeline compares.
///
/// `weak` is applied once per raw record and decides which records share a
/// name id; `strong` is applied once per name id before scoring. Both must be
/// pure: the same input gives the same output on every call and thread.
pub trait Normalizer: Send + Sync {
    fn weak(&self, raw: &str) -> String;
    fn strong(&self, name: &str) -> String;
}

impl<N: Normalizer + ?Sized> Normalizer for &N {
    fn weak(&self, raw: &str) -> String {
        (**self).weak(raw)
    }

    fn strong(&self, name: &str) -> String {
        (**self).strong(name)
    }
}

impl<N: Normalizer + ?Sized> Normalizer for Box<N> {
    fn weak(&self, raw: &str) -> String {
        (**self).weak(raw)
    }

    fn strong(&self, name: &str) -> String {
        (**self).strong(name)
    }
}

impl<N: Normalizer + ?Sized> Normalizer for Arc<N> {
    fn weak(&self, raw: &str) -> String {
        (**self).weak(raw)
    }

    fn strong(&self, name: &str) -> String {
        (**self).strong(name)
    }
}

/// Rule-based normalizer for company names.
///
/// Weak form: NFKC, uppercase, configured characters deleted, any other
/// punctuation, symbol or control character turned into a space, whitespace
/// collapsed. `&` is kept so `AT&T` survives as one token.
///
/// Strong form: the weak form with corporate designators removed. A name made
/// only of designators (`"CO LTD"`) keeps its weak form rather than vanishing.
#[derive(Debug, Clone)]
pub struct FirmNormalizer {
    cfg: NormalizerConfig,
    suffixes: FxHashSet<String>,
}

impl FirmNormalizer {
    pub fn new(cfg: NormalizerConfig) -> Result<Self, CanonicalError> {
        cfg.validate()?;
        let mut normalizer = Self {
            cfg,
            suffixes: FxHashSet::default(),
        };
        // Suffixes go through the weak rules so "Co." in a config matches "CO".
        let suffixes = normalizer
            .cfg
            .corporate_suffixes
            .iter()
            .map(|s| normalizer.weak(s))
            .filter(|s| !s.is_empty())
            .collect();
        normalizer.suffixes = suffixes;
        Ok(normalizer)
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.cfg
    }

    fn push_mapped(&self, ch: char, out: &mut String) {
        if self.cfg.dropped_chars.contains(&ch) {
            return;
        }
        if ch.is_alphanumeric() || ch == '&' || ch.is_mark() {
            if self.cfg.uppercase {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
        } else if ch.is_whitespace()
            || ch.is_control()
            || ch.is_punctuation()
            || ch.is_symbol()
        {
            out.push(' ');
        } else {
            out.push(ch);
        }
    }
}

impl Default for FirmNormalizer {
    fn default() -> Self {
        let cfg = NormalizerConfig::default();
        let suffixes = cfg
            .corporate_suffixes
            .iter()
            .map(|s| s.to_uppercase())
            .collect();
        Self { cfg, suffixes }
    }
}

impl Normalizer for FirmNormalizer {
    fn weak(&self, raw: &str) -> String {
        let unified: Cow<'_, str> = if self.cfg.normalize_unicode {
            Cow::Owned(raw.nfkc().collect())
        } else {
            Cow::Borrowed(raw)
        };

        let mut mapped = String::with_capacity(unified.len());
        for ch in unified.chars() {
            self.push_mapped(ch, &mut mapped);
        }
        collapse_whitespace(&mapped)
    }

    fn strong(&self, name: &str) -> String {
        let weak = self.weak(name);
        let kept = join_words(weak.split(' ').filter(|t| !self.suffixes.contains(*t)));
        if kept.is_empty() {
            weak
        } else {
            kept
        }
    }
}
