//! Weighted feature extraction over weak-normalized names.
//!
//! A name contributes two feature classes: character k-shingles (a sliding
//! window over Unicode scalar values, duplicates kept) and whitespace tokens.
//! Each class carries a linear weight ramp from 1.0 at its first element down
//! to 0.0 at its last, so the start of a firm name (which is where the
//! distinctive part usually sits) dominates the signature.

/// Features of one name, borrowing from the name text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet<'a> {
    pub shingles: Vec<(&'a str, f64)>,
    pub tokens: Vec<(&'a str, f64)>,
}

impl<'a> FeatureSet<'a> {
    pub fn is_empty(&self) -> bool {
        self.shingles.is_empty() && self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.shingles.len() + self.tokens.len()
    }

    pub fn total_weight(&self) -> f64 {
        self.shingles
            .iter()
            .chain(self.tokens.iter())
            .map(|(_, w)| *w)
            .sum()
    }
}

/// Extracts shingles of `k` chars and whitespace tokens from `name`.
///
/// Never fails. A name shorter than `k` chars yields no shingles; an empty
/// name yields an empty set, which the blocker treats as unblockable.
pub fn extract_features(name: &str, k: usize) -> FeatureSet<'_> {
    let shingle_texts = char_shingles(name, k);
    let token_texts: Vec<&str> = name.split_whitespace().collect();
    FeatureSet {
        shingles: with_ramp(shingle_texts),
        tokens: with_ramp(token_texts),
    }
}

fn char_shingles(name: &str, k: usize) -> Vec<&str> {
    if k == 0 {
        return Vec::new();
    }
    // Byte offset of every char boundary, including the end of the string.
    let bounds: Vec<usize> = name
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(name.len()))
        .collect();
    let chars = bounds.len() - 1;
    if chars < k {
        return Vec::new();
    }
    (0..=chars - k)
        .map(|i| &name[bounds[i]..bounds[i + k]])
        .collect()
}

/// Pairs each item with `1 - i/(n-1)`; a single item gets 1.0.
fn with_ramp(items: Vec<&str>) -> Vec<(&str, f64)> {
    let n = items.len();
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let w = if n == 1 {
                1.0
            } else {
                1.0 - i as f64 / (n - 1) as f64
            };
            (item, w)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shingles_and_tokens_with_ramp() {
        let fs = extract_features("ACME CO", 2);
        let texts: Vec<_> = fs.shingles.iter().map(|(s, _)| *s).collect();
        assert_eq!(texts, vec!["AC", "CM", "ME", "E ", " C", "CO"]);
        assert_eq!(fs.shingles[0].1, 1.0);
        assert!((fs.shingles[1].1 - 0.8).abs() < 1e-12);
        assert_eq!(fs.shingles[5].1, 0.0);
        assert_eq!(fs.tokens, vec![("ACME", 1.0), ("CO", 0.0)]);
    }

    #[test]
    fn single_token_gets_full_weight() {
        let fs = extract_features("ACME", 2);
        assert_eq!(fs.tokens, vec![("ACME", 1.0)]);
        assert_eq!(fs.shingles.len(), 3);
    }

    #[test]
    fn name_shorter_than_k_has_no_shingles() {
        let fs = extract_features("A", 2);
        assert!(fs.shingles.is_empty());
        assert_eq!(fs.tokens, vec![("A", 1.0)]);
        assert!(!fs.is_empty());
    }

    #[test]
    fn shingles_follow_unicode_scalars() {
        let fs = extract_features("ÄÖÜ", 2);
        let texts: Vec<_> = fs.shingles.iter().map(|(s, _)| *s).collect();
        assert_eq!(texts, vec!["ÄÖ", "ÖÜ"]);
    }

    #[test]
    fn duplicate_shingles_preserved() {
        let fs = extract_features("AAAA", 2);
        assert_eq!(fs.shingles.len(), 3);
        assert!(fs.shingles.iter().all(|(s, _)| *s == "AA"));
    }

    #[test]
    fn empty_name_is_empty_set() {
        let fs = extract_features("", 2);
        assert!(fs.is_empty());
        assert_eq!(fs.len(), 0);
        assert_eq!(fs.total_weight(), 0.0);
    }

    #[test]
    fn total_weight_sums_both_classes() {
        // shingles: AB(1.0) BC(0.0); tokens: ABC(1.0)
        let fs = extract_features("ABC", 2);
        assert!((fs.total_weight() - 2.0).abs() < 1e-12);
    }
}
