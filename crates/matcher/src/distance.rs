//! Bounded Levenshtein distance over Unicode scalar values.

/// Edit distance between `a` and `b`, or `None` as soon as it provably
/// exceeds `max_dist`.
///
/// Two cut-offs keep the common "obviously different" case cheap: the length
/// difference alone is a lower bound, and no later DP row can go below the
/// minimum of the current one.
pub fn bounded_levenshtein(a: &[char], b: &[char], max_dist: usize) -> Option<usize> {
    // Keep the shorter string on the inner loop.
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    if long.len() - short.len() > max_dist {
        return None;
    }
    if short.is_empty() {
        return Some(long.len());
    }

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut cur = vec![0usize; short.len() + 1];

    for (i, &lc) in long.iter().enumerate() {
        cur[0] = i + 1;
        let mut row_min = cur[0];
        for (j, &sc) in short.iter().enumerate() {
            let substitution = prev[j] + usize::from(lc != sc);
            let deletion = prev[j + 1] + 1;
            let insertion = cur[j] + 1;
            cur[j + 1] = substitution.min(deletion).min(insertion);
            row_min = row_min.min(cur[j + 1]);
        }
        if row_min > max_dist {
            return None;
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    let distance = prev[short.len()];
    (distance <= max_dist).then_some(distance)
}

/// Largest distance that can still score above `threshold` for strings of
/// `max_len` chars.
#[inline]
pub fn max_distance(max_len: usize, threshold: f64) -> usize {
    (max_len as f64 * (1.0 - threshold)).ceil() as usize
}

/// `1 - d / max_len`, where `d` is the bounded distance. Pairs whose distance
/// exceeds the bound, and two empty strings, score 0.
pub fn similarity(a: &[char], b: &[char], threshold: f64) -> f64 {
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 0.0;
    }
    match bounded_levenshtein(a, b, max_distance(max_len, threshold)) {
        Some(d) => 1.0 - d as f64 / max_len as f64,
        None => 0.0,
    }
}
