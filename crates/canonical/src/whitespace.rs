/// Collapses every run of Unicode whitespace to one ASCII space and trims both
/// ends.
///
/// Normalized firm names are compared byte-for-byte when the name table is
/// built, so `"ACME  CORP"` and `" ACME CORP "` must come out identical.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Joins `words` with single spaces, skipping empty entries.
pub(crate) fn join_words<'a, I>(words: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for word in words.into_iter().filter(|w| !w.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_mixed_whitespace() {
        assert_eq!(collapse_whitespace("  ACME\t\tCORP \n"), "ACME CORP");
        assert_eq!(collapse_whitespace("ACME\u{00A0}\u{2003}CORP"), "ACME CORP");
    }

    #[test]
    fn whitespace_only_collapses_to_empty() {
        assert_eq!(collapse_whitespace(" \t\r\n "), "");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn join_skips_empty_words() {
        assert_eq!(join_words(["ACME", "", "HOLDINGS"]), "ACME HOLDINGS");
        assert_eq!(join_words(Vec::<&str>::new()), "");
    }
}
