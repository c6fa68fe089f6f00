use serde::{Deserialize, Serialize};

/// Corporate designators removed by the strong form.
///
/// Entries are matched against whole tokens of the weak form, so they are
/// written the way the weak form spells them: uppercase, no periods.
pub const DEFAULT_CORPORATE_SUFFIXES: &[&str] = &[
    "AB",
    "AG",
    "BV",
    "CO",
    "COMPANY",
    "CORP",
    "CORPORATION",
    "GMBH",
    "INC",
    "INCORPORATED",
    "KG",
    "KK",
    "LLC",
    "LLP",
    "LP",
    "LTD",
    "LIMITED",
    "NV",
    "OY",
    "PLC",
    "SA",
    "SARL",
    "SPA",
    "SRL",
];

/// Configuration for [`FirmNormalizer`](crate::FirmNormalizer).
///
/// Bump `version` whenever the rules change in a way that can move a name to a
/// different weak or strong form; persisted name tables built under another
/// version should then be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Rule version. Must be >= 1.
    pub version: u32,

    /// Apply NFKC before anything else, folding fullwidth and compatibility
    /// characters onto their plain forms.
    pub normalize_unicode: bool,

    /// Uppercase the weak form.
    pub uppercase: bool,

    /// Characters deleted outright rather than turned into a space, so that
    /// `"CORP."` and `"O'NEIL"` stay single tokens.
    pub dropped_chars: Vec<char>,

    /// Whole-token designators removed by the strong form.
    pub corporate_suffixes: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            normalize_unicode: true,
            uppercase: true,
            dropped_chars: vec!['.', '\'', '\u{2019}'],
            corporate_suffixes: DEFAULT_CORPORATE_SUFFIXES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl NormalizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_normalize_unicode(mut self, enabled: bool) -> Self {
        self.normalize_unicode = enabled;
        self
    }

    pub fn with_uppercase(mut self, enabled: bool) -> Self {
        self.uppercase = enabled;
        self
    }

    pub fn with_dropped_chars(mut self, chars: Vec<char>) -> Self {
        self.dropped_chars = chars;
        self
    }

    pub fn with_corporate_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.corporate_suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }

    /// Rejects configurations the normalizer cannot honour.
    pub fn validate(&self) -> Result<(), crate::CanonicalError> {
        if self.version == 0 {
            return Err(crate::CanonicalError::InvalidConfig(
                "version must be >= 1".into(),
            ));
        }
        if let Some(ch) = self.dropped_chars.iter().find(|c| c.is_alphanumeric()) {
            return Err(crate::CanonicalError::InvalidConfig(format!(
                "dropped_chars may not contain alphanumeric characters (got {ch:?})"
            )));
        }
        for suffix in &self.corporate_suffixes {
            if suffix.trim().is_empty() {
                return Err(crate::CanonicalError::InvalidConfig(
                    "corporate_suffixes may not contain empty entries".into(),
                ));
            }
            if suffix.trim().contains(char::is_whitespace) {
                return Err(crate::CanonicalError::InvalidConfig(format!(
                    "corporate suffix must be a single token (got {suffix:?})"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CanonicalError;

    #[test]
    fn default_is_valid() {
        let cfg = NormalizerConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(cfg.corporate_suffixes.iter().any(|s| s == "CORPORATION"));
    }

    #[test]
    fn zero_version_rejected() {
        let err = NormalizerConfig::default()
            .with_version(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, CanonicalError::InvalidConfig(_)));
    }

    #[test]
    fn multi_token_suffix_rejected() {
        let err = NormalizerConfig::default()
            .with_corporate_suffixes(["PTY LTD"])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("single token"));
    }

    #[test]
    fn alphanumeric_dropped_char_rejected() {
        let result = NormalizerConfig::default()
            .with_dropped_chars(vec!['.', 'x'])
            .validate();
        assert!(result.is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: NormalizerConfig = serde_json::from_str(r#"{"uppercase": false}"#).unwrap();
        assert!(!cfg.uppercase);
        assert_eq!(cfg.version, 1);
        assert!(cfg.normalize_unicode);
    }
}
