//! Text normalization ahead of language detection.
//! Mentions and links carry no language signal and skew n-gram statistics,
//! so whole tokens starting with an excluded prefix are dropped.

/// Prefixes stripped when the deployment does not configure its own.
pub const DEFAULT_STRIP_PREFIXES: &[&str] = &["@", "http"];

/// Whitespace tokenizer that drops tokens by prefix.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    prefixes: Vec<String>,
}

impl TextNormalizer {
    /// Build a normalizer for the given exclusion prefixes.
    /// Empty prefixes are ignored, they would match every token.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    #[inline]
    fn is_excluded(&self, token: &str) -> bool {
        self.prefixes.iter().any(|p| token.starts_with(p.as_str()))
    }

    /// Drop excluded tokens and rejoin the rest.
    ///
    /// Every surviving token is followed by one space, the last one included.
    /// Clients have seen `"hello world "` for years, so the trailing space stays.
    pub fn normalize(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for token in text.split_whitespace().filter(|t| !self.is_excluded(t)) {
            out.push_str(token);
            out.push(' ');
        }
        out
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_STRIP_PREFIXES.iter().copied())
    }
}
