use crate::UrlError;
use regex::Regex;

/// A URL pattern anchored at the start of the normalized URL
///
/// A source pattern `P` is compiled as `^(?:P)`, so `/posts/.*` matches
/// `/posts/abc` but not `/other/posts/abc`. The original source text is kept
/// for checkpoints.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles a pattern
    ///
    /// # Examples
    ///
    /// ```
    /// use post_harvest::url::Pattern;
    ///
    /// let pattern = Pattern::new(r"/posts/\w+/").unwrap();
    /// assert!(pattern.is_match("/posts/abc/"));
    /// assert!(!pattern.is_match("/tags/posts/abc/"));
    /// ```
    pub fn new(source: &str) -> Result<Self, UrlError> {
        let regex =
            Regex::new(&format!("^(?:{})", source)).map_err(|e| UrlError::InvalidPattern {
                pattern: source.to_string(),
                source: e,
            })?;

        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// Returns true if the normalized URL matches from its first character
    pub fn is_match(&self, normalized: &str) -> bool {
        self.regex.is_match(normalized)
    }

    /// The pattern as written, without the anchoring wrapper
    pub fn as_str(&self) -> &str {
        &self.source
    }
}
