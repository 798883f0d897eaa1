use regex::{Regex, RegexBuilder};

use super::Stage;
use crate::error::PipelineError;

/// Pattern used by the default pipeline: `http(s)://` links and bare `www.` hosts.
pub const DEFAULT_URL_PATTERN: &str = r"https?://\S+|www\.\S+";

/// Replaces every match of a caller-supplied URL pattern with a single space.
#[derive(Debug, Clone)]
pub struct UrlRemoval {
    pattern: Regex,
}

impl UrlRemoval {
    pub const NAME: &'static str = "url_removal";

    /// Compile `pattern` case-insensitively.
    pub fn new(pattern: &str) -> Result<Self, PipelineError> {
        if pattern.is_empty() {
            return Err(PipelineError::invalid_stage(Self::NAME, "pattern must not be empty"));
        }
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| PipelineError::invalid_stage(Self::NAME, e.to_string()))?;
        Ok(Self { pattern })
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Stage for UrlRemoval {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, text: &str) -> String {
        self.pattern.replace_all(text, " ").into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> UrlRemoval {
        UrlRemoval::new(DEFAULT_URL_PATTERN).unwrap()
    }

    #[test]
    fn test_removes_links_with_single_space() {
        assert_eq!(stage().apply("visit http://t.co/abc now"), "visit   now");
        assert_eq!(stage().apply("see www.example.com"), "see  ");
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert_eq!(stage().apply("HTTPS://X.CO/Q and WWW.Site.org"), "  and  ");
    }

    #[test]
    fn test_no_match_is_unchanged() {
        let text = "forest fire near La Ronge";
        assert_eq!(stage().apply(text), text);
    }

    #[test]
    fn test_caller_supplied_pattern() {
        let narrow = UrlRemoval::new(r"t\.co/\w+").unwrap();
        assert_eq!(narrow.apply("link t.co/x1 and http://a.b"), "link   and http://a.b");
        assert_eq!(narrow.pattern(), r"t\.co/\w+");
    }

    #[test]
    fn test_idempotent_after_first_pass() {
        let once = stage().apply("a http://x.co b www.y.org c");
        assert_eq!(stage().apply(&once), once);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = UrlRemoval::new("(unclosed").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidStageConfig { ref stage, .. } if stage == "url_removal"));
        assert!(UrlRemoval::new("").is_err());
    }
}
