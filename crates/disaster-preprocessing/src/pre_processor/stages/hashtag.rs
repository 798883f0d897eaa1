use super::Stage;

/// Drops the leading `#` of every whitespace-delimited token.
///
/// Tokens are rejoined with single spaces, so runs of whitespace collapse and
/// leading/trailing whitespace disappears. A `#` inside a token is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashtagStrip;

impl HashtagStrip {
    pub const NAME: &'static str = "hashtag_strip";
}

impl Stage for HashtagStrip {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, text: &str) -> String {
        text.split_whitespace()
            .map(|token| token.strip_prefix('#').unwrap_or(token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
