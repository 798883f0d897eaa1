use super::Stage;

/// Deletes every ASCII punctuation character, `` !"#$%&'()*+,-./:;<=>?@[\]^_`{|}~ ``.
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationRemoval;

impl PunctuationRemoval {
    pub const NAME: &'static str = "punctuation_removal";
}

impl Stage for PunctuationRemoval {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, text: &str) -> String {
        text.chars().filter(|c| !c.is_ascii_punctuation()).collect()
    }
}
