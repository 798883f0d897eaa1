use std::sync::Arc;

use super::Stage;
use crate::pre_processor::tables::EmoticonTable;

/// Longest emoji sequence tried, in code points (ZWJ families with skin tones).
const MAX_EMOJI_CHARS: usize = 10;

const VARIATION_SELECTOR_16: char = '\u{FE0F}';
const COMBINING_KEYCAP: char = '\u{20E3}';

/// Joins the words of an emoji name unless configured otherwise.
pub const DEFAULT_WORD_SEPARATOR: &str = "_";

/// Turns emoticons and emoji into words.
///
/// 1. Emoticons are replaced by table lookup in table order (`:)` -> `happy`).
/// 2. Emoji glyphs become `:name:` (`🔥` -> `:fire:`), the words of the name
///    joined by the word separator (`😀` -> `:grinning_face:`).
/// 3. Every `:` is removed, including colons that were already in the text.
#[derive(Debug, Clone)]
pub struct EmoticonDecoding {
    emoticons: Arc<EmoticonTable>,
    word_separator: String,
}

impl EmoticonDecoding {
    pub const NAME: &'static str = "emoticon_decode";

    #[must_use]
    pub fn new(emoticons: impl Into<Arc<EmoticonTable>>) -> Self {
        Self {
            emoticons: emoticons.into(),
            word_separator: DEFAULT_WORD_SEPARATOR.to_string(),
        }
    }

    /// Join the words of emoji names with `separator` instead of `_`. A space
    /// keeps multi-word names as separate tokens once punctuation is removed.
    #[must_use]
    pub fn with_word_separator(mut self, separator: impl Into<String>) -> Self {
        self.word_separator = separator.into();
        self
    }

    #[must_use]
    pub fn word_separator(&self) -> &str {
        &self.word_separator
    }
}

impl Default for EmoticonDecoding {
    fn default() -> Self {
        Self::new(EmoticonTable::basic())
    }
}

impl Stage for EmoticonDecoding {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, text: &str) -> String {
        let replaced = self
            .emoticons
            .iter()
            .fold(text.to_string(), |acc, (emoticon, word)| acc.replace(emoticon, word));
        demojize(&replaced, &self.word_separator).replace(':', "")
    }
}

/// Replace each emoji with its CLDR name wrapped in colons.
pub(crate) fn demojize(text: &str, separator: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(first) = rest.chars().next() {
        match longest_emoji_prefix(rest) {
            Some((emoji, len)) => {
                out.push(':');
                push_name(&mut out, emoji.name(), separator);
                out.push(':');
                rest = &rest[len..];
            }
            None => {
                out.push(first);
                rest = &rest[first.len_utf8()..];
            }
        }
    }
    out
}

/// `family: man, woman, girl` -> `family_man_woman_girl`.
fn push_name(out: &mut String, name: &str, separator: &str) {
    let cleaned = name.replace([':', ','], "");
    for (idx, word) in cleaned.split_whitespace().enumerate() {
        if idx > 0 {
            out.push_str(separator);
        }
        out.push_str(word);
    }
}

fn longest_emoji_prefix(text: &str) -> Option<(&'static emojis::Emoji, usize)> {
    let mut chars = text.chars();
    let first = chars.next()?;
    // Plain ASCII is never an emoji on its own; keycaps need a modifier.
    if first.is_ascii() && !matches!(chars.next(), Some(VARIATION_SELECTOR_16 | COMBINING_KEYCAP)) {
        return None;
    }

    let ends = text
        .char_indices()
        .take(MAX_EMOJI_CHARS)
        .map(|(idx, ch)| idx + ch.len_utf8())
        .collect::<Vec<_>>();
    ends.into_iter()
        .rev()
        .find_map(|end| emojis::get(&text[..end]).map(|emoji| (emoji, end)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emoticon_to_word() {
        let stage = EmoticonDecoding::default();
        assert_eq!(stage.apply("I am :) today"), "I am happy today");
        assert_eq!(stage.apply("ugh :-( and :("), "ugh sad and sad");
        assert_eq!(stage.apply("wow :O"), "wow surprised");
    }

    #[test]
    fn test_nose_variant_consumed_whole() {
        assert_eq!(EmoticonDecoding::default().apply("hi :-)"), "hi happy");
    }

    #[test]
    fn test_earlier_table_entry_wins() {
        let table = EmoticonTable::from_pairs([(":", "colon "), (":)", "happy")]);
        let stage = EmoticonDecoding::new(table);
        assert_eq!(stage.apply(":)"), "colon )");
    }

    #[test]
    fn test_emoji_to_name() {
        let stage = EmoticonDecoding::default();
        assert_eq!(stage.apply("house on 🔥 now"), "house on fire now");
        assert_eq!(demojize("🔥", "_"), ":fire:");
    }

    #[test]
    fn test_multi_word_emoji_name_uses_underscores() {
        assert_eq!(EmoticonDecoding::default().apply("😀"), "grinning_face");
    }

    #[test]
    fn test_name_punctuation_dropped() {
        assert_eq!(demojize("👨\u{200D}👩\u{200D}👧", "_"), ":family_man_woman_girl:");
        assert_eq!(
            EmoticonDecoding::default().apply("👨\u{200D}👩\u{200D}👧"),
            "family_man_woman_girl"
        );
    }

    #[test]
    fn test_variation_selector_and_keycap_sequences() {
        assert_eq!(demojize("❤\u{FE0F}", "_"), ":red_heart:");
        assert_eq!(demojize("#\u{FE0F}\u{20E3} now", "_"), ":keycap_#: now");
    }

    #[test]
    fn test_custom_word_separator() {
        let stage = EmoticonDecoding::default().with_word_separator(" ");
        assert_eq!(stage.word_separator(), " ");
        assert_eq!(stage.apply("so 😱"), "so face screaming in fear");
        assert_eq!(stage.apply("🔥"), "fire");
    }

    #[test]
    fn test_literal_colons_removed() {
        assert_eq!(EmoticonDecoding::default().apply("ALERT: 10:30"), "ALERT 1030");
    }

    #[test]
    fn test_plain_text_unchanged() {
        let text = "Forest fire near La Ronge";
        assert_eq!(EmoticonDecoding::default().apply(text), text);
        assert_eq!(demojize("a1#b é", "_"), "a1#b é");
    }
}
