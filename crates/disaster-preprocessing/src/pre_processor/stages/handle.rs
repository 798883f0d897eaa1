use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::Stage;

static HANDLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)@\w+").expect("handle pattern is valid"));

/// Literal substituted for a handle when `replace_with_token` is set.
const USER_TOKEN: &str = "user";

/// Replaces `@handle` mentions with `user`, or deletes them.
#[derive(Debug, Clone, Copy)]
pub struct HandleRemoval {
    replace_with_token: bool,
    preserve_word_boundary: bool,
}

impl HandleRemoval {
    pub const NAME: &'static str = "handle_removal";

    /// Deleting a handle glued between two tokens joins them (`hi@bob,there`
    /// becomes `hi,there`, and `hithere` after punctuation removal). Use
    /// [`HandleRemoval::preserving_word_boundary`] to leave a space instead.
    #[must_use]
    pub fn new(replace_with_token: bool) -> Self {
        Self {
            replace_with_token,
            preserve_word_boundary: false,
        }
    }

    /// When deleting, a handle with non-whitespace on both sides becomes a space.
    #[must_use]
    pub fn preserving_word_boundary(mut self, preserve: bool) -> Self {
        self.preserve_word_boundary = preserve;
        self
    }

    #[must_use]
    pub fn replaces_with_token(&self) -> bool {
        self.replace_with_token
    }
}

impl Stage for HandleRemoval {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, text: &str) -> String {
        if self.replace_with_token {
            return HANDLE_PATTERN.replace_all(text, USER_TOKEN).into_owned();
        }
        if !self.preserve_word_boundary {
            return HANDLE_PATTERN.replace_all(text, "").into_owned();
        }

        HANDLE_PATTERN
            .replace_all(text, |caps: &Captures<'_>| {
                let Some(m) = caps.get(0) else {
                    return String::new();
                };
                let glued_before = text[..m.start()]
                    .chars()
                    .next_back()
                    .is_some_and(|c| !c.is_whitespace());
                let glued_after = text[m.end()..]
                    .chars()
                    .next()
                    .is_some_and(|c| !c.is_whitespace());
                if glued_before && glued_after {
                    " ".to_string()
                } else {
                    String::new()
                }
            })
            .into_owned()
    }
}
