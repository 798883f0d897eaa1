//! Text normalization stages.
//!
//! Each stage is a pure `&str -> String` transformation whose configuration is
//! fixed when it is built. Stages hold no state between calls, so one instance
//! can be shared by every worker thread.

mod contraction;
mod emoticon;
mod handle;
mod hashtag;
mod html;
mod punctuation;
mod repeat;
mod url;

use std::fmt;

pub use contraction::ContractionExpansion;
pub use emoticon::{DEFAULT_WORD_SEPARATOR, EmoticonDecoding};
pub use handle::HandleRemoval;
pub use hashtag::HashtagStrip;
pub use html::HtmlDecoding;
pub use punctuation::PunctuationRemoval;
pub use repeat::RepeatCollapse;
pub use url::{DEFAULT_URL_PATTERN, UrlRemoval};

use crate::error::IssueKind;

/// A named, pure text transformation.
pub trait Stage: Send + Sync + fmt::Debug {
    /// Stable name, matching the `kind` used in configuration.
    fn name(&self) -> &'static str;

    fn apply(&self, text: &str) -> String;

    /// Like [`Stage::apply`], additionally recording non-fatal problems the
    /// stage recovered from. Most stages have none to report.
    fn apply_with_diagnostics(&self, text: &str, _diagnostics: &mut Vec<IssueKind>) -> String {
        self.apply(text)
    }
}
