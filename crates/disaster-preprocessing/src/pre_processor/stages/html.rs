use super::Stage;
use crate::error::IssueKind;

/// Elements whose bodies are code or styling rather than text.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Longest fragment quoted back in a malformed-markup diagnostic.
const MAX_FRAGMENT_CHARS: usize = 32;

/// Decodes HTML entities, then strips markup and keeps the text content.
///
/// Unterminated tags and comments are kept verbatim and reported as
/// [`IssueKind::MalformedMarkup`]; the stage itself never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlDecoding;

impl HtmlDecoding {
    pub const NAME: &'static str = "html_decode";
}

impl Stage for HtmlDecoding {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, text: &str) -> String {
        self.apply_with_diagnostics(text, &mut Vec::new())
    }

    fn apply_with_diagnostics(&self, text: &str, diagnostics: &mut Vec<IssueKind>) -> String {
        let decoded = html_escape::decode_html_entities(text);
        strip_markup(&decoded, diagnostics)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Markup {
    Comment,
    Declaration,
    StartTag,
    EndTag,
    Text,
}

fn classify(from_lt: &str) -> Markup {
    let mut bytes = from_lt.bytes().skip(1);
    match bytes.next() {
        Some(b'!') if from_lt.starts_with("<!--") => Markup::Comment,
        Some(b'!' | b'?') => Markup::Declaration,
        Some(b'/') => match bytes.next() {
            Some(b) if b.is_ascii_alphabetic() => Markup::EndTag,
            _ => Markup::Text,
        },
        Some(b) if b.is_ascii_alphabetic() => Markup::StartTag,
        _ => Markup::Text,
    }
}

/// Byte offset just past the `>` closing the tag at the start of `tag`,
/// skipping `>` inside quoted attribute values.
fn find_tag_end(tag: &str) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (idx, b) in tag.bytes().enumerate() {
        match (quote, b) {
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(idx + 1),
            (None, _) => {}
        }
    }
    None
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches(['<', '/'])
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn malformed(fragment: &str) -> IssueKind {
    IssueKind::MalformedMarkup {
        fragment: fragment.chars().take(MAX_FRAGMENT_CHARS).collect(),
    }
}

/// Byte offset of `</name` in `text`, compared ASCII case-insensitively.
fn find_closing_tag(text: &str, name: &str) -> Option<usize> {
    let needle = format!("</{name}");
    text.to_ascii_lowercase().find(&needle)
}

/// Append a text node. Entities left over from double encoding
/// (`&amp;lt;`) are decoded here, as text content of the parsed markup.
fn push_text(out: &mut String, text: &str) {
    out.push_str(&html_escape::decode_html_entities(text));
}

fn strip_markup(input: &str, diagnostics: &mut Vec<IssueKind>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(lt) = rest.find('<') {
        let (before, from_lt) = rest.split_at(lt);
        push_text(&mut out, before);

        match classify(from_lt) {
            Markup::Text => {
                out.push('<');
                rest = &from_lt[1..];
            }
            Markup::Comment => match from_lt[4..].find("-->") {
                Some(end) => rest = &from_lt[4 + end + 3..],
                None => {
                    diagnostics.push(malformed(from_lt));
                    out.push_str(from_lt);
                    rest = "";
                }
            },
            Markup::Declaration | Markup::EndTag => match find_tag_end(from_lt) {
                Some(end) => rest = &from_lt[end..],
                None => {
                    diagnostics.push(malformed(from_lt));
                    out.push_str(from_lt);
                    rest = "";
                }
            },
            Markup::StartTag => {
                let Some(end) = find_tag_end(from_lt) else {
                    diagnostics.push(malformed(from_lt));
                    out.push_str(from_lt);
                    rest = "";
                    continue;
                };
                let tag = &from_lt[..end];
                let after = &from_lt[end..];
                let name = tag_name(tag);
                let self_closing = tag.ends_with("/>");

                if !self_closing && RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                    match find_closing_tag(after, &name) {
                        Some(close) => {
                            let closing = &after[close..];
                            rest = find_tag_end(closing).map_or("", |e| &closing[e..]);
                        }
                        None => {
                            diagnostics.push(malformed(tag));
                            rest = after;
                        }
                    }
                } else {
                    rest = after;
                }
            }
        }
    }
    push_text(&mut out, rest);
    out
}
