use std::sync::Arc;

use regex::{Captures, Regex};
use tracing::debug;

use super::Stage;
use crate::error::PipelineError;
use crate::pre_processor::tables::LookupTable;

/// Expands contractions (`can't` -> `cannot`) in one left-to-right pass.
///
/// The table is compiled into a single alternation with keys ordered longest
/// first, so `she'd've` is tried before `she'd`. Matching is exact-case and
/// literal.
#[derive(Debug, Clone)]
pub struct ContractionExpansion {
    table: Arc<LookupTable>,
    pattern: Option<Regex>,
}

impl ContractionExpansion {
    pub const NAME: &'static str = "contraction_expand";

    pub fn new(table: impl Into<Arc<LookupTable>>) -> Result<Self, PipelineError> {
        let table = table.into();
        let pattern = if table.is_empty() {
            None
        } else {
            let alternation = table
                .keys_longest_first()
                .into_iter()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join("|");
            let regex = Regex::new(&alternation)
                .map_err(|e| PipelineError::invalid_stage(Self::NAME, e.to_string()))?;
            Some(regex)
        };
        debug!(entries = table.len(), "Compiled contraction table");
        Ok(Self { table, pattern })
    }

    /// Stage backed by the built-in English table.
    pub fn english() -> Result<Self, PipelineError> {
        Self::new(LookupTable::english_contractions())
    }

    #[must_use]
    pub fn table(&self) -> &LookupTable {
        &self.table
    }
}

impl Stage for ContractionExpansion {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, text: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return text.to_string();
        };
        pattern
            .replace_all(text, |caps: &Captures<'_>| {
                let matched = &caps[0];
                self.table.get(matched).unwrap_or(matched).to_string()
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn english() -> ContractionExpansion {
        ContractionExpansion::english().unwrap()
    }

    #[test]
    fn test_expands_contractions() {
        assert_eq!(english().apply("I can't go"), "I cannot go");
        assert_eq!(english().apply("I'm sure they're fine"), "I am sure they are fine");
    }

    #[test]
    fn test_longer_key_wins() {
        assert_eq!(english().apply("she'd've left"), "she would have left");
        assert_eq!(english().apply("can't've"), "cannot have");
        assert_eq!(english().apply("y'all'd've"), "you all would have");
    }

    #[test]
    fn test_matching_is_exact_case() {
        assert_eq!(english().apply("CAN'T stop"), "CAN'T stop");
        assert_eq!(english().apply("i'm here"), "i'm here");
    }

    #[test]
    fn test_keys_match_inside_words() {
        // Literal matching, no word boundaries.
        assert_eq!(english().apply("Sheriff's"), "Sheriff's");
        assert_eq!(english().apply("o'clock"), "of the clock");
    }

    #[test]
    fn test_regex_metacharacters_in_keys_are_literal() {
        let table = LookupTable::from_pairs([("a.b", "dot"), ("(x)", "paren")]);
        let stage = ContractionExpansion::new(table).unwrap();
        assert_eq!(stage.apply("a.b axb (x)"), "dot axb paren");
    }

    #[test]
    fn test_empty_table_is_identity() {
        let stage = ContractionExpansion::new(LookupTable::default()).unwrap();
        assert_eq!(stage.apply("can't"), "can't");
    }

    #[test]
    fn test_injected_overrides() {
        let table = LookupTable::english_contractions().with_overrides([("gonna", "going to")]);
        let stage = ContractionExpansion::new(table).unwrap();
        assert_eq!(stage.apply("I'm gonna"), "I am going to");
    }
}
