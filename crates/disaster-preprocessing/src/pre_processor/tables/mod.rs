//! Read-only lookup tables used by the dictionary-driven stages.
//!
//! Tables are plain values built at pipeline-assembly time and shared through
//! `Arc` by the stages that own them. Two pipelines with different tables can
//! coexist in one process.

mod contractions;
mod emoticons;

use std::cmp::Reverse;

use ahash::HashMap;

use contractions::ENGLISH_CONTRACTIONS;
use emoticons::BASIC_EMOTICONS;

/// Unordered mapping from a token to its canonical replacement. Keys are unique.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LookupTable {
    entries: HashMap<String, String>,
}

impl LookupTable {
    /// Build a table from `(key, replacement)` pairs.
    ///
    /// A repeated key keeps the replacement given last. Empty keys are dropped
    /// since they would match between every pair of characters.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        Self { entries }
    }

    /// The built-in English contraction table.
    #[must_use]
    pub fn english_contractions() -> Self {
        Self::from_pairs(ENGLISH_CONTRACTIONS.iter().copied())
    }

    /// Add or replace entries, returning the extended table.
    #[must_use]
    pub fn with_overrides<K, V>(mut self, overrides: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in overrides {
            let key = key.into();
            if !key.is_empty() {
                self.entries.insert(key, value.into());
            }
        }
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys sorted longest first, ties broken lexicographically.
    ///
    /// The result does not depend on hash iteration order, which makes the
    /// alternation built from it reproducible across runs.
    #[must_use]
    pub fn keys_longest_first(&self) -> Vec<&str> {
        let mut keys = self.entries.keys().map(String::as_str).collect::<Vec<_>>();
        keys.sort_by_key(|k| (Reverse(k.len()), *k));
        keys
    }
}

/// Ordered emoticon table. Earlier entries take priority over later ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmoticonTable {
    entries: Vec<(String, String)>,
}

impl EmoticonTable {
    /// Build a table from ordered pairs. A repeated key keeps its first position
    /// and replacement.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries: Vec<(String, String)> = Vec::new();
        for (key, value) in pairs {
            let key = key.into();
            if key.is_empty() || entries.iter().any(|(k, _)| *k == key) {
                continue;
            }
            entries.push((key, value.into()));
        }
        Self { entries }
    }

    /// `:-)`, `:)`, `:D`, `:O`, `:-(`, `:(`.
    #[must_use]
    pub fn basic() -> Self {
        Self::from_pairs(BASIC_EMOTICONS.iter().copied())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for EmoticonTable {
    fn default() -> Self {
        Self::basic()
    }
}
