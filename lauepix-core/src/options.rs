//! Algorithm option sets sent with each stage run.
//!
//! Every stage panel has structured controls (one entry per control) and a
//! free-text "advanced options" field. The free text is parsed as
//! whitespace-separated `key=value` tokens and always wins over a structured
//! entry with the same key.

use std::collections::BTreeMap;

/// Merged `key -> value` arguments as sent to the backend.
pub type AlgorithmArgs = BTreeMap<String, String>;

/// Structured and free-text options for one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet {
    basic: AlgorithmArgs,
    advanced: String,
}

impl OptionSet {
    /// Creates an empty option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a structured option, replacing any previous value.
    pub fn set_basic(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.basic.insert(key.into(), value.into());
    }

    /// Removes a structured option (e.g. when its control is hidden).
    pub fn remove_basic(&mut self, key: &str) {
        self.basic.remove(key);
    }

    /// Replaces the free-text advanced options.
    pub fn set_advanced(&mut self, text: impl Into<String>) {
        self.advanced = text.into();
    }

    /// Structured options only.
    #[must_use]
    pub fn basic(&self) -> &AlgorithmArgs {
        &self.basic
    }

    /// The raw advanced text.
    #[must_use]
    pub fn advanced(&self) -> &str {
        &self.advanced
    }

    /// Merge structured options with the parsed advanced text.
    #[must_use]
    pub fn merged(&self) -> AlgorithmArgs {
        let mut args = self.basic.clone();
        args.extend(parse_advanced(&self.advanced));
        args
    }
}

/// Parse free-text `key=value` tokens.
///
/// Tokens without `=` or with an empty key are dropped. The token is split at
/// the first `=`, so `key=` yields an empty value and `a=b=c` yields `b=c`.
pub fn parse_advanced(text: &str) -> impl Iterator<Item = (String, String)> + '_ {
    text.split_whitespace().filter_map(|token| {
        let (key, value) = token.split_once('=')?;
        if key.is_empty() {
            return None;
        }
        Some((key.to_string(), value.to_string()))
    })
}
