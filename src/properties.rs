//! Flat `key = value` property files
//!
//! The narrow seam between the bundles and the on-disk property format:
//! load and store a flat string map, nothing more.

use crate::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// An ordered flat string map backed by a `key = value` file.
///
/// Blank lines and lines starting with `#` or `!` are ignored; the first
/// `=` splits key from value and both sides are trimmed. `store` writes
/// keys in sorted order so output is deterministic.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Create an empty property map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a property file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Parse property lines from a string.
    pub fn parse(content: &str) -> Self {
        let mut entries = BTreeMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                entries.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Self { entries }
    }

    /// Write the map back to disk as `key = value` lines.
    pub fn store(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut out = String::new();
        for (key, value) in &self.entries {
            out.push_str(key);
            out.push_str(" = ");
            out.push_str(value);
            out.push('\n');
        }
        fs::write(path, out)?;
        Ok(())
    }

    /// Value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Upsert; overwrites silently when the key exists.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Insert only when the key is absent; returns false and leaves the
    /// existing value untouched otherwise.
    pub fn set_if_absent(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, value.into());
        true
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// First key holding exactly `value`, in key order.
    pub fn key_for_value(&self, value: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, candidate)| candidate.as_str() == value)
            .map(|(key, _)| key.as_str())
    }

    /// All keys, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let props = Properties::parse(
            "# a comment\n\n! another comment\ntest.key = Testwert\nbroken line\n",
        );
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("test.key"), Some("Testwert"));
    }

    #[test]
    fn test_parse_trims_and_splits_on_first_equals() {
        let props = Properties::parse("  url  =  https://example.org/?a=b  \n");
        assert_eq!(props.get("url"), Some("https://example.org/?a=b"));
    }

    #[test]
    fn test_set_if_absent() {
        let mut props = Properties::new();
        assert!(props.set_if_absent("k", "a"));
        assert!(!props.set_if_absent("k", "b"));
        assert_eq!(props.get("k"), Some("a"));
    }

    #[test]
    fn test_key_for_value_returns_first_match() {
        let mut props = Properties::new();
        props.set("b.key", "shared");
        props.set("a.key", "shared");
        assert_eq!(props.key_for_value("shared"), Some("a.key"));
        assert_eq!(props.key_for_value("missing"), None);
    }

    #[test]
    fn test_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.properties");

        let mut props = Properties::new();
        props.set("test.key", "Testwert");
        props.set("test.other", "zweiter Wert");
        props.store(&path).unwrap();

        let reloaded = Properties::load(&path).unwrap();
        assert_eq!(reloaded.get("test.key"), Some("Testwert"));
        assert_eq!(reloaded.get("test.other"), Some("zweiter Wert"));
        assert_eq!(reloaded.len(), 2);
    }
}
