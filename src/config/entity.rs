//! # Layered Configuration
//!
//! [`Configuration`] is an immutable, ordered key/value structure with a primary
//! layer and an optional fallback. Lookups check the primary layer first.
//! Combining two configurations with [`Configuration::with_fallback`] produces a
//! new instance and never mutates either input.

use std::collections::HashSet;
use std::sync::Arc;

/// An immutable layered key/value configuration.
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    primary: Arc<[(String, String)]>,
    fallback: Option<Arc<Configuration>>,
}

impl Configuration {
    /// An empty configuration with no layers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a single-layer configuration.
    ///
    /// When a key appears more than once the first occurrence wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut seen = HashSet::new();
        let primary: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| seen.insert(k.clone()))
            .collect();
        Self {
            primary: primary.into(),
            fallback: None,
        }
    }

    /// Returns a new configuration that consults `fallback` for keys missing here.
    ///
    /// If this configuration already has a fallback, `fallback` is chained
    /// behind it.
    pub fn with_fallback(&self, fallback: Configuration) -> Configuration {
        let fallback = match &self.fallback {
            Some(existing) => existing.with_fallback(fallback),
            None => fallback,
        };
        Configuration {
            primary: Arc::clone(&self.primary),
            fallback: Some(Arc::new(fallback)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.primary
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .or_else(|| self.fallback.as_deref().and_then(|f| f.get(key)))
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Reads a comma-separated list. Blank items are dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All visible keys, primary layer first, each key reported once.
    pub fn keys(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let mut layer = Some(self);
        while let Some(current) = layer {
            for (k, _) in current.primary.iter() {
                if seen.insert(k.as_str()) {
                    keys.push(k.as_str());
                }
            }
            layer = current.fallback.as_deref();
        }
        keys
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_shadows_fallback() {
        let primary = Configuration::from_pairs([("foo", "A"), ("only.primary", "1")]);
        let fallback = Configuration::from_pairs([("foo", "B"), ("only.fallback", "2")]);

        let merged = primary.with_fallback(fallback);

        assert_eq!(merged.get("foo"), Some("A"));
        assert_eq!(merged.get("only.primary"), Some("1"));
        assert_eq!(merged.get("only.fallback"), Some("2"));
        assert_eq!(merged.get("missing"), None);
        assert_eq!(merged.keys(), vec!["foo", "only.primary", "only.fallback"]);
    }

    #[test]
    fn test_with_fallback_leaves_inputs_untouched() {
        let primary = Configuration::from_pairs([("a", "1")]);
        let merged = primary.with_fallback(Configuration::from_pairs([("b", "2")]));

        assert_eq!(primary.get("b"), None);
        assert_eq!(merged.get("b"), Some("2"));

        // Chaining a second fallback goes behind the first.
        let chained = merged.with_fallback(Configuration::from_pairs([("b", "3"), ("c", "4")]));
        assert_eq!(chained.get("b"), Some("2"));
        assert_eq!(chained.get("c"), Some("4"));
        assert_eq!(merged.get("c"), None);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let config = Configuration::from_pairs([("k", "first"), ("k", "second")]);
        assert_eq!(config.get("k"), Some("first"));
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_get_list() {
        let config = Configuration::from_pairs([("modules", " alpha, ,beta ,")]);
        assert_eq!(config.get_list("modules"), vec!["alpha", "beta"]);
        assert!(config.get_list("absent").is_empty());
        assert_eq!(config.get_or("absent", "x"), "x");
        assert!(Configuration::empty().is_empty());
    }
}
