//! Resident identity resolution across documents.
//!
//! Pipeline: free text → normalization → ordered match strategies → roster index
//!
//! Identity is a fuzzy equivalence class, not a primary key: every join point
//! (hydration logs, IPC rows, the validator) re-resolves names through here.

mod normalize;
mod strategy;

pub use normalize::*;
pub use strategy::*;

use std::collections::HashMap;

/// Minimum Jaro-Winkler similarity for a triage hint.
const HINT_MIN_SIMILARITY: f64 = 0.80;

/// Normalized name → roster position, iterated in first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    entries: Vec<(String, usize)>,
    positions: HashMap<String, usize>,
}

impl NameIndex {
    /// Index names by their normalized key; a repeated key points at the later resident.
    pub fn from_names<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut index = Self::default();
        for (roster_idx, name) in names.into_iter().enumerate() {
            index.insert(name, roster_idx);
        }
        index
    }

    pub fn insert(&mut self, name: &str, roster_idx: usize) {
        let key = normalize_name(name);
        if key.is_empty() {
            return;
        }
        match self.positions.get(&key) {
            Some(&pos) => self.entries[pos].1 = roster_idx,
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, roster_idx));
            }
        }
    }

    /// Look up an already-normalized key.
    pub fn get(&self, key: &str) -> Option<usize> {
        self.positions.get(key).map(|&pos| self.entries[pos].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(key, idx)| (key.as_str(), *idx))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A resolved name with the strategy that found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameMatch {
    pub roster_idx: usize,
    pub strategy: &'static str,
}

/// Runs match strategies in order; the first hit wins.
pub struct NameMatcher {
    strategies: Vec<Box<dyn NameMatchStrategy>>,
}

impl Default for NameMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl NameMatcher {
    /// Create a matcher with the default strategy order.
    pub fn new() -> Self {
        Self {
            strategies: default_strategies(),
        }
    }

    /// Create a matcher with a custom strategy order.
    pub fn with_strategies(strategies: Vec<Box<dyn NameMatchStrategy>>) -> Self {
        Self { strategies }
    }

    /// Resolve free text against the index. None means unresolved, never a guess.
    pub fn resolve(&self, name: &str, index: &NameIndex) -> Option<NameMatch> {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return None;
        }

        self.strategies.iter().find_map(|strategy| {
            strategy.find(&normalized, index).map(|roster_idx| NameMatch {
                roster_idx,
                strategy: strategy.label(),
            })
        })
    }

    /// Labels in the order they are tried.
    pub fn strategy_labels(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.label()).collect()
    }
}

/// Resolve a name with the default strategies.
pub fn find_matching_resident(name: &str, index: &NameIndex) -> Option<usize> {
    NameMatcher::new()
        .resolve(name, index)
        .map(|m| m.roster_idx)
}

/// Closest roster key by Jaro-Winkler similarity, for operator triage only.
pub fn closest_roster_name(name: &str, index: &NameIndex) -> Option<(String, f64)> {
    let normalized = normalize_name(name);
    index
        .iter()
        .map(|(key, _)| (key, strsim::jaro_winkler(&normalized, key)))
        .filter(|(_, score)| *score >= HINT_MIN_SIMILARITY)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(key, score)| (key.to_string(), score))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_repeated_key_keeps_position() {
        let idx = NameIndex::from_names(["Smith, John", "Doe, Jane", "SMITH,  john"]);

        assert_eq!(idx.len(), 2);
        assert_eq!(idx.get("SMITH, JOHN"), Some(2));
        let keys: Vec<&str> = idx.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["SMITH, JOHN", "DOE, JANE"]);
    }

    #[test]
    fn test_resolve_reports_strategy() {
        let idx = NameIndex::from_names(["Bai, Se Boong", "Smith, John Michael"]);
        let matcher = NameMatcher::new();

        let exact = matcher.resolve("bai, se  boong", &idx).unwrap();
        assert_eq!(exact.roster_idx, 0);
        assert_eq!(exact.strategy, "exact");

        let swapped = matcher.resolve("Se Boong Bai", &idx).unwrap();
        assert_eq!(swapped.strategy, "token-swap");

        let fuzzy = matcher.resolve("SMITH, JOHN", &idx).unwrap();
        assert_eq!(fuzzy.roster_idx, 1);
        assert_eq!(fuzzy.strategy, "surname-overlap");
    }

    #[test]
    fn test_unresolved_is_none() {
        let idx = NameIndex::from_names(["Smith, John"]);
        assert_eq!(find_matching_resident("Jones, Mary", &idx), None);
        assert_eq!(find_matching_resident("   ", &idx), None);
    }

    #[test]
    fn test_custom_strategy_order() {
        let idx = NameIndex::from_names(["Smith, John Michael"]);
        let exact_only = NameMatcher::with_strategies(vec![Box::new(ExactMatch)]);

        assert_eq!(exact_only.resolve("SMITH, JOHN", &idx), None);
        assert_eq!(exact_only.strategy_labels(), vec!["exact"]);
    }

    #[test]
    fn test_closest_roster_name() {
        let idx = NameIndex::from_names(["Smith, John", "Doe, Jane"]);

        let (hint, score) = closest_roster_name("Smyth, Jon", &idx).unwrap();
        assert_eq!(hint, "SMITH, JOHN");
        assert!(score > 0.8);

        assert!(closest_roster_name("Zzyzx, Q", &idx).is_none());
    }
}
