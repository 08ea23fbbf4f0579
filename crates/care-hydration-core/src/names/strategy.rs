//! Ordered name-matching strategies.
//!
//! Tried cheapest and most precise first:
//! 1. Exact normalized key
//! 2. Token-order swap ("A B C" as "C, A B" and "B C, A")
//! 3. Compound-surname prefix strip
//! 4. Surname overlap with first/middle-name token scoring

use std::collections::HashSet;

use super::normalize::{strip_name_prefix, NAME_PREFIXES};
use super::NameIndex;

/// A single way of resolving a normalized candidate against the roster index.
pub trait NameMatchStrategy: Send + Sync {
    /// Short label used in logs.
    fn label(&self) -> &'static str;

    /// Roster index of the match, or None if this strategy cannot decide.
    fn find(&self, normalized: &str, index: &NameIndex) -> Option<usize>;
}

/// Exact match on the normalized key.
pub struct ExactMatch;

impl NameMatchStrategy for ExactMatch {
    fn label(&self) -> &'static str {
        "exact"
    }

    fn find(&self, normalized: &str, index: &NameIndex) -> Option<usize> {
        index.get(normalized)
    }
}

/// Reorder comma-less names: last token to the front, or first token to the back.
pub struct TokenOrderSwap;

impl NameMatchStrategy for TokenOrderSwap {
    fn label(&self) -> &'static str {
        "token-swap"
    }

    fn find(&self, normalized: &str, index: &NameIndex) -> Option<usize> {
        if normalized.contains(',') || !normalized.contains(' ') {
            return None;
        }

        let parts: Vec<&str> = normalized.split(' ').collect();
        let (last, firsts) = parts.split_last()?;
        if firsts.is_empty() {
            return None;
        }

        let last_to_front = format!("{}, {}", last, firsts.join(" "));
        if let Some(idx) = index.get(&last_to_front) {
            return Some(idx);
        }

        if parts.len() >= 3 {
            let first_to_back = format!("{}, {}", parts[1..].join(" "), parts[0]);
            if let Some(idx) = index.get(&first_to_back) {
                return Some(idx);
            }
        }

        None
    }
}

/// Drop a leading compound-surname prefix and retry the exact key.
pub struct PrefixStrip;

impl NameMatchStrategy for PrefixStrip {
    fn label(&self) -> &'static str {
        "prefix-strip"
    }

    fn find(&self, normalized: &str, index: &NameIndex) -> Option<usize> {
        NAME_PREFIXES.iter().find_map(|prefix| {
            let stripped = strip_name_prefix(normalized, prefix);
            if stripped.len() == normalized.len() {
                return None;
            }
            index.get(stripped.trim())
        })
    }
}

/// Match surnames loosely, then pick the roster entry sharing the most name tokens.
pub struct SurnameOverlap;

impl SurnameOverlap {
    fn surname(name: &str) -> &str {
        match name.split_once(',') {
            Some((last, _)) => last.trim(),
            None => name.split(' ').last().unwrap_or_default(),
        }
    }

    fn name_parts(name: &str) -> HashSet<&str> {
        let (head, tail) = name.split_once(',').unwrap_or((name, ""));
        head.split(' ')
            .chain(tail.split(' '))
            .filter(|p| !p.is_empty())
            .collect()
    }

    fn surnames_match(candidate: &str, existing: &str) -> bool {
        if candidate == existing {
            return true;
        }

        for prefix in NAME_PREFIXES {
            let candidate_bare = strip_name_prefix(candidate, prefix);
            let existing_bare = strip_name_prefix(existing, prefix);
            if candidate_bare == existing_bare
                || candidate_bare == existing
                || candidate == existing_bare
            {
                return true;
            }
        }

        let candidate_words: HashSet<&str> = candidate.split(' ').collect();
        let existing_words: HashSet<&str> = existing.split(' ').collect();

        // Same multi-word surname in a different order
        if candidate_words.len() > 1
            && existing_words.len() > 1
            && candidate_words.is_subset(&existing_words)
        {
            return true;
        }

        // Compound surname sharing a word
        (candidate_words.len() > 1 || existing_words.len() > 1)
            && !candidate_words.is_disjoint(&existing_words)
    }
}

impl NameMatchStrategy for SurnameOverlap {
    fn label(&self) -> &'static str {
        "surname-overlap"
    }

    fn find(&self, normalized: &str, index: &NameIndex) -> Option<usize> {
        let parts = Self::name_parts(normalized);
        if parts.len() < 2 {
            return None;
        }

        let candidate_surname = Self::surname(normalized);
        let required = parts.len().min(2);
        let mut best: Option<(usize, usize)> = None;

        for (existing, idx) in index.iter() {
            if !Self::surnames_match(candidate_surname, Self::surname(existing)) {
                continue;
            }

            let existing_parts = Self::name_parts(existing);
            let overlap = parts.intersection(&existing_parts).count();
            let best_overlap = best.map(|(_, count)| count).unwrap_or(0);

            if overlap > best_overlap && overlap >= required {
                best = Some((idx, overlap));
            }
        }

        best.map(|(idx, _)| idx)
    }
}

/// Default strategy order.
pub fn default_strategies() -> Vec<Box<dyn NameMatchStrategy>> {
    vec![
        Box::new(ExactMatch),
        Box::new(TokenOrderSwap),
        Box::new(PrefixStrip),
        Box::new(SurnameOverlap),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(names: &[&str]) -> NameIndex {
        NameIndex::from_names(names.iter().copied())
    }

    #[test]
    fn test_exact_match() {
        let idx = index(&["Smith, John", "Doe, Jane"]);
        assert_eq!(ExactMatch.find("DOE, JANE", &idx), Some(1));
        assert_eq!(ExactMatch.find("DOE, J", &idx), None);
    }

    #[test]
    fn test_token_swap_last_to_front() {
        let idx = index(&["Bai, Se Boong"]);
        assert_eq!(TokenOrderSwap.find("SE BOONG BAI", &idx), Some(0));
    }

    #[test]
    fn test_token_swap_first_to_back() {
        let idx = index(&["Garcia Lopez, Maria"]);
        assert_eq!(TokenOrderSwap.find("MARIA GARCIA LOPEZ", &idx), Some(0));
    }

    #[test]
    fn test_token_swap_ignores_comma_names() {
        let idx = index(&["Smith, John"]);
        assert_eq!(TokenOrderSwap.find("JOHN, SMITH", &idx), None);
    }

    #[test]
    fn test_prefix_strip() {
        let idx = index(&["Silva, Ana"]);
        assert_eq!(PrefixStrip.find("DA SILVA, ANA", &idx), Some(0));
        assert_eq!(PrefixStrip.find("DASILVA, ANA", &idx), None);
    }

    #[test]
    fn test_surname_overlap_middle_name() {
        let idx = index(&["Smith, John Michael", "Smith, Mary"]);
        assert_eq!(SurnameOverlap.find("SMITH, JOHN", &idx), Some(0));
    }

    #[test]
    fn test_surname_overlap_compound() {
        let idx = index(&["Garcia Lopez, Maria"]);
        assert_eq!(SurnameOverlap.find("LOPEZ, MARIA", &idx), Some(0));
    }

    #[test]
    fn test_surname_overlap_requires_two_tokens() {
        let idx = index(&["Smith, John"]);
        assert_eq!(SurnameOverlap.find("SMITH, MARY", &idx), None);
        assert_eq!(SurnameOverlap.find("SMITH", &idx), None);
    }

    #[test]
    fn test_surname_overlap_prefers_best_overlap() {
        let idx = index(&["Lee, Ann", "Lee, Ann Marie"]);
        assert_eq!(SurnameOverlap.find("LEE, ANN MARIE", &idx), Some(1));
    }
}
