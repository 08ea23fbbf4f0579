//! Resident name normalization.
//!
//! Handles:
//! - Unicode whitespace cleanup (non-breaking and ideographic spaces)
//! - Matching keys (uppercase, single-spaced)
//! - Display identity ("Last, First", middle names dropped)
//! - "First ... Last" to "Last, First ..." conversion for hydration-log headers
//! - Token sets for order-insensitive comparison

use std::collections::BTreeSet;

use crate::pdf::is_unicode_space;

/// Surname prefixes that appear in compound last names.
pub const NAME_PREFIXES: &[&str] = &[
    "DE", "VAN", "VON", "LE", "LA", "EL", "DA", "DOS", "DAS", "DI", "DEL", "DU", "MAC", "MC",
    "O'", "O`", "SAINT", "ST",
];

/// Tokens that carry no identity ("No Middle Name" placeholders).
const FILLER_TOKENS: &[&str] = &["no", "middle", "name"];

/// Replace Unicode spaces with ASCII spaces, collapse runs and trim.
pub fn clean_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if is_unicode_space(c) { ' ' } else { c })
        .collect();
    collapse_whitespace(&replaced)
}

/// Uppercase single-spaced key used only for lookups, never for display.
pub fn normalize_name(name: &str) -> String {
    collapse_whitespace(name).to_uppercase()
}

/// "Last, First Middle" to "Last, First". Names without a comma are only cleaned.
pub fn normalize_to_last_first(name: &str) -> String {
    let cleaned = clean_name(name);
    match cleaned.split_once(',') {
        Some((last, rest)) => {
            let last = last.trim();
            let rest = rest.split(',').next().unwrap_or_default();
            match rest.split_whitespace().next() {
                Some(first) => format!("{last}, {first}"),
                None => last.to_string(),
            }
        }
        None => cleaned,
    }
}

/// "First Middle Last" to "Last, First Middle".
pub fn convert_to_last_first(name: &str) -> String {
    let parts: Vec<&str> = name.split_whitespace().collect();
    match parts.split_last() {
        Some((last, firsts)) if !firsts.is_empty() => format!("{}, {}", last, firsts.join(" ")),
        _ => name.trim().to_string(),
    }
}

/// Capitalize the first letter of each space-separated word.
pub fn title_case(name: &str) -> String {
    name.to_lowercase()
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase identity tokens with punctuation and filler words removed.
///
/// Single-character tokens (initials) are dropped unless they are the only token.
pub fn match_tokens(name: &str) -> BTreeSet<String> {
    let lowered: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    let mut tokens: Vec<&str> = lowered.split_whitespace().collect();
    if tokens.len() > 1 {
        tokens.retain(|t| t.chars().count() > 1);
    }

    tokens
        .into_iter()
        .filter(|t| !FILLER_TOKENS.contains(t))
        .map(String::from)
        .collect()
}

/// Two names match when one token set contains the other.
pub fn names_match(a: &str, b: &str) -> bool {
    let tokens_a = match_tokens(a);
    let tokens_b = match_tokens(b);

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return false;
    }

    tokens_a.is_subset(&tokens_b) || tokens_b.is_subset(&tokens_a)
}

/// Remove a leading "PREFIX " if present.
pub fn strip_name_prefix<'a>(name: &'a str, prefix: &str) -> &'a str {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(' '))
        .unwrap_or(name)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("  Doe,\u{00A0}\u{00A0}Jane "), "Doe, Jane");
        assert_eq!(clean_name("Smith,\u{3000}John\u{2009}Paul"), "Smith, John Paul");
        assert_eq!(clean_name("Smith,\n\tJohn"), "Smith, John");
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Smith,   John "), "SMITH, JOHN");
    }

    #[test]
    fn test_normalize_to_last_first() {
        assert_eq!(normalize_to_last_first("Smith, John Michael"), "Smith, John");
        assert_eq!(normalize_to_last_first("Smith,John"), "Smith, John");
        assert_eq!(normalize_to_last_first("Smith,\u{00A0}John"), "Smith, John");
        assert_eq!(normalize_to_last_first("John Smith"), "John Smith");
        assert_eq!(normalize_to_last_first("Smith, "), "Smith");
    }

    #[test]
    fn test_convert_to_last_first() {
        assert_eq!(convert_to_last_first("John Michael Smith"), "Smith, John Michael");
        assert_eq!(convert_to_last_first("JOHN SMITH"), "SMITH, JOHN");
        assert_eq!(convert_to_last_first("Cher"), "Cher");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("SMITH, JOHN"), "Smith, John");
        assert_eq!(title_case("o'brien, mary-kate"), "O'brien, Mary-kate");
    }

    #[test]
    fn test_match_tokens() {
        let tokens = match_tokens("Smith, John (No Middle Name) R.");
        assert_eq!(
            tokens.into_iter().collect::<Vec<_>>(),
            vec!["john".to_string(), "smith".to_string()]
        );

        // A lone initial survives
        assert_eq!(match_tokens("J").len(), 1);
    }

    #[test]
    fn test_names_match() {
        assert!(names_match("Smith, John", "SMITH JOHN MICHAEL"));
        assert!(names_match("O'Neil, Pat", "Pat O Neil"));
        assert!(!names_match("Smith, John", "Jones, Mary"));
        assert!(!names_match("", "Smith, John"));
    }

    #[test]
    fn test_strip_name_prefix() {
        assert_eq!(strip_name_prefix("DE LA CRUZ", "DE"), "LA CRUZ");
        assert_eq!(strip_name_prefix("DEAN", "DE"), "DEAN");
        assert_eq!(strip_name_prefix("ST JAMES", "ST"), "JAMES");
    }
}
