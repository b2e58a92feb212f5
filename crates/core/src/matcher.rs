//! Fuzzy profile matcher.
//!
//! Resolves a human-readable field label (e.g. "What is your Full Name?")
//! to a stored profile value when the keys don't match exactly. Used by
//! the action executor to auto-answer `ask_user` actions before falling
//! back to the blocking human-input control.

use std::collections::BTreeMap;

/// Lowercase, replace non-alphanumerics with spaces, collapse whitespace.
fn normalize(s: &str) -> String {
    let mapped: String = s
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized form with internal spaces removed, for exact comparison.
fn squash(s: &str) -> String {
    normalize(s).replace(' ', "")
}

/// Tokens worth comparing: longer than 2 chars, or purely numeric.
///
/// Numeric tokens are kept regardless of length so that "Address Line 2"
/// and "Address Line 1" remain distinguishable.
fn tokens(s: &str) -> Vec<String> {
    normalize(s)
        .split_whitespace()
        .filter(|t| t.len() > 2 || t.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

fn numeric_tokens(tokens: &[String]) -> Vec<&String> {
    tokens
        .iter()
        .filter(|t| t.chars().all(|c| c.is_ascii_digit()))
        .collect()
}

/// Resolve `label` against the profile data, returning the stored value
/// of the best-matching key.
///
/// Exact normalized match (ignoring internal spaces) wins immediately.
/// Otherwise keys are scored by token overlap; the first highest-scoring
/// key with score >= 1 in iteration order wins. When both the label and a
/// candidate key carry numeric tokens but share none, the candidate is
/// rejected regardless of score: "Address Line 2" must never pick up the
/// value stored for "Address Line 1".
pub fn match_profile_value(label: &str, data: &BTreeMap<String, String>) -> Option<String> {
    let label_squashed = squash(label);
    if label_squashed.is_empty() {
        return None;
    }

    // Fast path: exact normalized match.
    for (key, value) in data {
        if squash(key) == label_squashed {
            return Some(value.clone());
        }
    }

    let label_tokens = tokens(label);
    let label_numbers = numeric_tokens(&label_tokens);

    let mut best: Option<(usize, &String)> = None;
    for (key, value) in data {
        let key_tokens = tokens(key);
        let key_numbers = numeric_tokens(&key_tokens);

        // Numbered-variant guard.
        if !label_numbers.is_empty()
            && !key_numbers.is_empty()
            && !key_numbers.iter().any(|n| label_numbers.contains(n))
        {
            continue;
        }

        let score = key_tokens
            .iter()
            .filter(|t| label_tokens.contains(t))
            .count();
        if score >= 1 && best.map_or(true, |(s, _)| score > s) {
            best = Some((score, value));
        }
    }

    best.map(|(_, value)| value.clone())
}
