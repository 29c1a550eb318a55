//! Title normalization and similarity scoring
//!
//! Scores are on a 0-100 scale. Exact normalized equality scores 100, substring
//! containment scores at most 90, and token overlap fills in the rest.

use std::collections::HashSet;

/// Minimum score for automatic matching across all libraries
pub const AUTO_MATCH_THRESHOLD: f64 = 70.0;

/// Minimum score for resolving a user-provided series name
pub const MANUAL_MATCH_THRESHOLD: f64 = 90.0;

pub const PERFECT_SCORE: f64 = 100.0;

/// Weight applied to the length ratio of a substring match
const SUBSTRING_WEIGHT: f64 = 90.0;

/// Tokens this short or shorter are ignored by the overlap score
const MIN_TOKEN_CHARS: usize = 2;

/// Lowercase, turn `.`, `_` and `-` into spaces, collapse whitespace
pub fn normalize(title: &str) -> String {
    let replaced: String = title
        .to_lowercase()
        .chars()
        .map(|c| if matches!(c, '.' | '_' | '-') { ' ' } else { c })
        .collect();

    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Similarity of two titles in `[0, 100]`, symmetric in its arguments
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);

    if a == b {
        return PERFECT_SCORE;
    }

    let (a_len, b_len) = (a.chars().count(), b.chars().count());
    let (shorter, longer, short_len, long_len) = if a_len <= b_len {
        (&a, &b, a_len, b_len)
    } else {
        (&b, &a, b_len, a_len)
    };

    if is_contained(shorter, longer) {
        return short_len as f64 / long_len as f64 * SUBSTRING_WEIGHT;
    }

    token_overlap(&a, &b)
}

/// Substring test on the normalized forms, then on their space-free forms
fn is_contained(shorter: &str, longer: &str) -> bool {
    if longer.contains(shorter) {
        return true;
    }

    let short_compact: String = shorter.split_whitespace().collect();
    let long_compact: String = longer.split_whitespace().collect();
    long_compact.contains(&short_compact) || short_compact.contains(&long_compact)
}

fn token_overlap(a: &str, b: &str) -> f64 {
    let tokens = |s: &str| -> HashSet<String> {
        s.split_whitespace()
            .filter(|t| t.chars().count() > MIN_TOKEN_CHARS)
            .map(str::to_string)
            .collect()
    };

    let a_tokens = tokens(a);
    let b_tokens = tokens(b);
    let max_len = a_tokens.len().max(b_tokens.len());
    if max_len == 0 {
        return 0.0;
    }

    let common = a_tokens.intersection(&b_tokens).count();
    common as f64 / max_len as f64 * 100.0
}
