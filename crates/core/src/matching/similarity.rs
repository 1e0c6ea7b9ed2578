//! Title similarity scoring.

use super::normalize::{normalize, tokenize};

/// Similarity between two raw titles, 0-100.
///
/// Both titles are normalized first. The score is the best of a whole-string
/// edit-distance ratio and the same ratio over alphabetically sorted tokens,
/// so reordered subtitle fragments still score high. Only titles that are
/// equal after normalization score 100.
pub fn score(a: &str, b: &str) -> u8 {
    let (norm_a, norm_b) = (normalize(a), normalize(b));
    if norm_a == norm_b {
        return 100;
    }
    score_normalized(&comparable(a, norm_a), &comparable(b, norm_b))
}

/// Similarity between two already-normalized strings.
pub fn score_normalized(a: &str, b: &str) -> u8 {
    if a == b {
        return 100;
    }

    let whole = strsim::normalized_levenshtein(a, b);
    let sorted = strsim::normalized_levenshtein(&sorted_tokens(a), &sorted_tokens(b));
    let best = whole.max(sorted);

    // Rounding must not turn a near miss into an exact match.
    ((best * 100.0).round() as u8).min(99)
}

/// Normalized form, falling back to the plain token form for titles that
/// normalize to nothing (e.g. "The", "Season 1").
fn comparable(title: &str, normalized: String) -> String {
    if normalized.is_empty() {
        tokenize(title)
    } else {
        normalized
    }
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}
