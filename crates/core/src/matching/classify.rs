//! Match classification thresholds.

use serde::{Deserialize, Serialize};

/// Score required for an exact match.
pub const EXACT_MATCH_SCORE: u8 = 100;

/// Lowest score accepted as a fuzzy match.
pub const FUZZY_MATCH_THRESHOLD: u8 = 85;

/// Verdict for a similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchVerdict {
    Exact,
    Fuzzy,
    None,
}

impl MatchVerdict {
    /// Whether the verdict accepts the candidate.
    pub fn is_match(&self) -> bool {
        !matches!(self, MatchVerdict::None)
    }

    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchVerdict::Exact => "exact",
            MatchVerdict::Fuzzy => "fuzzy",
            MatchVerdict::None => "none",
        }
    }
}

/// Classify a similarity score.
pub fn classify(score: u8) -> MatchVerdict {
    if score >= EXACT_MATCH_SCORE {
        MatchVerdict::Exact
    } else if score >= FUZZY_MATCH_THRESHOLD {
        MatchVerdict::Fuzzy
    } else {
        MatchVerdict::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(classify(100), MatchVerdict::Exact);
        assert_eq!(classify(99), MatchVerdict::Fuzzy);
        assert_eq!(classify(90), MatchVerdict::Fuzzy);
        assert_eq!(classify(85), MatchVerdict::Fuzzy);
        assert_eq!(classify(84), MatchVerdict::None);
        assert_eq!(classify(20), MatchVerdict::None);
        assert_eq!(classify(0), MatchVerdict::None);
    }

    #[test]
    fn test_is_match() {
        assert!(MatchVerdict::Exact.is_match());
        assert!(MatchVerdict::Fuzzy.is_match());
        assert!(!MatchVerdict::None.is_match());
    }
}
