//! Title normalization.

/// Articles and particles ignored when comparing titles (English and
/// romanized Japanese).
const STOP_WORDS: &[&str] = &["the", "a", "an", "to", "no", "wa", "ga", "wo", "de", "ni"];

/// Words that, followed by a number, only identify an installment.
const INSTALLMENT_WORDS: &[&str] = &["season", "part"];

/// Reduce a title to its canonical comparable form.
///
/// Lowercases, turns punctuation into spaces, drops stop words and
/// `season N` / `part N` phrases, and joins the remaining tokens with single
/// spaces. The result is stable under repeated normalization.
pub fn normalize(title: &str) -> String {
    let cleaned = clean(title);

    let tokens = cleaned
        .split_whitespace()
        .filter(|token| !STOP_WORDS.contains(token));

    // Stack reduction: a number directly after an installment word removes
    // both, including pairs that only become adjacent after an inner removal.
    let mut kept: Vec<&str> = Vec::new();
    for token in tokens {
        let after_installment = kept
            .last()
            .is_some_and(|prev| INSTALLMENT_WORDS.contains(prev));
        if after_installment && is_number(token) {
            kept.pop();
        } else {
            kept.push(token);
        }
    }

    kept.join(" ")
}

/// Lowercased, punctuation-free tokens joined by single spaces, with stop
/// words and installment phrases kept.
pub(crate) fn tokenize(title: &str) -> String {
    clean(title).split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect()
}

fn is_number(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}
