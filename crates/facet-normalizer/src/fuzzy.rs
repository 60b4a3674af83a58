//! Fuzzy label equivalence
//!
//! Storefronts decorate labels with counts and codes ("Nike - 23"), so a strict
//! comparison produces false negatives on almost every site. The match is
//! containment in either direction, plus an asymmetric token rule: any token of
//! `a` longer than three characters found inside `b`. Labels of three
//! characters or fewer can only match through containment.

use crate::label::normalize_text;

const MIN_TOKEN_CHARS: usize = 4;

/// Case-insensitive, asymmetric fuzzy comparison. Empty labels never match.
pub fn fuzzy_match(a: &str, b: &str) -> bool {
    let a = normalize_text(a).to_lowercase();
    let b = normalize_text(b).to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.contains(&b) || b.contains(&a) {
        return true;
    }
    a.split_whitespace()
        .any(|token| token.chars().count() >= MIN_TOKEN_CHARS && b.contains(token))
}

/// Picks the candidate for `needle`: an exact case-insensitive match wins,
/// otherwise the first fuzzy match.
pub fn best_match<S: AsRef<str>>(needle: &str, candidates: &[S]) -> Option<usize> {
    let wanted = normalize_text(needle).to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    candidates
        .iter()
        .position(|candidate| normalize_text(candidate.as_ref()).to_lowercase() == wanted)
        .or_else(|| {
            candidates
                .iter()
                .position(|candidate| fuzzy_match(needle, candidate.as_ref()))
        })
}
