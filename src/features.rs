//! Featured-guest extraction.
//!
//! Finds "feat. / ft. / featuring / with" clauses and splits the guest list
//! on the usual collaboration separators.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Collaboration separators: comma, ampersand, "and", slash, ×, plus, and a
/// standalone x (so "Max" or "Xzibit" stay whole).
pub static COLLABORATOR_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:,|&|\band\b|/|×|\+|\bx\b)\s*").unwrap());

/// Feature clauses outside brackets, tried in order. Both are anchored to the end.
static FEATURE_CLAUSES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // After a dash: "Song - feat. Someone"
        Regex::new(r"(?i)[-–—]\s*(?:feat\.?|featuring|ft\.?|with)\s+(?P<guests>.+)$").unwrap(),
        // Standalone: "Song ft. Someone"
        Regex::new(r"(?i)\s+(?:feat\.?|featuring|ft\.?|with)\s+(?P<guests>.+)$").unwrap(),
    ]
});

/// A whole bracket segment that is a feature clause: "(feat. A & B)".
static FEATURE_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:feat\.?|featuring|ft\.?|with)\s+(?P<guests>.+?)\s*$").unwrap()
});

// ============================================================================
// SPLITTING
// ============================================================================

/// Append `name` unless an equal name (ignoring case) is already present.
pub fn push_unique(names: &mut Vec<String>, seen: &mut FxHashSet<String>, name: &str) {
    let name = name.trim();
    if name.is_empty() {
        return;
    }
    if seen.insert(name.to_lowercase()) {
        names.push(name.to_string());
    }
}

/// Split a collaborator list ("A, B & C") into trimmed, de-duplicated names.
pub fn split_collaborators(list: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut seen = FxHashSet::default();
    for part in COLLABORATOR_SEPARATOR.split(list) {
        push_unique(&mut names, &mut seen, part);
    }
    names
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Strip a trailing feature clause from `text`.
///
/// Returns the remaining text and the guests, in order. Text without a
/// feature clause comes back trimmed with an empty guest list.
pub fn extract_features(text: &str) -> (String, Vec<String>) {
    for pattern in FEATURE_CLAUSES.iter() {
        if let Some(caps) = pattern.captures(text) {
            let guests = caps.name("guests").map_or("", |m| m.as_str());
            let start = caps.get(0).map_or(text.len(), |m| m.start());
            return (text[..start].trim().to_string(), split_collaborators(guests));
        }
    }
    (text.trim().to_string(), Vec::new())
}

/// Guests of a bracket segment that is entirely a feature clause.
pub fn feature_segment_guests(segment: &str) -> Option<Vec<String>> {
    FEATURE_SEGMENT
        .captures(segment)
        .and_then(|caps| caps.name("guests"))
        .map(|m| split_collaborators(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_collaborators_separators() {
        assert_eq!(split_collaborators("A, B & C"), vec!["A", "B", "C"]);
        assert_eq!(split_collaborators("A and B"), vec!["A", "B"]);
        assert_eq!(split_collaborators("A/B + C × D"), vec!["A", "B", "C", "D"]);
        assert_eq!(split_collaborators("DJ Snake x Lil Jon"), vec!["DJ Snake", "Lil Jon"]);
        assert_eq!(split_collaborators("A X B"), vec!["A", "B"]);
    }

    #[test]
    fn test_split_collaborators_keeps_words_whole() {
        assert_eq!(split_collaborators("Max Xzibit"), vec!["Max Xzibit"]);
        assert_eq!(split_collaborators("Anderson Paak"), vec!["Anderson Paak"]);
    }

    #[test]
    fn test_split_collaborators_dedup_case_insensitive() {
        assert_eq!(split_collaborators("Drake, drake & Future"), vec!["Drake", "Future"]);
    }

    #[test]
    fn test_extract_features_after_dash() {
        let (rest, guests) = extract_features("Song Title - feat. Featured Artist");
        assert_eq!(rest, "Song Title");
        assert_eq!(guests, vec!["Featured Artist"]);
    }

    #[test]
    fn test_extract_features_standalone() {
        let (rest, guests) = extract_features("Song ft. A & B");
        assert_eq!(rest, "Song");
        assert_eq!(guests, vec!["A", "B"]);

        let (rest, guests) = extract_features("Song FEATURING Someone");
        assert_eq!(rest, "Song");
        assert_eq!(guests, vec!["Someone"]);
    }

    #[test]
    fn test_extract_features_none() {
        assert_eq!(extract_features(" Plain Song "), ("Plain Song".to_string(), vec![]));
    }

    #[test]
    fn test_feature_segment() {
        assert_eq!(
            feature_segment_guests("feat. Artist A, Artist B, Artist C"),
            Some(vec!["Artist A".to_string(), "Artist B".to_string(), "Artist C".to_string()])
        );
        assert_eq!(feature_segment_guests("with Someone"), Some(vec!["Someone".to_string()]));
        assert_eq!(feature_segment_guests("Live Version"), None);
        assert_eq!(feature_segment_guests("Featured Remix"), None);
    }
}
