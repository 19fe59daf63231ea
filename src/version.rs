//! Version phrase normalization and multi-version resolution.
//!
//! Free-text version tags ("slowed x reverb", "Radio edit", "LIVE") map onto a
//! small canonical vocabulary. When a title carries several tags the winner is
//! looked up in a [`VersionTable`] keyed by the sorted, lower-cased labels, so
//! "musical transformation beats presentation format" is data, not priority
//! numbers scattered through code.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;

use crate::error::ConfigError;

/// Label used when a title carries no version tag.
pub const ORIGINAL: &str = "Original";

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Slowed + reverb in either order, joined by +, x, &, "and" or nothing.
static SLOWED_REVERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)slowed\s*(?:[+x&]|and)?\s*reverb(?:ed)?|reverb(?:ed)?\s*(?:[+x&]|and)?\s*slowed",
    )
    .unwrap()
});

/// Synonym table (applied in order, first match wins).
static VERSION_SYNONYMS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\bsped[-\s]*up\b", "Sped Up"),
        (r"\bslowed\b", "Slowed"),
        (r"\bnightcore\b", "Nightcore"),
        (r"\bclean\b", "Clean"),
        (r"\bexplicit\b", "Explicit"),
        (r"\binstrumental\b", "Instrumental"),
        (r"\bradio\s*edit\b", "Radio Edit"),
        (r"\bclub\s*mix\b", "Club Mix"),
        (r"\bvip\b", "VIP"),
        (r"\bremaster(?:ed)?\b", "Remastered"),
        (r"\bremix\b", "Remix"),
        (r"\bacoustic\b", "Acoustic"),
        (r"\blive\s*version\b", "Live Version"),
        (r"\blive\s*performance\b", "Live Performance"),
        (r"\blive\b", "Live"),
        (r"\bversion\b", "Version"),
        (r"\brework\b", "Rework"),
        (r"\bbootleg\b", "Bootleg"),
        (r"\bcover\b", "Cover"),
    ]
    .into_iter()
    .map(|(pattern, label)| (Regex::new(&format!("(?i){}", pattern)).unwrap(), label))
    .collect()
});

/// Keywords that make a bracket segment a version tag.
static VERSION_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:live|acoustic|remix|remaster(?:ed)?|edit|version|instrumental|demo|clean|explicit|chopped and screwed|sped up|slowed|nightcore|extended|club mix|vip|rework|bootleg|cover)\b",
    )
    .unwrap()
});

/// Labels whose spelling is fixed regardless of how a table value is cased.
static CANONICAL_LABELS: Lazy<FxHashMap<String, &'static str>> = Lazy::new(|| {
    VERSION_SYNONYMS
        .iter()
        .map(|(_, label)| *label)
        .chain([
            "Slowed and Reverbed",
            "Lyric Video",
            "Official Video",
            "Visualizer",
            ORIGINAL,
        ])
        .map(|label| (label.to_lowercase(), label))
        .collect()
});

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Capitalize each word, leaving all-caps tokens (acronyms) untouched.
pub fn smart_cap(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let is_acronym = word.chars().count() > 1
                && word.chars().any(char::is_uppercase)
                && !word.chars().any(char::is_lowercase);
            if is_acronym {
                word.to_string()
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Map a free-text version phrase onto its canonical label.
pub fn normalize_version_phrase(text: &str) -> String {
    let raw = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if SLOWED_REVERB.is_match(&raw) {
        return "Slowed and Reverbed".to_string();
    }

    for (pattern, label) in VERSION_SYNONYMS.iter() {
        if pattern.is_match(&raw) {
            return label.to_string();
        }
    }

    smart_cap(&raw)
}

/// Title-case a table value. Known labels keep their canonical spelling.
pub fn title_case_label(value: &str) -> String {
    let lower = value.trim().to_lowercase();
    if let Some(label) = CANONICAL_LABELS.get(&lower) {
        return label.to_string();
    }
    lower
        .split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            if i > 0 && word == "and" {
                return word.to_string();
            }
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether a bracket segment reads like a musical version tag.
///
/// Presentation formats ("Official Video", "Visualizer") never qualify, so a
/// presentation label can only enter resolution when a caller passes it in.
pub fn is_version_content(segment: &str) -> bool {
    let seg = segment.trim();
    SLOWED_REVERB.is_match(seg) || VERSION_KEYWORDS.is_match(seg)
}

// ============================================================================
// VERSION TABLE
// ============================================================================

/// Canonical lookup key: lower-cased, and for combinations the `+`-separated
/// parts are trimmed and sorted so "Remix+lyric video" == "lyric video+remix".
pub fn canonical_key(key: &str) -> String {
    let lower = key.trim().to_lowercase();
    if !lower.contains('+') {
        return lower;
    }
    let mut parts: Vec<&str> = lower.split('+').map(str::trim).filter(|p| !p.is_empty()).collect();
    parts.sort_unstable();
    parts.join("+")
}

/// Lookup key for a list of labels found in one title.
pub fn combination_key(labels: &[String]) -> String {
    let mut parts: Vec<String> = labels.iter().map(|l| l.trim().to_lowercase()).collect();
    parts.sort_unstable();
    parts.join("+")
}

/// Version lookup table: single-label normalizations and label combinations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionTable {
    entries: FxHashMap<String, String>,
}

impl VersionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.entries.insert(canonical_key(key), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&canonical_key(key)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a JSON object of `"key": "value"` pairs. The caller's table
    /// replaces the default one in full.
    pub fn from_json(source: &str, json: &str) -> Result<Self, ConfigError> {
        let raw: FxHashMap<String, String> =
            serde_json::from_str(json).map_err(|e| ConfigError::Json {
                path: source.to_string(),
                source: e,
            })?;
        Ok(raw.iter().collect())
    }

    /// The shipped table: musical transformations beat presentation formats,
    /// and among presentation formats lyric video > official video > visualizer.
    pub fn default_table() -> Self {
        let mut table = Self::new();

        // Single labels
        for (key, value) in [
            ("visualizer", "lyric video"),
            ("lyric visualizer", "lyric video"),
            ("lyrics video", "lyric video"),
            ("music video", "official video"),
            ("official music video", "official video"),
            ("live performance", "live"),
            ("live version", "live"),
            ("acoustic version", "acoustic"),
        ] {
            table.insert(key, value);
        }

        // Musical version + presentation format
        for musical in ["acoustic", "live", "remix", "slowed", "instrumental"] {
            for presentation in ["lyric video", "official video", "visualizer"] {
                table.insert(&format!("{}+{}", musical, presentation), musical);
            }
        }

        // Presentation vs presentation
        table.insert("lyric video+official video", "lyric video");
        table.insert("lyric video+visualizer", "lyric video");
        table.insert("official video+visualizer", "official video");

        table
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for VersionTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (key, value) in iter {
            table.insert(key.as_ref(), value.as_ref());
        }
        table
    }
}

pub static DEFAULT_VERSION_TABLE: Lazy<VersionTable> = Lazy::new(VersionTable::default_table);

// ============================================================================
// RESOLUTION
// ============================================================================

/// Resolve the labels found in one title (left-to-right order) to one label.
pub fn resolve_combination(labels: &[String], table: &VersionTable) -> String {
    match labels {
        [] => ORIGINAL.to_string(),
        [single] => table
            .get(single)
            .map(title_case_label)
            .unwrap_or_else(|| single.clone()),
        _ => {
            if let Some(value) = table.get(&combination_key(labels)) {
                return title_case_label(value);
            }
            labels
                .iter()
                .find_map(|label| table.get(label))
                .map(title_case_label)
                .unwrap_or_else(|| labels[0].clone())
        }
    }
}

/// Resolution as the basic parser applies it: without a caller table a lone
/// label is kept as normalized and combinations use the default table.
pub fn resolve_labels(labels: &[String], table: Option<&VersionTable>) -> String {
    match (table, labels) {
        (Some(table), _) => resolve_combination(labels, table),
        (None, [single]) => single.clone(),
        (None, _) => resolve_combination(labels, &DEFAULT_VERSION_TABLE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_slowed_reverb_variants() {
        for phrase in [
            "Slowed + Reverb",
            "slowed x reverb",
            "slowed & reverb",
            "Slowed and Reverbed",
            "slowedreverb",
            "Reverb + Slowed",
            "reverbed slowed",
        ] {
            assert_eq!(normalize_version_phrase(phrase), "Slowed and Reverbed", "{}", phrase);
        }
    }

    #[test]
    fn test_synonyms() {
        assert_eq!(normalize_version_phrase("sped-up"), "Sped Up");
        assert_eq!(normalize_version_phrase("Slowed To Perfection"), "Slowed");
        assert_eq!(normalize_version_phrase("radio  edit"), "Radio Edit");
        assert_eq!(normalize_version_phrase("vip"), "VIP");
        assert_eq!(normalize_version_phrase("2011 Remaster"), "Remastered");
        assert_eq!(normalize_version_phrase("Live Version"), "Live Version");
        assert_eq!(normalize_version_phrase("live"), "Live");
        assert_eq!(normalize_version_phrase("Live at Wembley"), "Live");
        assert_eq!(normalize_version_phrase("Acoustic Version"), "Acoustic");
    }

    #[test]
    fn test_fallback_keeps_acronyms() {
        assert_eq!(normalize_version_phrase("extended mix"), "Extended Mix");
        assert_eq!(normalize_version_phrase("BBC session"), "BBC Session");
        assert_eq!(normalize_version_phrase("official video"), "Official Video");
    }

    #[test]
    fn test_normalize_idempotent() {
        for label in [
            "Slowed and Reverbed",
            "Sped Up",
            "Slowed",
            "Nightcore",
            "Radio Edit",
            "Club Mix",
            "VIP",
            "Remastered",
            "Live Version",
            "Live Performance",
            "Live",
            "Cover",
            "Lyric Video",
            "Extended Mix",
        ] {
            assert_eq!(normalize_version_phrase(label), label);
            assert_eq!(normalize_version_phrase(&normalize_version_phrase(label)), label);
        }
    }

    #[test]
    fn test_resolve_empty_and_single() {
        let table = VersionTable::default_table();
        assert_eq!(resolve_combination(&[], &table), "Original");
        assert_eq!(resolve_combination(&labels(&["Visualizer"]), &table), "Lyric Video");
        assert_eq!(resolve_combination(&labels(&["Nightcore"]), &table), "Nightcore");
    }

    #[test]
    fn test_resolve_combinations() {
        let table = VersionTable::default_table();
        assert_eq!(resolve_combination(&labels(&["Slowed", "Visualizer"]), &table), "Slowed");
        assert_eq!(
            resolve_combination(&labels(&["Official Video", "Lyric Video"]), &table),
            "Lyric Video"
        );
        assert_eq!(
            resolve_combination(&labels(&["Lyric Video", "Remix"]), &table),
            "Remix"
        );
        assert_eq!(
            resolve_combination(&labels(&["Acoustic", "Official Video"]), &table),
            "Acoustic"
        );
    }

    #[test]
    fn test_resolve_falls_back_to_individual_then_first() {
        let table = VersionTable::default_table();
        // No combination entry, but "live version" has a single normalization
        assert_eq!(
            resolve_combination(&labels(&["Nightcore", "Live Version"]), &table),
            "Live"
        );
        assert_eq!(resolve_combination(&labels(&["Nightcore", "Demo"]), &table), "Nightcore");
    }

    #[test]
    fn test_custom_table_replaces_default() {
        let table: VersionTable = [("slowed+visualizer", "visualizer"), ("demo", "vip")]
            .into_iter()
            .collect();
        assert_eq!(resolve_combination(&labels(&["Visualizer", "Slowed"]), &table), "Visualizer");
        assert_eq!(resolve_combination(&labels(&["Demo"]), &table), "VIP");
        // Default entries are gone
        assert_eq!(resolve_combination(&labels(&["Acoustic", "Official Video"]), &table), "Acoustic");
        assert_eq!(
            resolve_combination(&labels(&["Official Video", "Acoustic"]), &table),
            "Official Video"
        );
    }

    #[test]
    fn test_resolve_labels_without_table() {
        assert_eq!(resolve_labels(&labels(&["Live Version"]), None), "Live Version");
        assert_eq!(resolve_labels(&labels(&["Slowed", "Visualizer"]), None), "Slowed");
        assert_eq!(resolve_labels(&[], None), "Original");
    }

    #[test]
    fn test_title_case_label() {
        assert_eq!(title_case_label("slowed and reverbed"), "Slowed and Reverbed");
        assert_eq!(title_case_label("vip"), "VIP");
        assert_eq!(title_case_label("lyric video"), "Lyric Video");
        assert_eq!(title_case_label("deep house edit"), "Deep House Edit");
        assert_eq!(title_case_label("rock and roll mix"), "Rock and Roll Mix");
    }

    #[test]
    fn test_canonical_key_sorts_parts() {
        assert_eq!(canonical_key("Remix + Lyric Video"), "lyric video+remix");
        assert_eq!(canonical_key("Visualizer"), "visualizer");
    }

    #[test]
    fn test_table_from_json() {
        let table = VersionTable::from_json("inline", r#"{"Visualizer": "lyric video"}"#).unwrap();
        assert_eq!(table.get("visualizer"), Some("lyric video"));
        assert!(VersionTable::from_json("inline", "[1, 2]").is_err());
    }

    #[test]
    fn test_is_version_content() {
        assert!(is_version_content("Live at Wembley"));
        assert!(is_version_content("Slowed + Reverb"));
        assert!(is_version_content("Radio Edit"));
        assert!(!is_version_content("Official Video"));
        assert!(!is_version_content("Official Music Video"));
        assert!(!is_version_content("Visualizer"));
        assert!(!is_version_content("Lyrics"));
        assert!(!is_version_content("Part 2"));
    }
}
