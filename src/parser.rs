//! Basic title parser: clean title, featured guests and version from a title
//! string alone (no channel context).

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::error::ValidationError;
use crate::features::{extract_features, feature_segment_guests, push_unique};
use crate::segments::scan;
use crate::version::{is_version_content, normalize_version_phrase, resolve_labels, VersionTable, ORIGINAL};

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// YouTube presentation labels: not part of the song's identity.
static YT_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)^(?:
            official(?:\s+music)?\s*video |
            official\s*audio |
            hq\s*audio |
            lyrics?(?:\s*video)? |
            visuali[zs]er |
            audio\s*only |
            full\s*album |
            hd | 4k | 8k
        )$",
    )
    .unwrap()
});

/// "(Produced by X)" as a whole segment.
static PRODUCED_BY_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^produced\s+by\s+.+$").unwrap());

/// Trailing "... Produced by X" in the base text.
static PRODUCED_BY_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*produced\s+by\s+.+$").unwrap());

/// Lyric / visualizer mention anywhere in the raw title.
static LYRIC_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\blyrics?\b|visuali[zs]er").unwrap());

// ============================================================================
// TYPES
// ============================================================================

/// Unvalidated parse of a title. `artist` is always empty here; only the
/// policy engine assigns artists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BasicParse {
    pub artist: String,
    pub title: String,
    pub features: Vec<String>,
    pub version: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions<'a> {
    /// Drop YouTube presentation labels and producer credits.
    pub normalize_youtube_noise: bool,
    /// Replaces the default version table in full when set.
    pub version_table: Option<&'a VersionTable>,
}

impl<'a> ParseOptions<'a> {
    pub fn youtube() -> Self {
        Self {
            normalize_youtube_noise: true,
            version_table: None,
        }
    }
}

fn is_noise_segment(segment: &str) -> bool {
    let seg = segment.trim();
    YT_NOISE.is_match(seg) || PRODUCED_BY_SEGMENT.is_match(seg)
}

// ============================================================================
// PARSING
// ============================================================================

/// Parse "Song Title (feat. A & B) (Live Version)" into its parts.
///
/// Fails only on empty or whitespace-only input.
pub fn parse_title(title: &str, options: &ParseOptions) -> Result<BasicParse, ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }

    let noise = options.normalize_youtube_noise;
    let (mut base, segments) = scan(title);

    if noise {
        base = PRODUCED_BY_TAIL.replace(&base, "").trim().to_string();
    }

    let mut features = Vec::new();
    let mut seen = FxHashSet::default();

    let (clean, guests) = extract_features(&base);
    for guest in &guests {
        push_unique(&mut features, &mut seen, guest);
    }

    let mut candidates = Vec::new();
    for segment in &segments {
        if noise && is_noise_segment(segment) {
            continue;
        }
        if let Some(guests) = feature_segment_guests(segment) {
            for guest in &guests {
                push_unique(&mut features, &mut seen, guest);
            }
            continue;
        }
        if is_version_content(segment) {
            candidates.push(normalize_version_phrase(segment));
        }
    }

    let mut version = resolve_labels(&candidates, options.version_table);

    // The label itself was dropped as noise, but it still says what the upload is
    if noise && version == ORIGINAL && LYRIC_HINT.is_match(title) {
        version = "Lyric Video".to_string();
    }

    Ok(BasicParse {
        artist: String::new(),
        title: clean,
        features,
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(title: &str) -> BasicParse {
        parse_title(title, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn test_parse_plain_title() {
        let parsed = parse("My Awesome Song");
        assert_eq!(parsed.artist, "");
        assert_eq!(parsed.title, "My Awesome Song");
        assert!(parsed.features.is_empty());
        assert_eq!(parsed.version, "Original");
    }

    #[test]
    fn test_parse_plain_titles_are_untouched() {
        for title in ["Anti-Hero", "  Bohemian Rhapsody ", "99 Problems", "Señorita"] {
            let parsed = parse(title);
            assert_eq!(parsed.title, title.trim());
            assert_eq!(parsed.version, "Original");
            assert!(parsed.features.is_empty());
        }
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(parse_title("", &ParseOptions::default()), Err(ValidationError::EmptyTitle));
        assert_eq!(parse_title("   ", &ParseOptions::default()), Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn test_parse_bracket_features() {
        let parsed = parse("Song Title (feat. Artist A & Artist B)");
        assert_eq!(parsed.title, "Song Title");
        assert_eq!(parsed.features, vec!["Artist A", "Artist B"]);
        assert_eq!(parsed.version, "Original");

        assert_eq!(parse("Another Song (ft. Another Artist)").features, vec!["Another Artist"]);
        assert_eq!(parse("Third Song (featuring Third Artist)").features, vec!["Third Artist"]);
    }

    #[test]
    fn test_parse_dash_features() {
        let parsed = parse("Song Title - feat. Featured Artist");
        assert_eq!(parsed.title, "Song Title");
        assert_eq!(parsed.features, vec!["Featured Artist"]);
    }

    #[test]
    fn test_parse_features_dedup_across_sources() {
        let parsed = parse("Song ft. A (feat. a & B)");
        assert_eq!(parsed.title, "Song");
        assert_eq!(parsed.features, vec!["A", "B"]);
    }

    #[test]
    fn test_parse_versions() {
        assert_eq!(parse("Song Title (Live)").version, "Live");
        assert_eq!(parse("Track Name (Live Version)").version, "Live Version");
        assert_eq!(parse("Song Title (Acoustic)").version, "Acoustic");
        assert_eq!(parse("Song Title (Remix)").version, "Remix");
        assert_eq!(parse("Song Title (Slowed + Reverb)").version, "Slowed and Reverbed");
    }

    #[test]
    fn test_parse_feature_segment_is_not_a_version() {
        let parsed = parse("Song (with Live Band)");
        assert_eq!(parsed.features, vec!["Live Band"]);
        assert_eq!(parsed.version, "Original");
    }

    #[test]
    fn test_parse_presentation_labels_are_not_versions() {
        assert_eq!(parse("Song Title (Official Music Video)").version, "Original");
        assert_eq!(parse("Song (Official Video) (Lyric Video)").version, "Original");
        assert_eq!(parse("Song (Visualizer)").version, "Original");
    }

    #[test]
    fn test_parse_musical_beats_presentation() {
        let parsed = parse("Song (Slowed) (Visualizer)");
        assert_eq!(parsed.title, "Song");
        assert_eq!(parsed.version, "Slowed");

        assert_eq!(parse("Song (Acoustic) [Official Video]").version, "Acoustic");
        assert_eq!(
            parse("Song Title (feat. Artist) (Live Version) (Official Video)").version,
            "Live Version"
        );
        assert_eq!(parse("Song (Remix) (Official Music Video)").version, "Remix");
    }

    #[test]
    fn test_parse_with_custom_table() {
        let table: VersionTable = [("live", "acoustic"), ("remix+slowed", "slowed")]
            .into_iter()
            .collect();
        let options = ParseOptions {
            normalize_youtube_noise: false,
            version_table: Some(&table),
        };
        assert_eq!(parse_title("Song (Live)", &options).unwrap().version, "Acoustic");
        assert_eq!(parse_title("Song (Remix) (Slowed)", &options).unwrap().version, "Slowed");
        assert_eq!(parse("Song (Remix) (Slowed)").version, "Remix");
    }

    #[test]
    fn test_parse_standalone_with_is_a_feature() {
        // "with" outside brackets is read as a feature clause even in plain titles
        let parsed = parse("Dancing with Myself");
        assert_eq!(parsed.title, "Dancing");
        assert_eq!(parsed.features, vec!["Myself"]);
        assert_eq!(parsed.version, "Original");
    }

    #[test]
    fn test_parse_youtube_noise() {
        let options = ParseOptions::youtube();
        let parsed = parse_title("Song (Official Music Video) [HD]", &options).unwrap();
        assert_eq!(parsed.title, "Song");
        assert_eq!(parsed.version, "Original");

        let parsed = parse_title("Song (Lyrics)", &options).unwrap();
        assert_eq!(parsed.version, "Lyric Video");

        let parsed = parse_title("Song Produced by IVN (Remix)", &options).unwrap();
        assert_eq!(parsed.title, "Song");
        assert_eq!(parsed.version, "Remix");

        let parsed = parse_title("Song (Produced by Metro)", &options).unwrap();
        assert_eq!(parsed.title, "Song");
        assert_eq!(parsed.version, "Original");
    }

    #[test]
    fn test_parse_noise_kept_without_toggle() {
        let parsed = parse("Song Produced by IVN");
        assert_eq!(parsed.title, "Song Produced by IVN");
    }

    #[test]
    fn test_parse_malformed_brackets() {
        let parsed = parse("Song (Live");
        assert_eq!(parsed.title, "Song (Live");
        assert_eq!(parsed.version, "Original");
    }
}
