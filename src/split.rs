//! Artist / title splitting and channel-name cleanup.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::features::split_collaborators;

/// First spaced hyphen, en dash or em dash: "Artist - Title".
static SPACED_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s[-–—]\s").unwrap());

/// Auto-generated YouTube topic channel suffix.
static TOPIC_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*-\s*Topic$").unwrap());

/// Split "Artist A & Artist B - Song Title" into (["Artist A", "Artist B"], "Song Title").
///
/// Without a spaced dash the artist list is empty and the (trimmed) input is
/// returned as the remainder. Slashes on the left side split too, so a band
/// named "AC/DC" comes back as two names.
pub fn split_artist_title(full: &str) -> (Vec<String>, String) {
    let s = full.trim();
    let Some(m) = SPACED_DASH.find(s) else {
        return (Vec::new(), s.to_string());
    };

    let left = s[..m.start()].trim();
    let right = s[m.end()..].trim();
    (split_collaborators(left), right.to_string())
}

/// Strip a trailing " - Topic" from a channel title and trim it.
pub fn normalize_channel_title_for_artist(channel: &str) -> String {
    TOPIC_SUFFIX.replace(channel.trim(), "").trim().to_string()
}
