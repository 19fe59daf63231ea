//! Confidence scoring and threshold decisions.
//!
//! This module contains:
//! - The base confidence table keyed by parsing method
//! - Boost application and clamping
//! - Channel / title prefix similarity (channel_fuzzy)
//! - Threshold decision against a profile

use crate::models::{Decision, ParsingMethod, ProfileConfig};

// ============================================================================
// Confidence Table
// ============================================================================

/// Minimum normalized Levenshtein similarity for a channel_fuzzy match
pub const FUZZY_CHANNEL_THRESHOLD: f64 = 0.85;

/// Starting confidence for each way of finding the artist.
pub fn base_confidence(method: ParsingMethod) -> f64 {
    match method {
        ParsingMethod::ChannelOac => 0.90,
        ParsingMethod::TitleDash => 0.80,
        ParsingMethod::TitleFeatures => 0.75,
        ParsingMethod::StageBRecovery => 0.65,
        ParsingMethod::ChannelFuzzy => 0.60,
        ParsingMethod::BasicParsing => 0.50,
    }
}

/// Leading reason fragment for each method.
pub fn method_reason(method: ParsingMethod) -> &'static str {
    match method {
        ParsingMethod::TitleDash => "clean dash separator",
        ParsingMethod::TitleFeatures => "feature extraction",
        ParsingMethod::ChannelOac => "YouTube OAC",
        ParsingMethod::ChannelFuzzy => "channel matching",
        ParsingMethod::StageBRecovery => "stage B recovery",
        ParsingMethod::BasicParsing => "basic parsing",
    }
}

pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Add a boost, capped at 1.0.
pub fn apply_boost(confidence: f64, boost: f64) -> f64 {
    clamp_confidence(confidence + boost.max(0.0))
}

// ============================================================================
// Channel Similarity
// ============================================================================

/// Similarity of two case-folded names (0.0 to 1.0).
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    strsim::normalized_levenshtein(&a, &b)
}

/// If `title` opens with words resembling `channel`, return the rest of the title.
///
/// Tries prefixes of the same word count as the channel, one word shorter and
/// one longer, and keeps the most similar one at or above the threshold. The
/// remainder must be non-empty after trimming separators.
pub fn fuzzy_channel_prefix<'a>(title: &'a str, channel: &str) -> Option<&'a str> {
    let channel_words = channel.split_whitespace().count();
    if channel_words == 0 {
        return None;
    }

    // Byte offset just past each word of the title
    let word_ends: Vec<usize> = title
        .split_whitespace()
        .map(|w| w.as_ptr() as usize - title.as_ptr() as usize + w.len())
        .collect();

    let mut best: Option<(f64, usize)> = None;
    for words in channel_words.saturating_sub(1).max(1)..=channel_words + 1 {
        let Some(&end) = word_ends.get(words - 1) else {
            break;
        };
        let score = name_similarity(&title[..end], channel);
        if score >= FUZZY_CHANNEL_THRESHOLD && best.map_or(true, |(s, _)| score > s) {
            best = Some((score, end));
        }
    }

    let (_, end) = best?;
    let rest = title[end..].trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '–' | '—' | ':' | '|'));
    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}

// ============================================================================
// Decision
// ============================================================================

/// Threshold decision: accept at `accept_min`, graylist at `gray_min`, else reject.
pub fn decide(confidence: f64, profile: &ProfileConfig) -> Decision {
    let confidence = clamp_confidence(confidence);
    if confidence < profile.reject_below {
        Decision::Reject
    } else if confidence >= profile.accept_min {
        Decision::Accept
    } else if confidence >= profile.gray_min {
        Decision::Graylist
    } else {
        Decision::Reject
    }
}
