//! Policy engine: two-stage artist detection, confidence and decision.
//!
//! An engine is built once from validated configuration and never mutated,
//! so a single instance can serve parse calls from any number of threads.
//!
//! Per call:
//! 1. Stage A: dash split, then channel (allowlist / official artist channel),
//!    then fuzzy channel prefix when the profile allows channel artists
//! 2. Stage B: loose separators, only without an artist and when allowed
//! 3. Basic parse of the remaining title with YouTube noise removal
//! 4. Confidence from the method table plus channel boost
//! 5. Denylist on artist and channel, then the threshold decision

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

use crate::config::{fold_key, Allowlist, Denylist, EngineConfig};
use crate::error::{ConfigError, ValidationError};
use crate::models::{Decision, ParsedTitle, ParsingMethod, ProfileConfig, ProfileName};
use crate::parser::{parse_title, ParseOptions};
use crate::scoring::{apply_boost, base_confidence, decide, fuzzy_channel_prefix, method_reason};
use crate::split::{normalize_channel_title_for_artist, split_artist_title};
use crate::version::VersionTable;

// ============================================================================
// Constants
// ============================================================================

/// Stage B separators, tried in this order.
pub const LOOSE_SEPARATORS: [&str; 4] = [" & ", " x ", " / ", ", "];

/// Built-in official artist channel shapes: "Artist - Topic", "ArtistVEVO".
static OAC_CHANNEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?P<artist>.+?)\s*(?:\s-\sTopic|VEVO)$").unwrap());

// ============================================================================
// Stage Results
// ============================================================================

/// Artist resolved from the channel, with the boost it earns.
#[derive(Debug, Clone)]
struct ChannelArtist {
    artist: String,
    boost: f64,
}

/// Outcome of stage selection, before the basic parse.
#[derive(Debug)]
struct Candidate {
    artists: Vec<String>,
    remainder: String,
    method: ParsingMethod,
    boost: Option<f64>,
}

impl Candidate {
    fn without_artist(title: &str) -> Self {
        Self {
            artists: Vec::new(),
            remainder: title.trim().to_string(),
            method: ParsingMethod::BasicParsing,
            boost: None,
        }
    }

    fn artist(&self) -> String {
        self.artists.join(", ")
    }
}

// ============================================================================
// Bracket-aware searching
// ============================================================================

fn is_open(c: char) -> bool {
    matches!(c, '(' | '[' | '{')
}

fn is_close(c: char) -> bool {
    matches!(c, ')' | ']' | '}')
}

/// Byte offset of the first `needle` outside any bracket.
fn find_outside_brackets(text: &str, needle: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        if is_open(c) {
            depth += 1;
        } else if is_close(c) {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && text[i..].starts_with(needle) {
            return Some(i);
        }
    }
    None
}

/// First hyphen / en dash / em dash outside brackets with non-space on both sides.
fn find_unspaced_dash(text: &str) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if is_open(c) {
            depth += 1;
        } else if is_close(c) {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && matches!(c, '-' | '–' | '—') {
            let next = chars.peek().map(|&(_, n)| n);
            let tight = |ch: Option<char>| ch.is_some_and(|ch| !ch.is_whitespace() && !matches!(ch, '-' | '–' | '—'));
            if tight(prev) && tight(next) {
                return Some((i, i + c.len_utf8()));
            }
        }
        prev = Some(c);
    }
    None
}

// ============================================================================
// Engine
// ============================================================================

pub struct PolicyEngine {
    policy_name: String,
    policy_version: String,
    /// Indexed by `profile_slot`
    profiles: [ProfileConfig; 3],
    allowlist: Allowlist,
    denylist: Denylist,
    version_table: Option<VersionTable>,
}

fn profile_slot(name: ProfileName) -> usize {
    match name {
        ProfileName::Strict => 0,
        ProfileName::Balanced => 1,
        ProfileName::Aggressive => 2,
    }
}

impl PolicyEngine {
    /// Build from already-parsed documents. Compiles every pattern; an invalid
    /// regex or profile fails here, never at parse time.
    pub fn from_config(config: EngineConfig) -> Result<Self, ConfigError> {
        config.policy.validate()?;
        let profile = |name: ProfileName| {
            config
                .policy
                .profiles
                .get(&name)
                .cloned()
                .ok_or_else(|| ConfigError::MissingProfile(name.to_string()))
        };
        let profiles = [
            profile(ProfileName::Strict)?,
            profile(ProfileName::Balanced)?,
            profile(ProfileName::Aggressive)?,
        ];

        let allowlist = Allowlist::compile(&config.allowlist)?;
        let denylist = Denylist::compile(&config.denylist)?;

        info!(
            policy = %config.policy.policy_name,
            version = %config.policy.policy_version,
            allowlist = allowlist.len(),
            denylist = denylist.len(),
            "Policy engine ready"
        );

        Ok(Self {
            policy_name: config.policy.policy_name,
            policy_version: config.policy.policy_version,
            profiles,
            allowlist,
            denylist,
            version_table: None,
        })
    }

    /// Engine over the shipped default policy and lists.
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::from_config(EngineConfig::defaults()?)
    }

    pub fn load(policy_path: &Path, allowlist_path: &Path, denylist_path: &Path) -> Result<Self, ConfigError> {
        Self::from_config(EngineConfig::load(policy_path, allowlist_path, denylist_path)?)
    }

    /// Replace the default version table in full.
    pub fn with_version_table(mut self, table: VersionTable) -> Self {
        self.version_table = Some(table);
        self
    }

    pub fn policy_name(&self) -> &str {
        &self.policy_name
    }

    pub fn policy_version(&self) -> &str {
        &self.policy_version
    }

    pub fn profile(&self, name: ProfileName) -> &ProfileConfig {
        &self.profiles[profile_slot(name)]
    }

    pub fn allowlist_len(&self) -> usize {
        self.allowlist.len()
    }

    pub fn denylist_len(&self) -> usize {
        self.denylist.len()
    }

    // ------------------------------------------------------------------------
    // List lookups
    // ------------------------------------------------------------------------

    /// Label of the denylist entry matching `name`, if any.
    pub fn denylist_match(&self, name: &str) -> Option<&str> {
        self.denylist.matches(name)
    }

    pub fn is_denylisted(&self, name: &str) -> bool {
        self.denylist.matches(name).is_some()
    }

    /// Allowlisted channel, or one shaped like an official artist channel.
    pub fn is_youtube_oac(&self, channel: &str) -> bool {
        self.allowlist.match_channel(channel).is_some() || OAC_CHANNEL.is_match(channel.trim())
    }

    /// Artist behind an official artist channel: the allowlist override
    /// first, then the name left after stripping " - Topic" or "VEVO".
    pub fn oac_artist(&self, channel: &str) -> Option<String> {
        let channel = channel.trim();
        if let Some(rule) = self.allowlist.match_channel(channel) {
            if let Some(artist) = &rule.artist_name {
                return Some(artist.clone());
            }
        }
        if let Some(caps) = OAC_CHANNEL.captures(channel) {
            return caps.name("artist").map(|m| m.as_str().trim().to_string());
        }
        if self.allowlist.match_channel(channel).is_some() {
            let artist = normalize_channel_title_for_artist(channel);
            return (!artist.is_empty()).then_some(artist);
        }
        None
    }

    /// Threshold decision under a named profile.
    pub fn decide(&self, confidence: f64, profile: ProfileName) -> Decision {
        decide(confidence, self.profile(profile))
    }

    fn channel_artist(&self, channel: &str, profile: &ProfileConfig) -> Option<ChannelArtist> {
        if channel.is_empty() {
            return None;
        }
        let boost = match self.allowlist.match_channel(channel) {
            Some(rule) => rule.confidence_boost.unwrap_or(profile.oac_boost),
            None if OAC_CHANNEL.is_match(channel) => profile.oac_boost,
            None => return None,
        };
        let artist = self.oac_artist(channel)?;
        Some(ChannelArtist { artist, boost })
    }

    // ------------------------------------------------------------------------
    // Stages
    // ------------------------------------------------------------------------

    fn stage_a(&self, title: &str, channel: &str, profile: &ProfileConfig) -> Candidate {
        let from_channel = self.channel_artist(channel, profile);

        let (artists, remainder) = split_artist_title(title);
        if !artists.is_empty() && !remainder.is_empty() {
            // The channel never overrides a dash artist; agreement earns the boost
            let boost = from_channel.and_then(|c| {
                let key = fold_key(&c.artist);
                artists.iter().any(|a| fold_key(a) == key).then_some(c.boost)
            });
            return Candidate {
                artists,
                remainder,
                method: ParsingMethod::TitleDash,
                boost,
            };
        }

        if let Some(c) = from_channel {
            return Candidate {
                artists: vec![c.artist],
                remainder: title.trim().to_string(),
                method: ParsingMethod::ChannelOac,
                boost: Some(c.boost),
            };
        }

        if profile.use_channel_for_artist && !channel.is_empty() {
            let channel_artist = normalize_channel_title_for_artist(channel);
            if let Some(rest) = fuzzy_channel_prefix(title.trim(), &channel_artist) {
                return Candidate {
                    artists: vec![channel_artist],
                    remainder: rest.to_string(),
                    method: ParsingMethod::ChannelFuzzy,
                    boost: None,
                };
            }
        }

        Candidate::without_artist(title)
    }

    fn stage_b(&self, title: &str) -> Option<Candidate> {
        let title = title.trim();
        let recovered = |left: &str, right: &str| Candidate {
            artists: vec![left.to_string()],
            remainder: right.to_string(),
            method: ParsingMethod::StageBRecovery,
            boost: None,
        };

        let mut any_separator = false;
        for sep in LOOSE_SEPARATORS {
            let Some(pos) = find_outside_brackets(title, sep) else {
                continue;
            };
            any_separator = true;
            let left = title[..pos].trim();
            let right = title[pos + sep.len()..].trim();
            if !left.is_empty() && !right.is_empty() && !self.is_denylisted(left) {
                return Some(recovered(left, right));
            }
        }
        if any_separator {
            return None;
        }

        let (start, end) = find_unspaced_dash(title)?;
        let left = title[..start].trim();
        let right = title[end..].trim();
        if left.is_empty() || right.is_empty() || self.is_denylisted(left) {
            return None;
        }
        Some(recovered(left, right))
    }

    // ------------------------------------------------------------------------
    // Parse
    // ------------------------------------------------------------------------

    /// Parse `title` (with an optional channel name, "" for none) under `profile`.
    ///
    /// Only an empty or whitespace-only title is an error; everything else
    /// produces a result, at worst a zero-confidence rejection.
    pub fn parse(&self, title: &str, channel: &str, profile_name: ProfileName) -> Result<ParsedTitle, ValidationError> {
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let profile = self.profile(profile_name);
        let channel = channel.trim();

        let mut candidate = self.stage_a(title, channel, profile);
        if candidate.artists.is_empty() && profile.allow_stage_b {
            if let Some(recovered) = self.stage_b(title) {
                candidate = recovered;
            }
        }
        debug!(
            title,
            channel,
            profile = %profile_name,
            method = %candidate.method,
            "Stage selected"
        );

        let options = ParseOptions {
            normalize_youtube_noise: true,
            version_table: self.version_table.as_ref(),
        };
        let remainder = if candidate.remainder.trim().is_empty() {
            title
        } else {
            candidate.remainder.as_str()
        };
        let basic = parse_title(remainder, &options)?;

        let artist = candidate.artist();
        let mut reasons = vec![method_reason(candidate.method).to_string()];
        let mut confidence = base_confidence(candidate.method);

        if artist.is_empty() {
            confidence = 0.0;
            reasons.push("no artist extracted".to_string());
        } else if let Some(boost) = candidate.boost {
            confidence = apply_boost(confidence, boost);
            reasons.push(format!("OAC boost (+{:.2})", boost));
        }

        let denied = std::iter::once(artist.as_str())
            .chain(candidate.artists.iter().map(String::as_str))
            .chain(std::iter::once(channel))
            .find_map(|name| self.denylist.matches(name));

        let decision = match denied {
            Some(label) => {
                debug!(title, label, "Denylist hit");
                confidence = 0.0;
                reasons.push(format!("DENYLIST: {}", label));
                Decision::Reject
            }
            None => decide(confidence, profile),
        };

        Ok(ParsedTitle {
            artist,
            title: basic.title,
            features: basic.features,
            version: basic.version,
            confidence,
            decision,
            reason: reasons.join("; "),
            profile_used: profile_name,
            parsing_method: candidate.method,
        })
    }
}
