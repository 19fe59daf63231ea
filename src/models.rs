//! Core data models for title parsing and policy decisions.
//!
//! This module contains the parse result, the policy vocabulary (profiles,
//! decisions, parsing methods), the configuration records loaded from the
//! policy / allow list / deny list documents, and batch statistics.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, ValidationError};

// ============================================================================
// Policy Vocabulary
// ============================================================================

/// Named policy profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileName {
    /// Highest precision, conservative parsing
    Strict,
    /// Production default
    #[default]
    Balanced,
    /// Shadow mode for candidate generation
    Aggressive,
}

impl ProfileName {
    pub const ALL: [ProfileName; 3] = [ProfileName::Strict, ProfileName::Balanced, ProfileName::Aggressive];

    pub fn as_str(self) -> &'static str {
        match self {
            ProfileName::Strict => "strict",
            ProfileName::Balanced => "balanced",
            ProfileName::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(ProfileName::Strict),
            "balanced" => Ok(ProfileName::Balanced),
            "aggressive" => Ok(ProfileName::Aggressive),
            _ => Err(ValidationError::UnknownProfile(s.to_string())),
        }
    }
}

/// Trust decision for a parse result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    /// Manual review
    Graylist,
    Reject,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Accept => "accept",
            Decision::Graylist => "graylist",
            Decision::Reject => "reject",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the artist was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParsingMethod {
    TitleDash,
    TitleFeatures,
    ChannelOac,
    ChannelFuzzy,
    BasicParsing,
    StageBRecovery,
}

impl ParsingMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ParsingMethod::TitleDash => "title_dash",
            ParsingMethod::TitleFeatures => "title_features",
            ParsingMethod::ChannelOac => "channel_oac",
            ParsingMethod::ChannelFuzzy => "channel_fuzzy",
            ParsingMethod::BasicParsing => "basic_parsing",
            ParsingMethod::StageBRecovery => "stage_b_recovery",
        }
    }
}

impl fmt::Display for ParsingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Output Models
// ============================================================================

/// Final, immutable result of a policy-aware parse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedTitle {
    /// Empty when no artist could be determined
    pub artist: String,
    pub title: String,
    /// Insertion order, de-duplicated ignoring case
    pub features: Vec<String>,
    /// Canonical label or "Original"
    pub version: String,
    /// Always within [0, 1]
    pub confidence: f64,
    pub decision: Decision,
    /// Diagnostic only, not meant to be parsed
    pub reason: String,
    pub profile_used: ProfileName,
    pub parsing_method: ParsingMethod,
}

// ============================================================================
// Policy Configuration
// ============================================================================

fn default_oac_boost() -> f64 {
    0.15
}

fn default_true() -> bool {
    true
}

/// Thresholds and switches of one profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub accept_min: f64,
    pub gray_min: f64,
    pub reject_below: f64,
    #[serde(default = "default_oac_boost")]
    pub oac_boost: f64,
    #[serde(default)]
    pub use_channel_for_artist: bool,
    #[serde(default = "default_true")]
    pub allow_stage_b: bool,
    #[serde(default)]
    pub shadow_only: bool,
}

impl ProfileConfig {
    /// Check `0 <= reject_below <= gray_min <= accept_min <= 1` and the boost range.
    pub fn validate(&self, name: ProfileName) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidProfile {
            profile: name.to_string(),
            reason,
        };

        let ordered = 0.0 <= self.reject_below
            && self.reject_below <= self.gray_min
            && self.gray_min <= self.accept_min
            && self.accept_min <= 1.0;
        if !ordered {
            return Err(invalid(format!(
                "thresholds must satisfy 0 <= reject_below({}) <= gray_min({}) <= accept_min({}) <= 1",
                self.reject_below, self.gray_min, self.accept_min
            )));
        }
        if !(0.0..=0.5).contains(&self.oac_boost) {
            return Err(invalid(format!("oac_boost {} outside [0, 0.5]", self.oac_boost)));
        }
        Ok(())
    }
}

/// The policy document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserPolicy {
    #[serde(default)]
    pub policy_name: String,
    #[serde(default)]
    pub policy_version: String,
    #[serde(default)]
    pub one_line_policy: String,
    pub profiles: FxHashMap<ProfileName, ProfileConfig>,
}

impl ParserPolicy {
    /// Every named profile must be present and valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in ProfileName::ALL {
            self.profiles
                .get(&name)
                .ok_or_else(|| ConfigError::MissingProfile(name.to_string()))?
                .validate(name)?;
        }
        Ok(())
    }
}

// ============================================================================
// Allow / Deny Lists
// ============================================================================

/// Channel matcher and artist override of an allowlist entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowMatcher {
    /// Exact channel title (compared ignoring case)
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub artist_name: Option<String>,
}

/// Trusted channel mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowlistEntry {
    pub pattern_or_mapping: AllowMatcher,
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Falls back to the profile's `oac_boost` when absent
    #[serde(default)]
    pub confidence_boost: Option<f64>,
    pub owner: String,
    pub created_at: String,
    /// Governance data only; never enforced while parsing
    pub expires_at: String,
    #[serde(default)]
    pub notes: String,
}

/// Garbage-artist matcher of a denylist entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DenyMatcher {
    #[serde(default)]
    pub exact_match: Option<String>,
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_action() -> String {
    "reject".to_string()
}

/// Known garbage artist or channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenylistEntry {
    pub pattern_or_mapping: DenyMatcher,
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(default = "default_action")]
    pub action: String,
    pub owner: String,
    pub created_at: String,
    pub expires_at: String,
    #[serde(default)]
    pub notes: String,
}

/// `{"entries": [...]}` wrapper used by both list documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryList<T> {
    #[serde(default = "Vec::new")]
    pub entries: Vec<T>,
}

impl<T> Default for EntryList<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

/// ISO dates compare lexically; only the date part is considered.
pub fn is_expired(expires_at: &str, today: &str) -> bool {
    let expires = expires_at.get(..10).unwrap_or(expires_at);
    let today = today.get(..10).unwrap_or(today);
    !expires.is_empty() && expires < today
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Counters for a batch run.
#[derive(Default, Debug, Clone, Serialize)]
pub struct BatchStats {
    pub total_titles: usize,
    pub invalid_titles: usize,

    // Decisions
    pub accepted: usize,
    pub graylisted: usize,
    pub rejected: usize,
    pub denylist_hits: usize,

    // Parsing methods
    pub method_title_dash: usize,
    pub method_title_features: usize,
    pub method_channel_oac: usize,
    pub method_channel_fuzzy: usize,
    pub method_basic_parsing: usize,
    pub method_stage_b_recovery: usize,

    // Timing
    pub elapsed_seconds: f64,
}

impl BatchStats {
    pub fn record(&mut self, parsed: &ParsedTitle) {
        self.total_titles += 1;
        match parsed.decision {
            Decision::Accept => self.accepted += 1,
            Decision::Graylist => self.graylisted += 1,
            Decision::Reject => self.rejected += 1,
        }
        if parsed.reason.contains("DENYLIST") {
            self.denylist_hits += 1;
        }
        match parsed.parsing_method {
            ParsingMethod::TitleDash => self.method_title_dash += 1,
            ParsingMethod::TitleFeatures => self.method_title_features += 1,
            ParsingMethod::ChannelOac => self.method_channel_oac += 1,
            ParsingMethod::ChannelFuzzy => self.method_channel_fuzzy += 1,
            ParsingMethod::BasicParsing => self.method_basic_parsing += 1,
            ParsingMethod::StageBRecovery => self.method_stage_b_recovery += 1,
        }
    }

    pub fn record_invalid(&mut self) {
        self.total_titles += 1;
        self.invalid_titles += 1;
    }

    /// Accept rate as a percentage of all titles
    pub fn accept_rate(&self) -> f64 {
        if self.total_titles == 0 {
            0.0
        } else {
            100.0 * self.accepted as f64 / self.total_titles as f64
        }
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
