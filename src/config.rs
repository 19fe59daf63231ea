//! Policy, allow list and deny list loading.
//!
//! Documents are parsed and validated once; regexes are compiled and exact
//! keys case-folded up front so matching at parse time never fails.

use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashMap;
use std::path::Path;
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

use crate::error::ConfigError;
use crate::models::{is_expired, AllowlistEntry, DenylistEntry, EntryList, ParserPolicy};

pub const DEFAULT_POLICY: &str = include_str!("../config/policy.yaml");
pub const DEFAULT_ALLOWLIST: &str = include_str!("../config/allowlist.json");
pub const DEFAULT_DENYLIST: &str = include_str!("../config/denylist.json");

/// Compiled regex size cap; list patterns are short.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

// ============================================================================
// Document Parsing
// ============================================================================

/// Case-fold a key for exact matching (NFKC, trimmed, lowercased).
pub fn fold_key(s: &str) -> String {
    s.trim().nfkc().collect::<String>().to_lowercase()
}

fn read_to_string(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse and validate a policy document. `source` names it in errors.
pub fn parse_policy(source: &str, yaml: &str) -> Result<ParserPolicy, ConfigError> {
    let policy: ParserPolicy = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Yaml {
        path: source.to_string(),
        source: e,
    })?;
    policy.validate()?;
    Ok(policy)
}

pub fn parse_allowlist(source: &str, json: &str) -> Result<Vec<AllowlistEntry>, ConfigError> {
    let list: EntryList<AllowlistEntry> = serde_json::from_str(json).map_err(|e| ConfigError::Json {
        path: source.to_string(),
        source: e,
    })?;
    Ok(list.entries)
}

pub fn parse_denylist(source: &str, json: &str) -> Result<Vec<DenylistEntry>, ConfigError> {
    let list: EntryList<DenylistEntry> = serde_json::from_str(json).map_err(|e| ConfigError::Json {
        path: source.to_string(),
        source: e,
    })?;
    Ok(list.entries)
}

fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
        .map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

// ============================================================================
// Engine Configuration
// ============================================================================

/// Parsed (not yet compiled) configuration documents.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub policy: ParserPolicy,
    pub allowlist: Vec<AllowlistEntry>,
    pub denylist: Vec<DenylistEntry>,
}

impl EngineConfig {
    /// The documents shipped in `config/`.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::from_sources(DEFAULT_POLICY, DEFAULT_ALLOWLIST, DEFAULT_DENYLIST)
    }

    pub fn from_sources(policy_yaml: &str, allowlist_json: &str, denylist_json: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            policy: parse_policy("<policy>", policy_yaml)?,
            allowlist: parse_allowlist("<allowlist>", allowlist_json)?,
            denylist: parse_denylist("<denylist>", denylist_json)?,
        })
    }

    /// Read all three documents from disk. Any missing or malformed file is fatal.
    pub fn load(policy_path: &Path, allowlist_path: &Path, denylist_path: &Path) -> Result<Self, ConfigError> {
        Self::load_or_default(Some(policy_path), Some(allowlist_path), Some(denylist_path))
    }

    /// Read the documents that have a path; the rest fall back to the shipped defaults.
    pub fn load_or_default(
        policy_path: Option<&Path>,
        allowlist_path: Option<&Path>,
        denylist_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let policy = match policy_path {
            Some(path) => parse_policy(&path.display().to_string(), &read_to_string(path)?)?,
            None => parse_policy("<policy>", DEFAULT_POLICY)?,
        };
        let allowlist = match allowlist_path {
            Some(path) => parse_allowlist(&path.display().to_string(), &read_to_string(path)?)?,
            None => parse_allowlist("<allowlist>", DEFAULT_ALLOWLIST)?,
        };
        let denylist = match denylist_path {
            Some(path) => parse_denylist(&path.display().to_string(), &read_to_string(path)?)?,
            None => parse_denylist("<denylist>", DEFAULT_DENYLIST)?,
        };
        Ok(Self {
            policy,
            allowlist,
            denylist,
        })
    }

    /// Entries whose `expires_at` date lies before `today` (YYYY-MM-DD).
    ///
    /// Expiry is governance data; the engine keeps using expired entries.
    pub fn expired_entries(&self, today: &str) -> Vec<String> {
        let mut expired = Vec::new();
        for (i, entry) in self.allowlist.iter().enumerate() {
            if is_expired(&entry.expires_at, today) {
                let m = &entry.pattern_or_mapping;
                let label = m.channel_name.as_deref().or(m.regex.as_deref()).unwrap_or("?");
                expired.push(format!("allowlist #{} '{}' expired {}", i, label, entry.expires_at));
            }
        }
        for (i, entry) in self.denylist.iter().enumerate() {
            if is_expired(&entry.expires_at, today) {
                let m = &entry.pattern_or_mapping;
                let label = m.exact_match.as_deref().or(m.regex.as_deref()).unwrap_or("?");
                expired.push(format!("denylist #{} '{}' expired {}", i, label, entry.expires_at));
            }
        }
        for line in &expired {
            warn!(entry = %line, "Expired list entry still active");
        }
        expired
    }
}

// ============================================================================
// Compiled Lists
// ============================================================================

/// What a matching allowlist entry contributes.
#[derive(Debug, Clone, PartialEq)]
pub struct AllowRule {
    pub artist_name: Option<String>,
    /// `None` means "use the profile's oac_boost"
    pub confidence_boost: Option<f64>,
}

/// Channel allowlist: exact (case-folded) channel names first, then regexes
/// in registration order.
#[derive(Debug, Default)]
pub struct Allowlist {
    exact: FxHashMap<String, usize>,
    patterns: Vec<(Regex, usize)>,
    rules: Vec<AllowRule>,
}

impl Allowlist {
    pub fn compile(entries: &[AllowlistEntry]) -> Result<Self, ConfigError> {
        let mut list = Self::default();
        for (index, entry) in entries.iter().enumerate() {
            let m = &entry.pattern_or_mapping;
            if m.channel_name.is_none() && m.regex.is_none() {
                return Err(ConfigError::EmptyMatcher { list: "allowlist", index });
            }
            if let Some(boost) = entry.confidence_boost {
                if !(0.0..=0.5).contains(&boost) {
                    return Err(ConfigError::InvalidBoost { index, boost });
                }
            }

            let rule = list.rules.len();
            list.rules.push(AllowRule {
                artist_name: m.artist_name.clone().filter(|a| !a.trim().is_empty()),
                confidence_boost: entry.confidence_boost,
            });
            if let Some(name) = &m.channel_name {
                list.exact.entry(fold_key(name)).or_insert(rule);
            }
            if let Some(pattern) = &m.regex {
                list.patterns.push((compile_pattern(pattern)?, rule));
            }
        }
        Ok(list)
    }

    pub fn match_channel(&self, channel: &str) -> Option<&AllowRule> {
        let channel = channel.trim();
        if channel.is_empty() {
            return None;
        }
        if let Some(&rule) = self.exact.get(&fold_key(channel)) {
            return self.rules.get(rule);
        }
        self.patterns
            .iter()
            .find(|(re, _)| re.is_match(channel))
            .and_then(|(_, rule)| self.rules.get(*rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Garbage artist / channel list. A match yields the entry's label:
/// its description, or the pattern itself when no description is set.
#[derive(Debug, Default)]
pub struct Denylist {
    exact: FxHashMap<String, usize>,
    patterns: Vec<(Regex, usize)>,
    labels: Vec<String>,
}

impl Denylist {
    pub fn compile(entries: &[DenylistEntry]) -> Result<Self, ConfigError> {
        let mut list = Self::default();
        for (index, entry) in entries.iter().enumerate() {
            let m = &entry.pattern_or_mapping;
            let label = m
                .description
                .as_deref()
                .filter(|d| !d.trim().is_empty())
                .or(m.exact_match.as_deref())
                .or(m.regex.as_deref())
                .ok_or(ConfigError::EmptyMatcher { list: "denylist", index })?
                .to_string();

            let slot = list.labels.len();
            list.labels.push(label);
            if let Some(exact) = &m.exact_match {
                list.exact.entry(fold_key(exact)).or_insert(slot);
            }
            if let Some(pattern) = &m.regex {
                list.patterns.push((compile_pattern(pattern)?, slot));
            }
            if m.exact_match.is_none() && m.regex.is_none() {
                return Err(ConfigError::EmptyMatcher { list: "denylist", index });
            }
        }
        Ok(list)
    }

    /// Label of the first matching entry, if any. Empty text never matches.
    pub fn matches(&self, text: &str) -> Option<&str> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Some(&slot) = self.exact.get(&fold_key(text)) {
            return self.labels.get(slot).map(String::as_str);
        }
        self.patterns
            .iter()
            .find(|(re, _)| re.is_match(text))
            .and_then(|(_, slot)| self.labels.get(*slot))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileName;

    fn deny_json(matcher: &str) -> String {
        format!(
            r#"{{"entries": [{{"pattern_or_mapping": {}, "type": "known_garbage",
                "owner": "qa", "created_at": "2025-01-01", "expires_at": "2025-06-01"}}]}}"#,
            matcher
        )
    }

    #[test]
    fn test_defaults_load() {
        let config = EngineConfig::defaults().unwrap();
        assert_eq!(config.policy.profiles.len(), 3);
        assert!(!config.policy.profiles[&ProfileName::Strict].allow_stage_b);
        assert!(config.policy.profiles[&ProfileName::Aggressive].shadow_only);
        assert!(Allowlist::compile(&config.allowlist).is_ok());
        assert_eq!(Denylist::compile(&config.denylist).unwrap().len(), 3);
    }

    #[test]
    fn test_fold_key() {
        assert_eq!(fold_key("  Taylor Swift - TOPIC "), "taylor swift - topic");
        // Fullwidth letters fold under NFKC
        assert_eq!(fold_key("ＤＲＡＫＥ"), "drake");
    }

    #[test]
    fn test_invalid_regex_fails_at_load() {
        let entries = parse_denylist("inline", &deny_json(r#"{"regex": "([unclosed"}"#)).unwrap();
        assert!(matches!(
            Denylist::compile(&entries),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_empty_matcher_rejected() {
        let entries = parse_denylist("inline", &deny_json(r#"{"description": "nothing"}"#)).unwrap();
        assert!(matches!(
            Denylist::compile(&entries),
            Err(ConfigError::EmptyMatcher { list: "denylist", index: 0 })
        ));
    }

    #[test]
    fn test_denylist_matching() {
        let config = EngineConfig::defaults().unwrap();
        let deny = Denylist::compile(&config.denylist).unwrap();
        assert_eq!(deny.matches("3rd I Cam"), Some("Camera channel uploads"));
        assert_eq!(deny.matches("21st i cam"), Some("Camera channel uploads"));
        assert_eq!(deny.matches("word 4 word🎼"), Some("Emoji spam artist"));
        assert_eq!(deny.matches("gamesound hub 🎮🎶"), Some("GameSound Hub 🎮🎶"));
        assert_eq!(deny.matches("Taylor Swift"), None);
        assert_eq!(deny.matches(""), None);
    }

    #[test]
    fn test_denylist_label_falls_back_to_pattern() {
        let entries = parse_denylist("inline", &deny_json(r#"{"regex": "^spam"}"#)).unwrap();
        let deny = Denylist::compile(&entries).unwrap();
        assert_eq!(deny.matches("Spam Channel"), Some("^spam"));
    }

    #[test]
    fn test_allowlist_exact_then_regex() {
        let config = EngineConfig::defaults().unwrap();
        let allow = Allowlist::compile(&config.allowlist).unwrap();

        let rule = allow.match_channel("taylor swift - topic").unwrap();
        assert_eq!(rule.artist_name.as_deref(), Some("Taylor Swift"));
        assert_eq!(rule.confidence_boost, Some(0.15));

        let rule = allow.match_channel("DrakeVEVO").unwrap();
        assert_eq!(rule.artist_name.as_deref(), Some("Drake"));
        assert_eq!(rule.confidence_boost, None);

        assert!(allow.match_channel("Random Channel").is_none());
        assert!(allow.match_channel("").is_none());
    }

    #[test]
    fn test_allowlist_boost_range() {
        let json = r#"{"entries": [{"pattern_or_mapping": {"channel_name": "X"}, "type": "youtube_oac",
            "confidence_boost": 0.9, "owner": "qa", "created_at": "2025-01-01", "expires_at": "2026-01-01"}]}"#;
        let entries = parse_allowlist("inline", json).unwrap();
        assert!(matches!(
            Allowlist::compile(&entries),
            Err(ConfigError::InvalidBoost { index: 0, .. })
        ));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(parse_policy("p", "profiles: ["), Err(ConfigError::Yaml { .. })));
        assert!(matches!(parse_allowlist("a", "{not json"), Err(ConfigError::Json { .. })));

        let bad_thresholds = DEFAULT_POLICY.replace("accept_min: 0.85", "accept_min: 0.20");
        assert!(matches!(
            parse_policy("p", &bad_thresholds),
            Err(ConfigError::InvalidProfile { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let missing = Path::new("/nonexistent/policy.yaml");
        let result = EngineConfig::load(missing, missing, missing);
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_expired_entries() {
        let mut config = EngineConfig::defaults().unwrap();
        assert!(config.expired_entries("2026-01-01").is_empty());

        config.denylist = parse_denylist("inline", &deny_json(r#"{"exact_match": "old"}"#)).unwrap();
        let expired = config.expired_entries("2026-01-01");
        assert_eq!(expired.len(), 1);
        assert!(expired[0].contains("'old'"));
    }
}
