//! Error types for title parsing and policy loading.
//!
//! Configuration problems are fatal and only surface while an engine is
//! being built. Validation problems surface per call and never touch engine
//! state. "Nothing matched" outcomes are not errors at all.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while loading or validating policy, allow list or deny list.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse policy '{path}': {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse list '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid profile '{profile}': {reason}")]
    InvalidProfile { profile: String, reason: String },

    #[error("Missing profile: {0}")]
    MissingProfile(String),

    /// An entry carries neither an exact matcher nor a regex.
    #[error("{list} entry #{index} has no matcher")]
    EmptyMatcher { list: &'static str, index: usize },

    #[error("allowlist entry #{index}: confidence_boost {boost} outside [0, 0.5]")]
    InvalidBoost { index: usize, boost: f64 },
}

/// Malformed per-call input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title must be a non-empty string")]
    EmptyTitle,

    #[error("Unknown profile: {0}. Use: strict, balanced, aggressive")]
    UnknownProfile(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, Error>;
