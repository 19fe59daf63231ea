//! Music title decomposition and policy decisions.
//!
//! Splits free-form upload titles into artist, title, featured guests and
//! version, then scores the result and decides whether to accept, graylist
//! or reject it under a named policy profile.

pub mod config;
pub mod error;
pub mod features;
pub mod models;
pub mod parser;
pub mod policy;
pub mod progress;
pub mod safety;
pub mod scoring;
pub mod segments;
pub mod split;
pub mod version;

pub use config::EngineConfig;
pub use error::{ConfigError, Error, Result, ValidationError};
pub use features::extract_features;
pub use models::{Decision, ParsedTitle, ParsingMethod, ProfileConfig, ProfileName};
pub use parser::{parse_title, BasicParse, ParseOptions};
pub use policy::PolicyEngine;
pub use segments::scan;
pub use split::{normalize_channel_title_for_artist, split_artist_title};
pub use version::{normalize_version_phrase, resolve_combination, VersionTable, DEFAULT_VERSION_TABLE};
