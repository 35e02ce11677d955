//! Tokenizer configuration and `tokenize=` argument parsing.
//!
//! The host hands the tokenizer a flat list of arguments taken from the
//! `tokenize=` option of `CREATE VIRTUAL TABLE`, for example
//! `tokenize='better_trigram case_sensitive 1'`. Everything after the
//! tokenizer name is a sequence of `key value` pairs.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Rejections raised while parsing tokenizer arguments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown option '{key}'")]
    UnknownOption { key: String },

    #[error("invalid value '{value}' for option '{key}' (expected 0 or 1)")]
    InvalidValue { key: String, value: String },

    #[error("option '{key}' is missing a value")]
    MissingValue { key: String },

    #[error("remove_diacritics requires case_sensitive 0")]
    CaseSensitiveDiacritics,
}

/// Immutable per-table tokenizer configuration.
///
/// Deserialization goes through [`TrigramConfig::new`], so a serialized
/// configuration can never carry the rejected combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawConfig")]
pub struct TrigramConfig {
    case_sensitive: bool,
    remove_diacritics: bool,
}

/// Unvalidated wire form of [`TrigramConfig`].
#[derive(Deserialize)]
struct RawConfig {
    case_sensitive: bool,
    remove_diacritics: bool,
}

impl TryFrom<RawConfig> for TrigramConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, ConfigError> {
        Self::new(raw.case_sensitive, raw.remove_diacritics)
    }
}

impl TrigramConfig {
    /// Build a configuration, rejecting the case-sensitive + diacritic
    /// removal combination.
    pub fn new(case_sensitive: bool, remove_diacritics: bool) -> Result<Self, ConfigError> {
        if case_sensitive && remove_diacritics {
            return Err(ConfigError::CaseSensitiveDiacritics);
        }
        Ok(Self {
            case_sensitive,
            remove_diacritics,
        })
    }

    /// Parse the `key value` argument list that follows the tokenizer name.
    ///
    /// Keys are matched ASCII case-insensitively and may appear in any order.
    /// An empty list yields the defaults.
    pub fn from_args(args: &[&str]) -> Result<Self, ConfigError> {
        let mut case_sensitive = false;
        let mut remove_diacritics = false;

        for pair in args.chunks(2) {
            let key = pair[0];
            let Some(&value) = pair.get(1) else {
                return Err(ConfigError::MissingValue {
                    key: key.to_owned(),
                });
            };

            let slot = if key.eq_ignore_ascii_case("case_sensitive") {
                &mut case_sensitive
            } else if key.eq_ignore_ascii_case("remove_diacritics") {
                &mut remove_diacritics
            } else {
                return Err(ConfigError::UnknownOption {
                    key: key.to_owned(),
                });
            };

            *slot = parse_flag(value).ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_owned(),
                value: value.to_owned(),
            })?;
        }

        let config = Self::new(case_sensitive, remove_diacritics)?;
        debug!(
            case_sensitive = config.case_sensitive,
            remove_diacritics = config.remove_diacritics,
            "better_trigram: parsed tokenizer arguments"
        );
        Ok(config)
    }

    #[must_use]
    pub const fn case_sensitive(self) -> bool {
        self.case_sensitive
    }

    #[must_use]
    pub const fn remove_diacritics(self) -> bool {
        self.remove_diacritics
    }

    /// Whether indexed text is ASCII case-folded.
    #[must_use]
    pub const fn folds_case(self) -> bool {
        !self.case_sensitive
    }

    /// Whether combining marks are elided and precomposed letters reduced
    /// to their base letter.
    #[must_use]
    pub const fn strips_diacritics(self) -> bool {
        self.remove_diacritics
    }
}

/// Option values are exactly one character, `0` or `1`.
fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}

/// Split a `tokenize=` option into the tokenizer name and its arguments.
///
/// Accepts the value bare or wrapped in single or double quotes:
/// `better_trigram`, `'better_trigram case_sensitive 1'`.
/// Returns `None` when the option names no tokenizer.
#[must_use]
pub fn parse_tokenize_spec(spec: &str) -> Option<(&str, Vec<&str>)> {
    let mut words = unquote(spec).split_ascii_whitespace();
    let name = words.next()?;
    Some((name, words.collect()))
}

/// Strip surrounding whitespace and one pair of matching single or double
/// quotes.
#[must_use]
pub fn unquote(value: &str) -> &str {
    let trimmed = value.trim();
    ['\'', '"']
        .iter()
        .find_map(|&q| {
            trimmed
                .strip_prefix(q)
                .and_then(|rest| rest.strip_suffix(q))
        })
        .unwrap_or(trimmed)
}
