//! Matcher configuration.
//!
//! [`MatchingConfig`] can be built directly or from a flat list of key/value
//! options, the way command-line front ends pass them through:
//!
//! | key | value | default |
//! |---|---|---|
//! | `bu_minsim` | bottom-up similarity threshold in `[0, 1]` | adaptive |
//! | `st_minprio` | minimum top-down subtree height, `>= 1` | `1` |
//! | `tk_mode` | `off`, `strict` or `relaxed` | `strict` |
//! | `mv_suppress` | role-based move suppression | `true` |
//! | `mv_overlay` | token-overlay move suppression | `false` |

use alloc::string::{String, ToString};

use crate::error::ConfigError;

/// Which token recovery pass runs after structural matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TokenRecovery {
    /// No token recovery.
    Off,
    /// Pair unmapped leaves with identical type and label.
    #[default]
    Strict,
    /// Strict pairing, then a label-agnostic re-pairing of every leaf that
    /// only rewrites the overlay.
    Relaxed,
}

/// Configuration for the matching algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    /// Minimum Dice coefficient for bottom-up matching.
    /// `None` selects the adaptive threshold `1 / (1 + ln(n))`.
    pub similarity_threshold: Option<f64>,

    /// Minimum height for a subtree to be considered in top-down matching.
    /// Leaves have height 1.
    pub min_height: usize,

    /// Token recovery variant.
    pub token_recovery: TokenRecovery,

    /// Suppress moves that only reflect a symmetric repositioning.
    pub suppress_moves: bool,

    /// Also suppress moves whose source node is paired in the token overlay.
    pub overlay_suppression: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: None,
            min_height: 1,
            token_recovery: TokenRecovery::Strict,
            suppress_moves: true,
            overlay_suppression: false,
        }
    }
}

const BU_MINSIM: &str = "bu_minsim";
const ST_MINPRIO: &str = "st_minprio";
const TK_MODE: &str = "tk_mode";
const MV_SUPPRESS: &str = "mv_suppress";
const MV_OVERLAY: &str = "mv_overlay";

impl MatchingConfig {
    /// Every option key understood by [`MatchingConfig::set_option`].
    pub const OPTIONS: &'static [&'static str] =
        &[BU_MINSIM, ST_MINPRIO, TK_MODE, MV_SUPPRESS, MV_OVERLAY];

    /// Build a configuration from key/value options applied over the defaults.
    pub fn from_options<I, K, V>(options: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in options {
            config.set_option(key.as_ref(), value.as_ref())?;
        }
        Ok(config)
    }

    /// Apply a single key/value option.
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match key {
            BU_MINSIM => {
                let threshold: f64 = value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: BU_MINSIM,
                    value: value.to_string(),
                    expected: "a number",
                })?;
                if !(0.0..=1.0).contains(&threshold) {
                    return Err(ConfigError::OutOfRange {
                        key: BU_MINSIM,
                        value: value.to_string(),
                        range: "[0, 1]",
                    });
                }
                self.similarity_threshold = Some(threshold);
            }
            ST_MINPRIO => {
                let height: usize = value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: ST_MINPRIO,
                    value: value.to_string(),
                    expected: "a positive integer",
                })?;
                if height == 0 {
                    return Err(ConfigError::OutOfRange {
                        key: ST_MINPRIO,
                        value: value.to_string(),
                        range: ">= 1",
                    });
                }
                self.min_height = height;
            }
            TK_MODE => {
                self.token_recovery = match value {
                    "off" => TokenRecovery::Off,
                    "strict" => TokenRecovery::Strict,
                    "relaxed" => TokenRecovery::Relaxed,
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            key: TK_MODE,
                            value: value.to_string(),
                            expected: "one of `off`, `strict`, `relaxed`",
                        });
                    }
                };
            }
            MV_SUPPRESS => self.suppress_moves = parse_bool(MV_SUPPRESS, value)?,
            MV_OVERLAY => self.overlay_suppression = parse_bool(MV_OVERLAY, value)?,
            _ => {
                return Err(ConfigError::UnknownOption {
                    key: key.to_string(),
                    suggestion: suggest_option(key),
                });
            }
        }
        Ok(())
    }

    /// Check a configuration built by hand.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(threshold) = self.similarity_threshold
            && !(0.0..=1.0).contains(&threshold)
        {
            return Err(ConfigError::OutOfRange {
                key: BU_MINSIM,
                value: threshold.to_string(),
                range: "[0, 1]",
            });
        }
        if self.min_height == 0 {
            return Err(ConfigError::OutOfRange {
                key: ST_MINPRIO,
                value: String::from("0"),
                range: ">= 1",
            });
        }
        Ok(())
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            expected: "a boolean",
        }),
    }
}

/// Closest known option for a misspelled key.
fn suggest_option(unknown: &str) -> Option<&'static str> {
    const SIMILARITY_THRESHOLD: f64 = 0.6;

    let mut best_match: Option<(&'static str, f64)> = None;
    for &known in MatchingConfig::OPTIONS {
        let similarity = strsim::jaro_winkler(unknown, known);
        if similarity >= SIMILARITY_THRESHOLD
            && best_match.is_none_or(|(_, best_sim)| similarity > best_sim)
        {
            best_match = Some((known, similarity));
        }
    }
    best_match.map(|(known, _)| known)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MatchingConfig::from_options(Vec::<(&str, &str)>::new()).unwrap();
        assert_eq!(config, MatchingConfig::default());
        assert_eq!(config.similarity_threshold, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_options() {
        let config = MatchingConfig::from_options([
            ("bu_minsim", "0.4"),
            ("st_minprio", "2"),
            ("tk_mode", "relaxed"),
            ("mv_suppress", "false"),
            ("mv_overlay", "yes"),
        ])
        .unwrap();

        assert_eq!(config.similarity_threshold, Some(0.4));
        assert_eq!(config.min_height, 2);
        assert_eq!(config.token_recovery, TokenRecovery::Relaxed);
        assert!(!config.suppress_moves);
        assert!(config.overlay_suppression);
    }

    #[test]
    fn test_rejects_bad_options() {
        let err = MatchingConfig::from_options([("bu_minsin", "0.5")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownOption {
                key: "bu_minsin".to_string(),
                suggestion: Some("bu_minsim"),
            }
        );

        let err = MatchingConfig::from_options([("bu_minsim", "1.5")]).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { key: "bu_minsim", .. }));

        let err = MatchingConfig::from_options([("st_minprio", "tall")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "st_minprio", .. }));

        let err = MatchingConfig::from_options([("st_minprio", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));

        let err = MatchingConfig::from_options([("tk_mode", "fuzzy")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "tk_mode", .. }));

        let err = MatchingConfig::from_options([("zzz", "1")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownOption {
                suggestion: None,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_hand_built() {
        let config = MatchingConfig {
            similarity_threshold: Some(f64::NAN),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MatchingConfig {
            min_height: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
