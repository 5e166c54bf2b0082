//! Gateway config file
//!
//! A GatewayConfig is created from a TOML file, and selects the platform profile a gateway runs
//! with, along with optional overrides and the rules to seed an empty rule table with.
//!
//! # An example TOML file
//!
//! ```toml
//! platform = "samd51"
//!
//! # Optional: limit the rule table below the platform capacity
//! max_rules = 32
//!
//! # Optional: pins used by board wiring, in addition to the platform's reserved pins
//! reserved_pins = [10, 11]
//!
//! # Optional: installed when persisted storage holds no rules
//! default_rules = [
//!     "0:0x100:0x7FF:::0:GPIO_TOGGLE:fixed:13",
//!     "0:0x200:0x7FF:::0:NEOPIXEL:candata",
//! ]
//! ```
use defmt_or_log::debug;
use serde::Deserialize;
use snafu::ResultExt as _;
use snafu::Snafu;

use crate::error::RuleParseError;
use crate::platform::PlatformProfile;
use crate::rule::{parse_rule, ActionRule};

/// Error returned when loading a gateway config fails
#[derive(Debug, Snafu)]
pub enum LoadError {
    /// An IO error occured while reading the file
    #[snafu(display("IO error: {source}"))]
    Io {
        /// The underlying IO error
        source: std::io::Error,
    },
    /// An error occured in the TOML parser
    #[snafu(display("Toml parse error: {source}"))]
    TomlParsing {
        /// The toml error which led to this error
        source: toml::de::Error,
    },
    /// The platform name is not one of the built-in profiles
    #[snafu(display("Unknown platform '{name}' (allowed: 'rp2040', 'samd51', 'esp32')"))]
    UnknownPlatform {
        /// The name given
        name: String,
    },
    /// A default rule failed to parse
    #[snafu(display("Invalid default rule {index}: {source}"))]
    InvalidDefaultRule {
        /// Position in the `default_rules` list
        index: usize,
        /// What was wrong with it
        source: RuleParseError,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    platform: String,
    max_rules: Option<u8>,
    #[serde(default)]
    reserved_pins: Vec<u8>,
    #[serde(default)]
    default_rules: Vec<String>,
}

/// Startup configuration for a gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// The selected board profile, with any `max_rules` override applied
    pub platform: PlatformProfile,
    /// Pins to reserve in addition to the profile's own
    pub reserved_pins: Vec<u8>,
    /// Parsed seed rules, in file order
    pub default_rules: Vec<ActionRule>,
}

impl GatewayConfig {
    /// Try to read a gateway config from a file
    pub fn load(config_path: impl AsRef<std::path::Path>) -> Result<Self, LoadError> {
        let config_str = std::fs::read_to_string(&config_path).context(IoSnafu)?;
        Self::load_from_str(&config_str)
    }

    /// Try to read a config from a &str
    pub fn load_from_str(config_str: &str) -> Result<Self, LoadError> {
        let raw: RawConfig = toml::from_str(config_str).context(TomlParsingSnafu)?;

        let name = raw.platform.to_lowercase();
        let mut platform = match PlatformProfile::by_name(&name) {
            Some(p) => p,
            None => return UnknownPlatformSnafu { name }.fail(),
        };
        if let Some(max_rules) = raw.max_rules {
            platform.max_rules = max_rules.min(platform.max_rules);
        }

        let default_rules = raw
            .default_rules
            .iter()
            .enumerate()
            .map(|(index, text)| parse_rule(text).context(InvalidDefaultRuleSnafu { index }))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Loaded config for {} with {} default rules",
            platform.board_name,
            default_rules.len()
        );

        Ok(GatewayConfig {
            platform,
            reserved_pins: raw.reserved_pins,
            default_rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Action;
    use assertables::assert_contains;

    #[test]
    fn test_load_minimal() {
        let config = GatewayConfig::load_from_str(r#"platform = "RP2040""#).unwrap();
        assert_eq!(PlatformProfile::RP2040, config.platform);
        assert!(config.reserved_pins.is_empty());
        assert!(config.default_rules.is_empty());
    }

    #[test]
    fn test_load_full() {
        const TOML: &str = r#"
            platform = "samd51"
            max_rules = 8
            reserved_pins = [10, 11]
            default_rules = [
                "0:0x100:0x7FF:::0:GPIO_TOGGLE:fixed:13",
                "7:0x200:0x7FF:::0:NEOPIXEL:candata",
            ]
        "#;
        let config = GatewayConfig::load_from_str(TOML).unwrap();
        assert_eq!(8, config.platform.max_rules);
        assert_eq!(vec![10, 11], config.reserved_pins);
        assert_eq!(2, config.default_rules.len());
        assert_eq!(Action::GpioToggle { pin: 13 }, config.default_rules[0].action);
        assert_eq!(7, config.default_rules[1].id);
    }

    #[test]
    fn test_max_rules_cannot_exceed_platform() {
        let config =
            GatewayConfig::load_from_str("platform = \"rp2040\"\nmax_rules = 200").unwrap();
        assert_eq!(16, config.platform.max_rules);
    }

    #[test]
    fn test_unknown_platform() {
        let err = GatewayConfig::load_from_str(r#"platform = "avr""#).unwrap_err();
        assert!(matches!(err, LoadError::UnknownPlatform { .. }));
        assert_contains!(err.to_string(), "Unknown platform 'avr'");
    }

    #[test]
    fn test_invalid_default_rule() {
        const TOML: &str = r#"
            platform = "esp32"
            default_rules = ["0:0x100:0x7FF:::0:GPIO_TOGGLE:fixed:13", "0:0x100"]
        "#;
        let err = GatewayConfig::load_from_str(TOML).unwrap_err();
        assert!(matches!(
            err,
            LoadError::InvalidDefaultRule {
                index: 1,
                source: RuleParseError::TooFewFields
            }
        ));
    }

    #[test]
    fn test_toml_error() {
        let err = GatewayConfig::load_from_str("platform = ").unwrap_err();
        assert!(matches!(err, LoadError::TomlParsing { .. }));
    }
}
