//! Configuration for strategies and locked vaults
//!
//! Both configs deserialize from JSON and are validated before an instance
//! is built from them.

use serde::{Deserialize, Serialize};
use types::time::{Seconds, DAY};

use crate::errors::ConfigError;

/// Delay before a proposed buffer account takes over.
pub const BUFFER_CHANGE_COOLDOWN: Seconds = 14 * DAY;

/// Rage-quit cooldown applied at initialization.
pub const DEFAULT_RAGE_QUIT_COOLDOWN_PERIOD: Seconds = 7 * DAY;
/// Shortest allowed rage-quit cooldown.
pub const RANGE_MINIMUM_RAGE_QUIT_COOLDOWN_PERIOD: Seconds = DAY;
/// Longest allowed rage-quit cooldown.
pub const RANGE_MAXIMUM_RAGE_QUIT_COOLDOWN_PERIOD: Seconds = 30 * DAY;
/// Grace window between proposing and applying a new cooldown.
pub const RAGE_QUIT_COOLDOWN_CHANGE_DELAY: Seconds = 14 * DAY;

/// Strategy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Display name
    pub name: String,
    /// Whether buffer shares are burned to absorb losses
    pub enable_burning: bool,
    /// Grace window for buffer account migration
    pub buffer_change_cooldown: Seconds,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            name: "Yield Skimming Strategy".to_string(),
            enable_burning: true,
            buffer_change_cooldown: BUFFER_CHANGE_COOLDOWN,
        }
    }
}

impl StrategyConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "name",
                reason: "must not be empty".to_string(),
            });
        }
        if self.buffer_change_cooldown <= 0 {
            return Err(ConfigError::Invalid {
                field: "buffer_change_cooldown",
                reason: format!("must be positive, got {}", self.buffer_change_cooldown),
            });
        }
        Ok(())
    }
}

/// Locked vault configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockedVaultConfig {
    /// Cooldown active at initialization
    pub initial_cooldown_period: Seconds,
    /// Grace window for cooldown changes
    pub cooldown_change_delay: Seconds,
}

impl Default for LockedVaultConfig {
    fn default() -> Self {
        Self {
            initial_cooldown_period: DEFAULT_RAGE_QUIT_COOLDOWN_PERIOD,
            cooldown_change_delay: RAGE_QUIT_COOLDOWN_CHANGE_DELAY,
        }
    }
}

impl LockedVaultConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !cooldown_in_range(self.initial_cooldown_period) {
            return Err(ConfigError::Invalid {
                field: "initial_cooldown_period",
                reason: format!(
                    "must lie in [{}, {}] seconds, got {}",
                    RANGE_MINIMUM_RAGE_QUIT_COOLDOWN_PERIOD,
                    RANGE_MAXIMUM_RAGE_QUIT_COOLDOWN_PERIOD,
                    self.initial_cooldown_period
                ),
            });
        }
        if self.cooldown_change_delay <= 0 {
            return Err(ConfigError::Invalid {
                field: "cooldown_change_delay",
                reason: format!("must be positive, got {}", self.cooldown_change_delay),
            });
        }
        Ok(())
    }
}

/// Whether `period` is an acceptable rage-quit cooldown.
pub fn cooldown_in_range(period: Seconds) -> bool {
    (RANGE_MINIMUM_RAGE_QUIT_COOLDOWN_PERIOD..=RANGE_MAXIMUM_RAGE_QUIT_COOLDOWN_PERIOD).contains(&period)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_defaults() {
        let config = StrategyConfig::default();
        assert!(config.enable_burning);
        assert_eq!(config.buffer_change_cooldown, 14 * DAY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strategy_from_partial_json() {
        let config = StrategyConfig::from_json(r#"{"name":"sDAI skimmer","enable_burning":false}"#).unwrap();
        assert_eq!(config.name, "sDAI skimmer");
        assert!(!config.enable_burning);
        assert_eq!(config.buffer_change_cooldown, BUFFER_CHANGE_COOLDOWN);
    }

    #[test]
    fn test_strategy_rejects_empty_name() {
        let err = StrategyConfig::from_json(r#"{"name":"  "}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "name", .. }));
    }

    #[test]
    fn test_strategy_rejects_malformed_json() {
        assert!(matches!(
            StrategyConfig::from_json("{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_locked_defaults() {
        let config = LockedVaultConfig::default();
        assert_eq!(config.initial_cooldown_period, 7 * DAY);
        assert_eq!(config.cooldown_change_delay, 14 * DAY);
    }

    #[test]
    fn test_locked_rejects_out_of_range_cooldown() {
        let json = format!(r#"{{"initial_cooldown_period":{}}}"#, 31 * DAY);
        let err = LockedVaultConfig::from_json(&json).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "initial_cooldown_period", .. }));
    }

    #[test]
    fn test_cooldown_range_bounds() {
        assert!(cooldown_in_range(DAY));
        assert!(cooldown_in_range(30 * DAY));
        assert!(!cooldown_in_range(DAY - 1));
        assert!(!cooldown_in_range(30 * DAY + 1));
    }
}
