//! Session configuration.

use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::keys::KeyBindings;

/// Content installed when the region would otherwise be empty.
pub const DEFAULT_PLACEHOLDER: &str = "<br>";

/// Error type for configuration handed in by a host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid retype configuration: {0}")]
    Invalid(String),
}

/// Per-session settings. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetypeConfig {
    /// Maximum number of history snapshots kept.
    pub history_limit: usize,
    /// Markup written instead of empty content.
    pub placeholder: String,
    /// Force macOS shortcuts on or off; detected by the host when unset.
    pub mac: Option<bool>,
}

impl Default for RetypeConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            mac: None,
        }
    }
}

impl RetypeConfig {
    /// Reject settings the session cannot honour.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.history_limit == 0 {
            return Err(ConfigError::Invalid(
                "historyLimit must be at least 1".into(),
            ));
        }
        if self.placeholder.is_empty() {
            return Err(ConfigError::Invalid("placeholder must not be empty".into()));
        }
        Ok(self)
    }

    /// Key bindings, using `detected_mac` unless the config overrides it.
    pub fn bindings(&self, detected_mac: bool) -> KeyBindings {
        KeyBindings::for_platform(self.mac.unwrap_or(detected_mac))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RetypeConfig::default();
        assert_eq!(config.history_limit, 100);
        assert_eq!(config.placeholder, "<br>");
        assert!(config.clone().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_limit() {
        let config = RetypeConfig {
            history_limit: 0,
            ..RetypeConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_mac_override() {
        let config = RetypeConfig {
            mac: Some(false),
            ..RetypeConfig::default()
        };
        assert!(!config.bindings(true).mac);
        assert!(RetypeConfig::default().bindings(true).mac);
    }
}
