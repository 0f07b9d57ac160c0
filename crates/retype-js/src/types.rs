//! Types exposed to JavaScript via wasm-bindgen.

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;

use retype_core::RetypeConfig;

/// Options accepted by `retype()`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(default, rename_all = "camelCase")]
pub struct JsRetypeConfig {
    /// Maximum number of undo snapshots (default 100).
    #[tsify(optional)]
    pub history_limit: Option<usize>,
    /// Markup written when content becomes empty (default `<br>`).
    #[tsify(optional)]
    pub placeholder: Option<String>,
    /// Force Cmd (`true`) or Ctrl (`false`) shortcuts instead of detecting.
    #[tsify(optional)]
    pub mac: Option<bool>,
}

impl JsRetypeConfig {
    /// Parse a config argument; `undefined` and `null` give the defaults.
    pub fn from_js_config(value: JsValue) -> Result<Self, JsError> {
        if value.is_undefined() || value.is_null() {
            return Ok(Self::default());
        }
        serde_wasm_bindgen::from_value(value)
            .map_err(|e| JsError::new(&format!("Invalid retype config: {}", e)))
    }
}

impl From<JsRetypeConfig> for RetypeConfig {
    fn from(config: JsRetypeConfig) -> Self {
        let defaults = RetypeConfig::default();
        RetypeConfig {
            history_limit: config.history_limit.unwrap_or(defaults.history_limit),
            placeholder: config.placeholder.unwrap_or(defaults.placeholder),
            mac: config.mac,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = RetypeConfig::from(JsRetypeConfig {
            history_limit: Some(5),
            ..JsRetypeConfig::default()
        });
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.placeholder, "<br>");
        assert_eq!(config.mac, None);
    }
}
