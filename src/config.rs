//! Application configuration
//!
//! This module holds the recognized configuration options that control how
//! bean validation is attached to input components and whether whole-bean
//! validation candidates are collected.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::{DISABLE_DEFAULT_BEAN_VALIDATOR_PARAM_NAME, ENABLE_VALIDATE_WHOLE_BEAN_PARAM_NAME};

/// Application-wide validation settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Settings {
    /// Do not attach the bean validator to every input component
    pub disable_default_validator: bool,

    /// Collect per-field results so whole-bean validation can run
    pub enable_whole_bean: bool,
}

impl Settings {
    /// Create settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether default validator attachment is disabled
    pub fn with_disable_default_validator(mut self, disable: bool) -> Self {
        self.disable_default_validator = disable;
        self
    }

    /// Set whether whole-bean validation is enabled
    pub fn with_enable_whole_bean(mut self, enable: bool) -> Self {
        self.enable_whole_bean = enable;
        self
    }

    /// Build settings from application init parameters
    ///
    /// Unknown parameters are ignored. A recognized parameter whose value is
    /// not a boolean is a configuration error.
    pub fn from_init_params(params: &HashMap<String, String>) -> Result<Self> {
        Self::default().merge_init_params(params)
    }

    /// Overlay init parameters on top of these settings
    pub fn merge_init_params(mut self, params: &HashMap<String, String>) -> Result<Self> {
        if let Some(value) = params.get(DISABLE_DEFAULT_BEAN_VALIDATOR_PARAM_NAME) {
            self.disable_default_validator =
                parse_bool(DISABLE_DEFAULT_BEAN_VALIDATOR_PARAM_NAME, value)?;
        }
        if let Some(value) = params.get(ENABLE_VALIDATE_WHOLE_BEAN_PARAM_NAME) {
            self.enable_whole_bean = parse_bool(ENABLE_VALIDATE_WHOLE_BEAN_PARAM_NAME, value)?;
        }
        Ok(self)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(Error::Configuration(format!(
            "Invalid value '{}' for init parameter '{}'. Must be 'true' or 'false'",
            value, name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(!settings.disable_default_validator);
        assert!(!settings.enable_whole_bean);
    }

    #[test]
    fn test_from_init_params() {
        let settings = Settings::from_init_params(&params(&[
            (ENABLE_VALIDATE_WHOLE_BEAN_PARAM_NAME, " TRUE "),
            ("unrelated.param", "whatever"),
        ]))
        .unwrap();
        assert!(settings.enable_whole_bean);
        assert!(!settings.disable_default_validator);
    }

    #[test]
    fn test_invalid_boolean() {
        let err = Settings::from_init_params(&params(&[(
            DISABLE_DEFAULT_BEAN_VALIDATOR_PARAM_NAME,
            "yes",
        )]))
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_merge_overrides_json_values() {
        let settings: Settings = serde_json::from_str(r#"{"enable_whole_bean": true}"#).unwrap();
        let merged = settings
            .merge_init_params(&params(&[(ENABLE_VALIDATE_WHOLE_BEAN_PARAM_NAME, "false")]))
            .unwrap();
        assert!(!merged.enable_whole_bean);
    }
}
