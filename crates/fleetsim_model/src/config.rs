use std::path::Path;
use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config root must be a JSON object")]
    NotAnObject,
}

/// Flat key/value simulation settings loaded from a JSON file.
///
/// Every lookup carries a default so a partial (or empty) file is always
/// usable. Unknown keys are ignored, missing keys fall back with a warning
/// only when the stored value has the wrong type.
#[derive(Debug, Clone, Default)]
pub struct SimConfig {
    values: Map<String, Value>,
}

impl SimConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        raw.parse()
    }

    pub fn f64_or(&self, key: &str, default: f64) -> f64 {
        match self.values.get(key) {
            Some(value) => value.as_f64().unwrap_or_else(|| {
                warn!(key, %value, "expected a number, using default");
                default
            }),
            None => default,
        }
    }

    pub fn u64_or(&self, key: &str, default: u64) -> u64 {
        match self.values.get(key) {
            Some(value) => value.as_u64().unwrap_or_else(|| {
                warn!(key, %value, "expected an unsigned integer, using default");
                default
            }),
            None => default,
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            Some(value) => value.as_bool().unwrap_or_else(|| {
                warn!(key, %value, "expected a boolean, using default");
                default
            }),
            None => default,
        }
    }

    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.values.get(key) {
            Some(value) => value.as_str().unwrap_or_else(|| {
                warn!(key, %value, "expected a string, using default");
                default
            }),
            None => default,
        }
    }
}

impl FromStr for SimConfig {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value: Value = serde_json::from_str(raw)?;
        match value {
            Value::Object(values) => Ok(Self { values }),
            _ => Err(ConfigError::NotAnObject),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_lookups_with_defaults() {
        let config: SimConfig =
            r#"{ "tick_seconds": 0.5, "optimizer_iterations": 2000, "parallel": true, "scenario": "demo" }"#
                .parse()
                .unwrap();

        assert_eq!(config.f64_or("tick_seconds", 1.0), 0.5);
        assert_eq!(config.u64_or("optimizer_iterations", 500), 2000);
        assert!(config.bool_or("parallel", false));
        assert_eq!(config.str_or("scenario", "default"), "demo");

        assert_eq!(config.f64_or("missing", 1.25), 1.25);
        assert_eq!(config.str_or("missing", "fallback"), "fallback");
    }

    #[test]
    fn test_wrong_type_falls_back() {
        let config: SimConfig = r#"{ "tick_seconds": "fast" }"#.parse().unwrap();
        assert_eq!(config.f64_or("tick_seconds", 1.0), 1.0);
    }

    #[test]
    fn test_rejects_non_object_root() {
        assert!(matches!(
            "[1, 2, 3]".parse::<SimConfig>(),
            Err(ConfigError::NotAnObject)
        ));
    }
}
