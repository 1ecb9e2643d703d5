//! Generator configuration.
//!
//! Values come from defaults, then the environment (a `.env` file is loaded
//! first when present), then command-line flags.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::logs::{LogLevel, LOG_LEVEL_ENV};

pub const SPEC_NAME_ENV: &str = "QSPEC_SPEC_NAME";
pub const SPEC_VERSION_ENV: &str = "QSPEC_SPEC_VERSION";
pub const SCHEMA_ENV: &str = "QSPEC_SCHEMA";

pub const DEFAULT_SPEC_NAME: &str = "TC Insight Spec";
pub const DEFAULT_SPEC_VERSION: &str = "2.0.0";

/// Options for a generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Spec name (`n`)
    pub name: String,

    /// Spec version (`v`), `MAJOR.MINOR.PATCH`
    pub version: String,

    /// Free-form notes copied into the document
    pub notes: Vec<String>,

    /// Schema file replacing the embedded schema
    pub schema_path: Option<PathBuf>,

    /// Pretty-print the exported JSON
    pub pretty: bool,

    pub log_level: LogLevel,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SPEC_NAME.to_string(),
            version: DEFAULT_SPEC_VERSION.to_string(),
            notes: Vec::new(),
            schema_path: None,
            pretty: true,
            log_level: LogLevel::Warning,
        }
    }
}

impl GeneratorConfig {
    /// Defaults overridden by `QSPEC_*` variables. Loads `.env` if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns; blank values are ignored.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(name) = get(SPEC_NAME_ENV) {
            config.name = name;
        }
        if let Some(version) = get(SPEC_VERSION_ENV) {
            config.version = version.trim().to_string();
        }
        if let Some(schema) = get(SCHEMA_ENV) {
            config.schema_path = Some(PathBuf::from(schema));
        }
        if let Some(level) = get(LOG_LEVEL_ENV).and_then(|v| v.parse().ok()) {
            config.log_level = level;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.name, "TC Insight Spec");
        assert_eq!(config.version, "2.0.0");
        assert!(config.pretty);
        assert!(config.schema_path.is_none());
    }

    #[test]
    fn test_lookup_overrides() {
        let env: HashMap<&str, &str> = [
            ("QSPEC_SPEC_NAME", "Retail audit"),
            ("QSPEC_SPEC_VERSION", " 2.1.0 "),
            ("QSPEC_SCHEMA", "schemas/custom.json"),
            ("QSPEC_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();
        let config = GeneratorConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.name, "Retail audit");
        assert_eq!(config.version, "2.1.0");
        assert_eq!(config.schema_path, Some(PathBuf::from("schemas/custom.json")));
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_blank_and_invalid_values_ignored() {
        let config = GeneratorConfig::from_lookup(|k| match k {
            "QSPEC_SPEC_NAME" => Some("   ".to_string()),
            "QSPEC_LOG_LEVEL" => Some("chatty".to_string()),
            _ => None,
        });
        assert_eq!(config, GeneratorConfig::default());
    }
}
