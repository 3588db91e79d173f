use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MacError, MacResult};
use crate::types::{LogFormat, ResolutionMode};

/// Provider configuration (loaded from macprov.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Cipher resolution mode: "standard" or "restricted"
    pub mode: ResolutionMode,
    /// Property query applied underneath every per-call query
    pub default_properties: Option<String>,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
        }
    }
}

impl ProviderConfig {
    pub fn restricted() -> Self {
        Self {
            mode: ResolutionMode::Restricted,
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> MacResult<Self> {
        toml::from_str(content).map_err(|e| MacError::Config(format!("parsing config: {e}")))
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> MacResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))
            .map_err(|e| MacError::Config(format!("{e:#}")))?;
        toml::from_str(&content)
            .map_err(|e| MacError::Config(format!("parsing config {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
mode = "restricted"
default_properties = "fips=yes"

[log]
level = "debug"
format = "json"
"#;
        let config = ProviderConfig::from_toml_str(toml_str).unwrap();

        assert_eq!(config.mode, ResolutionMode::Restricted);
        assert_eq!(config.default_properties.as_deref(), Some("fips=yes"));
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn test_parse_defaults() {
        let config = ProviderConfig::from_toml_str("").unwrap();

        assert_eq!(config.mode, ResolutionMode::Standard);
        assert!(config.default_properties.is_none());
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, LogFormat::Text);
    }

    #[test]
    fn test_parse_rejects_unknown_mode() {
        let result = ProviderConfig::from_toml_str(r#"mode = "permissive""#);
        assert!(matches!(result, Err(MacError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("macprov.toml");
        std::fs::write(&path, "mode = \"restricted\"\n").unwrap();

        let config = ProviderConfig::load(&path).unwrap();
        assert_eq!(config.mode, ResolutionMode::Restricted);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProviderConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.mode, ResolutionMode::Standard);
    }

    #[test]
    fn test_parse_rejects_unknown_log_format() {
        let result = ProviderConfig::from_toml_str("[log]\nformat = \"xml\"\n");
        assert!(matches!(result, Err(MacError::Config(_))));
    }

    #[test]
    fn test_unreadable_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        // exists, but reading a directory fails
        let err = ProviderConfig::load(dir.path()).unwrap_err();
        match err {
            MacError::Config(msg) => assert!(msg.starts_with("reading config")),
            other => panic!("expected a config error, got {other:?}"),
        }
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = ProviderConfig::restricted();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = ProviderConfig::from_toml_str(&toml_str).unwrap();

        assert_eq!(parsed.mode, config.mode);
        assert_eq!(parsed.log.level, config.log.level);
        assert_eq!(parsed.log.format, config.log.format);
    }
}
