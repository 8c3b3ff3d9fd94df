/*!
 * Configuration types for Driftguard
 */

use crate::error::{DriftguardError, Result};
use driftguard_sentinel::SentinelConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Process configuration, loaded from a TOML file
///
/// Every field has a default, so an empty file is a valid configuration.
///
/// ```toml
/// log_level = "debug"
///
/// [sentinel]
/// scan_interval_s = 600
/// max_parallel_scans = 4
/// call_timeout_s = 30
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftguardConfig {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Write JSON logs to this file instead of the console
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Verbose output (forces debug level)
    #[serde(default)]
    pub verbose: bool,

    /// Scan loop settings
    #[serde(default)]
    pub sentinel: SentinelConfig,
}

impl DriftguardConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| DriftguardError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;
        let config: DriftguardConfig = toml::from_str(&contents).map_err(|e| {
            DriftguardError::Config(format!("{}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| DriftguardError::Config(format!("Failed to encode config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.sentinel.validate().map_err(DriftguardError::Config)
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_values() {
        let config = DriftguardConfig::default();
        assert_eq!(config.sentinel, SentinelConfig::default());
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.log_file, None);
        assert!(!config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_is_default() {
        let config: DriftguardConfig = toml::from_str("").unwrap();
        assert_eq!(config, DriftguardConfig::default());
    }

    #[test]
    fn test_partial_sentinel_table() {
        let toml_str = r#"
            log_level = "debug"

            [sentinel]
            max_parallel_scans = 4
            call_timeout_s = 30
        "#;

        let config: DriftguardConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.sentinel.max_parallel_scans, 4);
        assert_eq!(config.sentinel.call_timeout_s, Some(30));
        assert_eq!(config.sentinel.scan_interval_s, 1800); // Default
    }

    #[test]
    fn test_file_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let config = DriftguardConfig {
            log_level: LogLevel::Warn,
            log_file: Some(PathBuf::from("/var/log/driftguard.json")),
            verbose: true,
            sentinel: SentinelConfig::with_interval(120),
        };

        config.to_file(file.path()).unwrap();
        let loaded = DriftguardConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[sentinel]\nscan_interval_s = \"soon\"\n").unwrap();

        let err = DriftguardConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, DriftguardError::Config(_)));

        let err = DriftguardConfig::from_file(Path::new("/nonexistent/driftguard.toml")).unwrap_err();
        assert!(matches!(err, DriftguardError::ReadFile { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_sentinel_settings() {
        let mut config = DriftguardConfig::default();
        config.sentinel.scan_interval_s = 0;
        assert!(matches!(config.validate(), Err(DriftguardError::Config(_))));
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
        assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
    }
}
