//! Admin configuration
//!
//! Loaded from a JSON file. Every field has a default, so `{}` is a valid
//! configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::workflow::RedirectStatus;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Admin configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Directory holding the stage journal (default: "data")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Audit log file; no audit log when absent
    #[serde(default)]
    pub audit_log: Option<PathBuf>,

    /// Redirect status after a delete (default: 303)
    #[serde(default = "default_delete_redirect_status")]
    pub delete_redirect_status: RedirectStatus,

    /// Lowest severity written by the logger (default: INFO)
    #[serde(default = "default_min_log_severity")]
    pub min_log_severity: Severity,

    /// `stage` query value of preview links (default: "Stage")
    #[serde(default = "default_preview_stage_param")]
    pub preview_stage_param: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_delete_redirect_status() -> RedirectStatus {
    RedirectStatus::SeeOther
}

fn default_min_log_severity() -> Severity {
    Severity::Info
}

fn default_preview_stage_param() -> String {
    "Stage".to_string()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            audit_log: None,
            delete_redirect_status: default_delete_redirect_status(),
            min_log_severity: default_min_log_severity(),
            preview_stage_param: default_preview_stage_param(),
        }
    }
}

impl AdminConfig {
    /// Config rooted at `data_dir`, all other fields default.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Load and validate configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&content)?;

        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("data_dir", &config.data_dir.display().to_string()),
                ("path", &path.display().to_string()),
            ],
        );
        Ok(config)
    }

    /// Parse and validate configuration JSON
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: AdminConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("data_dir must not be empty".into()));
        }

        if let Some(ref audit_log) = self.audit_log {
            if audit_log.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("audit_log must not be empty".into()));
            }
        }

        if self.preview_stage_param.is_empty()
            || !self
                .preview_stage_param
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::Invalid(format!(
                "preview_stage_param must be a plain token, got '{}'",
                self.preview_stage_param
            )));
        }

        Ok(())
    }

    /// Applies the logging settings process-wide.
    pub fn apply_logging(&self) {
        Logger::set_min_severity(self.min_log_severity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = AdminConfig::from_json("{}").unwrap();
        assert_eq!(config, AdminConfig::default());
        assert_eq!(config.delete_redirect_status, RedirectStatus::SeeOther);
        assert_eq!(config.min_log_severity, Severity::Info);
        assert_eq!(config.preview_stage_param, "Stage");
    }

    #[test]
    fn test_overrides() {
        let config = AdminConfig::from_json(
            r#"{
                "data_dir": "/var/lib/admin",
                "audit_log": "/var/log/admin/audit.log",
                "delete_redirect_status": 302,
                "min_log_severity": "WARN"
            }"#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/admin"));
        assert_eq!(config.delete_redirect_status, RedirectStatus::Found);
        assert_eq!(config.min_log_severity, Severity::Warn);
    }

    #[test]
    fn test_rejects_unknown_redirect_status() {
        let err = AdminConfig::from_json(r#"{"delete_redirect_status": 307}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_bad_preview_param() {
        let err = AdminConfig::from_json(r#"{"preview_stage_param": "a&b"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = AdminConfig::from_json(r#"{"data_dir": ""}"#).unwrap_err();
        assert!(err.to_string().contains("data_dir"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("admin.json");
        fs::write(&path, r#"{"preview_stage_param": "Draft"}"#).unwrap();

        let config = AdminConfig::load(&path).unwrap();
        assert_eq!(config.preview_stage_param, "Draft");

        let missing = AdminConfig::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }
}
