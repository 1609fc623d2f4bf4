use crate::error::{MirrorError, Result};
use crate::mirror::MirrorOptions;
use serde::{Deserialize, Serialize};
use sitemirror_scanner::FailurePolicy;
use std::fs;
use std::path::{Path, PathBuf};

/// File-backed settings for a mirror run. Command-line flags take precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Site root to mirror
    #[serde(default)]
    pub base_url: Option<String>,

    /// Where the mirrored tree is written; `~` is expanded
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Maximum number of concurrent fetches, and of concurrent file writes
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_output_dir() -> String {
    "~/Documents/sitemirror".to_string()
}

fn default_max_in_flight() -> usize {
    16
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            output_dir: default_output_dir(),
            max_in_flight: default_max_in_flight(),
            timeout_secs: default_timeout_secs(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl MirrorConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            MirrorError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).map_err(|e| MirrorError::Config(e.to_string()))
    }

    pub fn expanded_output_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.output_dir).as_ref())
    }

    pub fn into_options(self, show_progress_bars: bool) -> Result<MirrorOptions> {
        let output_dir = self.expanded_output_dir();
        let base_url = self
            .base_url
            .ok_or_else(|| MirrorError::Config("no base URL configured".to_string()))?;

        Ok(MirrorOptions {
            base_url,
            output_dir,
            max_in_flight: self.max_in_flight.max(1),
            timeout_secs: self.timeout_secs,
            failure_policy: self.failure_policy,
            show_progress_bars,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = MirrorConfig::from_json(r#"{"base_url": "https://example.com"}"#).unwrap();

        assert_eq!(config.base_url.as_deref(), Some("https://example.com"));
        assert_eq!(config.output_dir, "~/Documents/sitemirror");
        assert_eq!(config.max_in_flight, 16);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
    }

    #[test]
    fn test_failure_policy_is_kebab_case() {
        let config = MirrorConfig::from_json(r#"{"failure_policy": "isolate"}"#).unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::Isolate);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = MirrorConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, MirrorError::Config(_)));
    }

    #[test]
    fn test_into_options_requires_base_url() {
        let err = MirrorConfig::default().into_options(false).unwrap_err();
        assert!(err.to_string().contains("no base URL"));
    }

    #[test]
    fn test_into_options_clamps_concurrency() {
        let config = MirrorConfig {
            base_url: Some("https://example.com".to_string()),
            output_dir: "/tmp/mirror".to_string(),
            max_in_flight: 0,
            ..MirrorConfig::default()
        };

        let options = config.into_options(false).unwrap();
        assert_eq!(options.max_in_flight, 1);
        assert_eq!(options.output_dir, PathBuf::from("/tmp/mirror"));
    }
}
