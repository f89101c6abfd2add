use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::detection::{
    DetectionEngine, DetectionError, DEFAULT_FAIL_THRESHOLD, DEFAULT_IP_THRESHOLD,
    DEFAULT_USER_THRESHOLD, DEFAULT_WINDOW_SECONDS,
};

/// Errors that can occur while loading or saving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid detection settings: {0}")]
    Detection(#[from] DetectionError),
}

/// Configuration for a credwatch run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Input source configuration
    #[serde(default)]
    pub input: InputConfig,
    /// Detection rules configuration
    #[serde(default)]
    pub detection: DetectionConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Input source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Path to the auth log
    pub file_path: Option<PathBuf>,
    /// Year assumed for syslog timestamps, which carry none (current year if unset)
    pub year: Option<i32>,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            file_path: Some(PathBuf::from("/var/log/auth.log")),
            year: None,
        }
    }
}

/// Detection rules configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Sliding window in seconds, shared by all detectors
    pub window_seconds: i64,
    /// Failed attempts that constitute brute force
    pub fail_threshold: usize,
    /// Distinct source IPs for account brute force
    pub ip_threshold: usize,
    /// Distinct usernames for a multi-account spray
    pub user_threshold: usize,
    /// Only count failed attempts towards a spray
    pub fail_only: bool,
    /// Enable per-IP brute force detection
    pub enable_ip_brute_force: bool,
    /// Enable per-account brute force detection
    pub enable_account_brute_force: bool,
    /// Enable fail-then-success correlation
    pub enable_fail_then_success: bool,
    /// Enable per-IP multi-account detection
    pub enable_ip_multi_account: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        DetectionConfig {
            window_seconds: DEFAULT_WINDOW_SECONDS,
            fail_threshold: DEFAULT_FAIL_THRESHOLD,
            ip_threshold: DEFAULT_IP_THRESHOLD,
            user_threshold: DEFAULT_USER_THRESHOLD,
            fail_only: true,
            enable_ip_brute_force: true,
            enable_account_brute_force: true,
            enable_fail_then_success: true,
            enable_ip_multi_account: true,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json", "jsonl", or "console"
    pub format: String,
    /// Output file path (stdout if unset)
    pub file_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            format: "json".to_string(),
            file_path: Some(PathBuf::from("report.json")),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: &PathBuf) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject detection settings no detector can run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        DetectionEngine::from_config(&self.detection)?;
        Ok(())
    }
}
