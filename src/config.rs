//! Application settings.
//!
//! Loaded from an optional TOML file, then overridden from the
//! environment. Sub-configs apply their env overrides in their own
//! Default implementations.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::llm::LlmConfig;

/// OCR worker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Program to invoke for OCR
    #[serde(default = "default_ocr_command")]
    pub command: String,
    /// Fixed arguments placed before the JSON payload
    #[serde(default)]
    pub args: Vec<String>,
    /// Hard timeout per invocation in seconds
    #[serde(default = "default_ocr_timeout_secs")]
    pub timeout_secs: u64,
    /// In-flight task bound for the poller
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Poll interval in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Resubmission bound for failed tasks
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,
}

fn default_ocr_command() -> String {
    "python3".to_string()
}

fn default_ocr_timeout_secs() -> u64 {
    180
}

fn default_max_concurrent() -> usize {
    5
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_max_retries() -> i32 {
    3
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: default_ocr_command(),
            args: Vec::new(),
            timeout_secs: default_ocr_timeout_secs(),
            max_concurrent: default_max_concurrent(),
            poll_interval_secs: default_poll_interval_secs(),
            max_retries: default_max_retries(),
        }
        .with_env_overrides()
    }
}

impl OcrConfig {
    /// Apply environment variable overrides.
    ///
    /// Supported env vars: `OCR_COMMAND`, `OCR_TIMEOUT_SECS`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("OCR_COMMAND") {
            self.command = val;
        }
        if let Ok(val) = std::env::var("OCR_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.timeout_secs = n;
            }
        }
        self
    }
}

/// Batch scheduler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between batch runs in hours
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,
    /// Recency window for automatic runs in days
    #[serde(default = "default_recency_days")]
    pub recency_days: i64,
    /// Delay between posts within a batch in seconds
    #[serde(default = "default_inter_post_delay_secs")]
    pub inter_post_delay_secs: u64,
}

fn default_interval_hours() -> u64 {
    5
}

fn default_recency_days() -> i64 {
    3
}

fn default_inter_post_delay_secs() -> u64 {
    2
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_hours: default_interval_hours(),
            recency_days: default_recency_days(),
            inter_post_delay_secs: default_inter_post_delay_secs(),
        }
    }
}

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Data directory for the database and the OCR failure log
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Database filename inside the data directory
    #[serde(default = "default_database_filename")]
    pub database: String,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_database_filename() -> String {
    "postscribe.db".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database: default_database_filename(),
            ocr: OcrConfig::default(),
            scheduler: SchedulerConfig::default(),
            llm: LlmConfig::default(),
        }
        .with_env_overrides()
    }
}

impl Settings {
    /// Load settings from a TOML file, falling back to defaults when the
    /// path is absent or missing.
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from("postscribe.toml");
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;

        let settings: Settings = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file {}: {}", path.display(), e))?;

        Ok(settings.with_env_overrides())
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars: `POSTSCRIBE_DATA_DIR`, `POSTSCRIBE_DATABASE`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("POSTSCRIBE_DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("POSTSCRIBE_DATABASE") {
            self.database = val;
        }
        self
    }

    /// Filesystem path of the SQLite database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database)
    }

    /// URL form of the database path for the migration runner.
    pub fn database_url(&self) -> String {
        format!("sqlite:{}", self.database_path().display())
    }

    /// Path of the append-only OCR failure log.
    pub fn failure_log_path(&self) -> PathBuf {
        self.data_dir.join("ocr_failed.txt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.ocr.timeout_secs, 180);
        assert_eq!(settings.ocr.max_concurrent, 5);
        assert_eq!(settings.ocr.poll_interval_secs, 5);
        assert_eq!(settings.ocr.max_retries, 3);
        assert_eq!(settings.scheduler.interval_hours, 5);
        assert_eq!(settings.scheduler.recency_days, 3);
        assert_eq!(settings.scheduler.inter_post_delay_secs, 2);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            data_dir = "/var/lib/postscribe"

            [ocr]
            command = "ocr-tool"
            "#,
        )
        .unwrap();

        assert_eq!(settings.data_dir, PathBuf::from("/var/lib/postscribe"));
        assert_eq!(settings.ocr.command, "ocr-tool");
        assert_eq!(settings.ocr.timeout_secs, 180);
        assert_eq!(settings.scheduler.interval_hours, 5);
    }

    #[test]
    fn test_database_paths() {
        let mut settings = Settings::default();
        settings.data_dir = PathBuf::from("/tmp/ps");
        settings.database = "forum.db".to_string();
        assert_eq!(settings.database_path(), PathBuf::from("/tmp/ps/forum.db"));
        assert_eq!(settings.database_url(), "sqlite:/tmp/ps/forum.db");
        assert_eq!(
            settings.failure_log_path(),
            PathBuf::from("/tmp/ps/ocr_failed.txt")
        );
    }
}
