use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::{Error, Result};

/// Substrings marking infrastructure-internal helper resources.
pub const DEFAULT_EXCLUDE: &[&str] = &["kube-system", "internal-", "-helper", "bootstrap-agent"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dashboard progress refresh interval.
    pub refresh_interval_secs: u64,
    /// Per-resource progress re-poll interval inside a detail view.
    pub detail_refresh_interval_secs: u64,
    pub log_poll_interval_secs: u64,
    pub log_max_retries: u32,
    pub log_retry_delay_secs: u64,
    pub log_flush_interval_ms: u64,
    /// Flush a pending log batch once it holds this many lines.
    pub log_batch_lines: usize,
    /// Maximum lines kept in a detail view's log buffer.
    pub log_buffer_lines: usize,
    pub exclude: Vec<String>,
    /// Debug bundle to read resources, progress and logs from.
    pub bundle: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 5,
            detail_refresh_interval_secs: 5,
            log_poll_interval_secs: 3,
            log_max_retries: 3,
            log_retry_delay_secs: 2,
            log_flush_interval_ms: 250,
            log_batch_lines: 200,
            log_buffer_lines: 5000,
            exclude: DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect(),
            bundle: None,
        }
    }
}

impl Config {
    pub fn app_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".depscope"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join("config.toml"))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn detail_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.detail_refresh_interval_secs.max(1))
    }

    pub fn log_stream_settings(&self) -> LogStreamSettings {
        LogStreamSettings {
            poll_interval: Duration::from_secs(self.log_poll_interval_secs.max(1)),
            max_retries: self.log_max_retries,
            retry_delay: Duration::from_secs(self.log_retry_delay_secs),
            flush_interval: Duration::from_millis(self.log_flush_interval_ms.max(10)),
            batch_lines: self.log_batch_lines.max(1),
        }
    }

    pub fn bundle_path(&self) -> Option<PathBuf> {
        self.bundle.as_deref().map(expand_tilde)
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        debug!(path = %path.display(), "Config::load");
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        debug!(
            refresh = config.refresh_interval_secs,
            log_poll = config.log_poll_interval_secs,
            exclude = ?config.exclude,
            "Config loaded"
        );
        Ok(config)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "Config saved");
        Ok(())
    }
}

/// Timing and batching knobs handed to each log-streaming task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogStreamSettings {
    pub poll_interval: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub flush_interval: Duration,
    pub batch_lines: usize,
}

impl Default for LogStreamSettings {
    fn default() -> Self {
        Config::default().log_stream_settings()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
