//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Longest accepted refresh interval (one year).
pub const MAX_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

const REDACTED: &str = "<redacted>";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Identity, source and destination settings
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Interval, jitter and run-once settings
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// HTTP request behavior
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.collector.app_name.trim().is_empty() {
            return Err(AppError::validation("collector.app_name is empty"));
        }
        if self.collector.source.trim().is_empty() {
            return Err(AppError::validation("collector.source is empty"));
        }
        if self.collector.artifact_name.trim().is_empty() {
            return Err(AppError::validation("collector.artifact_name is empty"));
        }
        if self.schedule.interval_secs == 0 {
            return Err(AppError::validation("schedule.interval_secs must be > 0"));
        }
        if self.schedule.interval_secs > MAX_INTERVAL_SECS {
            return Err(AppError::validation(format!(
                "schedule.interval_secs must be at most {MAX_INTERVAL_SECS}"
            )));
        }
        if self.schedule.jitter_secs >= self.schedule.interval_secs {
            return Err(AppError::validation(
                "schedule.jitter_secs must be smaller than schedule.interval_secs",
            ));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        Ok(())
    }

    /// Render the configuration back to TOML for display.
    ///
    /// The basic auth password is replaced with a placeholder.
    pub fn to_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if let Some(password) = shown
            .fetch
            .basic_auth
            .as_mut()
            .and_then(|auth| auth.password.as_mut())
        {
            *password = REDACTED.to_string();
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

/// Identity, source and destination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Application name, used for the user agent and correlation header
    #[serde(default = "defaults::app_name")]
    pub app_name: String,

    /// Source descriptor, e.g. `https://example.org/feed.json`
    #[serde(default)]
    pub source: String,

    /// Storage directory; a fresh temporary directory when unset
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,

    /// Artifact name template (`{timestamp}`, `{id}`)
    #[serde(default = "defaults::artifact_name")]
    pub artifact_name: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            app_name: defaults::app_name(),
            source: String::new(),
            storage_dir: None,
            artifact_name: defaults::artifact_name(),
        }
    }
}

/// Schedule state handed to the scheduler loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Fetch once, commit, exit
    #[serde(default)]
    pub once: bool,

    /// Base refresh interval in seconds
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,

    /// Maximum jitter applied either side of the interval, in seconds
    #[serde(default = "defaults::jitter")]
    pub jitter_secs: u64,
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_secs(self.jitter_secs)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            once: false,
            interval_secs: defaults::interval(),
            jitter_secs: defaults::jitter(),
        }
    }
}

/// HTTP request settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Number of requests in a redirect chain after which further redirects
    /// are refused
    #[serde(default = "defaults::max_redirects")]
    pub max_redirects: usize,

    /// Value for the `accept` header
    #[serde(default)]
    pub accept: Option<String>,

    /// Credentials for basic authentication
    #[serde(default)]
    pub basic_auth: Option<BasicAuth>,

    /// Extra request headers, applied in order
    #[serde(default)]
    pub headers: Vec<HeaderEntry>,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::timeout(),
            max_redirects: defaults::max_redirects(),
            accept: None,
            basic_auth: None,
            headers: Vec::new(),
        }
    }
}

/// Basic authentication credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct BasicAuth {
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("user", &self.user)
            .field("password", &REDACTED)
            .finish()
    }
}

/// A single extra request header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

mod defaults {
    pub fn app_name() -> String {
        "collector".into()
    }
    pub fn artifact_name() -> String {
        "{timestamp}.blob".into()
    }
    pub fn interval() -> u64 {
        5 * 60
    }
    pub fn jitter() -> u64 {
        23
    }
    pub fn timeout() -> u64 {
        4 * 60
    }
    pub fn max_redirects() -> usize {
        2
    }
}
