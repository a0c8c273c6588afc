use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use relay_engine::{HttpSettings, PollPolicy};
use relay_logging::relay_info;
use serde::{Deserialize, Serialize};

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILENAME: &str = "relay.ron";

/// Settings of the `relay` binary, read from a RON file.
///
/// Every field is optional in the file; missing ones keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server_url: String,
    pub target_language: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_upload_bytes: u64,
    pub poll: PollConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub initial_delay_ms: u64,
    pub interval_ms: u64,
    pub backoff_factor: f64,
    pub max_interval_ms: u64,
    pub max_attempts: Option<u32>,
    pub max_elapsed_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let http = HttpSettings::default();
        Self {
            server_url: http.base_url,
            target_language: "hindi".to_string(),
            connect_timeout_secs: http.connect_timeout.as_secs(),
            request_timeout_secs: http.request_timeout.as_secs(),
            max_upload_bytes: http.max_upload_bytes,
            poll: PollConfig::default(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        let policy = PollPolicy::default();
        Self {
            initial_delay_ms: millis(policy.initial_delay),
            interval_ms: millis(policy.interval),
            backoff_factor: policy.backoff_factor,
            max_interval_ms: millis(policy.max_interval),
            max_attempts: policy.max_attempts,
            max_elapsed_secs: policy.max_elapsed.map(|elapsed| elapsed.as_secs()),
        }
    }
}

impl AppConfig {
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            base_url: self.server_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_upload_bytes: self.max_upload_bytes,
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            initial_delay: Duration::from_millis(self.poll.initial_delay_ms),
            interval: Duration::from_millis(self.poll.interval_ms),
            backoff_factor: self.poll.backoff_factor,
            max_interval: Duration::from_millis(self.poll.max_interval_ms),
            max_attempts: self.poll.max_attempts,
            max_elapsed: self.poll.max_elapsed_secs.map(Duration::from_secs),
        }
    }

    /// Apply command-line overrides on top of file values.
    pub fn with_server(mut self, server: Option<&str>) -> Self {
        if let Some(server) = server {
            self.server_url = server.to_string();
        }
        self
    }

    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new())
            .context("Failed to serialize configuration")
    }
}

/// Load the configuration.
///
/// An explicit path must exist. Without one, `./relay.ron` is used if
/// present and built-in defaults otherwise.
pub fn load(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILENAME);
            if !fallback.is_file() {
                return Ok(AppConfig::default());
            }
            fallback
        }
    };
    read(&path)
}

fn read(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {:?}", path))?;
    let config: AppConfig = ron::from_str(&content)
        .with_context(|| format!("Failed to parse config from {:?}", path))?;
    relay_info!("Loaded config from {:?}", path);
    Ok(config)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
