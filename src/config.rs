// ABOUTME: Console configuration loaded from an optional TOML file
// ABOUTME: Environment and command-line values override the file; defaults fill the rest

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{ConsoleError, Result};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub detail_poll_interval_ms: u64,
    pub list_poll_interval_ms: u64,
    pub list_limit: u32,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 30,
            detail_poll_interval_ms: 2_000,
            list_poll_interval_ms: 30_000,
            list_limit: 50,
        }
    }
}

impl ConsoleConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConsoleError::Config(e.to_string()))
    }

    /// Read `path` if given; a missing file is an error only when it was asked for.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConsoleError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Layer an explicit base URL (flag or environment) over the file value.
    pub fn with_api_base_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.api_base_url = url;
        }
        self
    }

    pub fn validate(mut self) -> Result<Self> {
        self.api_base_url = self.api_base_url.trim().trim_end_matches('/').to_string();
        if self.api_base_url.is_empty() {
            return Err(ConsoleError::Config("api_base_url must not be empty".to_string()));
        }
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(ConsoleError::Config(format!(
                "api_base_url must be an http(s) URL, got '{}'",
                self.api_base_url
            )));
        }
        if self.request_timeout_secs == 0
            || self.detail_poll_interval_ms == 0
            || self.list_poll_interval_ms == 0
        {
            return Err(ConsoleError::Config(
                "timeouts and poll intervals must be greater than zero".to_string(),
            ));
        }
        if self.list_limit == 0 {
            return Err(ConsoleError::Config("list_limit must be at least 1".to_string()));
        }
        Ok(self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn detail_poll_interval(&self) -> Duration {
        Duration::from_millis(self.detail_poll_interval_ms)
    }

    pub fn list_poll_interval(&self) -> Duration {
        Duration::from_millis(self.list_poll_interval_ms)
    }
}
