//! Runner configuration.

use serde::{Deserialize, Serialize};

use crate::error::{TestStatError, TestStatResult};

pub const DEFAULT_HOST: &str = "stat.ripe.net";
pub const DEFAULT_SCHEME: &str = "https";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Where requests go and how many run at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Requests issued concurrently per batch.
    pub batch_size: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl RunnerConfig {
    /// The same configuration pointed at another host.
    pub fn with_host(&self, host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..self.clone()
        }
    }

    /// Reject values the runner cannot work with.
    pub fn validate(&self) -> TestStatResult<()> {
        if self.scheme != "http" && self.scheme != "https" {
            return Err(TestStatError::ConfigError {
                reason: format!("unsupported scheme '{}'", self.scheme),
            });
        }
        if self.host.trim().is_empty() {
            return Err(TestStatError::ConfigError {
                reason: "host must not be empty".to_string(),
            });
        }
        if self.batch_size == 0 {
            return Err(TestStatError::ConfigError {
                reason: "batch size must be at least 1".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(TestStatError::ConfigError {
                reason: "timeout must be at least 1 second".to_string(),
            });
        }
        Ok(())
    }

    /// `{scheme}://{host}[:{port}]`
    pub fn base_url(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}", self.scheme, self.host, port),
            None => format!("{}://{}", self.scheme, self.host),
        }
    }
}
