//! Connection configuration.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::reader::{ResponseMarkers, MAX_RESPONSE_SIZE};

/// Host used when none is configured.
pub const DEFAULT_HOST: &str = "localhost";

/// TCP port the openMHA parser listens on by default.
pub const DEFAULT_PORT: u16 = 33337;

/// Where and how to connect.
///
/// `timeout` bounds connecting and every request (write plus wait for the
/// prompt). `None` waits indefinitely. `max_response_size` bounds the bytes
/// buffered while waiting for a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub timeout: Option<Duration>,
    pub markers: ResponseMarkers,
    pub max_response_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout: None,
            markers: ResponseMarkers::default(),
            max_response_size: MAX_RESPONSE_SIZE,
        }
    }
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Defaults overlaid with the environment.
    ///
    /// - `MHA_HOST` - host name or address
    /// - `MHA_PORT` - TCP port
    /// - `MHA_TIMEOUT_MS` - request timeout in milliseconds (`0` = none)
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but does not parse.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("MHA_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("MHA_PORT") {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid MHA_PORT value: {}", port))?;
        }
        if let Ok(ms) = std::env::var("MHA_TIMEOUT_MS") {
            let ms: u64 = ms
                .trim()
                .parse()
                .with_context(|| format!("Invalid MHA_TIMEOUT_MS value: {}", ms))?;
            config.timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the prompt markers can tell success from failure and fit the
/// response limit.
    pub fn validate(&self) -> Result<()> {
        if self.markers.success.is_empty() || self.markers.failure.is_empty() {
            bail!("Response markers must not be empty");
        }
        if self.max_response_size < self.markers.success.len().max(self.markers.failure.len()) {
            bail!(
                "max_response_size {} cannot hold a response marker",
                self.max_response_size
            );
        }
        if self.markers.success == self.markers.failure {
            bail!(
                "Success and failure markers must differ (both are {:?})",
                self.markers.success
            );
        }
        Ok(())
    }

    /// `host:port`, as passed to the resolver.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
