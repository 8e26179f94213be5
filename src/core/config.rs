//! Delivery configuration
//!
//! A fully populated record, validated once when a deliverer is built.

use super::error::{LoggerError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default queue capacity
pub const DEFAULT_QUEUE_SIZE: usize = 1000;

/// Default number of entries per job batch
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default interval between timer-driven flushes
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Default shutdown timeout for flush and close
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest accepted `max_retries`
pub const MAX_RETRIES: u32 = 100;

/// Default upper bound for a single outgoing payload (5 MiB)
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 5 * 1024 * 1024;

/// Configuration of a deliverer
///
/// # Example
///
/// ```
/// use rust_cloud_logger::Config;
/// use std::time::Duration;
///
/// let config = Config::default()
///     .with_async(true)
///     .with_queue_size(500)
///     .with_flush_interval(Duration::from_secs(1));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Queue entries and deliver them from background workers
    pub async_delivery: bool,
    /// Accumulate entries per job before sending (only with `async_delivery`)
    pub batching: bool,
    pub queue_size: usize,
    pub batch_size: usize,
    pub workers: usize,
    pub flush_interval: Duration,
    /// Additional attempts after the first failed send
    pub max_retries: u32,
    pub retry_interval: Duration,
    /// Bound for `flush`, and for joining workers during `close`
    pub shutdown_timeout: Duration,
    /// Block producers on a full queue instead of rejecting entries
    pub block_on_full: bool,
    /// Estimated size limit of one outgoing payload, in bytes
    pub max_payload_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            async_delivery: false,
            batching: true,
            queue_size: DEFAULT_QUEUE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            workers: 1,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_retries: 3,
            retry_interval: Duration::from_secs(1),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            block_on_full: false,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_async(mut self, enabled: bool) -> Self {
        self.async_delivery = enabled;
        self
    }

    #[must_use]
    pub fn with_batching(mut self, enabled: bool) -> Self {
        self.batching = enabled;
        self
    }

    #[must_use]
    pub fn with_queue_size(mut self, size: usize) -> Self {
        self.queue_size = size;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Further attempts after the first send; `validate` caps this at [`MAX_RETRIES`]
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_block_on_full(mut self, block: bool) -> Self {
        self.block_on_full = block;
        self
    }

    #[must_use]
    pub fn with_max_payload_size(mut self, bytes: usize) -> Self {
        self.max_payload_size = bytes;
        self
    }

    /// Reject values the engine cannot run with
    ///
    /// `queue_size < batch_size` is allowed; it only means batches are cut by
    /// the flush timer before they fill.
    pub fn validate(&self) -> Result<()> {
        if self.queue_size == 0 {
            return Err(LoggerError::config("Config", "queue_size must be greater than 0"));
        }
        if self.batch_size == 0 {
            return Err(LoggerError::config("Config", "batch_size must be greater than 0"));
        }
        if self.workers == 0 {
            return Err(LoggerError::config("Config", "workers must be greater than 0"));
        }
        if self.flush_interval.is_zero() {
            return Err(LoggerError::config("Config", "flush_interval must be greater than 0"));
        }
        if self.shutdown_timeout.is_zero() {
            return Err(LoggerError::config(
                "Config",
                "shutdown_timeout must be greater than 0",
            ));
        }
        if self.max_retries > MAX_RETRIES {
            return Err(LoggerError::config(
                "Config",
                format!("max_retries must be at most {}", MAX_RETRIES),
            ));
        }
        if self.max_payload_size == 0 {
            return Err(LoggerError::config(
                "Config",
                "max_payload_size must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Environment variable holding the backend address (`host:port`)
pub const ENV_ENDPOINT: &str = "CLOUDLOG_ENDPOINT";
/// Environment variable holding the user name sent in the stream preamble
pub const ENV_USERNAME: &str = "CLOUDLOG_USERNAME";
/// Environment variable holding the access token
pub const ENV_TOKEN: &str = "CLOUDLOG_TOKEN";

/// Connection settings for the bundled TCP sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    pub endpoint: String,
    pub username: Option<String>,
    pub token: Option<String>,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            username: None,
            token: None,
            connect_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
        }
    }
}

impl SenderConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, token: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, connect: Duration, write: Duration) -> Self {
        self.connect_timeout = connect;
        self.write_timeout = write;
        self
    }

    /// Read settings from `CLOUDLOG_ENDPOINT`, `CLOUDLOG_USERNAME` and
    /// `CLOUDLOG_TOKEN`
    ///
    /// The endpoint is required; credentials are optional but must be set
    /// together.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup(ENV_ENDPOINT)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| LoggerError::input(format!("{} is not set", ENV_ENDPOINT)))?;

        let username = lookup(ENV_USERNAME).filter(|v| !v.is_empty());
        let token = lookup(ENV_TOKEN).filter(|v| !v.is_empty());
        match (&username, &token) {
            (Some(_), None) => {
                return Err(LoggerError::input(format!(
                    "{} is set but {} is not",
                    ENV_USERNAME, ENV_TOKEN
                )))
            }
            (None, Some(_)) => {
                return Err(LoggerError::input(format!(
                    "{} is set but {} is not",
                    ENV_TOKEN, ENV_USERNAME
                )))
            }
            _ => {}
        }

        Ok(Self {
            endpoint,
            username,
            token,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.async_delivery);
        assert!(config.batching);
        assert_eq!(config.queue_size, 1000);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.workers, 1);
        assert_eq!(config.flush_interval, Duration::from_secs(5));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_interval, Duration::from_secs(1));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(10));
        assert!(!config.block_on_full);
        assert_eq!(config.max_payload_size, 5 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        for config in [
            Config::default().with_queue_size(0),
            Config::default().with_batch_size(0),
            Config::default().with_workers(0),
            Config::default().with_flush_interval(Duration::ZERO),
            Config::default().with_shutdown_timeout(Duration::ZERO),
            Config::default().with_max_payload_size(0),
        ] {
            let err = config.validate().unwrap_err();
            assert!(err.is(ErrorKind::InvalidInput), "unexpected error: {}", err);
        }
    }

    #[test]
    fn test_validate_caps_max_retries() {
        assert!(Config::default().with_max_retries(MAX_RETRIES).validate().is_ok());

        let err = Config::default()
            .with_max_retries(u32::MAX)
            .validate()
            .unwrap_err();
        assert!(err.is(ErrorKind::InvalidInput));
        assert!(err.to_string().contains("max_retries"));
    }

    #[test]
    fn test_small_queue_is_allowed() {
        let config = Config::default().with_queue_size(10).with_batch_size(50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: Config =
            serde_json::from_str(r#"{"async_delivery": true, "workers": 4}"#).unwrap();
        assert!(config.async_delivery);
        assert_eq!(config.workers, 4);
        assert_eq!(config.queue_size, DEFAULT_QUEUE_SIZE);
    }

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| {
            vars.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn test_sender_config_from_lookup() {
        let config = SenderConfig::from_lookup(lookup_from(&[
            (ENV_ENDPOINT, "127.0.0.1:5140"),
            (ENV_USERNAME, "ingest"),
            (ENV_TOKEN, "secret"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint, "127.0.0.1:5140");
        assert_eq!(config.username.as_deref(), Some("ingest"));
        assert_eq!(config.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_sender_config_missing_endpoint() {
        let err = SenderConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.is(ErrorKind::InvalidInput));
        assert!(err.to_string().contains(ENV_ENDPOINT));
    }

    #[test]
    fn test_sender_config_partial_credentials() {
        let err = SenderConfig::from_lookup(lookup_from(&[
            (ENV_ENDPOINT, "127.0.0.1:5140"),
            (ENV_USERNAME, "ingest"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(ENV_TOKEN));
    }
}
