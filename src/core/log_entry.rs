//! Log entry structure

use super::log_context::LogContext;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One log record awaiting delivery
///
/// Built at the call site and moved into the delivery queue. The entry owns
/// its fields and its formatted payload; nothing outside the queue can alias
/// them once it has been handed over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub job: String,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "LogContext::is_empty")]
    pub key_vals: LogContext,
    pub timestamp: DateTime<Utc>,
    /// Formatted representation handed to the deliverer
    #[serde(skip)]
    pub payload: Vec<u8>,
}

impl Entry {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// so one record can never masquerade as several lines of a batch.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(job: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            level,
            message: Self::sanitize_message(&message.into()),
            key_vals: LogContext::new(),
            timestamp: Utc::now(),
            payload: Vec::new(),
        }
    }

    pub fn with_key_vals(mut self, key_vals: LogContext) -> Self {
        self.key_vals = key_vals;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Size of the formatted payload in bytes
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}
