//! Timestamp rendering for formatted payloads

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// How formatters render an entry's timestamp
///
/// # Examples
///
/// ```
/// use rust_cloud_logger::core::TimestampFormat;
/// use chrono::Utc;
///
/// let rendered = TimestampFormat::Rfc3339.format(&Utc::now());
/// assert!(rendered.ends_with('Z'));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// RFC 3339 at second precision: `2025-01-08T10:30:45Z`
    #[default]
    Rfc3339,

    /// RFC 3339 with nanoseconds: `2025-01-08T10:30:45.123456000Z`
    Rfc3339Nanos,

    /// Unix timestamp in seconds: `1736332245`
    Unix,

    /// Unix timestamp in nanoseconds, as most log backends key their streams
    UnixNanos,

    /// Custom strftime format
    Custom(String),
}

impl TimestampFormat {
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        match self {
            TimestampFormat::Rfc3339 => datetime.to_rfc3339_opts(SecondsFormat::Secs, true),
            TimestampFormat::Rfc3339Nanos => datetime.to_rfc3339_opts(SecondsFormat::Nanos, true),
            TimestampFormat::Unix => datetime.timestamp().to_string(),
            TimestampFormat::UnixNanos => datetime
                .timestamp_nanos_opt()
                .unwrap_or_else(|| datetime.timestamp_micros().saturating_mul(1_000))
                .to_string(),
            TimestampFormat::Custom(format_str) => datetime.format(format_str).to_string(),
        }
    }

    /// Check if this is a Unix-based numeric format
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, TimestampFormat::Unix | TimestampFormat::UnixNanos)
    }
}
