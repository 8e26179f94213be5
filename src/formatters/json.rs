//! JSON formatter for structured payloads

use crate::core::{Entry, Formatter, Result, TimestampFormat};
use serde_json::{Map, Value};

/// Formats each entry as a single-line JSON object
///
/// Key-values are written as top-level fields. The timestamp, level, job and
/// message fields are written last, so they win over a key-value with the
/// same name. A batch is JSON lines, one object per entry.
///
/// # Example
///
/// ```
/// use rust_cloud_logger::core::{Entry, Formatter, LogLevel};
/// use rust_cloud_logger::formatters::JsonFormatter;
///
/// let formatter = JsonFormatter::new().with_level_field("severity");
/// let entry = Entry::new("api", LogLevel::Info, "started");
///
/// let payload = formatter.format(&entry).unwrap();
/// let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
/// assert_eq!(value["severity"], "info");
/// assert_eq!(value["job"], "api");
/// ```
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    timestamp_format: TimestampFormat,
    timestamp_field: String,
    level_field: String,
    job_field: String,
    message_field: String,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self {
            timestamp_format: TimestampFormat::Rfc3339,
            timestamp_field: "timestamp".to_string(),
            level_field: "level".to_string(),
            job_field: "job".to_string(),
            message_field: "message".to_string(),
        }
    }
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn with_timestamp_field(mut self, field: impl Into<String>) -> Self {
        self.timestamp_field = field.into();
        self
    }

    #[must_use]
    pub fn with_level_field(mut self, field: impl Into<String>) -> Self {
        self.level_field = field.into();
        self
    }

    #[must_use]
    pub fn with_job_field(mut self, field: impl Into<String>) -> Self {
        self.job_field = field.into();
        self
    }

    #[must_use]
    pub fn with_message_field(mut self, field: impl Into<String>) -> Self {
        self.message_field = field.into();
        self
    }

    fn timestamp_value(&self, entry: &Entry) -> Value {
        let rendered = self.timestamp_format.format(&entry.timestamp);
        if self.timestamp_format.is_numeric() {
            if let Ok(n) = rendered.parse::<i64>() {
                return Value::Number(n.into());
            }
        }
        Value::String(rendered)
    }

    fn to_object(&self, entry: &Entry) -> Map<String, Value> {
        let mut object = Map::new();
        for (key, value) in entry.key_vals.fields() {
            object.insert(key.clone(), value.to_json_value());
        }

        object.insert(self.timestamp_field.clone(), self.timestamp_value(entry));
        object.insert(
            self.level_field.clone(),
            Value::String(entry.level.as_str().to_string()),
        );
        object.insert(self.job_field.clone(), Value::String(entry.job.clone()));
        object.insert(
            self.message_field.clone(),
            Value::String(entry.message.clone()),
        );
        object
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, entry: &Entry) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&Value::Object(self.to_object(entry)))?)
    }

    fn format_batch(&self, _job: &str, entries: &[Entry]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                out.push(b'\n');
            }
            serde_json::to_writer(&mut out, &Value::Object(self.to_object(entry)))?;
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "json"
    }
}
