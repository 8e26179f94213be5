//! Plain-text formatter

use crate::core::{Entry, Formatter, Result, TimestampFormat};

/// Formats entries as `time=.. job=.. level=.. message=.. key=value ...`
#[derive(Debug, Clone)]
pub struct StringFormatter {
    timestamp_format: TimestampFormat,
    key_value_sep: String,
    pair_sep: String,
}

impl Default for StringFormatter {
    fn default() -> Self {
        Self {
            timestamp_format: TimestampFormat::Rfc3339,
            key_value_sep: "=".to_string(),
            pair_sep: " ".to_string(),
        }
    }
}

impl StringFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn with_key_value_separator(mut self, sep: impl Into<String>) -> Self {
        self.key_value_sep = sep.into();
        self
    }

    #[must_use]
    pub fn with_pair_separator(mut self, sep: impl Into<String>) -> Self {
        self.pair_sep = sep.into();
        self
    }

    fn render(&self, entry: &Entry) -> String {
        let kv = &self.key_value_sep;
        let mut parts = vec![
            format!("time{}{}", kv, self.timestamp_format.format(&entry.timestamp)),
            format!("job{}{}", kv, entry.job),
            format!("level{}{}", kv, entry.level),
            format!("message{}{}", kv, entry.message),
        ];
        if !entry.key_vals.is_empty() {
            parts.push(entry.key_vals.format_fields(kv, &self.pair_sep));
        }
        parts.join(&self.pair_sep)
    }
}

impl Formatter for StringFormatter {
    fn format(&self, entry: &Entry) -> Result<Vec<u8>> {
        Ok(self.render(entry).into_bytes())
    }

    fn format_batch(&self, _job: &str, entries: &[Entry]) -> Result<Vec<u8>> {
        Ok(entries
            .iter()
            .map(|e| self.render(e))
            .collect::<Vec<_>>()
            .join("\n")
            .into_bytes())
    }

    fn name(&self) -> &str {
        "string"
    }
}
