//! Logger façade over a deliverer

use super::{
    config::Config,
    deliverer::Deliverer,
    error::{noop_error_handler, ErrorHandler, LoggerError, Result},
    formatter::Formatter,
    log_context::{FieldValue, LogContext},
    log_entry::Entry,
    log_level::LogLevel,
    sender::Sender,
    stats::DeliveryStatus,
};
use crate::delivery::new_deliverer;
use crate::formatters::JsonFormatter;
use std::sync::Arc;

/// Job name used when none is configured
pub const DEFAULT_JOB: &str = "application";

/// Builds entries and hands them to a deliverer
///
/// Cloning a logger, or deriving one with [`with_context`](Logger::with_context)
/// or [`with_job`](Logger::with_job), shares the deliverer. Each logger owns
/// its job and metadata.
///
/// # Example
///
/// ```
/// use rust_cloud_logger::prelude::*;
/// use rust_cloud_logger::testing::RecordingSender;
/// use std::sync::Arc;
///
/// let sender = Arc::new(RecordingSender::new());
/// let logger = Logger::builder()
///     .job("checkout")
///     .metadata("region", "eu-west-1")
///     .sender(sender.clone())
///     .build()
///     .unwrap();
///
/// logger.info("order placed").unwrap();
/// assert!(sender.contains_message("order placed"));
/// ```
#[derive(Clone)]
pub struct Logger {
    deliverer: Arc<dyn Deliverer>,
    formatter: Arc<dyn Formatter>,
    job: String,
    metadata: LogContext,
}

impl Logger {
    /// Wrap an existing deliverer
    pub fn new(deliverer: Arc<dyn Deliverer>, formatter: Arc<dyn Formatter>) -> Self {
        Self {
            deliverer,
            formatter,
            job: DEFAULT_JOB.to_string(),
            metadata: LogContext::new(),
        }
    }

    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn metadata(&self) -> &LogContext {
        &self.metadata
    }

    /// Log with structured fields
    ///
    /// Fields given here win over the logger's metadata. The entry is
    /// formatted before it is handed over, so a formatting error is returned
    /// to the caller and nothing is enqueued.
    pub fn log_with_context(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        mut fields: LogContext,
    ) -> Result<()> {
        fields.merge_missing(&self.metadata);

        let mut entry = Entry::new(self.job.as_str(), level, message).with_key_vals(fields);
        entry.payload = self.formatter.format(&entry)?;
        self.deliverer.deliver(entry)
    }

    #[inline]
    pub fn log(&self, level: LogLevel, message: impl Into<String>) -> Result<()> {
        self.log_with_context(level, message, LogContext::new())
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Debug, message)
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Info, message)
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Warn, message)
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Error, message)
    }

    pub fn debug_with_context(&self, message: impl Into<String>, fields: LogContext) -> Result<()> {
        self.log_with_context(LogLevel::Debug, message, fields)
    }

    pub fn info_with_context(&self, message: impl Into<String>, fields: LogContext) -> Result<()> {
        self.log_with_context(LogLevel::Info, message, fields)
    }

    pub fn warn_with_context(&self, message: impl Into<String>, fields: LogContext) -> Result<()> {
        self.log_with_context(LogLevel::Warn, message, fields)
    }

    pub fn error_with_context(&self, message: impl Into<String>, fields: LogContext) -> Result<()> {
        self.log_with_context(LogLevel::Error, message, fields)
    }

    /// Derived logger with extra metadata
    ///
    /// New fields override existing metadata of the same name.
    #[must_use]
    pub fn with_context(&self, fields: LogContext) -> Logger {
        let mut metadata = fields;
        metadata.merge_missing(&self.metadata);
        Logger {
            deliverer: Arc::clone(&self.deliverer),
            formatter: Arc::clone(&self.formatter),
            job: self.job.clone(),
            metadata,
        }
    }

    /// Derived logger writing to another job
    #[must_use]
    pub fn with_job(&self, job: impl Into<String>) -> Logger {
        Logger {
            deliverer: Arc::clone(&self.deliverer),
            formatter: Arc::clone(&self.formatter),
            job: job.into(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn flush(&self) -> Result<()> {
        self.deliverer.flush()
    }

    /// Close the shared deliverer; every logger derived from it stops too
    pub fn close(&self) -> Result<()> {
        self.deliverer.close()
    }

    pub fn status(&self) -> DeliveryStatus {
        self.deliverer.status()
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("job", &self.job)
            .field("metadata", &self.metadata)
            .field("formatter", &self.formatter.name())
            .field("status", &self.status())
            .finish()
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use rust_cloud_logger::prelude::*;
/// use rust_cloud_logger::testing::RecordingSender;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let logger = Logger::builder()
///     .job("worker")
///     .sender(Arc::new(RecordingSender::new()))
///     .formatter(Arc::new(StringFormatter::new()))
///     .config(
///         Config::default()
///             .with_async(true)
///             .with_flush_interval(Duration::from_millis(200)),
///     )
///     .error_handler(Arc::new(|err: &LoggerError| eprintln!("delivery failed: {}", err)))
///     .build()
///     .unwrap();
///
/// logger.close().unwrap();
/// ```
pub struct LoggerBuilder {
    job: String,
    metadata: LogContext,
    formatter: Option<Arc<dyn Formatter>>,
    config: Config,
    error_handler: Option<ErrorHandler>,
    sender: Option<Arc<dyn Sender>>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            job: DEFAULT_JOB.to_string(),
            metadata: LogContext::new(),
            formatter: None,
            config: Config::default(),
            error_handler: None,
            sender: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn job(mut self, job: impl Into<String>) -> Self {
        self.job = job.into();
        self
    }

    /// Add a field written into every entry
    #[must_use = "builder methods return a new value"]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.metadata.add_field(key, value);
        self
    }

    /// Formatter used for every entry; JSON when unset
    #[must_use = "builder methods return a new value"]
    pub fn formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Callback for background delivery failures; ignored when unset
    #[must_use = "builder methods return a new value"]
    pub fn error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = Some(handler);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sender(mut self, sender: Arc<dyn Sender>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Validate the configuration and start the deliverer it selects
    pub fn build(self) -> Result<Logger> {
        let sender = self
            .sender
            .ok_or_else(|| LoggerError::config("LoggerBuilder", "a sender is required"))?;
        let formatter = self
            .formatter
            .unwrap_or_else(|| Arc::new(JsonFormatter::new()));
        let error_handler = self.error_handler.unwrap_or_else(noop_error_handler);

        let deliverer = new_deliverer(sender, Arc::clone(&formatter), &self.config, error_handler)?;

        Ok(Logger {
            deliverer: Arc::from(deliverer),
            formatter,
            job: self.job,
            metadata: self.metadata,
        })
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::testing::RecordingSender;
    use std::time::Duration;

    fn sync_logger(sender: Arc<RecordingSender>) -> Logger {
        Logger::builder().job("api").sender(sender).build().unwrap()
    }

    #[test]
    fn test_builder_requires_sender() {
        let err = Logger::builder().build().unwrap_err();
        assert!(err.is(ErrorKind::InvalidInput));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let err = Logger::builder()
            .sender(Arc::new(RecordingSender::new()))
            .config(Config::default().with_queue_size(0))
            .build()
            .unwrap_err();
        assert!(err.is(ErrorKind::InvalidInput));
    }

    #[test]
    fn test_sync_logger_delivers_json() {
        let sender = Arc::new(RecordingSender::new());
        let logger = sync_logger(sender.clone());

        logger
            .warn_with_context("disk almost full", LogContext::new().with_field("pct", 91))
            .unwrap();

        let records = sender.captured();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].job, "api");
        assert_eq!(records[0].level.as_deref(), Some("warn"));
        assert_eq!(records[0].message.as_deref(), Some("disk almost full"));
        assert_eq!(records[0].data["pct"], 91);
    }

    #[test]
    fn test_metadata_merged_entry_fields_win() {
        let sender = Arc::new(RecordingSender::new());
        let logger = Logger::builder()
            .sender(sender.clone())
            .metadata("service", "billing")
            .metadata("attempt", 1)
            .build()
            .unwrap();

        logger
            .info_with_context("retrying", LogContext::new().with_field("attempt", 2))
            .unwrap();

        let record = &sender.captured()[0];
        assert_eq!(record.job, DEFAULT_JOB);
        assert_eq!(record.data["service"], "billing");
        assert_eq!(record.data["attempt"], 2);
    }

    #[test]
    fn test_derived_loggers_own_their_metadata() {
        let sender = Arc::new(RecordingSender::new());
        let base = sync_logger(sender.clone());
        let request = base.with_context(LogContext::new().with_field("request_id", "r-1"));
        let audit = request.with_job("audit");

        base.info("base").unwrap();
        request.info("request").unwrap();
        audit.info("audit").unwrap();

        let records = sender.captured();
        assert!(records[0].data.get("request_id").is_none());
        assert_eq!(records[1].data["request_id"], "r-1");
        assert_eq!(records[2].job, "audit");
        assert_eq!(records[2].data["request_id"], "r-1");
        assert!(base.metadata().is_empty());
    }

    #[test]
    fn test_async_logger_flush_and_close() {
        let sender = Arc::new(RecordingSender::new());
        let logger = Logger::builder()
            .sender(sender.clone())
            .config(
                Config::default()
                    .with_async(true)
                    .with_flush_interval(Duration::from_secs(60)),
            )
            .build()
            .unwrap();

        logger.info("one").unwrap();
        logger.error("two").unwrap();
        logger.flush().unwrap();
        assert_eq!(logger.status().delivered, 2);

        logger.close().unwrap();
        assert!(logger.info("three").unwrap_err().is(ErrorKind::LoggerClosed));
        assert_eq!(sender.records().len(), 2);
    }
}
