//! Error types for the delivery engine
//!
//! Every error belongs to one [`ErrorKind`], which callers can check without
//! looking at message text.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, LoggerError>;

/// Category of a [`LoggerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A log entry or batch could not be formatted
    InvalidFormat,
    /// The transport could not reach the backend
    ConnectionFailed,
    /// The backend answered with an error
    ResponseError,
    /// A caller supplied invalid parameters or configuration
    InvalidInput,
    /// The delivery queue is full and blocking is disabled
    BufferFull,
    /// An operation did not complete within its deadline
    Timeout,
    /// Shutdown interrupted or failed to complete an operation
    Shutdown,
    /// The deliverer has been closed
    LoggerClosed,
    /// A background delivery failed after the caller was answered
    ProcessingFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidFormat => "InvalidFormat",
            ErrorKind::ConnectionFailed => "ConnectionFailed",
            ErrorKind::ResponseError => "ResponseError",
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::BufferFull => "BufferFull",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Shutdown => "Shutdown",
            ErrorKind::LoggerClosed => "LoggerClosed",
            ErrorKind::ProcessingFailed => "ProcessingFailed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Formatter rejected an entry or batch
    #[error("invalid log format ({format_type}): {message}")]
    InvalidFormat {
        format_type: String,
        message: String,
    },

    /// JSON serialization error
    #[error("invalid log format (JSON): {0}")]
    Json(#[from] serde_json::Error),

    /// Connection to the backend failed
    #[error("connection to '{endpoint}' failed: {message}")]
    ConnectionFailed { endpoint: String, message: String },

    /// Transport-level IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend answered with an error status
    #[error("backend responded with status {status}: {body}")]
    ResponseError { status: u16, body: String },

    /// Invalid input parameters
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration with details
    #[error("invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Queue full, entry discarded
    #[error("log buffer is full ({capacity} entries)")]
    BufferFull { capacity: usize },

    /// Operation timed out
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Shutdown interrupted or did not finish an operation
    #[error("error during shutdown: {0}")]
    Shutdown(String),

    /// Deliverer already closed
    #[error("logger is closed")]
    LoggerClosed,

    /// Background delivery failure, reported through the error handler
    #[error("processing failed: {context}")]
    ProcessingFailed {
        context: String,
        #[source]
        source: Option<Box<LoggerError>>,
    },
}

impl LoggerError {
    /// The category this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoggerError::InvalidFormat { .. } | LoggerError::Json(_) => ErrorKind::InvalidFormat,
            LoggerError::ConnectionFailed { .. } | LoggerError::Io(_) => {
                ErrorKind::ConnectionFailed
            }
            LoggerError::ResponseError { .. } => ErrorKind::ResponseError,
            LoggerError::InvalidInput(_) | LoggerError::InvalidConfiguration { .. } => {
                ErrorKind::InvalidInput
            }
            LoggerError::BufferFull { .. } => ErrorKind::BufferFull,
            LoggerError::Timeout { .. } => ErrorKind::Timeout,
            LoggerError::Shutdown(_) => ErrorKind::Shutdown,
            LoggerError::LoggerClosed => ErrorKind::LoggerClosed,
            LoggerError::ProcessingFailed { .. } => ErrorKind::ProcessingFailed,
        }
    }

    /// Check whether this error is of the given kind
    #[inline]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    /// Create a formatter error
    pub fn format(format_type: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidFormat {
            format_type: format_type.into(),
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::ConnectionFailed {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a backend response error
    pub fn response(status: u16, body: impl Into<String>) -> Self {
        LoggerError::ResponseError {
            status,
            body: body.into(),
        }
    }

    /// Create an invalid input error
    pub fn input<S: Into<String>>(msg: S) -> Self {
        LoggerError::InvalidInput(msg.into())
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a buffer full error
    pub fn buffer_full(capacity: usize) -> Self {
        LoggerError::BufferFull { capacity }
    }

    /// Create a timeout error
    pub fn timeout(operation: &'static str, after: Duration) -> Self {
        LoggerError::Timeout { operation, after }
    }

    /// Create a shutdown error
    pub fn shutdown<S: Into<String>>(msg: S) -> Self {
        LoggerError::Shutdown(msg.into())
    }

    /// Wrap a background failure
    pub fn processing_failed(context: impl Into<String>, source: Option<LoggerError>) -> Self {
        LoggerError::ProcessingFailed {
            context: context.into(),
            source: source.map(Box::new),
        }
    }
}

/// Callback receiving errors from the background delivery path
///
/// Workers call it after a payload exhausts its retries or a batch cannot be
/// formatted. It runs on a worker thread and must not block for long.
pub type ErrorHandler = Arc<dyn Fn(&LoggerError) + Send + Sync>;

/// Handler that ignores every error
pub fn noop_error_handler() -> ErrorHandler {
    Arc::new(|_| {})
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_kinds() {
        assert_eq!(LoggerError::buffer_full(10).kind(), ErrorKind::BufferFull);
        assert_eq!(LoggerError::LoggerClosed.kind(), ErrorKind::LoggerClosed);
        assert_eq!(
            LoggerError::config("Config", "queue_size must be > 0").kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            LoggerError::connection("127.0.0.1:3100", "refused").kind(),
            ErrorKind::ConnectionFailed
        );

        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        assert!(LoggerError::from(io_err).is(ErrorKind::ConnectionFailed));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::buffer_full(1000);
        assert_eq!(err.to_string(), "log buffer is full (1000 entries)");

        let err = LoggerError::timeout("flush", Duration::from_millis(250));
        assert_eq!(err.to_string(), "flush timed out after 250ms");

        let err = LoggerError::response(503, "overloaded");
        assert_eq!(
            err.to_string(),
            "backend responded with status 503: overloaded"
        );
    }

    #[test]
    fn test_processing_failed_keeps_source() {
        let cause = LoggerError::connection("loki", "reset by peer");
        let err = LoggerError::processing_failed("sending batch for job 'api'", Some(cause));

        assert!(err.is(ErrorKind::ProcessingFailed));
        let source = err.source().expect("source should be kept");
        assert!(source.to_string().contains("reset by peer"));
    }

    #[test]
    fn test_noop_handler_accepts_errors() {
        let handler = noop_error_handler();
        handler(&LoggerError::LoggerClosed);
    }
}
