//! Core types and traits

pub mod config;
pub mod deliverer;
pub mod error;
pub mod formatter;
pub mod log_context;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod sender;
pub mod stats;
pub mod timestamp;

pub use config::{Config, SenderConfig, MAX_RETRIES};
pub use deliverer::Deliverer;
pub use error::{noop_error_handler, ErrorHandler, ErrorKind, LoggerError, Result};
pub use formatter::{Formatter, PassthroughFormatter};
pub use log_context::{FieldValue, LogContext};
pub use log_entry::Entry;
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder, DEFAULT_JOB};
pub use sender::Sender;
pub use stats::{DeliveryStatus, StatsRegistry};
pub use timestamp::TimestampFormat;
