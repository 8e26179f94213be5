//! # Rust Cloud Logger
//!
//! Ships structured log entries to a remote aggregation backend.
//!
//! ## Features
//!
//! - **Three delivery modes**: synchronous, queued per entry, and queued in
//!   per-job batches
//! - **Bounded queue**: reject or block when full, never grow without limit
//! - **Retries**: fixed-interval retries with failures reported to a handler
//! - **Safe shutdown**: `flush` and `close` drain everything already accepted
//! - **Pluggable**: any [`Sender`] transport and any [`Formatter`]

pub mod core;
pub mod delivery;
pub mod formatters;
pub mod macros;
pub mod senders;
pub mod testing;

pub mod prelude {
    pub use crate::core::{
        Config, Deliverer, DeliveryStatus, Entry, ErrorHandler, ErrorKind, FieldValue, Formatter,
        LogContext, LogLevel, Logger, LoggerBuilder, LoggerError, Result, Sender, SenderConfig,
        TimestampFormat,
    };
    pub use crate::delivery::new_deliverer;
    pub use crate::formatters::{JsonFormatter, PassthroughFormatter, StringFormatter};
}

pub use crate::core::{
    Config, Deliverer, DeliveryStatus, Entry, ErrorHandler, ErrorKind, FieldValue, Formatter,
    LogContext, LogLevel, Logger, LoggerBuilder, LoggerError, Result, Sender, SenderConfig,
    TimestampFormat,
};
pub use delivery::new_deliverer;
pub use formatters::{JsonFormatter, StringFormatter};
