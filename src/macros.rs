//! Logging macros with `format!`-style arguments
//!
//! Each macro expands to a call on the logger and evaluates to its
//! `Result<()>`.
//!
//! # Examples
//!
//! ```
//! use rust_cloud_logger::prelude::*;
//! use rust_cloud_logger::testing::RecordingSender;
//! use rust_cloud_logger::info;
//! use std::sync::Arc;
//!
//! let logger = Logger::builder()
//!     .sender(Arc::new(RecordingSender::new()))
//!     .build()
//!     .unwrap();
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port).unwrap();
//! ```

/// Log a message at the given level.
///
/// # Examples
///
/// ```
/// # use rust_cloud_logger::prelude::*;
/// # use rust_cloud_logger::testing::RecordingSender;
/// # use std::sync::Arc;
/// # let logger = Logger::builder().sender(Arc::new(RecordingSender::new())).build().unwrap();
/// use rust_cloud_logger::log;
/// log!(logger, LogLevel::Error, "Error code: {}", 500).unwrap();
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format!($($arg)+))
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use rust_cloud_logger::prelude::*;
/// # use rust_cloud_logger::testing::RecordingSender;
/// # use std::sync::Arc;
/// # let logger = Logger::builder().sender(Arc::new(RecordingSender::new())).build().unwrap();
/// use rust_cloud_logger::warn;
/// warn!(logger, "Retry attempt {} of {}", 3, 5).unwrap();
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}
