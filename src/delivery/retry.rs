//! Bounded retry of outgoing payloads

use super::queue::ShutdownSignal;
use crate::core::{ErrorHandler, LoggerError, Result, Sender, StatsRegistry};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// Sends one payload with up to `max_retries` further attempts
///
/// Waits between attempts end early once shutdown is signalled, but the
/// attempts themselves are still made.
pub struct RetryExecutor {
    sender: Arc<dyn Sender>,
    max_retries: u32,
    retry_interval: Duration,
    stats: Arc<StatsRegistry>,
    error_handler: ErrorHandler,
    shutdown: Arc<ShutdownSignal>,
}

impl RetryExecutor {
    pub fn new(
        sender: Arc<dyn Sender>,
        max_retries: u32,
        retry_interval: Duration,
        stats: Arc<StatsRegistry>,
        error_handler: ErrorHandler,
        shutdown: Arc<ShutdownSignal>,
    ) -> Self {
        Self {
            sender,
            max_retries,
            retry_interval,
            stats,
            error_handler,
            shutdown,
        }
    }

    /// Deliver `payload` carrying `records` entries for `job`
    ///
    /// Returns `true` on success. On exhaustion the records are counted as
    /// failed and the error handler is called once.
    pub fn execute(&self, job: &str, payload: &[u8], records: u64) -> bool {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                self.stats.record_retry();
                if !self.shutdown.is_triggered() {
                    self.shutdown.wait_timeout(self.retry_interval);
                }
            }

            match self.attempt(job, payload) {
                Ok(()) => {
                    self.stats.record_delivered(records);
                    return true;
                }
                Err(e) => {
                    tracing::debug!(
                        job,
                        attempt = attempt.saturating_add(1),
                        error = %e,
                        "send attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        self.stats.record_failed(records);
        let err = LoggerError::processing_failed(
            format!(
                "sending {} record(s) for job '{}' failed after {} attempt(s)",
                records,
                job,
                self.max_retries.saturating_add(1)
            ),
            last_error,
        );
        tracing::warn!(job, records, error = %err, "giving up on payload");
        self.report(&err);
        false
    }

    /// Forward a background error to the handler
    pub fn report(&self, err: &LoggerError) {
        (self.error_handler)(err);
    }

    pub fn stats(&self) -> &StatsRegistry {
        &self.stats
    }

    /// One send, with a panicking sender turned into an error
    fn attempt(&self, job: &str, payload: &[u8]) -> Result<()> {
        match catch_unwind(AssertUnwindSafe(|| self.sender.send(job, payload))) {
            Ok(result) => result,
            Err(panic_info) => {
                let panic_msg = panic_message(panic_info.as_ref());
                tracing::error!(sender = self.sender.name(), panic = %panic_msg, "sender panicked");
                Err(LoggerError::processing_failed(
                    format!("sender '{}' panicked: {}", self.sender.name(), panic_msg),
                    None,
                ))
            }
        }
    }
}

/// Text of a caught panic payload
pub(crate) fn panic_message(panic_info: &(dyn Any + Send + 'static)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
