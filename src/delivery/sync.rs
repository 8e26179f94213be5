//! Blocking deliverer without a queue

use crate::core::{Deliverer, DeliveryStatus, Entry, Formatter, LoggerError, Result, Sender, StatsRegistry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Sends each entry on the caller's thread
///
/// Errors from the sender are returned unchanged. `flush` has nothing to do;
/// `close` only stops further deliveries.
pub struct SyncDeliverer {
    sender: Arc<dyn Sender>,
    formatter: Arc<dyn Formatter>,
    stats: StatsRegistry,
    closed: AtomicBool,
}

impl SyncDeliverer {
    pub fn new(sender: Arc<dyn Sender>, formatter: Arc<dyn Formatter>) -> Self {
        Self {
            sender,
            formatter,
            stats: StatsRegistry::new(),
            closed: AtomicBool::new(false),
        }
    }
}

impl Deliverer for SyncDeliverer {
    fn deliver(&self, entry: Entry) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LoggerError::LoggerClosed);
        }

        let formatted;
        let payload = if entry.payload.is_empty() {
            match self.formatter.format(&entry) {
                Ok(bytes) => {
                    formatted = bytes;
                    &formatted
                }
                Err(e) => {
                    self.stats.record_failed(1);
                    return Err(e);
                }
            }
        } else {
            &entry.payload
        };

        match self.sender.send(&entry.job, payload) {
            Ok(()) => {
                self.stats.record_delivered(1);
                Ok(())
            }
            Err(e) => {
                self.stats.record_failed(1);
                Err(e)
            }
        }
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn status(&self) -> DeliveryStatus {
        self.stats.snapshot(0)
    }
}
