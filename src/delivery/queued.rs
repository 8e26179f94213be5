//! Queue-backed deliverer shared by the async and batch modes

use super::flush::FlushController;
use super::lifecycle::{LifecycleController, LifecycleState};
use super::queue::{AdmissionPolicy, EntryQueue, QueueItem, ShutdownSignal};
use super::retry::RetryExecutor;
use super::worker::{Dispatcher, Granularity, WorkerPool};
use crate::core::{
    Config, Deliverer, DeliveryStatus, Entry, ErrorHandler, Formatter, LoggerError, Result,
    Sender, StatsRegistry,
};
use crossbeam_channel::TrySendError;
use std::sync::Arc;
use std::time::Duration;

/// Deliverer that returns once an entry is queued
///
/// Background workers drain the queue. With [`Granularity::PerEntry`] each
/// entry is sent on its own; with [`Granularity::Batched`] entries are
/// grouped per job and sent as batches.
pub struct QueuedDeliverer {
    queue: Arc<EntryQueue>,
    shutdown: Arc<ShutdownSignal>,
    flush: FlushController,
    lifecycle: LifecycleController,
    workers: WorkerPool,
    stats: Arc<StatsRegistry>,
    shutdown_timeout: Duration,
}

impl QueuedDeliverer {
    /// Validate `config`, then start the workers
    pub fn new(
        sender: Arc<dyn Sender>,
        formatter: Arc<dyn Formatter>,
        config: &Config,
        error_handler: ErrorHandler,
        granularity: Granularity,
    ) -> Result<Self> {
        config.validate()?;

        let queue = Arc::new(EntryQueue::new(
            config.queue_size,
            AdmissionPolicy::from_block_on_full(config.block_on_full),
        ));
        let shutdown = Arc::new(ShutdownSignal::new());
        let stats = Arc::new(StatsRegistry::new());

        let retry = RetryExecutor::new(
            sender,
            config.max_retries,
            config.retry_interval,
            Arc::clone(&stats),
            error_handler,
            Arc::clone(&shutdown),
        );
        let dispatcher = Dispatcher::new(formatter, retry, config.max_payload_size);
        let workers = WorkerPool::spawn(
            config.workers,
            Arc::clone(&queue),
            dispatcher,
            granularity,
            config.flush_interval,
        )?;

        Ok(Self {
            queue,
            shutdown,
            flush: FlushController::new(),
            lifecycle: LifecycleController::new(),
            workers,
            stats,
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    /// Per-entry granularity
    pub fn per_entry(
        sender: Arc<dyn Sender>,
        formatter: Arc<dyn Formatter>,
        config: &Config,
        error_handler: ErrorHandler,
    ) -> Result<Self> {
        Self::new(sender, formatter, config, error_handler, Granularity::PerEntry)
    }

    /// Per-job batch granularity
    pub fn batched(
        sender: Arc<dyn Sender>,
        formatter: Arc<dyn Formatter>,
        config: &Config,
        error_handler: ErrorHandler,
    ) -> Result<Self> {
        let granularity = Granularity::Batched {
            batch_size: config.batch_size,
        };
        Self::new(sender, formatter, config, error_handler, granularity)
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    fn reject(&self) -> LoggerError {
        let dropped = self.stats.record_dropped();

        // First drop and every thousandth after it
        if dropped == 0 || (dropped + 1) % 1000 == 0 {
            tracing::warn!(
                dropped = dropped + 1,
                capacity = self.queue.capacity(),
                "delivery queue full, entries dropped"
            );
        }

        LoggerError::buffer_full(self.queue.capacity())
    }
}

impl Deliverer for QueuedDeliverer {
    fn deliver(&self, entry: Entry) -> Result<()> {
        let admitted = self.lifecycle.admit()?;

        match self.queue.try_push(QueueItem::Entry(entry)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(item)) => match self.queue.policy() {
                AdmissionPolicy::Reject => Err(self.reject()),
                AdmissionPolicy::Block => {
                    // Waiting must not hold off close; shutdown releases us.
                    drop(admitted);
                    self.queue.push_blocking(item, &self.shutdown)
                }
            },
            Err(TrySendError::Disconnected(_)) => Err(LoggerError::LoggerClosed),
        }
    }

    fn flush(&self) -> Result<()> {
        if self.lifecycle.state() == LifecycleState::Closed {
            return Err(LoggerError::LoggerClosed);
        }
        self.flush
            .flush(&self.queue, self.workers.size(), self.shutdown_timeout)
    }

    fn close(&self) -> Result<()> {
        let result = self.lifecycle.close_with(
            || {
                self.flush
                    .flush(&self.queue, self.workers.size(), self.shutdown_timeout)
            },
            || {
                self.shutdown.trigger();
                self.flush.cancel_outstanding();
                self.queue.close();
                self.workers.join(self.shutdown_timeout)
            },
        );

        if matches!(&result, Err(LoggerError::LoggerClosed)) {
            return result;
        }

        let status = self.status();
        if status.dropped > 0 {
            tracing::warn!(
                dropped = status.dropped,
                drop_rate = %format!("{:.2}%", status.drop_rate()),
                "deliverer closed with dropped entries"
            );
        }
        tracing::debug!(%status, "deliverer closed");

        result
    }

    fn status(&self) -> DeliveryStatus {
        self.stats.snapshot(self.queue.buffered() as u64)
    }
}

impl Drop for QueuedDeliverer {
    fn drop(&mut self) {
        if self.lifecycle.state() == LifecycleState::Open {
            if let Err(e) = self.close() {
                tracing::warn!(error = %e, "close on drop did not complete cleanly");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{noop_error_handler, ErrorKind, LogLevel, PassthroughFormatter};
    use crate::testing::RecordingSender;

    fn config() -> Config {
        Config::default()
            .with_async(true)
            .with_flush_interval(Duration::from_secs(60))
            .with_retry_interval(Duration::from_millis(1))
            .with_shutdown_timeout(Duration::from_secs(5))
    }

    fn entry(msg: &str) -> Entry {
        Entry::new("api", LogLevel::Info, msg).with_payload(msg.as_bytes().to_vec())
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = QueuedDeliverer::batched(
            Arc::new(RecordingSender::new()),
            Arc::new(PassthroughFormatter),
            &config().with_workers(0),
            noop_error_handler(),
        );
        assert!(result.err().is_some_and(|e| e.is(ErrorKind::InvalidInput)));
    }

    #[test]
    fn test_flush_sends_partial_batch() {
        let sender = Arc::new(RecordingSender::new());
        let deliverer = QueuedDeliverer::batched(
            sender.clone(),
            Arc::new(PassthroughFormatter),
            &config(),
            noop_error_handler(),
        )
        .unwrap();

        deliverer.deliver(entry("one")).unwrap();
        deliverer.deliver(entry("two")).unwrap();
        deliverer.flush().unwrap();

        assert_eq!(sender.call_count(), 1);
        assert_eq!(sender.records(), vec!["one", "two"]);
        assert_eq!(deliverer.status().delivered, 2);
        assert_eq!(deliverer.status().buffered, 0);
    }

    #[test]
    fn test_close_twice() {
        let deliverer = QueuedDeliverer::per_entry(
            Arc::new(RecordingSender::new()),
            Arc::new(PassthroughFormatter),
            &config(),
            noop_error_handler(),
        )
        .unwrap();

        assert!(deliverer.close().is_ok());
        assert_eq!(deliverer.state(), LifecycleState::Closed);
        assert!(deliverer.close().unwrap_err().is(ErrorKind::LoggerClosed));
        assert!(deliverer.flush().unwrap_err().is(ErrorKind::LoggerClosed));
        assert!(deliverer
            .deliver(entry("late"))
            .unwrap_err()
            .is(ErrorKind::LoggerClosed));
    }

    #[test]
    fn test_drop_closes_and_drains() {
        let sender = Arc::new(RecordingSender::new());
        {
            let deliverer = QueuedDeliverer::batched(
                sender.clone(),
                Arc::new(PassthroughFormatter),
                &config(),
                noop_error_handler(),
            )
            .unwrap();
            deliverer.deliver(entry("kept")).unwrap();
        }
        assert_eq!(sender.records(), vec!["kept"]);
    }
}
