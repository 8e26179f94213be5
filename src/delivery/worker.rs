//! Worker threads draining the entry queue

use super::accumulator::{split_by_size, BatchAccumulator};
use super::queue::{EntryQueue, QueueItem};
use super::retry::{panic_message, RetryExecutor};
use crate::core::{Entry, Formatter, LoggerError, Result};
use crossbeam_channel::{never, select, tick, Receiver};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How a worker turns dequeued entries into sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Every entry is sent with its own payload and retried on its own
    PerEntry,
    /// Entries are grouped per job and sent as batches
    Batched { batch_size: usize },
}

/// Formats groups and entries and hands them to the retry executor
pub struct Dispatcher {
    formatter: Arc<dyn Formatter>,
    retry: RetryExecutor,
    max_payload_size: usize,
}

impl Dispatcher {
    pub fn new(formatter: Arc<dyn Formatter>, retry: RetryExecutor, max_payload_size: usize) -> Self {
        Self {
            formatter,
            retry,
            max_payload_size,
        }
    }

    /// Send a single entry, formatting it first if it carries no payload
    pub fn dispatch_entry(&self, entry: Entry) {
        if !entry.payload.is_empty() {
            self.retry.execute(&entry.job, &entry.payload, 1);
            return;
        }
        self.format_and_send(&entry);
    }

    /// Send a job's group, split so no payload grows past the size limit
    ///
    /// A chunk the formatter rejects is reported, then its entries are sent
    /// one by one.
    pub fn dispatch_group(&self, job: &str, entries: Vec<Entry>) {
        for chunk in split_by_size(entries, self.max_payload_size) {
            let formatted = self.contain("format_batch", || self.formatter.format_batch(job, &chunk));
            match formatted {
                Ok(payload) => {
                    self.retry.execute(job, &payload, chunk.len() as u64);
                }
                Err(e) => {
                    self.retry.report(&LoggerError::processing_failed(
                        format!(
                            "formatting batch of {} record(s) for job '{}'",
                            chunk.len(),
                            job
                        ),
                        Some(e),
                    ));
                    for entry in &chunk {
                        self.format_and_send(entry);
                    }
                }
            }
        }
    }

    fn format_and_send(&self, entry: &Entry) {
        match self.contain("format", || self.formatter.format(entry)) {
            Ok(payload) => {
                self.retry.execute(&entry.job, &payload, 1);
            }
            Err(e) => {
                self.retry.stats().record_failed(1);
                self.retry.report(&LoggerError::processing_failed(
                    format!("formatting entry for job '{}'", entry.job),
                    Some(e),
                ));
            }
        }
    }

    /// Run a formatter call, turning a panic into an error
    ///
    /// A panicking formatter must not take the worker thread down with it.
    fn contain<F>(&self, call: &str, f: F) -> Result<Vec<u8>>
    where
        F: FnOnce() -> Result<Vec<u8>>,
    {
        catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|panic_info| {
            let panic_msg = panic_message(panic_info.as_ref());
            tracing::error!(formatter = self.formatter.name(), call, panic = %panic_msg, "formatter panicked");
            Err(LoggerError::processing_failed(
                format!("formatter '{}' panicked in {}: {}", self.formatter.name(), call, panic_msg),
                None,
            ))
        })
    }
}

struct WorkerContext {
    queue: Arc<EntryQueue>,
    dispatcher: Dispatcher,
    granularity: Granularity,
    flush_interval: Duration,
}

/// Fixed set of worker threads sharing one queue
pub struct WorkerPool {
    handles: Mutex<Vec<thread::JoinHandle<()>>>,
    size: usize,
}

impl WorkerPool {
    /// Start `size` workers on `queue`
    pub fn spawn(
        size: usize,
        queue: Arc<EntryQueue>,
        dispatcher: Dispatcher,
        granularity: Granularity,
        flush_interval: Duration,
    ) -> Result<Self> {
        let context = Arc::new(WorkerContext {
            queue,
            dispatcher,
            granularity,
            flush_interval,
        });

        let mut handles = Vec::with_capacity(size);
        for id in 0..size {
            let context = Arc::clone(&context);
            let receiver = context.queue.receiver();
            let handle = thread::Builder::new()
                .name(format!("cloudlog-worker-{}", id))
                .spawn(move || run_worker(id, receiver, &context))?;
            handles.push(handle);
        }

        Ok(Self {
            handles: Mutex::new(handles),
            size,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Wait for every worker to exit, up to `timeout` in total
    ///
    /// Workers still running at the deadline are left detached.
    pub fn join(&self, timeout: Duration) -> Result<()> {
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        let start = Instant::now();
        let mut pending = handles;

        loop {
            let (finished, running): (Vec<_>, Vec<_>) =
                pending.into_iter().partition(|h| h.is_finished());

            for handle in finished {
                if let Err(e) = handle.join() {
                    tracing::error!(panic = ?e, "worker thread panicked");
                }
            }

            if running.is_empty() {
                return Ok(());
            }

            if start.elapsed() >= timeout {
                tracing::warn!(
                    running = running.len(),
                    ?timeout,
                    "workers did not finish before the shutdown timeout"
                );
                return Err(LoggerError::shutdown(format!(
                    "{} worker(s) still running after {:?}",
                    running.len(),
                    timeout
                )));
            }

            pending = running;
            thread::sleep(Duration::from_millis(10));
        }
    }
}

fn run_worker(id: usize, receiver: Receiver<QueueItem>, context: &WorkerContext) {
    tracing::debug!(worker = id, "delivery worker started");

    let ticker = match context.granularity {
        Granularity::Batched { .. } => tick(context.flush_interval),
        Granularity::PerEntry => never(),
    };
    let mut accumulator = match context.granularity {
        Granularity::Batched { batch_size } => BatchAccumulator::new(batch_size),
        Granularity::PerEntry => BatchAccumulator::new(1),
    };

    loop {
        select! {
            recv(receiver) -> item => match item {
                Ok(QueueItem::Entry(entry)) => match context.granularity {
                    Granularity::PerEntry => context.dispatcher.dispatch_entry(entry),
                    Granularity::Batched { .. } => {
                        if let Some((job, group)) = accumulator.push(entry) {
                            context.dispatcher.dispatch_group(&job, group);
                        }
                    }
                },
                Ok(QueueItem::Marker(marker)) => {
                    context.queue.marker_taken();
                    drain(&mut accumulator, &context.dispatcher);
                    marker.complete();
                }
                Err(_) => {
                    drain(&mut accumulator, &context.dispatcher);
                    break;
                }
            },
            recv(ticker) -> _ => drain(&mut accumulator, &context.dispatcher),
        }
    }

    tracing::debug!(worker = id, "delivery worker stopped");
}

fn drain(accumulator: &mut BatchAccumulator, dispatcher: &Dispatcher) {
    for (job, group) in accumulator.drain_all() {
        dispatcher.dispatch_group(&job, group);
    }
}
