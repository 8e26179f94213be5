//! Bounded entry queue and admission policy
//!
//! One crossbeam channel carries both entries and flush markers, so a marker
//! pushed after a set of entries is received after them by whichever worker
//! takes it.

use super::flush::FlushMarker;
use crate::core::{Entry, LoggerError, Result};
use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, SendTimeoutError, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Item travelling through the queue
#[derive(Debug)]
pub enum QueueItem {
    Entry(Entry),
    Marker(FlushMarker),
}

/// What happens when a producer meets a full queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AdmissionPolicy {
    /// Fail with `BufferFull` and discard the entry
    #[default]
    Reject,
    /// Wait for space, or until shutdown is signalled
    Block,
}

impl AdmissionPolicy {
    pub fn from_block_on_full(block_on_full: bool) -> Self {
        if block_on_full {
            AdmissionPolicy::Block
        } else {
            AdmissionPolicy::Reject
        }
    }
}

/// One-shot broadcast that releases everything waiting on shutdown
///
/// Triggering drops the only sender of a zero-capacity channel, which wakes
/// every `select!` and `recv_timeout` on the receiver at once.
#[derive(Debug)]
pub struct ShutdownSignal {
    trigger: Mutex<Option<crossbeam_channel::Sender<()>>>,
    receiver: Receiver<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            trigger: Mutex::new(Some(tx)),
            receiver: rx,
        }
    }

    /// Fire the signal. Idempotent.
    pub fn trigger(&self) {
        self.trigger.lock().take();
    }

    pub fn is_triggered(&self) -> bool {
        self.trigger.lock().is_none()
    }

    /// Receiver that becomes ready (disconnected) once the signal fires
    pub fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }

    /// Sleep for `timeout` unless the signal fires first
    ///
    /// Returns `true` if the signal has fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if timeout.is_zero() {
            return self.is_triggered();
        }
        matches!(
            self.receiver.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded FIFO shared by producers and workers
pub struct EntryQueue {
    sender: RwLock<Option<crossbeam_channel::Sender<QueueItem>>>,
    receiver: Receiver<QueueItem>,
    capacity: usize,
    policy: AdmissionPolicy,
    /// Markers pushed but not yet taken by a worker
    pending_markers: AtomicUsize,
}

impl EntryQueue {
    pub fn new(capacity: usize, policy: AdmissionPolicy) -> Self {
        let (tx, rx) = bounded(capacity);
        Self {
            sender: RwLock::new(Some(tx)),
            receiver: rx,
            capacity,
            policy,
            pending_markers: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn policy(&self) -> AdmissionPolicy {
        self.policy
    }

    /// Receiver handle for a worker thread
    pub fn receiver(&self) -> Receiver<QueueItem> {
        self.receiver.clone()
    }

    /// Entries currently waiting, never more than the capacity
    pub fn buffered(&self) -> usize {
        self.receiver
            .len()
            .saturating_sub(self.pending_markers.load(Ordering::Acquire))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }

    /// Enqueue without waiting
    ///
    /// On `Full` the item is handed back so the caller can apply the
    /// admission policy after releasing its own locks.
    pub fn try_push(&self, item: QueueItem) -> std::result::Result<(), TrySendError<QueueItem>> {
        match self.sender.read().as_ref() {
            Some(tx) => tx.try_send(item),
            None => Err(TrySendError::Disconnected(item)),
        }
    }

    /// Wait for space, giving up when `shutdown` fires
    ///
    /// Holds its own clone of the channel sender while waiting, so the queue
    /// can be closed concurrently; the shutdown signal is what releases it.
    pub fn push_blocking(&self, item: QueueItem, shutdown: &ShutdownSignal) -> Result<()> {
        let tx = match self.sender.read().as_ref() {
            Some(tx) => tx.clone(),
            None => return Err(LoggerError::LoggerClosed),
        };

        if shutdown.is_triggered() {
            return Err(LoggerError::shutdown("enqueue interrupted by shutdown"));
        }

        select! {
            send(tx, item) -> res => res.map_err(|_| LoggerError::LoggerClosed),
            recv(shutdown.receiver()) -> _ => {
                Err(LoggerError::shutdown("enqueue interrupted by shutdown"))
            }
        }
    }

    /// Enqueue a flush marker, waiting until `deadline` for space
    pub fn push_marker(&self, marker: FlushMarker, deadline: Instant) -> Result<()> {
        let tx = match self.sender.read().as_ref() {
            Some(tx) => tx.clone(),
            None => return Err(LoggerError::LoggerClosed),
        };

        // Counted before the send so `buffered` can only under-report.
        self.pending_markers.fetch_add(1, Ordering::AcqRel);
        let remaining = deadline.saturating_duration_since(Instant::now());
        match tx.send_timeout(QueueItem::Marker(marker), remaining) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.pending_markers.fetch_sub(1, Ordering::AcqRel);
                match e {
                    SendTimeoutError::Timeout(_) => {
                        Err(LoggerError::timeout("flush marker enqueue", remaining))
                    }
                    SendTimeoutError::Disconnected(_) => Err(LoggerError::LoggerClosed),
                }
            }
        }
    }

    /// Called by a worker once it has received a marker
    pub fn marker_taken(&self) {
        self.pending_markers.fetch_sub(1, Ordering::AcqRel);
    }

    /// Stop accepting items; workers exit once the backlog is drained
    pub fn close(&self) {
        self.sender.write().take();
    }
}

impl std::fmt::Debug for EntryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryQueue")
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .field("buffered", &self.buffered())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorKind, LogLevel};
    use std::sync::Arc;
    use std::thread;

    fn item(msg: &str) -> QueueItem {
        QueueItem::Entry(Entry::new("test", LogLevel::Info, msg))
    }

    #[test]
    fn test_try_push_until_full() {
        let queue = EntryQueue::new(2, AdmissionPolicy::Reject);
        assert!(queue.try_push(item("1")).is_ok());
        assert!(queue.try_push(item("2")).is_ok());
        assert!(matches!(queue.try_push(item("3")), Err(TrySendError::Full(_))));
        assert_eq!(queue.buffered(), 2);
    }

    #[test]
    fn test_closed_queue_rejects() {
        let queue = EntryQueue::new(2, AdmissionPolicy::Reject);
        queue.close();
        assert!(queue.is_closed());
        assert!(matches!(
            queue.try_push(item("1")),
            Err(TrySendError::Disconnected(_))
        ));
    }

    #[test]
    fn test_blocking_push_released_by_shutdown() {
        let queue = Arc::new(EntryQueue::new(1, AdmissionPolicy::Block));
        let shutdown = Arc::new(ShutdownSignal::new());
        queue.try_push(item("fill")).unwrap();

        let handle = {
            let queue = Arc::clone(&queue);
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || queue.push_blocking(item("blocked"), &shutdown))
        };

        thread::sleep(Duration::from_millis(50));
        shutdown.trigger();

        let err = handle.join().unwrap().unwrap_err();
        assert!(err.is(ErrorKind::Shutdown));
        assert_eq!(queue.buffered(), 1);
    }

    #[test]
    fn test_blocking_push_completes_when_space_frees() {
        let queue = Arc::new(EntryQueue::new(1, AdmissionPolicy::Block));
        let shutdown = Arc::new(ShutdownSignal::new());
        queue.try_push(item("fill")).unwrap();
        let receiver = queue.receiver();

        let handle = {
            let queue = Arc::clone(&queue);
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || queue.push_blocking(item("waiting"), &shutdown))
        };

        thread::sleep(Duration::from_millis(20));
        assert!(receiver.recv().is_ok());
        assert!(handle.join().unwrap().is_ok());
        assert_eq!(queue.buffered(), 1);
    }

    #[test]
    fn test_shutdown_signal_wait() {
        let signal = ShutdownSignal::new();
        assert!(!signal.wait_timeout(Duration::from_millis(5)));
        signal.trigger();
        signal.trigger();
        assert!(signal.is_triggered());
        assert!(signal.wait_timeout(Duration::from_secs(5)));
    }

    #[test]
    fn test_policy_from_flag() {
        assert_eq!(AdmissionPolicy::from_block_on_full(true), AdmissionPolicy::Block);
        assert_eq!(AdmissionPolicy::from_block_on_full(false), AdmissionPolicy::Reject);
    }
}
