//! Deliverer contract shared by every delivery mode

use super::error::Result;
use super::log_entry::Entry;
use super::stats::DeliveryStatus;

/// Hands entries to a [`Sender`](super::Sender), now or later
///
/// - `deliver` returns `BufferFull` when the queue is full and blocking is
///   disabled, `LoggerClosed` once close has begun, and `Shutdown` when a
///   blocked enqueue is released by shutdown. For queued deliverers `Ok`
///   means "accepted", not "sent".
/// - `flush` returns once every entry accepted before the call has been
///   handed to the sender at least once, or `Timeout`.
/// - `close` flushes, stops accepting entries and releases workers. A second
///   call returns `LoggerClosed`.
/// - `status` never blocks.
pub trait Deliverer: Send + Sync {
    fn deliver(&self, entry: Entry) -> Result<()>;
    fn flush(&self) -> Result<()>;
    fn close(&self) -> Result<()>;
    fn status(&self) -> DeliveryStatus;
}

impl<D: Deliverer + ?Sized> Deliverer for Box<D> {
    fn deliver(&self, entry: Entry) -> Result<()> {
        (**self).deliver(entry)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }

    fn status(&self) -> DeliveryStatus {
        (**self).status()
    }
}
