//! Delivery engine
//!
//! [`SyncDeliverer`] sends on the caller's thread. [`QueuedDeliverer`] puts
//! entries on a bounded queue drained by a pool of worker threads, either one
//! entry at a time or in per-job batches.

pub mod accumulator;
pub mod flush;
pub mod lifecycle;
pub mod queue;
pub mod queued;
pub mod retry;
pub mod sync;
pub mod worker;

pub use accumulator::{BatchAccumulator, RECORD_OVERHEAD};
pub use flush::{DrainBarrier, FlushController, FlushMarker};
pub use lifecycle::{LifecycleController, LifecycleState};
pub use queue::{AdmissionPolicy, EntryQueue, QueueItem, ShutdownSignal};
pub use queued::QueuedDeliverer;
pub use retry::RetryExecutor;
pub use sync::SyncDeliverer;
pub use worker::{Granularity, WorkerPool};

use crate::core::{Config, Deliverer, ErrorHandler, Formatter, Result, Sender};
use std::sync::Arc;

/// Build the deliverer `config` asks for
///
/// Sync unless `async_delivery` is set; otherwise batched when `batching` is
/// set and per-entry when it is not.
pub fn new_deliverer(
    sender: Arc<dyn Sender>,
    formatter: Arc<dyn Formatter>,
    config: &Config,
    error_handler: ErrorHandler,
) -> Result<Box<dyn Deliverer>> {
    config.validate()?;

    if !config.async_delivery {
        return Ok(Box::new(SyncDeliverer::new(sender, formatter)));
    }

    let deliverer = if config.batching {
        QueuedDeliverer::batched(sender, formatter, config, error_handler)?
    } else {
        QueuedDeliverer::per_entry(sender, formatter, config, error_handler)?
    };
    Ok(Box::new(deliverer))
}
