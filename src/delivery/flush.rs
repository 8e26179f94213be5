//! Flush markers and the drain barrier
//!
//! # Ordering
//!
//! Flushing relies on one property of the bounded crossbeam channel: it is a
//! single FIFO shared by every sender and receiver. A marker sent after
//! entries `E1..En` is therefore received after all of them, by whichever
//! worker happens to take it.
//!
//! With several workers a single marker is not enough, because another
//! worker may still hold entries it dequeued earlier. `flush` pushes one
//! marker per worker, all bound to the same [`DrainBarrier`]. A worker that
//! takes a marker sends everything it holds, then waits at the barrier until
//! every marker has been taken. Blocked there, it cannot take a second
//! marker, so each worker takes exactly one. When the barrier opens, every
//! worker has handed everything it dequeued before its marker to the sender.

use super::queue::EntryQueue;
use crate::core::{LoggerError, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct BarrierState {
    remaining: usize,
    cancelled: bool,
}

/// Rendezvous between one flushing caller and every worker
#[derive(Debug)]
pub struct DrainBarrier {
    state: Mutex<BarrierState>,
    cond: Condvar,
}

impl DrainBarrier {
    pub fn new(parties: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(BarrierState {
                remaining: parties,
                cancelled: false,
            }),
            cond: Condvar::new(),
        })
    }

    /// Worker side: record arrival, then wait for the other workers
    pub fn arrive_and_wait(&self) {
        let mut state = self.state.lock();
        state.remaining = state.remaining.saturating_sub(1);
        if state.remaining == 0 {
            self.cond.notify_all();
            return;
        }
        while state.remaining > 0 && !state.cancelled {
            self.cond.wait(&mut state);
        }
    }

    /// Caller side: wait until every worker arrived
    ///
    /// Returns `false` on deadline or cancellation.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut state = self.state.lock();
        while state.remaining > 0 && !state.cancelled {
            if self.cond.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.remaining == 0
    }

    /// Release every waiter without completing the drain
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.cancelled = true;
        self.cond.notify_all();
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().remaining == 0
    }
}

/// Queue item asking the receiving worker to drain its groups
#[derive(Debug)]
pub struct FlushMarker {
    barrier: Arc<DrainBarrier>,
}

impl FlushMarker {
    pub fn new(barrier: Arc<DrainBarrier>) -> Self {
        Self { barrier }
    }

    /// Report the drain done and wait for the remaining workers
    pub fn complete(self) {
        self.barrier.arrive_and_wait();
    }
}

/// Serialises flushes and tracks their barriers
#[derive(Debug, Default)]
pub struct FlushController {
    push_lock: Mutex<()>,
    outstanding: Mutex<Vec<Weak<DrainBarrier>>>,
}

impl FlushController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything enqueued before the call through `workers` workers
    ///
    /// If not every marker can be enqueued before the deadline, the barrier
    /// is cancelled and `Timeout` returned. Timing out while waiting leaves
    /// the drain running.
    pub fn flush(&self, queue: &EntryQueue, workers: usize, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let barrier = DrainBarrier::new(workers);

        {
            let _guard = self.push_lock.lock();
            self.track(&barrier);
            for _ in 0..workers {
                if let Err(e) = queue.push_marker(FlushMarker::new(Arc::clone(&barrier)), deadline)
                {
                    barrier.cancel();
                    tracing::debug!(error = %e, "flush markers could not be enqueued");
                    return Err(match e {
                        LoggerError::LoggerClosed => e,
                        _ => LoggerError::timeout("flush", timeout),
                    });
                }
            }
        }

        if barrier.wait_until(deadline) {
            Ok(())
        } else {
            Err(LoggerError::timeout("flush", timeout))
        }
    }

    /// Release workers still waiting on any barrier
    pub fn cancel_outstanding(&self) {
        for barrier in self.outstanding.lock().drain(..) {
            if let Some(barrier) = barrier.upgrade() {
                barrier.cancel();
            }
        }
    }

    fn track(&self, barrier: &Arc<DrainBarrier>) {
        let mut outstanding = self.outstanding.lock();
        outstanding.retain(|b| b.upgrade().is_some_and(|b| !b.is_open()));
        outstanding.push(Arc::downgrade(barrier));
    }
}
