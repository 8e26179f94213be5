//! Sender trait for log transports

use super::error::Result;
use std::sync::Arc;

/// Transmits one formatted payload for a job
///
/// Called from worker threads concurrently, so implementations serialise
/// any internal state themselves. A call blocks until the backend has
/// accepted or rejected the payload.
pub trait Sender: Send + Sync {
    fn send(&self, job: &str, payload: &[u8]) -> Result<()>;

    fn name(&self) -> &str {
        "sender"
    }
}

impl<S: Sender + ?Sized> Sender for Arc<S> {
    fn send(&self, job: &str, payload: &[u8]) -> Result<()> {
        (**self).send(job, payload)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<S: Sender + ?Sized> Sender for Box<S> {
    fn send(&self, job: &str, payload: &[u8]) -> Result<()> {
        (**self).send(job, payload)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
