//! Formatter trait turning entries into payloads

use super::error::Result;
use super::log_entry::Entry;
use std::sync::Arc;

/// Turns entries into the bytes a [`Sender`](super::Sender) transmits
pub trait Formatter: Send + Sync {
    /// Format a single entry
    fn format(&self, entry: &Entry) -> Result<Vec<u8>>;

    /// Format a job's batch of entries into one payload
    ///
    /// The default joins each entry's existing payload with `\n`.
    fn format_batch(&self, _job: &str, entries: &[Entry]) -> Result<Vec<u8>> {
        let capacity = entries.iter().map(|e| e.payload_len() + 1).sum();
        let mut out = Vec::with_capacity(capacity);
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                out.push(b'\n');
            }
            out.extend_from_slice(&entry.payload);
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "formatter"
    }
}

impl<F: Formatter + ?Sized> Formatter for Arc<F> {
    fn format(&self, entry: &Entry) -> Result<Vec<u8>> {
        (**self).format(entry)
    }

    fn format_batch(&self, job: &str, entries: &[Entry]) -> Result<Vec<u8>> {
        (**self).format_batch(job, entries)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Reuses the payload an entry already carries
///
/// The engine's default: entries are formatted once at the call site, and a
/// batch is the newline-joined payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughFormatter;

impl Formatter for PassthroughFormatter {
    fn format(&self, entry: &Entry) -> Result<Vec<u8>> {
        Ok(entry.payload.clone())
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}
