//! Test helpers
//!
//! [`RecordingSender`] stands in for a real transport: it records every
//! call, can fail on a schedule, can be slowed down, and parses JSON payloads
//! back into [`CapturedRecord`]s for assertions.

use crate::core::{LoggerError, Result, Sender};
use parking_lot::{Condvar, Mutex};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

/// When a [`RecordingSender`] fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMode {
    #[default]
    Never,
    /// Fail the first `n` calls, then succeed
    FirstN(usize),
    Always,
}

/// One call made to the sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPayload {
    pub job: String,
    pub payload: Vec<u8>,
    pub succeeded: bool,
}

impl SentPayload {
    /// Payload split into its newline-separated records
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.payload)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// A delivered JSON record, split into its well-known parts
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedRecord {
    pub job: String,
    pub level: Option<String>,
    pub message: Option<String>,
    /// Every other field of the object
    pub data: Map<String, Value>,
}

#[derive(Debug, Default)]
struct Recorded {
    calls: Vec<SentPayload>,
}

/// Sender that records instead of transmitting
#[derive(Debug, Default)]
pub struct RecordingSender {
    recorded: Mutex<Recorded>,
    changed: Condvar,
    failure: FailureMode,
    delay: Option<Duration>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_failure(mut self, mode: FailureMode) -> Self {
        self.failure = mode;
        self
    }

    /// Sleep this long inside every call
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every call, failed ones included
    pub fn calls(&self) -> Vec<SentPayload> {
        self.recorded.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.recorded.lock().calls.len()
    }

    /// Successful calls only
    pub fn delivered(&self) -> Vec<SentPayload> {
        self.recorded
            .lock()
            .calls
            .iter()
            .filter(|c| c.succeeded)
            .cloned()
            .collect()
    }

    /// Every record of every successful call, in arrival order
    pub fn records(&self) -> Vec<String> {
        self.delivered().iter().flat_map(SentPayload::lines).collect()
    }

    /// Successful records parsed as JSON objects; non-JSON lines are skipped
    pub fn captured(&self) -> Vec<CapturedRecord> {
        let mut out = Vec::new();
        for call in self.delivered() {
            for line in call.lines() {
                if let Ok(Value::Object(mut data)) = serde_json::from_str::<Value>(&line) {
                    let level = take_string(&mut data, "level");
                    let message = take_string(&mut data, "message");
                    data.remove("job");
                    out.push(CapturedRecord {
                        job: call.job.clone(),
                        level,
                        message,
                        data,
                    });
                }
            }
        }
        out
    }

    /// Whether a record with this message was delivered
    pub fn contains_message(&self, message: &str) -> bool {
        self.captured()
            .iter()
            .any(|r| r.message.as_deref() == Some(message))
    }

    /// Block until at least `n` calls were made or `timeout` passes
    pub fn wait_for_calls(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut recorded = self.recorded.lock();
        while recorded.calls.len() < n {
            if self.changed.wait_until(&mut recorded, deadline).timed_out() {
                return recorded.calls.len() >= n;
            }
        }
        true
    }

    pub fn clear(&self) {
        self.recorded.lock().calls.clear();
    }
}

fn take_string(data: &mut Map<String, Value>, key: &str) -> Option<String> {
    match data.remove(key) {
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
        None => None,
    }
}

impl Sender for RecordingSender {
    fn send(&self, job: &str, payload: &[u8]) -> Result<()> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let mut recorded = self.recorded.lock();
        let call_index = recorded.calls.len();
        let succeeded = match self.failure {
            FailureMode::Never => true,
            FailureMode::FirstN(n) => call_index >= n,
            FailureMode::Always => false,
        };

        recorded.calls.push(SentPayload {
            job: job.to_string(),
            payload: payload.to_vec(),
            succeeded,
        });
        self.changed.notify_all();

        if succeeded {
            Ok(())
        } else {
            Err(LoggerError::connection(
                "recording",
                format!("scheduled failure on call {}", call_index + 1),
            ))
        }
    }

    fn name(&self) -> &str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_schedule() {
        let sender = RecordingSender::new().with_failure(FailureMode::FirstN(2));
        assert!(sender.send("api", b"a").is_err());
        assert!(sender.send("api", b"a").is_err());
        assert!(sender.send("api", b"a").is_ok());
        assert_eq!(sender.call_count(), 3);
        assert_eq!(sender.delivered().len(), 1);
    }

    #[test]
    fn test_captured_records() {
        let sender = RecordingSender::new();
        sender
            .send(
                "api",
                b"{\"level\":\"info\",\"message\":\"hi\",\"user\":7}\n{\"level\":\"warn\",\"message\":\"careful\"}",
            )
            .unwrap();

        let captured = sender.captured();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].job, "api");
        assert_eq!(captured[0].level.as_deref(), Some("info"));
        assert_eq!(captured[0].data["user"], 7);
        assert!(sender.contains_message("careful"));
        assert!(!sender.contains_message("missing"));
    }

    #[test]
    fn test_wait_for_calls_times_out() {
        let sender = RecordingSender::new();
        assert!(!sender.wait_for_calls(1, Duration::from_millis(10)));
        sender.send("api", b"x").unwrap();
        assert!(sender.wait_for_calls(1, Duration::from_millis(10)));
    }
}
