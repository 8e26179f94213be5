//! Open, closing and closed states of a queued deliverer

use crate::core::{LoggerError, Result};
use parking_lot::{RwLock, RwLockReadGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Open,
    Closing,
    Closed,
}

/// Irreversible `Open -> Closing -> Closed` state machine
///
/// Producers hold the read half while they enqueue; `close` takes the write
/// half to leave `Open`, so no entry can slip in once closing has begun.
#[derive(Debug)]
pub struct LifecycleController {
    state: RwLock<LifecycleState>,
}

impl LifecycleController {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LifecycleState::Open),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    /// Admit a producer, holding the read lock for as long as the guard lives
    pub fn admit(&self) -> Result<RwLockReadGuard<'_, LifecycleState>> {
        let guard = self.state.read();
        if *guard == LifecycleState::Open {
            Ok(guard)
        } else {
            Err(LoggerError::LoggerClosed)
        }
    }

    /// Run the close sequence exactly once
    ///
    /// `drain` runs in `Closing`; `stop` runs afterwards whatever `drain`
    /// returned. The state is `Closed` on return in every case, and the
    /// drain error wins over the stop error.
    pub fn close_with<D, S>(&self, drain: D, stop: S) -> Result<()>
    where
        D: FnOnce() -> Result<()>,
        S: FnOnce() -> Result<()>,
    {
        {
            let mut state = self.state.write();
            if *state != LifecycleState::Open {
                return Err(LoggerError::LoggerClosed);
            }
            *state = LifecycleState::Closing;
        }

        let drained = drain();
        let stopped = stop();
        *self.state.write() = LifecycleState::Closed;

        drained.and(stopped)
    }
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use std::time::Duration;

    #[test]
    fn test_close_runs_once() {
        let lifecycle = LifecycleController::new();
        assert!(lifecycle.admit().is_ok());

        assert!(lifecycle.close_with(|| Ok(()), || Ok(())).is_ok());
        assert_eq!(lifecycle.state(), LifecycleState::Closed);

        let err = lifecycle.close_with(|| Ok(()), || Ok(())).unwrap_err();
        assert!(err.is(ErrorKind::LoggerClosed));
        assert!(lifecycle.admit().is_err());
    }

    #[test]
    fn test_admission_rejected_while_closing() {
        let lifecycle = LifecycleController::new();
        let result = lifecycle.close_with(
            || {
                assert_eq!(lifecycle.state(), LifecycleState::Closing);
                assert!(lifecycle.admit().unwrap_err().is(ErrorKind::LoggerClosed));
                Ok(())
            },
            || Ok(()),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_drain_error_wins() {
        let lifecycle = LifecycleController::new();
        let err = lifecycle
            .close_with(
                || Err(LoggerError::timeout("flush", Duration::from_millis(5))),
                || Err(LoggerError::shutdown("workers still running")),
            )
            .unwrap_err();

        assert!(err.is(ErrorKind::Timeout));
        assert_eq!(lifecycle.state(), LifecycleState::Closed);
    }

    #[test]
    fn test_stop_error_reported_and_state_closed() {
        let lifecycle = LifecycleController::new();
        let err = lifecycle
            .close_with(|| Ok(()), || Err(LoggerError::shutdown("timeout")))
            .unwrap_err();

        assert!(err.is(ErrorKind::Shutdown));
        assert_eq!(lifecycle.state(), LifecycleState::Closed);
    }
}
