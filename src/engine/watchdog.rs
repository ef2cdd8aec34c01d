use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::constants::WATCHDOG_CHECK_INTERVAL;
use crate::error::UnitError;

/// Run-wide cancellation flag shared by the coordinator, workers and the
/// Ctrl-C handler
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Deadline and cancellation checks for one execution unit.
///
/// `check` is called between lines and between matches; the clock is only
/// read every `WATCHDOG_CHECK_INTERVAL` calls.
#[derive(Debug)]
pub struct Watchdog {
    started: Instant,
    timeout: Option<Duration>,
    cancel: CancelToken,
    ticks: u32,
}

impl Watchdog {
    pub fn new(timeout: Option<Duration>, cancel: CancelToken) -> Self {
        Self {
            started: Instant::now(),
            timeout,
            cancel,
            ticks: 0,
        }
    }

    /// Watchdog that never fires
    pub fn unbounded() -> Self {
        Self::new(None, CancelToken::new())
    }

    pub fn check(&mut self) -> Result<(), UnitError> {
        self.ticks = self.ticks.wrapping_add(1);
        if self.ticks % WATCHDOG_CHECK_INTERVAL != 0 {
            return Ok(());
        }
        self.check_now()
    }

    /// Check without waiting for the next interval
    pub fn check_now(&self) -> Result<(), UnitError> {
        if self.cancel.is_cancelled() {
            return Err(UnitError::Cancelled);
        }
        match self.timeout {
            Some(timeout) if self.started.elapsed() >= timeout => Err(UnitError::Timeout { timeout }),
            _ => Ok(()),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
