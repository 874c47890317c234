//! Boundary-aligned flush scheduling
//!
//! The scheduler thread fires its callback at every multiple of the interval
//! since the Unix epoch: with the default 60 s interval, at the start of
//! every minute. Each wait is recomputed from the clock rather than added to
//! the previous fire time, so a slow tick or timer jitter never shifts later
//! ticks.
//!
//! A `crossbeam` channel doubles as the timer and the shutdown signal:
//! `recv_timeout` returns `Timeout` when the boundary is reached, and a
//! message or disconnect when the scheduler is stopped.

use crate::clock::Clock;
use crate::error::{Result, StepLogError};
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// First boundary strictly after `now_ms` for an interval of `interval_ms`
///
/// # Example
/// ```
/// use steplog::schedule::next_boundary_ms;
///
/// // 12:30:17.250 -> 12:31:00.000
/// assert_eq!(next_boundary_ms(45_017_250, 60_000), 45_060_000);
/// ```
pub fn next_boundary_ms(now_ms: u64, interval_ms: u64) -> u64 {
    let interval_ms = interval_ms.max(1);
    (now_ms / interval_ms + 1) * interval_ms
}

/// Handle to the dedicated flush thread
#[derive(Debug)]
pub struct FlushScheduler {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl FlushScheduler {
    /// Spawn the scheduler thread
    ///
    /// `tick` runs on the scheduler thread at every boundary. A panic inside
    /// `tick` is logged and the next boundary is still honoured.
    pub fn spawn<F>(interval: Duration, clock: Arc<dyn Clock>, mut tick: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let interval_ms = (interval.as_millis() as u64).max(1);
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("steplog-flush".to_string())
            .spawn(move || {
                // Boundary of the previous tick; an early timer wake-up must
                // not fire the same boundary twice
                let mut last_boundary = 0;
                loop {
                    let now = clock.now_ms();
                    let boundary = next_boundary_ms(now.max(last_boundary), interval_ms);
                    let wait = boundary - now;

                    match shutdown_rx.recv_timeout(Duration::from_millis(wait)) {
                        Err(RecvTimeoutError::Timeout) => {
                            last_boundary = boundary;
                            if panic::catch_unwind(AssertUnwindSafe(|| tick())).is_err() {
                                tracing::error!("flush tick panicked, continuing with next tick");
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(StepLogError::Spawn)?;

        tracing::debug!(interval_ms, "flush scheduler started");
        Ok(Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for an in-flight tick to finish
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
