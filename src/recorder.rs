//! Recorder facade
//!
//! [`StepLog`] owns the shared store, the flush cycle and (once started) the
//! scheduler thread. Each flow of control asks it for its own
//! [`ExecutionContext`].

use crate::aggregator::Aggregator;
use crate::clock::{Clock, SystemClock};
use crate::config::StepLogConfig;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::flush::{FlushCycle, FlushSummary};
use crate::report::Reporter;
use crate::schedule::FlushScheduler;
use crate::sink::Sink;
use std::sync::Arc;

/// Step recorder with periodic reporting
///
/// # Example
/// ```
/// use steplog::{StepLog, StepLogConfig, sink::MemorySink};
/// use std::sync::Arc;
///
/// let sink = Arc::new(MemorySink::new());
/// let log = StepLog::new(StepLogConfig::default(), sink.clone()).unwrap();
///
/// let mut ctx = log.context();
/// ctx.start_session("checkout");
/// ctx.begin_step("load-cart");
/// ctx.finish_step("load-cart").unwrap();
/// ctx.end_session("checkout");
///
/// let summary = log.flush_now();
/// assert_eq!(summary.statistics_written, 1);
/// assert!(sink.channel_text("steplog.statistics.checkout").contains("load-cart"));
/// ```
pub struct StepLog {
    config: StepLogConfig,
    aggregator: Arc<Aggregator>,
    clock: Arc<dyn Clock>,
    flush: Arc<FlushCycle>,
    scheduler: Option<FlushScheduler>,
}

impl std::fmt::Debug for StepLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepLog")
            .field("config", &self.config)
            .field("scheduled", &self.scheduler.is_some())
            .finish_non_exhaustive()
    }
}

impl StepLog {
    /// Create a recorder on the system clock; no flush thread yet
    pub fn new(config: StepLogConfig, sink: Arc<dyn Sink>) -> Result<Self> {
        Self::with_clock(config, sink, Arc::new(SystemClock))
    }

    /// Create a recorder on a caller-provided clock
    pub fn with_clock(
        config: StepLogConfig,
        sink: Arc<dyn Sink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let aggregator = Arc::new(Aggregator::new(config.sample_capacity));
        let reporter = Reporter::new(config.timestamps, config.format);
        let flush = Arc::new(FlushCycle::new(
            aggregator.clone(),
            sink,
            clock.clone(),
            reporter,
            config.channel_prefix.clone(),
        ));
        Ok(Self {
            config,
            aggregator,
            clock,
            flush,
            scheduler: None,
        })
    }

    /// Create a recorder and start its flush thread
    pub fn start(config: StepLogConfig, sink: Arc<dyn Sink>) -> Result<Self> {
        let mut log = Self::new(config, sink)?;
        log.start_scheduler()?;
        Ok(log)
    }

    /// Start flushing at every interval boundary (no-op if already running)
    pub fn start_scheduler(&mut self) -> Result<()> {
        if self.scheduler.is_some() {
            return Ok(());
        }
        let flush = self.flush.clone();
        let scheduler =
            FlushScheduler::spawn(self.config.flush_interval(), self.clock.clone(), move || {
                flush.run();
            })?;
        self.scheduler = Some(scheduler);
        Ok(())
    }

    /// New recording context for one flow of control
    pub fn context(&self) -> ExecutionContext {
        ExecutionContext::new(self.aggregator.clone(), self.clock.clone())
    }

    /// Flush immediately on the calling thread
    pub fn flush_now(&self) -> FlushSummary {
        self.flush.run()
    }

    pub fn config(&self) -> &StepLogConfig {
        &self.config
    }

    /// Shared store, for inspection
    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduler.is_some()
    }

    /// Stop the flush thread and, if configured, flush what is left
    pub fn shutdown(mut self) -> Option<FlushSummary> {
        self.stop()
    }

    fn stop(&mut self) -> Option<FlushSummary> {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.shutdown();
        }
        if self.config.flush_on_shutdown {
            let summary = self.flush.run();
            // Only the first stop flushes
            self.config.flush_on_shutdown = false;
            Some(summary)
        } else {
            None
        }
    }
}

impl Drop for StepLog {
    fn drop(&mut self) {
        self.stop();
    }
}
