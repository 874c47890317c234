//! Periodic flush of accumulated statistics and samples
//!
//! A flush drains the [`Aggregator`] (swap under the lock, then release),
//! renders each session's statistics and slow samples, and writes them to
//! the [`Sink`]. A failure for one session is logged and counted; the other
//! sessions of the same flush are still written, and the next flush starts
//! from the fresh store regardless.

use crate::aggregator::{Accumulation, Aggregator};
use crate::clock::Clock;
use crate::error::StepLogError;
use crate::report::Reporter;
use crate::sink::Sink;
use std::sync::Arc;

/// Outcome of one flush
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushSummary {
    /// Successful statistics writes (one per session)
    pub statistics_written: usize,
    /// Successful slow-sample writes (one per session)
    pub samples_written: usize,
    /// Channels whose render or write failed
    pub failed_channels: Vec<String>,
}

impl FlushSummary {
    pub fn is_clean(&self) -> bool {
        self.failed_channels.is_empty()
    }
}

/// Drains, renders and writes reports
pub struct FlushCycle {
    aggregator: Arc<Aggregator>,
    sink: Arc<dyn Sink>,
    clock: Arc<dyn Clock>,
    reporter: Reporter,
    channel_prefix: String,
}

impl std::fmt::Debug for FlushCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushCycle")
            .field("reporter", &self.reporter)
            .field("channel_prefix", &self.channel_prefix)
            .finish_non_exhaustive()
    }
}

impl FlushCycle {
    pub fn new(
        aggregator: Arc<Aggregator>,
        sink: Arc<dyn Sink>,
        clock: Arc<dyn Clock>,
        reporter: Reporter,
        channel_prefix: impl Into<String>,
    ) -> Self {
        Self {
            aggregator,
            sink,
            clock,
            reporter,
            channel_prefix: channel_prefix.into(),
        }
    }

    /// Channel receiving the statistics of `session`
    pub fn statistics_channel(&self, session: &str) -> String {
        format!("{}.statistics.{}", self.channel_prefix, session)
    }

    /// Channel receiving the slow samples of `session`
    pub fn samples_channel(&self, session: &str) -> String {
        format!("{}.slowest.{}", self.channel_prefix, session)
    }

    /// Drain the aggregator and write everything it held
    pub fn run(&self) -> FlushSummary {
        let drained = self.aggregator.drain();
        if drained.is_empty() {
            tracing::debug!("nothing to flush");
            return FlushSummary::default();
        }
        let summary = self.write_reports(&drained, self.clock.now_ms());
        tracing::info!(
            statistics = summary.statistics_written,
            samples = summary.samples_written,
            failures = summary.failed_channels.len(),
            "flushed step reports"
        );
        summary
    }

    /// Render and write an already drained accumulation
    pub fn write_reports(&self, drained: &Accumulation, timestamp_ms: u64) -> FlushSummary {
        let mut summary = FlushSummary::default();

        for (session, steps) in drained.statistics.iter() {
            let channel = self.statistics_channel(session);
            let written = self
                .reporter
                .render_statistics(timestamp_ms, session, steps)
                .and_then(|text| self.write(&channel, &text));
            match written {
                Ok(()) => summary.statistics_written += 1,
                Err(e) => self.record_failure(&mut summary, channel, e),
            }
        }

        for (session, samples) in drained.samples.iter() {
            let channel = self.samples_channel(session);
            let text = self.reporter.render_samples(timestamp_ms, session, samples);
            match self.write(&channel, &text) {
                Ok(()) => summary.samples_written += 1,
                Err(e) => self.record_failure(&mut summary, channel, e),
            }
        }

        summary
    }

    fn write(&self, channel: &str, text: &str) -> Result<(), StepLogError> {
        self.sink
            .write(channel, text)
            .map_err(|source| StepLogError::Sink {
                channel: channel.to_string(),
                source,
            })
    }

    fn record_failure(&self, summary: &mut FlushSummary, channel: String, error: StepLogError) {
        tracing::warn!(channel = %channel, error = %error, "failed to write step report");
        summary.failed_channels.push(channel);
    }
}
