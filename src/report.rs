//! Report rendering
//!
//! Two reports are produced per session at every flush:
//!
//! - statistics: one line per step,
//!   `timestamp \t session \t step \t count \t total \t totalExclSub \t max \t maxExclSub`
//! - slowest samples: every retained tree as an indented walk, two spaces
//!   per level, with the time between instrumented sub-steps shown as
//!   `(code in <step>)` lines
//!
//! Rendering only reads the drained data it is given and never touches the
//! shared store.

use crate::config::{ReportFormat, TimestampZone};
use crate::error::Result;
use crate::sampler::TopKSampler;
use crate::stats::{SessionStatistics, StepStatistics};
use crate::step::StepNode;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::fmt::Write;

const HEADER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const STEP_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const INDENT: &str = "  ";

/// JSON form of one statistics line
#[derive(Debug, Serialize)]
struct StatisticsRecord<'a> {
    timestamp: &'a str,
    session: &'a str,
    step: &'a str,
    #[serde(flatten)]
    stats: &'a StepStatistics,
    mean_ms: f64,
}

/// Formats drained statistics and samples as text
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    zone: TimestampZone,
    format: ReportFormat,
}

impl Reporter {
    pub fn new(zone: TimestampZone, format: ReportFormat) -> Self {
        Self { zone, format }
    }

    /// Format epoch milliseconds with a chrono pattern
    pub fn format_timestamp(&self, ms: u64, pattern: &str) -> String {
        let Some(utc) = DateTime::<Utc>::from_timestamp_millis(ms as i64) else {
            return ms.to_string();
        };
        match self.zone {
            TimestampZone::Utc => utc.format(pattern).to_string(),
            TimestampZone::Local => utc.with_timezone(&Local).format(pattern).to_string(),
        }
    }

    /// Render the statistics of one session
    pub fn render_statistics(
        &self,
        timestamp_ms: u64,
        session: &str,
        steps: &SessionStatistics,
    ) -> Result<String> {
        let timestamp = self.format_timestamp(timestamp_ms, HEADER_TIME_FORMAT);
        let mut out = String::new();

        for (step, stats) in steps {
            match self.format {
                ReportFormat::Text => {
                    let _ = writeln!(
                        out,
                        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                        timestamp,
                        session,
                        step,
                        stats.count,
                        stats.total_ms,
                        stats.total_self_ms,
                        stats.max_ms,
                        stats.max_self_ms
                    );
                }
                ReportFormat::Json => {
                    let record = StatisticsRecord {
                        timestamp: &timestamp,
                        session,
                        step: step.as_str(),
                        stats,
                        mean_ms: stats.mean_ms(),
                    };
                    out.push_str(&serde_json::to_string(&record)?);
                    out.push('\n');
                }
            }
        }

        Ok(out)
    }

    /// Render the retained slow samples of one session, shortest first
    pub fn render_samples(&self, timestamp_ms: u64, session: &str, samples: &TopKSampler) -> String {
        let timestamp = self.format_timestamp(timestamp_ms, HEADER_TIME_FORMAT);
        let mut out = String::new();

        for root in samples.iter() {
            let _ = writeln!(out, "<{}> <{}> --------------------", timestamp, session);
            self.render_step(root, None, 1, root.start_ms(), &mut out);
        }

        out
    }

    /// Depth-first walk; returns the last timestamp accounted for
    fn render_step(
        &self,
        step: &StepNode,
        parent: Option<&str>,
        level: usize,
        mut last_ms: u64,
        out: &mut String,
    ) -> u64 {
        if let Some(parent) = parent {
            if step.start_ms() > last_ms {
                indent(out, level);
                let _ = writeln!(out, "(code in {}) use={}", parent, step.start_ms() - last_ms);
            }
        }
        last_ms = step.start_ms();

        let end_ms = step.end_ms().unwrap_or(last_ms);
        indent(out, level);
        let _ = writeln!(
            out,
            "[{}] use={}, useEx={}, start={}, end={}",
            step.name(),
            step.duration_ms(),
            step.self_duration_ms(),
            self.format_timestamp(step.start_ms(), STEP_TIME_FORMAT),
            self.format_timestamp(end_ms, STEP_TIME_FORMAT)
        );

        if step.children().is_empty() {
            return end_ms.max(last_ms);
        }

        for child in step.children() {
            last_ms = self.render_step(child, Some(step.name()), level + 1, last_ms, out);
        }

        if end_ms > last_ms {
            indent(out, level + 1);
            let _ = writeln!(out, "(code in {}) use={}", step.name(), end_ms - last_ms);
        }
        end_ms.max(last_ms)
    }
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str(INDENT);
    }
}
