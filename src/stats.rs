//! Per-step statistics aggregation
//!
//! Every node of a completed session tree contributes to the statistics of
//! its (session, step) pair: execution count, total time, total time
//! excluding sub-steps, and the maxima of both. Sessions and steps keep the
//! order in which they were first seen so reports are stable from one flush
//! to the next.

use crate::step::StepNode;
use indexmap::IndexMap;
use serde::Serialize;

/// Running statistics for one step name within one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepStatistics {
    /// Number of times the step completed
    pub count: u64,
    /// Sum of step durations (ms)
    pub total_ms: u64,
    /// Sum of step durations excluding direct sub-steps (ms)
    pub total_self_ms: u64,
    /// Longest single duration (ms)
    pub max_ms: u64,
    /// Longest single duration excluding direct sub-steps (ms)
    pub max_self_ms: u64,
}

impl StepStatistics {
    /// Fold one execution of the step into the running totals
    pub fn merge_step(&mut self, step: &StepNode) {
        let duration = step.duration_ms();
        let self_duration = step.self_duration_ms();

        self.count += 1;
        self.total_ms = self.total_ms.saturating_add(duration);
        self.total_self_ms = self.total_self_ms.saturating_add(self_duration);
        self.max_ms = self.max_ms.max(duration);
        self.max_self_ms = self.max_self_ms.max(self_duration);
    }

    /// Mean duration per execution (ms)
    pub fn mean_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms as f64 / self.count as f64
        }
    }
}

/// Step name -> statistics for one session, in first-seen order
pub type SessionStatistics = IndexMap<String, StepStatistics>;

/// Session name -> per-step statistics
#[derive(Debug, Default)]
pub struct StatisticsAggregator {
    sessions: IndexMap<String, SessionStatistics>,
}

impl StatisticsAggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge every node of a completed tree
    ///
    /// Walks with an explicit stack in pre-order, so the first time a step
    /// name is seen matches the order it appears in the tree. Runs under the
    /// store lock and never logs.
    pub fn merge(&mut self, root: &StepNode) {
        let session = self
            .sessions
            .entry(root.session().to_string())
            .or_default();

        let mut stack = vec![root];
        while let Some(step) = stack.pop() {
            // get_mut first to avoid allocating the key on the common path
            match session.get_mut(step.name()) {
                Some(stats) => stats.merge_step(step),
                None => {
                    let mut stats = StepStatistics::default();
                    stats.merge_step(step);
                    session.insert(step.name().to_string(), stats);
                }
            }

            stack.extend(step.children().iter().rev());
        }
    }

    /// Statistics for one (session, step) pair
    pub fn get(&self, session: &str, step: &str) -> Option<&StepStatistics> {
        self.sessions.get(session)?.get(step)
    }

    /// All steps of one session
    pub fn session(&self, session: &str) -> Option<&SessionStatistics> {
        self.sessions.get(session)
    }

    /// Iterate sessions in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SessionStatistics)> {
        self.sessions.iter().map(|(name, steps)| (name.as_str(), steps))
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of sessions with statistics
    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}
