//! Per-flow recording context
//!
//! An [`ExecutionContext`] belongs to one flow of control (usually one
//! thread handling one request). Between `start_session` and the matching
//! `end_session` it turns `begin_step` / `finish_step` calls into a
//! [`StepNode`] tree, which is then submitted to the shared [`Aggregator`].
//!
//! Calls are guarded so instrumentation can live in shared code:
//! - a second `start_session` while one is active is ignored (first wins)
//! - `end_session` with another name is ignored
//! - step calls outside a session are ignored
//!
//! Begin/finish pairs must nest like parentheses. A `finish_step` with no
//! open step, or naming a step other than the innermost open one, is a
//! protocol violation: it is returned as an error and the session being
//! recorded is abandoned.

use crate::aggregator::Aggregator;
use crate::clock::Clock;
use crate::error::{Result, StepLogError};
use crate::step::StepNode;
use std::sync::Arc;

/// Recording state for one flow of control
pub struct ExecutionContext {
    aggregator: Arc<Aggregator>,
    clock: Arc<dyn Clock>,
    session: Option<Arc<str>>,
    /// Open steps, outermost first; the last one is current
    open: Vec<StepNode>,
    /// Root step once it has finished
    root: Option<StepNode>,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("session", &self.session)
            .field("open", &self.open.len())
            .field("root", &self.root.as_ref().map(StepNode::name))
            .finish()
    }
}

impl ExecutionContext {
    /// Create an idle context submitting to `aggregator`
    pub fn new(aggregator: Arc<Aggregator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            aggregator,
            clock,
            session: None,
            open: Vec::new(),
            root: None,
        }
    }

    /// Start recording a session, unless one is already active
    pub fn start_session(&mut self, name: &str) {
        if let Some(active) = &self.session {
            tracing::debug!(active = %active, ignored = name, "session already active");
            return;
        }
        self.session = Some(Arc::from(name));
        self.open.clear();
        self.root = None;
    }

    /// End the active session if it is named `name` and submit its tree
    pub fn end_session(&mut self, name: &str) {
        match &self.session {
            Some(active) if active.as_ref() == name => {}
            _ => return,
        }

        if !self.open.is_empty() {
            let unfinished: Vec<&str> = self.open.iter().map(StepNode::name).collect();
            tracing::warn!(
                session = name,
                ?unfinished,
                "session ended with unfinished steps, discarding it"
            );
        } else if let Some(root) = self.root.take() {
            tracing::trace!(session = name, steps = root.node_count(), "session complete");
            self.aggregator.submit(root);
        }
        self.reset();
    }

    /// Open a step nested in the current one (or as the root)
    pub fn begin_step(&mut self, name: &str) {
        let Some(session) = &self.session else {
            return;
        };
        let step = StepNode::new(session.clone(), name, self.clock.now_ms());
        if self.open.is_empty() {
            if let Some(previous) = self.root.take() {
                tracing::debug!(
                    session = %session,
                    replaced = previous.name(),
                    "new root step replaces the finished one"
                );
            }
        }
        self.open.push(step);
    }

    /// Close the current step, which must be named `name`
    pub fn finish_step(&mut self, name: &str) -> Result<()> {
        if self.session.is_none() {
            return Ok(());
        }

        let violation = match self.open.last() {
            None => Some(StepLogError::UnmatchedFinish {
                step: name.to_string(),
            }),
            Some(current) if current.name() != name => Some(StepLogError::StepMismatch {
                step: name.to_string(),
                open: current.name().to_string(),
            }),
            Some(_) => None,
        };
        if let Some(violation) = violation {
            tracing::warn!(
                session = self.session.as_deref().unwrap_or_default(),
                error = %violation,
                "step protocol violation, abandoning session"
            );
            self.reset();
            return Err(violation);
        }

        let now = self.clock.now_ms();
        if let Some(mut step) = self.open.pop() {
            step.finish(now);
            match self.open.last_mut() {
                Some(parent) => parent.push_child(step),
                None => self.root = Some(step),
            }
        }
        Ok(())
    }

    /// Run `f` as a step named `name`
    ///
    /// # Example
    /// ```
    /// use steplog::{StepLog, StepLogConfig, sink::MemorySink};
    /// use std::sync::Arc;
    ///
    /// let log = StepLog::new(StepLogConfig::default(), Arc::new(MemorySink::new())).unwrap();
    /// let mut ctx = log.context();
    /// ctx.start_session("request");
    /// let sum = ctx.step("compute", |_| 2 + 2).unwrap();
    /// ctx.end_session("request");
    /// assert_eq!(sum, 4);
    /// ```
    pub fn step<R>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> R) -> Result<R> {
        self.begin_step(name);
        let result = f(self);
        self.finish_step(name)?;
        Ok(result)
    }

    /// Run `f` inside a session named `name`
    pub fn session<R>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.start_session(name);
        let result = f(self);
        self.end_session(name);
        result
    }

    /// Name of the session being recorded
    pub fn active_session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Name of the innermost open step
    pub fn current_step(&self) -> Option<&str> {
        self.open.last().map(StepNode::name)
    }

    /// Number of open steps
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    fn reset(&mut self) {
        self.session = None;
        self.open.clear();
        self.root = None;
    }
}
