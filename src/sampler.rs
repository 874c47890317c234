//! Slowest-session sampling
//!
//! Keeps the K longest complete session trees per session name since the
//! last flush, so the worst cases can be inspected step by step.

use crate::step::StepNode;
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// Number of slow samples kept per session unless configured otherwise
pub const DEFAULT_SAMPLE_CAPACITY: usize = 3;

/// Bounded set of the slowest roots for one session
///
/// Entries are ordered by (duration, arrival), so equal durations keep
/// their arrival order and the oldest of the shortest is evicted first.
#[derive(Debug)]
pub struct TopKSampler {
    capacity: usize,
    next_seq: u64,
    samples: BTreeMap<(u64, u64), StepNode>,
}

impl TopKSampler {
    /// Create a sampler holding at most `capacity` roots
    ///
    /// # Panics
    ///
    /// Panics if capacity is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Sample capacity must be > 0");
        Self {
            capacity,
            next_seq: 0,
            samples: BTreeMap::new(),
        }
    }

    /// Offer a completed root; returns true if it is retained
    pub fn offer(&mut self, root: StepNode) -> bool {
        let key = (root.duration_ms(), self.next_seq);
        self.next_seq += 1;
        self.samples.insert(key, root);

        if self.samples.len() > self.capacity {
            if let Some((evicted, _)) = self.samples.pop_first() {
                return evicted != key;
            }
        }
        true
    }

    /// Retained roots, shortest first
    pub fn iter(&self) -> impl Iterator<Item = &StepNode> {
        self.samples.values()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Session name -> slowest samples, in first-seen order
#[derive(Debug)]
pub struct SampleStore {
    capacity: usize,
    sessions: IndexMap<String, TopKSampler>,
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_CAPACITY)
    }
}

impl SampleStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            sessions: IndexMap::new(),
        }
    }

    /// Offer a root to the sampler of its session
    pub fn offer(&mut self, root: StepNode) -> bool {
        let capacity = self.capacity;
        match self.sessions.get_mut(root.session()) {
            Some(sampler) => sampler.offer(root),
            None => {
                let mut sampler = TopKSampler::new(capacity);
                let session = root.session().to_string();
                let kept = sampler.offer(root);
                self.sessions.insert(session, sampler);
                kept
            }
        }
    }

    pub fn session(&self, session: &str) -> Option<&TopKSampler> {
        self.sessions.get(session)
    }

    /// Iterate sessions in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TopKSampler)> {
        self.sessions.iter().map(|(name, s)| (name.as_str(), s))
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
