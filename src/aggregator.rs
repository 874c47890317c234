//! Shared accumulation store
//!
//! Recording contexts on many threads submit completed session trees here.
//! A submission merges the tree into the statistics and offers it to the
//! slow-sample set under one lock, so a flush that swaps the store out
//! observes each submission either completely or not at all.
//!
//! ```text
//! ┌───────────────┐ submit(root) ┌──────────────────────────────┐
//! │ context (T1)  │─────────────▶│ Mutex<Accumulation>          │
//! │ context (T2)  │─────────────▶│   statistics  +  samples     │
//! └───────────────┘              └──────────────┬───────────────┘
//!                                               │ drain(): swap, unlock
//!                                               ▼
//!                                   render + sink (no lock held)
//! ```

use crate::sampler::SampleStore;
use crate::stats::StatisticsAggregator;
use crate::step::StepNode;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Everything accumulated between two flushes
#[derive(Debug)]
pub struct Accumulation {
    pub statistics: StatisticsAggregator,
    pub samples: SampleStore,
}

impl Accumulation {
    pub fn new(sample_capacity: usize) -> Self {
        Self {
            statistics: StatisticsAggregator::new(),
            samples: SampleStore::new(sample_capacity),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.statistics.is_empty() && self.samples.is_empty()
    }
}

/// Lock-guarded store shared by all recording contexts
#[derive(Debug)]
pub struct Aggregator {
    sample_capacity: usize,
    state: Mutex<Accumulation>,
    total_submitted: AtomicU64,
}

impl Aggregator {
    /// Create an empty store keeping `sample_capacity` slow samples per session
    pub fn new(sample_capacity: usize) -> Self {
        Self {
            sample_capacity,
            state: Mutex::new(Accumulation::new(sample_capacity)),
            total_submitted: AtomicU64::new(0),
        }
    }

    /// Merge a completed session tree and offer it as a slow sample
    ///
    /// Clamped self times are reported before the lock is taken.
    pub fn submit(&self, root: StepNode) {
        for step in root.overrun_steps() {
            tracing::warn!(
                session = root.session(),
                step = step.name(),
                duration_ms = step.duration_ms(),
                children_ms = step.children_duration_ms(),
                "sub-steps outlast their parent, self time clamped to 0"
            );
        }
        {
            let mut state = self.state.lock();
            state.statistics.merge(&root);
            state.samples.offer(root);
        }
        self.total_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Swap the accumulated state for an empty one and return it
    ///
    /// The lock is held only for the swap itself.
    pub fn drain(&self) -> Accumulation {
        let fresh = Accumulation::new(self.sample_capacity);
        let mut state = self.state.lock();
        std::mem::replace(&mut *state, fresh)
    }

    /// Sessions submitted since creation (not reset by `drain`)
    pub fn total_submitted(&self) -> u64 {
        self.total_submitted.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;

    fn tree(session: &str, duration: u64) -> StepNode {
        let session: Arc<str> = Arc::from(session);
        let mut root = StepNode::new(session.clone(), "root", 0);
        let mut child = StepNode::new(session, "child", 0);
        child.finish(duration / 2);
        root.push_child(child);
        root.finish(duration);
        root
    }

    #[test]
    fn test_submit_then_drain() {
        let agg = Aggregator::new(3);
        agg.submit(tree("S", 100));
        agg.submit(tree("S", 300));

        let drained = agg.drain();
        assert_eq!(drained.statistics.get("S", "root").unwrap().count, 2);
        assert_eq!(drained.statistics.get("S", "child").unwrap().total_ms, 200);
        assert_eq!(drained.samples.session("S").unwrap().len(), 2);
        assert_eq!(agg.total_submitted(), 2);
    }

    #[test]
    fn test_drain_resets_state() {
        let agg = Aggregator::new(3);
        agg.submit(tree("S", 100));
        let _ = agg.drain();

        let second = agg.drain();
        assert!(second.is_empty());
        assert_eq!(second.samples.capacity(), 3);
    }

    #[test]
    fn test_concurrent_submissions_are_all_counted() {
        let agg = Arc::new(Aggregator::new(3));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let agg = agg.clone();
                thread::spawn(move || {
                    for d in 0..250 {
                        agg.submit(tree("S", d));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let drained = agg.drain();
        let root = drained.statistics.get("S", "root").unwrap();
        assert_eq!(root.count, 2000);
        assert_eq!(root.max_ms, 249);
        assert_eq!(drained.samples.session("S").unwrap().len(), 3);
    }

    /// Log writer recording whether the store lock was held during a write
    #[derive(Clone)]
    struct LockCheckingWriter {
        agg: Arc<Aggregator>,
        wrote: Arc<AtomicBool>,
        wrote_under_lock: Arc<AtomicBool>,
    }

    impl io::Write for LockCheckingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.wrote.store(true, Ordering::SeqCst);
            if self.agg.state.is_locked() {
                self.wrote_under_lock.store(true, Ordering::SeqCst);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_overrun_warning_is_logged_outside_the_lock() {
        let agg = Arc::new(Aggregator::new(3));
        let writer = LockCheckingWriter {
            agg: agg.clone(),
            wrote: Arc::new(AtomicBool::new(false)),
            wrote_under_lock: Arc::new(AtomicBool::new(false)),
        };
        let make_writer = writer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || make_writer.clone())
            .finish();

        let session: Arc<str> = Arc::from("S");
        let mut root = StepNode::new(session.clone(), "root", 0);
        for name in ["a", "b"] {
            let mut child = StepNode::new(session.clone(), name, 0);
            child.finish(80);
            root.push_child(child);
        }
        root.finish(100);

        tracing::subscriber::with_default(subscriber, || agg.submit(root));

        assert!(writer.wrote.load(Ordering::SeqCst));
        assert!(!writer.wrote_under_lock.load(Ordering::SeqCst));
        assert_eq!(agg.drain().statistics.get("S", "root").unwrap().total_self_ms, 0);
    }
}
