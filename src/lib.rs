//! Steplog - nested step timing with periodic per-step statistics
//!
//! Code under measurement marks named steps with begin/finish calls inside a
//! session. Each completed session tree is folded into per-(session, step)
//! statistics and offered to a small set of slowest samples. On every
//! interval boundary both are swapped out, rendered, and written to a sink.
//!
//! ```text
//! ExecutionContext ──submit──▶ Aggregator ──drain──▶ Reporter ──▶ Sink
//!   (per thread)            (one Mutex)         (no lock held)
//! ```

pub mod aggregator;
pub mod cli;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod flush;
pub mod recorder;
pub mod report;
pub mod sampler;
pub mod schedule;
pub mod sink;
pub mod stats;
pub mod step;

pub use config::StepLogConfig;
pub use context::ExecutionContext;
pub use error::{Result, StepLogError};
pub use recorder::StepLog;
