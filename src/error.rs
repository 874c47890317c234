//! Error types for steplog
//!
//! Guarded calls (starting a session twice, ending a session that is not
//! active, recording steps outside a session) are silent no-ops and never
//! produce an error. Only misuse of the begin/finish protocol, configuration
//! problems and I/O failures are reported here.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the steplog library
#[derive(Debug, Error)]
pub enum StepLogError {
    /// `finish_step` was called while no step was open
    #[error("finish_step called without a matching begin_step, step={step}")]
    UnmatchedFinish { step: String },

    /// `finish_step` named a step other than the innermost open one
    #[error(
        "step name does not match the open step, was an inner step left unfinished? \
         step={step}, open={open}"
    )]
    StepMismatch { step: String, open: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to render report: {0}")]
    Render(#[from] serde_json::Error),

    #[error("Sink write to channel {channel} failed: {source}")]
    Sink {
        channel: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn flush scheduler thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl StepLogError {
    /// True for misuse of the begin/finish step protocol
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            StepLogError::UnmatchedFinish { .. } | StepLogError::StepMismatch { .. }
        )
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, StepLogError>;
