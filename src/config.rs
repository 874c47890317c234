//! Configuration for the recorder and its flush cycle
//!
//! Every field has a default, so a TOML file only needs the values it
//! changes:
//!
//! ```toml
//! flush_interval_secs = 300
//! sample_capacity = 5
//! timestamps = "utc"
//! ```

use crate::error::{Result, StepLogError};
use crate::sampler::DEFAULT_SAMPLE_CAPACITY;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Rendering of statistics reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Tab-separated lines (default)
    #[default]
    Text,
    /// One JSON object per step
    Json,
}

/// Time zone used for report timestamps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimestampZone {
    #[default]
    Local,
    Utc,
}

/// Recorder configuration
///
/// # Example
/// ```
/// use steplog::StepLogConfig;
///
/// let config = StepLogConfig::default();
/// assert_eq!(config.flush_interval_secs, 60);
/// assert_eq!(config.sample_capacity, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StepLogConfig {
    /// Seconds between flushes; ticks land on multiples of this interval
    /// since the Unix epoch, so 60 fires on every whole minute
    pub flush_interval_secs: u64,

    /// Slowest sessions kept per session name between flushes
    pub sample_capacity: usize,

    /// Prefix of sink channel names (`<prefix>.statistics.<session>`)
    pub channel_prefix: String,

    /// Time zone for rendered timestamps
    pub timestamps: TimestampZone,

    /// Statistics report format
    pub format: ReportFormat,

    /// Run a final flush when the recorder shuts down
    pub flush_on_shutdown: bool,
}

impl Default for StepLogConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: 60,
            sample_capacity: DEFAULT_SAMPLE_CAPACITY,
            channel_prefix: "steplog".to_string(),
            timestamps: TimestampZone::Local,
            format: ReportFormat::Text,
            flush_on_shutdown: true,
        }
    }
}

impl StepLogConfig {
    /// Parse a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| StepLogError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    /// Flush interval as a [`Duration`]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.flush_interval_secs == 0 {
            return Err(StepLogError::InvalidConfig(
                "flush_interval_secs must be > 0".to_string(),
            ));
        }

        if self.sample_capacity == 0 {
            return Err(StepLogError::InvalidConfig(
                "sample_capacity must be > 0".to_string(),
            ));
        }

        if self.channel_prefix.trim().is_empty() {
            return Err(StepLogError::InvalidConfig(
                "channel_prefix must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StepLogConfig::default();
        assert_eq!(config.flush_interval(), Duration::from_secs(60));
        assert_eq!(config.sample_capacity, 3);
        assert_eq!(config.channel_prefix, "steplog");
        assert_eq!(config.timestamps, TimestampZone::Local);
        assert_eq!(config.format, ReportFormat::Text);
        assert!(config.flush_on_shutdown);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = StepLogConfig::from_toml_str(
            r#"
            flush_interval_secs = 300
            timestamps = "utc"
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.flush_interval_secs, 300);
        assert_eq!(config.timestamps, TimestampZone::Utc);
        assert_eq!(config.format, ReportFormat::Json);
        assert_eq!(config.sample_capacity, 3);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = StepLogConfig::from_toml_str("flush_every = 10").unwrap_err();
        assert!(matches!(err, StepLogError::ConfigParse(_)));
    }

    #[test]
    fn test_invalid_interval() {
        let err = StepLogConfig::from_toml_str("flush_interval_secs = 0").unwrap_err();
        assert!(matches!(err, StepLogError::InvalidConfig(_)));
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_sample_capacity() {
        let mut config = StepLogConfig::default();
        config.sample_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_channel_prefix() {
        let mut config = StepLogConfig::default();
        config.channel_prefix = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = StepLogConfig::from_file("/nonexistent/steplog.toml").unwrap_err();
        assert!(matches!(err, StepLogError::ConfigRead { .. }));
    }
}
