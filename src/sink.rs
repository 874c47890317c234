//! Report destinations
//!
//! A sink receives finished report text keyed by a channel name such as
//! `steplog.statistics.checkout`. Writes are fire-and-forget from the
//! flush cycle's point of view: an error is logged and the cycle moves on.

use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Append-only text destination keyed by channel name
pub trait Sink: Send + Sync {
    fn write(&self, channel: &str, text: &str) -> io::Result<()>;
}

/// Emits each report as one `tracing` event at INFO level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn write(&self, channel: &str, text: &str) -> io::Result<()> {
        tracing::info!(target: "steplog", channel, "\n{}", text.trim_end());
        Ok(())
    }
}

/// One captured write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkRecord {
    pub channel: String,
    pub text: String,
}

/// Keeps every write in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<SinkRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all writes so far
    pub fn records(&self) -> Vec<SinkRecord> {
        self.records.lock().clone()
    }

    /// Remove and return all writes so far
    pub fn take(&self) -> Vec<SinkRecord> {
        std::mem::take(&mut *self.records.lock())
    }

    /// Concatenated text written to one channel
    pub fn channel_text(&self, channel: &str) -> String {
        self.records
            .lock()
            .iter()
            .filter(|r| r.channel == channel)
            .map(|r| r.text.as_str())
            .collect()
    }
}

impl Sink for MemorySink {
    fn write(&self, channel: &str, text: &str) -> io::Result<()> {
        self.records.lock().push(SinkRecord {
            channel: channel.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Appends each channel to `<dir>/<channel>.log`
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing a channel; path separators in the name are replaced
    pub fn channel_path(&self, channel: &str) -> PathBuf {
        let file: String = channel
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.dir.join(format!("{}.log", file))
    }
}

impl Sink for DirectorySink {
    fn write(&self, channel: &str, text: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.channel_path(channel))?;
        file.write_all(text.as_bytes())
    }
}
