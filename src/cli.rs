//! CLI argument parsing for the steplog demo

use crate::config::ReportFormat;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "steplog")]
#[command(version)]
#[command(
    about = "Run an instrumented demo workload and report per-step timing statistics",
    long_about = None
)]
pub struct Cli {
    /// Sessions recorded per worker thread
    #[arg(short = 'n', long = "iterations", default_value = "5")]
    pub iterations: usize,

    /// Worker threads, each with its own recording context
    #[arg(short = 't', long = "threads", default_value = "2")]
    pub threads: usize,

    /// Length of one workload time unit in milliseconds
    #[arg(long = "tick-ms", value_name = "MS", default_value = "10")]
    pub tick_ms: u64,

    /// TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write reports to <DIR>/<channel>.log instead of the log output
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Override the flush interval from the configuration
    #[arg(long = "interval-secs", value_name = "SECS")]
    pub interval_secs: Option<u64>,

    /// Override the statistics report format
    #[arg(long = "format", value_enum)]
    pub format: Option<ReportFormat>,

    /// Render timestamps in UTC
    #[arg(long = "utc")]
    pub utc: bool,

    /// Enable debug logging
    #[arg(long = "debug")]
    pub debug: bool,
}
