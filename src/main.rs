use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use steplog::{
    cli::Cli,
    config::TimestampZone,
    sink::{DirectorySink, Sink, TracingSink},
    ExecutionContext, StepLog, StepLogConfig,
};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; reports go through it unless --output-dir is set
fn init_tracing(debug: bool) {
    let level = if debug {
        tracing::Level::TRACE
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

/// Build the effective configuration from the file and CLI overrides
fn load_config(args: &Cli) -> Result<StepLogConfig> {
    let mut config = match &args.config {
        Some(path) => StepLogConfig::from_file(path)?,
        None => StepLogConfig::default(),
    };
    if let Some(secs) = args.interval_secs {
        config.flush_interval_secs = secs;
    }
    if let Some(format) = args.format {
        config.format = format;
    }
    if args.utc {
        config.timestamps = TimestampZone::Utc;
    }
    config.validate()?;
    Ok(config)
}

/// One demo session: a request with two sub-steps, the first nested
fn run_session(ctx: &mut ExecutionContext, tick: Duration) -> Result<()> {
    let pause = |units: u32| thread::sleep(tick * units);

    ctx.start_session("demo");
    ctx.begin_step("handle-request");
    pause(4);

    ctx.begin_step("load");
    pause(1);
    ctx.begin_step("query");
    pause(1);
    ctx.finish_step("query")?;
    pause(1);
    ctx.finish_step("load")?;

    pause(4);
    ctx.step("render", |_| pause(2))?;
    pause(4);

    ctx.finish_step("handle-request")?;
    ctx.end_session("demo");
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    if args.threads == 0 {
        anyhow::bail!("Invalid value for --threads: 0 (must be >= 1)");
    }

    init_tracing(args.debug);
    let config = load_config(&args)?;

    let sink: Arc<dyn Sink> = match &args.output_dir {
        Some(dir) => Arc::new(
            DirectorySink::new(dir)
                .with_context(|| format!("cannot create output directory {}", dir.display()))?,
        ),
        None => Arc::new(TracingSink),
    };

    let log = StepLog::start(config, sink)?;
    let tick = Duration::from_millis(args.tick_ms);

    let workers: Vec<_> = (0..args.threads)
        .map(|_| {
            let mut ctx = log.context();
            let iterations = args.iterations;
            thread::spawn(move || -> Result<()> {
                for _ in 0..iterations {
                    run_session(&mut ctx, tick)?;
                }
                Ok(())
            })
        })
        .collect();

    for worker in workers {
        worker
            .join()
            .map_err(|_| anyhow::anyhow!("worker thread panicked"))??;
    }

    if let Some(summary) = log.shutdown() {
        tracing::debug!(?summary, "final flush");
        if !summary.is_clean() {
            anyhow::bail!("failed to write reports: {:?}", summary.failed_channels);
        }
    }

    Ok(())
}
