use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;

use jobecho_config::{ConfigFile, JobsValue, TypesValue};
use jobecho_logs::{EchoRouter, JsonLinesSink, LogSink, TracingSink};

mod poller;

use poller::JobPoller;

/// Jobecho - echo job stdout/stderr captures into the log while jobs run
#[derive(Parser, Debug)]
#[command(name = "jobecho")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Job directories holding job.stdout/job.stderr; a job's index is its position
    #[arg(value_name = "JOB_DIR", required = true)]
    job_dirs: Vec<PathBuf>,

    /// TOML config file with an [echo] table
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Jobs to echo, e.g. "0,2-4"
    #[arg(long, value_name = "INDICES")]
    jobs: Option<String>,

    /// Stream to echo as `stdout`, `stderr` or `all`, optionally `=PATTERN` (repeatable)
    #[arg(long = "types", value_name = "STREAM[=PATTERN]")]
    types: Vec<String>,

    /// Poll interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// File marking a job as finished once it appears in the job directory
    #[arg(long, value_name = "NAME")]
    done_file: Option<String>,

    /// Output format for echoed lines
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Log lines through the tracing subscriber (stderr)
    Text,
    /// One JSON object per line on stdout
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ConfigFile::load(path)?.echo,
        None => ConfigFile::default().echo,
    };

    // Command-line values win over the config file
    if let Some(jobs) = args.jobs {
        config.jobs = JobsValue::Spec(jobs);
    }
    if !args.types.is_empty() {
        config.types = TypesValue::from_args(&args.types);
    }
    if let Some(interval_ms) = args.interval_ms {
        config.interval_ms = interval_ms;
    }
    if let Some(done_file) = args.done_file {
        config.done_file = done_file;
    }

    let settings = config.settings().context("invalid echo configuration")?;
    if settings.jobs.is_empty() {
        tracing::warn!("no jobs selected for echoing, use --jobs or [echo].jobs");
    }

    let mut sink: Box<dyn LogSink> = match args.format {
        OutputFormat::Text => Box::new(TracingSink::new(config.level_gate())),
        OutputFormat::Json => Box::new(JsonLinesSink::new(std::io::stdout(), config.level_gate())),
    };

    let router = EchoRouter::new(settings, sink.as_mut());
    let poller = JobPoller::new(router, args.job_dirs, config.done_file.clone());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    poller
        .run(sink.as_mut(), config.interval(), cancel)
        .await
        .context("echoing job output failed")?;

    Ok(())
}
