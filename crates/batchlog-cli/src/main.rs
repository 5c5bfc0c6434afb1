//! batchlog CLI
//!
//! Thin wrapper around batchlog-core for command-line usage.
//!
//! ## Usage
//!
//! ```bash
//! # Batch stdin lines to stdout
//! some-noisy-command | batchlog pipe
//!
//! # Append to a file, flushing at most every 200ms or 500 lines
//! some-noisy-command | batchlog pipe --output app.log --flush-delay-ms 200 --queue-size 500
//!
//! # Tag lines with a severity and a timestamp
//! some-noisy-command | batchlog pipe --severity warning --timestamps
//!
//! # Emit JSON records and read them back
//! some-noisy-command | batchlog pipe --json --output app.jsonl
//! batchlog read app.jsonl
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use batchlog_core::logging::read_records;
use batchlog_core::options::DEFAULT_FLUSH_MAX_QUEUE_SIZE;
use batchlog_core::{
    timestamp_now, with_writer_handler, BatchingOptions, Handler, LogRecord, Severity,
    WithSeverity,
};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWrite, BufReader};

/// batchlog - batched log delivery
#[derive(Parser)]
#[command(name = "batchlog")]
#[command(version = "0.1.0")]
#[command(about = "batchlog - batched log delivery")]
#[command(
    long_about = "Reads log lines and delivers them in batches, flushing on a delay, on queue size, or at end of input."
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read lines from stdin and emit them through a batch publisher
    Pipe(PipeArgs),

    /// Print the records of a JSON-lines log file
    Read {
        /// File written by `pipe --json`
        file: PathBuf,
    },
}

#[derive(Args)]
struct PipeArgs {
    /// Append output to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Longest time a line may wait before being flushed
    #[arg(long, default_value_t = 1000)]
    flush_delay_ms: u64,

    /// Number of buffered lines that forces a flush
    #[arg(long, default_value_t = DEFAULT_FLUSH_MAX_QUEUE_SIZE)]
    queue_size: usize,

    /// Discard lines while the queue is full instead of waiting
    #[arg(long)]
    drop_when_full: bool,

    /// Tag every line with this severity (e.g. error, warning, info)
    #[arg(short, long)]
    severity: Option<Severity>,

    /// Prefix every line with the time it was read
    #[arg(short, long)]
    timestamps: bool,

    /// Emit one JSON record per line
    #[arg(long)]
    json: bool,
}

impl PipeArgs {
    fn options(&self) -> BatchingOptions {
        let options = BatchingOptions::default()
            .with_flush_max_delay(Duration::from_millis(self.flush_delay_ms))
            .with_flush_max_queue_size(self.queue_size);
        if self.drop_when_full {
            options.drop_when_full()
        } else {
            options.block_when_full()
        }
    }

    fn render_text(&self, line: String) -> String {
        let line = match self.severity {
            Some(severity) => WithSeverity::new(severity, line).to_string(),
            None => line,
        };
        if self.timestamps {
            timestamp_now(line).to_string()
        } else {
            line
        }
    }

    fn render_record(&self, line: String) -> LogRecord {
        let level = self.severity.unwrap_or(Severity::Informational);
        LogRecord::new(level.as_str().to_lowercase(), "batchlog", "pipe", line)
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    match cli.command {
        Commands::Pipe(args) => {
            args.options().validate()?;

            let lines = match &args.output {
                Some(path) => {
                    let file = open_append(path).await?;
                    run_pipe(&args, file).await?
                }
                None => run_pipe(&args, tokio::io::stdout()).await?,
            };

            tracing::info!(lines, "Input finished");
        }

        Commands::Read { file } => {
            let records = read_records(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            for record in records {
                println!("{}", record.to_text_line());
            }
        }
    }

    Ok(())
}

async fn open_append(path: &Path) -> Result<tokio::fs::File> {
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))
}

/// Feed stdin through a publisher writing to `writer`; returns the line count.
async fn run_pipe<W>(args: &PipeArgs, writer: W) -> Result<u64>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let options = args.options();

    let lines = if args.json {
        with_writer_handler(options, writer, |log: Handler<LogRecord>| {
            pump_stdin(log, |line| args.render_record(line))
        })
        .await??
    } else {
        with_writer_handler(options, writer, |log: Handler<String>| {
            pump_stdin(log, |line| args.render_text(line))
        })
        .await??
    };

    Ok(lines)
}

async fn pump_stdin<M, F>(log: Handler<M>, render: F) -> std::io::Result<u64>
where
    M: Send + 'static,
    F: Fn(String) -> M,
{
    let mut reader = BufReader::new(tokio::io::stdin()).lines();
    let mut count = 0u64;

    while let Some(line) = reader.next_line().await? {
        log.log(render(line)).await;
        count += 1;
    }

    Ok(count)
}
