//! iox-copy: stream copy utility built on the iox engine
//!
//! Copies a file or stdin to a file or stdout, optionally mirroring the
//! stream into a second file, with would-block handled by a retry policy
//! and an adaptive backoff instead of blocking reads and writes.

use std::fs::File;
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use iox::backoff::Backoff;
use iox::cli::{Args, PolicyKind};
use iox::fd::{set_nonblocking, NonblockingGuard};
use iox::policy::{Policy, YieldOnWriteWouldBlockPolicy, YieldPolicy};
use iox::progress::ProgressSink;
use iox::stream::{FromStd, SeekableStd, Sink, Source};
use iox::tee::TeeWriter;
use iox::transfer::{drive, flush, TransferOptions};

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging based on verbosity and quiet mode
    if args.quiet {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::ERROR)
            .with_target(false)
            .with_writer(io::stderr)
            .finish();

        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(match args.verbose {
                0 => Level::WARN,
                1 => Level::INFO,
                2 => Level::DEBUG,
                _ => Level::TRACE,
            })
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(io::stderr)
            .finish();

        tracing::subscriber::set_global_default(subscriber)?;
    }

    args.validate().context("Invalid arguments")?;

    info!("Starting iox-copy v{}", env!("CARGO_PKG_VERSION"));
    info!("Source: {}", args.source.display());
    info!("Destination: {}", args.destination.display());
    info!("Policy: {:?}", args.policy);
    info!("Buffer size: {} bytes", args.effective_buffer_size());

    // Declared before the streams so the original flags come back after
    // they are dropped, on success and on error alike.
    let mut nonblocking_guards: Vec<NonblockingGuard> = Vec::new();
    if args.nonblocking {
        if args.source_is_stdin() {
            nonblocking_guards.push(
                set_nonblocking(io::stdin().as_raw_fd())
                    .context("Failed to make stdin non-blocking")?,
            );
        }
        if args.destination_is_stdout() {
            nonblocking_guards.push(
                set_nonblocking(io::stdout().as_raw_fd())
                    .context("Failed to make stdout non-blocking")?,
            );
        }
    }

    let (mut source, source_len) = open_source(&args)?;
    let mut output = FromStd(open_destination(&args)?);
    let mut tee = match &args.tee {
        Some(path) => Some(FromStd(File::create(path).with_context(|| {
            format!("Failed to create tee file: {}", path.display())
        })?)),
        None => None,
    };
    let mut progress = args
        .progress
        .then(|| ProgressSink::new(args.limit.or(source_len)));

    let mut policy: Option<Box<dyn Policy>> = match args.policy {
        PolicyKind::Return => None,
        PolicyKind::Yield => Some(Box::new(YieldPolicy::new())),
        PolicyKind::YieldWrite => Some(Box::new(YieldOnWriteWouldBlockPolicy::new())),
    };

    let mut backoff = args
        .seed
        .map_or_else(Backoff::new, Backoff::with_seed)
        .with_base(args.backoff_base())
        .with_max(args.backoff_max());

    let options = TransferOptions {
        buffer_size: args.effective_buffer_size(),
        limit: args.limit,
    };

    let stats = {
        let mut sink: Box<dyn Sink + '_> = Box::new(&mut output);
        if let Some(tee) = tee.as_mut() {
            sink = Box::new(TeeWriter::new(sink, tee));
        }
        if let Some(progress) = progress.as_mut() {
            sink = Box::new(TeeWriter::new(sink, progress));
        }
        drive(
            &mut sink,
            &mut source,
            &options,
            policy.as_deref_mut(),
            &mut backoff,
        )
        .context("Copy failed")?
    };

    backoff.reset();
    flush(&mut output.0, &mut backoff).context("Failed to flush destination")?;
    if let Some(progress) = &progress {
        progress.finish();
    }

    info!("Copy completed successfully");
    info!("Bytes copied: {}", stats.bytes);
    info!("Rounds: {}", stats.rounds);
    info!("Would-block waits: {}", stats.would_block_waits);
    info!("More signals: {}", stats.more_signals);
    Ok(())
}

/// Open the source, returning its length when known
fn open_source(args: &Args) -> Result<(Box<dyn Source>, Option<u64>)> {
    if args.source_is_stdin() {
        return Ok((Box::new(FromStd(io::stdin().lock())), None));
    }
    let file = File::open(&args.source)
        .with_context(|| format!("Failed to open source: {}", args.source.display()))?;
    let len = file.metadata().ok().map(|m| m.len());
    Ok((Box::new(SeekableStd(file)), len))
}

fn open_destination(args: &Args) -> Result<Box<dyn Write>> {
    if args.destination_is_stdout() {
        return Ok(Box::new(io::stdout().lock()));
    }
    let file = File::create(&args.destination).with_context(|| {
        format!(
            "Failed to create destination: {}",
            args.destination.display()
        )
    })?;
    Ok(Box::new(file))
}
