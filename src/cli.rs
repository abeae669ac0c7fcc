//! Command-line interface definitions

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::copy::DEFAULT_BUFFER_SIZE;

/// Path argument standing for stdin or stdout
pub const STDIO: &str = "-";

/// Copy a byte stream with would-block/more-aware semantics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Source file, or `-` for stdin
    #[arg(value_name = "SOURCE", default_value = STDIO)]
    pub source: PathBuf,

    /// Destination file, or `-` for stdout
    #[arg(value_name = "DEST", default_value = STDIO)]
    pub destination: PathBuf,

    /// Buffer size in KB (0 = 32 KB default)
    #[arg(long, default_value = "0")]
    pub buffer_size_kb: usize,

    /// Copy exactly this many bytes; a shorter source is an error
    #[arg(long, value_name = "BYTES")]
    pub limit: Option<u64>,

    /// Also write every byte delivered to DEST into this file
    #[arg(long, value_name = "PATH")]
    pub tee: Option<PathBuf>,

    /// How the copy reacts to would-block and more-to-come
    #[arg(long, value_enum, default_value = "return")]
    pub policy: PolicyKind,

    /// Put stdin/stdout into non-blocking mode
    ///
    /// Would-block from either end is then handled by the retry policy and
    /// the backoff instead of parking the thread in the kernel.
    #[arg(long)]
    pub nonblocking: bool,

    /// Base backoff duration in microseconds
    #[arg(long, default_value = "500")]
    pub backoff_base_us: u64,

    /// Longest single backoff wait in milliseconds
    #[arg(long, default_value = "100")]
    pub backoff_max_ms: u64,

    /// Seed for backoff jitter (default: from the clock)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Show progress information
    #[arg(long)]
    pub progress: bool,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except errors)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Retry policy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PolicyKind {
    /// Surface every signal to the transfer loop
    Return,
    /// Yield and retry on would-block everywhere
    Yield,
    /// Yield and retry on would-block only when writing
    YieldWrite,
}

impl Args {
    /// Validate command-line arguments
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Source file doesn't exist or is not a regular file
    /// - Buffer size is too large
    /// - Backoff bounds are zero or inverted
    /// - Both `--quiet` and `--verbose` are given
    pub fn validate(&self) -> Result<()> {
        if !is_stdio(&self.source) {
            if !self.source.exists() {
                anyhow::bail!("Source path does not exist: {}", self.source.display());
            }
            if !self.source.is_file() {
                anyhow::bail!("Source path must be a file: {}", self.source.display());
            }
        }

        if self.buffer_size_kb > 1024 * 1024 {
            anyhow::bail!(
                "Buffer size too large (max 1GB): {} KB",
                self.buffer_size_kb
            );
        }

        if self.backoff_base_us == 0 {
            anyhow::bail!("Backoff base must be greater than zero");
        }
        if self.backoff_base() > self.backoff_max() {
            anyhow::bail!(
                "Backoff base ({} us) exceeds backoff max ({} ms)",
                self.backoff_base_us,
                self.backoff_max_ms
            );
        }

        if self.quiet && self.verbose > 0 {
            anyhow::bail!("Cannot use both --quiet and --verbose options");
        }

        Ok(())
    }

    /// Get effective buffer size in bytes
    #[must_use]
    pub const fn effective_buffer_size(&self) -> usize {
        if self.buffer_size_kb == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            self.buffer_size_kb * 1024
        }
    }

    /// Base backoff duration
    #[must_use]
    pub const fn backoff_base(&self) -> Duration {
        Duration::from_micros(self.backoff_base_us)
    }

    /// Backoff ceiling
    #[must_use]
    pub const fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    /// Whether the source is stdin
    #[must_use]
    pub fn source_is_stdin(&self) -> bool {
        is_stdio(&self.source)
    }

    /// Whether the destination is stdout
    #[must_use]
    pub fn destination_is_stdout(&self) -> bool {
        is_stdio(&self.destination)
    }

    #[cfg(test)]
    pub fn test_default(source: PathBuf, destination: PathBuf) -> Self {
        Self {
            source,
            destination,
            buffer_size_kb: 0,
            limit: None,
            tee: None,
            policy: PolicyKind::Return,
            nonblocking: false,
            backoff_base_us: 500,
            backoff_max_ms: 100,
            seed: None,
            progress: false,
            verbose: 0,
            quiet: false,
        }
    }
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == STDIO
}
