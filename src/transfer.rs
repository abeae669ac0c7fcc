//! Caller-side transfer loop
//!
//! The copy helpers return on every would-block and more-to-come. This
//! module is the loop a caller wraps around them when it wants a transfer to
//! run to completion on the current thread: more-to-come is consumed and the
//! copy resumed at once, would-block waits on a [`Backoff`] before resuming.
//!
//! # Usage
//!
//! ```rust
//! use iox::backoff::Backoff;
//! use iox::transfer::{drive, TransferOptions};
//!
//! let mut src: &[u8] = b"payload";
//! let mut dst = Vec::new();
//! let mut backoff = Backoff::new();
//! let stats = drive(&mut dst, &mut src, &TransferOptions::default(), None, &mut backoff)?;
//! assert_eq!(stats.bytes, 7);
//! # Ok::<(), iox::Error>(())
//! ```

use std::io;

use crate::backoff::Backoff;
use crate::copy::{copy_buffer_policy, copy_n_buffer_policy, DEFAULT_BUFFER_SIZE};
use crate::error::{Error, Result};
use crate::policy::Policy;
use crate::stream::{Sink, Source};

/// Transfer configuration
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Working buffer size for the generic copy loop
    pub buffer_size: usize,
    /// Stop after this many bytes; a shorter source is an error
    pub limit: Option<u64>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            limit: None,
        }
    }
}

/// Transfer statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Bytes accepted by the destination
    pub bytes: u64,
    /// Copy calls made
    pub rounds: u64,
    /// Backoff waits after would-block
    pub would_block_waits: u64,
    /// More-to-come signals consumed
    pub more_signals: u64,
}

/// Copy `src` into `dst` until done, absorbing semantic signals
///
/// Each round runs the policy-aware copy. Would-block resets the backoff if
/// the round made progress, then waits on it. More-to-come resets the
/// backoff and resumes immediately. There is no timeout: a source that never
/// becomes ready keeps this loop waiting.
///
/// # Errors
///
/// Returns the first non-semantic error, with context naming the byte offset
/// it occurred at. With a limit, a source that ends early yields
/// [`Error::UnexpectedEof`].
///
/// # Panics
///
/// Panics if `options.buffer_size` is zero.
pub fn drive(
    dst: &mut dyn Sink,
    src: &mut dyn Source,
    options: &TransferOptions,
    mut policy: Option<&mut (dyn Policy + '_)>,
    backoff: &mut Backoff,
) -> Result<TransferStats> {
    let mut buf = vec![0u8; options.buffer_size];
    let mut stats = TransferStats::default();

    loop {
        let (n, res) = match options.limit {
            Some(limit) => {
                let remaining = limit - stats.bytes;
                if remaining == 0 {
                    break;
                }
                copy_n_buffer_policy(dst, src, remaining, &mut buf, policy.as_deref_mut())
            }
            None => copy_buffer_policy(dst, src, &mut buf, policy.as_deref_mut()),
        };
        stats.bytes += n;
        stats.rounds += 1;
        tracing::debug!(round = stats.rounds, bytes = n, total = stats.bytes, "transfer round");

        match res {
            Ok(()) => break,
            Err(e) if e.is_more() => {
                stats.more_signals += 1;
                backoff.reset();
            }
            Err(e) if e.is_would_block() => {
                if n > 0 {
                    backoff.reset();
                }
                stats.would_block_waits += 1;
                backoff.wait();
            }
            Err(e) => return Err(transfer_error(e, stats.bytes)),
        }
    }

    tracing::info!(
        bytes = stats.bytes,
        rounds = stats.rounds,
        waits = stats.would_block_waits,
        "transfer complete"
    );
    Ok(stats)
}

/// Flush a std writer, waiting on `backoff` while it would block
///
/// A non-blocking destination can refuse buffered bytes at flush time just
/// as it can during the copy. Interrupted flushes are retried at once.
///
/// # Errors
///
/// Returns the first error that is neither would-block nor interrupted
pub fn flush<W: io::Write + ?Sized>(writer: &mut W, backoff: &mut Backoff) -> Result<()> {
    loop {
        match writer.flush() {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                tracing::trace!("flush would block");
                backoff.wait();
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(Error::from(e).context("flush failed")),
        }
    }
}

fn transfer_error(err: Error, offset: u64) -> Error {
    err.context(format!("transfer failed after {offset} bytes"))
}
