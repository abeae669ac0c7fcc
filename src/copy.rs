//! Copy engine with would-block/more semantics
//!
//! The helpers here extend the conventional copy loop in three ways:
//!
//! - would-block and more-to-come are surfaced with the exact byte count
//!   accepted so far instead of being treated as failures
//! - a partial write that ends in one of those signals rolls the source back
//!   by the unwritten span, so nothing read-but-undelivered is lost
//! - an optional [`Policy`] may turn a signal into an in-place retry
//!
//! # Dispatch
//!
//! Checked once, in this order:
//!
//! 1. the source's push capability ([`Source::as_write_to`])
//! 2. the destination's pull capability ([`Sink::as_read_from`])
//! 3. the generic buffered loop
//!
//! # Counts
//!
//! Every returned count is the number of bytes accepted by the destination,
//! never the number merely read from the source.
//!
//! # Usage
//!
//! ```rust
//! use iox::copy::copy;
//!
//! let mut src: &[u8] = b"hello";
//! let mut dst = Vec::new();
//! let (n, res) = copy(&mut dst, &mut src);
//! assert_eq!(n, 5);
//! assert!(res.is_ok());
//! assert_eq!(dst, b"hello");
//! ```

use std::io::SeekFrom;

use crate::error::{Error, Result};
use crate::policy::{should_retry, CallSite, Policy};
use crate::stream::{Limited, Sink, Source};

/// Working buffer size used when the caller supplies none
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Copy from `src` to `dst` until end of stream, a signal, or an error
///
/// End of stream maps to success. Would-block and more-to-come are returned
/// unchanged together with the bytes accepted so far. A read of zero bytes
/// with no error stops the copy with success.
pub fn copy(dst: &mut dyn Sink, src: &mut dyn Source) -> (u64, Result<()>) {
    Engine::new(None).copy(dst, src, None)
}

/// Like [`copy`], staging through `buf` when the generic loop runs
///
/// # Panics
///
/// Panics if `buf` is empty.
pub fn copy_buffer(dst: &mut dyn Sink, src: &mut dyn Source, buf: &mut [u8]) -> (u64, Result<()>) {
    assert!(!buf.is_empty(), "empty buffer in copy_buffer");
    Engine::new(None).copy(dst, src, Some(buf))
}

/// Copy exactly `n` bytes, or fewer on error
///
/// On return the count equals `n` if and only if the result is `Ok`. A
/// source that ends early yields [`Error::UnexpectedEof`]; signals and other
/// errors are passed through with the partial count.
pub fn copy_n(dst: &mut dyn Sink, src: &mut dyn Source, n: u64) -> (u64, Result<()>) {
    Engine::new(None).copy_n(dst, src, n, None)
}

/// Like [`copy_n`], staging through `buf` when the generic loop runs
///
/// # Panics
///
/// Panics if `buf` is empty and `n` is not zero.
pub fn copy_n_buffer(
    dst: &mut dyn Sink,
    src: &mut dyn Source,
    n: u64,
    buf: &mut [u8],
) -> (u64, Result<()>) {
    if n == 0 {
        return (0, Ok(()));
    }
    assert!(!buf.is_empty(), "empty buffer in copy_n_buffer");
    Engine::new(None).copy_n(dst, src, n, Some(buf))
}

/// [`copy`] consulting `policy` on every semantic signal
///
/// `None` behaves exactly like [`copy`].
pub fn copy_policy(
    dst: &mut dyn Sink,
    src: &mut dyn Source,
    policy: Option<&mut (dyn Policy + '_)>,
) -> (u64, Result<()>) {
    Engine::new(policy).copy(dst, src, None)
}

/// [`copy_buffer`] consulting `policy` on every semantic signal
///
/// # Panics
///
/// Panics if `buf` is empty.
pub fn copy_buffer_policy(
    dst: &mut dyn Sink,
    src: &mut dyn Source,
    buf: &mut [u8],
    policy: Option<&mut (dyn Policy + '_)>,
) -> (u64, Result<()>) {
    assert!(!buf.is_empty(), "empty buffer in copy_buffer_policy");
    Engine::new(policy).copy(dst, src, Some(buf))
}

/// [`copy_n`] consulting `policy` on every semantic signal
pub fn copy_n_policy(
    dst: &mut dyn Sink,
    src: &mut dyn Source,
    n: u64,
    policy: Option<&mut (dyn Policy + '_)>,
) -> (u64, Result<()>) {
    Engine::new(policy).copy_n(dst, src, n, None)
}

/// [`copy_n_buffer`] consulting `policy` on every semantic signal
///
/// # Panics
///
/// Panics if `buf` is empty and `n` is not zero.
pub fn copy_n_buffer_policy(
    dst: &mut dyn Sink,
    src: &mut dyn Source,
    n: u64,
    buf: &mut [u8],
    policy: Option<&mut (dyn Policy + '_)>,
) -> (u64, Result<()>) {
    if n == 0 {
        return (0, Ok(()));
    }
    assert!(!buf.is_empty(), "empty buffer in copy_n_buffer_policy");
    Engine::new(policy).copy_n(dst, src, n, Some(buf))
}

/// One copy operation and the policy it may consult
struct Engine<'p> {
    policy: Option<&'p mut dyn Policy>,
}

impl<'p> Engine<'p> {
    fn new(policy: Option<&'p mut (dyn Policy + '_)>) -> Self {
        Self {
            policy: policy.map(|p| p as &mut dyn Policy),
        }
    }

    fn retry(&mut self, site: CallSite, err: &Error) -> bool {
        match self.policy.as_deref_mut() {
            Some(policy) => should_retry(policy, site, err),
            None => false,
        }
    }

    fn copy_n(
        &mut self,
        dst: &mut dyn Sink,
        src: &mut dyn Source,
        n: u64,
        buf: Option<&mut [u8]>,
    ) -> (u64, Result<()>) {
        if n == 0 {
            return (0, Ok(()));
        }
        // The limited view never exposes push, so dispatch goes straight to
        // the destination's pull capability when it has one.
        let mut limited = Limited::new(src, n);
        let (written, res) = self.copy(dst, &mut limited, buf);
        if written == n {
            return (n, Ok(()));
        }
        match res {
            Ok(()) => (written, Err(Error::UnexpectedEof)),
            Err(e) if e.is_eof() => (written, Err(Error::UnexpectedEof)),
            Err(e) => (written, Err(e)),
        }
    }

    fn copy(
        &mut self,
        dst: &mut dyn Sink,
        src: &mut dyn Source,
        buf: Option<&mut [u8]>,
    ) -> (u64, Result<()>) {
        if let Some(push) = src.as_write_to() {
            tracing::trace!("copy: source push fast path");
            return self.fast_path(CallSite::CopyWriteTo, || push.write_to(dst));
        }
        if let Some(pull) = dst.as_read_from() {
            tracing::trace!("copy: destination pull fast path");
            return self.fast_path(CallSite::CopyReadFrom, || pull.read_from(src));
        }

        let mut local;
        let buf = match buf {
            Some(buf) => buf,
            None => {
                local = vec![0u8; DEFAULT_BUFFER_SIZE];
                local.as_mut_slice()
            }
        };
        self.generic(dst, src, buf)
    }

    /// Re-invoke a direct transfer while the policy asks for retries
    fn fast_path(
        &mut self,
        site: CallSite,
        mut transfer: impl FnMut() -> (u64, Result<()>),
    ) -> (u64, Result<()>) {
        let mut total = 0u64;
        loop {
            let (n, res) = transfer();
            total += n;
            match res {
                Ok(()) => return (total, Ok(())),
                Err(e) if e.is_eof() => return (total, Ok(())),
                Err(e) if self.retry(site, &e) => continue,
                Err(e) => return (total, Err(e)),
            }
        }
    }

    fn generic(
        &mut self,
        dst: &mut dyn Sink,
        src: &mut dyn Source,
        buf: &mut [u8],
    ) -> (u64, Result<()>) {
        let mut written = 0u64;
        loop {
            let (nr, read_res) = src.read(buf);
            let nr = nr.min(buf.len());

            let mut off = 0;
            while off < nr {
                let offered = nr - off;
                let (nw, write_res) = dst.write(&buf[off..nr]);
                let nw = nw.min(offered);
                off += nw;
                written += nw as u64;
                match write_res {
                    Ok(()) if nw < offered => return (written, Err(Error::ShortWrite)),
                    Ok(()) => {}
                    Err(e) if !e.is_semantic() => return (written, Err(e)),
                    Err(e) if self.retry(CallSite::CopyWrite, &e) => {}
                    Err(e) => {
                        if nw < offered {
                            if let Err(rollback) = rollback(src, nr - off) {
                                return (written, Err(rollback));
                            }
                        }
                        return (written, Err(e));
                    }
                }
            }

            match read_res {
                Ok(()) if nr == 0 => return (written, Ok(())),
                Ok(()) => {}
                Err(e) if e.is_eof() => return (written, Ok(())),
                Err(e) if e.is_semantic() && self.retry(CallSite::CopyRead, &e) => {}
                Err(e) => return (written, Err(e)),
            }
        }
    }
}

/// Seek `src` back over `unwritten` bytes that the destination never took
fn rollback(src: &mut dyn Source, unwritten: usize) -> Result<()> {
    let Some(seeker) = src.as_seek() else {
        tracing::debug!(unwritten, "partial write cannot be rolled back: source not seekable");
        return Err(Error::NoSeeker);
    };
    let delta = i64::try_from(unwritten).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "rollback span too large")
    })?;
    match seeker.seek(SeekFrom::Current(-delta)) {
        Ok(pos) => {
            tracing::debug!(unwritten, pos, "rolled source back after partial write");
            Ok(())
        }
        Err(e) => {
            tracing::debug!(unwritten, error = %e, "rollback seek failed");
            Err(e)
        }
    }
}
