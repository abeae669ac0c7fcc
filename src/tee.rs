//! Stream duplication adapters
//!
//! [`TeeReader`] mirrors what it reads; [`TeeWriter`] mirrors what its
//! primary sink accepts. Both report counts from the primary direction only:
//! bytes already taken from the source (or accepted by the primary sink) are
//! never reported as lost because the side sink failed. Side failures are
//! wrapped in [`Error::Mirror`] so callers can tell them apart.
//!
//! With a [`Policy`], only the sub-operation that signaled is retried,
//! resuming from its partial progress.

use crate::error::{Error, Result};
use crate::policy::{should_retry, CallSite, Policy, ReturnPolicy};
use crate::stream::{Sink, Source};

/// Write all of `data` to `side`, retrying signals the policy asks for
fn mirror<W, P>(side: &mut W, data: &[u8], policy: &mut P, site: CallSite) -> Result<()>
where
    W: Sink + ?Sized,
    P: Policy + ?Sized,
{
    let mut off = 0;
    while off < data.len() {
        let offered = data.len() - off;
        let (n, res) = side.write(&data[off..]);
        let n = n.min(offered);
        off += n;
        match res {
            Ok(()) if n < offered => return Err(Error::ShortWrite.mirror()),
            Ok(()) => {}
            Err(e) if should_retry(policy, site, &e) => {}
            Err(e) => return Err(e.mirror()),
        }
    }
    Ok(())
}

/// Source that writes everything it reads to a side sink
///
/// The returned count is always the number of bytes obtained from the inner
/// source, whatever happened to the mirror write.
#[derive(Debug)]
pub struct TeeReader<R, W, P = ReturnPolicy> {
    source: R,
    side: W,
    policy: P,
}

impl<R: Source, W: Sink> TeeReader<R, W> {
    /// Tee `source` into `side` without retries
    pub const fn new(source: R, side: W) -> Self {
        Self {
            source,
            side,
            policy: ReturnPolicy,
        }
    }
}

impl<R: Source, W: Sink, P: Policy> TeeReader<R, W, P> {
    /// Tee `source` into `side`, consulting `policy` on semantic signals
    ///
    /// When a read-side signal is retried after bytes were already obtained,
    /// the call returns those bytes with success instead of reading again.
    pub const fn with_policy(source: R, side: W, policy: P) -> Self {
        Self {
            source,
            side,
            policy,
        }
    }

    /// The side sink
    pub const fn side(&self) -> &W {
        &self.side
    }

    /// Split into source, side sink and policy
    pub fn into_parts(self) -> (R, W, P) {
        (self.source, self.side, self.policy)
    }
}

impl<R: Source, W: Sink, P: Policy> Source for TeeReader<R, W, P> {
    fn read(&mut self, buf: &mut [u8]) -> (usize, Result<()>) {
        loop {
            let (n, res) = self.source.read(buf);
            let n = n.min(buf.len());
            if n > 0 {
                if let Err(e) = mirror(
                    &mut self.side,
                    &buf[..n],
                    &mut self.policy,
                    CallSite::TeeReaderSideWrite,
                ) {
                    return (n, Err(e));
                }
                return match res {
                    Err(e) if should_retry(&mut self.policy, CallSite::TeeReaderRead, &e) => {
                        (n, Ok(()))
                    }
                    other => (n, other),
                };
            }
            match res {
                Err(e) if should_retry(&mut self.policy, CallSite::TeeReaderRead, &e) => {}
                other => return (0, other),
            }
        }
    }
}

/// Sink that mirrors whatever its primary sink accepts
///
/// The returned count is always the number of bytes the primary accepted, so
/// retrying with `&buf[n..]` never re-delivers bytes to the primary.
#[derive(Debug)]
pub struct TeeWriter<W, T, P = ReturnPolicy> {
    primary: W,
    side: T,
    policy: P,
}

impl<W: Sink, T: Sink> TeeWriter<W, T> {
    /// Tee writes to `primary` into `side` without retries
    pub const fn new(primary: W, side: T) -> Self {
        Self {
            primary,
            side,
            policy: ReturnPolicy,
        }
    }
}

impl<W: Sink, T: Sink, P: Policy> TeeWriter<W, T, P> {
    /// Tee writes to `primary` into `side`, consulting `policy` on signals
    pub const fn with_policy(primary: W, side: T, policy: P) -> Self {
        Self {
            primary,
            side,
            policy,
        }
    }

    /// The primary sink
    pub const fn primary(&self) -> &W {
        &self.primary
    }

    /// The side sink
    pub const fn side(&self) -> &T {
        &self.side
    }

    /// Split into primary sink, side sink and policy
    pub fn into_parts(self) -> (W, T, P) {
        (self.primary, self.side, self.policy)
    }
}

impl<W: Sink, T: Sink, P: Policy> Sink for TeeWriter<W, T, P> {
    fn write(&mut self, buf: &[u8]) -> (usize, Result<()>) {
        if buf.is_empty() {
            return (0, Ok(()));
        }
        let mut off = 0;
        loop {
            let offered = buf.len() - off;
            let (n, res) = self.primary.write(&buf[off..]);
            let n = n.min(offered);
            if n > 0 {
                if let Err(e) = mirror(
                    &mut self.side,
                    &buf[off..off + n],
                    &mut self.policy,
                    CallSite::TeeWriterSideWrite,
                ) {
                    return (off + n, Err(e));
                }
                off += n;
            }
            match res {
                Ok(()) if off < buf.len() => return (off, Err(Error::ShortWrite)),
                Ok(()) => return (off, Ok(())),
                Err(e) if should_retry(&mut self.policy, CallSite::TeeWriterPrimaryWrite, &e) => {
                    if off == buf.len() {
                        return (off, Ok(()));
                    }
                }
                Err(e) => return (off, Err(e)),
            }
        }
    }
}
