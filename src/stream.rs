//! Byte stream capabilities
//!
//! [`Source`] and [`Sink`] return `(count, result)` pairs so that a positive
//! count and a non-success outcome can be delivered by the same call.
//!
//! Optional capabilities are discovered through provided methods that
//! return trait objects:
//!
//! - [`Source::as_write_to`]: the source can push itself into any sink
//! - [`Sink::as_read_from`]: the sink can pull directly from any source
//! - [`Source::as_seek`]: the source can be repositioned, used to roll back
//!   bytes that were read but never accepted downstream

use std::io::{self, SeekFrom};

use crate::copy::copy;
use crate::error::{Error, Result};

/// Producer of bytes
pub trait Source {
    /// Read up to `buf.len()` bytes into `buf`
    ///
    /// `(0, Ok(()))` means "no progress", not end of stream. End of stream
    /// is reported as [`Error::Eof`], possibly together with a final count.
    fn read(&mut self, buf: &mut [u8]) -> (usize, Result<()>);

    /// Push capability, if the source has one
    fn as_write_to(&mut self) -> Option<&mut dyn WriteTo> {
        None
    }

    /// Seek capability, if the source has one
    fn as_seek(&mut self) -> Option<&mut dyn Seek> {
        None
    }
}

/// Consumer of bytes
pub trait Sink {
    /// Write bytes from `buf`
    ///
    /// Accepting fewer than `buf.len()` bytes must come with an error,
    /// except when `buf` is empty.
    fn write(&mut self, buf: &[u8]) -> (usize, Result<()>);

    /// Pull capability, if the sink has one
    fn as_read_from(&mut self) -> Option<&mut dyn ReadFrom> {
        None
    }
}

/// Source that transfers itself directly into a sink
pub trait WriteTo {
    /// Push all available bytes into `dst`
    fn write_to(&mut self, dst: &mut dyn Sink) -> (u64, Result<()>);
}

/// Sink that pulls directly from a source
pub trait ReadFrom {
    /// Pull all available bytes from `src`
    fn read_from(&mut self, src: &mut dyn Source) -> (u64, Result<()>);
}

/// Repositionable stream
pub trait Seek {
    /// Seek to `pos`, returning the new absolute position
    ///
    /// # Errors
    ///
    /// Returns an error if the position is invalid or the stream refuses
    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;
}

impl<S: Source + ?Sized> Source for &mut S {
    fn read(&mut self, buf: &mut [u8]) -> (usize, Result<()>) {
        (**self).read(buf)
    }

    fn as_write_to(&mut self) -> Option<&mut dyn WriteTo> {
        (**self).as_write_to()
    }

    fn as_seek(&mut self) -> Option<&mut dyn Seek> {
        (**self).as_seek()
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> (usize, Result<()>) {
        (**self).read(buf)
    }

    fn as_write_to(&mut self) -> Option<&mut dyn WriteTo> {
        (**self).as_write_to()
    }

    fn as_seek(&mut self) -> Option<&mut dyn Seek> {
        (**self).as_seek()
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn write(&mut self, buf: &[u8]) -> (usize, Result<()>) {
        (**self).write(buf)
    }

    fn as_read_from(&mut self) -> Option<&mut dyn ReadFrom> {
        (**self).as_read_from()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write(&mut self, buf: &[u8]) -> (usize, Result<()>) {
        (**self).write(buf)
    }

    fn as_read_from(&mut self) -> Option<&mut dyn ReadFrom> {
        (**self).as_read_from()
    }
}

impl Source for &[u8] {
    fn read(&mut self, buf: &mut [u8]) -> (usize, Result<()>) {
        if buf.is_empty() {
            return (0, Ok(()));
        }
        if self.is_empty() {
            return (0, Err(Error::Eof));
        }
        let n = buf.len().min(self.len());
        let (head, tail) = self.split_at(n);
        buf[..n].copy_from_slice(head);
        *self = tail;
        (n, Ok(()))
    }
}

impl Sink for Vec<u8> {
    fn write(&mut self, buf: &[u8]) -> (usize, Result<()>) {
        self.extend_from_slice(buf);
        (buf.len(), Ok(()))
    }
}

impl<T: AsRef<[u8]>> Source for io::Cursor<T> {
    fn read(&mut self, buf: &mut [u8]) -> (usize, Result<()>) {
        if buf.is_empty() {
            return (0, Ok(()));
        }
        match io::Read::read(self, buf) {
            Ok(0) => (0, Err(Error::Eof)),
            Ok(n) => (n, Ok(())),
            Err(e) => (0, Err(e.into())),
        }
    }

    fn as_seek(&mut self) -> Option<&mut dyn Seek> {
        Some(self)
    }
}

impl<T: AsRef<[u8]>> Seek for io::Cursor<T> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(io::Seek::seek(self, pos)?)
    }
}

/// Bridge from `std::io::Read` / `std::io::Write`
///
/// `Ok(0)` from a non-empty read becomes [`Error::Eof`], interrupted calls
/// are retried, and `ErrorKind::WouldBlock` becomes [`Error::WouldBlock`].
#[derive(Debug, Default)]
pub struct FromStd<T>(pub T);

impl<T> FromStd<T> {
    /// Unwrap the inner stream
    pub fn into_inner(self) -> T {
        self.0
    }
}

fn std_read<R: io::Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> (usize, Result<()>) {
    if buf.is_empty() {
        return (0, Ok(()));
    }
    loop {
        return match reader.read(buf) {
            Ok(0) => (0, Err(Error::Eof)),
            Ok(n) => (n, Ok(())),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => (0, Err(Error::WouldBlock)),
            Err(e) => (0, Err(e.into())),
        };
    }
}

fn std_write<W: io::Write + ?Sized>(writer: &mut W, buf: &[u8]) -> (usize, Result<()>) {
    loop {
        return match writer.write(buf) {
            Ok(n) => (n.min(buf.len()), Ok(())),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => (0, Err(Error::WouldBlock)),
            Err(e) => (0, Err(e.into())),
        };
    }
}

impl<T: io::Read> Source for FromStd<T> {
    fn read(&mut self, buf: &mut [u8]) -> (usize, Result<()>) {
        std_read(&mut self.0, buf)
    }
}

impl<T: io::Write> Sink for FromStd<T> {
    fn write(&mut self, buf: &[u8]) -> (usize, Result<()>) {
        std_write(&mut self.0, buf)
    }
}

/// Like [`FromStd`] for seekable readers, exposing the seek capability
#[derive(Debug, Default)]
pub struct SeekableStd<T>(pub T);

impl<T> SeekableStd<T> {
    /// Unwrap the inner stream
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: io::Read + io::Seek> Source for SeekableStd<T> {
    fn read(&mut self, buf: &mut [u8]) -> (usize, Result<()>) {
        std_read(&mut self.0, buf)
    }

    fn as_seek(&mut self) -> Option<&mut dyn Seek> {
        Some(self)
    }
}

impl<T: io::Seek> Seek for SeekableStd<T> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.0.seek(pos)?)
    }
}

/// Byte-limiting view over a source
///
/// Reports [`Error::Eof`] once `remaining` reaches zero. Relative seeks are
/// forwarded to the inner source and credit the budget back, so a rollback
/// through the view returns the unwritten bytes to both.
pub struct Limited<S> {
    inner: S,
    remaining: u64,
}

impl<S: Source> Limited<S> {
    /// Limit `inner` to at most `limit` bytes
    pub const fn new(inner: S, limit: u64) -> Self {
        Self {
            inner,
            remaining: limit,
        }
    }

    /// Bytes left before the view reports end of stream
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Unwrap the inner source
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Source> Source for Limited<S> {
    fn read(&mut self, buf: &mut [u8]) -> (usize, Result<()>) {
        if self.remaining == 0 {
            return (0, Err(Error::Eof));
        }
        let max = usize::try_from(self.remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let (n, res) = self.inner.read(&mut buf[..max]);
        let n = n.min(max);
        self.remaining -= n as u64;
        (n, res)
    }

    fn as_seek(&mut self) -> Option<&mut dyn Seek> {
        if self.inner.as_seek().is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl<S: Source> Seek for Limited<S> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let SeekFrom::Current(delta) = pos else {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "limited view only supports relative seeks",
            )
            .into());
        };
        if delta > 0 && delta.unsigned_abs() > self.remaining {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek past the end of the limited view",
            )
            .into());
        }
        let Some(inner) = self.inner.as_seek() else {
            return Err(Error::NoSeeker);
        };
        let pos = inner.seek(pos)?;
        if delta < 0 {
            self.remaining += delta.unsigned_abs();
        } else {
            self.remaining -= delta.unsigned_abs();
        }
        Ok(pos)
    }
}

/// Gives any source the push capability, implemented with [`copy`]
pub struct PushAdapter<R>(pub R);

impl<R: Source> Source for PushAdapter<R> {
    fn read(&mut self, buf: &mut [u8]) -> (usize, Result<()>) {
        self.0.read(buf)
    }

    fn as_write_to(&mut self) -> Option<&mut dyn WriteTo> {
        Some(self)
    }
}

impl<R: Source> WriteTo for PushAdapter<R> {
    fn write_to(&mut self, dst: &mut dyn Sink) -> (u64, Result<()>) {
        copy(dst, &mut self.0)
    }
}

/// Gives any sink the pull capability, implemented with [`copy`]
pub struct PullAdapter<W>(pub W);

impl<W: Sink> Sink for PullAdapter<W> {
    fn write(&mut self, buf: &[u8]) -> (usize, Result<()>) {
        self.0.write(buf)
    }

    fn as_read_from(&mut self) -> Option<&mut dyn ReadFrom> {
        Some(self)
    }
}

impl<W: Sink> ReadFrom for PullAdapter<W> {
    fn read_from(&mut self, src: &mut dyn Source) -> (u64, Result<()>) {
        copy(&mut self.0, src)
    }
}
