//! Scripted sources and sinks shared by the integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use iox::{Error, ReadFrom, Result, Sink, Source, WriteTo};

/// Aborts the test process if a retry loop never converges
pub struct TestTimeoutGuard {
    cancelled: Arc<AtomicBool>,
}

impl Drop for TestTimeoutGuard {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

pub fn test_timeout_guard(duration: Duration) -> TestTimeoutGuard {
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_clone = Arc::clone(&cancelled);
    std::thread::spawn(move || {
        std::thread::sleep(duration);
        if !cancelled_clone.load(Ordering::SeqCst) {
            eprintln!("Test timeout exceeded ({}s). Aborting.", duration.as_secs());
            std::process::abort();
        }
    });
    TestTimeoutGuard { cancelled }
}

/// Error a scripted step ends with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    WouldBlock,
    More,
    Fail,
}

impl Signal {
    pub fn error(self) -> Error {
        match self {
            Self::WouldBlock => Error::WouldBlock,
            Self::More => Error::More,
            Self::Fail => Error::from(std::io::Error::other("scripted failure")),
        }
    }
}

fn outcome(signal: Option<Signal>) -> Result<()> {
    signal.map_or(Ok(()), |s| Err(s.error()))
}

/// Source replaying a fixed list of `(bytes, signal)` reads, then end of stream
///
/// A step larger than the caller's buffer is split; the signal stays with the
/// last piece.
#[derive(Debug, Default)]
pub struct ScriptSource {
    steps: VecDeque<(Vec<u8>, Option<Signal>)>,
    pub reads: usize,
}

impl ScriptSource {
    pub fn new(steps: Vec<(&[u8], Option<Signal>)>) -> Self {
        Self {
            steps: steps.into_iter().map(|(d, s)| (d.to_vec(), s)).collect(),
            reads: 0,
        }
    }
}

impl Source for ScriptSource {
    fn read(&mut self, buf: &mut [u8]) -> (usize, Result<()>) {
        self.reads += 1;
        let Some((mut data, signal)) = self.steps.pop_front() else {
            return (0, Err(Error::Eof));
        };
        if data.len() > buf.len() {
            let rest = data.split_off(buf.len());
            self.steps.push_front((rest, signal));
            buf.copy_from_slice(&data);
            return (data.len(), Ok(()));
        }
        buf[..data.len()].copy_from_slice(&data);
        (data.len(), outcome(signal))
    }
}

/// Sink replaying a list of `(accept, signal)` writes, then accepting everything
///
/// `accept` of `None` takes the whole buffer.
#[derive(Debug, Default)]
pub struct ScriptSink {
    steps: VecDeque<(Option<usize>, Option<Signal>)>,
    pub out: Vec<u8>,
    pub writes: usize,
}

impl ScriptSink {
    pub fn new(steps: Vec<(Option<usize>, Option<Signal>)>) -> Self {
        Self {
            steps: steps.into(),
            out: Vec::new(),
            writes: 0,
        }
    }
}

impl Sink for ScriptSink {
    fn write(&mut self, buf: &[u8]) -> (usize, Result<()>) {
        self.writes += 1;
        let (accept, signal) = self.steps.pop_front().unwrap_or((None, None));
        let n = accept.map_or(buf.len(), |k| k.min(buf.len()));
        self.out.extend_from_slice(&buf[..n]);
        (n, outcome(signal))
    }
}

/// Source with a scripted push capability
///
/// Each `write_to` call consumes one `(len, signal)` step, pushing the next
/// `len` bytes of `data` into the destination.
#[derive(Debug, Default)]
pub struct PushSource {
    data: Vec<u8>,
    pos: usize,
    steps: VecDeque<(usize, Option<Signal>)>,
    pub pushes: usize,
    pub reads: usize,
}

impl PushSource {
    pub fn new(data: &[u8], steps: Vec<(usize, Option<Signal>)>) -> Self {
        Self {
            data: data.to_vec(),
            steps: steps.into(),
            ..Self::default()
        }
    }
}

impl Source for PushSource {
    fn read(&mut self, _buf: &mut [u8]) -> (usize, Result<()>) {
        self.reads += 1;
        (0, Err(Error::from(std::io::Error::other("read on push source"))))
    }

    fn as_write_to(&mut self) -> Option<&mut dyn WriteTo> {
        Some(self)
    }
}

impl WriteTo for PushSource {
    fn write_to(&mut self, dst: &mut dyn Sink) -> (u64, Result<()>) {
        self.pushes += 1;
        let (len, signal) = self
            .steps
            .pop_front()
            .unwrap_or((self.data.len() - self.pos, None));
        let end = (self.pos + len).min(self.data.len());
        let (n, res) = dst.write(&self.data[self.pos..end]);
        self.pos += n;
        if res.is_err() {
            return (n as u64, res);
        }
        (n as u64, outcome(signal))
    }
}

/// Sink with a scripted pull capability
///
/// Each `read_from` call consumes one `(len, signal)` step, pulling up to
/// `len` bytes from the source.
#[derive(Debug, Default)]
pub struct PullSink {
    steps: VecDeque<(usize, Option<Signal>)>,
    pub out: Vec<u8>,
    pub pulls: usize,
    pub writes: usize,
}

impl PullSink {
    pub fn new(steps: Vec<(usize, Option<Signal>)>) -> Self {
        Self {
            steps: steps.into(),
            ..Self::default()
        }
    }
}

impl Sink for PullSink {
    fn write(&mut self, buf: &[u8]) -> (usize, Result<()>) {
        self.writes += 1;
        self.out.extend_from_slice(buf);
        (buf.len(), Ok(()))
    }

    fn as_read_from(&mut self) -> Option<&mut dyn ReadFrom> {
        Some(self)
    }
}

impl ReadFrom for PullSink {
    fn read_from(&mut self, src: &mut dyn Source) -> (u64, Result<()>) {
        self.pulls += 1;
        let (len, signal) = self.steps.pop_front().unwrap_or((usize::MAX, None));
        let mut total = 0u64;
        let mut buf = [0u8; 64];
        let mut left = len;
        while left > 0 {
            let want = left.min(buf.len());
            let (n, res) = src.read(&mut buf[..want]);
            self.out.extend_from_slice(&buf[..n]);
            total += n as u64;
            left -= n;
            match res {
                Ok(()) if n > 0 => {}
                Ok(()) => break,
                Err(e) if e.is_eof() => return (total, Ok(())),
                Err(e) => return (total, Err(e)),
            }
        }
        (total, outcome(signal))
    }
}
