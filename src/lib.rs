//! iox: non-blocking stream transfer with would-block and more-to-come semantics
//!
//! This library provides copy and tee helpers for byte streams whose
//! operations may report two non-failure control signals alongside a byte
//! count: *would-block* (no progress without waiting for readiness) and
//! *more-to-come* (progress happened, further completions follow). Counts
//! always reflect bytes actually accepted by the destination, and partial
//! writes that end in a signal are rolled back on seekable sources.
//!
//! Optional retry policies turn signals into in-place retries, and
//! [`backoff::Backoff`] provides the adaptive wait a caller uses between
//! attempts.

pub mod backoff;
pub mod cli;
pub mod copy;
pub mod error;
pub mod fd;
pub mod policy;
pub mod progress;
pub mod semantics;
pub mod stream;
pub mod tee;
pub mod transfer;

// Re-export commonly used types
pub use backoff::Backoff;
pub use copy::{
    copy, copy_buffer, copy_buffer_policy, copy_n, copy_n_buffer, copy_n_buffer_policy,
    copy_n_policy, copy_policy,
};
pub use error::{Error, ErrorKind, Result, ResultExt};
pub use fd::{set_nonblocking, NonblockingGuard};
pub use policy::{
    Action, CallSite, FnPolicy, Policy, ReturnPolicy, YieldOnWriteWouldBlockPolicy, YieldPolicy,
};
pub use semantics::{classify, Outcome};
pub use stream::{
    FromStd, Limited, PullAdapter, PushAdapter, ReadFrom, Seek, SeekableStd, Sink, Source, WriteTo,
};
pub use tee::{TeeReader, TeeWriter};
pub use transfer::{drive, flush, TransferOptions, TransferStats};
