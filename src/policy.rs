//! Retry decisions for semantic signals
//!
//! A [`Policy`] maps a call site and a would-block/more signal to an
//! [`Action`]. On [`Action::Retry`] the engine calls [`Policy::yield_now`]
//! and re-attempts the same sub-operation, keeping the bytes already
//! accounted for. Without a policy nothing is ever retried.
//!
//! Policies are caller-owned and borrowed exclusively for one operation at a
//! time; they may carry per-operation state.

use std::fmt;

use crate::error::{Error, ErrorKind};

/// Where a semantic signal came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallSite {
    /// Source read inside the generic copy loop
    CopyRead,
    /// Sink write inside the generic copy loop
    CopyWrite,
    /// Source push fast path
    CopyWriteTo,
    /// Sink pull fast path
    CopyReadFrom,
    /// Source read inside a tee reader
    TeeReaderRead,
    /// Mirror write inside a tee reader
    TeeReaderSideWrite,
    /// Primary write inside a tee writer
    TeeWriterPrimaryWrite,
    /// Mirror write inside a tee writer
    TeeWriterSideWrite,
}

impl CallSite {
    /// Whether the site hands bytes to a consumer
    #[must_use]
    pub const fn is_write_side(self) -> bool {
        !matches!(self, Self::CopyRead | Self::TeeReaderRead)
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CopyRead => "CopyRead",
            Self::CopyWrite => "CopyWrite",
            Self::CopyWriteTo => "CopyWriteTo",
            Self::CopyReadFrom => "CopyReadFrom",
            Self::TeeReaderRead => "TeeReaderRead",
            Self::TeeReaderSideWrite => "TeeReaderSideWrite",
            Self::TeeWriterPrimaryWrite => "TeeWriterPrimaryWrite",
            Self::TeeWriterSideWrite => "TeeWriterSideWrite",
        })
    }
}

/// What the engine does with a semantic signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Action {
    /// Surface the signal to the caller
    #[default]
    Return,
    /// Yield, then re-attempt the same sub-operation
    Retry,
}

/// Decision table for would-block and more-to-come signals
///
/// If [`Policy::yield_now`] does not actually wait for readiness, a policy
/// that retries will spin.
pub trait Policy {
    /// Called before every retry
    fn yield_now(&mut self, site: CallSite);

    /// Decide what to do with a would-block signal at `site`
    fn on_would_block(&mut self, site: CallSite) -> Action;

    /// Decide what to do with a more-to-come signal at `site`
    fn on_more(&mut self, site: CallSite) -> Action;
}

impl<P: Policy + ?Sized> Policy for &mut P {
    fn yield_now(&mut self, site: CallSite) {
        (**self).yield_now(site);
    }

    fn on_would_block(&mut self, site: CallSite) -> Action {
        (**self).on_would_block(site)
    }

    fn on_more(&mut self, site: CallSite) -> Action {
        (**self).on_more(site)
    }
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    fn yield_now(&mut self, site: CallSite) {
        (**self).yield_now(site);
    }

    fn on_would_block(&mut self, site: CallSite) -> Action {
        (**self).on_would_block(site)
    }

    fn on_more(&mut self, site: CallSite) -> Action {
        (**self).on_more(site)
    }
}

/// Consult `policy` about `err`; yields and returns true on retry
///
/// Non-semantic errors are never retried.
pub(crate) fn should_retry<P: Policy + ?Sized>(
    policy: &mut P,
    site: CallSite,
    err: &Error,
) -> bool {
    let action = match err.kind() {
        ErrorKind::WouldBlock => policy.on_would_block(site),
        ErrorKind::More => policy.on_more(site),
        _ => return false,
    };
    if action == Action::Retry {
        tracing::trace!(%site, signal = %err, "retrying after yield");
        policy.yield_now(site);
        true
    } else {
        false
    }
}

/// Default yield hook: cooperative scheduling yield
pub fn default_yield(_site: CallSite) {
    std::thread::yield_now();
}

/// Never retries; equivalent to passing no policy at all
#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnPolicy;

impl Policy for ReturnPolicy {
    fn yield_now(&mut self, _site: CallSite) {}

    fn on_would_block(&mut self, _site: CallSite) -> Action {
        Action::Return
    }

    fn on_more(&mut self, _site: CallSite) -> Action {
        Action::Return
    }
}

/// Retries on would-block, returns on more-to-come
///
/// Suits protocols where more-to-come marks a delivery boundary the caller
/// wants to act on immediately before calling again.
#[derive(Clone, Copy)]
pub struct YieldPolicy<F = fn(CallSite)> {
    yield_fn: F,
}

impl YieldPolicy {
    /// Policy yielding with [`std::thread::yield_now`]
    #[must_use]
    pub fn new() -> Self {
        Self {
            yield_fn: default_yield,
        }
    }
}

impl Default for YieldPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FnMut(CallSite)> YieldPolicy<F> {
    /// Policy calling `yield_fn` before each retry
    ///
    /// The hook may spin, park, poll an event source, or run one tick of an
    /// event loop.
    pub const fn with_yield(yield_fn: F) -> Self {
        Self { yield_fn }
    }
}

impl<F: FnMut(CallSite)> Policy for YieldPolicy<F> {
    fn yield_now(&mut self, site: CallSite) {
        (self.yield_fn)(site);
    }

    fn on_would_block(&mut self, _site: CallSite) -> Action {
        Action::Retry
    }

    fn on_more(&mut self, _site: CallSite) -> Action {
        Action::Return
    }
}

/// Retries would-block only on write-side call sites
///
/// Useful when reads are already driven by an event loop but writes need a
/// local backpressure strategy.
#[derive(Clone, Copy)]
pub struct YieldOnWriteWouldBlockPolicy<F = fn(CallSite)> {
    yield_fn: F,
}

impl YieldOnWriteWouldBlockPolicy {
    /// Policy yielding with [`std::thread::yield_now`]
    #[must_use]
    pub fn new() -> Self {
        Self {
            yield_fn: default_yield,
        }
    }
}

impl Default for YieldOnWriteWouldBlockPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FnMut(CallSite)> YieldOnWriteWouldBlockPolicy<F> {
    /// Policy calling `yield_fn` before each retry
    pub const fn with_yield(yield_fn: F) -> Self {
        Self { yield_fn }
    }
}

impl<F: FnMut(CallSite)> Policy for YieldOnWriteWouldBlockPolicy<F> {
    fn yield_now(&mut self, site: CallSite) {
        (self.yield_fn)(site);
    }

    fn on_would_block(&mut self, site: CallSite) -> Action {
        if site.is_write_side() {
            Action::Retry
        } else {
            Action::Return
        }
    }

    fn on_more(&mut self, _site: CallSite) -> Action {
        Action::Return
    }
}

type YieldFn<'a> = Box<dyn FnMut(CallSite) + 'a>;
type DecideFn<'a> = Box<dyn FnMut(CallSite) -> Action + 'a>;

/// Policy assembled from closures
///
/// Omitted decisions return [`Action::Return`]; an omitted yield hook uses
/// [`std::thread::yield_now`].
#[derive(Default)]
pub struct FnPolicy<'a> {
    yield_fn: Option<YieldFn<'a>>,
    would_block_fn: Option<DecideFn<'a>>,
    more_fn: Option<DecideFn<'a>>,
}

impl<'a> FnPolicy<'a> {
    /// Policy with every decision defaulted
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the yield hook
    #[must_use]
    pub fn on_yield(mut self, f: impl FnMut(CallSite) + 'a) -> Self {
        self.yield_fn = Some(Box::new(f));
        self
    }

    /// Set the would-block decision
    #[must_use]
    pub fn would_block(mut self, f: impl FnMut(CallSite) -> Action + 'a) -> Self {
        self.would_block_fn = Some(Box::new(f));
        self
    }

    /// Set the more-to-come decision
    #[must_use]
    pub fn more(mut self, f: impl FnMut(CallSite) -> Action + 'a) -> Self {
        self.more_fn = Some(Box::new(f));
        self
    }
}

impl Policy for FnPolicy<'_> {
    fn yield_now(&mut self, site: CallSite) {
        match self.yield_fn.as_mut() {
            Some(f) => f(site),
            None => default_yield(site),
        }
    }

    fn on_would_block(&mut self, site: CallSite) -> Action {
        self.would_block_fn.as_mut().map_or(Action::Return, |f| f(site))
    }

    fn on_more(&mut self, site: CallSite) -> Action {
        self.more_fn.as_mut().map_or(Action::Return, |f| f(site))
    }
}

impl fmt::Debug for FnPolicy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPolicy")
            .field("yield_fn", &self.yield_fn.is_some())
            .field("would_block_fn", &self.would_block_fn.is_some())
            .field("more_fn", &self.more_fn.is_some())
            .finish()
    }
}
