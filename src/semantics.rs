//! Classification of transfer outcomes
//!
//! Would-block and more-to-come are expected control flow, not failures:
//!
//! - would-block: retry later, after waiting for readiness
//! - more-to-come: progress was delivered; keep polling for further completions
//!
//! Either may accompany a positive byte count. Counts come first, semantics
//! second.

use std::fmt;

use crate::error::Error;

/// Outcome of a single operation under would-block/more semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Success, nothing more to come
    Ok,
    /// No progress possible right now
    WouldBlock,
    /// Progress happened and more completions are expected
    More,
    /// Any other error, including an end of stream not absorbed by a helper
    Failure,
}

impl Outcome {
    /// Classify an error value
    #[must_use]
    pub fn of(err: &Error) -> Self {
        if err.is_would_block() {
            Self::WouldBlock
        } else if err.is_more() {
            Self::More
        } else {
            Self::Failure
        }
    }

    /// Whether the outcome is safe to treat as a non-failure
    #[must_use]
    pub const fn is_non_failure(self) -> bool {
        !matches!(self, Self::Failure)
    }

    /// Whether the outcome delivered usable progress now
    #[must_use]
    pub const fn is_progress(self) -> bool {
        matches!(self, Self::Ok | Self::More)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::WouldBlock => "WouldBlock",
            Self::More => "More",
            Self::Failure => "Failure",
        })
    }
}

/// Map a result to an [`Outcome`]
///
/// End of stream is not reinterpreted here; an [`Error::Eof`] is a
/// [`Outcome::Failure`] unless a helper has already absorbed it.
#[must_use]
pub fn classify<T>(result: &Result<T, Error>) -> Outcome {
    match result {
        Ok(_) => Outcome::Ok,
        Err(e) => Outcome::of(e),
    }
}

/// Whether `err` carries the would-block signal, through any wrapping
#[must_use]
pub fn is_would_block(err: &Error) -> bool {
    err.is_would_block()
}

/// Whether `err` carries the more-to-come signal, through any wrapping
#[must_use]
pub fn is_more(err: &Error) -> bool {
    err.is_more()
}

/// Whether `err` is either semantic signal
#[must_use]
pub fn is_semantic(err: &Error) -> bool {
    err.is_semantic()
}

/// True for success, would-block and more-to-come
///
/// Typical use: decide whether to keep a descriptor registered without
/// logging an error or tearing the operation down.
#[must_use]
pub fn is_non_failure<T>(result: &Result<T, Error>) -> bool {
    classify(result).is_non_failure()
}

/// True for success and more-to-come
#[must_use]
pub fn is_progress<T>(result: &Result<T, Error>) -> bool {
    classify(result).is_progress()
}
