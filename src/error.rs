//! Error handling and types
//!
//! Every [`Error`] carries an [`ErrorKind`] tag. Context and mirror layers
//! delegate [`Error::kind`] to the error they wrap, so a would-block signal
//! wrapped three times over still classifies as would-block.

use thiserror::Error;

/// Stream transfer errors and semantic signals
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// No further progress without waiting for external readiness
    #[error("io: would block")]
    WouldBlock,

    /// Progress happened and the operation remains active
    #[error("io: expect more")]
    More,

    /// Clean end of stream reported by a source
    #[error("end of stream")]
    Eof,

    /// Stream ended before the requested number of bytes was transferred
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// A sink accepted fewer bytes than offered without reporting why
    #[error("short write")]
    ShortWrite,

    /// A partial write could not be undone because the source cannot seek
    #[error("cannot roll back partial write: source is not seekable")]
    NoSeeker,

    /// The side sink of a tee adapter failed
    #[error("mirror write failed: {0}")]
    Mirror(#[source] Box<Error>),

    /// Caller-supplied context around another error
    #[error("{context}: {source}")]
    Context {
        /// Description of what was being attempted
        context: String,
        /// The wrapped error
        #[source]
        source: Box<Error>,
    },

    /// Standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Classification tag for [`Error`], stable across wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::WouldBlock`]
    WouldBlock,
    /// See [`Error::More`]
    More,
    /// See [`Error::Eof`]
    Eof,
    /// See [`Error::UnexpectedEof`]
    UnexpectedEof,
    /// See [`Error::ShortWrite`]
    ShortWrite,
    /// See [`Error::NoSeeker`]
    NoSeeker,
    /// Anything else
    Other,
}

impl Error {
    /// Kind of the innermost error, looking through context and mirror layers
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::WouldBlock => ErrorKind::WouldBlock,
            Self::More => ErrorKind::More,
            Self::Eof => ErrorKind::Eof,
            Self::UnexpectedEof => ErrorKind::UnexpectedEof,
            Self::ShortWrite => ErrorKind::ShortWrite,
            Self::NoSeeker => ErrorKind::NoSeeker,
            Self::Mirror(inner) | Self::Context { source: inner, .. } => inner.kind(),
            Self::Io(e) => match e.kind() {
                std::io::ErrorKind::WouldBlock => ErrorKind::WouldBlock,
                std::io::ErrorKind::UnexpectedEof => ErrorKind::UnexpectedEof,
                std::io::ErrorKind::WriteZero => ErrorKind::ShortWrite,
                _ => ErrorKind::Other,
            },
        }
    }

    /// Check if error carries the would-block signal
    #[must_use]
    pub fn is_would_block(&self) -> bool {
        self.kind() == ErrorKind::WouldBlock
    }

    /// Check if error carries the more-to-come signal
    #[must_use]
    pub fn is_more(&self) -> bool {
        self.kind() == ErrorKind::More
    }

    /// Check if error is one of the two non-failure semantic signals
    #[must_use]
    pub fn is_semantic(&self) -> bool {
        matches!(self.kind(), ErrorKind::WouldBlock | ErrorKind::More)
    }

    /// Check if error is a clean end of stream
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.kind() == ErrorKind::Eof
    }

    /// Check if error originated from the side sink of a tee adapter
    #[must_use]
    pub fn is_mirror(&self) -> bool {
        match self {
            Self::Mirror(_) => true,
            Self::Context { source, .. } => source.is_mirror(),
            _ => false,
        }
    }

    /// Wrap error with a context message, preserving its kind
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub(crate) fn mirror(self) -> Self {
        Self::Mirror(Box::new(self))
    }
}

/// Result type for iox operations
pub type Result<T> = std::result::Result<T, Error>;

/// Helper trait for adding context to fallible results
pub trait ResultExt<T> {
    /// Wrap the error, if any, with a context message
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped in [`Error::Context`]
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Like [`ResultExt::context`], building the message lazily
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped in [`Error::Context`]
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().context(context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.into().context(f()))
    }
}
