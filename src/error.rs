//! Centralized error handling for tagpack.
//!
//! Every fallible operation in the crate returns [`Result`]. The streaming
//! [`Reader`](crate::Reader) and [`Writer`](crate::Writer) *latch* the first
//! error they hit: once an instance has failed, every later call returns a copy
//! of that same error without touching the buffer. This lets callers run a long
//! sequence of reads or writes and check the outcome once at the end:
//!
//! ```rust
//! use tagpack::Writer;
//!
//! let mut writer = Writer::new();
//! writer.start_array(2).ok();
//! writer.write_u32(1).ok();
//! writer.write_u32(2).ok();
//! writer.write_u32(3).ok(); // one element too many
//! writer.finish_array().ok();
//!
//! let err = writer.finish().unwrap_err();
//! assert_eq!(err.kind(), tagpack::ErrorKind::Misuse);
//! ```
//!
//! The node tree parser does not latch. A failed [`Tree::parse`](crate::Tree::parse)
//! returns only the error, never a partially built tree.
//!
//! ## Error Categories
//!
//! - **Io** ([`Error::Io`]): the byte source or sink failed, or a stream ended mid-value
//! - **Invalid** ([`Error::Invalid`]): malformed or truncated wire data
//! - **Type** ([`Error::Type`]): the value is not of the kind the caller asked for
//! - **TooBig** ([`Error::TooBig`]): a declared size exceeds a configured ceiling
//! - **TooDeep** ([`Error::TooDeep`]): nesting exceeds the configured depth
//! - **Data** ([`Error::Data`]): the data is well formed but does not match what was requested
//! - **Misuse** ([`Error::Misuse`]): element or byte counts of a compound do not add up

use std::fmt;
use std::io;
use std::sync::Arc;

use crate::format::Kind;

/// A specialized `Result` type for tagpack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The master error enum covering every failure domain of the codec.
///
/// This type is `Clone` so the latched error of a reader or writer can be
/// handed out on every call. I/O errors are wrapped in an `Arc` for that reason.
#[derive(Debug, Clone)]
pub enum Error {
    /// The byte source or sink failed.
    ///
    /// A streaming reader whose source reaches end-of-file in the middle of a
    /// value reports an `io::ErrorKind::UnexpectedEof` here.
    Io(Arc<io::Error>),

    /// The input is not valid MessagePack.
    ///
    /// ## Common Causes
    ///
    /// - Reserved discriminant byte (`0xc1`)
    /// - Extension type encountered with the `extensions` feature disabled
    /// - Input slice ends in the middle of a value
    /// - A declared element count cannot fit in the bytes left
    /// - Timestamp extension with out-of-range nanoseconds
    Invalid(String),

    /// The value on the wire is not of the kind the caller asserted.
    Type {
        /// What the caller asked for.
        expected: &'static str,
        /// What was actually found.
        found: Kind,
    },

    /// A declared length or count exceeds a configured safety ceiling.
    TooBig {
        /// The declared size.
        size: u64,
        /// The configured ceiling.
        limit: u64,
    },

    /// Compound values are nested deeper than the configured maximum depth.
    TooDeep {
        /// The configured maximum depth.
        limit: usize,
    },

    /// The data is well formed but does not match what was requested: a map key
    /// that is missing, a child index out of bounds, or trailing bytes where an
    /// exact parse was required.
    Data(String),

    /// The caller broke the compound discipline: wrote or read more or fewer
    /// elements or bytes than declared, closed the wrong kind of compound, or
    /// finished with compounds still open.
    Misuse(String),
}

/// A payload-free discriminant of [`Error`], convenient for matching and for
/// comparing errors in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::Io`].
    Io,
    /// See [`Error::Invalid`].
    Invalid,
    /// See [`Error::Type`].
    Type,
    /// See [`Error::TooBig`].
    TooBig,
    /// See [`Error::TooDeep`].
    TooDeep,
    /// See [`Error::Data`].
    Data,
    /// See [`Error::Misuse`].
    Misuse,
}

impl Error {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Invalid(_) => ErrorKind::Invalid,
            Self::Type { .. } => ErrorKind::Type,
            Self::TooBig { .. } => ErrorKind::TooBig,
            Self::TooDeep { .. } => ErrorKind::TooDeep,
            Self::Data(_) => ErrorKind::Data,
            Self::Misuse(_) => ErrorKind::Misuse,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    pub(crate) fn misuse(msg: impl Into<String>) -> Self {
        Self::Misuse(msg.into())
    }

    pub(crate) fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    pub(crate) fn mismatch(expected: &'static str, found: Kind) -> Self {
        Self::Type { expected, found }
    }

    pub(crate) fn eof() -> Self {
        Self::from(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "source ended in the middle of a value",
        ))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O Error: {e}"),
            Self::Invalid(s) => write!(f, "Invalid Data: {s}"),
            Self::Type { expected, found } => {
                write!(f, "Type Error: expected {expected}, found {found}")
            }
            Self::TooBig { size, limit } => {
                write!(f, "Too Big: size {size} exceeds the limit of {limit}")
            }
            Self::TooDeep { limit } => {
                write!(f, "Too Deep: nesting exceeds the maximum depth of {limit}")
            }
            Self::Data(s) => write!(f, "Data Error: {s}"),
            Self::Misuse(s) => write!(f, "Misuse: {s}"),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Io => "io",
            Self::Invalid => "invalid",
            Self::Type => "type",
            Self::TooBig => "too big",
            Self::TooDeep => "too deep",
            Self::Data => "data",
            Self::Misuse => "misuse",
        };
        f.write_str(name)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
