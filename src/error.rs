use std::fmt::{Display, Formatter};

/// Errors the codec layer can signal.
///
/// Encoding and decoding never recover internally: a failed write leaves the
/// output length unchanged and a failed read leaves the cursor at the last
/// committed position. Nothing is logged; the caller decides what to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Ran out of space in a caller-owned output buffer.
    BufferFull(String),
    /// Ran out of bytes (or bits) reading a buffer.
    BufferUnderrun(String),
    /// The input does not follow the Parquet specification.
    OutOfSpec(String),
    /// The logical schema is not a valid Parquet writer schema.
    InvalidSchema(String),
    /// The requested encoding/type combination is not supported.
    FeatureNotSupported(String),
}

impl Error {
    /// Shorthand for an out-of-spec (malformed input) error.
    pub(crate) fn oos<I: Into<String>>(message: I) -> Self {
        Self::OutOfSpec(message.into())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::BufferFull(message) => write!(f, "buffer full: {message}"),
            Error::BufferUnderrun(message) => write!(f, "buffer underrun: {message}"),
            Error::OutOfSpec(message) => write!(f, "file out of specification: {message}"),
            Error::InvalidSchema(message) => write!(f, "invalid schema: {message}"),
            Error::FeatureNotSupported(message) => write!(f, "not supported: {message}"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
