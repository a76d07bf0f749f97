use std::fmt;

/// Custom error type for provider and range operations
#[derive(Debug)]
pub enum Error {
    /// The content source reported an error and no entries can be served
    SourceUnavailable(String),
    /// The content source has not signalled readiness yet
    NotReady,
    /// The request path carries no usable `entry:<index>` token
    InvalidPath,
    /// The entry index is out of bounds of the current entry sequence
    NotFound(usize),
    /// The `Range` header could not be resolved into a satisfiable range
    MalformedRange(String),
    /// Underlying stream I/O failure
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SourceUnavailable(msg) => write!(f, "content source unavailable: {}", msg),
            Error::NotReady => write!(f, "content source not ready"),
            Error::InvalidPath => write!(f, "no entry index in request path"),
            Error::NotFound(index) => write!(f, "no entry at index {}", index),
            Error::MalformedRange(header) => write!(f, "unsatisfiable range header: {}", header),
            Error::Io(e) => write!(f, "stream I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
