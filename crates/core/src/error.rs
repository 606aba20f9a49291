//! Error types for suitestore
//!
//! Every store operation fails with exactly one of three kinds:
//!
//! - `NotFound`: a lookup or conditional update targeted a missing id
//! - `InvalidModel`: a payload failed validation before a mutating write
//! - `Unknown`: engine I/O, encoding, or transaction failure
//!
//! `Unknown` keeps the underlying cause as its `source()` and appends it to
//! its message. We use `thiserror` for `Display` and `Error` impls.

use std::fmt;
use thiserror::Error;

/// Boxed underlying cause carried by [`Error::Unknown`]
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds exposed to the transport layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Target id does not exist
    NotFound,
    /// Payload failed validation
    InvalidModel,
    /// Engine, encoding or transaction failure
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::InvalidModel => write!(f, "invalid_model"),
            ErrorKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Error type for the document store
#[derive(Debug, Error)]
pub enum Error {
    /// Key not found in storage
    #[error("not found: {0}")]
    NotFound(String),

    /// Payload rejected before write
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// Underlying engine, encoding or transaction failure
    #[error("{message}{}", source_suffix(.source))]
    Unknown {
        /// What the store was doing when the failure happened
        message: String,
        /// The wrapped cause, if any
        #[source]
        source: Option<BoxedSource>,
    },
}

fn source_suffix(source: &Option<BoxedSource>) -> String {
    match source {
        Some(cause) => format!(": {}", cause),
        None => String::new(),
    }
}

impl Error {
    /// Create a `NotFound` error for the given key or id
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    /// Create an `InvalidModel` error
    pub fn invalid_model(reason: impl Into<String>) -> Self {
        Error::InvalidModel(reason.into())
    }

    /// Wrap an underlying failure as `Unknown`
    pub fn unknown<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Unknown {
            message: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an `Unknown` error with no wrapped cause
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Unknown {
            message: message.into(),
            source: None,
        }
    }

    /// The kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidModel(_) => ErrorKind::InvalidModel,
            Error::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// Check if this is a `NotFound` error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this is an `InvalidModel` error
    pub fn is_invalid_model(&self) -> bool {
        matches!(self, Error::InvalidModel(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::unknown("document encoding failed", e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::unknown("I/O error", e)
    }
}
