//! Error handling for sharelink.
//!
//! Every component reports failures as an [`struct@Error`]: a classification
//! ([`ErrorKind`]) plus the underlying error details. The categories follow
//! the stages of a link handling session:
//!
//! * Transport failures talking to the server ([`ErrorKind::Network`])
//! * Non-success responses from a reachable server ([`ErrorKind::Server`])
//! * Malformed or incomplete payloads ([`ErrorKind::InvalidResponse`])
//! * Misuse of the selection state ([`ErrorKind::IndexOutOfRange`])
//! * User input that cannot be acted upon ([`ErrorKind::NoSelection`],
//!   [`ErrorKind::UnsupportedLink`])
//! * Progress subscription failures ([`ErrorKind::StreamFailure`])
//!
//! No error is retried anywhere: every operation is a single attempt.
//!
//! # Example
//!
//! ```rust
//! use sharelink::error::{Error, ErrorKind, Result};
//!
//! fn pick(count: usize, index: usize) -> Result<usize> {
//!     if index >= count {
//!         return Err(Error::index_out_of_range(format!("{index} >= {count}")));
//!     }
//!     Ok(index)
//! }
//! ```

#![allow(clippy::enum_glob_use)]

use std::fmt;
use thiserror::Error;

/// Main error type combining error kind and details.
#[derive(Debug)]
pub struct Error {
    /// Classification of the error
    pub kind: ErrorKind,

    /// Details of the underlying error
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

/// Standard result type for sharelink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories.
#[allow(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
pub enum ErrorKind {
    /// Connectivity, timeout or I/O failure.
    #[error("network error")]
    Network,

    /// The server was reachable but answered with a non-success status.
    #[error("server error")]
    Server,

    /// Well-formed transport, malformed or incomplete payload.
    #[error("invalid response")]
    InvalidResponse,

    /// A track or variant index outside the resolved track list.
    #[error("index out of range")]
    IndexOutOfRange,

    /// The user submitted nothing.
    #[error("no selection")]
    NoSelection,

    /// The shared text holds no link, or a link to an unsupported host.
    #[error("unsupported link")]
    UnsupportedLink,

    /// The progress subscription transport failed or was closed remotely.
    #[error("stream failure")]
    StreamFailure,

    /// The session was aborted before the operation completed.
    #[error("operation was cancelled")]
    Cancelled,

    /// Misconfiguration or a broken internal invariant.
    #[error("internal error")]
    Internal,
}

impl Error {
    /// Creates a new error with specified kind and details.
    pub fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind,
            error: error.into(),
        }
    }

    /// Creates an error for connectivity, timeout or I/O failures.
    pub fn network<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Network, error)
    }

    /// Creates an error for a non-success response.
    ///
    /// The details should be the status line as received, for example
    /// `404 Not Found`, as it is shown to the user verbatim.
    pub fn server<E>(status_message: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Server, status_message)
    }

    /// Creates an error for payloads that could not be parsed or that miss
    /// required fields.
    pub fn invalid_response<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::InvalidResponse, error)
    }

    /// Creates an error for track or variant indices that do not exist.
    pub fn index_out_of_range<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::IndexOutOfRange, error)
    }

    /// Creates an error for an empty selection.
    pub fn no_selection<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::NoSelection, error)
    }

    /// Creates an error for input rejected by the link filter.
    pub fn unsupported_link<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::UnsupportedLink, error)
    }

    /// Creates an error for a failed or remotely closed subscription.
    pub fn stream_failure<E>(detail: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::StreamFailure, detail)
    }

    /// Creates an error for operations cut short by a session abort.
    pub fn cancelled<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Cancelled, error)
    }

    /// Creates an error for misconfiguration and unexpected internal state.
    pub fn internal<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Internal, error)
    }

    /// Attempts to downcast the underlying error to a concrete type.
    #[must_use]
    pub fn downcast<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.error.downcast_ref::<E>()
    }

    /// The underlying details without the kind prefix.
    ///
    /// For [`ErrorKind::Server`] this is the status message, and for
    /// [`ErrorKind::StreamFailure`] the failure detail.
    #[must_use]
    pub fn detail(&self) -> String {
        self.error.to_string()
    }

    /// Whether this error is of the given kind.
    #[must_use]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}

/// Formats the error for display, showing both kind and details.
///
/// Format: "{kind}: {details}"
impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}: ", self.kind)?;
        self.error.fmt(fmt)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match err.kind() {
            InvalidData | UnexpectedEof => Self::invalid_response(err),
            Interrupted => Self::cancelled(err),
            _ => Self::network(err),
        }
    }
}

/// Converts HTTP client errors into appropriate error kinds.
///
/// * Body and decode errors -> `InvalidResponse`
/// * Builder errors -> `Internal`
/// * Status errors -> `Server`
/// * Connect, timeout and everything else -> `Network`
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            return Self::network(err);
        }

        if err.is_body() || err.is_decode() {
            if is_malformed(&err) {
                return Self::invalid_response(err);
            }
            return Self::network(err);
        }

        if err.is_builder() {
            return Self::internal(err);
        }

        if let Some(status) = err.status() {
            return Self::server(status.to_string());
        }

        Self::network(err)
    }
}

/// Whether a body error came from the payload rather than the transport.
fn is_malformed(err: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(e) = source {
        if e.is::<serde_json::Error>() {
            return true;
        }
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            return io.kind() == std::io::ErrorKind::InvalidData;
        }
        source = e.source();
    }
    false
}

/// Every websocket error ends the subscription.
impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::stream_failure(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            return std::io::Error::from(err).into();
        }
        Self::invalid_response(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::internal(e.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(e: http::header::InvalidHeaderValue) -> Self {
        Self::internal(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::internal(e.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(e: tokio::time::error::Elapsed) -> Self {
        Self::network(e.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        if e.is_cancelled() {
            Self::cancelled(e.to_string())
        } else {
            Self::internal(e.to_string())
        }
    }
}
