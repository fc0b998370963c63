//! Error types for request execution.

use std::fmt;

use courier_backend::BackendError;
use http::{HeaderName, StatusCode};

/// Boxed error used as the underlying cause of a failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by [`RequestClient::execute`](crate::RequestClient::execute).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Header callbacks chained more requests than `max_callback_depth` allows.
    #[error("too many recursions after {depth} requests to {uri}")]
    RecursionExceeded {
        /// URI of the request that would have exceeded the bound.
        uri: String,
        /// Number of requests executed before giving up.
        depth: u32,
    },
    /// The transport could not produce a response.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The cache store failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// A header callback was registered under an invalid header name.
    #[error("invalid header name `{header}` for header callback")]
    InvalidHeaderCallback {
        /// The rejected name.
        header: String,
    },
    /// A header callback failed.
    #[error(transparent)]
    Callback(#[from] CallbackError),
}

/// Category of a [`TransportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The remote host could not be reached.
    Connect,
    /// Reading or writing the connection failed.
    Io,
    /// The peer sent something that is not valid HTTP.
    Protocol,
    /// No response arrived before the deadline.
    Timeout,
    /// The URI scheme is not handled by this transport.
    UnsupportedScheme,
    /// The request could not be turned into a wire request.
    InvalidRequest,
}

impl TransportErrorKind {
    /// Returns a short lowercase name for the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Io => "io",
            TransportErrorKind::Protocol => "protocol",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::UnsupportedScheme => "unsupported scheme",
            TransportErrorKind::InvalidRequest => "invalid request",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transport failed to deliver a request or read its response.
///
/// Non-2xx responses are not errors; `status` is only set when a failure
/// happened after the status line was known.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error for {url}: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    url: String,
    status: Option<StatusCode>,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl TransportError {
    /// Creates an error of the given kind for `url`.
    pub fn new(
        kind: TransportErrorKind,
        url: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        TransportError {
            kind,
            url: url.into(),
            status: None,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the status code received before the failure.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches the underlying cause.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the error category.
    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// Returns the URL of the failed request.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the status code, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns the error text.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors raised by header callbacks.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    /// A header value the callback relies on is not valid text.
    #[error("header `{header}` is not valid text")]
    InvalidHeaderValue {
        /// The offending header.
        header: HeaderName,
    },
    /// A redirect target could not be resolved against the request URI.
    #[error("cannot resolve location `{location}`: {source}")]
    InvalidLocation {
        /// The `Location` value.
        location: String,
        /// Why resolution failed.
        source: url::ParseError,
    },
    /// A user callback failed.
    #[error(transparent)]
    Other(BoxError),
}

impl CallbackError {
    /// Wraps an arbitrary error raised by a user callback.
    pub fn other(error: impl Into<BoxError>) -> Self {
        CallbackError::Other(error.into())
    }
}
