use courier::{TransportError, TransportErrorKind};

/// Converts a reqwest or middleware failure into a [`TransportError`] for `url`.
pub fn transport_error(url: &str, error: reqwest_middleware::Error) -> TransportError {
    match error {
        reqwest_middleware::Error::Reqwest(error) => {
            let kind = if error.is_timeout() {
                TransportErrorKind::Timeout
            } else if error.is_connect() {
                TransportErrorKind::Connect
            } else if error.is_builder() {
                TransportErrorKind::InvalidRequest
            } else if error.is_decode() {
                TransportErrorKind::Protocol
            } else {
                TransportErrorKind::Io
            };
            let status = error.status();
            let mut transport = TransportError::new(kind, url, error.to_string());
            if let Some(status) = status {
                transport = transport.with_status(status);
            }
            transport.with_source(error)
        }
        reqwest_middleware::Error::Middleware(error) => {
            TransportError::new(TransportErrorKind::Io, url, error.to_string()).with_source(error)
        }
    }
}
