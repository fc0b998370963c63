use std::time::Duration;

use async_trait::async_trait;
use courier_core::{Request, Response};

use super::Transport;
use crate::error::{TransportError, TransportErrorKind};

/// Fails requests that take longer than a deadline.
///
/// The inner future is dropped on timeout, which cancels the underlying
/// request.
#[derive(Debug, Clone)]
pub struct TimeoutTransport<T> {
    inner: T,
    timeout: Duration,
}

impl<T> TimeoutTransport<T> {
    /// Wraps `inner` with a deadline of `timeout` per request.
    pub fn new(inner: T, timeout: Duration) -> Self {
        TimeoutTransport { inner, timeout }
    }

    /// Returns the deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for TimeoutTransport<T> {
    async fn send(
        &self,
        request: &Request,
        response: Response,
    ) -> Result<Response, TransportError> {
        match tokio::time::timeout(self.timeout, self.inner.send(request, response)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(
                    transport = self.inner.name(),
                    uri = request.uri(),
                    timeout = ?self.timeout,
                    "request timed out"
                );
                Err(TransportError::new(
                    TransportErrorKind::Timeout,
                    request.full_uri(),
                    format!("no response within {:?}", self.timeout),
                ))
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
