//! In-process dispatch to registered handlers.
//!
//! [`InternalTransport`] resolves a handler by exact path and calls it
//! directly, without any network. While a handler runs, the request is the
//! current entry of the transport's [`RequestStack`]; nested dispatch pushes
//! on top of it and the previous request becomes current again once the
//! nested call returns, fails or unwinds.

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{Request, Response};
use http::StatusCode;
use indexmap::IndexMap;
use parking_lot::Mutex;

use super::Transport;
use crate::error::{BoxError, TransportError};

/// Errors a [`Handler`] may return.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The handler has nothing for this request; answered with 404.
    #[error("not found")]
    NotFound,
    /// The handler failed; answered with 500 and the error text as body.
    #[error("{0}")]
    Internal(BoxError),
}

impl HandlerError {
    /// Wraps any error as [`HandlerError::Internal`].
    pub fn internal(error: impl Into<BoxError>) -> Self {
        HandlerError::Internal(error.into())
    }
}

/// Application code reachable through [`InternalTransport`].
///
/// Plain functions and closures with the signature
/// `Fn(&Request, Response) -> Result<Response, HandlerError>` are handlers.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handles `request`, filling `response`.
    async fn handle(&self, request: &Request, response: Response) -> Result<Response, HandlerError>;
}

#[async_trait]
impl<F> Handler for F
where
    F: Fn(&Request, Response) -> Result<Response, HandlerError> + Send + Sync,
{
    async fn handle(
        &self,
        request: &Request,
        response: Response,
    ) -> Result<Response, HandlerError> {
        self(request, response)
    }
}

/// Pins a closure to the [`Handler`] signature.
///
/// ```
/// use courier::transport::{InternalTransport, handler_fn};
/// use http::StatusCode;
///
/// let transport = InternalTransport::new().route(
///     "/health",
///     handler_fn(|_request, response| Ok(response.with_status(StatusCode::NO_CONTENT))),
/// );
/// ```
pub fn handler_fn<F>(f: F) -> F
where
    F: Fn(&Request, Response) -> Result<Response, HandlerError> + Send + Sync,
{
    f
}

/// Requests currently being dispatched, innermost last.
#[derive(Debug, Clone, Default)]
pub struct RequestStack {
    inner: Arc<Mutex<Entries>>,
}

#[derive(Debug, Default)]
struct Entries {
    next_id: u64,
    requests: Vec<(u64, Request)>,
}

impl RequestStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the request being handled right now.
    pub fn current(&self) -> Option<Request> {
        self.inner
            .lock()
            .requests
            .last()
            .map(|(_, request)| request.clone())
    }

    /// Number of dispatches in progress.
    pub fn depth(&self) -> usize {
        self.inner.lock().requests.len()
    }

    /// Pushes `request`; it is removed when the guard drops.
    pub fn enter(&self, request: Request) -> StackGuard {
        let mut entries = self.inner.lock();
        let id = entries.next_id;
        entries.next_id = entries.next_id.wrapping_add(1);
        entries.requests.push((id, request));
        StackGuard {
            stack: self.inner.clone(),
            id,
        }
    }
}

/// Removes the request pushed by [`RequestStack::enter`] on drop.
///
/// Only its own entry is removed, so dispatches that overlap and finish out
/// of order leave each other's requests in place.
#[must_use = "the request is removed as soon as the guard is dropped"]
#[derive(Debug)]
pub struct StackGuard {
    stack: Arc<Mutex<Entries>>,
    id: u64,
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        let mut entries = self.stack.lock();
        let id = self.id;
        if let Some(position) = entries.requests.iter().rposition(|entry| entry.0 == id) {
            entries.requests.remove(position);
        }
    }
}

/// Transport that calls in-process handlers registered by path.
#[derive(Clone, Default)]
pub struct InternalTransport {
    handlers: IndexMap<String, Arc<dyn Handler>>,
    stack: RequestStack,
}

impl std::fmt::Debug for InternalTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalTransport")
            .field("routes", &self.handlers.keys().collect::<Vec<_>>())
            .field("stack", &self.stack)
            .finish()
    }
}

impl InternalTransport {
    /// Creates a transport with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for the exact `path`, replacing any previous one.
    pub fn route(mut self, path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.handlers.insert(path.into(), Arc::new(handler));
        self
    }

    /// Returns the stack of requests being dispatched.
    pub fn stack(&self) -> &RequestStack {
        &self.stack
    }

    fn resolve(&self, request: &Request) -> Option<Arc<dyn Handler>> {
        let path = match url::Url::parse(request.uri()) {
            Ok(url) => url.path().to_owned(),
            Err(_) => request.uri().to_owned(),
        };
        self.handlers.get(path.as_str()).cloned()
    }
}

#[async_trait]
impl Transport for InternalTransport {
    async fn send(
        &self,
        request: &Request,
        response: Response,
    ) -> Result<Response, TransportError> {
        let version = response.version();
        let Some(handler) = self.resolve(request) else {
            tracing::debug!(uri = request.uri(), "no handler registered");
            return Ok(response.with_status(StatusCode::NOT_FOUND));
        };

        let _guard = self.stack.enter(request.clone());
        match handler.handle(request, response).await {
            Ok(response) => Ok(response),
            Err(HandlerError::NotFound) => {
                Ok(Response::for_protocol(version).with_status(StatusCode::NOT_FOUND))
            }
            Err(error) => {
                tracing::debug!(uri = request.uri(), %error, "handler failed");
                Ok(Response::for_protocol(version)
                    .with_status(StatusCode::INTERNAL_SERVER_ERROR)
                    .with_body(error.to_string()))
            }
        }
    }

    fn name(&self) -> &str {
        "internal"
    }
}
