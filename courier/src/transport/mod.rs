//! Request dispatch.
//!
//! A [`Transport`] turns a [`Request`] into a [`Response`]. The client hands
//! every transport a fresh response for the request's protocol version; the
//! transport fills in status, headers and body. Non-2xx statuses are ordinary
//! responses, only failures to obtain a response are [`TransportError`]s.
//!
//! This crate ships [`InternalTransport`], which dispatches to in-process
//! handlers, and [`TimeoutTransport`], which bounds any other transport.
//! Network transports live in `courier-stream` and `courier-reqwest`.

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{Request, Response};

use crate::error::TransportError;

pub mod internal;
mod timeout;

pub use internal::{Handler, HandlerError, InternalTransport, RequestStack, StackGuard, handler_fn};
pub use timeout::TimeoutTransport;

/// Sends requests and produces responses.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request`, filling `response` from the reply.
    async fn send(&self, request: &Request, response: Response) -> Result<Response, TransportError>;

    /// Returns the transport name, used in traces.
    fn name(&self) -> &str {
        "transport"
    }
}

#[async_trait]
impl Transport for Arc<dyn Transport> {
    async fn send(
        &self,
        request: &Request,
        response: Response,
    ) -> Result<Response, TransportError> {
        (**self).send(request, response).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl Transport for Box<dyn Transport> {
    async fn send(
        &self,
        request: &Request,
        response: Response,
    ) -> Result<Response, TransportError> {
        (**self).send(request, response).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
