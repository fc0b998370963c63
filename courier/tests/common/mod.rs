#![allow(dead_code)]

pub mod mock_backend;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use courier::{Transport, TransportError};
use courier_core::{Request, Response};

/// Counts how many requests reach the wrapped transport.
#[derive(Clone)]
pub struct CountingTransport<T> {
    inner: T,
    calls: Arc<AtomicUsize>,
}

impl<T> CountingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl<T: Transport> Transport for CountingTransport<T> {
    async fn send(
        &self,
        request: &Request,
        response: Response,
    ) -> Result<Response, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.send(request, response).await
    }
}

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
