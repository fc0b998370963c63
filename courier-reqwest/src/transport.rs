use async_trait::async_trait;
use courier::{Transport, TransportError, TransportErrorKind};
use courier_core::{Request, Response};
use http::{HeaderValue, header};
use reqwest_middleware::ClientWithMiddleware;

use crate::error::transport_error;

/// Returns a client builder with redirects disabled.
pub fn client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder().redirect(reqwest::redirect::Policy::none())
}

/// Builds the default client: redirects disabled, no middleware.
///
/// Fails when reqwest cannot initialize its TLS backend or resolver.
pub fn default_client() -> Result<ClientWithMiddleware, reqwest::Error> {
    let client = client_builder().build()?;
    Ok(ClientWithMiddleware::from(client))
}

/// Transport sending requests with `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: ClientWithMiddleware,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    /// Creates a transport over [`default_client`].
    pub fn try_new() -> Result<Self, reqwest::Error> {
        Ok(ReqwestTransport {
            client: default_client()?,
        })
    }

    /// Uses a caller-provided client.
    ///
    /// The client should be built with `redirect::Policy::none()`. Otherwise
    /// reqwest follows redirects before the `Location` callback ever sees them.
    pub fn with_client(client: impl Into<ClientWithMiddleware>) -> Self {
        ReqwestTransport {
            client: client.into(),
        }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &ClientWithMiddleware {
        &self.client
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip_all, fields(method = %request.method(), uri = %request.uri()))]
    async fn send(
        &self,
        request: &Request,
        mut response: Response,
    ) -> Result<Response, TransportError> {
        let url = request.full_uri();

        let mut headers = request.headers().clone();
        if let Some(cookies) = request.cookie_header() {
            let value = HeaderValue::from_str(&cookies).map_err(|error| {
                TransportError::new(
                    TransportErrorKind::InvalidRequest,
                    &url,
                    "invalid cookie value",
                )
                .with_source(error)
            })?;
            headers.insert(header::COOKIE, value);
        }

        let mut builder = self
            .client
            .request(request.method().clone(), url.as_str())
            .headers(headers);
        if !request.body().is_empty() {
            builder = builder.body(request.body().clone());
        }

        let reply = builder
            .send()
            .await
            .map_err(|error| transport_error(&url, error))?;

        let status = reply.status();
        response.set_status(status);
        response.set_version(reply.version());
        *response.headers_mut() = reply.headers().clone();
        let body = reply.bytes().await.map_err(|error| {
            transport_error(&url, reqwest_middleware::Error::Reqwest(error)).with_status(status)
        })?;
        response.set_body(body);

        tracing::debug!(status = %status, "response received");
        Ok(response)
    }

    fn name(&self) -> &str {
        "reqwest"
    }
}
