//! Request execution with caching and header callbacks.

use std::sync::Arc;

use courier_core::{Request, Response};
use futures::future::BoxFuture;
use http::{HeaderName, header};
use indexmap::{IndexMap, IndexSet};

use crate::NotSet;
use crate::cache::HttpCache;
use crate::callback::{CallbackOutcome, HeaderCallback, on_header_location};
use crate::error::ClientError;
use crate::transport::Transport;

/// Default bound on chained requests.
pub const DEFAULT_MAX_CALLBACK_DEPTH: u32 = 5;

/// Executes requests through a transport, optionally through a cache.
///
/// Without a cache, every response is passed to the header callbacks in
/// registration order; a callback may follow up with another request, which
/// is executed one level deeper by a child client with the same settings.
/// Chains deeper than [`max_callback_depth`](Self::max_callback_depth) fail
/// with [`ClientError::RecursionExceeded`].
///
/// ```
/// use courier::RequestClient;
/// use courier::transport::InternalTransport;
///
/// let client = RequestClient::builder()
///     .transport(InternalTransport::new())
///     .follow(true)
///     .strict_redirect(false)
///     .build();
/// assert_eq!(client.callback_depth(), 1);
/// ```
#[derive(Clone)]
pub struct RequestClient {
    transport: Arc<dyn Transport>,
    cache: Option<Arc<HttpCache>>,
    follow: bool,
    follow_headers: IndexSet<HeaderName>,
    strict_redirect: bool,
    header_callbacks: IndexMap<HeaderName, HeaderCallback>,
    max_callback_depth: u32,
    callback_depth: u32,
    callback_params: IndexMap<String, serde_json::Value>,
}

impl std::fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestClient")
            .field("transport", &self.transport.name())
            .field("cache", &self.cache)
            .field("follow", &self.follow)
            .field("follow_headers", &self.follow_headers)
            .field("strict_redirect", &self.strict_redirect)
            .field(
                "header_callbacks",
                &self.header_callbacks.keys().collect::<Vec<_>>(),
            )
            .field("max_callback_depth", &self.max_callback_depth)
            .field("callback_depth", &self.callback_depth)
            .field("callback_params", &self.callback_params)
            .finish()
    }
}

impl RequestClient {
    /// Creates a builder; a transport is required.
    pub fn builder() -> RequestClientBuilder<NotSet> {
        RequestClientBuilder::new()
    }

    /// Executes `request` and returns the final response.
    pub fn execute<'a>(
        &'a self,
        request: &'a Request,
    ) -> BoxFuture<'a, Result<Response, ClientError>> {
        Box::pin(async move {
            if self.callback_depth > self.max_callback_depth {
                return Err(ClientError::RecursionExceeded {
                    uri: request.full_uri(),
                    depth: self.callback_depth - 1,
                });
            }

            let response = Response::for_protocol(request.version());
            if let Some(cache) = &self.cache {
                return cache.execute(&*self.transport, request, response).await;
            }

            let mut response = self.execute_request(request, response).await?;
            for (name, callback) in &self.header_callbacks {
                if !response.headers().contains_key(name) {
                    continue;
                }
                match callback(request, &response, self)? {
                    CallbackOutcome::Continue => {}
                    CallbackOutcome::Follow(next) => {
                        tracing::debug!(
                            header = %name,
                            depth = self.callback_depth + 1,
                            uri = next.uri(),
                            "header callback follows up"
                        );
                        response = self.child().execute(&next).await?;
                        break;
                    }
                    CallbackOutcome::Replace(replacement) => {
                        tracing::debug!(header = %name, "header callback replaced response");
                        response = replacement;
                        break;
                    }
                }
            }
            Ok(response)
        })
    }

    /// Sends `request` through the transport, without cache or callbacks.
    pub async fn execute_request(
        &self,
        request: &Request,
        response: Response,
    ) -> Result<Response, ClientError> {
        tracing::trace!(transport = self.transport.name(), uri = request.uri(), "sending request");
        Ok(self.transport.send(request, response).await?)
    }

    fn child(&self) -> RequestClient {
        let mut child = self.clone();
        child.callback_depth += 1;
        child
    }

    /// Returns the transport.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Returns the cache, if any.
    pub fn cache(&self) -> Option<&Arc<HttpCache>> {
        self.cache.as_ref()
    }

    /// Sets or removes the cache.
    pub fn set_cache(&mut self, cache: Option<Arc<HttpCache>>) {
        self.cache = cache;
    }

    /// Returns whether redirects are followed.
    pub fn follow(&self) -> bool {
        self.follow
    }

    /// Enables or disables following redirects.
    pub fn set_follow(&mut self, follow: bool) {
        self.follow = follow;
    }

    /// Returns the request headers copied onto follow-up requests.
    pub fn follow_headers(&self) -> &IndexSet<HeaderName> {
        &self.follow_headers
    }

    /// Replaces the request headers copied onto follow-up requests.
    pub fn set_follow_headers(&mut self, headers: impl IntoIterator<Item = HeaderName>) {
        self.follow_headers = headers.into_iter().collect();
    }

    /// Returns whether a 302 keeps the original method.
    pub fn strict_redirect(&self) -> bool {
        self.strict_redirect
    }

    /// Sets whether a 302 keeps the original method.
    pub fn set_strict_redirect(&mut self, strict: bool) {
        self.strict_redirect = strict;
    }

    /// Returns the header callbacks in registration order.
    pub fn header_callbacks(&self) -> &IndexMap<HeaderName, HeaderCallback> {
        &self.header_callbacks
    }

    /// Registers `callback` for the response header `name`.
    ///
    /// Fails if `name` is not a valid header name. Registering an existing
    /// name replaces its callback in place.
    pub fn set_header_callback(
        &mut self,
        name: &str,
        callback: HeaderCallback,
    ) -> Result<(), ClientError> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            ClientError::InvalidHeaderCallback {
                header: name.to_owned(),
            }
        })?;
        self.header_callbacks.insert(name, callback);
        Ok(())
    }

    /// Removes the callback of `name`, returning it.
    pub fn remove_header_callback(&mut self, name: &HeaderName) -> Option<HeaderCallback> {
        self.header_callbacks.shift_remove(name)
    }

    /// Returns the bound on chained requests.
    pub fn max_callback_depth(&self) -> u32 {
        self.max_callback_depth
    }

    /// Sets the bound on chained requests.
    pub fn set_max_callback_depth(&mut self, depth: u32) {
        self.max_callback_depth = depth;
    }

    /// Returns the depth of this client, 1 for the root request.
    pub fn callback_depth(&self) -> u32 {
        self.callback_depth
    }

    /// Returns the parameters available to callbacks.
    pub fn callback_params(&self) -> &IndexMap<String, serde_json::Value> {
        &self.callback_params
    }

    /// Returns one callback parameter.
    pub fn callback_param(&self, name: &str) -> Option<&serde_json::Value> {
        self.callback_params.get(name)
    }

    /// Sets one callback parameter.
    pub fn set_callback_param(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.callback_params.insert(name.into(), value);
    }
}

/// Builder for [`RequestClient`].
pub struct RequestClientBuilder<T> {
    transport: T,
    cache: Option<Arc<HttpCache>>,
    follow: bool,
    follow_headers: IndexSet<HeaderName>,
    strict_redirect: bool,
    header_callbacks: IndexMap<HeaderName, HeaderCallback>,
    max_callback_depth: u32,
    callback_params: IndexMap<String, serde_json::Value>,
}

impl RequestClientBuilder<NotSet> {
    /// Creates a builder with the default settings.
    ///
    /// Redirects are not followed, only `Authorization` is carried onto
    /// follow-ups, 302 keeps the method and `Location` is handled by
    /// [`on_header_location`].
    pub fn new() -> Self {
        let mut header_callbacks: IndexMap<HeaderName, HeaderCallback> = IndexMap::new();
        header_callbacks.insert(header::LOCATION, Arc::new(on_header_location));
        RequestClientBuilder {
            transport: NotSet,
            cache: None,
            follow: false,
            follow_headers: IndexSet::from([header::AUTHORIZATION]),
            strict_redirect: true,
            header_callbacks,
            max_callback_depth: DEFAULT_MAX_CALLBACK_DEPTH,
            callback_params: IndexMap::new(),
        }
    }
}

impl Default for RequestClientBuilder<NotSet> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RequestClientBuilder<T> {
    /// Sets the transport.
    pub fn transport<NewT>(self, transport: NewT) -> RequestClientBuilder<NewT>
    where
        NewT: Transport + 'static,
    {
        RequestClientBuilder {
            transport,
            cache: self.cache,
            follow: self.follow,
            follow_headers: self.follow_headers,
            strict_redirect: self.strict_redirect,
            header_callbacks: self.header_callbacks,
            max_callback_depth: self.max_callback_depth,
            callback_params: self.callback_params,
        }
    }

    /// Puts a cache in front of the transport.
    pub fn cache(mut self, cache: impl Into<Arc<HttpCache>>) -> Self {
        self.cache = Some(cache.into());
        self
    }

    /// Follows redirects. Default: `false`.
    pub fn follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }

    /// Request headers copied onto follow-ups. Default: `Authorization`.
    pub fn follow_headers(mut self, headers: impl IntoIterator<Item = HeaderName>) -> Self {
        self.follow_headers = headers.into_iter().collect();
        self
    }

    /// Whether a 302 keeps the original method. Default: `true`.
    pub fn strict_redirect(mut self, strict: bool) -> Self {
        self.strict_redirect = strict;
        self
    }

    /// Registers a callback for the response header `name`.
    pub fn header_callback(mut self, name: HeaderName, callback: HeaderCallback) -> Self {
        self.header_callbacks.insert(name, callback);
        self
    }

    /// Registers a callback under a header name given as text.
    pub fn try_header_callback(
        mut self,
        name: &str,
        callback: HeaderCallback,
    ) -> Result<Self, ClientError> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            ClientError::InvalidHeaderCallback {
                header: name.to_owned(),
            }
        })?;
        self.header_callbacks.insert(name, callback);
        Ok(self)
    }

    /// Drops every callback, including the default `Location` one.
    pub fn clear_header_callbacks(mut self) -> Self {
        self.header_callbacks.clear();
        self
    }

    /// Bound on chained requests. Default: 5.
    pub fn max_callback_depth(mut self, depth: u32) -> Self {
        self.max_callback_depth = depth;
        self
    }

    /// Adds a parameter available to callbacks.
    pub fn callback_param(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.callback_params.insert(name.into(), value);
        self
    }
}

impl<T> RequestClientBuilder<T>
where
    T: Transport + 'static,
{
    /// Builds the client.
    pub fn build(self) -> RequestClient {
        RequestClient {
            transport: Arc::new(self.transport),
            cache: self.cache,
            follow: self.follow,
            follow_headers: self.follow_headers,
            strict_redirect: self.strict_redirect,
            header_callbacks: self.header_callbacks,
            max_callback_depth: self.max_callback_depth,
            callback_depth: 1,
            callback_params: self.callback_params,
        }
    }
}
