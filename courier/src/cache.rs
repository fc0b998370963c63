//! Response cache in front of a transport.

use std::sync::Arc;

use chrono::Utc;
use courier_backend::{Backend, BackendError, CacheBackend, DeleteStatus};
use courier_core::{
    CacheKey, CacheStatus, CacheValue, DEFAULT_CACHE_HITS_HEADER, DEFAULT_CACHE_STATUS_HEADER,
    DigestKeyGenerator, KeyGenerator, Request, Response,
};
use http::{HeaderName, HeaderValue, header};
use tracing::{debug, warn};

use crate::NotSet;
use crate::error::ClientError;
use crate::freshness::{Freshness, RequestTiming};
use crate::transport::Transport;

/// Stores cacheable responses and serves them back.
///
/// Every response returned by [`HttpCache::execute`] carries a status header
/// (`x-cache-status` by default): `HIT` when served from the store, `MISS`
/// otherwise. Stored copies carry `SAVED`.
///
/// `POST`, `PUT` and `DELETE` bypass the cache: they invalidate the entry
/// of the equivalent key and are always sent to the transport.
///
/// ```
/// use courier::HttpCache;
/// use courier_moka::MokaBackend;
///
/// let cache = HttpCache::builder()
///     .backend(MokaBackend::builder().max_entries(1_000).build())
///     .allow_private(true)
///     .build();
/// assert!(cache.freshness().allow_private());
/// ```
#[derive(Clone)]
pub struct HttpCache {
    backend: Arc<dyn Backend + Send + 'static>,
    key_generator: Arc<dyn KeyGenerator>,
    freshness: Freshness,
    status_header: HeaderName,
    hits_header: HeaderName,
}

impl std::fmt::Debug for HttpCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCache")
            .field("backend", &self.backend.name())
            .field("freshness", &self.freshness)
            .field("status_header", &self.status_header)
            .field("hits_header", &self.hits_header)
            .finish()
    }
}

impl HttpCache {
    /// Creates a builder; a backend is required.
    pub fn builder() -> HttpCacheBuilder<NotSet> {
        HttpCacheBuilder::new()
    }

    /// Returns the freshness rules.
    pub fn freshness(&self) -> &Freshness {
        &self.freshness
    }

    /// Returns the store.
    pub fn backend(&self) -> &Arc<dyn Backend + Send + 'static> {
        &self.backend
    }

    /// Returns the name of the cache status header.
    pub fn status_header(&self) -> &HeaderName {
        &self.status_header
    }

    /// Returns the name of the hit count header, also the counter key prefix.
    pub fn hits_header(&self) -> &HeaderName {
        &self.hits_header
    }

    /// Returns the cache key of `request`.
    pub fn key(&self, request: &Request) -> CacheKey {
        self.key_generator.generate(request)
    }

    fn hits_key(&self, key: &CacheKey) -> CacheKey {
        key.with_prefix(self.hits_header.as_str())
    }

    /// Serves `request` from the cache or through `transport`.
    #[tracing::instrument(
        name = "cache.execute",
        skip_all,
        fields(method = %request.method(), uri = %request.uri(), transport = transport.name())
    )]
    pub async fn execute(
        &self,
        transport: &dyn Transport,
        request: &Request,
        response: Response,
    ) -> Result<Response, ClientError> {
        if request.is_destructive() {
            self.invalidate(request).await?;
            let mut response = transport.send(request, response).await?;
            response.headers_mut().insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache, must-revalidate"),
            );
            self.mark(&mut response, CacheStatus::Miss);
            return Ok(response);
        }

        let key = self.key(request);
        if let Some(cached) = self.lookup(&key, request).await? {
            return Ok(cached);
        }

        let started = Utc::now();
        let mut response = transport.send(request, response).await?;
        let timing = RequestTiming::new(started, Utc::now());

        self.store(&key, request, &response, &timing).await?;
        self.mark(&mut response, CacheStatus::Miss);
        Ok(response)
    }

    /// Returns the cached response for `key`, counting the hit.
    ///
    /// Requests with `Pragma: no-cache` never hit. An entry that cannot be
    /// decoded is treated as missing.
    pub async fn lookup(
        &self,
        key: &CacheKey,
        request: &Request,
    ) -> Result<Option<Response>, ClientError> {
        if pragma_no_cache(request) {
            debug!(%key, "lookup skipped by pragma");
            return Ok(None);
        }

        let cached = match self.backend.get::<Response>(key).await {
            Ok(cached) => cached,
            Err(BackendError::FormatError(error)) => {
                warn!(%key, %error, "cached response could not be decoded");
                None
            }
            Err(error) => return Err(error.into()),
        };
        let Some(cached) = cached else {
            debug!(%key, "cache miss");
            return Ok(None);
        };

        let hits = self.backend.increment(&self.hits_key(key)).await?;
        let mut response = cached.into_inner();
        self.mark(&mut response, CacheStatus::Hit);
        response
            .headers_mut()
            .insert(self.hits_header.clone(), HeaderValue::from(hits));
        debug!(%key, hits, "cache hit");
        Ok(Some(response))
    }

    /// Stores `response` under `key` if its freshness allows it.
    ///
    /// Returns whether the response was stored. Storing resets the hit
    /// counter of the entry.
    pub async fn store(
        &self,
        key: &CacheKey,
        request: &Request,
        response: &Response,
        timing: &RequestTiming,
    ) -> Result<bool, ClientError> {
        if pragma_no_cache(request) {
            debug!(%key, "store skipped by pragma");
            return Ok(false);
        }
        let Some(ttl) = self.freshness.lifetime(response, timing) else {
            debug!(%key, status = response.status().as_u16(), "response is not cacheable");
            return Ok(false);
        };

        let mut stored = response.clone();
        self.mark(&mut stored, CacheStatus::Saved);
        let value = CacheValue::with_ttl(stored, Some(ttl));
        self.backend
            .set_counter(&self.hits_key(key), 0, value.expire())
            .await?;
        self.backend.set(key, &value).await?;
        debug!(%key, ttl = ?ttl, "response stored");
        Ok(true)
    }

    /// Removes the entry of `request`. A missing entry is not an error.
    pub async fn invalidate(&self, request: &Request) -> Result<DeleteStatus, ClientError> {
        let key = self.key(request);
        let status = self.backend.delete(&key).await?;
        debug!(%key, ?status, "cache entry invalidated");
        Ok(status)
    }

    /// Removes every entry of the store.
    pub async fn clear(&self) -> Result<(), ClientError> {
        self.backend.clear().await?;
        Ok(())
    }

    fn mark(&self, response: &mut Response, status: CacheStatus) {
        response
            .headers_mut()
            .insert(self.status_header.clone(), status.header_value());
    }
}

fn pragma_no_cache(request: &Request) -> bool {
    request
        .headers()
        .get_all(header::PRAGMA)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|directive| directive.trim().eq_ignore_ascii_case("no-cache"))
}

/// Builder for [`HttpCache`].
pub struct HttpCacheBuilder<B> {
    backend: B,
    key_generator: Arc<dyn KeyGenerator>,
    allow_private: bool,
    status_header: HeaderName,
    hits_header: HeaderName,
}

impl HttpCacheBuilder<NotSet> {
    /// Creates a builder with the default key generator and header names.
    pub fn new() -> Self {
        HttpCacheBuilder {
            backend: NotSet,
            key_generator: Arc::new(DigestKeyGenerator::new()),
            allow_private: false,
            status_header: DEFAULT_CACHE_STATUS_HEADER,
            hits_header: DEFAULT_CACHE_HITS_HEADER,
        }
    }
}

impl Default for HttpCacheBuilder<NotSet> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> HttpCacheBuilder<B> {
    /// Sets the store.
    pub fn backend<NewB>(self, backend: NewB) -> HttpCacheBuilder<NewB>
    where
        NewB: Backend + Send + 'static,
    {
        HttpCacheBuilder {
            backend,
            key_generator: self.key_generator,
            allow_private: self.allow_private,
            status_header: self.status_header,
            hits_header: self.hits_header,
        }
    }

    /// Replaces the default [`DigestKeyGenerator`].
    pub fn key_generator(mut self, generator: impl KeyGenerator + 'static) -> Self {
        self.key_generator = Arc::new(generator);
        self
    }

    /// Lets `private` responses be stored. Default: `false`.
    pub fn allow_private(mut self, allow: bool) -> Self {
        self.allow_private = allow;
        self
    }

    /// Renames the cache status header.
    pub fn status_header(mut self, name: HeaderName) -> Self {
        self.status_header = name;
        self
    }

    /// Renames the hit count header, which is also the counter key prefix.
    pub fn hits_header(mut self, name: HeaderName) -> Self {
        self.hits_header = name;
        self
    }
}

impl<B> HttpCacheBuilder<B>
where
    B: Backend + Send + 'static,
{
    /// Builds the cache.
    pub fn build(self) -> HttpCache {
        HttpCache {
            backend: Arc::new(self.backend),
            key_generator: self.key_generator,
            freshness: Freshness::new(self.allow_private),
            status_header: self.status_header,
            hits_header: self.hits_header,
        }
    }
}
