//! HTTP response produced by a transport.
//!
//! [`Response`] is serializable so a cache backend can persist it as is:
//! status, protocol version, headers and body round-trip through serde.
//! A response served from cache is a deserialized copy, equal in content
//! but not in identity to the one that was stored.

use bytes::Bytes;
use http::header::IntoHeaderName;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Version};
use serde::{Deserialize, Serialize};

/// An HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(with = "http_serde::status_code")]
    status: StatusCode,
    #[serde(with = "http_serde::version")]
    version: Version,
    #[serde(with = "http_serde::header_map")]
    headers: HeaderMap,
    body: Bytes,
}

impl Default for Response {
    fn default() -> Self {
        Response::new(StatusCode::OK)
    }
}

impl Response {
    /// Creates an empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Response {
            status,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Creates the empty `200 OK` response a transport fills in, carrying
    /// the protocol version of the request being executed.
    pub fn for_protocol(version: Version) -> Self {
        Response {
            version,
            ..Response::default()
        }
    }

    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Replaces the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Builder-style variant of [`Response::set_status`].
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Returns the protocol version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Replaces the protocol version.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the response headers for modification.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets a header, replacing any previous values.
    pub fn with_header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns the first value of a header as text, if present and valid UTF-8.
    pub fn header_str(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Returns the response body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replaces the response body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Builder-style variant of [`Response::set_body`].
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}
