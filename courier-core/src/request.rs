//! Outgoing HTTP request.
//!
//! [`Request`] is a plain data carrier. It owns everything a transport needs
//! to put the message on the wire and everything the key generator hashes:
//! method, URI, ordered query parameters, headers, cookies and body.
//!
//! A query string in the URI given to [`Request::new`] is split off and
//! parsed into the query map, so `uri()` never contains `?`.
//!
//! ```
//! use courier_core::Request;
//! use http::Method;
//!
//! let request = Request::new(Method::GET, "http://example.com/search?q=rust&page=2");
//! assert_eq!(request.uri(), "http://example.com/search");
//! assert_eq!(request.query().get("q").map(String::as_str), Some("rust"));
//! assert_eq!(request.full_uri(), "http://example.com/search?q=rust&page=2");
//! ```

use bytes::Bytes;
use http::header::IntoHeaderName;
use http::{HeaderMap, HeaderValue, Method, Version};
use indexmap::IndexMap;

/// An HTTP request as seen by the client pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    uri: String,
    query: IndexMap<String, String>,
    headers: HeaderMap,
    cookies: IndexMap<String, String>,
    body: Bytes,
    version: Version,
}

impl Request {
    /// Creates a request. A query string in `uri` is parsed into [`Request::query`].
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        let uri = uri.as_ref();
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (uri, IndexMap::new()),
        };
        Request {
            method,
            uri: path.to_owned(),
            query,
            headers: HeaderMap::new(),
            cookies: IndexMap::new(),
            body: Bytes::new(),
            version: Version::HTTP_11,
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(uri: impl AsRef<str>) -> Self {
        Request::new(Method::GET, uri)
    }

    /// Shorthand for a `POST` request.
    pub fn post(uri: impl AsRef<str>) -> Self {
        Request::new(Method::POST, uri)
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Replaces the request method.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Builder-style variant of [`Request::set_method`].
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// `POST`, `PUT` and `DELETE` change server state and never use cached data.
    pub fn is_destructive(&self) -> bool {
        matches!(self.method, Method::POST | Method::PUT | Method::DELETE)
    }

    /// Returns the URI without its query string.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Replaces the URI. A query string is merged into the query map.
    pub fn set_uri(&mut self, uri: impl AsRef<str>) {
        let uri = uri.as_ref();
        match uri.split_once('?') {
            Some((path, query)) => {
                self.uri = path.to_owned();
                self.query.extend(parse_query(query));
            }
            None => self.uri = uri.to_owned(),
        }
    }

    /// Returns the ordered query parameters.
    pub fn query(&self) -> &IndexMap<String, String> {
        &self.query
    }

    /// Returns the query parameters for modification.
    pub fn query_mut(&mut self) -> &mut IndexMap<String, String> {
        &mut self.query
    }

    /// Sets a query parameter, keeping its original position if present.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Returns the query string, URL-encoded and joined with `&`.
    pub fn encoded_query(&self) -> String {
        serde_urlencoded::to_string(&self.query).unwrap_or_default()
    }

    /// Returns the URI with its encoded query string appended.
    pub fn full_uri(&self) -> String {
        if self.query.is_empty() {
            self.uri.clone()
        } else {
            format!("{}?{}", self.uri, self.encoded_query())
        }
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the request headers for modification.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets a header, replacing any previous values.
    pub fn with_header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces all headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Returns the cookies sent with the request.
    pub fn cookies(&self) -> &IndexMap<String, String> {
        &self.cookies
    }

    /// Adds a cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Renders the cookies as a `Cookie` header value.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        Some(pairs.join("; "))
    }

    /// Returns the request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replaces the request body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Builder-style variant of [`Request::set_body`].
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the protocol version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Sets the protocol version.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }
}

fn parse_query(query: &str) -> IndexMap<String, String> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .map(|pairs| pairs.into_iter().collect())
        .unwrap_or_default()
}
