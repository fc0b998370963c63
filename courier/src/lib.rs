#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! # courier
//!
//! A caching HTTP request client with pluggable transports.
//!
//! - [`RequestClient`] executes requests, runs header callbacks such as
//!   redirect following, and bounds how deep callbacks may chain requests.
//! - [`HttpCache`] serves responses from a [`Backend`](courier_backend::Backend)
//!   according to their `Cache-Control`, `Expires`, `Date` and `Age` headers.
//! - [`Transport`] is the seam to the network. [`InternalTransport`]
//!   dispatches to in-process handlers; `courier-stream` and `courier-reqwest`
//!   talk to real servers.
//!
//! ```
//! use courier::{HttpCache, RequestClient};
//! use courier::transport::{InternalTransport, handler_fn};
//! use courier_core::Request;
//! use courier_moka::MokaBackend;
//! use http::{HeaderValue, header};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), courier::ClientError> {
//! let transport = InternalTransport::new().route(
//!     "/greeting",
//!     handler_fn(|_request, response| {
//!         Ok(response
//!             .with_header(header::CACHE_CONTROL, HeaderValue::from_static("max-age=60"))
//!             .with_body("hello"))
//!     }),
//! );
//! let cache = HttpCache::builder()
//!     .backend(MokaBackend::builder().max_entries(100).build())
//!     .build();
//! let client = RequestClient::builder()
//!     .transport(transport)
//!     .cache(cache)
//!     .build();
//!
//! let first = client.execute(&Request::get("/greeting")).await?;
//! let second = client.execute(&Request::get("/greeting")).await?;
//! assert_eq!(first.header_str(&"x-cache-status".parse().unwrap()), Some("MISS"));
//! assert_eq!(second.header_str(&"x-cache-status".parse().unwrap()), Some("HIT"));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod callback;
pub mod client;
pub mod error;
pub mod freshness;
pub mod transport;

pub use cache::{HttpCache, HttpCacheBuilder};
pub use callback::{CallbackOutcome, HeaderCallback, header_callback, on_header_location};
pub use client::{RequestClient, RequestClientBuilder};
pub use error::{CallbackError, ClientError, TransportError, TransportErrorKind};
pub use freshness::{CacheControl, Freshness, RequestTiming};
pub use transport::{InternalTransport, TimeoutTransport, Transport};

pub use courier_core::{CacheKey, CacheStatus, KeyGenerator, Request, Response};

/// Marker type for unset builder fields.
///
/// When you see `NotSet` in a compiler error, a required builder method
/// has not been called yet.
pub struct NotSet;
