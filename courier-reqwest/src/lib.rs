//! [`reqwest`] transport for the courier HTTP client.
//!
//! [`ReqwestTransport`] sends each [`Request`](courier_core::Request) through a
//! [`reqwest_middleware::ClientWithMiddleware`]. Redirects are never followed
//! by reqwest itself: a `3xx` comes back as an ordinary response so the
//! `Location` header callback of [`RequestClient`](courier::RequestClient)
//! stays in charge of following.
//!
//! ```no_run
//! use courier::RequestClient;
//! use courier_core::Request;
//! use courier_reqwest::ReqwestTransport;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RequestClient::builder()
//!     .transport(ReqwestTransport::try_new()?)
//!     .follow(true)
//!     .build();
//! let response = client.execute(&Request::get("http://localhost:8080/")).await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

mod error;
mod transport;

pub use error::transport_error;
pub use transport::{ReqwestTransport, client_builder, default_client};

/// Re-export of the middleware-enabled client type accepted by [`ReqwestTransport::with_client`].
pub use reqwest_middleware::ClientWithMiddleware;
