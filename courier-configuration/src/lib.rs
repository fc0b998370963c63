//! YAML configuration for courier.
//!
//! A [`ClientConfig`] describes a [`RequestClient`](courier::RequestClient):
//! its transport, an optional cache and the redirect settings. Transports are
//! looked up by driver id in a [`DriverRegistry`]; backends are chosen with a
//! `type` tag.
//!
//! ```yaml
//! transport:
//!   driver: stream
//!   timeout: 10s
//! cache:
//!   backend:
//!     type: Moka
//!     max_entries: 1000
//! follow: true
//! follow_headers: [authorization, cookie]
//! ```
//!
//! ```ignore
//! let config = ClientConfig::from_yaml(yaml)?;
//! let client = config.into_client(&DriverRegistry::new())?;
//! ```

pub mod backend;
mod client;
mod error;
pub mod transport;

pub use client::{CacheConfig, ClientConfig};
pub use error::ConfigError;
pub use transport::{DriverRegistry, TransportConfig, TransportFactory};
