//! Transport selection through a registry of drivers.
//!
//! A driver is a named constructor that turns the `options` of a
//! [`TransportConfig`] into a [`Transport`]. [`DriverRegistry::new`] knows
//! `stream` and `reqwest` when their features are enabled; anything else,
//! such as a routed [`InternalTransport`](courier::InternalTransport), is
//! registered by the application.
//!
//! ```yaml
//! driver: stream
//! timeout: 5s
//! options:
//!   connect_timeout: 1s
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use courier::{TimeoutTransport, Transport};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Builds a transport from driver options.
pub type TransportFactory =
    Arc<dyn Fn(&serde_json::Value) -> Result<Arc<dyn Transport>, ConfigError> + Send + Sync>;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TransportConfig {
    pub driver: String,
    /// Deadline for a whole `send`, applied around the driver's transport.
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub options: serde_json::Value,
}

impl TransportConfig {
    pub fn new(driver: impl Into<String>) -> Self {
        TransportConfig {
            driver: driver.into(),
            timeout: None,
            options: serde_json::Value::Null,
        }
    }
}

/// Maps driver ids to transport constructors.
#[derive(Clone)]
pub struct DriverRegistry {
    drivers: IndexMap<String, TransportFactory>,
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.drivers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverRegistry {
    /// A registry with no drivers.
    pub fn empty() -> Self {
        DriverRegistry {
            drivers: IndexMap::new(),
        }
    }

    /// A registry with the built-in drivers enabled by crate features.
    pub fn new() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::empty();
        #[cfg(feature = "stream")]
        registry.register("stream", stream::create);
        #[cfg(feature = "reqwest")]
        registry.register("reqwest", reqwest::create);
        registry
    }

    /// Registers a constructor, replacing any driver with the same id.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&serde_json::Value) -> Result<Arc<dyn Transport>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.drivers.insert(id.into(), Arc::new(factory));
        self
    }

    /// Registers a ready-made transport shared by every client built from it.
    pub fn register_instance(
        &mut self,
        id: impl Into<String>,
        transport: impl Transport + 'static,
    ) -> &mut Self {
        let transport: Arc<dyn Transport> = Arc::new(transport);
        self.register(id, move |_options| Ok(transport.clone()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.drivers.contains_key(id)
    }

    /// Registered driver ids in registration order.
    pub fn drivers(&self) -> impl Iterator<Item = &str> {
        self.drivers.keys().map(String::as_str)
    }

    /// Builds the transport described by `config`.
    pub fn create(&self, config: &TransportConfig) -> Result<Arc<dyn Transport>, ConfigError> {
        let factory = self
            .drivers
            .get(&config.driver)
            .ok_or_else(|| ConfigError::UnknownDriver(config.driver.clone()))?;
        let transport = factory(&config.options)?;
        tracing::debug!(driver = %config.driver, timeout = ?config.timeout, "transport created");

        Ok(match config.timeout {
            Some(timeout) => Arc::new(TimeoutTransport::new(transport, timeout)),
            None => transport,
        })
    }
}

/// Decodes driver options, treating a missing block as all defaults.
pub fn driver_options<T>(driver: &str, options: &serde_json::Value) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    if options.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(options.clone()).map_err(|error| ConfigError::InvalidDriverOptions {
        driver: driver.to_owned(),
        message: error.to_string(),
    })
}

#[cfg(feature = "stream")]
mod stream {
    use super::*;
    use courier_stream::StreamTransport;

    #[derive(Debug, Default, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct StreamOptions {
        #[serde(default, with = "humantime_serde")]
        connect_timeout: Option<Duration>,
        #[serde(default)]
        max_response_size: Option<usize>,
    }

    pub(super) fn create(options: &serde_json::Value) -> Result<Arc<dyn Transport>, ConfigError> {
        let options: StreamOptions = driver_options("stream", options)?;
        let mut transport = StreamTransport::new();
        if let Some(timeout) = options.connect_timeout {
            transport = transport.connect_timeout(timeout);
        }
        if let Some(size) = options.max_response_size {
            transport = transport.max_response_size(size);
        }
        Ok(Arc::new(transport))
    }
}

#[cfg(feature = "reqwest")]
mod reqwest {
    use super::*;
    use courier_reqwest::ReqwestTransport;

    #[derive(Debug, Default, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct ReqwestOptions {
        #[serde(default, with = "humantime_serde")]
        connect_timeout: Option<Duration>,
        #[serde(default)]
        user_agent: Option<String>,
    }

    pub(super) fn create(options: &serde_json::Value) -> Result<Arc<dyn Transport>, ConfigError> {
        let options: ReqwestOptions = driver_options("reqwest", options)?;
        let mut builder = courier_reqwest::client_builder();
        if let Some(timeout) = options.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(user_agent) = options.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let client = builder
            .build()
            .map_err(|error| ConfigError::InvalidDriverOptions {
                driver: "reqwest".to_owned(),
                message: error.to_string(),
            })?;
        Ok(Arc::new(ReqwestTransport::with_client(client)))
    }
}
