use std::str::FromStr;

use courier::client::DEFAULT_MAX_CALLBACK_DEPTH;
use courier::{HttpCache, RequestClient};
use courier_core::{DEFAULT_CACHE_HITS_HEADER, DEFAULT_CACHE_STATUS_HEADER};
use http::HeaderName;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::error::ConfigError;
use crate::transport::{DriverRegistry, TransportConfig};

/// Cache placed in front of the transport.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    pub backend: Backend,
    #[serde(default)]
    pub allow_private: bool,
    #[serde(default)]
    pub status_header: Option<String>,
    #[serde(default)]
    pub hits_header: Option<String>,
}

impl CacheConfig {
    pub fn into_cache(self) -> Result<HttpCache, ConfigError> {
        let status_header = match self.status_header.as_deref() {
            Some(name) => header_name(name)?,
            None => DEFAULT_CACHE_STATUS_HEADER,
        };
        let hits_header = match self.hits_header.as_deref() {
            Some(name) => header_name(name)?,
            None => DEFAULT_CACHE_HITS_HEADER,
        };
        if status_header == hits_header {
            return Err(ConfigError::InvalidCacheConfiguration(format!(
                "status and hits headers are both `{status_header}`"
            )));
        }

        Ok(HttpCache::builder()
            .backend(self.backend.into_backend()?)
            .allow_private(self.allow_private)
            .status_header(status_header)
            .hits_header(hits_header)
            .build())
    }
}

/// Everything needed to build a [`RequestClient`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub transport: TransportConfig,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    #[serde(default)]
    pub follow: bool,
    /// `None` keeps the client default (`Authorization`).
    #[serde(default)]
    pub follow_headers: Option<Vec<String>>,
    #[serde(default = "default_strict_redirect")]
    pub strict_redirect: bool,
    #[serde(default = "default_max_callback_depth")]
    pub max_callback_depth: u32,
    #[serde(default)]
    pub callback_params: IndexMap<String, serde_json::Value>,
}

fn default_strict_redirect() -> bool {
    true
}

fn default_max_callback_depth() -> u32 {
    DEFAULT_MAX_CALLBACK_DEPTH
}

impl ClientConfig {
    /// Parses a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_saphyr::from_str(yaml).map_err(|error| ConfigError::Parse(error.to_string()))
    }

    /// Builds the client, resolving the transport through `registry`.
    pub fn into_client(self, registry: &DriverRegistry) -> Result<RequestClient, ConfigError> {
        let transport = registry.create(&self.transport)?;

        let mut builder = RequestClient::builder()
            .transport(transport)
            .follow(self.follow)
            .strict_redirect(self.strict_redirect)
            .max_callback_depth(self.max_callback_depth);
        if let Some(headers) = self.follow_headers {
            let headers = headers
                .iter()
                .map(|name| header_name(name))
                .collect::<Result<Vec<_>, _>>()?;
            builder = builder.follow_headers(headers);
        }
        for (name, value) in self.callback_params {
            builder = builder.callback_param(name, value);
        }
        if let Some(cache) = self.cache {
            builder = builder.cache(cache.into_cache()?);
        }
        Ok(builder.build())
    }
}

fn header_name(name: &str) -> Result<HeaderName, ConfigError> {
    HeaderName::from_str(name).map_err(|_| ConfigError::InvalidHeaderName(name.to_owned()))
}
