use thiserror::Error;

/// Errors raised while turning configuration into runtime objects.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The YAML document could not be parsed.
    #[error("cannot parse configuration: {0}")]
    Parse(String),

    /// Cache settings are contradictory or out of range.
    #[error("invalid cache configuration: {0}")]
    InvalidCacheConfiguration(String),

    /// The requested backend is not compiled in.
    #[error("backend `{0}` is not available, enable its feature")]
    BackendNotAvailable(String),

    /// No transport is registered under the driver id.
    #[error("unknown transport driver `{0}`")]
    UnknownDriver(String),

    /// A driver rejected its options.
    #[error("invalid options for driver `{driver}`: {message}")]
    InvalidDriverOptions { driver: String, message: String },

    /// A header name in the configuration is not valid.
    #[error("invalid header name `{0}`")]
    InvalidHeaderName(String),
}
