use std::time::Duration;

use courier::Transport;
use courier::transport::{InternalTransport, handler_fn};
use courier_configuration::backend::{Backend, BackendConfig, Moka, ValueFormat};
use courier_configuration::{
    CacheConfig, ClientConfig, ConfigError, DriverRegistry, TransportConfig,
};
use courier_core::Request;
use http::{HeaderValue, StatusCode, header};
use pretty_assertions::assert_eq;

fn greeting_transport() -> InternalTransport {
    InternalTransport::new().route(
        "/greeting",
        handler_fn(|_request, response| {
            Ok(response
                .with_header(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("max-age=60"),
                )
                .with_body("hello"))
        }),
    )
}

fn registry() -> DriverRegistry {
    let mut registry = DriverRegistry::new();
    registry.register_instance("internal", greeting_transport());
    registry
}

#[test]
fn full_document_is_parsed() {
    let yaml = r#"
transport:
  driver: stream
  timeout: 5s
  options:
    connect_timeout: 1s
cache:
  allow_private: true
  status_header: x-served-by-cache
  backend:
    type: Moka
    max_entries: 1000
follow: true
follow_headers: [authorization, cookie]
strict_redirect: false
max_callback_depth: 3
callback_params:
  tenant: acme
"#;

    let config = ClientConfig::from_yaml(yaml).unwrap();

    let mut callback_params = indexmap::IndexMap::new();
    callback_params.insert("tenant".to_owned(), serde_json::json!("acme"));
    assert_eq!(
        config,
        ClientConfig {
            transport: TransportConfig {
                driver: "stream".to_owned(),
                timeout: Some(Duration::from_secs(5)),
                options: serde_json::json!({ "connect_timeout": "1s" }),
            },
            cache: Some(CacheConfig {
                backend: Backend::Moka(BackendConfig {
                    value: ValueFormat::default(),
                    backend: Moka {
                        max_entries: Some(1000),
                        ..Moka::default()
                    },
                }),
                allow_private: true,
                status_header: Some("x-served-by-cache".to_owned()),
                hits_header: None,
            }),
            follow: true,
            follow_headers: Some(vec!["authorization".to_owned(), "cookie".to_owned()]),
            strict_redirect: false,
            max_callback_depth: 3,
            callback_params,
        }
    );
}

#[test]
fn defaults_match_the_client_builder() {
    let config = ClientConfig::from_yaml("transport:\n  driver: internal\n").unwrap();

    assert_eq!(config.cache, None);
    assert!(!config.follow);
    assert!(config.strict_redirect);
    assert_eq!(config.max_callback_depth, 5);

    let client = config.into_client(&registry()).unwrap();
    assert!(client.cache().is_none());
    assert!(client.strict_redirect());
    assert_eq!(client.max_callback_depth(), 5);
    assert_eq!(
        client.follow_headers().iter().collect::<Vec<_>>(),
        vec![&header::AUTHORIZATION]
    );
}

#[test]
fn unknown_fields_are_parse_errors() {
    let error =
        ClientConfig::from_yaml("transport:\n  driver: internal\nfollw: true\n").unwrap_err();
    assert!(matches!(error, ConfigError::Parse(_)), "{error}");
}

#[test]
fn unknown_driver_is_rejected() {
    let config = ClientConfig::from_yaml("transport:\n  driver: carrier-pigeon\n").unwrap();

    let error = config.into_client(&registry()).unwrap_err();

    assert!(matches!(error, ConfigError::UnknownDriver(ref id) if id == "carrier-pigeon"));
}

#[test]
fn empty_registry_knows_no_drivers() {
    let registry = DriverRegistry::empty();
    assert_eq!(registry.drivers().count(), 0);
    assert!(matches!(
        registry.create(&TransportConfig::new("stream")),
        Err(ConfigError::UnknownDriver(_))
    ));
}

#[test]
fn builtin_stream_driver_is_registered() {
    let registry = DriverRegistry::new();
    assert!(registry.contains("stream"));

    let yaml = r#"
transport:
  driver: stream
  options:
    connect_timeout: 250ms
    max_response_size: 4096
"#;
    let config = ClientConfig::from_yaml(yaml).unwrap();

    let transport = registry.create(&config.transport).unwrap();
    assert_eq!(transport.name(), "stream");
}

#[test]
fn invalid_driver_options_are_rejected() {
    let config = ClientConfig::from_yaml(
        "transport:\n  driver: stream\n  options:\n    connect_timeout: soon\n",
    )
    .unwrap();

    let error = config.into_client(&DriverRegistry::new()).unwrap_err();

    assert!(
        matches!(error, ConfigError::InvalidDriverOptions { ref driver, .. } if driver == "stream"),
        "{error}"
    );
}

#[test]
fn conflicting_capacities_are_invalid_cache_configuration() {
    let yaml = r#"
transport:
  driver: internal
cache:
  backend:
    type: Moka
    max_entries: 10
    max_bytes: 1024
"#;
    let error = ClientConfig::from_yaml(yaml)
        .unwrap()
        .into_client(&registry())
        .unwrap_err();

    assert!(matches!(error, ConfigError::InvalidCacheConfiguration(_)), "{error}");
}

#[test]
fn identical_cache_headers_are_invalid() {
    let yaml = r#"
transport:
  driver: internal
cache:
  status_header: x-cache
  hits_header: x-cache
  backend:
    type: Moka
    max_entries: 10
"#;
    let error = ClientConfig::from_yaml(yaml)
        .unwrap()
        .into_client(&registry())
        .unwrap_err();

    assert!(matches!(error, ConfigError::InvalidCacheConfiguration(_)), "{error}");
}

#[test]
fn header_colliding_with_default_is_invalid() {
    let yaml = r#"
transport:
  driver: internal
cache:
  status_header: X-Cache-Hits
  backend:
    type: Moka
    max_entries: 10
"#;
    let error = ClientConfig::from_yaml(yaml)
        .unwrap()
        .into_client(&registry())
        .unwrap_err();

    let ConfigError::InvalidCacheConfiguration(message) = error else {
        panic!("unexpected error: {error}");
    };
    assert!(message.contains("x-cache-hits"), "{message}");
}

#[test]
fn invalid_follow_header_is_rejected() {
    let yaml = "transport:\n  driver: internal\nfollow_headers: [\"bad header\"]\n";
    let error = ClientConfig::from_yaml(yaml)
        .unwrap()
        .into_client(&registry())
        .unwrap_err();

    assert!(matches!(error, ConfigError::InvalidHeaderName(ref name) if name == "bad header"));
}

#[tokio::test]
async fn configured_client_serves_from_cache() {
    let yaml = r#"
transport:
  driver: internal
  timeout: 1s
cache:
  hits_header: x-hits
  backend:
    type: Moka
    max_entries: 100
    value:
      format: Ron
callback_params:
  retries: 0
"#;
    let client = ClientConfig::from_yaml(yaml)
        .unwrap()
        .into_client(&registry())
        .unwrap();
    let status = "x-cache-status".parse().unwrap();
    let hits = "x-hits".parse().unwrap();

    let first = client.execute(&Request::get("/greeting")).await.unwrap();
    let second = client.execute(&Request::get("/greeting")).await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.header_str(&status), Some("MISS"));
    assert_eq!(second.header_str(&status), Some("HIT"));
    assert_eq!(second.header_str(&hits), Some("1"));
    assert_eq!(second.body().as_ref(), b"hello");
    assert_eq!(
        client.callback_param("retries"),
        Some(&serde_json::json!(0))
    );
}
