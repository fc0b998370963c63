//! HTTP/1.x over a plain TCP stream.
//!
//! [`StreamTransport`] opens one connection per request, writes the request
//! with `Connection: close`, reads until the server closes and parses the
//! reply with [`httparse`]. Chunked bodies are decoded. Only the `http`
//! scheme is supported.
//!
//! ```no_run
//! use courier::RequestClient;
//! use courier_core::Request;
//! use courier_stream::StreamTransport;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), courier::ClientError> {
//! let client = RequestClient::builder()
//!     .transport(StreamTransport::new().connect_timeout(Duration::from_secs(2)))
//!     .build();
//! let response = client.execute(&Request::get("http://localhost:8080/health")).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use courier::{Transport, TransportError, TransportErrorKind};
use courier_core::{Request, Response};
use http::{HeaderName, HeaderValue, StatusCode, Version, header};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::Url;

/// Default time allowed to establish a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest response accepted, head and body together (8 MiB).
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 8 * 1024 * 1024;

const MAX_HEADERS: usize = 96;

/// Transport writing HTTP/1.x requests on a raw TCP connection.
#[derive(Debug, Clone)]
pub struct StreamTransport {
    connect_timeout: Duration,
    max_response_size: usize,
}

impl Default for StreamTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamTransport {
    /// Creates a transport with default limits.
    pub fn new() -> Self {
        StreamTransport {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }

    /// Sets the time allowed to establish a connection.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the largest response accepted.
    pub fn max_response_size(mut self, bytes: usize) -> Self {
        self.max_response_size = bytes;
        self
    }

    async fn connect(&self, url: &Url, target: &str) -> Result<TcpStream, TransportError> {
        let host = url.host_str().ok_or_else(|| {
            TransportError::new(
                TransportErrorKind::InvalidRequest,
                target,
                "URI has no host",
            )
        })?;
        let port = url.port_or_known_default().unwrap_or(80);

        match tokio::time::timeout(self.connect_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(error)) => Err(TransportError::new(
                TransportErrorKind::Connect,
                target,
                format!("cannot connect to {host}:{port}: {error}"),
            )
            .with_source(error)),
            Err(_) => Err(TransportError::new(
                TransportErrorKind::Timeout,
                target,
                format!("no connection within {:?}", self.connect_timeout),
            )),
        }
    }

    async fn exchange(
        &self,
        stream: &mut TcpStream,
        wire: &[u8],
        target: &str,
    ) -> Result<Vec<u8>, TransportError> {
        let io_error = |error: std::io::Error| {
            TransportError::new(TransportErrorKind::Io, target, error.to_string())
                .with_source(error)
        };

        stream.write_all(wire).await.map_err(io_error)?;
        stream.flush().await.map_err(io_error)?;

        let mut buf = Vec::new();
        let limit = self.max_response_size as u64 + 1;
        (&mut *stream)
            .take(limit)
            .read_to_end(&mut buf)
            .await
            .map_err(io_error)?;
        if buf.len() > self.max_response_size {
            return Err(TransportError::new(
                TransportErrorKind::Protocol,
                target,
                format!("response exceeds {} bytes", self.max_response_size),
            ));
        }
        Ok(buf)
    }
}

#[async_trait]
impl Transport for StreamTransport {
    async fn send(
        &self,
        request: &Request,
        response: Response,
    ) -> Result<Response, TransportError> {
        let target = request.full_uri();
        let url = Url::parse(&target).map_err(|error| {
            TransportError::new(
                TransportErrorKind::InvalidRequest,
                &target,
                error.to_string(),
            )
            .with_source(error)
        })?;
        if url.scheme() != "http" {
            return Err(TransportError::new(
                TransportErrorKind::UnsupportedScheme,
                &target,
                format!("scheme `{}` is not supported", url.scheme()),
            ));
        }

        let wire = encode_request(request, &url);
        let mut stream = self.connect(&url, &target).await?;
        tracing::debug!(uri = %target, method = %request.method(), "sending request over stream");

        // Every early return below drops, and so closes, the stream.
        let raw = self.exchange(&mut stream, &wire, &target).await?;
        let response = decode_response(&raw, response, &target)?;

        if let Err(error) = stream.shutdown().await {
            tracing::trace!(uri = %target, %error, "stream shutdown failed");
        }
        Ok(response)
    }

    fn name(&self) -> &str {
        "stream"
    }
}

fn encode_request(request: &Request, url: &Url) -> Vec<u8> {
    let mut wire = BytesMut::with_capacity(256 + request.body().len());
    let path = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_owned(),
    };
    let version = match request.version() {
        Version::HTTP_10 => "HTTP/1.0",
        _ => "HTTP/1.1",
    };
    wire.extend_from_slice(format!("{} {} {}\r\n", request.method(), path, version).as_bytes());

    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_owned(),
        (None, _) => String::new(),
    };
    wire.extend_from_slice(format!("Host: {host}\r\n").as_bytes());

    for (name, value) in request.headers() {
        if matches!(
            *name,
            header::HOST | header::CONTENT_LENGTH | header::CONNECTION | header::TRANSFER_ENCODING
        ) {
            continue;
        }
        wire.extend_from_slice(name.as_str().as_bytes());
        wire.extend_from_slice(b": ");
        wire.extend_from_slice(value.as_bytes());
        wire.extend_from_slice(b"\r\n");
    }
    if let Some(cookies) = request.cookie_header() {
        wire.extend_from_slice(format!("Cookie: {cookies}\r\n").as_bytes());
    }
    if !request.body().is_empty() || request.is_destructive() {
        wire.extend_from_slice(format!("Content-Length: {}\r\n", request.body().len()).as_bytes());
    }
    wire.extend_from_slice(b"Connection: close\r\n\r\n");
    wire.extend_from_slice(request.body());
    wire.to_vec()
}

fn decode_response(
    raw: &[u8],
    mut response: Response,
    target: &str,
) -> Result<Response, TransportError> {
    let protocol =
        |message: String| TransportError::new(TransportErrorKind::Protocol, target, message);

    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Response::new(&mut headers);
    let head_len = match parsed.parse(raw) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => {
            return Err(protocol("connection closed before the response head ended".into()));
        }
        Err(error) => return Err(protocol(format!("malformed response head: {error}"))),
    };

    let code = parsed
        .code
        .ok_or_else(|| protocol("missing status code".into()))?;
    let status =
        StatusCode::from_u16(code).map_err(|error| protocol(format!("invalid status: {error}")))?;
    response.set_status(status);
    response.set_version(match parsed.version {
        Some(0) => Version::HTTP_10,
        _ => Version::HTTP_11,
    });

    for parsed_header in parsed.headers.iter() {
        let name = HeaderName::from_bytes(parsed_header.name.as_bytes()).map_err(|error| {
            protocol(format!("invalid header name: {error}")).with_status(status)
        })?;
        let value = HeaderValue::from_bytes(parsed_header.value).map_err(|error| {
            protocol(format!("invalid header value: {error}")).with_status(status)
        })?;
        response.headers_mut().append(name, value);
    }

    let body = &raw[head_len..];
    let chunked = response
        .headers()
        .get_all(header::TRANSFER_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.to_ascii_lowercase().contains("chunked"));

    let body = if chunked {
        let decoded =
            decode_chunked(body).map_err(|message| protocol(message).with_status(status))?;
        response.headers_mut().remove(header::TRANSFER_ENCODING);
        decoded
    } else if let Some(length) = content_length(&response) {
        let length = length.map_err(|message| protocol(message).with_status(status))?;
        if body.len() < length {
            return Err(protocol(format!(
                "body truncated: expected {length} bytes, got {}",
                body.len()
            ))
            .with_status(status));
        }
        Bytes::copy_from_slice(&body[..length])
    } else {
        Bytes::copy_from_slice(body)
    };
    response.set_body(body);
    Ok(response)
}

fn content_length(response: &Response) -> Option<Result<usize, String>> {
    let value = response.headers().get(header::CONTENT_LENGTH)?;
    Some(
        value
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<usize>().ok())
            .ok_or_else(|| "invalid Content-Length".to_owned()),
    )
}

fn decode_chunked(mut data: &[u8]) -> Result<Bytes, String> {
    let mut body = BytesMut::new();
    loop {
        let (offset, size) = match httparse::parse_chunk_size(data) {
            Ok(httparse::Status::Complete(parsed)) => parsed,
            Ok(httparse::Status::Partial) => return Err("chunked body ended early".into()),
            Err(_) => return Err("invalid chunk size".into()),
        };
        data = &data[offset..];
        if size == 0 {
            return Ok(body.freeze());
        }
        let size = usize::try_from(size).map_err(|_| "chunk too large".to_owned())?;
        let Some((chunk, rest)) = data.split_at_checked(size) else {
            return Err("chunked body ended early".into());
        };
        let Some(rest) = rest.strip_prefix(b"\r\n") else {
            return Err(if rest.len() < 2 {
                "chunked body ended early".into()
            } else {
                "chunk not terminated by CRLF".into()
            });
        };
        body.extend_from_slice(chunk);
        data = rest;
    }
}
