//! Header callbacks run after a response arrives.
//!
//! A callback is registered on a [`RequestClient`] under a response header
//! name and runs when that header is present. It either lets the response
//! through, asks the client to follow up with another request, or replaces
//! the response outright.

use std::sync::Arc;

use courier_core::{Request, Response};
use http::{Method, StatusCode, header};

use crate::client::RequestClient;
use crate::error::CallbackError;

/// What the client should do after a callback ran.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    /// Keep the response and run the next callback.
    Continue,
    /// Execute this request one level deeper and return its response.
    Follow(Request),
    /// Return this response instead.
    Replace(Response),
}

/// A typed header callback.
pub type HeaderCallback = Arc<
    dyn Fn(&Request, &Response, &RequestClient) -> Result<CallbackOutcome, CallbackError>
        + Send
        + Sync,
>;

/// Wraps a closure as a [`HeaderCallback`].
pub fn header_callback<F>(f: F) -> HeaderCallback
where
    F: Fn(&Request, &Response, &RequestClient) -> Result<CallbackOutcome, CallbackError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Follows `Location` redirects when the client has `follow` enabled.
///
/// | status | follow-up method |
/// |--------|------------------|
/// | 301, 307 | original |
/// | 201, 303 | `GET` |
/// | 302 | original when `strict_redirect`, otherwise `GET` |
///
/// Only headers listed in [`RequestClient::follow_headers`] are carried over.
/// The body is carried over unless the follow-up is a `GET`.
pub fn on_header_location(
    request: &Request,
    response: &Response,
    client: &RequestClient,
) -> Result<CallbackOutcome, CallbackError> {
    if !client.follow() {
        return Ok(CallbackOutcome::Continue);
    }
    let Some(method) = redirect_method(
        response.status(),
        request.method(),
        client.strict_redirect(),
    ) else {
        return Ok(CallbackOutcome::Continue);
    };
    let Some(location) = response.headers().get(header::LOCATION) else {
        return Ok(CallbackOutcome::Continue);
    };
    let location = location
        .to_str()
        .map_err(|_| CallbackError::InvalidHeaderValue {
            header: header::LOCATION,
        })?;

    let target = resolve_location(&request.full_uri(), location)?;
    let mut follow = Request::new(method, target).with_version(request.version());
    for name in client.follow_headers() {
        for value in request.headers().get_all(name) {
            follow.headers_mut().append(name.clone(), value.clone());
        }
    }
    if follow.method() != Method::GET {
        follow.set_body(request.body().clone());
    }

    tracing::debug!(
        status = response.status().as_u16(),
        from = request.uri(),
        to = follow.uri(),
        method = %follow.method(),
        "following redirect"
    );
    Ok(CallbackOutcome::Follow(follow))
}

/// Returns the follow-up method for a redirect status, `None` for statuses
/// that are not followed.
pub fn redirect_method(status: StatusCode, original: &Method, strict: bool) -> Option<Method> {
    match status.as_u16() {
        301 | 307 => Some(original.clone()),
        201 | 303 => Some(Method::GET),
        302 if strict => Some(original.clone()),
        302 => Some(Method::GET),
        _ => None,
    }
}

fn resolve_location(base: &str, location: &str) -> Result<String, CallbackError> {
    match url::Url::parse(base) {
        Ok(base) => base
            .join(location)
            .map(String::from)
            .map_err(|source| CallbackError::InvalidLocation {
                location: location.to_owned(),
                source,
            }),
        Err(_) => Ok(location.to_owned()),
    }
}
