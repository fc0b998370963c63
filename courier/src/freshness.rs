//! Cacheability and freshness lifetime of HTTP responses.
//!
//! [`Freshness`] decides whether a response may be stored and for how long,
//! following the RFC 7234 age calculation:
//!
//! ```text
//! apparent_age           = max(0, received - Date)      (execution time without Date)
//! corrected_received_age = max(apparent_age, Age)
//! corrected_initial_age  = corrected_received_age + (received - started)
//! current_age            = corrected_initial_age + (now - received)
//! ```
//!
//! The lifetime is then taken from the first matching rule, later rules
//! overriding earlier ones: `max-age`, `s-maxage` (only for `private`
//! responses when private caching is allowed), `max-stale` without
//! `must-revalidate`, and finally `Expires` when nothing else applied.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use courier_core::Response;
use http::{HeaderMap, header};
use indexmap::IndexMap;

/// Parsed `Cache-Control` directives.
///
/// Directive names are lower-cased and surrounding quotes are stripped from
/// values. Multiple `Cache-Control` headers are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    directives: IndexMap<String, Option<String>>,
}

impl CacheControl {
    /// Parses a single header value such as `public, max-age=60`.
    pub fn parse(value: &str) -> Self {
        let mut control = CacheControl::default();
        control.extend(value);
        control
    }

    /// Collects every `Cache-Control` header of `headers`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut control = CacheControl::default();
        for value in headers.get_all(header::CACHE_CONTROL) {
            if let Ok(value) = value.to_str() {
                control.extend(value);
            }
        }
        control
    }

    fn extend(&mut self, value: &str) {
        for directive in value.split(',') {
            let directive = directive.trim();
            if directive.is_empty() {
                continue;
            }
            let (name, value) = match directive.split_once('=') {
                Some((name, value)) => (name, Some(value.trim().trim_matches('"').to_owned())),
                None => (directive, None),
            };
            self.directives
                .insert(name.trim().to_ascii_lowercase(), value);
        }
    }

    /// Returns `true` if the directive is present, with or without a value.
    pub fn contains(&self, name: &str) -> bool {
        self.directives.contains_key(name)
    }

    /// Returns the raw value of a directive.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.directives.get(name).and_then(|value| value.as_deref())
    }

    /// Returns the numeric value of a present directive.
    ///
    /// A missing or non-numeric value reads as `0`.
    pub fn seconds(&self, name: &str) -> Option<i64> {
        self.directives.get(name).map(|value| {
            value
                .as_deref()
                .and_then(|value| value.parse::<i64>().ok())
                .unwrap_or(0)
        })
    }

    /// Returns `true` if no directive was parsed.
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

/// When a request was sent and when its response arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTiming {
    /// Moment the request was handed to the transport.
    pub started: DateTime<Utc>,
    /// Moment the response was received.
    pub received: DateTime<Utc>,
}

impl RequestTiming {
    /// Creates a timing from both instants.
    pub fn new(started: DateTime<Utc>, received: DateTime<Utc>) -> Self {
        RequestTiming { started, received }
    }

    /// A timing with zero execution time, received at `at`.
    pub fn instant(at: DateTime<Utc>) -> Self {
        RequestTiming {
            started: at,
            received: at,
        }
    }

    /// Time spent executing the request, never negative.
    pub fn execution(&self) -> TimeDelta {
        (self.received - self.started).max(TimeDelta::zero())
    }
}

/// Freshness rules for one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Freshness {
    allow_private: bool,
}

impl Freshness {
    /// Creates the rules; `allow_private` lets `private` responses be stored.
    pub fn new(allow_private: bool) -> Self {
        Freshness { allow_private }
    }

    /// Returns whether `private` responses may be stored.
    pub fn allow_private(&self) -> bool {
        self.allow_private
    }

    /// Returns whether `response` may be stored at all.
    pub fn is_cacheable(&self, response: &Response) -> bool {
        self.is_cacheable_at(response, Utc::now())
    }

    /// Same as [`is_cacheable`](Self::is_cacheable) with an explicit clock.
    pub fn is_cacheable_at(&self, response: &Response, now: DateTime<Utc>) -> bool {
        let control = CacheControl::from_headers(response.headers());
        if control.contains("no-cache") || control.contains("no-store") {
            return false;
        }

        let mut max_age = control.seconds("max-age");
        if control.contains("private") && !self.allow_private {
            match control.seconds("s-maxage") {
                Some(s_maxage) => max_age = Some(s_maxage),
                None => return false,
            }
        }

        if let Some(max_age) = max_age {
            return max_age >= 1;
        }

        if response.headers().contains_key(header::EXPIRES) {
            return match http_date(response.headers(), header::EXPIRES) {
                Some(expires) => expires > now,
                None => false,
            };
        }

        true
    }

    /// Returns the freshness lifetime of `response`, or `None` if it must
    /// not be stored.
    pub fn lifetime(&self, response: &Response, timing: &RequestTiming) -> Option<Duration> {
        self.lifetime_at(response, timing, Utc::now())
    }

    /// Same as [`lifetime`](Self::lifetime) with an explicit clock.
    pub fn lifetime_at(
        &self,
        response: &Response,
        timing: &RequestTiming,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        if !self.is_cacheable_at(response, now) {
            return None;
        }

        let headers = response.headers();
        let control = CacheControl::from_headers(headers);
        let current_age = current_age(headers, timing, now);

        let mut ttl = None;
        if let Some(max_age) = control.seconds("max-age") {
            ttl = Some(delta_seconds(max_age));
        }
        if control.contains("private")
            && self.allow_private
            && let Some(s_maxage) = control.seconds("s-maxage")
        {
            ttl = Some(delta_seconds(s_maxage));
        }
        if let Some(max_stale) = control.seconds("max-stale")
            && !control.contains("must-revalidate")
        {
            ttl = Some(
                current_age
                    .checked_add(&delta_seconds(max_stale))
                    .unwrap_or(TimeDelta::MAX),
            );
        }
        if ttl.is_none()
            && let Some(expires) = http_date(headers, header::EXPIRES)
        {
            ttl = Some(
                (expires - now)
                    .checked_sub(&current_age)
                    .unwrap_or(TimeDelta::MIN),
            );
        }

        ttl.filter(|ttl| *ttl > TimeDelta::zero())
            .and_then(|ttl| ttl.to_std().ok())
    }
}

fn current_age(headers: &HeaderMap, timing: &RequestTiming, now: DateTime<Utc>) -> TimeDelta {
    let execution = timing.execution();
    let apparent_age = match http_date(headers, header::DATE) {
        Some(date) => (timing.received - date).max(TimeDelta::zero()),
        None => execution,
    };
    let corrected_received_age = match age(headers) {
        Some(age) => apparent_age.max(age),
        None => apparent_age,
    };
    let corrected_initial_age = corrected_received_age
        .checked_add(&execution)
        .unwrap_or(TimeDelta::MAX);
    let resident_time = now - timing.received;
    corrected_initial_age
        .checked_add(&resident_time)
        .unwrap_or(TimeDelta::MAX)
}

fn age(headers: &HeaderMap) -> Option<TimeDelta> {
    headers
        .get(header::AGE)?
        .to_str()
        .ok()?
        .trim()
        .parse::<i64>()
        .ok()
        .map(delta_seconds)
}

/// Directive values are untrusted; out-of-range seconds saturate.
fn delta_seconds(seconds: i64) -> TimeDelta {
    TimeDelta::try_seconds(seconds).unwrap_or(if seconds < 0 {
        TimeDelta::MIN
    } else {
        TimeDelta::MAX
    })
}

fn http_date(headers: &HeaderMap, name: header::HeaderName) -> Option<DateTime<Utc>> {
    let value = headers.get(name)?.to_str().ok()?;
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, StatusCode};

    fn response(cache_control: &str) -> Response {
        Response::new(StatusCode::OK).with_header(
            header::CACHE_CONTROL,
            HeaderValue::from_str(cache_control).unwrap(),
        )
    }

    fn http_date_value(date: DateTime<Utc>) -> HeaderValue {
        HeaderValue::from_str(&date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()).unwrap()
    }

    fn secs(ttl: Option<Duration>) -> Option<u64> {
        ttl.map(|ttl| ttl.as_secs())
    }

    #[test]
    fn parse_directives() {
        let control = CacheControl::parse("Public, MAX-AGE=\"60\", no-transform, max-stale=abc");
        assert!(control.contains("public"));
        assert!(control.contains("no-transform"));
        assert_eq!(control.get("max-age"), Some("60"));
        assert_eq!(control.seconds("max-age"), Some(60));
        assert_eq!(control.seconds("max-stale"), Some(0));
        assert_eq!(control.seconds("public"), Some(0));
        assert_eq!(control.seconds("s-maxage"), None);
    }

    #[test]
    fn multiple_headers_are_merged() {
        let mut headers = HeaderMap::new();
        headers.append(header::CACHE_CONTROL, HeaderValue::from_static("private"));
        headers.append(header::CACHE_CONTROL, HeaderValue::from_static("max-age=5"));
        let control = CacheControl::from_headers(&headers);
        assert!(control.contains("private"));
        assert_eq!(control.seconds("max-age"), Some(5));
    }

    #[test]
    fn no_store_and_no_cache_are_not_cacheable() {
        let freshness = Freshness::default();
        assert!(!freshness.is_cacheable(&response("no-store, max-age=60")));
        assert!(!freshness.is_cacheable(&response("no-cache")));
    }

    #[test]
    fn private_requires_allow_private_or_s_maxage() {
        let deny = Freshness::new(false);
        let allow = Freshness::new(true);

        assert!(!deny.is_cacheable(&response("private, max-age=60")));
        assert!(allow.is_cacheable(&response("private, max-age=60")));
        assert!(deny.is_cacheable(&response("private, s-maxage=30")));
        assert!(!deny.is_cacheable(&response("private, max-age=60, s-maxage=0")));
    }

    #[test]
    fn zero_max_age_is_not_cacheable() {
        let freshness = Freshness::default();
        assert!(!freshness.is_cacheable(&response("max-age=0")));
        assert!(!freshness.is_cacheable(&response("max-age=soon")));
        assert!(freshness.is_cacheable(&response("max-age=1")));
    }

    #[test]
    fn past_or_garbage_expires_is_not_cacheable() {
        let freshness = Freshness::default();
        let now = Utc::now();

        let past = Response::new(StatusCode::OK)
            .with_header(
                header::EXPIRES,
                http_date_value(now - TimeDelta::seconds(10)),
            );
        assert!(!freshness.is_cacheable_at(&past, now));

        let garbage = Response::new(StatusCode::OK)
            .with_header(header::EXPIRES, HeaderValue::from_static("0"));
        assert!(!freshness.is_cacheable_at(&garbage, now));

        let future = Response::new(StatusCode::OK)
            .with_header(
                header::EXPIRES,
                http_date_value(now + TimeDelta::seconds(10)),
            );
        assert!(freshness.is_cacheable_at(&future, now));
    }

    #[test]
    fn max_age_wins_over_past_expires() {
        let freshness = Freshness::default();
        let now = Utc::now();
        let response = response("max-age=100")
            .with_header(
                header::EXPIRES,
                http_date_value(now - TimeDelta::seconds(3600)),
            );

        let ttl = freshness.lifetime_at(&response, &RequestTiming::instant(now), now);
        assert_eq!(secs(ttl), Some(100));
    }

    #[test]
    fn expires_lifetime_subtracts_nothing_without_elapsed_time() {
        let freshness = Freshness::default();
        let now = Utc::now();
        let response = Response::new(StatusCode::OK)
            .with_header(
                header::EXPIRES,
                http_date_value(now + TimeDelta::seconds(60)),
            );

        let ttl = freshness
            .lifetime_at(&response, &RequestTiming::instant(now), now)
            .unwrap();
        // Sub-second precision is lost in the HTTP date.
        assert!(ttl <= Duration::from_secs(60));
        assert!(ttl > Duration::from_secs(58));
    }

    #[test]
    fn expires_lifetime_accounts_for_age() {
        let freshness = Freshness::default();
        let now = Utc::now();
        let response = Response::new(StatusCode::OK)
            .with_header(
                header::EXPIRES,
                http_date_value(now + TimeDelta::seconds(120)),
            )
            .with_header(header::AGE, HeaderValue::from_static("30"));
        let timing = RequestTiming::new(now - TimeDelta::seconds(5), now);

        // current age = max(5, 30) + 5 = 35
        let ttl = freshness.lifetime_at(&response, &timing, now).unwrap();
        assert!(ttl <= Duration::from_secs(85));
        assert!(ttl > Duration::from_secs(83));
    }

    #[test]
    fn s_maxage_applies_only_to_allowed_private_responses() {
        let now = Utc::now();
        let timing = RequestTiming::instant(now);

        let shared = response("public, max-age=60, s-maxage=600");
        assert_eq!(
            secs(Freshness::new(true).lifetime_at(&shared, &timing, now)),
            Some(60)
        );

        let private = response("private, max-age=60, s-maxage=600");
        assert_eq!(
            secs(Freshness::new(true).lifetime_at(&private, &timing, now)),
            Some(600)
        );

        // s-maxage makes the response cacheable, but no rule yields a lifetime.
        let private_only = response("private, s-maxage=600");
        assert!(Freshness::new(false).is_cacheable_at(&private_only, now));
        assert_eq!(
            Freshness::new(false).lifetime_at(&private_only, &timing, now),
            None
        );
    }

    #[test]
    fn max_stale_extends_current_age() {
        let freshness = Freshness::default();
        let now = Utc::now();
        let response = response("max-age=10, max-stale=50")
            .with_header(header::DATE, http_date_value(now - TimeDelta::seconds(20)));

        let ttl = freshness.lifetime_at(&response, &RequestTiming::instant(now), now);
        let ttl = ttl.unwrap().as_secs();
        assert!((69..=70).contains(&ttl), "ttl = {ttl}");

        let revalidate = response_with_must_revalidate();
        assert_eq!(
            secs(freshness.lifetime_at(&revalidate, &RequestTiming::instant(now), now)),
            Some(10)
        );
    }

    fn response_with_must_revalidate() -> Response {
        response("max-age=10, max-stale=50, must-revalidate")
    }

    #[test]
    fn no_rule_means_no_lifetime() {
        let freshness = Freshness::default();
        let now = Utc::now();
        let plain = Response::new(StatusCode::OK);

        assert!(freshness.is_cacheable_at(&plain, now));
        assert_eq!(
            freshness.lifetime_at(&plain, &RequestTiming::instant(now), now),
            None
        );
    }

    #[test]
    fn resident_time_is_subtracted_from_expires() {
        let freshness = Freshness::default();
        let now = Utc::now();
        let received = now - TimeDelta::seconds(10);
        let response = Response::new(StatusCode::OK)
            .with_header(
                header::EXPIRES,
                http_date_value(now + TimeDelta::seconds(60)),
            );

        let ttl = freshness
            .lifetime_at(&response, &RequestTiming::instant(received), now)
            .unwrap();
        assert!(ttl <= Duration::from_secs(50));
        assert!(ttl > Duration::from_secs(48));
    }

    #[test]
    fn huge_age_saturates_instead_of_overflowing() {
        let freshness = Freshness::default();
        let now = Utc::now();
        let timing = RequestTiming::new(now - TimeDelta::seconds(2), now - TimeDelta::seconds(1));
        let age = HeaderValue::from_static("9223372036854775807");

        let max_age = response("max-age=60").with_header(header::AGE, age.clone());
        assert_eq!(
            secs(freshness.lifetime_at(&max_age, &timing, now)),
            Some(60)
        );

        let stale = response("max-stale=30").with_header(header::AGE, age.clone());
        assert_eq!(
            freshness.lifetime_at(&stale, &timing, now),
            TimeDelta::MAX.to_std().ok()
        );

        let expires = Response::new(StatusCode::OK)
            .with_header(
                header::EXPIRES,
                http_date_value(now + TimeDelta::seconds(60)),
            )
            .with_header(header::AGE, age);
        assert_eq!(freshness.lifetime_at(&expires, &timing, now), None);
    }
}
