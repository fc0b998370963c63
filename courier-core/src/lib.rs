#![warn(missing_docs)]
//! # courier-core
//!
//! Core types shared by every courier crate.
//!
//! This crate holds the data carriers and the pure pieces of the caching
//! pipeline, without any I/O:
//!
//! - **Carry** HTTP messages ([`Request`], [`Response`])
//! - **Address** cached entries ([`CacheKey`], [`KeyGenerator`], [`DigestKeyGenerator`])
//! - **Wrap** stored data with its expiry ([`CacheValue`])
//! - **Report** how a response was served ([`CacheStatus`])
//!
//! Storage lives in `courier-backend`, orchestration in `courier`.

pub mod key;
pub mod request;
pub mod response;
pub mod status;
pub mod value;

pub use key::{CacheKey, DigestKeyGenerator, KeyGenerator};
pub use request::Request;
pub use response::Response;
pub use status::{CacheStatus, DEFAULT_CACHE_HITS_HEADER, DEFAULT_CACHE_STATUS_HEADER};
#[doc(hidden)]
pub use smol_str::SmolStr;
pub use value::{CacheMeta, CacheValue};

/// Raw byte data type used for serialized cache values.
/// Using `Bytes` provides efficient zero-copy cloning via reference counting.
pub type Raw = bytes::Bytes;
