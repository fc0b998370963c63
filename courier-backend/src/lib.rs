// #![warn(missing_docs)]
//! Traits and structs for courier cache store interaction.
//!
//! If you want implement your own store, you in the right place.
//!
//! A store only moves bytes: [`Backend`] reads, writes, removes and clears
//! [`CacheValue<Raw>`](courier_core::CacheValue) entries and counts hits.
//! [`CacheBackend`] layers typed `get`/`set`/`delete` on top, serializing
//! through the store's [`format::Format`].
mod backend;
pub mod counter;
mod error;
pub mod format;

pub use backend::{Backend, BackendResult, CacheBackend};
pub use error::BackendError;
pub use format::FormatError;

/// Status of deleting result.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Record successfully deleted.
    Deleted(u32),
    /// Record already missing.
    Missing,
}
