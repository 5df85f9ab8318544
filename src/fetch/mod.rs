//! Fetch Module
//!
//! The byte-fetch collaborator contract, its HTTP implementation, and the
//! registry that tracks in-flight fetches per key.

mod http;
mod registry;

use std::future::Future;

use bytes::Bytes;

use crate::error::FetchError;

pub use http::HttpFetcher;
pub use registry::{CancelOutcome, FetchRegistry, Registration, Waiter, WaiterId};

// == Byte Fetcher ==
/// Source of raw payload bytes for a key.
///
/// The returned future is dropped when every waiter of a fetch cancels, so
/// implementations cancel by being dropped and need no extra signal.
pub trait ByteFetcher<K>: Send + Sync + 'static {
    fn fetch(&self, key: &K) -> impl Future<Output = Result<Bytes, FetchError>> + Send;
}
