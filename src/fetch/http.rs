//! HTTP Fetcher
//!
//! Fetches payload bytes with reqwest, treating any non-2xx answer as a failure.

use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use super::ByteFetcher;
use crate::error::FetchError;

/// `ByteFetcher` for keys that are absolute URLs.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    // == Constructor ==
    /// Builds a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport)?;
        Ok(Self { client })
    }
}

impl<K> ByteFetcher<K> for HttpFetcher
where
    K: AsRef<str> + Send + Sync + 'static,
{
    async fn fetch(&self, key: &K) -> Result<Bytes, FetchError> {
        let url = key.as_ref();
        debug!(url, "GET");

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.bytes().await.map_err(transport)
    }
}

fn transport(err: reqwest::Error) -> FetchError {
    FetchError::Transport(err.to_string())
}
