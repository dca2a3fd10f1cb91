//! Remote icon fetching with a hard timeout.

use reqwest::blocking::Client;
use std::fmt::Debug;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Could not build the HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to '{url}' timed out")]
    Timeout { url: String },

    #[error("Request to '{url}' failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to '{url}' returned status {status}")]
    Status { url: String, status: u16 },
}

/// Something that can download the bytes behind a URL.
///
/// The icon resolver only talks to this trait, so hosts (and tests) can swap the
/// network for anything else.
pub trait IconFetcher: Send + Sync + Debug {
    /// Downloads `url`, giving up after `timeout`.
    ///
    /// # Errors
    /// Any transport failure, a non-success status, or the timeout elapsing.
    fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP(S) fetcher.
#[derive(Debug, Default)]
pub struct HttpFetcher;

impl IconFetcher for HttpFetcher {
    fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("cmdtray/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;

        let classify = |source: reqwest::Error| {
            if source.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Request {
                    url: url.to_string(),
                    source,
                }
            }
        };

        let response = client.get(url).send().map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().map_err(classify)?;
        log::debug!("Downloaded {} bytes from '{}'", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}
