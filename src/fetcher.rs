//! Page fetching: one HTTP request per call, classified into a typed outcome
//!
//! The fetcher performs exactly one attempt per call and never touches the
//! filesystem; retry policy and persistence live in the acquisition loop.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use crate::config::NetworkConfig;
use crate::error::{Error, Result};
use crate::types::FetchOutcome;

/// Source of page images, pluggable for testing
///
/// The production implementation is [`HttpPageFetcher`]; tests drive the
/// acquisition state machine with scripted implementations.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page image and classify the response.
    ///
    /// Errors are reserved for transport failures that fall outside the
    /// classified outcomes; everything the acquisition loop knows how to
    /// handle arrives as a [`FetchOutcome`].
    async fn fetch_page(&self, doc: &str, subfolder: &str, page: u32) -> Result<FetchOutcome>;
}

/// HTTP page fetcher backed by a single long-lived [`reqwest::Client`]
///
/// The client carries the session headers from [`NetworkConfig`] and reuses
/// connections across all fetches of a job.
#[derive(Debug)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPageFetcher {
    /// Build a fetcher from the network configuration.
    ///
    /// Fails with [`Error::Config`] if a configured header name or value is
    /// not valid HTTP.
    pub fn new(network: &NetworkConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &network.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::Config {
                message: format!("invalid header name '{name}': {e}"),
                key: Some("network.headers".to_string()),
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| Error::Config {
                message: format!("invalid value for header '{name}': {e}"),
                key: Some("network.headers".to_string()),
            })?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(network.request_timeout)
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            client,
            base_url: network.base_url.clone(),
        })
    }
}

#[async_trait]
impl PageSource for HttpPageFetcher {
    async fn fetch_page(&self, doc: &str, subfolder: &str, page: u32) -> Result<FetchOutcome> {
        let response = match self
            .client
            .get(&self.base_url)
            .query(&[
                ("doc", doc),
                ("format", "jpg"),
                ("subfolder", subfolder),
                ("page", &page.to_string()),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Ok(FetchOutcome::Transient {
                    reason: "connection timed out".to_string(),
                });
            }
            Err(e) if e.is_connect() => {
                return Ok(FetchOutcome::Transient {
                    reason: format!("connection error: {e}"),
                });
            }
            Err(e) => return Err(Error::Network(e)),
        };

        match response.status() {
            StatusCode::OK => {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_ascii_lowercase();

                if content_type.contains("image") {
                    // Body read failures are transport glitches, retryable
                    match response.bytes().await {
                        Ok(body) => Ok(FetchOutcome::Saved(body.to_vec())),
                        Err(e) => Ok(FetchOutcome::Transient {
                            reason: format!("failed to read response body: {e}"),
                        }),
                    }
                } else {
                    tracing::debug!(doc, page, content_type, "non-image response, end of document");
                    Ok(FetchOutcome::EndOfDocument)
                }
            }
            StatusCode::FORBIDDEN => Ok(FetchOutcome::AuthExpired),
            StatusCode::NOT_FOUND => {
                // 404 on the first page means the document does not exist;
                // on any later page it is the end-of-document signal.
                if page == 1 {
                    Ok(FetchOutcome::DocumentAbsent)
                } else {
                    Ok(FetchOutcome::EndOfDocument)
                }
            }
            status => Ok(FetchOutcome::Transient {
                reason: format!("unexpected status {status}"),
            }),
        }
    }
}
