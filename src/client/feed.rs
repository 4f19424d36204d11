//! Building feed sources.
//!
//! The poll loop talks to the relay through [`FeedSource`], so it can be
//! driven by the real HTTP endpoint or by an in-memory script.

use super::resolver::BuildingFeedResponse;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Feed request errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The request was cancelled because a newer one superseded it
    Cancelled,
    /// Transport failure (connection refused, reset, ...)
    Network(String),
    /// The relay answered with a non-success status
    Status { status: u16, body: String },
    /// The body was not a building feed payload
    Decode(String),
}

impl FeedError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FeedError::Cancelled)
    }
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::Cancelled => write!(f, "Request cancelled"),
            FeedError::Network(msg) => write!(f, "Network error: {msg}"),
            FeedError::Status { status, body } => {
                write!(f, "Failed to fetch building feed ({status}): {body}")
            }
            FeedError::Decode(msg) => write!(f, "Invalid building feed payload: {msg}"),
        }
    }
}

impl std::error::Error for FeedError {}

/// Something that can fetch the current building feed.
///
/// Implementations must stop and return [`FeedError::Cancelled`] once
/// `cancel` fires, and must not report any other outcome after that.
pub trait FeedSource: Send + Sync + 'static {
    fn fetch(
        &self,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<BuildingFeedResponse, FeedError>> + Send;
}

/// Feed client for the relay's `GET /api/building`.
#[cfg(feature = "client")]
pub struct HttpFeed {
    client: reqwest::Client,
    endpoint: String,
}

#[cfg(feature = "client")]
impl HttpFeed {
    /// Create a client for a full feed URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Create a client for the feed described by a client configuration.
    pub fn from_config(config: &crate::config::ClientConfig) -> Self {
        Self::new(config.feed_endpoint())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self) -> Result<BuildingFeedResponse, FeedError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FeedError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<BuildingFeedResponse>()
            .await
            .map_err(|e| FeedError::Decode(e.to_string()))
    }
}

#[cfg(feature = "client")]
impl FeedSource for HttpFeed {
    fn fetch(
        &self,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<BuildingFeedResponse, FeedError>> + Send {
        async move {
            // Dropping the request future aborts the underlying connection.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(FeedError::Cancelled),
                result = self.request() => result,
            }
        }
    }
}
