pub mod huggingface;

use async_trait::async_trait;
use thiserror::Error;

/// Why a single catalog request produced no payload.
///
/// None of these are fatal to a discovery run; the affected item is skipped.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request permit pool closed")]
    Closed,
    #[error("request timed out")]
    Timeout,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Network(err)
        }
    }
}

/// Something that can turn a catalog URL into raw response bytes.
///
/// The HTTP implementation is [`huggingface::HubClient`]; tests substitute
/// an in-memory table.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
