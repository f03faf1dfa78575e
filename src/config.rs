use anyhow::{bail, Context, Result};
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_USER_AGENT: &str = "oi-cli/1.0";
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Settings shared by every request a run makes against the hub.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL of the hub, e.g. `https://huggingface.co` or a mirror.
    pub endpoint: String,
    /// Size of the request permit pool.
    pub max_concurrency: usize,
    /// Wall-clock limit for one request, body read included.
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Results asked for per (publisher, size tag) search.
    pub search_limit: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl CatalogConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if self.max_concurrency > Semaphore::MAX_PERMITS {
            bail!(
                "concurrency must be at most {} (got {})",
                Semaphore::MAX_PERMITS,
                self.max_concurrency
            );
        }
        if self.request_timeout.is_zero() {
            bail!("request timeout must be greater than zero");
        }
        if self.search_limit == 0 {
            bail!("search limit must be at least 1");
        }
        let url = Url::parse(&self.endpoint)
            .with_context(|| format!("Invalid hub endpoint: {}", self.endpoint))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            bail!("hub endpoint must use http or https (got {})", url.scheme());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CatalogConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_concurrency, 10);
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.search_limit, 5);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = CatalogConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CatalogConfig {
            max_concurrency: usize::MAX,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CatalogConfig {
            max_concurrency: Semaphore::MAX_PERMITS,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = CatalogConfig {
            request_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CatalogConfig {
            endpoint: "ftp://mirror.example".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CatalogConfig {
            endpoint: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
