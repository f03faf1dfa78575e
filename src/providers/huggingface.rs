use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tokio::sync::Semaphore;
use url::Url;

use super::{CatalogSource, FetchError};
use crate::config::CatalogConfig;

/// Results requested by the keyword search command.
pub const KEYWORD_SEARCH_LIMIT: usize = 20;

/// Reads an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One repository in a `/api/models` search response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiModel {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// Older responses name the repository `modelId`; both can be present.
    #[serde(default, rename = "modelId")]
    pub model_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub downloads: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub likes: u64,
}

impl ApiModel {
    pub fn repo_id(&self) -> &str {
        match &self.model_id {
            Some(model_id) if self.id.is_empty() => model_id,
            _ => &self.id,
        }
    }
}

/// `/api/models/<repo>` response, reduced to the file list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiModelDetail {
    #[serde(default, deserialize_with = "null_as_default")]
    pub siblings: Vec<Sibling>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sibling {
    #[serde(default, deserialize_with = "null_as_default")]
    pub rfilename: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// URL builders for the hub's model API.
#[derive(Debug, Clone)]
pub struct HubEndpoints {
    models: Url,
}

impl HubEndpoints {
    pub fn new(endpoint: &str) -> Result<Self> {
        let mut base = endpoint.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let models = Url::parse(&base)
            .and_then(|url| url.join("api/models"))
            .with_context(|| format!("Invalid hub endpoint: {}", endpoint))?;
        Ok(Self { models })
    }

    /// Most-downloaded GGUF text-generation repos of `publisher` matching `size_tag`.
    pub fn search_url(&self, publisher: &str, size_tag: &str, limit: usize) -> String {
        let mut url = self.models.clone();
        url.query_pairs_mut()
            .append_pair("author", publisher)
            .append_pair("search", &format!("{} gguf", size_tag))
            .append_pair("sort", "downloads")
            .append_pair("direction", "-1")
            .append_pair("limit", &limit.to_string())
            .append_pair("filter", "text-generation");
        url.into()
    }

    pub fn keyword_search_url(&self, keyword: &str, limit: usize) -> String {
        let mut url = self.models.clone();
        url.query_pairs_mut()
            .append_pair("search", &format!("{} gguf", keyword))
            .append_pair("filter", "text-generation")
            .append_pair("sort", "downloads")
            .append_pair("limit", &limit.to_string());
        url.into()
    }

    pub fn detail_url(&self, repo_id: &str) -> String {
        let mut url = self.models.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(repo_id.split('/'));
        }
        url.into()
    }
}

/// HTTP access to the hub, gated by a fixed-size permit pool.
///
/// Every request holds one permit from before it connects until its body has
/// been read, so no more than `max_concurrency` requests are ever in flight
/// no matter how many tasks share the client.
#[derive(Clone)]
pub struct HubClient {
    client: Client,
    permits: Arc<Semaphore>,
}

impl HubClient {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(config.max_concurrency)),
        })
    }
}

#[async_trait]
impl CatalogSource for HubClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let _permit = self.permits.acquire().await.map_err(|_| FetchError::Closed)?;

        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = resp.bytes().await?;
        Ok(body.to_vec())
    }
}
