use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::catalog::Catalog;
use crate::config::CatalogConfig;
use crate::extract::{estimate_size_from_id, extract_quant_label, repo_name};
use crate::pipeline::{Discovery, DiscoveryPlan};
use crate::providers::huggingface::{
    ApiModel, ApiModelDetail, HubClient, HubEndpoints, Sibling, KEYWORD_SEARCH_LIMIT,
};
use crate::providers::CatalogSource;

/// Headroom allowed over the available memory when filtering keyword search hits.
const SEARCH_MEMORY_MARGIN: f64 = 1.1;

/// One keyword search result as printed by `--search`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub repo: String,
    pub name: String,
    pub downloads: u64,
    pub est_size_gb: Option<f64>,
}

/// One GGUF file as printed by `--files`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RepoFile {
    pub filename: String,
    pub quant: String,
    pub size_bytes: u64,
}

fn unit_progress(units: u64) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(units), ProgressDrawTarget::stderr_with_hz(5));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} searches")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}

/// Discovers models for `publishers`, writes the catalog to `output` and
/// reports the count on stderr.
pub async fn run_discover(
    output: PathBuf,
    publishers: Vec<String>,
    total_mem_gb: f64,
    config: &CatalogConfig,
) -> Result<()> {
    let plan = DiscoveryPlan::new(publishers, total_mem_gb);
    info!(
        publishers = ?plan.publishers,
        size_tags = ?plan.size_tags,
        max_param_billions = plan.max_param_billions,
        "Starting discovery"
    );

    let client = HubClient::new(config)?;
    let endpoints = HubEndpoints::new(&config.endpoint)?;
    let discovery = Discovery::new(Arc::new(client), endpoints, config.search_limit);

    let models = discovery.run(&plan, unit_progress(plan.units() as u64)).await;
    let count = models.len();

    Catalog::new(models).write_to(&output).await?;
    info!(path = ?output, count, "Catalog written");
    eprintln!("Fetched {} models from HuggingFace", count);
    Ok(())
}

/// Keeps hits whose estimated size fits in `mem_gb` (with margin). A zero
/// `mem_gb` or an unknown size keeps the hit.
pub fn filter_search_hits(models: &[ApiModel], mem_gb: f64) -> Vec<SearchHit> {
    models
        .iter()
        .filter_map(|model| {
            let repo = model.repo_id();
            let est_size_gb = estimate_size_from_id(repo);
            if let Some(est) = est_size_gb {
                if est > 0.0 && mem_gb > 0.0 && est > mem_gb * SEARCH_MEMORY_MARGIN {
                    return None;
                }
            }
            Some(SearchHit {
                repo: repo.to_string(),
                name: repo_name(repo).to_string(),
                downloads: model.downloads,
                est_size_gb,
            })
        })
        .collect()
}

/// GGUF files of a manifest with their quantization, smallest first.
pub fn list_gguf_files(siblings: &[Sibling]) -> Vec<RepoFile> {
    let mut files: Vec<RepoFile> = siblings
        .iter()
        .filter(|s| s.rfilename.to_lowercase().ends_with(".gguf"))
        .map(|s| RepoFile {
            filename: s.rfilename.clone(),
            quant: extract_quant_label(&s.rfilename).unwrap_or_else(|| "unknown".to_string()),
            size_bytes: s.size.unwrap_or(0),
        })
        .collect();
    files.sort_by_key(|f| f.size_bytes);
    files
}

async fn search_json(
    source: &dyn CatalogSource,
    endpoints: &HubEndpoints,
    keyword: &str,
    mem_gb: f64,
) -> Result<String> {
    let url = endpoints.keyword_search_url(keyword, KEYWORD_SEARCH_LIMIT);
    let body = source
        .fetch(&url)
        .await
        .with_context(|| format!("Search request failed: {}", url))?;
    let models: Vec<ApiModel> =
        serde_json::from_slice(&body).context("Failed to parse search response")?;

    let hits = filter_search_hits(&models, mem_gb);
    info!(keyword, found = models.len(), kept = hits.len(), "Search finished");
    Ok(serde_json::to_string(&hits)?)
}

async fn files_json(
    source: &dyn CatalogSource,
    endpoints: &HubEndpoints,
    repo_id: &str,
) -> Result<String> {
    let body = source
        .fetch(&endpoints.detail_url(repo_id))
        .await
        .with_context(|| format!("Failed to fetch file list for {}", repo_id))?;
    let detail: ApiModelDetail =
        serde_json::from_slice(&body).context("Failed to parse model detail response")?;

    Ok(serde_json::to_string(&list_gguf_files(&detail.siblings))?)
}

/// `{"error": "..."}`, printed on stdout in place of a result.
fn error_json(err: &anyhow::Error) -> String {
    serde_json::json!({ "error": format!("{:#}", err) }).to_string()
}

/// Prints the result document, or the error document on failure. Failures
/// are still returned so the process exits non-zero.
fn emit(result: Result<String>) -> Result<()> {
    match result {
        Ok(json) => {
            println!("{}", json);
            Ok(())
        }
        Err(e) => {
            println!("{}", error_json(&e));
            Err(e)
        }
    }
}

/// Prints GGUF repositories matching `keyword` that fit in `mem_gb`.
pub async fn run_search(keyword: &str, mem_gb: f64, config: &CatalogConfig) -> Result<()> {
    let client = HubClient::new(config)?;
    let endpoints = HubEndpoints::new(&config.endpoint)?;
    emit(search_json(&client, &endpoints, keyword, mem_gb).await)
}

/// Prints the GGUF files of `repo_id`.
pub async fn run_files(repo_id: &str, config: &CatalogConfig) -> Result<()> {
    let client = HubClient::new(config)?;
    let endpoints = HubEndpoints::new(&config.endpoint)?;
    emit(files_json(&client, &endpoints, repo_id).await)
}
