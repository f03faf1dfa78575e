//! Discovery: one concurrent unit per (publisher, size tag), feeding a single
//! aggregating consumer.

use indicatif::ProgressBar;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::aggregate::Aggregator;
use crate::catalog::CatalogEntry;
use crate::extract::{
    build_filename_template, derive_identifier, display_name, estimate_min_vram,
    format_popularity, is_shard, parse_param_billions, PREFERRED_QUANT,
};
use crate::providers::huggingface::{ApiModel, ApiModelDetail, HubEndpoints, Sibling};
use crate::providers::CatalogSource;

/// Extension of single-file quantized weights.
pub const WEIGHT_EXTENSION: &str = ".gguf";

/// Memory estimate used when a repository name carries no parameter count.
pub const FALLBACK_MIN_VRAM_GB: f64 = 3.0;

/// GB of memory per billion parameters at Q4_K_M.
const GB_PER_BILLION: f64 = 0.6;

/// Fixed memory overhead assumed by the parameter budget.
const OVERHEAD_GB: f64 = 1.0;

const ENTRY_CHANNEL_CAPACITY: usize = 100;

/// Size tags unlocked at each memory threshold (GB), smallest first.
const SIZE_TIERS: &[(f64, &[&str])] = &[
    (8.0, &["7b", "8b"]),
    (16.0, &["14b"]),
    (32.0, &["30b", "32b", "34b"]),
    (64.0, &["70b", "72b"]),
];

const BASE_SIZE_TAGS: &[&str] = &["1b", "3b"];

/// Size tags worth searching for a machine with `total_mem_gb` of memory.
pub fn size_tags(total_mem_gb: f64) -> Vec<&'static str> {
    let mut tags = BASE_SIZE_TAGS.to_vec();
    for (threshold, tier) in SIZE_TIERS {
        if total_mem_gb >= *threshold {
            tags.extend_from_slice(tier);
        }
    }
    tags
}

/// Largest parameter count (billions) whose Q4_K_M build fits in `total_mem_gb`.
pub fn param_budget(total_mem_gb: f64) -> f64 {
    (total_mem_gb - OVERHEAD_GB) / GB_PER_BILLION
}

/// What a discovery run searches for.
#[derive(Debug, Clone)]
pub struct DiscoveryPlan {
    pub publishers: Vec<String>,
    pub size_tags: Vec<&'static str>,
    pub max_param_billions: f64,
}

impl DiscoveryPlan {
    pub fn new(publishers: Vec<String>, total_mem_gb: f64) -> Self {
        Self {
            publishers,
            size_tags: size_tags(total_mem_gb),
            max_param_billions: param_budget(total_mem_gb),
        }
    }

    pub fn units(&self) -> usize {
        self.publishers.len() * self.size_tags.len()
    }
}

/// Names of single-file weights in a manifest, in manifest order.
///
/// Hidden files and the parts of split uploads are left out.
pub fn weight_files(siblings: &[Sibling]) -> Vec<&str> {
    siblings
        .iter()
        .map(|s| s.rfilename.as_str())
        .filter(|name| name.ends_with(WEIGHT_EXTENSION) && !name.starts_with('.'))
        .filter(|name| !is_shard(name))
        .collect()
}

/// The file that stands in for every quantization in a repository: the
/// first Q4_K_M build if there is one, otherwise the first file.
pub fn pick_representative<'a>(files: &[&'a str]) -> Option<&'a str> {
    files
        .iter()
        .find(|name| {
            name.replace('-', "_")
                .to_uppercase()
                .contains(PREFERRED_QUANT)
        })
        .or_else(|| files.first())
        .copied()
}

/// Assembles the catalog entry for `candidate` found under `publisher`.
pub fn build_entry(
    publisher: &str,
    candidate: &ApiModel,
    param_billions: f64,
    representative: &str,
) -> CatalogEntry {
    let repo_id = candidate.repo_id();
    let min_vram_gb = if param_billions > 0.0 {
        estimate_min_vram(param_billions)
    } else {
        FALLBACK_MIN_VRAM_GB
    };

    CatalogEntry {
        id: derive_identifier(repo_id),
        name: display_name(repo_id),
        repo: repo_id.to_string(),
        filename_template: build_filename_template(representative),
        min_vram_gb,
        description: format!(
            "{} downloads, {} likes on HuggingFace",
            format_popularity(candidate.downloads),
            format_popularity(candidate.likes)
        ),
        tags: vec!["dynamic".to_string(), publisher.to_lowercase()],
        downloads: candidate.downloads,
    }
}

#[derive(Clone)]
pub struct Discovery {
    source: Arc<dyn CatalogSource>,
    endpoints: HubEndpoints,
    search_limit: usize,
}

impl Discovery {
    pub fn new(source: Arc<dyn CatalogSource>, endpoints: HubEndpoints, search_limit: usize) -> Self {
        Self {
            source,
            endpoints,
            search_limit,
        }
    }

    /// Searches every unit of `plan` concurrently and returns the deduplicated
    /// entries, most downloaded first.
    ///
    /// Units that fail only shrink the result; this never errors.
    pub async fn run(&self, plan: &DiscoveryPlan, progress: ProgressBar) -> Vec<CatalogEntry> {
        let (tx, mut rx) = mpsc::channel(ENTRY_CHANNEL_CAPACITY);
        let mut handles = Vec::with_capacity(plan.units());

        for publisher in &plan.publishers {
            for size_tag in &plan.size_tags {
                let worker = self.clone();
                let tx = tx.clone();
                let progress = progress.clone();
                let publisher = publisher.clone();
                let size_tag = *size_tag;
                let budget = plan.max_param_billions;

                handles.push(tokio::spawn(async move {
                    let emitted = worker.run_unit(&publisher, size_tag, budget, &tx).await;
                    progress.inc(1);
                    emitted
                }));
            }
        }
        drop(tx);

        let mut aggregator = Aggregator::new();
        aggregator.drain(&mut rx).await;

        let mut emitted = 0;
        for result in futures::future::join_all(handles).await {
            match result {
                Ok(n) => emitted += n,
                Err(e) => warn!(error = %e, "Discovery unit did not finish"),
            }
        }
        progress.finish_and_clear();

        info!(
            units = plan.units(),
            emitted,
            unique = aggregator.len(),
            "Discovery finished"
        );
        aggregator.into_ranked()
    }

    async fn run_unit(
        &self,
        publisher: &str,
        size_tag: &str,
        max_param_billions: f64,
        tx: &mpsc::Sender<CatalogEntry>,
    ) -> usize {
        let url = self.endpoints.search_url(publisher, size_tag, self.search_limit);
        let Some(candidates) = self.fetch_json::<Vec<ApiModel>>(&url).await else {
            return 0;
        };

        let mut emitted = 0;
        for candidate in &candidates {
            let Some(entry) = self.evaluate(publisher, candidate, max_param_billions).await else {
                continue;
            };
            if tx.send(entry).await.is_err() {
                break;
            }
            emitted += 1;
        }

        debug!(
            publisher,
            size_tag,
            candidates = candidates.len(),
            emitted,
            "Unit finished"
        );
        emitted
    }

    async fn evaluate(
        &self,
        publisher: &str,
        candidate: &ApiModel,
        max_param_billions: f64,
    ) -> Option<CatalogEntry> {
        let repo_id = candidate.repo_id();
        if repo_id.is_empty() {
            return None;
        }

        let params = parse_param_billions(repo_id);
        if params > 0.0 && params > max_param_billions {
            debug!(repo = repo_id, params, max_param_billions, "Too large, skipping");
            return None;
        }

        let detail: ApiModelDetail = self
            .fetch_json(&self.endpoints.detail_url(repo_id))
            .await?;

        let files = weight_files(&detail.siblings);
        let Some(representative) = pick_representative(&files) else {
            debug!(repo = repo_id, "No single-file weights, skipping");
            return None;
        };

        Some(build_entry(publisher, candidate, params, representative))
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
        let body = match self.source.fetch(url).await {
            Ok(body) => body,
            Err(e) => {
                debug!(url, error = %e, "Fetch failed, skipping");
                return None;
            }
        };
        match serde_json::from_slice(&body) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!(url, error = %e, "Unparseable response, skipping");
                None
            }
        }
    }
}
