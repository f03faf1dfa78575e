use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// One discovered model, as written to the catalog file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub repo: String,
    pub filename_template: String,
    pub min_vram_gb: f64,
    pub description: String,
    pub tags: Vec<String>,
    /// Download count; ranks and deduplicates entries but is never written out.
    #[serde(skip)]
    pub downloads: u64,
}

/// The catalog document: `{"models": [...]}`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Catalog {
    pub models: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(models: Vec<CatalogEntry>) -> Self {
        Self { models }
    }

    /// Writes the catalog as indented JSON, replacing whatever is at `path`.
    pub async fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to encode catalog JSON")?;
        fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write catalog file: {:?}", path))?;
        Ok(())
    }
}
