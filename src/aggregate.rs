use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::catalog::CatalogEntry;

/// Collapses entries that share an identifier, keeping the most downloaded.
///
/// Owned by a single consumer task; producers reach it only through a channel,
/// so the compare-and-replace on a key never races.
#[derive(Debug, Default)]
pub struct Aggregator {
    seen: HashMap<String, CatalogEntry>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `entry`. An existing entry under the same id is replaced only
    /// when `entry` has strictly more downloads. Returns whether it was kept.
    pub fn offer(&mut self, entry: CatalogEntry) -> bool {
        if let Some(existing) = self.seen.get(&entry.id) {
            if existing.downloads >= entry.downloads {
                debug!(
                    id = %entry.id,
                    repo = %entry.repo,
                    kept = %existing.repo,
                    "Dropping duplicate with fewer downloads"
                );
                return false;
            }
        }
        self.seen.insert(entry.id.clone(), entry);
        true
    }

    /// Consumes entries until every sender has been dropped.
    pub async fn drain(&mut self, rx: &mut mpsc::Receiver<CatalogEntry>) {
        while let Some(entry) = rx.recv().await {
            self.offer(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Final entries, most downloaded first. Equal counts have no defined order.
    pub fn into_ranked(self) -> Vec<CatalogEntry> {
        let mut models: Vec<CatalogEntry> = self.seen.into_values().collect();
        models.sort_unstable_by(|a, b| b.downloads.cmp(&a.downloads));
        models
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, repo: &str, downloads: u64) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            name: id.to_string(),
            repo: repo.to_string(),
            filename_template: format!("{}-{{quant}}.gguf", id),
            min_vram_gb: 3.0,
            description: String::new(),
            tags: vec!["dynamic".to_string()],
            downloads,
        }
    }

    #[test]
    fn test_keeps_highest_downloads() {
        let mut agg = Aggregator::new();
        assert!(agg.offer(entry("qwen3-8b", "a/Qwen3-8B-GGUF", 100)));
        assert!(agg.offer(entry("qwen3-8b", "b/Qwen3-8B-GGUF", 200)));
        assert!(!agg.offer(entry("qwen3-8b", "c/Qwen3-8B-GGUF", 50)));

        let ranked = agg.into_ranked();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].downloads, 200);
        assert_eq!(ranked[0].repo, "b/Qwen3-8B-GGUF");
    }

    #[test]
    fn test_result_independent_of_first_and_last_order() {
        let mut agg = Aggregator::new();
        agg.offer(entry("qwen3-8b", "c/x", 50));
        agg.offer(entry("qwen3-8b", "b/x", 200));
        agg.offer(entry("qwen3-8b", "a/x", 100));
        assert_eq!(agg.into_ranked()[0].downloads, 200);
    }

    #[test]
    fn test_equal_downloads_keep_first_seen() {
        let mut agg = Aggregator::new();
        agg.offer(entry("m", "first/m", 10));
        assert!(!agg.offer(entry("m", "second/m", 10)));
        assert_eq!(agg.into_ranked()[0].repo, "first/m");
    }

    #[test]
    fn test_ranked_descending() {
        let mut agg = Aggregator::new();
        for (id, downloads) in [("a", 5), ("b", 500), ("c", 50), ("d", 5000)] {
            agg.offer(entry(id, id, downloads));
        }
        assert_eq!(agg.len(), 4);
        let ranked = agg.into_ranked();
        assert!(ranked.windows(2).all(|w| w[0].downloads >= w[1].downloads));
        assert_eq!(ranked[0].id, "d");
    }

    #[tokio::test]
    async fn test_drain_from_concurrent_producers() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut producers = Vec::new();
        for worker in 0..8u64 {
            let tx = tx.clone();
            producers.push(tokio::spawn(async move {
                for n in 0..25u64 {
                    let id = format!("model-{}", n % 5);
                    let _ = tx.send(entry(&id, "org/repo", worker * 100 + n)).await;
                }
            }));
        }
        drop(tx);

        let mut agg = Aggregator::new();
        agg.drain(&mut rx).await;
        for producer in producers {
            producer.await.unwrap();
        }

        let ranked = agg.into_ranked();
        assert_eq!(ranked.len(), 5);
        // worker 7 sends the largest count for every id: 700 + n
        let mut counts: Vec<u64> = ranked.iter().map(|e| e.downloads).collect();
        counts.sort_unstable();
        assert_eq!(counts, vec![720, 721, 722, 723, 724]);
    }
}
