/// Batch worker engine for maintenance sweeps.
///
/// A sweep partitions a list's items into consecutive chunks, fans out each
/// chunk with bounded concurrency, and paces between chunks to bound the
/// outbound request rate against third-party hosts. Items fail
/// independently: a probe failure is counted and the item's prior fields are
/// retained, never aborting the chunk or the sweep. After all chunks the
/// updated collection is written back in a single whole-collection replace,
/// followed by an event publish and a cache invalidation.
///
/// Re-running a sweep is always safe: it only overwrites health/metadata
/// fields with freshly observed values and never touches counters or
/// ordering.

use crate::probe::{classify, Prober};
use futures::future::join_all;
use ldeck_bus::{channel_update, CacheClient, EventBus};
use ldeck_core::config::SweepConfig;
use ldeck_core::{
    Envelope, HealthState, HealthSweepSummary, MetadataRefreshSummary, Result,
};
use ldeck_store::MutationCoordinator;
use regex::Regex;
use serde_json::json;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct SweepEngine {
    coordinator: Arc<MutationCoordinator>,
    bus: Arc<EventBus>,
    cache: Arc<CacheClient>,
    prober: Arc<dyn Prober>,
    config: SweepConfig,
}

impl SweepEngine {
    pub fn new(
        coordinator: Arc<MutationCoordinator>,
        bus: Arc<EventBus>,
        cache: Arc<CacheClient>,
        prober: Arc<dyn Prober>,
        config: SweepConfig,
    ) -> Self {
        Self {
            coordinator,
            bus,
            cache,
            prober,
            config,
        }
    }

    /// Probe every item in the list and reclassify its health.
    pub async fn run_health_sweep(
        &self,
        list_id: &str,
        concurrency: usize,
    ) -> Result<HealthSweepSummary> {
        let start = Instant::now();
        let list = self.coordinator.get(list_id)?;
        if list.urls.is_empty() {
            debug!(list_id, "health sweep on empty list, nothing to probe");
            return Ok(HealthSweepSummary {
                duration_ms: start.elapsed().as_millis() as u64,
                ..Default::default()
            });
        }

        let mut urls = list.urls.clone();
        let mut summary = HealthSweepSummary::default();
        let chunk_size = concurrency.clamp(1, 16);
        let chunk_count = urls.len().div_ceil(chunk_size);

        for (chunk_index, chunk) in (0..urls.len())
            .collect::<Vec<_>>()
            .chunks(chunk_size)
            .enumerate()
        {
            let probes = chunk.iter().map(|&idx| {
                let prober = self.prober.clone();
                let url = urls[idx].url.clone();
                async move { (idx, prober.probe(&url).await) }
            });

            for (idx, outcome) in join_all(probes).await {
                let (state, detail) = classify(&outcome, &self.config);
                urls[idx].set_health(state, detail);
                summary.checked += 1;
                match state {
                    HealthState::Healthy => summary.healthy += 1,
                    HealthState::Warning => summary.warning += 1,
                    HealthState::Broken => summary.broken += 1,
                    HealthState::Unknown => {}
                }
            }

            // Pace between chunks, not after the last one
            if chunk_index + 1 < chunk_count {
                tokio::time::sleep(self.config.pacing).await;
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        self.finish(list_id, &list.slug, urls, "health_sweep", json!(summary))?;
        info!(
            list_id,
            checked = summary.checked,
            healthy = summary.healthy,
            warning = summary.warning,
            broken = summary.broken,
            "health sweep complete"
        );
        Ok(summary)
    }

    /// Re-fetch each item's page and refresh its title and description.
    pub async fn run_metadata_refresh(
        &self,
        list_id: &str,
        concurrency: usize,
    ) -> Result<MetadataRefreshSummary> {
        let start = Instant::now();
        let list = self.coordinator.get(list_id)?;
        if list.urls.is_empty() {
            debug!(list_id, "metadata refresh on empty list, nothing to fetch");
            return Ok(MetadataRefreshSummary {
                duration_ms: start.elapsed().as_millis() as u64,
                ..Default::default()
            });
        }

        let mut urls = list.urls.clone();
        let mut summary = MetadataRefreshSummary::default();
        let chunk_size = concurrency.clamp(1, 16);
        let chunk_count = urls.len().div_ceil(chunk_size);

        for (chunk_index, chunk) in (0..urls.len())
            .collect::<Vec<_>>()
            .chunks(chunk_size)
            .enumerate()
        {
            let fetches = chunk.iter().map(|&idx| {
                let prober = self.prober.clone();
                let url = urls[idx].url.clone();
                async move { (idx, prober.fetch_page(&url).await) }
            });

            for (idx, outcome) in join_all(fetches).await {
                summary.refreshed += 1;
                match outcome.body.as_deref().and_then(extract_title) {
                    Some(title) => {
                        let item = &mut urls[idx];
                        item.title = title;
                        if let Some(description) =
                            outcome.body.as_deref().and_then(extract_description)
                        {
                            item.description = description;
                        }
                        item.updated_at = chrono::Utc::now();
                        summary.succeeded += 1;
                    }
                    None => {
                        // Fetch failed or page had no usable metadata; keep
                        // whatever we had before
                        match outcome.probe_error() {
                            Some(err) => warn!(
                                url = %urls[idx].url,
                                error = %err,
                                "metadata refresh failed for item"
                            ),
                            None => warn!(
                                url = %urls[idx].url,
                                status = ?outcome.status,
                                "page had no usable metadata"
                            ),
                        }
                        summary.failed += 1;
                    }
                }
            }

            if chunk_index + 1 < chunk_count {
                tokio::time::sleep(self.config.pacing).await;
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        self.finish(list_id, &list.slug, urls, "metadata_refresh", json!(summary))?;
        info!(
            list_id,
            refreshed = summary.refreshed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "metadata refresh complete"
        );
        Ok(summary)
    }

    /// Shared sweep epilogue: one whole-collection write-back, one publish,
    /// one cache invalidation.
    fn finish(
        &self,
        list_id: &str,
        slug: &str,
        urls: Vec<ldeck_core::UrlItem>,
        action: &str,
        summary: serde_json::Value,
    ) -> Result<()> {
        self.coordinator.replace_urls(list_id, urls)?;
        let envelope =
            Envelope::new("list_update", list_id, action).with_field("summary", summary);
        self.bus.publish(&channel_update(list_id), &envelope);
        self.cache.invalidate_list(list_id, slug);
        Ok(())
    }
}

static TITLE_RE: OnceLock<Regex> = OnceLock::new();
static DESCRIPTION_RE: OnceLock<Regex> = OnceLock::new();

/// Pull the `<title>` text out of an HTML page head.
pub fn extract_title(html: &str) -> Option<String> {
    let re = TITLE_RE.get_or_init(|| {
        Regex::new(r"(?is)<title[^>]*>\s*(.*?)\s*</title>").expect("title regex")
    });
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Pull the meta description content out of an HTML page head.
pub fn extract_description(html: &str) -> Option<String> {
    let re = DESCRIPTION_RE.get_or_init(|| {
        Regex::new(r#"(?is)<meta[^>]+name=["']description["'][^>]*content=["']([^"']*)["']"#)
            .expect("description regex")
    });
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|d| !d.is_empty())
}
