//! The two pipeline entry points: a full catalog update and a similarity
//! recompute. Both are idempotent and safe to re-run after a failure.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    config::{EnrichmentSettings, SimilaritySettings},
    db::GraphStore,
    error::{AppError, AppResult, StoreError},
    services::{
        cancel::CancellationToken,
        enrichment::Enricher,
        ingest::Ingestor,
        pool::run_bounded,
        providers::Clients,
        similarity,
    },
};

/// Counters for one enrichment sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub items: usize,
    pub applied: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn GraphStore>,
    clients: Clients,
    enrichment: EnrichmentSettings,
    similarity: SimilaritySettings,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn GraphStore>,
        clients: Clients,
        enrichment: EnrichmentSettings,
        similarity: SimilaritySettings,
    ) -> Self {
        Self {
            store,
            clients,
            enrichment,
            similarity,
        }
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Ingests every catalog, then enriches every incomplete item
    pub async fn run_catalog_update(&self, cancel: &CancellationToken) -> AppResult<String> {
        let started = Utc::now();
        tracing::info!("Updating media database");

        self.store.ensure_constraints().await?;

        let ingest = Ingestor::new(
            self.store.clone(),
            self.clients.catalogs.clone(),
            self.enrichment.fetch_retry.clone(),
            self.enrichment.worker_concurrency,
        )
        .ingest_all(cancel)
        .await?;

        cancel.check()?;
        let sweep = self.sweep(cancel).await?;

        let elapsed = Utc::now() - started;
        tracing::info!(
            elapsed_secs = elapsed.num_seconds(),
            "Media database update finished"
        );

        Ok(format!(
            "Update finished: {} listed, {} created, {} items enriched ({} sources applied, {} failed)",
            ingest.listed, ingest.created, sweep.items, sweep.applied, sweep.failed
        ))
    }

    /// Runs the enrichment engine over every item missing an enabled source
    pub async fn sweep(&self, cancel: &CancellationToken) -> AppResult<SweepStats> {
        let enricher = Enricher::new(
            self.store.clone(),
            self.clients.clone(),
            self.enrichment.clone(),
        );
        let ids = self
            .store
            .incomplete_items(&enricher.enabled_sources())
            .await?;

        tracing::info!(items = ids.len(), "Enriching incomplete items");

        let results = run_bounded(ids, self.enrichment.worker_concurrency, cancel, move |id| {
            let enricher = enricher.clone();
            async move { enricher.enrich_item(&id).await }
        })
        .await;

        let mut stats = SweepStats::default();
        for result in results {
            match result {
                Ok(report) => {
                    stats.items += 1;
                    stats.applied += report.applied();
                    stats.failed += report.failed();
                }
                Err(e @ StoreError::Fatal(_)) => return Err(AppError::Store(e)),
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(error = %e, "Enrichment job abandoned");
                }
            }
        }

        cancel.check()?;
        Ok(stats)
    }

    /// Recomputes every similar edge from the current catalog
    pub async fn run_similarity_recompute(&self, cancel: &CancellationToken) -> AppResult<String> {
        tracing::info!("Finding similarities");

        let stats = similarity::recompute(self.store.as_ref(), &self.similarity, cancel).await?;

        Ok(format!(
            "Similarities calculated: {} items, {} edges",
            stats.items, stats.written
        ))
    }
}
