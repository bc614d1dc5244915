//! Catalog ingestion.
//!
//! Lists every configured catalog, normalizes each raw record and merges it
//! into the graph. Items are merged by id, so re-running ingestion over the
//! same listing creates nothing new.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    db::{GraphStore, Tag},
    error::{AppError, AppResult, FetchError, StoreError, StoreResult},
    models::{CatalogRecord, MediaKind},
    services::{
        cancel::CancellationToken,
        pool::run_bounded,
        providers::CatalogProvider,
        retry::RetryPolicy,
    },
};

/// Merges one normalized record and the tags it carries
///
/// Returns whether the item node was created. Tag edges are merged either
/// way, so a record interrupted halfway is completed by the next run.
pub async fn ingest_record(store: &dyn GraphStore, record: &CatalogRecord) -> StoreResult<bool> {
    let created = store.merge_item(record).await?;

    for genre in &record.genres {
        store.link_tag(&record.id, Tag::Genre, genre).await?;
    }
    for country in &record.countries {
        store.link_tag(&record.id, Tag::Country, country).await?;
    }

    if created {
        tracing::debug!(item_id = %record.id, catalog = %record.origin, "Item created");
    }
    Ok(created)
}

#[derive(Debug)]
enum RecordOutcome {
    Created,
    Existing,
    Skipped,
    FetchFailed(FetchError),
    StoreFailed(StoreError),
}

/// Counters for one ingestion pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub listed: usize,
    pub created: usize,
    pub existing: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl IngestStats {
    fn add(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Created => self.created += 1,
            RecordOutcome::Existing => self.existing += 1,
            RecordOutcome::Skipped => self.skipped += 1,
            RecordOutcome::FetchFailed(_) | RecordOutcome::StoreFailed(_) => self.failed += 1,
        }
    }
}

pub struct Ingestor {
    store: Arc<dyn GraphStore>,
    catalogs: Vec<Arc<dyn CatalogProvider>>,
    retry: RetryPolicy,
    concurrency: usize,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn GraphStore>,
        catalogs: Vec<Arc<dyn CatalogProvider>>,
        retry: RetryPolicy,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            catalogs,
            retry,
            concurrency,
        }
    }

    /// Ingests movies and shows from every catalog
    ///
    /// A listing that cannot be fetched is logged and skipped. A fatal store
    /// error aborts the pass once in-flight records have finished.
    pub async fn ingest_all(&self, cancel: &CancellationToken) -> AppResult<IngestStats> {
        let mut stats = IngestStats::default();

        for catalog in &self.catalogs {
            for kind in [MediaKind::Movie, MediaKind::Show] {
                cancel.check()?;

                let listing = match self.list(catalog.as_ref(), kind).await {
                    Ok(listing) => listing,
                    Err(e) => {
                        tracing::error!(
                            catalog = %catalog.catalog(),
                            kind = kind.as_str(),
                            error = %e,
                            "Failed to list catalog"
                        );
                        continue;
                    }
                };
                stats.listed += listing.len();

                let outcomes = self.ingest_listing(catalog.clone(), kind, listing, cancel).await;

                let mut fatal = None;
                for outcome in &outcomes {
                    stats.add(outcome);
                    match outcome {
                        RecordOutcome::StoreFailed(e @ StoreError::Fatal(_)) => fatal = Some(e.clone()),
                        RecordOutcome::StoreFailed(e) => {
                            tracing::warn!(error = %e, "Record not stored")
                        }
                        RecordOutcome::FetchFailed(e) => {
                            tracing::warn!(error = %e, "Record could not be resolved")
                        }
                        _ => {}
                    }
                }
                if let Some(e) = fatal {
                    return Err(AppError::Store(e));
                }
            }
        }

        tracing::info!(
            listed = stats.listed,
            created = stats.created,
            existing = stats.existing,
            skipped = stats.skipped,
            failed = stats.failed,
            "Catalog ingestion finished"
        );

        Ok(stats)
    }

    async fn list(&self, catalog: &dyn CatalogProvider, kind: MediaKind) -> Result<Vec<Value>, FetchError> {
        self.retry
            .run(
                |_| catalog.list(kind),
                |attempt, e| {
                    tracing::warn!(
                        catalog = %catalog.catalog(),
                        attempt,
                        error = %e,
                        "Transient listing error, retrying"
                    )
                },
            )
            .await
    }

    async fn ingest_listing(
        &self,
        catalog: Arc<dyn CatalogProvider>,
        kind: MediaKind,
        listing: Vec<Value>,
        cancel: &CancellationToken,
    ) -> Vec<RecordOutcome> {
        let store = self.store.clone();
        let retry = self.retry.clone();

        run_bounded(listing, self.concurrency, cancel, move |raw| {
            let (catalog, store, retry) = (catalog.clone(), store.clone(), retry.clone());
            async move {
                let record = retry
                    .run(|_| catalog.to_record(&raw, kind), |_, _| {})
                    .await;

                match record {
                    Ok(Some(record)) => match ingest_record(store.as_ref(), &record).await {
                        Ok(true) => RecordOutcome::Created,
                        Ok(false) => RecordOutcome::Existing,
                        Err(e) => RecordOutcome::StoreFailed(e),
                    },
                    Ok(None) => RecordOutcome::Skipped,
                    Err(e) => RecordOutcome::FetchFailed(e),
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::InMemoryStore,
        models::{CatalogSource, ItemId},
    };

    fn record(id: &str, genres: &[&str]) -> CatalogRecord {
        CatalogRecord {
            id: ItemId::new(id),
            slug: format!("slug-{}", id),
            title: format!("Title {}", id),
            year: 1999,
            kind: MediaKind::Movie,
            origin: CatalogSource::Ororo,
            imdb_rating: 7.1,
            length: 120,
            description: Some("A description".to_string()),
            link: String::new(),
            poster: None,
            popularity: None,
            still_average_colour: None,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            countries: vec!["france".to_string()],
        }
    }

    #[tokio::test]
    async fn test_ingest_record_twice_creates_once() {
        let store = InMemoryStore::new();
        let record = record("0111161", &["drama", "crime"]);

        assert!(ingest_record(&store, &record).await.unwrap());
        assert!(!ingest_record(&store, &record).await.unwrap());

        assert_eq!(store.item_count().await, 1);
        assert_eq!(store.tag_names(Tag::Genre).await, vec!["crime", "drama"]);
        assert_eq!(store.tag_names(Tag::Country).await, vec!["france"]);
        assert_eq!(store.tag_edge_count().await, 3);
    }
}
