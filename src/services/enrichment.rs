//! Per-item enrichment from external metadata sources.
//!
//! Each (item, source) pair is fetched at most once: the source's completeness
//! flag is checked before any call, and only set after everything the fetch
//! returned has been merged into the graph. A crash between the two leaves the
//! flag false, so the next run fetches again and the merges replay harmlessly.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    config::EnrichmentSettings,
    db::{Credit, GraphStore, Tag},
    error::{FetchError, StoreResult},
    models::{ItemId, MediaItem, ScoredLabel, Source, SourceFields, SourceQuery},
    services::providers::{Clients, MetadataSource},
};

/// What happened to one (item, source) pair
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    /// Flag already true, nothing was called
    AlreadyComplete,
    /// Nothing to ask the source with, or no client configured
    Skipped(String),
    /// Fields merged and flag set
    Applied,
    /// Fetch failed after retries; flag left false
    Failed(FetchError),
}

/// Outcomes for every enabled source of one item, in application order
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichReport {
    pub item_id: ItemId,
    pub outcomes: Vec<(Source, SourceOutcome)>,
}

impl EnrichReport {
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, SourceOutcome::Applied))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SourceOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&SourceOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Fetch-and-merge engine shared by every enrichment job
#[derive(Clone)]
pub struct Enricher {
    store: Arc<dyn GraphStore>,
    clients: Clients,
    settings: EnrichmentSettings,
    /// Held while a category path is linked. The cycle check and the edge
    /// merge are separate reads and writes, so two paths in opposite order
    /// could otherwise both pass it.
    category_lock: Arc<Mutex<()>>,
}

impl Enricher {
    pub fn new(store: Arc<dyn GraphStore>, clients: Clients, settings: EnrichmentSettings) -> Self {
        Self {
            store,
            clients,
            settings,
            category_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Sources this engine applies, in the fixed per-item order
    pub fn enabled_sources(&self) -> Vec<Source> {
        Source::ALL
            .into_iter()
            .filter(|s| self.settings.sources.contains(s))
            .collect()
    }

    /// Runs every enabled source for one item
    ///
    /// The item is reloaded after each applied source so later sources see
    /// text written by earlier ones. Only store errors abort the job; fetch
    /// failures are recorded per source.
    pub async fn enrich_item(&self, id: &ItemId) -> StoreResult<EnrichReport> {
        let mut report = EnrichReport {
            item_id: id.clone(),
            outcomes: Vec::new(),
        };

        let Some(mut item) = self.store.find_item(id).await? else {
            tracing::warn!(item_id = %id, "Item vanished before enrichment");
            return Ok(report);
        };

        for source in self.enabled_sources() {
            let outcome = self.enrich_source(&item, source).await?;
            if outcome == SourceOutcome::Applied {
                if let Some(fresh) = self.store.find_item(id).await? {
                    item = fresh;
                }
            }
            report.outcomes.push((source, outcome));
        }

        tracing::info!(
            item_id = %id,
            applied = report.applied(),
            failed = report.failed(),
            "Item enrichment finished"
        );

        Ok(report)
    }

    /// Fetches and merges a single source for an item
    pub async fn enrich_source(&self, item: &MediaItem, source: Source) -> StoreResult<SourceOutcome> {
        if item.flags.get(source) {
            tracing::debug!(item_id = %item.id, source = %source, "Source already complete");
            return Ok(SourceOutcome::AlreadyComplete);
        }

        let Some(client) = self.clients.source(source) else {
            return Ok(SourceOutcome::Skipped("no client configured".to_string()));
        };

        let query = SourceQuery::for_item(item);
        if source == Source::TextAnalysis && query.text.is_none() {
            tracing::info!(item_id = %item.id, "Item has no text, skipping analysis");
            return Ok(SourceOutcome::Skipped("no text".to_string()));
        }

        let fields = match self.fetch(client.as_ref(), &query).await {
            Ok(fields) => fields,
            Err(e) => {
                tracing::warn!(
                    item_id = %item.id,
                    source = %source,
                    error = %e,
                    "Fetch failed, flag left unset"
                );
                return Ok(SourceOutcome::Failed(e));
            }
        };

        self.merge(&item.id, source, &fields).await?;
        Ok(SourceOutcome::Applied)
    }

    async fn fetch(&self, client: &dyn MetadataSource, query: &SourceQuery) -> Result<SourceFields, FetchError> {
        let source = client.source();
        self.settings
            .fetch_retry
            .run(
                |_| client.fetch(query),
                |attempt, e| {
                    tracing::warn!(
                        item_id = %query.id,
                        source = %source,
                        attempt,
                        error = %e,
                        "Transient fetch error, retrying"
                    );
                },
            )
            .await
    }

    /// Merges entities first, then scalar fields together with the flag
    async fn merge(&self, id: &ItemId, source: Source, fields: &SourceFields) -> StoreResult<()> {
        for genre in &fields.genres {
            self.store.link_tag(id, Tag::Genre, genre).await?;
        }
        for actor in &fields.actors {
            self.store.link_person(id, Credit::Actor, actor).await?;
        }
        for director in &fields.directors {
            self.store.link_person(id, Credit::Director, director).await?;
        }
        for label in fields
            .categories
            .iter()
            .filter(|l| l.score > self.settings.category_min_score)
        {
            self.merge_category_path(id, label).await?;
        }

        self.store.apply_update(id, &fields.update, source).await?;

        tracing::debug!(item_id = %id, source = %source, "Source fields merged");
        Ok(())
    }

    /// Every segment becomes a node, consecutive segments a parent → child
    /// edge. Only the leaf is linked to the item, and never the root alone.
    async fn merge_category_path(&self, id: &ItemId, label: &ScoredLabel) -> StoreResult<()> {
        let segments = label.segments();
        match segments.as_slice() {
            [] => return Ok(()),
            [only] => return self.store.merge_category(only).await,
            _ => {}
        }

        let _linking = self.category_lock.lock().await;
        for pair in segments.windows(2) {
            let linked = self.store.link_subcategory(&pair[0], &pair[1]).await?;
            if !linked {
                tracing::warn!(
                    parent = %pair[0],
                    child = %pair[1],
                    "Category edge refused, it would close a cycle"
                );
            }
        }

        if let Some(leaf) = segments.last() {
            self.store.link_category(id, leaf, label.score).await?;
        }
        Ok(())
    }
}
