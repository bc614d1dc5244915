#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Notify;

use cinegraph::{
    config::{EnrichmentSettings, SimilaritySettings},
    db::InMemoryStore,
    error::{FetchError, FetchResult},
    models::{
        CatalogRecord, CatalogSource, Emotions, ItemId, MediaItem, MediaKind, Ratings, Source,
        SourceFields, SourceFlags, SourceQuery, TextFields,
    },
    services::{
        providers::{CatalogProvider, Clients, MetadataSource},
        retry::{BackoffGrowth, RetryPolicy},
        Pipeline,
    },
};

pub fn record(id: &str, kind: MediaKind, genres: &[&str]) -> CatalogRecord {
    CatalogRecord {
        id: ItemId::new(id),
        slug: format!("slug-{}", id),
        title: format!("Title {}", id),
        year: 2010,
        kind,
        origin: CatalogSource::Ororo,
        imdb_rating: 7.4,
        length: 110,
        description: Some(format!("Description of {}", id)),
        link: format!("https://ororo.tv/en/{}/slug-{}", kind.as_str(), id),
        poster: None,
        popularity: None,
        still_average_colour: None,
        genres: genres.iter().map(|g| g.to_string()).collect(),
        countries: vec!["usa".to_string()],
    }
}

pub fn item(id: &str) -> MediaItem {
    MediaItem {
        id: ItemId::new(id),
        slug: format!("slug-{}", id),
        title: format!("Title {}", id),
        year: 2010,
        kind: MediaKind::Movie,
        ratings: Ratings::default(),
        emotions: Emotions::default(),
        text: TextFields::default(),
        flags: SourceFlags::default(),
    }
}

/// Catalog serving fixed records; optionally blocks the movie listing until released
#[derive(Default)]
pub struct FakeCatalog {
    records: Vec<CatalogRecord>,
    gate: Option<Arc<Notify>>,
}

impl FakeCatalog {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        Self {
            records,
            gate: None,
        }
    }

    pub fn gated(records: Vec<CatalogRecord>, gate: Arc<Notify>) -> Self {
        Self {
            records,
            gate: Some(gate),
        }
    }
}

#[async_trait::async_trait]
impl CatalogProvider for FakeCatalog {
    fn catalog(&self) -> CatalogSource {
        CatalogSource::Ororo
    }

    async fn list(&self, kind: MediaKind) -> FetchResult<Vec<Value>> {
        if let (Some(gate), MediaKind::Movie) = (&self.gate, kind) {
            gate.notified().await;
        }
        Ok(self
            .records
            .iter()
            .filter(|r| r.kind == kind)
            .filter_map(|r| serde_json::to_value(r).ok())
            .collect())
    }

    async fn to_record(&self, raw: &Value, _kind: MediaKind) -> FetchResult<Option<CatalogRecord>> {
        Ok(serde_json::from_value(raw.clone()).ok())
    }
}

type Responder = dyn Fn(&SourceQuery) -> FetchResult<SourceFields> + Send + Sync;

/// Metadata source answering from a closure and counting calls per item
pub struct FakeSource {
    source: Source,
    respond: Box<Responder>,
    calls: Mutex<HashMap<ItemId, usize>>,
    total: AtomicUsize,
}

impl FakeSource {
    pub fn new(
        source: Source,
        respond: impl Fn(&SourceQuery) -> FetchResult<SourceFields> + Send + Sync + 'static,
    ) -> Self {
        Self {
            source,
            respond: Box::new(respond),
            calls: Mutex::new(HashMap::new()),
            total: AtomicUsize::new(0),
        }
    }

    pub fn returning(source: Source, fields: SourceFields) -> Self {
        Self::new(source, move |_| Ok(fields.clone()))
    }

    pub fn failing(source: Source, error: FetchError) -> Self {
        Self::new(source, move |_| Err(error.clone()))
    }

    pub fn calls_for(&self, id: &ItemId) -> usize {
        self.calls.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MetadataSource for FakeSource {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch(&self, query: &SourceQuery) -> FetchResult<SourceFields> {
        *self.calls.lock().unwrap().entry(query.id.clone()).or_default() += 1;
        self.total.fetch_add(1, Ordering::SeqCst);
        (self.respond)(query)
    }
}

pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(4),
        backoff_multiplier: 2.0,
        growth: BackoffGrowth::Exponential,
    }
}

pub fn enrichment_settings(sources: Vec<Source>) -> EnrichmentSettings {
    EnrichmentSettings {
        sources,
        fetch_retry: fast_retry(3),
        worker_concurrency: 4,
        ..Default::default()
    }
}

pub fn pipeline(store: Arc<InMemoryStore>, clients: Clients, sources: Vec<Source>) -> Pipeline {
    Pipeline::new(
        store,
        clients,
        enrichment_settings(sources),
        SimilaritySettings::default(),
    )
}
