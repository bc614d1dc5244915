/// External data provider abstraction
///
/// Two kinds of providers feed the graph: catalog providers list the media
/// items that exist, and metadata sources fill in details for one item at a
/// time. Each is a trait so the pipeline can be driven by fake clients in
/// tests and by the HTTP clients below in production.
use std::sync::Arc;

use crate::{
    config::Config,
    error::{AppError, AppResult, FetchResult},
    models::{CatalogRecord, CatalogSource, ItemId, MediaKind, Source, SourceFields, SourceQuery},
};

pub mod http;
pub mod imdb;
pub mod mubi;
pub mod ororo;
pub mod rotten_tomatoes;
pub mod text_analysis;

/// A metadata source owning one completeness flag
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataSource: Send + Sync {
    /// Which flag a successful fetch completes
    fn source(&self) -> Source;

    /// Fetches everything the source knows about the queried item
    ///
    /// Fields missing from the response are left empty rather than failing
    /// the whole fetch.
    async fn fetch(&self, query: &SourceQuery) -> FetchResult<SourceFields>;
}

/// A primary catalog listing media items
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    fn catalog(&self) -> CatalogSource;

    /// Lists raw records of the given kind
    async fn list(&self, kind: MediaKind) -> FetchResult<Vec<serde_json::Value>>;

    /// Turns one raw record into a normalized catalog record
    ///
    /// Returns `Ok(None)` when the record cannot be identified.
    async fn to_record(
        &self,
        raw: &serde_json::Value,
        kind: MediaKind,
    ) -> FetchResult<Option<CatalogRecord>>;
}

/// Resolves a canonical item id from a title and release year
#[async_trait::async_trait]
pub trait IdResolver: Send + Sync {
    async fn resolve_id(&self, title: &str, year: i64) -> FetchResult<ItemId>;
}

/// The set of clients a pipeline run works with, built once at startup
#[derive(Clone, Default)]
pub struct Clients {
    pub catalogs: Vec<Arc<dyn CatalogProvider>>,
    pub sources: Vec<Arc<dyn MetadataSource>>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogProvider>) -> Self {
        self.catalogs.push(catalog);
        self
    }

    pub fn with_source(mut self, source: Arc<dyn MetadataSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Client for `source`, if one was configured
    pub fn source(&self, source: Source) -> Option<Arc<dyn MetadataSource>> {
        self.sources.iter().find(|s| s.source() == source).cloned()
    }

    /// Builds the HTTP clients for every configured catalog and source
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let settings = config.enrichment_settings()?;
        let http = http::build_client(config.http_timeout())
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let imdb = Arc::new(imdb::ImdbClient::new(
            http.clone(),
            config.imdb_url.clone(),
            config.imdb_api_key.clone(),
        ));

        let mut clients = Clients::new();
        for catalog in settings.catalog_sources {
            clients = match catalog {
                CatalogSource::Ororo => clients.with_catalog(Arc::new(ororo::OroroCatalog::new(
                    http.clone(),
                    config.ororo_url.clone(),
                    config.ororo_username.clone(),
                    config.ororo_password.clone(),
                ))),
                CatalogSource::Mubi => clients.with_catalog(Arc::new(mubi::MubiCatalog::new(
                    http.clone(),
                    config.mubi_url.clone(),
                    imdb.clone(),
                ))),
            };
        }

        for source in settings.sources {
            clients = match source {
                Source::Imdb => clients.with_source(imdb.clone()),
                Source::RottenTomatoes => clients.with_source(Arc::new(
                    rotten_tomatoes::RottenTomatoesClient::new(
                        http.clone(),
                        config.rotten_tomatoes_url.clone(),
                    ),
                )),
                Source::TextAnalysis => clients.with_source(Arc::new(
                    text_analysis::TextAnalysisClient::new(
                        http.clone(),
                        config.text_analysis_url.clone(),
                        config.text_analysis_api_key.clone(),
                    ),
                )),
            };
        }

        tracing::info!(
            catalogs = clients.catalogs.len(),
            sources = clients.sources.len(),
            "Provider clients built"
        );

        Ok(clients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_lookup_by_flag() {
        let mut imdb = MockMetadataSource::new();
        imdb.expect_source().return_const(Source::Imdb);

        let clients = Clients::new().with_source(Arc::new(imdb));

        assert!(clients.source(Source::Imdb).is_some());
        assert!(clients.source(Source::TextAnalysis).is_none());
    }
}
