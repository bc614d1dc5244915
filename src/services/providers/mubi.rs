/// Mubi catalog provider
///
/// Mubi only lists films, page by page, and carries no IMDB ids. Ids are
/// resolved through an [`IdResolver`] from each film's title and year.
use std::sync::Arc;

use reqwest::Client as HttpClient;
use serde_json::Value;

use crate::{
    error::{FetchError, FetchResult},
    models::{parse_year, CatalogRecord, CatalogSource, MediaKind, MISSING_NUMBER},
    services::providers::{
        http::{send_json, value_text},
        CatalogProvider, IdResolver,
    },
};

/// Stops runaway paging if the API never returns an empty page
const MAX_PAGES: u32 = 10_000;

#[derive(Clone)]
pub struct MubiCatalog {
    http_client: HttpClient,
    api_url: String,
    resolver: Arc<dyn IdResolver>,
}

impl MubiCatalog {
    pub fn new(http_client: HttpClient, api_url: String, resolver: Arc<dyn IdResolver>) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            resolver,
        }
    }

    async fn page(&self, page: u32) -> FetchResult<Vec<Value>> {
        let url = format!("{}/films", self.api_url);
        let page = page.to_string();
        let request = self.http_client.get(&url).query(&[("page", page.as_str())]);

        match send_json::<Value>(request).await? {
            Value::Array(films) => Ok(films),
            Value::Null => Ok(Vec::new()),
            _ => Err(FetchError::Permanent(
                "Mubi films page is not a list".to_string(),
            )),
        }
    }
}

fn slug_from_url(url: &str) -> Option<String> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[async_trait::async_trait]
impl CatalogProvider for MubiCatalog {
    fn catalog(&self) -> CatalogSource {
        CatalogSource::Mubi
    }

    async fn list(&self, kind: MediaKind) -> FetchResult<Vec<Value>> {
        if kind == MediaKind::Show {
            return Ok(Vec::new());
        }

        let mut films = Vec::new();
        for page in 1..=MAX_PAGES {
            let batch = self.page(page).await?;
            if batch.is_empty() {
                break;
            }
            films.extend(batch);
        }

        tracing::info!(count = films.len(), provider = "mubi", "Fetched catalog listing");

        Ok(films)
    }

    async fn to_record(&self, raw: &Value, kind: MediaKind) -> FetchResult<Option<CatalogRecord>> {
        let Some(title) = value_text(raw.get("title")) else {
            return Ok(None);
        };
        let year = parse_year(value_text(raw.get("year")).as_deref());
        let link = value_text(raw.get("canonical_url")).unwrap_or_default();
        let Some(slug) = slug_from_url(&link) else {
            tracing::warn!(title = %title, provider = "mubi", "Film has no canonical url, skipping");
            return Ok(None);
        };

        let id = match self.resolver.resolve_id(&title, year).await {
            Ok(id) => id,
            Err(FetchError::Transient(e)) => return Err(FetchError::Transient(e)),
            Err(e) => {
                tracing::warn!(title = %title, error = %e, "Could not find IMDB id, skipping");
                return Ok(None);
            }
        };

        Ok(Some(CatalogRecord {
            id,
            slug,
            title,
            year,
            kind,
            origin: CatalogSource::Mubi,
            imdb_rating: MISSING_NUMBER as f64,
            length: MISSING_NUMBER,
            description: None,
            link,
            poster: value_text(raw.get("still_url")),
            popularity: raw.get("popularity").and_then(Value::as_i64),
            still_average_colour: value_text(raw.get("still_average_colour")),
            genres: Vec::new(),
            countries: Vec::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemId;
    use serde_json::json;

    struct FixedResolver(Option<&'static str>);

    #[async_trait::async_trait]
    impl IdResolver for FixedResolver {
        async fn resolve_id(&self, title: &str, _year: i64) -> FetchResult<ItemId> {
            self.0
                .map(ItemId::new)
                .ok_or_else(|| FetchError::NotFound(title.to_string()))
        }
    }

    fn catalog(resolver: FixedResolver) -> MubiCatalog {
        MubiCatalog::new(
            HttpClient::new(),
            "http://localhost:0".to_string(),
            Arc::new(resolver),
        )
    }

    #[tokio::test]
    async fn test_to_record_resolves_id_and_slug() {
        let raw = json!({
            "title": "In the Mood for Love",
            "year": 2000,
            "canonical_url": "https://mubi.com/films/in-the-mood-for-love",
            "popularity": 5120,
            "still_average_colour": "#5a2b1c",
            "still_url": "https://example.org/still.jpg"
        });

        let record = catalog(FixedResolver(Some("0118694")))
            .to_record(&raw, MediaKind::Movie)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.id.as_str(), "tt0118694");
        assert_eq!(record.slug, "in-the-mood-for-love");
        assert_eq!(record.year, 2000);
        assert_eq!(record.popularity, Some(5120));
        assert_eq!(record.origin, CatalogSource::Mubi);
        assert_eq!(record.imdb_rating, -1.0);
    }

    #[tokio::test]
    async fn test_unresolvable_film_is_skipped() {
        let raw = json!({
            "title": "Obscure Short",
            "year": 1971,
            "canonical_url": "https://mubi.com/films/obscure-short"
        });

        let record = catalog(FixedResolver(None))
            .to_record(&raw, MediaKind::Movie)
            .await
            .unwrap();

        assert!(record.is_none());
    }

    #[tokio::test]
    async fn test_shows_are_not_listed() {
        let films = catalog(FixedResolver(None))
            .list(MediaKind::Show)
            .await
            .unwrap();
        assert!(films.is_empty());
    }
}
