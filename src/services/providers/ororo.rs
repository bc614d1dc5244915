/// Ororo catalog provider
///
/// Lists movies and shows with their IMDB ids, ratings, genres and countries.
use reqwest::Client as HttpClient;
use serde_json::Value;

use crate::{
    error::{FetchError, FetchResult},
    models::{
        catalog::{parse_number, unique_names},
        parse_year, CatalogRecord, CatalogSource, ItemId, MediaKind, MISSING_NUMBER,
    },
    services::providers::{
        http::{send_json, value_text},
        CatalogProvider,
    },
};

const SITE_URL: &str = "https://ororo.tv/en";

#[derive(Clone)]
pub struct OroroCatalog {
    http_client: HttpClient,
    api_url: String,
    username: String,
    password: String,
}

impl OroroCatalog {
    pub fn new(http_client: HttpClient, api_url: String, username: String, password: String) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            username,
            password,
        }
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    let names: Vec<String> = value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| value_text(Some(v))).collect())
        .unwrap_or_default();
    unique_names(names.iter().map(String::as_str))
}

/// Normalizes one listing entry; entries without an IMDB id or slug are dropped
pub(crate) fn record_from_raw(raw: &Value, kind: MediaKind) -> Option<CatalogRecord> {
    let id = value_text(raw.get("imdb_id"))?;
    let slug = value_text(raw.get("slug"))?;

    let length = parse_number(value_text(raw.get("length")).as_deref());

    Some(CatalogRecord {
        id: ItemId::new(id),
        link: format!("{}/{}/{}", SITE_URL, kind.as_str(), slug),
        title: value_text(raw.get("name")).unwrap_or_default(),
        year: parse_year(value_text(raw.get("year")).as_deref()),
        kind,
        origin: CatalogSource::Ororo,
        imdb_rating: parse_number(value_text(raw.get("imdb_rating")).as_deref()),
        length: if length < 0.0 { MISSING_NUMBER } else { length as i64 },
        description: value_text(raw.get("desc")),
        poster: value_text(raw.get("poster_thumb")),
        popularity: None,
        still_average_colour: None,
        genres: string_list(raw.get("array_genres")),
        countries: string_list(raw.get("array_countries")),
        slug,
    })
}

#[async_trait::async_trait]
impl CatalogProvider for OroroCatalog {
    fn catalog(&self) -> CatalogSource {
        CatalogSource::Ororo
    }

    async fn list(&self, kind: MediaKind) -> FetchResult<Vec<Value>> {
        let url = format!("{}/{}", self.api_url, kind.as_str());
        let request = self
            .http_client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password));

        let mut body: Value = send_json(request).await?;

        let listing = match body.get_mut(kind.as_str()).map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => match body {
                Value::Array(items) => items,
                _ => {
                    return Err(FetchError::Permanent(format!(
                        "Ororo listing for {} is not a list",
                        kind.as_str()
                    )))
                }
            },
        };

        tracing::info!(
            count = listing.len(),
            kind = kind.as_str(),
            provider = "ororo",
            "Fetched catalog listing"
        );

        Ok(listing)
    }

    async fn to_record(&self, raw: &Value, kind: MediaKind) -> FetchResult<Option<CatalogRecord>> {
        Ok(record_from_raw(raw, kind))
    }
}
