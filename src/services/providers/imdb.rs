/// IMDB metadata provider (OMDb-compatible API)
///
/// Looks items up by IMDB id and returns plot, genres and credits. The same
/// endpoint resolves an IMDB id from a title and year, which catalogs without
/// their own IMDB ids rely on.
use reqwest::Client as HttpClient;
use serde_json::Value;

use crate::{
    error::{FetchError, FetchResult},
    models::{ItemId, ItemUpdate, Source, SourceFields, SourceQuery},
    services::providers::{
        http::{send_json, split_list, value_text},
        IdResolver, MetadataSource,
    },
};

#[derive(Clone)]
pub struct ImdbClient {
    http_client: HttpClient,
    api_url: String,
    api_key: String,
}

impl ImdbClient {
    pub fn new(http_client: HttpClient, api_url: String, api_key: String) -> Self {
        Self {
            http_client,
            api_url,
            api_key,
        }
    }

    async fn lookup(&self, params: &[(&str, &str)]) -> FetchResult<Value> {
        let url = format!("{}/", self.api_url.trim_end_matches('/'));

        let request = self
            .http_client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str()), ("plot", "full")])
            .query(params);

        let body: Value = send_json(request).await?;
        ensure_found(body)
    }
}

/// OMDb reports misses as `{"Response": "False", "Error": ...}` with status 200
fn ensure_found(body: Value) -> FetchResult<Value> {
    let response = body.get("Response").and_then(Value::as_str);
    if response.is_some_and(|r| r.eq_ignore_ascii_case("false")) {
        let error = value_text(body.get("Error")).unwrap_or_else(|| "unknown".to_string());
        if error.to_lowercase().contains("not found") {
            return Err(FetchError::NotFound(error));
        }
        if error.to_lowercase().contains("limit") {
            return Err(FetchError::Transient(error));
        }
        return Err(FetchError::Permanent(error));
    }
    Ok(body)
}

/// Converts an OMDb title payload into source fields
fn to_source_fields(body: &Value) -> SourceFields {
    let split = |key: &str| split_list(value_text(body.get(key)).as_deref());

    SourceFields {
        update: ItemUpdate {
            plot: value_text(body.get("Plot")),
            ..Default::default()
        },
        genres: split("Genre"),
        actors: split("Actors"),
        directors: split("Director"),
        categories: Vec::new(),
    }
}

#[async_trait::async_trait]
impl MetadataSource for ImdbClient {
    fn source(&self) -> Source {
        Source::Imdb
    }

    async fn fetch(&self, query: &SourceQuery) -> FetchResult<SourceFields> {
        let body = self.lookup(&[("i", query.id.as_str())]).await?;
        let fields = to_source_fields(&body);

        tracing::debug!(
            item_id = %query.id,
            genres = fields.genres.len(),
            actors = fields.actors.len(),
            provider = "imdb",
            "Fetched IMDB metadata"
        );

        Ok(fields)
    }
}

#[async_trait::async_trait]
impl IdResolver for ImdbClient {
    async fn resolve_id(&self, title: &str, year: i64) -> FetchResult<ItemId> {
        let year = year.to_string();
        let body = self.lookup(&[("t", title), ("y", year.as_str())]).await?;

        value_text(body.get("imdbID"))
            .map(ItemId::new)
            .ok_or_else(|| FetchError::NotFound(format!("No IMDB id for '{}'", title)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_source_fields() {
        let body = json!({
            "Title": "Inception",
            "Plot": "A thief who steals corporate secrets through dream-sharing.",
            "Genre": "Action, Adventure, Sci-Fi",
            "Actors": "Leonardo DiCaprio, Joseph Gordon-Levitt",
            "Director": "Christopher Nolan",
            "Response": "True"
        });

        let fields = to_source_fields(&body);

        assert_eq!(
            fields.update.plot.as_deref(),
            Some("A thief who steals corporate secrets through dream-sharing.")
        );
        assert_eq!(fields.genres, vec!["action", "adventure", "sci-fi"]);
        assert_eq!(
            fields.actors,
            vec!["leonardo dicaprio", "joseph gordon-levitt"]
        );
        assert_eq!(fields.directors, vec!["christopher nolan"]);
    }

    #[test]
    fn test_missing_fields_are_partial() {
        let body = json!({ "Plot": "N/A", "Director": "N/A", "Response": "True" });

        let fields = to_source_fields(&body);

        assert_eq!(fields.update.plot, None);
        assert!(fields.genres.is_empty());
        assert!(fields.directors.is_empty());
    }

    #[test]
    fn test_ensure_found() {
        let missing = json!({ "Response": "False", "Error": "Movie not found!" });
        assert!(matches!(ensure_found(missing), Err(FetchError::NotFound(_))));

        let limited = json!({ "Response": "False", "Error": "Request limit reached!" });
        assert!(matches!(ensure_found(limited), Err(FetchError::Transient(_))));

        let found = json!({ "Response": "True", "imdbID": "tt1375666" });
        assert!(ensure_found(found).is_ok());
    }
}
