/// Rotten Tomatoes review provider
///
/// Movies are addressed by a path slug derived from the catalog slug. When the
/// derived slug misses, the title search endpoint is asked for the right one.
use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::{
    error::{FetchError, FetchResult},
    models::{ItemUpdate, Ratings, Source, SourceFields, SourceQuery},
    services::providers::{http::send_json, MetadataSource},
};

/// Sentinel the API uses for a rating that has not been computed
const NO_RATING: f64 = -1.0;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MovieResponse {
    rating_summary: Option<RatingSummary>,
    ratings: Option<ScoreSummary>,
    synopsis: Option<String>,
    reviews: Option<ReviewList>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RatingSummary {
    consensus: Option<String>,
    top_critics: Option<TopCritics>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TopCritics {
    average_rating: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScoreSummary {
    critics_score: Option<f64>,
    audience_score: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReviewList {
    reviews: Vec<Review>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Review {
    quote: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    movies: Vec<SearchHit>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchHit {
    url: String,
}

#[derive(Clone)]
pub struct RottenTomatoesClient {
    http_client: HttpClient,
    api_url: String,
}

impl RottenTomatoesClient {
    pub fn new(http_client: HttpClient, api_url: String) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_movie(&self, path_slug: &str) -> FetchResult<MovieResponse> {
        let url = format!("{}/v1.0/movies/{}", self.api_url, path_slug);
        send_json(self.http_client.get(&url)).await
    }

    /// Asks the search endpoint for the path slug of a title
    async fn search_slug(&self, title: &str) -> FetchResult<String> {
        let url = format!("{}/v2.0/search", self.api_url);
        let request = self
            .http_client
            .get(&url)
            .query(&[("q", title), ("type", "movies")]);

        let response: SearchResponse = send_json(request).await?;

        response
            .movies
            .first()
            .and_then(|hit| slug_from_url(&hit.url))
            .ok_or_else(|| {
                FetchError::NotFound(format!("Cannot find '{}' in Rotten Tomatoes", title))
            })
    }
}

/// Catalog slugs use dashes and keep leading articles; review slugs do not
fn path_slug(catalog_slug: &str) -> String {
    catalog_slug.replace('-', "_").replace("the_", "")
}

fn slug_from_url(url: &str) -> Option<String> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn to_source_fields(response: MovieResponse) -> SourceFields {
    let (consensus, critics_rating) = match response.rating_summary {
        Some(summary) => (
            summary.consensus.filter(|c| !c.trim().is_empty()),
            summary
                .top_critics
                .and_then(|t| t.average_rating)
                .filter(|r| *r != NO_RATING),
        ),
        None => (None, None),
    };

    let (critics_score, audience_score) = response
        .ratings
        .map(|r| (r.critics_score, r.audience_score))
        .unwrap_or_default();

    let reviews = response.reviews.map(|list| {
        list.reviews
            .into_iter()
            .filter_map(|r| r.quote)
            .filter(|q| !q.trim().is_empty())
            .collect::<Vec<_>>()
            .join(". ")
    });

    SourceFields {
        update: ItemUpdate {
            consensus,
            synopsis: response.synopsis.filter(|s| !s.trim().is_empty()),
            reviews: reviews.filter(|r| !r.is_empty()),
            ratings: Ratings {
                critics_rating,
                critics_score,
                audience_score,
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl MetadataSource for RottenTomatoesClient {
    fn source(&self) -> Source {
        Source::RottenTomatoes
    }

    async fn fetch(&self, query: &SourceQuery) -> FetchResult<SourceFields> {
        let slug = path_slug(&query.slug);

        let response = match self.get_movie(&slug).await {
            Ok(response) => response,
            Err(FetchError::Transient(e)) => return Err(FetchError::Transient(e)),
            Err(e) => {
                tracing::warn!(
                    item_id = %query.id,
                    slug = %slug,
                    error = %e,
                    "Rotten Tomatoes slug missed, falling back to title search"
                );
                let found = self.search_slug(&query.title).await?;
                self.get_movie(&found).await?
            }
        };

        Ok(to_source_fields(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> MovieResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_path_slug() {
        assert_eq!(path_slug("the-dark-knight"), "dark_knight");
        assert_eq!(path_slug("inception"), "inception");
        assert_eq!(path_slug("into-the-wild"), "into_wild");
    }

    #[test]
    fn test_slug_from_url() {
        assert_eq!(
            slug_from_url("/m/the_dark_knight").as_deref(),
            Some("the_dark_knight")
        );
        assert_eq!(slug_from_url("/m/inception/").as_deref(), Some("inception"));
        assert_eq!(slug_from_url(""), None);
    }

    #[test]
    fn test_to_source_fields() {
        let response = parse(json!({
            "ratingSummary": {
                "consensus": "Smart, innovative, and thrilling.",
                "topCritics": { "averageRating": 8.1 }
            },
            "ratings": { "critics_score": 87, "audience_score": 91 },
            "synopsis": "Dom Cobb is a skilled thief.",
            "reviews": { "reviews": [
                { "quote": "A dazzling puzzle." },
                { "author": "no quote here" },
                { "quote": "Nolan at his best." }
            ]}
        }));

        let fields = to_source_fields(response);
        let update = fields.update;

        assert_eq!(update.consensus.as_deref(), Some("Smart, innovative, and thrilling."));
        assert_eq!(update.ratings.critics_rating, Some(8.1));
        assert_eq!(update.ratings.critics_score, Some(87.0));
        assert_eq!(update.ratings.audience_score, Some(91.0));
        assert_eq!(update.synopsis.as_deref(), Some("Dom Cobb is a skilled thief."));
        assert_eq!(
            update.reviews.as_deref(),
            Some("A dazzling puzzle.. Nolan at his best.")
        );
    }

    #[test]
    fn test_uncomputed_critics_rating_is_skipped() {
        let response = parse(json!({
            "ratingSummary": { "consensus": "", "topCritics": { "averageRating": -1 } }
        }));

        let update = to_source_fields(response).update;

        assert_eq!(update.ratings.critics_rating, None);
        assert_eq!(update.consensus, None);
        assert_eq!(update.reviews, None);
    }

    #[test]
    fn test_empty_payload_is_partial_success() {
        let fields = to_source_fields(parse(json!({})));
        assert_eq!(fields, SourceFields::default());
    }
}
