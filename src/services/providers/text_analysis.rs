/// Natural language understanding provider (Watson NLU-compatible API)
///
/// Sends an item's concatenated text for analysis and returns document
/// emotions plus hierarchical category labels with confidence scores.
use std::collections::BTreeMap;

use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::{FetchError, FetchResult},
    models::{Emotions, ItemUpdate, ScoredLabel, Source, SourceFields, SourceQuery},
    services::providers::{http::send_json, MetadataSource},
};

const API_VERSION: &str = "2019-07-12";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnalyzeResponse {
    categories: Vec<CategoryHit>,
    emotion: Option<EmotionResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CategoryHit {
    label: String,
    score: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EmotionResult {
    document: Option<DocumentEmotion>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DocumentEmotion {
    emotion: BTreeMap<String, f64>,
}

#[derive(Clone)]
pub struct TextAnalysisClient {
    http_client: HttpClient,
    api_url: String,
    api_key: String,
}

impl TextAnalysisClient {
    pub fn new(http_client: HttpClient, api_url: String, api_key: String) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

fn to_source_fields(response: AnalyzeResponse) -> SourceFields {
    let mut emotions = Emotions::default();
    if let Some(document) = response.emotion.and_then(|e| e.document) {
        for (name, score) in document.emotion {
            emotions.set(&name, score);
        }
    }

    let categories = response
        .categories
        .into_iter()
        .filter(|c| !c.label.trim().is_empty())
        .map(|c| ScoredLabel {
            label: c.label,
            score: c.score,
        })
        .collect();

    SourceFields {
        update: ItemUpdate {
            emotions,
            ..Default::default()
        },
        categories,
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl MetadataSource for TextAnalysisClient {
    fn source(&self) -> Source {
        Source::TextAnalysis
    }

    async fn fetch(&self, query: &SourceQuery) -> FetchResult<SourceFields> {
        let text = query
            .text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| FetchError::Permanent(format!("Item {} has no text", query.id)))?;

        let url = format!("{}/v1/analyze", self.api_url);
        let request = self
            .http_client
            .post(&url)
            .basic_auth("apikey", Some(&self.api_key))
            .query(&[("version", API_VERSION)])
            .json(&json!({
                "text": text,
                "features": { "emotion": {}, "categories": {} }
            }));

        let response: AnalyzeResponse = send_json(request).await?;
        let fields = to_source_fields(response);

        tracing::debug!(
            item_id = %query.id,
            categories = fields.categories.len(),
            provider = "text_analysis",
            "Fetched text analysis"
        );

        Ok(fields)
    }
}
