use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::{CatalogSource, Source};
use crate::services::retry::{BackoffGrowth, RetryPolicy};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Bolt address of the graph database
    #[serde(default = "default_neo4j_uri")]
    pub neo4j_uri: String,

    #[serde(default = "default_neo4j_user")]
    pub neo4j_user: String,

    #[serde(default)]
    pub neo4j_password: String,

    #[serde(default = "default_ororo_url")]
    pub ororo_url: String,

    #[serde(default)]
    pub ororo_username: String,

    #[serde(default)]
    pub ororo_password: String,

    #[serde(default = "default_mubi_url")]
    pub mubi_url: String,

    /// OMDb-compatible endpoint used for IMDB metadata
    #[serde(default = "default_imdb_url")]
    pub imdb_url: String,

    #[serde(default)]
    pub imdb_api_key: String,

    #[serde(default = "default_rotten_tomatoes_url")]
    pub rotten_tomatoes_url: String,

    /// Natural language understanding endpoint used for emotions and categories
    #[serde(default = "default_text_analysis_url")]
    pub text_analysis_url: String,

    #[serde(default)]
    pub text_analysis_api_key: String,

    /// Catalog sources listed by a full update, comma separated
    #[serde(default = "default_catalog_sources")]
    pub catalog_sources: Vec<String>,

    /// Enrichment sources applied to every item, comma separated
    #[serde(default = "default_enrich_sources")]
    pub enrich_sources: Vec<String>,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_fetch_max_attempts")]
    pub fetch_max_attempts: u32,

    #[serde(default = "default_fetch_backoff_ms")]
    pub fetch_backoff_ms: u64,

    #[serde(default = "default_fetch_backoff_max_ms")]
    pub fetch_backoff_max_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    #[serde(default = "default_store_max_attempts")]
    pub store_max_attempts: u32,

    #[serde(default = "default_store_backoff_ms")]
    pub store_backoff_ms: u64,

    /// Upper bound on concurrently running ingestion/enrichment jobs
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Category labels at or below this confidence are ignored
    #[serde(default = "default_category_min_score")]
    pub category_min_score: f64,

    #[serde(default = "default_lsi_rank")]
    pub lsi_rank: usize,

    #[serde(default = "default_text_weight")]
    pub text_weight: f64,

    #[serde(default = "default_correlation_weight")]
    pub correlation_weight: f64,

    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    #[serde(default = "default_max_neighbours")]
    pub max_neighbours: usize,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_neo4j_uri() -> String {
    "127.0.0.1:7687".to_string()
}

fn default_neo4j_user() -> String {
    "neo4j".to_string()
}

fn default_ororo_url() -> String {
    "https://front.ororo.tv/api/v2".to_string()
}

fn default_mubi_url() -> String {
    "https://mubi.com/services/api".to_string()
}

fn default_imdb_url() -> String {
    "https://www.omdbapi.com".to_string()
}

fn default_rotten_tomatoes_url() -> String {
    "https://www.rottentomatoes.com/api/private".to_string()
}

fn default_text_analysis_url() -> String {
    "https://api.us-south.natural-language-understanding.watson.cloud.ibm.com".to_string()
}

fn default_catalog_sources() -> Vec<String> {
    vec!["ororo".to_string()]
}

fn default_enrich_sources() -> Vec<String> {
    Source::ALL.iter().map(|s| s.as_str().to_string()).collect()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_fetch_max_attempts() -> u32 {
    3
}

fn default_fetch_backoff_ms() -> u64 {
    1_000
}

fn default_fetch_backoff_max_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_store_max_attempts() -> u32 {
    4
}

fn default_store_backoff_ms() -> u64 {
    5_000
}

fn default_worker_concurrency() -> usize {
    8
}

fn default_category_min_score() -> f64 {
    0.75
}

fn default_lsi_rank() -> usize {
    500
}

fn default_text_weight() -> f64 {
    0.25
}

fn default_correlation_weight() -> f64 {
    0.75
}

fn default_similarity_threshold() -> f64 {
    0.25
}

fn default_max_neighbours() -> usize {
    10
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Settings consumed by ingestion and the enrichment engine
#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    pub catalog_sources: Vec<CatalogSource>,
    pub sources: Vec<Source>,
    pub fetch_retry: RetryPolicy,
    pub category_min_score: f64,
    pub worker_concurrency: usize,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            catalog_sources: vec![CatalogSource::Ororo],
            sources: Source::ALL.to_vec(),
            fetch_retry: RetryPolicy::default(),
            category_min_score: default_category_min_score(),
            worker_concurrency: default_worker_concurrency(),
        }
    }
}

/// Settings consumed by the similarity run
#[derive(Debug, Clone, PartialEq)]
pub struct SimilaritySettings {
    pub lsi_rank: usize,
    pub text_weight: f64,
    pub correlation_weight: f64,
    pub threshold: f64,
    pub max_neighbours: usize,
}

impl Default for SimilaritySettings {
    fn default() -> Self {
        Self {
            lsi_rank: default_lsi_rank(),
            text_weight: default_text_weight(),
            correlation_weight: default_correlation_weight(),
            threshold: default_similarity_threshold(),
            max_neighbours: default_max_neighbours(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the pipeline cannot run with
    pub fn validate(&self) -> AppResult<()> {
        if (self.text_weight + self.correlation_weight - 1.0).abs() > 1e-6 {
            return Err(AppError::Config(format!(
                "text_weight ({}) and correlation_weight ({}) must sum to 1",
                self.text_weight, self.correlation_weight
            )));
        }
        if self.fetch_max_attempts == 0 || self.store_max_attempts == 0 {
            return Err(AppError::Config(
                "attempt counts must be at least 1".to_string(),
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier <= 1.0 {
            return Err(AppError::Config(format!(
                "backoff_multiplier ({}) must be greater than 1",
                self.backoff_multiplier
            )));
        }
        if self.fetch_backoff_ms == 0 || self.fetch_backoff_max_ms < self.fetch_backoff_ms {
            return Err(AppError::Config(format!(
                "fetch_backoff_ms ({}) must be positive and at most fetch_backoff_max_ms ({})",
                self.fetch_backoff_ms, self.fetch_backoff_max_ms
            )));
        }
        if self.store_backoff_ms == 0 {
            return Err(AppError::Config(
                "store_backoff_ms must be positive".to_string(),
            ));
        }
        if self.worker_concurrency == 0 {
            return Err(AppError::Config(
                "worker_concurrency must be at least 1".to_string(),
            ));
        }
        if self.lsi_rank == 0 {
            return Err(AppError::Config("lsi_rank must be at least 1".to_string()));
        }
        self.enrichment_settings()?;
        Ok(())
    }

    pub fn enrichment_settings(&self) -> AppResult<EnrichmentSettings> {
        let catalog_sources = parse_names::<CatalogSource>(&self.catalog_sources)?;
        let sources = parse_names::<Source>(&self.enrich_sources)?;

        Ok(EnrichmentSettings {
            catalog_sources,
            sources,
            fetch_retry: self.fetch_retry_policy(),
            category_min_score: self.category_min_score,
            worker_concurrency: self.worker_concurrency,
        })
    }

    pub fn similarity_settings(&self) -> SimilaritySettings {
        SimilaritySettings {
            lsi_rank: self.lsi_rank,
            text_weight: self.text_weight,
            correlation_weight: self.correlation_weight,
            threshold: self.similarity_threshold,
            max_neighbours: self.max_neighbours,
        }
    }

    pub fn fetch_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.fetch_max_attempts,
            initial_backoff: Duration::from_millis(self.fetch_backoff_ms),
            max_backoff: Duration::from_millis(self.fetch_backoff_max_ms),
            backoff_multiplier: self.backoff_multiplier,
            growth: BackoffGrowth::Exponential,
        }
    }

    /// Linear policy matching the store's historical `attempt * base` wait
    pub fn store_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.store_max_attempts,
            initial_backoff: Duration::from_millis(self.store_backoff_ms),
            max_backoff: Duration::from_millis(self.store_backoff_ms * u64::from(self.store_max_attempts)),
            backoff_multiplier: 1.0,
            growth: BackoffGrowth::Linear,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn parse_names<T>(names: &[String]) -> AppResult<Vec<T>>
where
    T: FromStr<Err = AppError> + PartialEq,
{
    let mut parsed = Vec::new();
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let value = name.parse::<T>()?;
        if !parsed.contains(&value) {
            parsed.push(value);
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()));
        envy::from_iter::<_, Config>(vars).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);

        assert_eq!(config.fetch_max_attempts, 3);
        assert_eq!(config.lsi_rank, 500);
        assert_eq!(config.max_neighbours, 10);
        assert_eq!(config.category_min_score, 0.75);
        assert_eq!(config.similarity_threshold, 0.25);
        assert!(config.validate().is_ok());

        let settings = config.enrichment_settings().unwrap();
        assert_eq!(settings.sources, Source::ALL.to_vec());
        assert_eq!(settings.catalog_sources, vec![CatalogSource::Ororo]);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let config = config_from(&[("TEXT_WEIGHT", "0.5"), ("CORRELATION_WEIGHT", "0.75")]);
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        let config = config_from(&[("TEXT_WEIGHT", "0.75"), ("CORRELATION_WEIGHT", "0.25")]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_source_lists_parse_and_dedupe() {
        let config = config_from(&[
            ("ENRICH_SOURCES", "imdb, imdb,text_analysis"),
            ("CATALOG_SOURCES", "ororo,mubi"),
        ]);
        let settings = config.enrichment_settings().unwrap();

        assert_eq!(settings.sources, vec![Source::Imdb, Source::TextAnalysis]);
        assert_eq!(
            settings.catalog_sources,
            vec![CatalogSource::Ororo, CatalogSource::Mubi]
        );
    }

    #[test]
    fn test_unknown_source_rejected() {
        let config = config_from(&[("ENRICH_SOURCES", "imdb,letterboxd")]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_increasing_backoff() {
        for multiplier in ["0.5", "1.0", "-2", "NaN"] {
            let config = config_from(&[("BACKOFF_MULTIPLIER", multiplier)]);
            assert!(
                matches!(config.validate(), Err(AppError::Config(_))),
                "multiplier {} accepted",
                multiplier
            );
        }

        let config = config_from(&[("FETCH_BACKOFF_MS", "2000"), ("FETCH_BACKOFF_MAX_MS", "500")]);
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        let config = config_from(&[("BACKOFF_MULTIPLIER", "1.5")]);
        assert!(config.validate().is_ok());
        let policy = config.fetch_retry_policy();
        assert!(policy.delay_for(1) < policy.delay_for(2));
        assert!(policy.delay_for(2) < policy.delay_for(3));
    }

    #[test]
    fn test_store_policy_is_linear() {
        let config = config_from(&[("STORE_BACKOFF_MS", "5000"), ("STORE_MAX_ATTEMPTS", "4")]);
        let policy = config.store_retry_policy();

        assert_eq!(policy.delay_for(1), Duration::from_millis(5_000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(10_000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(15_000));
    }
}
