use neo4rs::{Graph, Row};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::{
    error::{StoreError, StoreResult},
    models::{
        CatalogRecord, Emotions, ItemId, ItemSnapshot, ItemUpdate, MediaItem, MediaKind, Ratings,
        Source, SourceFlags, TextFields,
    },
    services::retry::RetryPolicy,
};

use super::{statement, statement::Statement, Credit, GraphStore, Tag};

/// Graph store backed by a Neo4j database over Bolt
///
/// Each trait operation is one statement; transient failures of that
/// statement are retried with the configured policy.
#[derive(Clone)]
pub struct Neo4jStore {
    graph: Graph,
    retry: RetryPolicy,
}

impl Neo4jStore {
    /// Connects to the database
    pub async fn connect(
        uri: &str,
        user: &str,
        password: &str,
        retry: RetryPolicy,
    ) -> StoreResult<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(classify_error)?;

        tracing::info!(uri = %uri, "Connected to graph database");

        Ok(Self { graph, retry })
    }

    /// Runs a statement that returns nothing
    async fn run(&self, statement: &Statement) -> StoreResult<()> {
        self.retry
            .run(
                |_| {
                    let graph = &self.graph;
                    async move { graph.run(statement.to_query()).await.map_err(classify_error) }
                },
                |attempt, e| log_retry(statement, attempt, e),
            )
            .await
    }

    /// Runs a statement and collects its rows
    async fn fetch(&self, statement: &Statement) -> StoreResult<Vec<Row>> {
        self.retry
            .run(
                |_| {
                    let graph = &self.graph;
                    async move {
                        let mut stream = graph
                            .execute(statement.to_query())
                            .await
                            .map_err(classify_error)?;

                        let mut rows = Vec::new();
                        while let Some(row) = stream.next().await.map_err(classify_error)? {
                            rows.push(row);
                        }
                        Ok(rows)
                    }
                },
                |attempt, e| log_retry(statement, attempt, e),
            )
            .await
    }
}

fn log_retry(statement: &Statement, attempt: u32, error: &StoreError) {
    tracing::warn!(
        attempt,
        error = %error,
        statement = %statement.text(),
        "Transient store error, retrying statement"
    );
}

/// Maps driver errors onto the store taxonomy
///
/// Connection loss and Neo4j `TransientError` codes are retryable; anything
/// else (syntax, constraint violations, auth) is fatal.
fn classify_error(error: neo4rs::Error) -> StoreError {
    let message = error.to_string();
    let lowered = message.to_lowercase();
    let transient = lowered.contains("transienterror")
        || lowered.contains("connection")
        || lowered.contains("io error")
        || lowered.contains("timed out");

    if transient {
        StoreError::Transient(message)
    } else {
        StoreError::Fatal(message)
    }
}

fn column<T: DeserializeOwned>(row: &Row, key: &str) -> Option<T> {
    row.get::<Option<T>>(key).ok().flatten()
}

fn required<T: DeserializeOwned>(row: &Row, key: &str) -> StoreResult<T> {
    column(row, key)
        .ok_or_else(|| StoreError::Fatal(format!("Row is missing required column '{}'", key)))
}

/// Decodes the columns selected by `statement::ITEM_COLUMNS`
fn item_from_row(row: &Row) -> StoreResult<MediaItem> {
    let id: String = required(row, "id")?;
    let kind: Option<String> = column(row, "type");

    Ok(MediaItem {
        id: ItemId::new(id),
        slug: column(row, "slug").unwrap_or_default(),
        title: column(row, "name").unwrap_or_default(),
        year: column(row, "year").unwrap_or(crate::models::MISSING_NUMBER),
        kind: kind.as_deref().map(MediaKind::parse).unwrap_or(MediaKind::Movie),
        ratings: Ratings {
            imdb_rating: column(row, "imdb_rating"),
            critics_rating: column(row, "critics_rating"),
            critics_score: column(row, "critics_score"),
            audience_score: column(row, "audience_score"),
        },
        emotions: Emotions {
            joy: column(row, "joy"),
            sadness: column(row, "sadness"),
            anger: column(row, "anger"),
            fear: column(row, "fear"),
            disgust: column(row, "disgust"),
        },
        text: TextFields {
            plot: column(row, "plot"),
            description: column(row, "description"),
            synopsis: column(row, "synopsis"),
            consensus: column(row, "consensus"),
            reviews: column(row, "reviews"),
        },
        flags: SourceFlags {
            imdb: column(row, "imdb_data").unwrap_or(false),
            rotten_tomatoes: column(row, "rotten_tomatoes_data").unwrap_or(false),
            text_analysis: column(row, "ibm_data").unwrap_or(false),
        },
    })
}

#[async_trait::async_trait]
impl GraphStore for Neo4jStore {
    async fn ensure_constraints(&self) -> StoreResult<()> {
        for constraint in statement::constraints() {
            self.run(&constraint).await?;
        }
        Ok(())
    }

    async fn find_item(&self, id: &ItemId) -> StoreResult<Option<MediaItem>> {
        let rows = self.fetch(&statement::find_item(id)).await?;
        rows.first().map(item_from_row).transpose()
    }

    async fn merge_item(&self, record: &CatalogRecord) -> StoreResult<bool> {
        let token = Uuid::new_v4().to_string();
        let rows = self.fetch(&statement::merge_item(record, &token)).await?;
        Ok(rows
            .first()
            .and_then(|row| column::<bool>(row, "created"))
            .unwrap_or(false))
    }

    async fn link_tag(&self, id: &ItemId, tag: Tag, name: &str) -> StoreResult<()> {
        self.run(&statement::link_tag(id, tag, name)).await
    }

    async fn link_person(&self, id: &ItemId, credit: Credit, name: &str) -> StoreResult<()> {
        self.run(&statement::link_person(id, credit, name)).await
    }

    async fn merge_category(&self, name: &str) -> StoreResult<()> {
        self.run(&statement::merge_category(name)).await
    }

    async fn link_subcategory(&self, parent: &str, child: &str) -> StoreResult<bool> {
        let rows = self
            .fetch(&statement::link_subcategory(parent, child))
            .await?;
        Ok(rows
            .first()
            .and_then(|row| column::<i64>(row, "linked"))
            .unwrap_or(0)
            > 0)
    }

    async fn link_category(&self, id: &ItemId, name: &str, score: f64) -> StoreResult<()> {
        self.run(&statement::link_category(id, name, score)).await
    }

    async fn apply_update(
        &self,
        id: &ItemId,
        update: &ItemUpdate,
        completed: Source,
    ) -> StoreResult<()> {
        self.run(&statement::apply_update(id, update, completed))
            .await
    }

    async fn incomplete_items(&self, sources: &[Source]) -> StoreResult<Vec<ItemId>> {
        if sources.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self.fetch(&statement::incomplete_items(sources)).await?;
        rows.iter()
            .map(|row| required::<String>(row, "id").map(ItemId::new))
            .collect()
    }

    async fn snapshot(&self) -> StoreResult<Vec<ItemSnapshot>> {
        let rows = self.fetch(&statement::snapshot()).await?;
        rows.iter()
            .map(|row| {
                Ok(ItemSnapshot {
                    item: item_from_row(row)?,
                    genres: column(row, "genres").unwrap_or_default(),
                    categories: column(row, "categories").unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn clear_similar(&self) -> StoreResult<u64> {
        let rows = self.fetch(&statement::clear_similar()).await?;
        Ok(rows
            .first()
            .and_then(|row| column::<i64>(row, "removed"))
            .unwrap_or(0)
            .max(0) as u64)
    }

    async fn merge_similar(&self, a: &ItemId, b: &ItemId, weight: f64) -> StoreResult<()> {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        self.run(&statement::merge_similar(first, second, weight))
            .await
    }
}
