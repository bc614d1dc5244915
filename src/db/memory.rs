use std::collections::{BTreeMap, BTreeSet};

use tokio::sync::RwLock;

use crate::{
    error::{StoreError, StoreResult},
    models::{
        CatalogRecord, Emotions, ItemId, ItemSnapshot, ItemUpdate, MediaItem, Ratings, Source,
        SourceFlags, TextFields,
    },
};

use super::{Credit, GraphStore, Tag};

/// Graph state held by `InMemoryStore`
#[derive(Debug, Default)]
struct MemoryGraph {
    items: BTreeMap<ItemId, MediaItem>,
    tags: BTreeSet<(Tag, String)>,
    tag_edges: BTreeSet<(Tag, String, ItemId)>,
    people: BTreeSet<String>,
    credits: BTreeSet<(Credit, String, ItemId)>,
    categories: BTreeSet<String>,
    subcategories: BTreeSet<(String, String)>,
    category_edges: BTreeMap<(String, ItemId), f64>,
    /// Keyed by the ordered id pair, so (a, b) and (b, a) share one edge
    similar: BTreeMap<(ItemId, ItemId), f64>,
    statements: u64,
    unavailable: Option<StoreError>,
}

impl MemoryGraph {
    /// Every operation counts as one statement and fails while the store is down
    fn begin(&mut self) -> StoreResult<()> {
        if let Some(error) = &self.unavailable {
            return Err(error.clone());
        }
        self.statements += 1;
        Ok(())
    }

    fn reaches(&self, from: &str, to: &str) -> bool {
        let mut stack = vec![from.to_string()];
        let mut seen = BTreeSet::new();
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if !seen.insert(node.clone()) {
                continue;
            }
            stack.extend(
                self.subcategories
                    .iter()
                    .filter(|(parent, _)| *parent == node)
                    .map(|(_, child)| child.clone()),
            );
        }
        false
    }

    fn genres_of(&self, id: &ItemId) -> Vec<String> {
        self.tag_edges
            .iter()
            .filter(|(tag, _, item)| *tag == Tag::Genre && item == id)
            .map(|(_, name, _)| name.clone())
            .collect()
    }

    fn categories_of(&self, id: &ItemId) -> Vec<String> {
        self.category_edges
            .keys()
            .filter(|(_, item)| item == id)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Graph store kept in process memory
///
/// Mirrors the merge semantics of the database backend. Used for tests and
/// dry runs; its inspection helpers expose the raw edge sets.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    graph: RwLock<MemoryGraph>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following operation fail with `error` until cleared with `None`
    pub async fn set_unavailable(&self, error: Option<StoreError>) {
        self.graph.write().await.unavailable = error;
    }

    /// Number of operations executed so far
    pub async fn statement_count(&self) -> u64 {
        self.graph.read().await.statements
    }

    pub async fn item_count(&self) -> usize {
        self.graph.read().await.items.len()
    }

    /// Shared nodes of one kind, by name
    pub async fn tag_names(&self, tag: Tag) -> Vec<String> {
        let graph = self.graph.read().await;
        graph
            .tags
            .iter()
            .filter(|(t, _)| *t == tag)
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub async fn tag_edge_count(&self) -> usize {
        self.graph.read().await.tag_edges.len()
    }

    pub async fn people(&self) -> Vec<String> {
        self.graph.read().await.people.iter().cloned().collect()
    }

    pub async fn credits(&self) -> Vec<(Credit, String, ItemId)> {
        self.graph.read().await.credits.iter().cloned().collect()
    }

    pub async fn categories(&self) -> Vec<String> {
        self.graph.read().await.categories.iter().cloned().collect()
    }

    pub async fn subcategory_edges(&self) -> Vec<(String, String)> {
        self.graph.read().await.subcategories.iter().cloned().collect()
    }

    pub async fn category_edges(&self) -> Vec<(String, ItemId, f64)> {
        self.graph
            .read()
            .await
            .category_edges
            .iter()
            .map(|((name, id), score)| (name.clone(), id.clone(), *score))
            .collect()
    }

    /// Similar edges as (lower id, higher id, weight)
    pub async fn similar_edges(&self) -> Vec<(ItemId, ItemId, f64)> {
        self.graph
            .read()
            .await
            .similar
            .iter()
            .map(|((a, b), w)| (a.clone(), b.clone(), *w))
            .collect()
    }

    /// Puts an item in place directly, bypassing ingestion
    pub async fn insert_item(&self, item: MediaItem) {
        self.graph.write().await.items.insert(item.id.clone(), item);
    }
}

#[async_trait::async_trait]
impl GraphStore for InMemoryStore {
    async fn ensure_constraints(&self) -> StoreResult<()> {
        self.graph.write().await.begin()
    }

    async fn find_item(&self, id: &ItemId) -> StoreResult<Option<MediaItem>> {
        let mut graph = self.graph.write().await;
        graph.begin()?;
        Ok(graph.items.get(id).cloned())
    }

    async fn merge_item(&self, record: &CatalogRecord) -> StoreResult<bool> {
        let mut graph = self.graph.write().await;
        graph.begin()?;
        if graph.items.contains_key(&record.id) {
            return Ok(false);
        }

        let imdb_rating = Some(record.imdb_rating).filter(|r| *r >= 0.0);
        graph.items.insert(
            record.id.clone(),
            MediaItem {
                id: record.id.clone(),
                slug: record.slug.clone(),
                title: record.title.clone(),
                year: record.year,
                kind: record.kind,
                ratings: Ratings {
                    imdb_rating,
                    ..Default::default()
                },
                emotions: Emotions::default(),
                text: TextFields {
                    description: record.description.clone(),
                    ..Default::default()
                },
                flags: SourceFlags::default(),
            },
        );
        Ok(true)
    }

    async fn link_tag(&self, id: &ItemId, tag: Tag, name: &str) -> StoreResult<()> {
        let mut graph = self.graph.write().await;
        graph.begin()?;
        if !graph.items.contains_key(id) {
            return Ok(());
        }
        graph.tags.insert((tag, name.to_string()));
        graph.tag_edges.insert((tag, name.to_string(), id.clone()));
        Ok(())
    }

    async fn link_person(&self, id: &ItemId, credit: Credit, name: &str) -> StoreResult<()> {
        let mut graph = self.graph.write().await;
        graph.begin()?;
        if !graph.items.contains_key(id) {
            return Ok(());
        }
        graph.people.insert(name.to_string());
        graph.credits.insert((credit, name.to_string(), id.clone()));
        Ok(())
    }

    async fn merge_category(&self, name: &str) -> StoreResult<()> {
        let mut graph = self.graph.write().await;
        graph.begin()?;
        graph.categories.insert(name.to_string());
        Ok(())
    }

    async fn link_subcategory(&self, parent: &str, child: &str) -> StoreResult<bool> {
        let mut graph = self.graph.write().await;
        graph.begin()?;
        graph.categories.insert(parent.to_string());
        graph.categories.insert(child.to_string());

        if parent == child || graph.reaches(child, parent) {
            return Ok(false);
        }
        graph
            .subcategories
            .insert((parent.to_string(), child.to_string()));
        Ok(true)
    }

    async fn link_category(&self, id: &ItemId, name: &str, score: f64) -> StoreResult<()> {
        let mut graph = self.graph.write().await;
        graph.begin()?;
        if !graph.items.contains_key(id) {
            return Ok(());
        }
        graph.categories.insert(name.to_string());
        graph
            .category_edges
            .insert((name.to_string(), id.clone()), score);
        Ok(())
    }

    async fn apply_update(
        &self,
        id: &ItemId,
        update: &ItemUpdate,
        completed: Source,
    ) -> StoreResult<()> {
        let mut graph = self.graph.write().await;
        graph.begin()?;
        let Some(item) = graph.items.get_mut(id) else {
            return Ok(());
        };

        fn put<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        put(&mut item.text.plot, &update.plot);
        put(&mut item.text.synopsis, &update.synopsis);
        put(&mut item.text.consensus, &update.consensus);
        put(&mut item.text.reviews, &update.reviews);
        put(&mut item.ratings.imdb_rating, &update.ratings.imdb_rating);
        put(&mut item.ratings.critics_rating, &update.ratings.critics_rating);
        put(&mut item.ratings.critics_score, &update.ratings.critics_score);
        put(&mut item.ratings.audience_score, &update.ratings.audience_score);
        put(&mut item.emotions.joy, &update.emotions.joy);
        put(&mut item.emotions.sadness, &update.emotions.sadness);
        put(&mut item.emotions.anger, &update.emotions.anger);
        put(&mut item.emotions.fear, &update.emotions.fear);
        put(&mut item.emotions.disgust, &update.emotions.disgust);
        item.flags.mark_complete(completed);
        Ok(())
    }

    async fn incomplete_items(&self, sources: &[Source]) -> StoreResult<Vec<ItemId>> {
        let mut graph = self.graph.write().await;
        graph.begin()?;
        Ok(graph
            .items
            .values()
            .filter(|item| !item.flags.missing(sources).is_empty())
            .map(|item| item.id.clone())
            .collect())
    }

    async fn snapshot(&self) -> StoreResult<Vec<ItemSnapshot>> {
        let mut graph = self.graph.write().await;
        graph.begin()?;
        Ok(graph
            .items
            .values()
            .map(|item| ItemSnapshot {
                item: item.clone(),
                genres: graph.genres_of(&item.id),
                categories: graph.categories_of(&item.id),
            })
            .collect())
    }

    async fn clear_similar(&self) -> StoreResult<u64> {
        let mut graph = self.graph.write().await;
        graph.begin()?;
        let removed = graph.similar.len() as u64;
        graph.similar.clear();
        Ok(removed)
    }

    async fn merge_similar(&self, a: &ItemId, b: &ItemId, weight: f64) -> StoreResult<()> {
        let mut graph = self.graph.write().await;
        graph.begin()?;
        if a == b || !graph.items.contains_key(a) || !graph.items.contains_key(b) {
            return Ok(());
        }
        let key = if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        graph.similar.insert(key, weight);
        Ok(())
    }
}
