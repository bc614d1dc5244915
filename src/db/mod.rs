//! Graph store abstraction
//!
//! Every operation maps to exactly one atomic statement against the store.
//! Node and edge writes use merge semantics: they create what is missing and
//! reuse what exists, so replaying an operation never duplicates anything.

use crate::{
    error::StoreResult,
    models::{CatalogRecord, ItemId, ItemSnapshot, ItemUpdate, MediaItem, Source},
};

pub mod memory;
pub mod neo4j;
pub mod statement;

pub use memory::InMemoryStore;
pub use neo4j::Neo4jStore;

/// Shared entity attached to items through an unlabeled `HAS_MOVIE` edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    Genre,
    Country,
}

impl Tag {
    pub fn label(&self) -> &'static str {
        match self {
            Tag::Genre => "Genre",
            Tag::Country => "Country",
        }
    }
}

/// Role linking a person to an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Credit {
    Actor,
    Director,
}

impl Credit {
    pub fn relationship(&self) -> &'static str {
        match self {
            Credit::Actor => "ACTED_IN",
            Credit::Director => "DIRECTED",
        }
    }
}

/// Trait for property graph backends
///
/// Implementations must be thread-safe: enrichment jobs for different items
/// call into the same store concurrently.
#[async_trait::async_trait]
pub trait GraphStore: Send + Sync {
    /// Creates uniqueness constraints for item ids and shared entity names
    async fn ensure_constraints(&self) -> StoreResult<()>;

    /// Loads a single item by id
    async fn find_item(&self, id: &ItemId) -> StoreResult<Option<MediaItem>>;

    /// Creates the item with every completeness flag false, unless an item with
    /// the same id exists. Returns whether a node was created.
    async fn merge_item(&self, record: &CatalogRecord) -> StoreResult<bool>;

    /// Merges the named tag node and its edge to the item
    async fn link_tag(&self, id: &ItemId, tag: Tag, name: &str) -> StoreResult<()>;

    /// Merges the named person node and its credit edge to the item
    async fn link_person(&self, id: &ItemId, credit: Credit, name: &str) -> StoreResult<()>;

    /// Merges a category node without linking it to anything
    async fn merge_category(&self, name: &str) -> StoreResult<()>;

    /// Merges both categories and the parent → child edge.
    ///
    /// The edge is refused when it would close a cycle in the category forest;
    /// returns whether the edge exists afterwards.
    async fn link_subcategory(&self, parent: &str, child: &str) -> StoreResult<bool>;

    /// Merges the category and its scored edge to the item
    async fn link_category(&self, id: &ItemId, name: &str, score: f64) -> StoreResult<()>;

    /// Writes the update's present fields and marks `completed` as fetched
    async fn apply_update(
        &self,
        id: &ItemId,
        update: &ItemUpdate,
        completed: Source,
    ) -> StoreResult<()>;

    /// Ids of items with at least one of `sources` not yet fetched, ordered by id
    async fn incomplete_items(&self, sources: &[Source]) -> StoreResult<Vec<ItemId>>;

    /// Every item with its genre and category names, ordered by id
    async fn snapshot(&self) -> StoreResult<Vec<ItemSnapshot>>;

    /// Deletes every similar edge. Returns how many were removed.
    async fn clear_similar(&self) -> StoreResult<u64>;

    /// Merges an undirected similar edge between two items
    async fn merge_similar(&self, a: &ItemId, b: &ItemId, weight: f64) -> StoreResult<()>;
}
