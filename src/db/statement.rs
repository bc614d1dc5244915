//! Parameterized Cypher statements
//!
//! Values always travel as parameters. The only text spliced into a statement
//! is labels, relationship types and property names, and those come from
//! closed enums in this crate, never from source data.

use crate::models::{CatalogRecord, ItemId, ItemUpdate, Source};

use super::{Credit, Tag};

/// A statement parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Str(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Str(value)
    }
}

impl From<&ItemId> for Param {
    fn from(value: &ItemId) -> Self {
        Param::Str(value.as_str().to_string())
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Int(value)
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Param::Float(value)
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Param::Bool(value)
    }
}

/// Cypher text plus its named parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    text: String,
    params: Vec<(String, Param)>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Param>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[(String, Param)] {
        &self.params
    }

    pub fn get(&self, key: &str) -> Option<&Param> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn to_query(&self) -> neo4rs::Query {
        self.params
            .iter()
            .fold(neo4rs::query(&self.text), |q, (key, value)| match value {
                Param::Str(v) => q.param(key, v.clone()),
                Param::Int(v) => q.param(key, *v),
                Param::Float(v) => q.param(key, *v),
                Param::Bool(v) => q.param(key, *v),
            })
    }
}

/// Accumulates `SET m.<prop> = $<prop>` assignments for present values
struct Assignments {
    clauses: Vec<String>,
    params: Vec<(String, Param)>,
}

impl Assignments {
    fn new() -> Self {
        Self {
            clauses: Vec::new(),
            params: Vec::new(),
        }
    }

    fn set(&mut self, property: &'static str, value: impl Into<Param>) {
        self.clauses.push(format!("m.{property} = ${property}"));
        self.params.push((property.to_string(), value.into()));
    }

    fn set_opt<T: Into<Param>>(&mut self, property: &'static str, value: Option<T>) {
        if let Some(value) = value {
            self.set(property, value);
        }
    }

    fn set_literal(&mut self, property: &'static str, literal: &'static str) {
        self.clauses.push(format!("m.{property} = {literal}"));
    }

    fn apply(self, mut statement: Statement) -> Statement {
        statement.params.extend(self.params);
        statement
    }
}

/// Columns every item read returns, aliased for row decoding
pub const ITEM_COLUMNS: &str = "m.imdb_id AS id, m.slug AS slug, m.name AS name, \
     m.year AS year, m.type AS type, \
     m.imdb_rating AS imdb_rating, m.critics_rating AS critics_rating, \
     m.critics_score AS critics_score, m.audience_score AS audience_score, \
     m.joy AS joy, m.sadness AS sadness, m.anger AS anger, m.fear AS fear, m.disgust AS disgust, \
     m.plot AS plot, m.description AS description, m.synopsis AS synopsis, \
     m.consensus AS consensus, m.reviews AS reviews, \
     coalesce(m.imdb_data, false) AS imdb_data, \
     coalesce(m.rotten_tomatoes_data, false) AS rotten_tomatoes_data, \
     coalesce(m.ibm_data, false) AS ibm_data";

pub fn constraints() -> Vec<Statement> {
    [
        "CREATE CONSTRAINT movie_imdb_id IF NOT EXISTS FOR (m:Movie) REQUIRE m.imdb_id IS UNIQUE",
        "CREATE CONSTRAINT genre_name IF NOT EXISTS FOR (g:Genre) REQUIRE g.name IS UNIQUE",
        "CREATE CONSTRAINT country_name IF NOT EXISTS FOR (c:Country) REQUIRE c.name IS UNIQUE",
        "CREATE CONSTRAINT category_name IF NOT EXISTS FOR (c:Category) REQUIRE c.name IS UNIQUE",
        "CREATE CONSTRAINT person_name IF NOT EXISTS FOR (p:Person) REQUIRE p.name IS UNIQUE",
    ]
    .into_iter()
    .map(Statement::new)
    .collect()
}

pub fn find_item(id: &ItemId) -> Statement {
    Statement::new(format!(
        "MATCH (m:Movie {{imdb_id: $id}}) RETURN {ITEM_COLUMNS}"
    ))
    .param("id", id)
}

/// Creates the item on first sight only; `created` is true for the call that created it
pub fn merge_item(record: &CatalogRecord, token: &str) -> Statement {
    let mut on_create = Assignments::new();
    on_create.set("slug", record.slug.as_str());
    on_create.set("name", record.title.as_str());
    on_create.set("type", record.kind.as_str());
    on_create.set("year", record.year);
    on_create.set("source", record.origin.as_str());
    on_create.set("imdb_rating", record.imdb_rating);
    on_create.set("length", record.length);
    on_create.set("link", record.link.as_str());
    on_create.set_opt("description", record.description.as_deref());
    on_create.set_opt("poster", record.poster.as_deref());
    on_create.set_opt("mubi_popularity", record.popularity);
    on_create.set_opt("still_average_colour", record.still_average_colour.as_deref());
    for source in Source::ALL {
        on_create.set_literal(source.flag_property(), "false");
    }
    on_create.set("ingest_token", token);

    let text = format!(
        "MERGE (m:Movie {{imdb_id: $id}}) \
         ON CREATE SET {} \
         RETURN m.ingest_token = $ingest_token AS created",
        on_create.clauses.join(", ")
    );
    on_create.apply(Statement::new(text).param("id", &record.id))
}

pub fn link_tag(id: &ItemId, tag: Tag, name: &str) -> Statement {
    Statement::new(format!(
        "MATCH (m:Movie {{imdb_id: $id}}) \
         MERGE (t:{} {{name: $name}}) \
         MERGE (t)-[:HAS_MOVIE]->(m)",
        tag.label()
    ))
    .param("id", id)
    .param("name", name)
}

pub fn link_person(id: &ItemId, credit: Credit, name: &str) -> Statement {
    Statement::new(format!(
        "MATCH (m:Movie {{imdb_id: $id}}) \
         MERGE (p:Person {{name: $name}}) \
         MERGE (p)-[:{}]->(m)",
        credit.relationship()
    ))
    .param("id", id)
    .param("name", name)
}

pub fn merge_category(name: &str) -> Statement {
    Statement::new("MERGE (c:Category {name: $name})").param("name", name)
}

/// The cycle check only sees committed edges; callers serialize category
/// linking so two paths in opposite order cannot both pass it.
pub fn link_subcategory(parent: &str, child: &str) -> Statement {
    Statement::new(
        "MERGE (p:Category {name: $parent}) \
         MERGE (c:Category {name: $child}) \
         WITH p, c \
         WHERE p <> c AND NOT EXISTS { (c)-[:HAS_SUBCATEGORY*]->(p) } \
         MERGE (p)-[:HAS_SUBCATEGORY]->(c) \
         RETURN count(*) AS linked",
    )
    .param("parent", parent)
    .param("child", child)
}

pub fn link_category(id: &ItemId, name: &str, score: f64) -> Statement {
    Statement::new(
        "MATCH (m:Movie {imdb_id: $id}) \
         MERGE (c:Category {name: $name}) \
         MERGE (c)-[r:HAS_MOVIE]->(m) \
         SET r.score = $score",
    )
    .param("id", id)
    .param("name", name)
    .param("score", score)
}

/// Writes present fields and flips the source flag in the same statement
pub fn apply_update(id: &ItemId, update: &ItemUpdate, completed: Source) -> Statement {
    let mut set = Assignments::new();
    set.set_opt("plot", update.plot.clone());
    set.set_opt("synopsis", update.synopsis.clone());
    set.set_opt("consensus", update.consensus.clone());
    set.set_opt("reviews", update.reviews.clone());
    set.set_opt("imdb_rating", update.ratings.imdb_rating);
    set.set_opt("critics_rating", update.ratings.critics_rating);
    set.set_opt("critics_score", update.ratings.critics_score);
    set.set_opt("audience_score", update.ratings.audience_score);
    set.set_opt("joy", update.emotions.joy);
    set.set_opt("sadness", update.emotions.sadness);
    set.set_opt("anger", update.emotions.anger);
    set.set_opt("fear", update.emotions.fear);
    set.set_opt("disgust", update.emotions.disgust);
    set.set_literal(completed.flag_property(), "true");

    let text = format!(
        "MATCH (m:Movie {{imdb_id: $id}}) SET {}",
        set.clauses.join(", ")
    );
    set.apply(Statement::new(text).param("id", id))
}

pub fn incomplete_items(sources: &[Source]) -> Statement {
    let pending: Vec<String> = sources
        .iter()
        .map(|s| format!("coalesce(m.{}, false) = false", s.flag_property()))
        .collect();

    Statement::new(format!(
        "MATCH (m:Movie) WHERE {} RETURN m.imdb_id AS id ORDER BY id",
        pending.join(" OR ")
    ))
}

pub fn snapshot() -> Statement {
    Statement::new(format!(
        "MATCH (m:Movie) \
         OPTIONAL MATCH (g:Genre)-[:HAS_MOVIE]->(m) \
         WITH m, collect(DISTINCT g.name) AS genres \
         OPTIONAL MATCH (c:Category)-[:HAS_MOVIE]->(m) \
         WITH m, genres, collect(DISTINCT c.name) AS categories \
         RETURN {ITEM_COLUMNS}, genres, categories \
         ORDER BY id"
    ))
}

pub fn clear_similar() -> Statement {
    Statement::new(
        "MATCH (:Movie)-[r:SIMILAR]->(:Movie) \
         DELETE r \
         RETURN count(r) AS removed",
    )
}

pub fn merge_similar(a: &ItemId, b: &ItemId, weight: f64) -> Statement {
    Statement::new(
        "MATCH (a:Movie {imdb_id: $a}) \
         MATCH (b:Movie {imdb_id: $b}) \
         MERGE (a)-[r:SIMILAR]-(b) \
         SET r.similarity = $similarity",
    )
    .param("a", a)
    .param("b", b)
    .param("similarity", weight)
}
