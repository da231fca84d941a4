//! Entity records as they arrive from the catalogue and the search backend.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Stable entity identifier.
///
/// Catalogues emit both numeric and string ids; both normalise to the same
/// string form so `42` and `"42"` name the same entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawEntityId", into = "String")]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntityId {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<RawEntityId> for EntityId {
    fn from(raw: RawEntityId) -> Self {
        match raw {
            RawEntityId::Int(n) => Self(n.to_string()),
            RawEntityId::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => {
                Self((f as i64).to_string())
            }
            RawEntityId::Float(f) => Self(f.to_string()),
            RawEntityId::Text(s) => Self(s),
        }
    }
}

/// Category tags of an entity.
///
/// Accepts either a comma-joined string (`"Action, Drama"`) or a list.
/// Empty entries and the `Unknown` marker carry no category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<RawTags>", into = "Vec<String>")]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    pub fn parse(joined: &str) -> Self {
        Self::from_iter(joined.split(','))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of tags present in both sets.
    #[must_use]
    pub fn intersection_len(&self, other: &TagSet) -> usize {
        self.0.intersection(&other.0).count()
    }
}

impl<'a> FromIterator<&'a str> for TagSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(str::trim)
                .filter(|tag| !tag.is_empty() && !tag.eq_ignore_ascii_case("unknown"))
                .map(str::to_string)
                .collect(),
        )
    }
}

impl From<TagSet> for Vec<String> {
    fn from(tags: TagSet) -> Self {
        tags.0.into_iter().collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTags {
    Joined(String),
    List(Vec<String>),
}

impl From<Option<RawTags>> for TagSet {
    fn from(raw: Option<RawTags>) -> Self {
        match raw {
            None => Self::default(),
            Some(RawTags::Joined(s)) => Self::parse(&s),
            Some(RawTags::List(list)) => list.iter().map(String::as_str).collect(),
        }
    }
}

/// One catalogue entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    /// Embedding vector, when the catalogue provides one.
    #[serde(default, alias = "embedding")]
    pub vector: Option<Vec<f32>>,
    #[serde(default)]
    pub genres: TagSet,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub popularity: Option<f32>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl Entity {
    /// Minimal entity with only an id and a title.
    pub fn new(id: impl Into<EntityId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            poster: None,
            overview: None,
            vector: None,
            genres: TagSet::default(),
            rating: None,
            popularity: None,
            release_date: None,
            language: None,
        }
    }

    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }

    pub fn with_genres(mut self, genres: &str) -> Self {
        self.genres = TagSet::parse(genres);
        self
    }

    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = Some(rating);
        self
    }
}

/// A search hit: the entity plus its relevance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub entity: Entity,
    /// Relevance score in `[0, 1]`.
    #[serde(default)]
    pub score: f32,
    #[serde(default, alias = "relevanceRank")]
    pub relevance_rank: Option<u32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntityDocument {
    List(Vec<Entity>),
    Nodes { nodes: Vec<Entity> },
    Movies { movies: Vec<Entity> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SearchDocument {
    List(Vec<SearchResult>),
    Results { results: Vec<SearchResult> },
    Movies { movies: Vec<SearchResult> },
}

/// Parse an entity list: a bare array or an object with `nodes` / `movies`.
pub fn parse_entities(json: &str) -> Result<Vec<Entity>, serde_json::Error> {
    Ok(match serde_json::from_str(json)? {
        EntityDocument::List(list)
        | EntityDocument::Nodes { nodes: list }
        | EntityDocument::Movies { movies: list } => list,
    })
}

/// Parse search results: a bare array or an object with `results` / `movies`.
pub fn parse_search_results(json: &str) -> Result<Vec<SearchResult>, serde_json::Error> {
    Ok(match serde_json::from_str(json)? {
        SearchDocument::List(list)
        | SearchDocument::Results { results: list }
        | SearchDocument::Movies { movies: list } => list,
    })
}

pub fn load_entities(path: &Path) -> Result<Vec<Entity>, GraphError> {
    let contents = read(path)?;
    let entities = parse_entities(&contents).map_err(|source| GraphError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(count = entities.len(), path = %path.display(), "loaded entities");
    Ok(entities)
}

pub fn load_search_results(path: &Path) -> Result<Vec<SearchResult>, GraphError> {
    let contents = read(path)?;
    let results = parse_search_results(&contents).map_err(|source| GraphError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(count = results.len(), path = %path.display(), "loaded search results");
    Ok(results)
}

fn read(path: &Path) -> Result<String, GraphError> {
    std::fs::read_to_string(path).map_err(|source| GraphError::Read {
        path: path.to_path_buf(),
        source,
    })
}
