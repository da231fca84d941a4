//! Similarity graph construction: node cap, threshold links, orphan rescue.

use std::collections::HashSet;

use crate::entity::{Entity, EntityId, TagSet};
use crate::similarity::{Similarity, SimilarityMethod, SimilaritySource};

/// Node derived from an entity, plus search annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: EntityId,
    pub title: String,
    pub poster: Option<String>,
    pub overview: Option<String>,
    pub rating: f32,
    pub popularity: f32,
    pub tags: TagSet,
    /// Render size, see [`node_size`].
    pub size: f32,
    pub is_search_result: bool,
    pub score: Option<f32>,
    pub relevance_rank: Option<u32>,
}

impl GraphNode {
    pub fn from_entity(entity: &Entity) -> Self {
        let rating = entity.rating.unwrap_or(0.0);
        Self {
            id: entity.id.clone(),
            title: entity.title.clone(),
            poster: entity.poster.clone(),
            overview: entity.overview.clone(),
            rating,
            popularity: entity.popularity.unwrap_or(0.0),
            tags: entity.genres.clone(),
            size: node_size(rating),
            is_search_result: false,
            score: None,
            relevance_rank: None,
        }
    }
}

/// `1 + clamp(rating, 0, 10) / 2`: unrated nodes are 1, a perfect 10 is 6.
#[must_use]
pub fn node_size(rating: f32) -> f32 {
    let rating = if rating.is_finite() { rating } else { 0.0 };
    1.0 + rating.clamp(0.0, 10.0) * 0.5
}

/// Undirected similarity edge.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityLink {
    pub source: EntityId,
    pub target: EntityId,
    pub similarity: f32,
    pub method: SimilarityMethod,
    /// Added by orphan rescue rather than by the threshold.
    pub rescued: bool,
}

impl SimilarityLink {
    /// The endpoint opposite `id`, if `id` is an endpoint.
    #[must_use]
    pub fn other(&self, id: &EntityId) -> Option<&EntityId> {
        if &self.source == id {
            Some(&self.target)
        } else if &self.target == id {
            Some(&self.source)
        } else {
            None
        }
    }

    #[must_use]
    pub fn touches(&self, id: &EntityId) -> bool {
        &self.source == id || &self.target == id
    }
}

/// Node-link graph handed to layout and rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<SimilarityLink>,
}

impl SimilarityGraph {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn node(&self, id: &EntityId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Number of links touching `id`.
    #[must_use]
    pub fn degree(&self, id: &EntityId) -> usize {
        self.links.iter().filter(|l| l.touches(id)).count()
    }

    #[must_use]
    pub fn rescued_link_count(&self) -> usize {
        self.links.iter().filter(|l| l.rescued).count()
    }
}

/// Builder parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphOptions {
    /// Only the first `max_nodes` entities become nodes. `None` keeps all.
    pub max_nodes: Option<usize>,
    /// Pairs with similarity strictly above this are linked.
    pub threshold: f32,
    pub source: SimilaritySource,
    /// Lower bound on the similarity of a rescue link.
    pub rescue_floor: f32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            max_nodes: Some(100),
            threshold: 0.65,
            source: SimilaritySource::Auto,
            rescue_floor: 0.1,
        }
    }
}

/// Build a similarity graph using the measure selected by `options.source`.
pub fn build_graph(entities: &[Entity], options: &GraphOptions) -> SimilarityGraph {
    let source = options.source;
    build_graph_with(entities, options, |a, b| source.similarity(a, b))
}

/// Build a similarity graph with an arbitrary symmetric similarity function.
///
/// Every link endpoint is a returned node, each unordered pair is linked at
/// most once, and after rescue every node has at least one link unless the
/// graph has a single node.
pub fn build_graph_with<F>(entities: &[Entity], options: &GraphOptions, similarity: F) -> SimilarityGraph
where
    F: Fn(&Entity, &Entity) -> Similarity,
{
    let cap = options.max_nodes.unwrap_or(usize::MAX);

    // First occurrence of an id wins so link endpoints stay unambiguous.
    let mut seen = HashSet::new();
    let selected: Vec<&Entity> = entities
        .iter()
        .filter(|e| seen.insert(&e.id))
        .take(cap)
        .collect();
    let n = selected.len();

    // Upper-triangular score table, scored once and reused by rescue.
    let mut scores = vec![None; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let s = similarity(selected[i], selected[j]);
            scores[i * n + j] = Some(s);
            scores[j * n + i] = Some(s);
        }
    }
    let score = |i: usize, j: usize| scores[i * n + j];

    let mut links = Vec::new();
    let mut linked_pairs: HashSet<(usize, usize)> = HashSet::new();
    let mut degree = vec![0usize; n];

    for i in 0..n {
        for j in (i + 1)..n {
            if let Some(s) = score(i, j)
                && s.value > options.threshold
            {
                links.push(link(&selected, i, j, s.value, s.method, false));
                linked_pairs.insert((i, j));
                degree[i] += 1;
                degree[j] += 1;
            }
        }
    }

    let threshold_links = links.len();
    let orphans: Vec<usize> = (0..n).filter(|&i| degree[i] == 0).collect();

    if n > 1 {
        for &i in &orphans {
            let mut best: Option<(usize, Similarity)> = None;
            for j in (0..n).filter(|&j| j != i) {
                if let Some(s) = score(i, j)
                    && best.is_none_or(|(_, b)| s.value > b.value)
                {
                    best = Some((j, s));
                }
            }
            let Some((j, s)) = best else { continue };

            let pair = (i.min(j), i.max(j));
            if linked_pairs.insert(pair) {
                let value = s.value.max(options.rescue_floor);
                links.push(link(&selected, i, j, value, s.method, true));
            }
        }
    }

    tracing::debug!(
        nodes = n,
        links = links.len(),
        threshold_links,
        orphans = orphans.len(),
        rescued = links.len() - threshold_links,
        "built similarity graph"
    );

    SimilarityGraph {
        nodes: selected.into_iter().map(GraphNode::from_entity).collect(),
        links,
    }
}

fn link(
    selected: &[&Entity],
    i: usize,
    j: usize,
    similarity: f32,
    method: SimilarityMethod,
    rescued: bool,
) -> SimilarityLink {
    SimilarityLink {
        source: selected[i].id.clone(),
        target: selected[j].id.clone(),
        similarity,
        method,
        rescued,
    }
}
