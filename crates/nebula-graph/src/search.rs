//! Subgraph around a set of search results.

use std::collections::{HashMap, HashSet};

use crate::builder::{GraphNode, SimilarityGraph};
use crate::entity::{EntityId, SearchResult};

/// Restrict `graph` to the search results and their direct neighbours.
///
/// Retained nodes keep the base graph's order; results missing from the base
/// graph are appended, unlinked, in result order. Links survive only when
/// both endpoints are retained. Every retained node matching a result is
/// annotated with its score and rank. Applying the filter again with the same
/// results returns the same graph.
pub fn filter_to_search_results(graph: &SimilarityGraph, results: &[SearchResult]) -> SimilarityGraph {
    let mut by_id: HashMap<&EntityId, &SearchResult> = HashMap::new();
    for result in results {
        by_id.entry(&result.entity.id).or_insert(result);
    }

    let mut retained: HashSet<&EntityId> = graph
        .nodes
        .iter()
        .map(|n| &n.id)
        .filter(|id| by_id.contains_key(id))
        .collect();
    for link in &graph.links {
        if by_id.contains_key(&link.source) || by_id.contains_key(&link.target) {
            retained.insert(&link.source);
            retained.insert(&link.target);
        }
    }

    let mut nodes: Vec<GraphNode> = graph
        .nodes
        .iter()
        .filter(|n| retained.contains(&n.id))
        .cloned()
        .collect();

    let present: HashSet<EntityId> = nodes.iter().map(|n| n.id.clone()).collect();
    let mut appended = HashSet::new();
    for result in results {
        let id = &result.entity.id;
        if !present.contains(id) && appended.insert(id) {
            nodes.push(GraphNode::from_entity(&result.entity));
        }
    }

    for node in &mut nodes {
        if let Some(result) = by_id.get(&node.id) {
            node.is_search_result = true;
            node.score = Some(result.score);
            node.relevance_rank = result.relevance_rank;
        }
    }

    // Base links pointing outside the base node set are dropped.
    let node_ids: HashSet<&EntityId> = graph.nodes.iter().map(|n| &n.id).collect();
    let links = graph
        .links
        .iter()
        .filter(|l| retained.contains(&l.source) && retained.contains(&l.target))
        .filter(|l| node_ids.contains(&l.source) && node_ids.contains(&l.target))
        .cloned()
        .collect();

    tracing::debug!(
        results = results.len(),
        nodes = nodes.len(),
        appended = appended.len(),
        "filtered graph to search results"
    );

    SimilarityGraph { nodes, links }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GraphOptions, build_graph};
    use crate::entity::Entity;

    fn hit(id: &str, score: f32, rank: u32) -> SearchResult {
        SearchResult {
            entity: Entity::new(id, format!("hit {id}")),
            score,
            relevance_rank: Some(rank),
        }
    }

    /// a-b and c-d linked by genre, e isolated then rescued.
    fn base_graph() -> SimilarityGraph {
        let entities = vec![
            Entity::new("a", "A").with_genres("Action"),
            Entity::new("b", "B").with_genres("Action"),
            Entity::new("c", "C").with_genres("Drama"),
            Entity::new("d", "D").with_genres("Drama"),
            Entity::new("e", "E").with_genres("Western"),
        ];
        build_graph(&entities, &GraphOptions::default())
    }

    fn ids(graph: &SimilarityGraph) -> Vec<&str> {
        graph.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_keeps_results_and_neighbors() {
        let base = base_graph();
        let filtered = filter_to_search_results(&base, &[hit("b", 0.9, 1)]);
        // e is rescued to a, so it is not a neighbour of b.
        assert_eq!(ids(&filtered), ["a", "b"]);
        assert_eq!(filtered.links.len(), 1);

        let b = filtered.node(&EntityId::from("b")).unwrap();
        assert!(b.is_search_result);
        assert_eq!(b.score, Some(0.9));
        assert_eq!(b.relevance_rank, Some(1));
        assert!(!filtered.node(&EntityId::from("a")).unwrap().is_search_result);
    }

    #[test]
    fn test_links_need_both_endpoints_retained() {
        let base = base_graph();
        let filtered = filter_to_search_results(&base, &[hit("e", 0.5, 1)]);
        // e-a is kept, a-b is not because b is two hops from e.
        assert_eq!(ids(&filtered), ["a", "e"]);
        assert_eq!(filtered.links.len(), 1);
        assert!(filtered.links[0].touches(&EntityId::from("e")));
    }

    #[test]
    fn test_missing_results_are_appended() {
        let base = base_graph();
        let results = [hit("z", 0.4, 2), hit("c", 0.8, 1), hit("z", 0.1, 3)];
        let filtered = filter_to_search_results(&base, &results);
        assert_eq!(ids(&filtered), ["c", "d", "z"]);

        let z = filtered.node(&EntityId::from("z")).unwrap();
        assert!(z.is_search_result);
        // First occurrence of a duplicated result wins.
        assert_eq!(z.score, Some(0.4));
        assert_eq!(filtered.degree(&z.id), 0);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let base = base_graph();
        let results = [hit("a", 0.7, 1), hit("q", 0.3, 2)];
        let once = filter_to_search_results(&base, &results);
        let twice = filter_to_search_results(&once, &results);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_results_yields_empty_graph() {
        let filtered = filter_to_search_results(&base_graph(), &[]);
        assert!(filtered.is_empty());
        assert!(filtered.links.is_empty());
    }
}
