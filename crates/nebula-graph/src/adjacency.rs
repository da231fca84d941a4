//! Node index and neighbour lists, derived once per graph version.

use std::collections::HashMap;

use crate::builder::SimilarityGraph;
use crate::entity::EntityId;

/// One adjacent node, as seen from the node owning the list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index into `SimilarityGraph::nodes`.
    pub node: usize,
    pub similarity: f32,
    /// Index into `SimilarityGraph::links`.
    pub link: usize,
}

/// Precomputed lookup tables for hover and picking.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    index_by_id: HashMap<EntityId, usize>,
    neighbors: Vec<Vec<Neighbor>>,
}

impl Adjacency {
    /// Links with an endpoint outside the node set are ignored.
    pub fn from_graph(graph: &SimilarityGraph) -> Self {
        let index_by_id: HashMap<EntityId, usize> = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();

        let mut neighbors = vec![Vec::new(); graph.nodes.len()];
        for (link_index, link) in graph.links.iter().enumerate() {
            let (Some(&s), Some(&t)) = (
                index_by_id.get(&link.source),
                index_by_id.get(&link.target),
            ) else {
                continue;
            };
            neighbors[s].push(Neighbor {
                node: t,
                similarity: link.similarity,
                link: link_index,
            });
            neighbors[t].push(Neighbor {
                node: s,
                similarity: link.similarity,
                link: link_index,
            });
        }

        Self {
            index_by_id,
            neighbors,
        }
    }

    #[must_use]
    pub fn index_of(&self, id: &EntityId) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    /// Neighbours of the node at `index`, in link order. Empty for unknown indices.
    #[must_use]
    pub fn neighbors(&self, index: usize) -> &[Neighbor] {
        self.neighbors.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn degree(&self, index: usize) -> usize {
        self.neighbors(index).len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GraphOptions, build_graph};
    use crate::entity::Entity;

    #[test]
    fn test_neighbors_are_symmetric() {
        let entities = vec![
            Entity::new("1", "a").with_vector(vec![1.0, 0.0]),
            Entity::new("2", "b").with_vector(vec![1.0, 0.0]),
            Entity::new("3", "c").with_vector(vec![0.0, 1.0]),
        ];
        let graph = build_graph(&entities, &GraphOptions::default());
        let adjacency = Adjacency::from_graph(&graph);

        assert_eq!(adjacency.len(), 3);
        let first = adjacency.index_of(&EntityId::from("1")).unwrap();
        let third = adjacency.index_of(&EntityId::from("3")).unwrap();
        assert_eq!(adjacency.degree(first), 2);
        assert_eq!(adjacency.degree(third), 1);
        assert_eq!(adjacency.neighbors(third)[0].node, first);
        assert!((adjacency.neighbors(third)[0].similarity - 0.1).abs() < 1e-6);
        assert_eq!(adjacency.neighbors(third)[0].link, 1);
    }

    #[test]
    fn test_unknown_lookups() {
        let adjacency = Adjacency::from_graph(&SimilarityGraph::default());
        assert!(adjacency.is_empty());
        assert_eq!(adjacency.index_of(&EntityId::from("missing")), None);
        assert!(adjacency.neighbors(5).is_empty());
    }
}
