//! Similarity graph construction for the Nebula explorer.
//!
//! Turns a flat entity list into a connected node-link graph: pairwise
//! similarity (embedding cosine or tag Jaccard), threshold links, orphan
//! rescue, and extraction of the subgraph around a set of search results.
//! Nothing here touches the GPU; the scene and renderer consume the output.

mod adjacency;
mod builder;
mod entity;
mod error;
mod mock;
mod search;
mod similarity;

pub use adjacency::{Adjacency, Neighbor};
pub use builder::{
    GraphNode, GraphOptions, SimilarityGraph, SimilarityLink, build_graph, build_graph_with,
    node_size,
};
pub use entity::{
    Entity, EntityId, SearchResult, TagSet, load_entities, load_search_results, parse_entities,
    parse_search_results,
};
pub use error::GraphError;
pub use mock::MockCatalog;
pub use search::filter_to_search_results;
pub use similarity::{
    Similarity, SimilarityMethod, SimilaritySource, cosine_similarity, jaccard_similarity,
};
