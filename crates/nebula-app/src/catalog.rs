//! Graph input: entity list from disk or the mock catalogue, then the
//! optional search-result filter.

use nebula_config::{GraphConfig, SimilaritySetting};
use nebula_graph::{
    GraphError, GraphOptions, MockCatalog, SimilarityGraph, SimilaritySource, build_graph,
    filter_to_search_results, load_entities, load_search_results,
};
use tracing::info;

/// Embedding width of generated mock entities.
pub const MOCK_EMBEDDING_DIMS: usize = 32;

/// Builder options from the graph config. `max_nodes == 0` keeps every entity.
pub fn graph_options(config: &GraphConfig) -> GraphOptions {
    GraphOptions {
        max_nodes: (config.max_nodes > 0).then_some(config.max_nodes),
        threshold: config.threshold,
        source: match config.similarity {
            SimilaritySetting::Auto => SimilaritySource::Auto,
            SimilaritySetting::Embedding => SimilaritySource::Embedding,
            SimilaritySetting::Tags => SimilaritySource::Tags,
        },
        rescue_floor: config.rescue_floor,
    }
}

/// Load entities, build the similarity graph and apply the search filter.
pub fn load_graph(config: &GraphConfig) -> Result<SimilarityGraph, GraphError> {
    let entities = match &config.entities {
        Some(path) => {
            let entities = load_entities(path)?;
            info!("Loaded {} entities from {}", entities.len(), path.display());
            entities
        }
        None => {
            info!(
                count = config.mock_count,
                seed = config.mock_seed,
                "No entity file given, generating mock catalogue"
            );
            MockCatalog::new(config.mock_count, config.mock_seed)
                .with_embeddings(MOCK_EMBEDDING_DIMS)
                .generate()
        }
    };

    let graph = build_graph(&entities, &graph_options(config));
    info!(
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        rescued = graph.rescued_link_count(),
        "Similarity graph built"
    );

    let Some(path) = &config.search else {
        return Ok(graph);
    };
    let results = load_search_results(path)?;
    let filtered = filter_to_search_results(&graph, &results);
    info!(
        results = results.len(),
        nodes = filtered.nodes.len(),
        links = filtered.links.len(),
        "Filtered graph to search results"
    );
    Ok(filtered)
}
