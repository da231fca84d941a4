//! Deterministic mock catalogue for running without an entity file.

use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::entity::{Entity, EntityId, TagSet};

const GENRES: &[&str] = &[
    "Action",
    "Adventure",
    "Animation",
    "Comedy",
    "Crime",
    "Documentary",
    "Drama",
    "Family",
    "Fantasy",
    "History",
    "Horror",
    "Music",
    "Mystery",
    "Romance",
    "Science Fiction",
    "Thriller",
    "War",
    "Western",
];

const TITLE_PREFIXES: &[&str] = &[
    "The Last", "Beyond", "Shadow of", "Rise of the", "Fall of", "The Secret", "Dark",
    "Eternal", "Lost in", "Edge of", "Return to", "Whispers of", "The Silent", "Broken",
    "Under the", "Chasing", "Forgotten", "The Final", "Savage", "Frozen", "Into the",
    "Code of", "Heart of", "Echoes of", "Night of the", "Day of the", "Crimson", "Golden",
    "Iron", "Project",
];

const TITLE_SUFFIXES: &[&str] = &[
    "Dawn", "Horizon", "Empire", "Legacy", "Thunder", "Phoenix", "Frontier", "Storm",
    "Redemption", "Awakening", "Protocol", "Kingdom", "Requiem", "Cascade", "Obsidian",
    "Nebula", "Cipher", "Vanguard", "Prophecy", "Asylum", "Dominion", "Spectre", "Paradox",
    "Exodus", "Vendetta", "Odyssey", "Rapture", "Sentinel", "Inferno", "Eclipse",
];

const OVERVIEWS: &[&str] = &[
    "A gripping tale of survival against impossible odds in a world on the brink of collapse.",
    "When an ancient secret is uncovered, a reluctant hero must rise to protect everything they hold dear.",
    "In a dystopian future, a small group of rebels fights for freedom against a tyrannical regime.",
    "A heart-wrenching story of love and loss set against the backdrop of a war-torn landscape.",
    "A detective races against time to solve a series of baffling crimes.",
    "A visually stunning adventure through uncharted territories where danger lurks at every turn.",
    "The bonds of family are tested when a dark secret from the past threatens to destroy everything.",
    "A comedy that explores the absurdities of modern life.",
    "When worlds collide, unlikely allies must join forces to prevent catastrophe.",
    "A mind-bending journey through time and space that challenges the fabric of reality.",
];

const LANGUAGES: &[&str] = &["es", "fr", "ko", "ja", "de"];

/// Seeded generator of plausible movie entities.
///
/// The same seed and count always produce the same catalogue.
#[derive(Debug, Clone)]
pub struct MockCatalog {
    pub count: usize,
    pub seed: u64,
    /// When set, every entity gets an embedding of this many dimensions built
    /// from its genres plus noise, so genre-mates land close together.
    pub embedding_dims: Option<usize>,
}

impl MockCatalog {
    pub fn new(count: usize, seed: u64) -> Self {
        Self {
            count,
            seed,
            embedding_dims: None,
        }
    }

    pub fn with_embeddings(mut self, dims: usize) -> Self {
        self.embedding_dims = Some(dims.max(1));
        self
    }

    pub fn generate(&self) -> Vec<Entity> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let axes = self.embedding_dims.map(|dims| genre_axes(&mut rng, dims));

        (0..self.count)
            .map(|i| {
                let prefix = TITLE_PREFIXES[rng.random_range(0..TITLE_PREFIXES.len())];
                let suffix = TITLE_SUFFIXES[rng.random_range(0..TITLE_SUFFIXES.len())];

                let genre_count = rng.random_range(1..=3);
                let genres: Vec<&str> = GENRES.choose_multiple(&mut rng, genre_count).copied().collect();

                let year = rng.random_range(1985..2026);
                let month = rng.random_range(1..=12);
                let day = rng.random_range(1..=28);
                let rating = (rng.random_range(5.0f32..9.8) * 10.0).round() / 10.0;
                let popularity = (rng.random::<f32>() * 1000.0).round() / 10.0;
                let language = if rng.random::<f32>() > 0.2 {
                    "en"
                } else {
                    LANGUAGES[rng.random_range(0..LANGUAGES.len())]
                };

                let vector = axes
                    .as_ref()
                    .map(|axes| embed(&mut rng, axes, &genres));

                Entity {
                    id: EntityId::from(i as u64 + 1),
                    title: format!("{prefix} {suffix}"),
                    poster: None,
                    overview: Some(OVERVIEWS[rng.random_range(0..OVERVIEWS.len())].to_string()),
                    vector,
                    genres: genres.iter().copied().collect::<TagSet>(),
                    rating: Some(rating),
                    popularity: Some(popularity),
                    release_date: Some(format!("{year}-{month:02}-{day:02}")),
                    language: Some(language.to_string()),
                }
            })
            .collect()
    }
}

/// One random direction per genre.
fn genre_axes(rng: &mut ChaCha8Rng, dims: usize) -> Vec<Vec<f32>> {
    GENRES
        .iter()
        .map(|_| (0..dims).map(|_| rng.random_range(-1.0f32..1.0)).collect())
        .collect()
}

fn embed(rng: &mut ChaCha8Rng, axes: &[Vec<f32>], genres: &[&str]) -> Vec<f32> {
    let dims = axes.first().map_or(0, Vec::len);
    let mut v: Vec<f32> = (0..dims).map(|_| rng.random_range(-0.25f32..0.25)).collect();
    for genre in genres {
        if let Some(axis) = GENRES.iter().position(|g| g == genre).map(|i| &axes[i]) {
            for (x, a) in v.iter_mut().zip(axis) {
                *x += a;
            }
        }
    }
    v
}
