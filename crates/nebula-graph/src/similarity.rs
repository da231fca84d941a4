//! Pairwise similarity between entities.
//!
//! Both measures are total: malformed input scores 0 rather than failing.

use crate::entity::{Entity, TagSet};

/// How a similarity value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimilarityMethod {
    EmbeddingCosine,
    TagJaccard,
}

impl SimilarityMethod {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::EmbeddingCosine => "embedding",
            Self::TagJaccard => "genres",
        }
    }
}

/// Which measure to apply to a pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SimilaritySource {
    /// Cosine when both entities carry a vector, Jaccard otherwise.
    #[default]
    Auto,
    Embedding,
    Tags,
}

/// A scored pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub value: f32,
    pub method: SimilarityMethod,
}

impl SimilaritySource {
    /// Score a pair of entities under this policy.
    pub fn similarity(self, a: &Entity, b: &Entity) -> Similarity {
        let use_embedding = match self {
            Self::Embedding => true,
            Self::Tags => false,
            Self::Auto => a.vector.is_some() && b.vector.is_some(),
        };
        if use_embedding {
            Similarity {
                value: cosine_similarity(a.vector.as_deref(), b.vector.as_deref()),
                method: SimilarityMethod::EmbeddingCosine,
            }
        } else {
            Similarity {
                value: jaccard_similarity(&a.genres, &b.genres),
                method: SimilarityMethod::TagJaccard,
            }
        }
    }
}

/// Cosine of the angle between two embeddings, in `[-1, 1]`.
///
/// Returns 0 when either vector is absent or empty, the lengths differ, or
/// either norm is zero.
pub fn cosine_similarity(a: Option<&[f32]>, b: Option<&[f32]>) -> f32 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.0;
    };
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() || !dot.is_finite() {
        return 0.0;
    }
    (dot / denom).clamp(-1.0, 1.0) as f32
}

/// `|A ∩ B| / |A ∪ B|`, 0 when both sets are empty.
pub fn jaccard_similarity(a: &TagSet, b: &TagSet) -> f32 {
    let shared = a.intersection_len(b);
    let union = a.len() + b.len() - shared;
    if union == 0 {
        return 0.0;
    }
    shared as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cos(a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(Some(a), Some(b))
    }

    #[test]
    fn test_cosine_identical_is_one() {
        assert!((cos(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_is_zero() {
        assert_eq!(cos(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_opposite_is_minus_one() {
        assert!((cos(&[1.0, 1.0], &[-1.0, -1.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_is_symmetric() {
        let a = [0.3, -1.2, 4.0, 0.5];
        let b = [2.0, 0.1, -0.7, 1.5];
        assert_eq!(cos(&a, &b), cos(&b, &a));
    }

    #[test]
    fn test_cosine_degenerate_inputs_are_zero() {
        assert_eq!(cos(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cos(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cos(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(None, Some(&[1.0])), 0.0);
    }

    #[test]
    fn test_cosine_stays_in_range_for_large_values() {
        let a = [1.0e20, 1.0e20];
        let b = [1.0e20, 1.0e20];
        let value = cos(&a, &b);
        assert!(value.is_finite());
        assert!((-1.0..=1.0).contains(&value));
    }

    #[test]
    fn test_jaccard() {
        let a = TagSet::parse("Action, Drama");
        let b = TagSet::parse("Drama, Comedy");
        assert!((jaccard_similarity(&a, &b) - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(jaccard_similarity(&a, &a), 1.0);
    }

    #[test]
    fn test_jaccard_empty_union_is_zero() {
        let empty = TagSet::default();
        assert_eq!(jaccard_similarity(&empty, &empty), 0.0);
        assert_eq!(jaccard_similarity(&empty, &TagSet::parse("Action")), 0.0);
    }

    #[test]
    fn test_auto_source_prefers_embeddings() {
        let a = Entity::new("1", "a").with_vector(vec![1.0, 0.0]).with_genres("Action");
        let b = Entity::new("2", "b").with_vector(vec![1.0, 0.0]).with_genres("Drama");
        let c = Entity::new("3", "c").with_genres("Action");

        let ab = SimilaritySource::Auto.similarity(&a, &b);
        assert_eq!(ab.method, SimilarityMethod::EmbeddingCosine);
        assert!((ab.value - 1.0).abs() < 1e-6);

        let ac = SimilaritySource::Auto.similarity(&a, &c);
        assert_eq!(ac.method, SimilarityMethod::TagJaccard);
        assert_eq!(ac.value, 1.0);
    }

    #[test]
    fn test_forced_sources() {
        let a = Entity::new("1", "a").with_genres("Action");
        let b = Entity::new("2", "b").with_genres("Action");
        let forced = SimilaritySource::Embedding.similarity(&a, &b);
        assert_eq!(forced.method, SimilarityMethod::EmbeddingCosine);
        assert_eq!(forced.value, 0.0);
        assert_eq!(SimilaritySource::Tags.similarity(&a, &b).value, 1.0);
    }
}
