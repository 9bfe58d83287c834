use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Deep face embedding vector. Dimensionality is fixed by the model that
/// produced it (512 for FaceNet/vggface2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f64>,
}

impl Embedding {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Cosine similarity in [-1, 1]. Higher = more similar.
    ///
    /// Each vector is divided by its largest absolute component before the
    /// sums are taken, so components near the limits of `f64` neither
    /// overflow nor underflow. A zero vector on either side, or any
    /// non-finite input, yields 0.0.
    pub fn similarity(&self, other: &Embedding) -> f64 {
        let scale_a = max_abs(&self.values);
        let scale_b = max_abs(&other.values);
        if !(scale_a > 0.0 && scale_a.is_finite() && scale_b > 0.0 && scale_b.is_finite()) {
            return 0.0;
        }

        let mut dot = 0.0f64;
        let mut norm_a = 0.0f64;
        let mut norm_b = 0.0f64;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            let (a, b) = (a / scale_a, b / scale_b);
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
        if sim.is_finite() { sim } else { 0.0 }
    }
}

fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |m, v| m.max(v.abs()))
}

impl From<Vec<f64>> for Embedding {
    fn from(values: Vec<f64>) -> Self {
        Self { values }
    }
}

/// Rescale cosine similarity between two embeddings onto 0–100.
///
/// `(sim + 1) / 2 * 100`, with `sim` clamped to [-1, 1] first so rounding
/// noise cannot push the score outside the range.
pub fn compare_embeddings(a: &Embedding, b: &Embedding) -> Result<f64, AnalysisError> {
    if a.dim() != b.dim() {
        return Err(AnalysisError::DimensionMismatch {
            left: a.dim(),
            right: b.dim(),
        });
    }

    let similarity = a.similarity(b).clamp(-1.0, 1.0);
    Ok((similarity + 1.0) / 2.0 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = Embedding::new(vec![1.0, 0.0, 0.0]);
        let b = Embedding::new(vec![1.0, 0.0, 0.0]);
        assert!((a.similarity(&b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![0.0, 1.0]);
        assert!(a.similarity(&b).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![1.0, 0.0]);
        assert_eq!(a.similarity(&b), 0.0);
    }

    #[test]
    fn test_compare_self_is_100() {
        let v = Embedding::new(vec![0.3, -1.7, 2.25, 0.01, 9.0]);
        let score = compare_embeddings(&v, &v).unwrap();
        assert!((score - 100.0).abs() < 1e-9, "got {score}");
        assert!(score <= 100.0);
    }

    #[test]
    fn test_compare_rescaling() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let opposite = Embedding::new(vec![-1.0, 0.0]);
        let orthogonal = Embedding::new(vec![0.0, 3.0]);
        assert!(compare_embeddings(&a, &opposite).unwrap().abs() < 1e-9);
        assert!((compare_embeddings(&a, &orthogonal).unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_compare_zero_vector_is_midpoint() {
        let a = Embedding::new(vec![0.0; 4]);
        let b = Embedding::new(vec![1.0; 4]);
        assert_eq!(compare_embeddings(&a, &b).unwrap(), 50.0);
    }

    #[test]
    fn test_compare_huge_components() {
        let a = Embedding::new(vec![1e200, 0.0]);
        let opposite = Embedding::new(vec![-1e200, 0.0]);
        assert_eq!(compare_embeddings(&a, &opposite).unwrap(), 0.0);
        assert!((compare_embeddings(&a, &a).unwrap() - 100.0).abs() < 1e-9);

        let mixed = Embedding::new(vec![1e300, 3e299]);
        let score = compare_embeddings(&mixed, &mixed).unwrap();
        assert!((score - 100.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn test_compare_tiny_components() {
        let a = Embedding::new(vec![1e-200, 0.0]);
        assert!((compare_embeddings(&a, &a).unwrap() - 100.0).abs() < 1e-9);

        let sub = Embedding::new(vec![5e-324, 5e-324]);
        assert!((compare_embeddings(&sub, &sub).unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_components_are_midpoint() {
        let a = Embedding::new(vec![f64::NAN, 1.0]);
        let b = Embedding::new(vec![f64::INFINITY, 1.0]);
        let c = Embedding::new(vec![1.0, 1.0]);
        assert_eq!(compare_embeddings(&a, &c).unwrap(), 50.0);
        assert_eq!(compare_embeddings(&b, &c).unwrap(), 50.0);
    }

    #[test]
    fn test_compare_dimension_mismatch() {
        let a = Embedding::new(vec![1.0, 2.0, 3.0]);
        let b = Embedding::new(vec![1.0, 2.0]);
        assert!(matches!(
            compare_embeddings(&a, &b),
            Err(AnalysisError::DimensionMismatch { left: 3, right: 2 })
        ));
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let v = Embedding::new(vec![0.5, -0.25]);
        assert_eq!(serde_json::to_string(&v).unwrap(), "[0.5,-0.25]");
    }
}
