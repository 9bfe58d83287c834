//! Weighted fusion of the three per-modality scores and the threshold verdict.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Relative weight of each modality in the fused confidence.
///
/// The defaults sum to 0.995 rather than 1.0. [`fuse`] divides by the total,
/// so only the ratios matter; the decision threshold was calibrated against
/// these exact values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub landmark: f64,
    pub embedding: f64,
    pub texture: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            landmark: 0.50,
            embedding: 0.395,
            texture: 0.10,
        }
    }
}

impl FusionWeights {
    pub fn total(&self) -> f64 {
        self.landmark + self.embedding + self.texture
    }

    /// Multiply every weight by `k`.
    pub fn scaled(&self, k: f64) -> Self {
        Self {
            landmark: self.landmark * k,
            embedding: self.embedding * k,
            texture: self.texture * k,
        }
    }

    /// Weights must be finite and non-negative with a positive total.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let all = [self.landmark, self.embedding, self.texture];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AnalysisError::InvalidParams(format!(
                "fusion weights must be finite and non-negative, got {all:?}"
            )));
        }
        if self.total() <= 0.0 {
            return Err(AnalysisError::InvalidParams(
                "fusion weights must not all be zero".into(),
            ));
        }
        Ok(())
    }
}

/// Per-modality confidences, each in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModalityScores {
    pub landmark: f64,
    pub embedding: f64,
    pub texture: f64,
}

/// Weighted mean of the three scores: `Σ score·w / Σ w`.
///
/// Invariant under uniform positive rescaling of the weights. Callers are
/// expected to pass weights that passed [`FusionWeights::validate`].
pub fn fuse(scores: &ModalityScores, weights: &FusionWeights) -> f64 {
    let weighted_sum = scores.landmark * weights.landmark
        + scores.embedding * weights.embedding
        + scores.texture * weights.texture;
    weighted_sum / weights.total()
}

/// A fused confidence strictly below `threshold` is flagged, and so is a NaN
/// confidence.
///
/// "Flagged" covers both a different person and manipulated media; the two
/// are not distinguished.
pub fn is_deepfaked(confidence: f64, threshold: f64) -> bool {
    !(confidence >= threshold)
}

/// Outcome of comparing a stored profile against a fresh one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub scores: ModalityScores,
    /// Fused confidence. Not clamped.
    pub confidence: f64,
    pub is_deepfaked: bool,
}

impl ComparisonResult {
    pub fn from_scores(scores: ModalityScores, weights: &FusionWeights, threshold: f64) -> Self {
        let confidence = fuse(&scores, weights);
        Self {
            scores,
            confidence,
            is_deepfaked: is_deepfaked(confidence, threshold),
        }
    }

    pub fn is_match(&self) -> bool {
        !self.is_deepfaked
    }

    /// Human-readable verdict line.
    pub fn message(&self) -> String {
        if self.is_deepfaked {
            format!("Image is deepfaked with confidence of {}", self.confidence)
        } else {
            format!("Image is not deepfaked with confidence of {}", self.confidence)
        }
    }
}
