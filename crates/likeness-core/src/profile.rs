//! Facial profile: the three feature sets extracted from one image, plus the
//! extraction and comparison entry points built on them.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::config::AnalysisParams;
use crate::embedding::{compare_embeddings, Embedding};
use crate::error::AnalysisError;
use crate::fusion::{ComparisonResult, ModalityScores};
use crate::landmarks::{compare_distances, extract_landmark_distances, LandmarkDistances, RawLandmarks};
use crate::lbp::{texture_histogram, TextureDescriptor, UniformLbp};
use crate::texture::{compare_lbp_histograms, TextureHistogram};

/// Produces 68 ordered keypoints for the first face found in an image.
pub trait LandmarkDetector {
    /// Fails with [`AnalysisError::NoFaceDetected`] when the image has no face.
    fn detect_landmarks(&mut self, image: &DynamicImage) -> Result<RawLandmarks, AnalysisError>;
}

/// Produces a fixed-length deep embedding for an image.
pub trait EmbeddingExtractor {
    fn extract_embedding(&mut self, image: &DynamicImage) -> Result<Embedding, AnalysisError>;
}

/// Feature sets for one subject image. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    landmark_distances: LandmarkDistances,
    deep_features: Embedding,
    lbp_histogram: TextureHistogram,
}

impl Profile {
    pub fn new(
        landmark_distances: LandmarkDistances,
        deep_features: Embedding,
        lbp_histogram: TextureHistogram,
    ) -> Self {
        Self {
            landmark_distances,
            deep_features,
            lbp_histogram,
        }
    }

    pub fn landmark_distances(&self) -> &LandmarkDistances {
        &self.landmark_distances
    }

    pub fn deep_features(&self) -> &Embedding {
        &self.deep_features
    }

    pub fn lbp_histogram(&self) -> &TextureHistogram {
        &self.lbp_histogram
    }
}

/// Turns images into [`Profile`]s using pluggable extractors.
pub struct ProfileGenerator<L, E, D = UniformLbp> {
    landmarks: L,
    embedder: E,
    texture: D,
    params: AnalysisParams,
}

impl<L, E> ProfileGenerator<L, E, UniformLbp>
where
    L: LandmarkDetector,
    E: EmbeddingExtractor,
{
    pub fn new(landmarks: L, embedder: E, params: AnalysisParams) -> Self {
        Self::with_descriptor(landmarks, embedder, UniformLbp, params)
    }
}

impl<L, E, D> ProfileGenerator<L, E, D>
where
    L: LandmarkDetector,
    E: EmbeddingExtractor,
    D: TextureDescriptor,
{
    pub fn with_descriptor(landmarks: L, embedder: E, texture: D, params: AnalysisParams) -> Self {
        Self {
            landmarks,
            embedder,
            texture,
            params,
        }
    }

    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    /// Run all three extractors over `image`.
    ///
    /// Landmarks go first so a faceless image fails before the embedding
    /// model runs.
    pub fn generate_profile(&mut self, image: &DynamicImage) -> Result<Profile, AnalysisError> {
        let raw = self.landmarks.detect_landmarks(image)?;
        let landmark_distances = extract_landmark_distances(&raw)?;
        let deep_features = self.embedder.extract_embedding(image)?;
        let lbp_histogram = texture_histogram(
            image,
            self.params.lbp(),
            self.params.texture_size,
            &self.texture,
        );

        tracing::debug!(
            distances = landmark_distances.len(),
            embedding_dim = deep_features.dim(),
            texture_bins = lbp_histogram.len(),
            "profile generated"
        );

        Ok(Profile::new(landmark_distances, deep_features, lbp_histogram))
    }
}

/// Score every modality of `stored` against `probe` and fuse the result.
pub fn compare_profiles(
    stored: &Profile,
    probe: &Profile,
    params: &AnalysisParams,
) -> Result<ComparisonResult, AnalysisError> {
    let scores = ModalityScores {
        landmark: compare_distances(
            &stored.landmark_distances,
            &probe.landmark_distances,
            params.landmark_max_difference,
        )?,
        embedding: compare_embeddings(&stored.deep_features, &probe.deep_features)?,
        texture: compare_lbp_histograms(
            &stored.lbp_histogram,
            &probe.lbp_histogram,
            params.lbp_max_distance,
        )?,
    };

    let result = ComparisonResult::from_scores(scores, &params.weights, params.confidence_threshold);
    tracing::debug!(
        landmark = scores.landmark,
        embedding = scores.embedding,
        texture = scores.texture,
        confidence = result.confidence,
        "profiles compared"
    );
    Ok(result)
}
