use thiserror::Error;

use crate::onnx::ModelError;
use crate::store::StoreError;

/// Failures raised while extracting or comparing facial features.
///
/// All variants are request-scoped: they abort the current extraction or
/// comparison and never touch store state.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("expected {expected} facial landmarks, got {found}")]
    InvalidLandmarkShape { expected: usize, found: usize },
    #[error("no face detected in image")]
    NoFaceDetected,
    #[error("landmark distance keys differ: {0}")]
    KeyMismatch(String),
    #[error("embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
    #[error("texture histogram length mismatch: {left} vs {right}")]
    HistogramLengthMismatch { left: usize, right: usize },
    #[error("invalid texture histogram: {0}")]
    InvalidHistogram(String),
    #[error("invalid analysis parameters: {0}")]
    InvalidParams(String),
    #[error("model: {0}")]
    Model(#[from] ModelError),
}

/// Errors from the create/verify request flows, which touch both the store
/// and the feature extractors.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}
