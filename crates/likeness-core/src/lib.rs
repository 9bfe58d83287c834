//! likeness-core — multi-modal face profile comparison.
//!
//! A profile bundles three feature sets taken from one photo: geometric
//! landmark distances, a deep embedding and a texture (uniform LBP)
//! histogram. Each is compared into a 0–100 confidence and the three are
//! fused by weighted mean into a single threshold-checked verdict.

pub mod config;
pub mod embedding;
pub mod error;
pub mod fusion;
pub mod landmarks;
pub mod lbp;
pub mod onnx;
pub mod profile;
pub mod service;
pub mod store;
pub mod texture;

pub use config::AnalysisParams;
pub use embedding::{compare_embeddings, Embedding};
pub use error::{AnalysisError, ServiceError};
pub use fusion::{fuse, ComparisonResult, FusionWeights, ModalityScores};
pub use landmarks::{compare_distances, extract_landmark_distances, LandmarkDistances, RawLandmarks};
pub use lbp::{TextureDescriptor, UniformLbp};
pub use onnx::{ModelError, OnnxEmbedder, OnnxLandmarker};
pub use profile::{compare_profiles, EmbeddingExtractor, LandmarkDetector, Profile, ProfileGenerator};
pub use store::{IdAllocator, ProfileStore, SequentialAllocator, StoreError, UuidAllocator};
pub use texture::{compare_lbp_histograms, LbpParams, TextureHistogram};
