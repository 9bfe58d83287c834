//! ONNX Runtime backed feature extractors.
//!
//! `OnnxEmbedder` runs a FaceNet (InceptionResnetV1, vggface2) export and
//! `OnnxLandmarker` a 68-point landmark regressor. Both take a whole decoded
//! image and resize it to the model input; no face alignment is done.

use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use thiserror::Error;

use crate::embedding::Embedding;
use crate::error::AnalysisError;
use crate::landmarks::{RawLandmarks, LANDMARK_COUNT};
use crate::profile::{EmbeddingExtractor, LandmarkDetector};

// --- FaceNet ---
const FACENET_INPUT_SIZE: u32 = 160;
const FACENET_MEAN: f32 = 0.5;
const FACENET_STD: f32 = 0.5;

// --- 68-point landmark regressor ---
const LANDMARK_INPUT_SIZE: u32 = 112;
/// Landmarks are reported in a 160x160 frame regardless of the source image
/// size; the landmark distance normalization constant assumes this scale.
const LANDMARK_FRAME_SIZE: f64 = 160.0;
const LANDMARK_FACE_SCORE_THRESHOLD: f32 = 0.5;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model file not found: {0} — place the ONNX export in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

fn load_session(model_path: &str) -> Result<Session, ModelError> {
    if !Path::new(model_path).exists() {
        return Err(ModelError::ModelNotFound(model_path.to_string()));
    }

    let session = Session::builder()?
        .with_intra_threads(2)?
        .commit_from_file(model_path)?;
    Ok(session)
}

/// Resize to `size`x`size` RGB and lay out as a NCHW float tensor, mapping
/// each channel value through `normalize`.
fn rgb_tensor(image: &DynamicImage, size: u32, normalize: impl Fn(u8) -> f32) -> Array4<f32> {
    let rgb = image::imageops::resize(&image.to_rgb8(), size, size, FilterType::Triangle);
    let s = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, s, s));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..3 {
            tensor[[0, c, y, x]] = normalize(pixel[c]);
        }
    }

    tensor
}

/// FaceNet embedding extractor.
pub struct OnnxEmbedder {
    session: Session,
}

impl OnnxEmbedder {
    pub fn load(model_path: &str) -> Result<Self, ModelError> {
        let session = load_session(model_path)?;
        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded FaceNet model"
        );
        Ok(Self { session })
    }

    fn preprocess(image: &DynamicImage) -> Array4<f32> {
        rgb_tensor(image, FACENET_INPUT_SIZE, |v| {
            (v as f32 / 255.0 - FACENET_MEAN) / FACENET_STD
        })
    }

    fn embed(&mut self, image: &DynamicImage) -> Result<Embedding, ModelError> {
        let input = Self::preprocess(image);
        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::InferenceFailed(format!("embedding extraction: {e}")))?;

        if raw_data.is_empty() {
            return Err(ModelError::InferenceFailed("model returned an empty embedding".into()));
        }

        Ok(Embedding::new(raw_data.iter().map(|&v| v as f64).collect()))
    }
}

impl EmbeddingExtractor for OnnxEmbedder {
    fn extract_embedding(&mut self, image: &DynamicImage) -> Result<Embedding, AnalysisError> {
        Ok(self.embed(image)?)
    }
}

/// 68-point landmark regressor.
///
/// Output 0 holds 136 values: (x, y) pairs normalized to [0, 1]. An optional
/// output 1 holds a face score; a score below 0.5 means no face.
pub struct OnnxLandmarker {
    session: Session,
    has_face_score: bool,
}

impl OnnxLandmarker {
    pub fn load(model_path: &str) -> Result<Self, ModelError> {
        let session = load_session(model_path)?;
        let has_face_score = session.outputs().len() > 1;
        tracing::info!(
            path = model_path,
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            has_face_score,
            "loaded landmark model"
        );
        Ok(Self {
            session,
            has_face_score,
        })
    }

    fn preprocess(image: &DynamicImage) -> Array4<f32> {
        rgb_tensor(image, LANDMARK_INPUT_SIZE, |v| v as f32 / 255.0)
    }

    /// Raw coordinate output and optional face score.
    fn infer(&mut self, image: &DynamicImage) -> Result<(Vec<f32>, Option<f32>), ModelError> {
        let input = Self::preprocess(image);
        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, coords) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::InferenceFailed(format!("landmark coordinates: {e}")))?;
        let coords = coords.to_vec();

        let score = if self.has_face_score {
            let (_, score) = outputs[1]
                .try_extract_tensor::<f32>()
                .map_err(|e| ModelError::InferenceFailed(format!("face score: {e}")))?;
            score.first().copied()
        } else {
            None
        };

        Ok((coords, score))
    }
}

/// Map normalized (x, y) pairs into the landmark frame.
fn decode_landmarks(coords: &[f32]) -> Result<RawLandmarks, AnalysisError> {
    if coords.len() != LANDMARK_COUNT * 2 {
        return Err(AnalysisError::InvalidLandmarkShape {
            expected: LANDMARK_COUNT,
            found: coords.len() / 2,
        });
    }

    let points = coords
        .chunks_exact(2)
        .map(|xy| (xy[0] as f64 * LANDMARK_FRAME_SIZE, xy[1] as f64 * LANDMARK_FRAME_SIZE))
        .collect();
    Ok(RawLandmarks::new(points))
}

impl LandmarkDetector for OnnxLandmarker {
    fn detect_landmarks(&mut self, image: &DynamicImage) -> Result<RawLandmarks, AnalysisError> {
        let (coords, score) = self.infer(image)?;
        if let Some(score) = score {
            if score < LANDMARK_FACE_SCORE_THRESHOLD {
                tracing::debug!(score, "landmark model reports no face");
                return Err(AnalysisError::NoFaceDetected);
            }
        }
        decode_landmarks(&coords)
    }
}
