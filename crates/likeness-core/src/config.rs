//! Calibration constants for comparison and fusion, loadable from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AnalysisError;
use crate::fusion::FusionWeights;
use crate::texture::LbpParams;

/// Largest accepted `texture_size`.
pub const MAX_TEXTURE_SIZE: u32 = 4096;

#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("reading {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("parsing analysis parameters: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] AnalysisError),
}

/// Analysis parameters. Every field has a default, so a TOML file only needs
/// the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    /// Total landmark-distance difference that maps to a confidence of 0.
    pub landmark_max_difference: f64,
    /// LBP neighbour count (P).
    pub lbp_points: u32,
    /// LBP sampling radius (R).
    pub lbp_radius: f64,
    /// Chi-square distance that maps to a texture confidence of 0.
    pub lbp_max_distance: f64,
    /// Side length of the square grayscale crop fed to the texture descriptor.
    pub texture_size: u32,
    pub weights: FusionWeights,
    /// Fused confidence (0–100) below which a photo is flagged.
    pub confidence_threshold: f64,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            landmark_max_difference: 200.0,
            lbp_points: 24,
            lbp_radius: 3.0,
            lbp_max_distance: 20.0,
            texture_size: 128,
            weights: FusionWeights::default(),
            confidence_threshold: 65.0,
        }
    }
}

impl AnalysisParams {
    pub fn lbp(&self) -> LbpParams {
        LbpParams {
            points: self.lbp_points,
            radius: self.lbp_radius,
        }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.landmark_max_difference > 0.0) {
            return Err(AnalysisError::InvalidParams(format!(
                "landmark_max_difference must be positive, got {}",
                self.landmark_max_difference
            )));
        }
        if !(self.lbp_max_distance > 0.0) {
            return Err(AnalysisError::InvalidParams(format!(
                "lbp_max_distance must be positive, got {}",
                self.lbp_max_distance
            )));
        }
        if self.lbp_points == 0 || !(self.lbp_radius > 0.0) {
            return Err(AnalysisError::InvalidParams(format!(
                "lbp_points and lbp_radius must be positive, got P={} R={}",
                self.lbp_points, self.lbp_radius
            )));
        }
        if self.texture_size == 0 || self.texture_size > MAX_TEXTURE_SIZE {
            return Err(AnalysisError::InvalidParams(format!(
                "texture_size must be in 1..={MAX_TEXTURE_SIZE}, got {}",
                self.texture_size
            )));
        }
        if !self.confidence_threshold.is_finite() {
            return Err(AnalysisError::InvalidParams(
                "confidence_threshold must be finite".into(),
            ));
        }
        self.weights.validate()
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ParamsError> {
        let params: Self = toml::from_str(raw)?;
        params.validate()?;
        Ok(params)
    }

    pub fn load(path: &Path) -> Result<Self, ParamsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ParamsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let params = Self::from_toml_str(&raw)?;
        tracing::info!(path = %path.display(), "loaded analysis parameters");
        Ok(params)
    }
}
