//! Texture signature: normalized histogram of uniform LBP labels, compared
//! with chi-square distance.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Guards the normalizer against an all-zero histogram and the chi-square
/// term against empty bins.
pub const HISTOGRAM_EPSILON: f64 = 1e-6;

/// Sampling parameters for the uniform LBP descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LbpParams {
    /// Number of circularly symmetric neighbours (P).
    pub points: u32,
    /// Sampling radius in pixels (R).
    pub radius: f64,
}

impl LbpParams {
    /// Histogram length for this descriptor: P uniform labels, the all-zero
    /// label and one catch-all non-uniform label.
    pub fn bins(&self) -> usize {
        self.points as usize + 2
    }
}

impl Default for LbpParams {
    fn default() -> Self {
        Self {
            points: 24,
            radius: 3.0,
        }
    }
}

/// Probability histogram over uniform LBP labels.
///
/// Serialized as a plain array. Deserialization rejects negative and
/// non-finite bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<f64>", try_from = "Vec<f64>")]
pub struct TextureHistogram {
    pub bins: Vec<f64>,
}

impl TextureHistogram {
    /// Build a normalized histogram from a per-pixel label map.
    ///
    /// Labels are expected in `[0, P + 1]`; anything outside is not counted.
    pub fn from_labels(labels: &[u32], params: LbpParams) -> Self {
        let mut counts = vec![0u64; params.bins()];
        for &label in labels {
            if let Some(bin) = counts.get_mut(label as usize) {
                *bin += 1;
            }
        }

        let counts: Vec<f64> = counts.into_iter().map(|c| c as f64).collect();
        let sum: f64 = counts.iter().sum();
        let bins = counts.iter().map(|c| c / (sum + HISTOGRAM_EPSILON)).collect();
        Self { bins }
    }

    /// Wrap already-computed bin values, e.g. a histogram loaded from a
    /// stored profile. Values are not renormalized.
    pub fn from_bins(bins: Vec<f64>) -> Self {
        Self { bins }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Every bin must be finite and non-negative.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        match self
            .bins
            .iter()
            .enumerate()
            .find(|(_, b)| !(b.is_finite() && **b >= 0.0))
        {
            Some((i, b)) => Err(AnalysisError::InvalidHistogram(format!(
                "bin {i} is {b}, expected a finite non-negative value"
            ))),
            None => Ok(()),
        }
    }

    /// True when all bins are non-negative and sum to 1 within `tolerance`.
    pub fn is_normalized(&self, tolerance: f64) -> bool {
        self.bins.iter().all(|&b| b >= 0.0) && (self.bins.iter().sum::<f64>() - 1.0).abs() <= tolerance
    }
}

impl TryFrom<Vec<f64>> for TextureHistogram {
    type Error = AnalysisError;

    fn try_from(bins: Vec<f64>) -> Result<Self, Self::Error> {
        let histogram = Self { bins };
        histogram.validate()?;
        Ok(histogram)
    }
}

impl From<TextureHistogram> for Vec<f64> {
    fn from(histogram: TextureHistogram) -> Self {
        histogram.bins
    }
}

/// Chi-square distance `0.5 * Σ (a - b)² / (a + b + ε)`.
pub fn chi_square_distance(a: &TextureHistogram, b: &TextureHistogram) -> Result<f64, AnalysisError> {
    if a.len() != b.len() {
        return Err(AnalysisError::HistogramLengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    a.validate()?;
    b.validate()?;

    let sum: f64 = a
        .bins
        .iter()
        .zip(b.bins.iter())
        .map(|(x, y)| (x - y).powi(2) / (x + y + HISTOGRAM_EPSILON))
        .sum();
    Ok(0.5 * sum)
}

/// Compare two texture histograms into a 0–100 confidence, clamped at 0 once
/// the chi-square distance reaches `max_distance`.
///
/// Bins must be finite and non-negative; anything else is `InvalidHistogram`.
pub fn compare_lbp_histograms(
    a: &TextureHistogram,
    b: &TextureHistogram,
    max_distance: f64,
) -> Result<f64, AnalysisError> {
    let chi_sq = chi_square_distance(a, b)?;
    Ok((100.0 * (1.0 - chi_sq / max_distance)).clamp(0.0, 100.0))
}
