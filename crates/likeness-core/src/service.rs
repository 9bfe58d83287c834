//! Request flows that combine the store with feature extraction.

use image::DynamicImage;

use crate::config::AnalysisParams;
use crate::error::ServiceError;
use crate::fusion::ComparisonResult;
use crate::lbp::TextureDescriptor;
use crate::profile::{compare_profiles, EmbeddingExtractor, LandmarkDetector, ProfileGenerator};
use crate::store::ProfileStore;

/// Extract a profile from `image` and store it under a fresh id.
pub fn create_profile<L, E, D>(
    store: &ProfileStore,
    generator: &mut ProfileGenerator<L, E, D>,
    image: &DynamicImage,
) -> Result<String, ServiceError>
where
    L: LandmarkDetector,
    E: EmbeddingExtractor,
    D: TextureDescriptor,
{
    let profile = generator.generate_profile(image)?;
    Ok(store.create(profile)?)
}

/// Verify `image` against the stored profile `id`.
///
/// The stored profile is fetched first: an unknown id fails with
/// `NotFound` without running any extractor.
pub fn verify_photo<L, E, D>(
    store: &ProfileStore,
    id: &str,
    generator: &mut ProfileGenerator<L, E, D>,
    image: &DynamicImage,
    params: &AnalysisParams,
) -> Result<ComparisonResult, ServiceError>
where
    L: LandmarkDetector,
    E: EmbeddingExtractor,
    D: TextureDescriptor,
{
    let stored = store.get(id)?;
    let probe = generator.generate_profile(image)?;
    let result = compare_profiles(&stored, &probe, params)?;

    tracing::info!(
        id,
        confidence = result.confidence,
        is_deepfaked = result.is_deepfaked,
        "verification complete"
    );
    Ok(result)
}
