use std::path::Path;

use image::DynamicImage;

use crate::engine::EngineError;

const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Reject anything that is not a `.jpg`, `.jpeg` or `.png` path.
pub fn check_format(path: &Path) -> Result<(), EngineError> {
    let accepted = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ACCEPTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);

    if accepted {
        Ok(())
    } else {
        Err(EngineError::InvalidImageFormat(path.display().to_string()))
    }
}

/// Check the extension, then decode.
pub fn load_image(path: &Path) -> Result<DynamicImage, EngineError> {
    check_format(path)?;
    let image = image::open(path)?;
    tracing::debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "image decoded"
    );
    Ok(image)
}
