//! Page image validation ahead of recognition.

use std::path::Path;

use image::imageops::FilterType;

/// Validate a rasterized page image before handing it to the recognizer.
///
/// Rejects missing, oversized, or degenerate images. Images exceeding the
/// pixel bound in either dimension are downscaled in place, preserving
/// aspect ratio.
pub fn validate_page_image(
    path: &Path,
    max_bytes: u64,
    max_dimension: u32,
) -> Result<(), String> {
    if !path.exists() {
        return Err("image file does not exist".to_string());
    }

    let size = std::fs::metadata(path)
        .map_err(|e| format!("unreadable image metadata: {}", e))?
        .len();
    if size > max_bytes {
        return Err(format!(
            "image too large ({} bytes, max {})",
            size, max_bytes
        ));
    }

    let (width, height) =
        image::image_dimensions(path).map_err(|e| format!("invalid image: {}", e))?;
    if width == 0 || height == 0 {
        return Err("image dimensions are degenerate".to_string());
    }

    if width > max_dimension || height > max_dimension {
        let img = image::open(path).map_err(|e| format!("invalid image: {}", e))?;
        let scaled = img.resize(max_dimension, max_dimension, FilterType::Lanczos3);
        scaled
            .save(path)
            .map_err(|e| format!("failed to save downscaled image: {}", e))?;
        tracing::debug!(
            "downscaled {} from {}x{} to {}x{}",
            path.display(),
            width,
            height,
            scaled.width(),
            scaled.height()
        );
    }

    Ok(())
}
