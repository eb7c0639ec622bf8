//! Decoding of vehicle photographs into the engine's pixel buffer
//!
//! The detection engine only consumes decoded buffers. This module is the
//! convenience collaborator that turns a file on disk into one: a BGR,
//! 8-bit, 3-channel OpenCV `Mat`.
//!
//! Standard formats are decoded with the `image` crate. HEIC/HEIF (common for
//! phone photos) is decoded with `libheif-rs` when the `heic` feature is on.
//! EXIF orientation is not applied.

use crate::error::{DetectionError, Result};
use opencv::core::Mat;
use std::path::Path;

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// JPEG image
    Jpeg,
    /// PNG image
    Png,
    /// BMP image
    Bmp,
    /// TIFF image
    Tiff,
    /// WebP image
    WebP,
    /// HEIC/HEIF image (Apple)
    Heic,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<ImageFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "bmp" => Some(ImageFormat::Bmp),
            "tiff" | "tif" => Some(ImageFormat::Tiff),
            "webp" => Some(ImageFormat::WebP),
            "heic" | "heif" => Some(ImageFormat::Heic),
            _ => None,
        }
    }

    /// Check if format requires libheif
    pub fn requires_heif(&self) -> bool {
        matches!(self, ImageFormat::Heic)
    }
}

/// Load an image from disk as a BGR `Mat`
///
/// # Errors
///
/// Returns `DetectionError::ImageLoadError` if the extension is unknown, the
/// file cannot be opened, or decoding fails.
///
/// # Example
///
/// ```rust,no_run
/// use plate_scan::image_loader::load_image;
/// use opencv::prelude::*;
/// use std::path::Path;
///
/// let mat = load_image(Path::new("car.jpg"))?;
/// println!("Loaded image: {}x{}", mat.cols(), mat.rows());
/// # Ok::<(), plate_scan::DetectionError>(())
/// ```
pub fn load_image(path: &Path) -> Result<Mat> {
    let format = ImageFormat::from_extension(path).ok_or_else(|| DetectionError::ImageLoadError {
        message: format!("Unknown image format for file: {}", path.display()),
        source: None,
    })?;

    if format.requires_heif() {
        load_heic(path)
    } else {
        load_standard(path)
    }
}

/// Load image using the `image` crate (standard formats)
fn load_standard(path: &Path) -> Result<Mat> {
    use image::ImageReader;

    let reader = ImageReader::open(path).map_err(|e| {
        DetectionError::image_load(format!("Failed to open image file: {}", path.display()), e)
    })?;

    let img = reader.decode().map_err(|e| {
        DetectionError::image_load(format!("Failed to decode image: {}", path.display()), e)
    })?;

    from_rgb_image(&img.to_rgb8())
}

/// Load HEIC/HEIF image using libheif
#[cfg(feature = "heic")]
fn load_heic(path: &Path) -> Result<Mat> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let lib_heif = LibHeif::new();

    let path_str = path.to_str().ok_or_else(|| DetectionError::ImageLoadError {
        message: "Invalid file path encoding".into(),
        source: None,
    })?;

    let ctx = HeifContext::read_from_file(path_str).map_err(|e| {
        DetectionError::image_load(format!("Failed to read HEIC file: {}", path.display()), e)
    })?;

    let handle = ctx
        .primary_image_handle()
        .map_err(|e| DetectionError::image_load("Failed to get primary image handle", e))?;

    let image = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| DetectionError::image_load("Failed to decode HEIC image", e))?;

    let planes = image.planes();
    let rgb_plane = planes.interleaved.ok_or_else(|| DetectionError::ImageLoadError {
        message: "HEIC image has no interleaved RGB data".into(),
        source: None,
    })?;

    let width = handle.width() as usize;
    let height = handle.height() as usize;
    let stride = rgb_plane.stride as usize;
    let row_bytes = width * 3;

    // Rows may carry stride padding
    let mut rgb_data = Vec::with_capacity(row_bytes * height);
    for row in 0..height {
        let start = row * stride;
        rgb_data.extend_from_slice(&rgb_plane.data[start..start + row_bytes]);
    }

    rgb_to_bgr_mat(&rgb_data, width as i32, height as i32)
}

#[cfg(not(feature = "heic"))]
fn load_heic(path: &Path) -> Result<Mat> {
    Err(DetectionError::ImageLoadError {
        message: format!(
            "HEIC support is disabled (enable the `heic` feature): {}",
            path.display()
        ),
        source: None,
    })
}

/// Convert an already-decoded RGB image into a BGR `Mat`
pub fn from_rgb_image(image: &image::RgbImage) -> Result<Mat> {
    let (width, height) = image.dimensions();
    rgb_to_bgr_mat(image.as_raw(), width as i32, height as i32)
}

/// Convert RGB byte buffer to OpenCV BGR Mat
fn rgb_to_bgr_mat(rgb_data: &[u8], width: i32, height: i32) -> Result<Mat> {
    use opencv::core::{Scalar, Vec3b, CV_8UC3};
    use opencv::prelude::MatTrait;

    let expected = (width as usize) * (height as usize) * 3;
    if width <= 0 || height <= 0 || rgb_data.len() < expected {
        return Err(DetectionError::invalid_input(format!(
            "RGB buffer of {} bytes does not hold a {}x{} image",
            rgb_data.len(),
            width,
            height
        )));
    }

    let mut mat = Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(0.0))
        .map_err(|e| DetectionError::opencv("allocate BGR image", e))?;

    for (idx, rgb) in rgb_data[..expected].chunks_exact(3).enumerate() {
        let y = idx as i32 / width;
        let x = idx as i32 % width;
        let pixel = mat
            .at_2d_mut::<Vec3b>(y, x)
            .map_err(|e| DetectionError::opencv("write BGR pixel", e))?;
        pixel[0] = rgb[2];
        pixel[1] = rgb[1];
        pixel[2] = rgb[0];
    }

    Ok(mat)
}

/// Get list of all supported file extensions
pub fn supported_extensions() -> &'static [&'static str] {
    &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp", "heic", "heif"]
}

/// Check if a file extension is supported
pub fn is_supported_extension(ext: &str) -> bool {
    let ext_lower = ext.to_lowercase();
    supported_extensions().contains(&ext_lower.as_str())
}
