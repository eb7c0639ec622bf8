//! # Plate Scan
//!
//! A Rust crate for locating vehicle license plates in photographs.
//!
//! Each detection pass:
//! - Preprocesses the image into grayscale, contrast, edge and morphology maps
//! - Runs an optional trained cascade classifier
//! - Searches the edge map for plate-shaped contours, deskewing exact quads
//! - Marks regions both detectors agree on as high confidence
//!
//! Candidates carry a crop ready for an OCR stage, which may attach its
//! reading afterwards.
//!
//! ## Example
//!
//! ```rust,no_run
//! use plate_scan::{detect_plates, ParameterSet};
//! use std::path::Path;
//!
//! let context = detect_plates(
//!     Path::new("car.jpg"),
//!     ParameterSet::default(),
//!     Some(Path::new("haarcascade_russian_plate_number.xml")),
//! )?;
//! for candidate in &context.candidates {
//!     println!("{}", candidate);
//! }
//! # Ok::<(), plate_scan::DetectionError>(())
//! ```

use std::path::{Path, PathBuf};

use tracing::info;

pub mod agreement;
pub mod annotate;
pub mod config;
pub mod constants;
pub mod detection;
pub mod engine;
pub mod error;
pub mod image_loader;
pub mod perspective;
pub mod preprocess;
pub mod synthetic;

pub use agreement::{find_high_confidence, iou, DetectionStats};
pub use config::{OverlayLayers, ParameterSet};
pub use detection::{CandidateSummary, DetectionCandidate, DetectionMethod};
pub use engine::{DetectionContext, DetectionEngine};
pub use error::{DetectionError, Result};
pub use perspective::{four_point_transform, order_points};
pub use preprocess::PreprocessingArtifacts;

fn build_engine(params: ParameterSet, cascade: Option<&Path>) -> Result<DetectionEngine> {
    match cascade {
        Some(model) => DetectionEngine::with_cascade(params, model),
        None => DetectionEngine::new(params),
    }
}

/// Detect license plates in an image file
///
/// # Arguments
///
/// * `image_path` - Path to the image file
/// * `params` - Tunable detection parameters
/// * `cascade` - Optional cascade model; a missing model only disables the
///   cascade path
///
/// # Errors
///
/// Returns `DetectionError` if:
/// - The image cannot be loaded or decoded
/// - `params` fail validation
/// - An image-processing operation fails
pub fn detect_plates(
    image_path: &Path,
    params: ParameterSet,
    cascade: Option<&Path>,
) -> Result<DetectionContext> {
    let image = image_loader::load_image(image_path)?;
    let mut engine = build_engine(params, cascade)?;
    engine.detect_all(&image)
}

/// Detect plates and write debug images to `out_dir`
///
/// Writes every preprocessing stage plus an annotated overlay named after
/// the input file. Returns the context and the written paths.
pub fn detect_plates_debug(
    image_path: &Path,
    params: ParameterSet,
    cascade: Option<&Path>,
    out_dir: &Path,
) -> Result<(DetectionContext, Vec<PathBuf>)> {
    let image = image_loader::load_image(image_path)?;
    let mut engine = build_engine(params, cascade)?;
    let context = engine.detect_all(&image)?;

    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let mut written = match &context.artifacts {
        Some(artifacts) => artifacts.save_to_dir(out_dir, &stem)?,
        None => Vec::new(),
    };

    std::fs::create_dir_all(out_dir)?;
    let overlay = annotate::draw_detections(&image, &context, OverlayLayers::default())?;
    let overlay_path = out_dir.join(format!("{}_detections.png", stem));
    preprocess::write_png(&overlay_path, &overlay)?;
    written.push(overlay_path);

    info!(
        files = written.len(),
        dir = %out_dir.display(),
        "Debug images written"
    );
    Ok((context, written))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_plates_missing_file() {
        let result = detect_plates(Path::new("no/such/car.jpg"), ParameterSet::default(), None);
        assert!(matches!(result, Err(DetectionError::ImageLoadError { .. })));
    }

    #[test]
    fn test_stats_serialization() {
        let stats = DetectionStats {
            cascade: 1,
            geometric: 2,
            high_confidence: 1,
        };

        let json = serde_json::to_string(&stats).unwrap();
        let deserialized: DetectionStats = serde_json::from_str(&json).unwrap();

        assert_eq!(stats, deserialized);
    }
}
