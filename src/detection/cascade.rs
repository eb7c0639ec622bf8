//! Cascade-classifier plate detection
//!
//! Runs a pretrained multi-scale cascade over a histogram-equalized grayscale
//! image. Raw hits pass a fixed aspect-ratio sanity band (independent of the
//! tunable geometric band) and are cropped, with a small margin, from the
//! original color image so OCR sees full character detail.
//!
//! The cascade path is optional: a missing model disables it without
//! affecting geometric detection.

use std::path::{Path, PathBuf};

use opencv::{
    core::{Mat, Rect, Size, Vector},
    imgproc::equalize_hist,
    objdetect::{CascadeClassifier, CASCADE_SCALE_IMAGE},
    prelude::*,
};
use tracing::{debug, info, instrument};

use crate::config::ParameterSet;
use crate::constants::cascade;
use crate::detection::candidate::{DetectionCandidate, DetectionMethod};
use crate::detection::crop::{clamp_to_image, padded_crop};
use crate::error::{DetectionError, Result};

/// Whether a raw cascade hit has a plausible plate shape
pub fn within_sanity_band(rect: &Rect) -> bool {
    if rect.height <= 0 {
        return false;
    }
    let ratio = f64::from(rect.width) / f64::from(rect.height);
    (cascade::MIN_ASPECT_RATIO..=cascade::MAX_ASPECT_RATIO).contains(&ratio)
}

/// Cascade detector wrapping a loaded OpenCV classifier
pub struct CascadeDetector {
    classifier: CascadeClassifier,
    source: PathBuf,
    min_window: Size,
    max_window: Size,
    padding: i32,
}

impl std::fmt::Debug for CascadeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CascadeDetector")
            .field("source", &self.source)
            .field("min_window", &self.min_window)
            .field("max_window", &self.max_window)
            .field("padding", &self.padding)
            .finish()
    }
}

impl CascadeDetector {
    /// Load a cascade model from an XML file
    ///
    /// # Errors
    ///
    /// Returns `DetectionError::ResourceUnavailable` if the file is missing
    /// or OpenCV cannot parse it.
    pub fn load(path: &Path) -> Result<Self> {
        let unavailable = |reason: String| DetectionError::ResourceUnavailable {
            resource: path.display().to_string(),
            reason,
        };

        if !path.is_file() {
            return Err(unavailable("file not found".into()));
        }

        let classifier = CascadeClassifier::new(&path.to_string_lossy())
            .map_err(|e| unavailable(e.to_string()))?;
        if classifier.empty().map_err(|e| unavailable(e.to_string()))? {
            return Err(unavailable("cascade file could not be parsed".into()));
        }

        info!(path = %path.display(), "Cascade model loaded");

        let (min_w, min_h) = cascade::MIN_WINDOW;
        let (max_w, max_h) = cascade::MAX_WINDOW;
        Ok(Self {
            classifier,
            source: path.to_path_buf(),
            min_window: Size::new(min_w, min_h),
            max_window: Size::new(max_w, max_h),
            padding: cascade::CROP_PADDING,
        })
    }

    /// Detect plate candidates
    ///
    /// `gray` is the grayscale artifact; crops are taken from `original`.
    /// The classifier keeps internal scratch buffers, hence `&mut self`.
    #[instrument(skip_all, fields(model = %self.source.display()))]
    pub fn detect(
        &mut self,
        gray: &Mat,
        original: &Mat,
        params: &ParameterSet,
    ) -> Result<Vec<DetectionCandidate>> {
        let equalized = equalize(gray)?;

        let mut hits = Vector::<Rect>::new();
        self.classifier
            .detect_multi_scale(
                &equalized,
                &mut hits,
                params.haar_scale_factor,
                params.haar_min_neighbors,
                CASCADE_SCALE_IMAGE,
                self.min_window,
                self.max_window,
            )
            .map_err(|e| DetectionError::opencv("cascade multi-scale detection", e))?;

        let candidates = accept_hits(&hits, original, self.padding)?;
        debug!(raw = hits.len(), accepted = candidates.len(), "Cascade pass finished");
        Ok(candidates)
    }
}

/// Turn raw cascade hits into candidates
///
/// Hits outside the sanity band are dropped. Bounds are clamped to the image
/// and the crop is taken from `original` with `padding` on every side,
/// clamped as well.
fn accept_hits(
    hits: &Vector<Rect>,
    original: &Mat,
    padding: i32,
) -> Result<Vec<DetectionCandidate>> {
    let mut candidates = Vec::new();
    for hit in hits.iter() {
        if !within_sanity_band(&hit) {
            debug!(?hit, "Cascade hit outside aspect sanity band");
            continue;
        }
        let bounds = match clamp_to_image(hit, original.cols(), original.rows()) {
            Some(bounds) => bounds,
            None => continue,
        };
        let mut candidate = DetectionCandidate::new(bounds, DetectionMethod::Cascade);
        if let Some(crop) = padded_crop(original, bounds, padding)? {
            candidate = candidate.with_crop(crop);
        }
        candidates.push(candidate);
    }
    Ok(candidates)
}

/// Run the cascade path if a model is available, otherwise yield nothing
pub fn detect_cascade(
    detector: Option<&mut CascadeDetector>,
    gray: &Mat,
    original: &Mat,
    params: &ParameterSet,
) -> Result<Vec<DetectionCandidate>> {
    match detector {
        Some(detector) => detector.detect(gray, original, params),
        None => Ok(Vec::new()),
    }
}

/// Global histogram equalization ahead of the cascade
fn equalize(gray: &Mat) -> Result<Mat> {
    let mut equalized = Mat::default();
    equalize_hist(gray, &mut equalized)
        .map_err(|e| DetectionError::opencv("histogram equalization", e))?;
    Ok(equalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, CV_8UC1, CV_8UC3};

    #[test]
    fn test_sanity_band() {
        assert!(within_sanity_band(&Rect::new(0, 0, 200, 50)));
        assert!(within_sanity_band(&Rect::new(0, 0, 150, 100)));
        assert!(within_sanity_band(&Rect::new(0, 0, 400, 50)));
        assert!(!within_sanity_band(&Rect::new(0, 0, 100, 100)));
        assert!(!within_sanity_band(&Rect::new(0, 0, 500, 50)));
        assert!(!within_sanity_band(&Rect::new(0, 0, 100, 0)));
    }

    #[test]
    fn test_missing_model_is_resource_unavailable() {
        let result = CascadeDetector::load(Path::new("does/not/exist/plates.xml"));
        assert!(matches!(
            result,
            Err(DetectionError::ResourceUnavailable { .. })
        ));
    }

    #[test]
    fn test_garbage_model_is_resource_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xml");
        std::fs::write(&path, "<opencv_storage><nothing/></opencv_storage>").unwrap();

        let result = CascadeDetector::load(&path);
        assert!(matches!(
            result,
            Err(DetectionError::ResourceUnavailable { .. })
        ));
    }

    #[test]
    fn test_absent_detector_yields_empty_list() {
        let gray = Mat::new_rows_cols_with_default(48, 64, CV_8UC1, Scalar::all(0.0)).unwrap();
        let color = Mat::new_rows_cols_with_default(48, 64, CV_8UC3, Scalar::all(0.0)).unwrap();

        let candidates = detect_cascade(None, &gray, &color, &ParameterSet::default()).unwrap();
        assert!(candidates.is_empty());
    }

    fn color_image() -> Mat {
        Mat::new_rows_cols_with_default(240, 320, CV_8UC3, Scalar::all(90.0)).unwrap()
    }

    #[test]
    fn test_accept_hits_drops_out_of_band() {
        let hits = Vector::<Rect>::from_slice(&[
            Rect::new(50, 50, 60, 60),
            Rect::new(20, 20, 300, 30),
        ]);
        let candidates = accept_hits(&hits, &color_image(), cascade::CROP_PADDING).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_accept_hits_pads_crop_from_color_image() {
        let hits = Vector::<Rect>::from_slice(&[Rect::new(100, 100, 120, 40)]);
        let candidates = accept_hits(&hits, &color_image(), cascade::CROP_PADDING).unwrap();
        assert_eq!(candidates.len(), 1);

        let candidate = &candidates[0];
        assert_eq!(candidate.method, DetectionMethod::Cascade);
        assert_eq!(candidate.bounds, Rect::new(100, 100, 120, 40));

        let crop = candidate.cropped_image.as_ref().unwrap();
        assert_eq!(crop.channels(), 3);
        assert_eq!((crop.cols(), crop.rows()), (130, 50));
    }

    #[test]
    fn test_accept_hits_clamps_at_image_corner() {
        // Hangs off the top-left corner
        let hits = Vector::<Rect>::from_slice(&[Rect::new(-10, -5, 100, 40)]);
        let candidates = accept_hits(&hits, &color_image(), cascade::CROP_PADDING).unwrap();
        assert_eq!(candidates.len(), 1);

        let candidate = &candidates[0];
        assert_eq!(candidate.bounds, Rect::new(0, 0, 90, 35));

        // Padding only grows inward from the corner
        let crop = candidate.cropped_image.as_ref().unwrap();
        assert_eq!((crop.cols(), crop.rows()), (95, 40));
    }

    #[test]
    fn test_equalize_preserves_size() {
        let gray = Mat::new_rows_cols_with_default(30, 40, CV_8UC1, Scalar::all(60.0)).unwrap();
        let eq = equalize(&gray).unwrap();
        assert_eq!((eq.cols(), eq.rows()), (40, 30));
    }
}
