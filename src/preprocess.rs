//! Image preprocessing for plate detection
//!
//! Turns a BGR vehicle photograph into the single-channel representations the
//! detectors consume, in strict order:
//!
//! 1. grayscale (luma weighting)
//! 2. CLAHE contrast enhancement
//! 3. bilateral smoothing, window = `blur_kernel` (forced odd)
//! 4. Canny edges with the two tunable thresholds
//! 5. closing with a wide, short element to merge character strokes
//! 6. square dilation, `dilate_iterations` times
//!
//! Every stage is kept in [`PreprocessingArtifacts`] for inspection.

use std::path::{Path, PathBuf};

use opencv::{
    core::{AlgorithmHint, Mat, Point, Size, Vector, BORDER_CONSTANT, BORDER_DEFAULT},
    imgcodecs,
    imgproc::{
        bilateral_filter, canny, create_clahe, cvt_color, dilate, get_structuring_element,
        morphology_default_border_value, morphology_ex, COLOR_BGR2GRAY, MORPH_CLOSE, MORPH_RECT,
    },
    prelude::*,
};
use tracing::{debug, instrument};

use crate::config::ParameterSet;
use crate::constants::preprocessing;
use crate::error::{DetectionError, Result};

/// Derived single-channel buffers from one preprocessing call
#[derive(Debug, Clone)]
pub struct PreprocessingArtifacts {
    /// Luma grayscale of the source
    pub gray: Mat,
    /// CLAHE-equalized grayscale
    pub enhanced: Mat,
    /// Bilateral-filtered image
    pub filtered: Mat,
    /// Canny edge map
    pub edges: Mat,
    /// Edge map after horizontal closing
    pub closed: Mat,
    /// Closed map after dilation, input to contour extraction
    pub dilated: Mat,
}

impl PreprocessingArtifacts {
    /// Stage names paired with their buffers, in pipeline order
    pub fn stages(&self) -> [(&'static str, &Mat); 6] {
        [
            ("step1_gray", &self.gray),
            ("step2_enhanced", &self.enhanced),
            ("step3_filtered", &self.filtered),
            ("step4_edges", &self.edges),
            ("step5_closed", &self.closed),
            ("step6_dilated", &self.dilated),
        ]
    }

    /// Write every stage as `<stem>_<stage>.png` into `dir`
    pub fn save_to_dir(&self, dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(6);
        for (stage, mat) in self.stages() {
            let path = dir.join(format!("{}_{}.png", stem, stage));
            write_png(&path, mat)?;
            debug!(path = %path.display(), "Saved preprocessing stage");
            written.push(path);
        }
        Ok(written)
    }
}

/// Write a Mat to disk, failing if the encoder refuses it
pub(crate) fn write_png(path: &Path, mat: &Mat) -> Result<()> {
    let written = imgcodecs::imwrite(&path.to_string_lossy(), mat, &Vector::new())
        .map_err(|e| DetectionError::opencv(format!("write {}", path.display()), e))?;
    if !written {
        return Err(DetectionError::OpenCvError {
            operation: format!("encoder rejected {}", path.display()),
            source: None,
        });
    }
    Ok(())
}

/// Reject images the pipeline cannot run on
pub fn validate_source(image: &Mat) -> Result<()> {
    if image.empty() || image.rows() < 1 || image.cols() < 1 {
        return Err(DetectionError::invalid_input("source image is empty"));
    }
    if image.channels() != 3 {
        return Err(DetectionError::invalid_input(format!(
            "expected a 3-channel BGR image, got {} channel(s)",
            image.channels()
        )));
    }
    Ok(())
}

/// Preprocessor with fixed (non-tunable) stage constants
#[derive(Debug, Clone)]
pub struct Preprocessor {
    clahe_clip_limit: f64,
    clahe_tile_grid: Size,
    sigma_color: f64,
    sigma_space: f64,
    close_kernel: Size,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor {
    /// Create a preprocessor with the standard constants
    pub fn new() -> Self {
        let (tile_cols, tile_rows) = preprocessing::CLAHE_TILE_GRID;
        Self {
            clahe_clip_limit: preprocessing::CLAHE_CLIP_LIMIT,
            clahe_tile_grid: Size::new(tile_cols, tile_rows),
            sigma_color: preprocessing::BILATERAL_SIGMA_COLOR,
            sigma_space: preprocessing::BILATERAL_SIGMA_SPACE,
            close_kernel: Size::new(
                preprocessing::CLOSE_KERNEL_WIDTH,
                preprocessing::CLOSE_KERNEL_HEIGHT,
            ),
        }
    }

    /// Run the full pipeline on a BGR image
    ///
    /// # Errors
    ///
    /// Returns `DetectionError::InvalidInput` before any stage runs if the
    /// image is empty or not 3-channel; backend failures surface as
    /// `DetectionError::OpenCvError`.
    #[instrument(skip_all, fields(width = image.cols(), height = image.rows()))]
    pub fn preprocess(&self, image: &Mat, params: &ParameterSet) -> Result<PreprocessingArtifacts> {
        validate_source(image)?;

        let gray = self.to_gray(image)?;
        let enhanced = self.enhance_contrast(&gray)?;
        let filtered = self.smooth(&enhanced, params.effective_blur_kernel())?;
        let edges = self.detect_edges(&filtered, params)?;
        let closed = self.close_gaps(&edges)?;
        let dilated = self.dilate_edges(
            &closed,
            params.effective_dilate_kernel(),
            params.dilate_iterations.max(0),
        )?;

        debug!(
            blur = params.effective_blur_kernel(),
            canny_low = params.canny_threshold1,
            canny_high = params.canny_threshold2,
            dilate = params.effective_dilate_kernel(),
            iterations = params.dilate_iterations,
            "Preprocessing complete"
        );

        Ok(PreprocessingArtifacts {
            gray,
            enhanced,
            filtered,
            edges,
            closed,
            dilated,
        })
    }

    fn to_gray(&self, image: &Mat) -> Result<Mat> {
        let mut gray = Mat::default();
        cvt_color(image, &mut gray, COLOR_BGR2GRAY, 0, AlgorithmHint::ALGO_HINT_DEFAULT)
            .map_err(|e| DetectionError::opencv("grayscale conversion", e))?;
        Ok(gray)
    }

    fn enhance_contrast(&self, gray: &Mat) -> Result<Mat> {
        let mut clahe = create_clahe(self.clahe_clip_limit, self.clahe_tile_grid)
            .map_err(|e| DetectionError::opencv("CLAHE creation", e))?;

        let mut enhanced = Mat::default();
        clahe
            .apply(gray, &mut enhanced)
            .map_err(|e| DetectionError::opencv("CLAHE equalization", e))?;
        Ok(enhanced)
    }

    fn smooth(&self, enhanced: &Mat, window: i32) -> Result<Mat> {
        let mut filtered = Mat::default();
        bilateral_filter(
            enhanced,
            &mut filtered,
            window,
            self.sigma_color,
            self.sigma_space,
            BORDER_DEFAULT,
        )
        .map_err(|e| DetectionError::opencv("bilateral filter", e))?;
        Ok(filtered)
    }

    fn detect_edges(&self, filtered: &Mat, params: &ParameterSet) -> Result<Mat> {
        let mut edges = Mat::default();
        canny(
            filtered,
            &mut edges,
            f64::from(params.canny_threshold1),
            f64::from(params.canny_threshold2),
            preprocessing::CANNY_APERTURE,
            false,
        )
        .map_err(|e| DetectionError::opencv("Canny edge detection", e))?;
        Ok(edges)
    }

    fn close_gaps(&self, edges: &Mat) -> Result<Mat> {
        let kernel = get_structuring_element(MORPH_RECT, self.close_kernel, Point::new(-1, -1))
            .map_err(|e| DetectionError::opencv("closing kernel creation", e))?;
        let border = morphology_default_border_value()
            .map_err(|e| DetectionError::opencv("morphology border value", e))?;

        let mut closed = Mat::default();
        morphology_ex(
            edges,
            &mut closed,
            MORPH_CLOSE,
            &kernel,
            Point::new(-1, -1),
            1,
            BORDER_CONSTANT,
            border,
        )
        .map_err(|e| DetectionError::opencv("morphological closing", e))?;
        Ok(closed)
    }

    fn dilate_edges(&self, closed: &Mat, kernel_size: i32, iterations: i32) -> Result<Mat> {
        let kernel = get_structuring_element(
            MORPH_RECT,
            Size::new(kernel_size, kernel_size),
            Point::new(-1, -1),
        )
        .map_err(|e| DetectionError::opencv("dilation kernel creation", e))?;
        let border = morphology_default_border_value()
            .map_err(|e| DetectionError::opencv("morphology border value", e))?;

        let mut dilated = Mat::default();
        dilate(
            closed,
            &mut dilated,
            &kernel,
            Point::new(-1, -1),
            iterations,
            BORDER_CONSTANT,
            border,
        )
        .map_err(|e| DetectionError::opencv("dilation", e))?;
        Ok(dilated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::PlateScene;
    use opencv::core::{count_non_zero, Rect, Scalar, CV_8UC1, CV_8UC3};

    fn plain_scene() -> Mat {
        PlateScene::plain(640, 480, Rect::new(224, 216, 192, 48))
            .render()
            .unwrap()
    }

    #[test]
    fn test_artifacts_are_single_channel_and_same_size() {
        let image = plain_scene();
        let artifacts = Preprocessor::new()
            .preprocess(&image, &ParameterSet::default())
            .unwrap();

        for (stage, mat) in artifacts.stages() {
            assert_eq!(mat.channels(), 1, "{} should be single-channel", stage);
            assert_eq!(mat.rows(), 480, "{} height", stage);
            assert_eq!(mat.cols(), 640, "{} width", stage);
        }
    }

    #[test]
    fn test_edges_found_on_plate_border() {
        let image = plain_scene();
        let artifacts = Preprocessor::new()
            .preprocess(&image, &ParameterSet::default())
            .unwrap();

        let edge_pixels = count_non_zero(&artifacts.edges).unwrap();
        let dilated_pixels = count_non_zero(&artifacts.dilated).unwrap();
        assert!(edge_pixels > 0);
        assert!(dilated_pixels >= edge_pixels);
    }

    #[test]
    fn test_uniform_image_has_no_edges() {
        let image =
            Mat::new_rows_cols_with_default(120, 160, CV_8UC3, Scalar::all(128.0)).unwrap();
        let artifacts = Preprocessor::new()
            .preprocess(&image, &ParameterSet::default())
            .unwrap();
        assert_eq!(count_non_zero(&artifacts.edges).unwrap(), 0);
    }

    #[test]
    fn test_even_blur_kernel_accepted() {
        let image = plain_scene();
        let params = ParameterSet {
            blur_kernel: 10,
            dilate_kernel_size: 4,
            dilate_iterations: 0,
            ..ParameterSet::default()
        };
        assert!(Preprocessor::new().preprocess(&image, &params).is_ok());
    }

    #[test]
    fn test_empty_image_is_invalid_input() {
        let result = Preprocessor::new().preprocess(&Mat::default(), &ParameterSet::default());
        assert!(matches!(result, Err(DetectionError::InvalidInput { .. })));
    }

    #[test]
    fn test_single_channel_image_is_invalid_input() {
        let gray = Mat::new_rows_cols_with_default(10, 10, CV_8UC1, Scalar::all(0.0)).unwrap();
        assert!(matches!(
            validate_source(&gray),
            Err(DetectionError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_save_to_dir_writes_every_stage() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = Preprocessor::new()
            .preprocess(&plain_scene(), &ParameterSet::default())
            .unwrap();

        let written = artifacts.save_to_dir(dir.path(), "car").unwrap();
        assert_eq!(written.len(), 6);
        assert!(written.iter().all(|p| p.exists()));
        assert!(dir.path().join("car_step6_dilated.png").exists());
    }
}
