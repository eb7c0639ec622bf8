//! Tunable parameters for the plate detection pipeline.
//!
//! A [`ParameterSet`] is owned by the caller and handed to the engine for each
//! pass. It can be built programmatically or persisted as JSON:
//!
//! ```no_run
//! use plate_scan::ParameterSet;
//! use std::path::Path;
//!
//! let params = ParameterSet::from_json_file(Path::new("alpr_config.json"))?;
//! let defaults = ParameterSet::default();
//! # Ok::<(), plate_scan::DetectionError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::defaults;
use crate::error::{DetectionError, Result};

/// Per-pass detection parameters.
///
/// Blur and dilate kernel sizes are forced odd at use time; see
/// [`ParameterSet::effective_blur_kernel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
    /// Bilateral filter window size
    pub blur_kernel: i32,

    /// Canny low hysteresis threshold
    pub canny_threshold1: i32,

    /// Canny high hysteresis threshold
    pub canny_threshold2: i32,

    /// Square dilation kernel size
    pub dilate_kernel_size: i32,

    /// Number of dilation passes
    pub dilate_iterations: i32,

    /// Minimum width/height ratio for geometric candidates
    pub min_aspect_ratio: f64,

    /// Maximum width/height ratio for geometric candidates
    pub max_aspect_ratio: f64,

    /// Cascade scale step between pyramid levels (> 1.0)
    pub haar_scale_factor: f64,

    /// Neighbouring hits needed to retain a cascade detection
    pub haar_min_neighbors: i32,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            blur_kernel: defaults::BLUR_KERNEL,
            canny_threshold1: defaults::CANNY_THRESHOLD_1,
            canny_threshold2: defaults::CANNY_THRESHOLD_2,
            dilate_kernel_size: defaults::DILATE_KERNEL_SIZE,
            dilate_iterations: defaults::DILATE_ITERATIONS,
            min_aspect_ratio: defaults::MIN_ASPECT_RATIO,
            max_aspect_ratio: defaults::MAX_ASPECT_RATIO,
            haar_scale_factor: defaults::HAAR_SCALE_FACTOR,
            haar_min_neighbors: defaults::HAAR_MIN_NEIGHBORS,
        }
    }
}

/// Force a kernel size to be odd and at least 1, never shrinking it.
pub fn odd_kernel_size(requested: i32) -> i32 {
    if requested < 1 {
        1
    } else if requested % 2 == 0 {
        requested + 1
    } else {
        requested
    }
}

impl ParameterSet {
    /// Bilateral window size actually used by the preprocessor
    pub fn effective_blur_kernel(&self) -> i32 {
        odd_kernel_size(self.blur_kernel)
    }

    /// Dilation kernel size actually used by the preprocessor
    pub fn effective_dilate_kernel(&self) -> i32 {
        odd_kernel_size(self.dilate_kernel_size)
    }

    /// Check ranges that would make a pass meaningless.
    ///
    /// Threshold ordering (`canny_threshold1 <= canny_threshold2`) is only a
    /// recommendation and is not enforced.
    pub fn validate(&self) -> Result<()> {
        if self.canny_threshold1 < 0 {
            return Err(DetectionError::invalid_parameter(
                "canny_threshold1",
                self.canny_threshold1,
            ));
        }
        if self.canny_threshold2 < 0 {
            return Err(DetectionError::invalid_parameter(
                "canny_threshold2",
                self.canny_threshold2,
            ));
        }
        if self.dilate_iterations < 0 {
            return Err(DetectionError::invalid_parameter(
                "dilate_iterations",
                self.dilate_iterations,
            ));
        }
        if !(self.min_aspect_ratio > 0.0) {
            return Err(DetectionError::invalid_parameter(
                "min_aspect_ratio",
                self.min_aspect_ratio,
            ));
        }
        if !(self.max_aspect_ratio > self.min_aspect_ratio) {
            return Err(DetectionError::invalid_parameter(
                "max_aspect_ratio",
                self.max_aspect_ratio,
            ));
        }
        if !(self.haar_scale_factor > 1.0) {
            return Err(DetectionError::invalid_parameter(
                "haar_scale_factor",
                self.haar_scale_factor,
            ));
        }
        if self.haar_min_neighbors < 0 {
            return Err(DetectionError::invalid_parameter(
                "haar_min_neighbors",
                self.haar_min_neighbors,
            ));
        }
        Ok(())
    }

    /// Whether a width/height ratio lies inside the geometric band
    pub fn accepts_aspect_ratio(&self, ratio: f64) -> bool {
        ratio >= self.min_aspect_ratio && ratio <= self.max_aspect_ratio
    }

    /// Load and validate parameters from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DetectionError::config(format!("cannot read {}", path.display()), e)
        })?;
        let params: Self = serde_json::from_str(&content).map_err(|e| {
            DetectionError::config(format!("cannot parse {}", path.display()), e)
        })?;
        params.validate()?;
        Ok(params)
    }

    /// Save parameters to a JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| DetectionError::config("cannot serialize parameters", e))?;
        std::fs::write(path, json).map_err(|e| {
            DetectionError::config(format!("cannot write {}", path.display()), e)
        })?;
        Ok(())
    }
}

/// Which detection layers an overlay renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayLayers {
    /// Draw cascade candidates (green)
    pub show_cascade: bool,

    /// Draw geometric candidates (blue)
    pub show_geometric: bool,

    /// Draw corroborated candidates (red)
    pub show_high_confidence: bool,
}

impl Default for OverlayLayers {
    fn default() -> Self {
        Self {
            show_cascade: true,
            show_geometric: true,
            show_high_confidence: true,
        }
    }
}
