//! Detection candidates shared by both detectors

use std::fmt;

use opencv::core::{Mat, Rect};
use serde::{Deserialize, Serialize};

use crate::agreement::iou;

/// Which detector produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    /// Trained cascade classifier
    Cascade,
    /// Contour / polygon geometry
    Geometric,
}

impl DetectionMethod {
    /// Human-readable detector name
    pub fn display_name(&self) -> &'static str {
        match self {
            DetectionMethod::Cascade => "Haar Cascade",
            DetectionMethod::Geometric => "Geometric/Contour",
        }
    }

    /// Single-letter overlay label
    pub fn short_label(&self) -> &'static str {
        match self {
            DetectionMethod::Cascade => "H",
            DetectionMethod::Geometric => "G",
        }
    }
}

/// A plate region proposed by one detector
///
/// `bounds` is in source-image coordinates. `confidence` is a policy value
/// (1.0 unless a detector assigns otherwise), not a probability. The OCR
/// collaborator fills `ocr_result` after the pass.
#[derive(Debug, Clone)]
pub struct DetectionCandidate {
    pub bounds: Rect,
    pub method: DetectionMethod,
    pub confidence: f64,
    pub cropped_image: Option<Mat>,
    pub ocr_result: Option<String>,
}

impl DetectionCandidate {
    /// New candidate with default confidence and no crop
    pub fn new(bounds: Rect, method: DetectionMethod) -> Self {
        Self {
            bounds,
            method,
            confidence: 1.0,
            cropped_image: None,
            ocr_result: None,
        }
    }

    /// Attach the crop handed to OCR
    pub fn with_crop(mut self, crop: Mat) -> Self {
        self.cropped_image = Some(crop);
        self
    }

    pub fn set_ocr_result(&mut self, text: impl Into<String>) {
        self.ocr_result = Some(text.into());
    }

    /// Width / height of the bounds, 0.0 for zero-height bounds
    pub fn aspect_ratio(&self) -> f64 {
        if self.bounds.height > 0 {
            f64::from(self.bounds.width) / f64::from(self.bounds.height)
        } else {
            0.0
        }
    }

    /// IoU of the two candidates' bounds
    pub fn iou(&self, other: &DetectionCandidate) -> f64 {
        iou(&self.bounds, &other.bounds)
    }

    /// Whether the two candidates overlap by more than `threshold` IoU
    pub fn overlaps(&self, other: &DetectionCandidate, threshold: f64) -> bool {
        self.iou(other) > threshold
    }
}

impl fmt::Display for DetectionCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DetectionCandidate{{method={:?}, bounds=[{},{},{}x{}], ocr='{}'}}",
            self.method,
            self.bounds.x,
            self.bounds.y,
            self.bounds.width,
            self.bounds.height,
            self.ocr_result.as_deref().unwrap_or("N/A")
        )
    }
}

/// Serializable view of a candidate for export collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub method: DetectionMethod,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub confidence: f64,
    /// Confirmed by both detectors
    pub corroborated: bool,
    pub ocr_result: Option<String>,
}

impl CandidateSummary {
    pub fn new(candidate: &DetectionCandidate, corroborated: bool) -> Self {
        Self {
            method: candidate.method,
            x: candidate.bounds.x,
            y: candidate.bounds.y,
            width: candidate.bounds.width,
            height: candidate.bounds.height,
            confidence: candidate.confidence,
            corroborated,
            ocr_result: candidate.ocr_result.clone(),
        }
    }
}
