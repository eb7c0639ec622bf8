//! Plate candidate detection
//!
//! Two independent detectors propose plate regions:
//! - a trained cascade classifier over the equalized grayscale image
//! - a contour/polygon search over the dilated edge map
//!
//! Both emit [`DetectionCandidate`]s carrying source-image bounds and a crop
//! ready for OCR.

pub mod candidate;
pub mod cascade;
pub mod crop;
pub mod geometric;

pub use candidate::{CandidateSummary, DetectionCandidate, DetectionMethod};
pub use cascade::{detect_cascade, CascadeDetector};
pub use geometric::GeometricDetector;
