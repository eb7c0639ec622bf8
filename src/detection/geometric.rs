//! Contour-based plate detection
//!
//! Finds plate-shaped regions in the dilated edge map:
//! - external contours only, filtered to a band of the image area
//! - largest first, examining a bounded prefix
//! - polygon approximation, keeping 4 to 6 vertex shapes
//! - bounding-box aspect ratio inside the tunable band
//! - perspective crop for exact quads, padded rectangle otherwise
//!
//! The candidate cap keeps downstream OCR cost bounded on cluttered scenes.

use std::cmp::Ordering;

use opencv::{
    core::{Mat, Point, Point2f, Rect, Vector},
    imgproc::{
        approx_poly_dp, arc_length, bounding_rect, contour_area, find_contours,
        CHAIN_APPROX_SIMPLE, RETR_EXTERNAL,
    },
    prelude::*,
};
use tracing::{debug, instrument};

use crate::config::ParameterSet;
use crate::constants::geometric;
use crate::detection::candidate::{DetectionCandidate, DetectionMethod};
use crate::detection::crop::padded_crop;
use crate::error::{DetectionError, Result};
use crate::perspective::four_point_transform;

type VectorOfPoint = Vector<Point>;

/// Contour paired with its enclosed area
struct ScoredContour {
    contour: VectorOfPoint,
    area: f64,
}

/// Geometric detector with fixed plausibility limits
#[derive(Debug, Clone)]
pub struct GeometricDetector {
    min_area_ratio: f64,
    max_area_ratio: f64,
    max_examined: usize,
    poly_epsilon: f64,
    max_candidates: usize,
    padding: i32,
}

impl Default for GeometricDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometricDetector {
    /// Create a geometric detector with default limits
    pub fn new() -> Self {
        Self {
            min_area_ratio: geometric::MIN_AREA_RATIO,
            max_area_ratio: geometric::MAX_AREA_RATIO,
            max_examined: geometric::MAX_CONTOURS_EXAMINED,
            poly_epsilon: geometric::POLY_APPROX_EPSILON,
            max_candidates: geometric::MAX_CANDIDATES,
            padding: geometric::CROP_PADDING,
        }
    }

    /// Create a detector with custom area band and candidate cap
    pub fn with_limits(min_area_ratio: f64, max_area_ratio: f64, max_candidates: usize) -> Self {
        Self {
            min_area_ratio,
            max_area_ratio,
            max_candidates,
            ..Self::new()
        }
    }

    /// Most candidates one pass may return
    pub fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    /// Detect plate candidates in a dilated edge map
    ///
    /// # Arguments
    ///
    /// * `dilated` - Binary edge map from preprocessing
    /// * `original` - BGR source image the crops are taken from
    /// * `params` - Supplies the aspect-ratio band
    #[instrument(skip_all)]
    pub fn detect(
        &self,
        dilated: &Mat,
        original: &Mat,
        params: &ParameterSet,
    ) -> Result<Vec<DetectionCandidate>> {
        let image_area = f64::from(original.rows()) * f64::from(original.cols());
        let contours = self.plausible_contours(dilated, image_area)?;

        let mut candidates = Vec::new();
        for scored in contours.iter().take(self.max_examined) {
            if candidates.len() >= self.max_candidates {
                break;
            }

            let polygon = self.approximate(&scored.contour)?;
            if !(geometric::MIN_VERTICES..=geometric::MAX_VERTICES).contains(&polygon.len()) {
                continue;
            }

            let bounds = bounding_rect(&polygon)
                .map_err(|e| DetectionError::opencv("bounding rectangle", e))?;
            if bounds.width <= 0 || bounds.height <= 0 {
                continue;
            }

            let aspect = f64::from(bounds.width) / f64::from(bounds.height);
            if !params.accepts_aspect_ratio(aspect) {
                debug!(?bounds, aspect, "Contour rejected by aspect ratio");
                continue;
            }

            let crop = match self.crop(original, &polygon, bounds)? {
                Some(crop) => crop,
                None => continue,
            };

            debug!(
                ?bounds,
                area = scored.area,
                vertices = polygon.len(),
                "Geometric candidate accepted"
            );
            candidates
                .push(DetectionCandidate::new(bounds, DetectionMethod::Geometric).with_crop(crop));
        }

        debug!(
            contours = contours.len(),
            accepted = candidates.len(),
            "Geometric pass finished"
        );
        Ok(candidates)
    }

    /// External contours inside the area band, largest first
    fn plausible_contours(&self, dilated: &Mat, image_area: f64) -> Result<Vec<ScoredContour>> {
        let mut contours = Vector::<VectorOfPoint>::new();
        find_contours(
            dilated,
            &mut contours,
            RETR_EXTERNAL,
            CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )
        .map_err(|e| DetectionError::opencv("contour extraction", e))?;

        let min_area = image_area * self.min_area_ratio;
        let max_area = image_area * self.max_area_ratio;

        let mut scored = Vec::new();
        for contour in contours.iter() {
            let area = contour_area(&contour, false)
                .map_err(|e| DetectionError::opencv("contour area", e))?;
            if area >= min_area && area <= max_area {
                scored.push(ScoredContour { contour, area });
            }
        }

        scored.sort_by(|a, b| b.area.partial_cmp(&a.area).unwrap_or(Ordering::Equal));
        Ok(scored)
    }

    /// Simplify a contour with a perimeter-proportional tolerance
    fn approximate(&self, contour: &VectorOfPoint) -> Result<VectorOfPoint> {
        let perimeter = arc_length(contour, true)
            .map_err(|e| DetectionError::opencv("perimeter calculation", e))?;

        let mut polygon = VectorOfPoint::new();
        approx_poly_dp(contour, &mut polygon, perimeter * self.poly_epsilon, true)
            .map_err(|e| DetectionError::opencv("polygon approximation", e))?;
        Ok(polygon)
    }

    /// Deskewed crop for exact quads, padded rectangle for everything else
    fn crop(&self, original: &Mat, polygon: &VectorOfPoint, bounds: Rect) -> Result<Option<Mat>> {
        if polygon.len() == 4 {
            let quad: Vec<Point2f> = polygon
                .iter()
                .map(|p| Point2f::new(p.x as f32, p.y as f32))
                .collect();
            if let Some(warped) = four_point_transform(original, &quad)? {
                return Ok(Some(warped));
            }
        }
        padded_crop(original, bounds, self.padding)
    }
}
