//! Perspective correction of quadrilateral plate regions
//!
//! Maps an arbitrary four-point region of the source image onto an upright
//! rectangle so skewed plates come out deskewed for OCR.
//!
//! Corner ordering uses two scalar keys: `x + y` (min = top-left, max =
//! bottom-right) and `y - x` (min = top-right, max = bottom-left). This holds
//! for quads rotated less than about 45° from the image axes; steeper
//! rotations can be ordered incorrectly. At exactly 45° the keys tie and
//! two roles can land on the same point; such orderings are rejected.

use opencv::{
    core::{Mat, Point2f, Scalar, Size, Vector, BORDER_CONSTANT, DECOMP_LU},
    imgproc::{get_perspective_transform, warp_perspective, INTER_LINEAR},
    prelude::*,
};
use tracing::debug;

use crate::constants::perspective::{MIN_OUTPUT_HEIGHT, MIN_OUTPUT_WIDTH, MIN_QUAD_AREA};
use crate::error::{DetectionError, Result};

/// Corners in canonical order: top-left, top-right, bottom-right, bottom-left
pub type OrderedQuad = [Point2f; 4];

/// Order four unordered points as TL, TR, BR, BL
///
/// # Errors
///
/// Returns `DetectionError::DegenerateGeometry` unless exactly four points
/// are supplied, or when the ordered corners repeat a point or enclose no
/// area.
pub fn order_points(points: &[Point2f]) -> Result<OrderedQuad> {
    if points.len() != 4 {
        return Err(DetectionError::degenerate(format!(
            "expected 4 quad points, got {}",
            points.len()
        )));
    }

    let sum = |p: &Point2f| p.x + p.y;
    let diff = |p: &Point2f| p.y - p.x;
    let missing = || DetectionError::degenerate("empty point set");

    let top_left = points
        .iter()
        .min_by(|a, b| sum(a).total_cmp(&sum(b)))
        .ok_or_else(missing)?;
    let bottom_right = points
        .iter()
        .max_by(|a, b| sum(a).total_cmp(&sum(b)))
        .ok_or_else(missing)?;
    let top_right = points
        .iter()
        .min_by(|a, b| diff(a).total_cmp(&diff(b)))
        .ok_or_else(missing)?;
    let bottom_left = points
        .iter()
        .max_by(|a, b| diff(a).total_cmp(&diff(b)))
        .ok_or_else(missing)?;

    let ordered = [*top_left, *top_right, *bottom_right, *bottom_left];
    check_non_degenerate(&ordered)?;
    Ok(ordered)
}

/// Shoelace area of an ordered quad
fn quad_area(quad: &OrderedQuad) -> f32 {
    let twice: f32 = (0..4)
        .map(|i| {
            let (a, b) = (quad[i], quad[(i + 1) % 4]);
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice.abs() / 2.0
}

fn check_non_degenerate(quad: &OrderedQuad) -> Result<()> {
    for i in 0..4 {
        for j in (i + 1)..4 {
            if quad[i] == quad[j] {
                return Err(DetectionError::degenerate(format!(
                    "corner {:?} assigned to two roles",
                    quad[i]
                )));
            }
        }
    }

    let area = quad_area(quad);
    if area < MIN_QUAD_AREA {
        return Err(DetectionError::degenerate(format!(
            "ordered quad encloses area {area}"
        )));
    }
    Ok(())
}

fn distance(a: Point2f, b: Point2f) -> f32 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// Output size for an ordered quad, before minimum clamping
///
/// Width is the longer of the top and bottom edges, height the longer of the
/// left and right edges.
pub fn raw_output_size(quad: &OrderedQuad) -> (i32, i32) {
    let [tl, tr, br, bl] = *quad;

    let width = distance(tl, tr).max(distance(bl, br));
    let height = distance(tl, bl).max(distance(tr, br));

    (width.round() as i32, height.round() as i32)
}

/// Output size for an ordered quad, clamped to the minimum plate crop
pub fn output_size(quad: &OrderedQuad) -> Size {
    let (width, height) = raw_output_size(quad);
    Size::new(width.max(MIN_OUTPUT_WIDTH), height.max(MIN_OUTPUT_HEIGHT))
}

/// Warp the region bounded by `quad` into an upright crop
///
/// Returns `Ok(None)` when the point set cannot form a quad, so the caller
/// can fall back to a plain rectangular crop.
pub fn four_point_transform(image: &Mat, quad: &[Point2f]) -> Result<Option<Mat>> {
    let ordered = match order_points(quad) {
        Ok(ordered) => ordered,
        Err(err) => {
            debug!(%err, "Skipping perspective transform");
            return Ok(None);
        }
    };

    let size = output_size(&ordered);
    let right = (size.width - 1) as f32;
    let bottom = (size.height - 1) as f32;

    let src = Vector::<Point2f>::from_slice(&ordered);
    let dst = Vector::<Point2f>::from_slice(&[
        Point2f::new(0.0, 0.0),
        Point2f::new(right, 0.0),
        Point2f::new(right, bottom),
        Point2f::new(0.0, bottom),
    ]);

    let homography = get_perspective_transform(&src, &dst, DECOMP_LU)
        .map_err(|e| DetectionError::opencv("homography computation", e))?;

    let mut warped = Mat::default();
    warp_perspective(
        image,
        &mut warped,
        &homography,
        size,
        INTER_LINEAR,
        BORDER_CONSTANT,
        Scalar::default(),
    )
    .map_err(|e| DetectionError::opencv("perspective warp", e))?;

    debug!(width = size.width, height = size.height, "Perspective crop produced");
    Ok(Some(warped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Vec3b, CV_8UC3};

    fn pt(x: f32, y: f32) -> Point2f {
        Point2f::new(x, y)
    }

    /// All 24 orderings of four items
    fn permutations(points: [Point2f; 4]) -> Vec<[Point2f; 4]> {
        let mut out = Vec::new();
        for a in 0..4 {
            for b in 0..4 {
                for c in 0..4 {
                    for d in 0..4 {
                        let idx = [a, b, c, d];
                        let mut seen = [false; 4];
                        if idx.iter().all(|&i| !std::mem::replace(&mut seen[i], true)) {
                            out.push([points[a], points[b], points[c], points[d]]);
                        }
                    }
                }
            }
        }
        out
    }

    #[test]
    fn test_order_points_every_permutation() {
        let corners = [pt(0.0, 0.0), pt(10.0, 0.0), pt(10.0, 5.0), pt(0.0, 5.0)];
        let perms = permutations(corners);
        assert_eq!(perms.len(), 24);

        for perm in perms {
            let ordered = order_points(&perm).unwrap();
            assert_eq!(ordered, corners, "input order {:?}", perm);
        }
    }

    #[test]
    fn test_order_points_moderate_rotation() {
        // Quad tilted ~10 degrees
        let tl = pt(20.0, 30.0);
        let tr = pt(218.0, 65.0);
        let br = pt(208.0, 124.0);
        let bl = pt(10.0, 89.0);

        let ordered = order_points(&[br, tl, bl, tr]).unwrap();
        assert_eq!(ordered, [tl, tr, br, bl]);
    }

    #[test]
    fn test_order_points_rejects_wrong_count() {
        let three = [pt(0.0, 0.0), pt(1.0, 0.0), pt(1.0, 1.0)];
        assert!(matches!(
            order_points(&three),
            Err(DetectionError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_order_points_rejects_diamond() {
        // Both sort keys tie, so bottom-right and bottom-left collapse
        let diamond = [pt(0.0, 5.0), pt(5.0, 0.0), pt(10.0, 5.0), pt(5.0, 10.0)];
        assert!(matches!(
            order_points(&diamond),
            Err(DetectionError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_order_points_rejects_collinear_points() {
        let line = [pt(0.0, 0.0), pt(10.0, 10.0), pt(20.0, 20.0), pt(30.0, 30.0)];
        assert!(order_points(&line).is_err());
    }

    #[test]
    fn test_quad_area_of_rectangle() {
        let quad = [pt(0.0, 0.0), pt(10.0, 0.0), pt(10.0, 5.0), pt(0.0, 5.0)];
        assert_eq!(quad_area(&quad), 50.0);
    }

    #[test]
    fn test_raw_output_size_axis_aligned() {
        let quad = [pt(0.0, 0.0), pt(300.0, 0.0), pt(300.0, 80.0), pt(0.0, 80.0)];
        assert_eq!(raw_output_size(&quad), (300, 80));
    }

    #[test]
    fn test_raw_output_size_uses_longer_edges() {
        let quad = [pt(10.0, 20.0), pt(310.0, 30.0), pt(300.0, 120.0), pt(0.0, 110.0)];
        let (width, height) = raw_output_size(&quad);
        assert!(width >= 300);
        assert!(height >= 90);
    }

    #[test]
    fn test_output_size_clamped_to_minimum() {
        let quad = [pt(0.0, 0.0), pt(10.0, 0.0), pt(10.0, 5.0), pt(0.0, 5.0)];
        let size = output_size(&quad);
        assert_eq!(size.width, MIN_OUTPUT_WIDTH);
        assert_eq!(size.height, MIN_OUTPUT_HEIGHT);
    }

    #[test]
    fn test_transform_axis_aligned_rectangle_keeps_dimensions() {
        let image =
            Mat::new_rows_cols_with_default(300, 400, CV_8UC3, Scalar::all(90.0)).unwrap();
        let quad = [pt(50.0, 100.0), pt(250.0, 100.0), pt(250.0, 160.0), pt(50.0, 160.0)];

        let warped = four_point_transform(&image, &quad).unwrap().unwrap();
        assert_eq!(warped.cols(), 200);
        assert_eq!(warped.rows(), 60);
        assert_eq!(warped.channels(), 3);

        let center: &Vec3b = warped.at_2d(30, 100).unwrap();
        assert_eq!(center[0], 90);
    }

    #[test]
    fn test_transform_never_below_minimum() {
        let image =
            Mat::new_rows_cols_with_default(100, 100, CV_8UC3, Scalar::all(0.0)).unwrap();
        let quad = [pt(0.0, 0.0), pt(10.0, 0.0), pt(10.0, 5.0), pt(0.0, 5.0)];

        let warped = four_point_transform(&image, &quad).unwrap().unwrap();
        assert!(warped.cols() >= MIN_OUTPUT_WIDTH);
        assert!(warped.rows() >= MIN_OUTPUT_HEIGHT);
    }

    #[test]
    fn test_transform_with_too_few_points_returns_none() {
        let image =
            Mat::new_rows_cols_with_default(100, 100, CV_8UC3, Scalar::all(0.0)).unwrap();
        let quad = [pt(0.0, 0.0), pt(10.0, 0.0), pt(10.0, 5.0)];
        assert!(four_point_transform(&image, &quad).unwrap().is_none());
    }

    #[test]
    fn test_transform_of_diamond_returns_none() {
        let image =
            Mat::new_rows_cols_with_default(100, 100, CV_8UC3, Scalar::all(0.0)).unwrap();
        let diamond = [pt(0.0, 5.0), pt(5.0, 0.0), pt(10.0, 5.0), pt(5.0, 10.0)];
        assert!(four_point_transform(&image, &diamond).unwrap().is_none());
    }
}
