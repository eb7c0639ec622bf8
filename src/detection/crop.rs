//! Rectangular crops clamped to image bounds

use opencv::{
    core::{Mat, Rect},
    prelude::*,
};

use crate::error::{DetectionError, Result};

/// Intersect `rect` with the `cols` x `rows` image area
///
/// Returns `None` when nothing of the rectangle remains.
pub fn clamp_to_image(rect: Rect, cols: i32, rows: i32) -> Option<Rect> {
    let x1 = rect.x.max(0);
    let y1 = rect.y.max(0);
    let x2 = (rect.x + rect.width).min(cols);
    let y2 = (rect.y + rect.height).min(rows);

    if x2 <= x1 || y2 <= y1 {
        None
    } else {
        Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
    }
}

/// Grow `rect` by `padding` on every side, clamped to the image
pub fn pad_rect(rect: Rect, padding: i32, cols: i32, rows: i32) -> Option<Rect> {
    let padded = Rect::new(
        rect.x - padding,
        rect.y - padding,
        rect.width + 2 * padding,
        rect.height + 2 * padding,
    );
    clamp_to_image(padded, cols, rows)
}

/// Owned copy of the padded region, or `None` if it has no area
pub fn padded_crop(image: &Mat, rect: Rect, padding: i32) -> Result<Option<Mat>> {
    let region = match pad_rect(rect, padding, image.cols(), image.rows()) {
        Some(region) => region,
        None => return Ok(None),
    };

    let crop = Mat::roi(image, region)
        .and_then(|roi| roi.try_clone())
        .map_err(|e| DetectionError::opencv("crop region", e))?;
    Ok(Some(crop))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, CV_8UC3};

    #[test]
    fn test_pad_rect_inside_image() {
        let padded = pad_rect(Rect::new(50, 50, 100, 20), 5, 640, 480).unwrap();
        assert_eq!(padded, Rect::new(45, 45, 110, 30));
    }

    #[test]
    fn test_pad_rect_clamped_at_edges() {
        let padded = pad_rect(Rect::new(2, 1, 100, 20), 5, 104, 480).unwrap();
        assert_eq!(padded, Rect::new(0, 0, 104, 26));
    }

    #[test]
    fn test_clamp_outside_image_is_none() {
        assert!(clamp_to_image(Rect::new(700, 10, 20, 20), 640, 480).is_none());
        assert!(clamp_to_image(Rect::new(10, 10, 0, 20), 640, 480).is_none());
    }

    #[test]
    fn test_padded_crop_is_owned_copy() {
        let image =
            Mat::new_rows_cols_with_default(100, 200, CV_8UC3, Scalar::all(7.0)).unwrap();
        let crop = padded_crop(&image, Rect::new(10, 10, 50, 20), 3)
            .unwrap()
            .unwrap();
        assert_eq!((crop.cols(), crop.rows()), (56, 26));
        assert!(crop.is_continuous());
    }
}
