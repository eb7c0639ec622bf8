//! Synthetic plate scenes
//!
//! Controlled inputs for tests, benchmarks and demos when no real vehicle
//! photographs are at hand: a uniform "car body" background with a light
//! plate region of known position.

use std::path::Path;

use opencv::{
    core::{Mat, Point, Rect, Scalar, Vector, CV_8UC3},
    imgproc::{fill_convex_poly, put_text, rectangle, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
};
use tracing::info;

use crate::error::{DetectionError, Result};
use crate::preprocess::write_png;

const WHITE: f64 = 255.0;
const BLACK: f64 = 0.0;

/// Axis-aligned plate on a flat background
#[derive(Debug, Clone, PartialEq)]
pub struct PlateScene {
    pub width: i32,
    pub height: i32,
    pub plate: Rect,
    /// Background gray level
    pub background: f64,
    /// Black frame thickness, `None` for no frame
    pub border: Option<i32>,
    pub text: Option<String>,
}

impl Default for PlateScene {
    /// 640x480 gray scene with a framed, lettered plate near the bottom
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            plate: Rect::new(200, 300, 240, 80),
            background: 128.0,
            border: Some(2),
            text: Some("34 ABC 123".to_string()),
        }
    }
}

impl PlateScene {
    /// Bare white rectangle on mid-gray, no frame or lettering
    pub fn plain(width: i32, height: i32, plate: Rect) -> Self {
        Self {
            width,
            height,
            plate,
            border: None,
            text: None,
            ..Self::default()
        }
    }

    /// Render as a BGR image
    pub fn render(&self) -> Result<Mat> {
        let mut image = blank(self.width, self.height, self.background)?;

        rectangle(&mut image, self.plate, Scalar::all(WHITE), -1, LINE_8, 0)
            .map_err(|e| DetectionError::opencv("draw plate", e))?;

        if let Some(thickness) = self.border {
            rectangle(&mut image, self.plate, Scalar::all(BLACK), thickness, LINE_8, 0)
                .map_err(|e| DetectionError::opencv("draw plate border", e))?;
        }

        if let Some(text) = &self.text {
            let origin = Point::new(self.plate.x + 20, self.plate.y + 55);
            put_text(
                &mut image,
                text,
                origin,
                FONT_HERSHEY_SIMPLEX,
                1.2,
                Scalar::all(BLACK),
                2,
                LINE_8,
                false,
            )
            .map_err(|e| DetectionError::opencv("draw plate text", e))?;
        }

        Ok(image)
    }

    /// Render and save as an image file
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let image = self.render()?;
        write_png(path, &image)?;
        info!(
            path = %path.display(),
            width = self.width,
            height = self.height,
            "Test image generated"
        );
        Ok(())
    }
}

/// Corners of a plate rotated 10° about the scene center
///
/// The plate spans 35% of the scene width at a 3.6:1 ratio.
pub fn skewed_plate_corners(width: i32, height: i32) -> [Point; 4] {
    let (cx, cy) = (f64::from(width) / 2.0, f64::from(height) / 2.0);
    let half_w = f64::from(width) * 0.35 / 2.0;
    let half_h = half_w / 3.6;
    let (sin, cos) = 10f64.to_radians().sin_cos();

    let corner = |dx: f64, dy: f64| {
        Point::new(
            (cx + dx * cos - dy * sin).round() as i32,
            (cy + dx * sin + dy * cos).round() as i32,
        )
    };

    [
        corner(-half_w, -half_h),
        corner(half_w, -half_h),
        corner(half_w, half_h),
        corner(-half_w, half_h),
    ]
}

/// Gray scene with one rotated white plate
pub fn skewed_plate_scene(width: i32, height: i32) -> Result<Mat> {
    let mut image = blank(width, height, 128.0)?;
    let corners = Vector::<Point>::from_slice(&skewed_plate_corners(width, height));

    fill_convex_poly(&mut image, &corners, Scalar::all(WHITE), LINE_8, 0)
        .map_err(|e| DetectionError::opencv("draw skewed plate", e))?;
    Ok(image)
}

/// Render [`skewed_plate_scene`] and write it as PNG
pub fn write_skewed_plate_scene(path: &Path, width: i32, height: i32) -> Result<()> {
    let image = skewed_plate_scene(width, height)?;
    write_png(path, &image)?;
    info!(
        path = %path.display(),
        width,
        height,
        "Skewed test image generated"
    );
    Ok(())
}

fn blank(width: i32, height: i32, level: f64) -> Result<Mat> {
    if width < 1 || height < 1 {
        return Err(DetectionError::invalid_parameter(
            "scene size",
            format!("{}x{}", width, height),
        ));
    }
    Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(level))
        .map_err(|e| DetectionError::opencv("allocate scene", e))
}
