//! Tuning constants for plate detection
//!
//! Every fixed plausibility threshold lives here, grouped per component, so
//! the detectors carry no magic numbers in their control flow. Values that
//! callers tune per pass live in [`crate::ParameterSet`] instead.

/// Defaults for the tunable [`crate::ParameterSet`]
pub mod defaults {
    /// Bilateral filter window size
    pub const BLUR_KERNEL: i32 = 11;

    /// Canny hysteresis thresholds
    pub const CANNY_THRESHOLD_1: i32 = 50;
    pub const CANNY_THRESHOLD_2: i32 = 150;

    /// Square dilation kernel and repeat count
    pub const DILATE_KERNEL_SIZE: i32 = 3;
    pub const DILATE_ITERATIONS: i32 = 2;

    /// Geometric aspect-ratio band (width / height)
    pub const MIN_ASPECT_RATIO: f64 = 2.0;
    pub const MAX_ASPECT_RATIO: f64 = 7.0;

    /// Cascade sliding-window scale step and merge threshold
    pub const HAAR_SCALE_FACTOR: f64 = 1.1;
    pub const HAAR_MIN_NEIGHBORS: i32 = 3;
}

/// Preprocessing pipeline constants
pub mod preprocessing {
    /// CLAHE clip limit
    pub const CLAHE_CLIP_LIMIT: f64 = 2.0;

    /// CLAHE tile grid (columns, rows)
    pub const CLAHE_TILE_GRID: (i32, i32) = (8, 8);

    /// Bilateral filter range sigma
    pub const BILATERAL_SIGMA_COLOR: f64 = 17.0;

    /// Bilateral filter spatial sigma
    pub const BILATERAL_SIGMA_SPACE: f64 = 17.0;

    /// Sobel aperture used by Canny
    pub const CANNY_APERTURE: i32 = 3;

    /// Closing element: wide and short, bridges gaps between character strokes
    pub const CLOSE_KERNEL_WIDTH: i32 = 21;
    pub const CLOSE_KERNEL_HEIGHT: i32 = 5;
}

/// Cascade detector constants
pub mod cascade {
    /// Smallest sliding window considered (width, height)
    pub const MIN_WINDOW: (i32, i32) = (80, 20);

    /// Largest sliding window considered (width, height)
    pub const MAX_WINDOW: (i32, i32) = (500, 150);

    /// Sanity band for raw cascade hits, independent of the geometric band
    pub const MIN_ASPECT_RATIO: f64 = 1.5;
    pub const MAX_ASPECT_RATIO: f64 = 8.0;

    /// Margin added around accepted hits before cropping
    pub const CROP_PADDING: i32 = 5;
}

/// Geometric (contour) detector constants
pub mod geometric {
    /// Contour area bounds as fractions of the image area
    pub const MIN_AREA_RATIO: f64 = 0.002;
    pub const MAX_AREA_RATIO: f64 = 0.20;

    /// Largest contours examined per pass
    pub const MAX_CONTOURS_EXAMINED: usize = 50;

    /// Polygon approximation tolerance as a fraction of arc length
    pub const POLY_APPROX_EPSILON: f64 = 0.018;

    /// Accepted vertex counts after approximation
    pub const MIN_VERTICES: usize = 4;
    pub const MAX_VERTICES: usize = 6;

    /// Accepted candidates per pass
    pub const MAX_CANDIDATES: usize = 3;

    /// Padding for the plain rectangular fallback crop
    pub const CROP_PADDING: i32 = 3;
}

/// Perspective correction constants
pub mod perspective {
    /// Minimum warped output size
    pub const MIN_OUTPUT_WIDTH: i32 = 100;
    pub const MIN_OUTPUT_HEIGHT: i32 = 30;

    /// Ordered quads enclosing less area than this are rejected
    pub const MIN_QUAD_AREA: f32 = 1.0;
}

/// Cross-method agreement constants
pub mod agreement {
    /// IoU above which a cascade hit counts as corroborated
    pub const IOU_THRESHOLD: f64 = 0.3;
}
