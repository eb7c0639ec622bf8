//! Overlay rendering of detection results
//!
//! Cascade boxes are drawn green, geometric boxes blue and corroborated
//! boxes red. A corroborated region is drawn once, in red, with an "H+G"
//! label; OCR text is appended to labels when present.

use opencv::{
    core::{Mat, Point, Rect, Scalar},
    imgproc::{get_text_size, put_text, rectangle, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
};

use crate::agreement::iou;
use crate::config::OverlayLayers;
use crate::constants::agreement::IOU_THRESHOLD;
use crate::detection::{DetectionCandidate, DetectionMethod};
use crate::engine::DetectionContext;
use crate::error::{DetectionError, Result};
use crate::preprocess::validate_source;

const BOX_THICKNESS: i32 = 3;
const LABEL_SCALE: f64 = 0.5;
const LABEL_THICKNESS: i32 = 1;

/// BGR color for a candidate's detector
pub fn method_color(method: DetectionMethod) -> Scalar {
    match method {
        DetectionMethod::Cascade => Scalar::new(0.0, 255.0, 0.0, 0.0),
        DetectionMethod::Geometric => Scalar::new(255.0, 0.0, 0.0, 0.0),
    }
}

/// BGR color for corroborated regions
pub fn corroborated_color() -> Scalar {
    Scalar::new(0.0, 0.0, 255.0, 0.0)
}

fn with_ocr(label: &str, ocr: Option<&str>) -> String {
    match ocr {
        Some(text) if !text.is_empty() => format!("{}: {}", label, text),
        _ => label.to_string(),
    }
}

fn overlaps_any(rect: &Rect, confirmed: &[Rect]) -> bool {
    confirmed.iter().any(|c| iou(rect, c) > IOU_THRESHOLD)
}

/// Draw a context's candidates onto a copy of `image`
///
/// `image` must be the BGR source the context was computed from.
pub fn draw_detections(
    image: &Mat,
    context: &DetectionContext,
    layers: OverlayLayers,
) -> Result<Mat> {
    validate_source(image)?;
    let mut canvas = image
        .try_clone()
        .map_err(|e| DetectionError::opencv("copy overlay canvas", e))?;

    let confirmed = &context.high_confidence;
    for candidate in &context.candidates {
        if layers.show_high_confidence && overlaps_any(&candidate.bounds, confirmed) {
            continue;
        }
        let visible = match candidate.method {
            DetectionMethod::Cascade => layers.show_cascade,
            DetectionMethod::Geometric => layers.show_geometric,
        };
        if visible {
            let label = with_ocr(candidate.method.short_label(), candidate.ocr_result.as_deref());
            draw_box(&mut canvas, candidate.bounds, method_color(candidate.method), &label)?;
        }
    }

    if layers.show_high_confidence {
        for rect in confirmed {
            let label = with_ocr("H+G", ocr_for(rect, &context.candidates));
            draw_box(&mut canvas, *rect, corroborated_color(), &label)?;
        }
    }

    Ok(canvas)
}

/// First OCR text among candidates overlapping `rect`
fn ocr_for<'a>(rect: &Rect, candidates: &'a [DetectionCandidate]) -> Option<&'a str> {
    candidates
        .iter()
        .filter(|c| iou(rect, &c.bounds) > IOU_THRESHOLD)
        .find_map(|c| c.ocr_result.as_deref())
}

fn draw_box(canvas: &mut Mat, rect: Rect, color: Scalar, label: &str) -> Result<()> {
    rectangle(canvas, rect, color, BOX_THICKNESS, LINE_8, 0)
        .map_err(|e| DetectionError::opencv("draw detection box", e))?;

    let mut baseline = 0;
    let text_size = get_text_size(
        label,
        FONT_HERSHEY_SIMPLEX,
        LABEL_SCALE,
        LABEL_THICKNESS,
        &mut baseline,
    )
    .map_err(|e| DetectionError::opencv("measure label", e))?;

    // Label tab sits above the box, or inside it at the top image edge
    let tab_height = text_size.height + baseline + 4;
    let tab_y = if rect.y >= tab_height {
        rect.y - tab_height
    } else {
        rect.y
    };
    let tab = Rect::new(rect.x, tab_y, text_size.width + 6, tab_height);

    rectangle(canvas, tab, color, -1, LINE_8, 0)
        .map_err(|e| DetectionError::opencv("draw label tab", e))?;
    put_text(
        canvas,
        label,
        Point::new(tab.x + 3, tab.y + text_size.height + 2),
        FONT_HERSHEY_SIMPLEX,
        LABEL_SCALE,
        Scalar::all(255.0),
        LABEL_THICKNESS,
        LINE_8,
        false,
    )
    .map_err(|e| DetectionError::opencv("draw label text", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Vec3b, VecN, CV_8UC3};

    const GRAY: Vec3b = VecN([128, 128, 128]);
    const RED: Vec3b = VecN([0, 0, 255]);
    const GREEN: Vec3b = VecN([0, 255, 0]);
    const BLUE: Vec3b = VecN([255, 0, 0]);

    fn canvas() -> Mat {
        Mat::new_rows_cols_with_default(300, 400, CV_8UC3, Scalar::all(128.0)).unwrap()
    }

    fn context() -> DetectionContext {
        let candidates = vec![
            DetectionCandidate::new(Rect::new(100, 100, 200, 50), DetectionMethod::Cascade),
            DetectionCandidate::new(Rect::new(105, 102, 195, 48), DetectionMethod::Geometric),
            DetectionCandidate::new(Rect::new(20, 220, 120, 30), DetectionMethod::Geometric),
        ];
        let high_confidence = crate::agreement::find_high_confidence(&candidates);
        DetectionContext {
            artifacts: None,
            candidates,
            high_confidence,
        }
    }

    fn pixel(image: &Mat, row: i32, col: i32) -> Vec3b {
        *image.at_2d::<Vec3b>(row, col).unwrap()
    }

    #[test]
    fn test_corroborated_drawn_red_once() {
        let out = draw_detections(&canvas(), &context(), OverlayLayers::default()).unwrap();

        // Bottom edge of the corroborated box
        assert_eq!(pixel(&out, 149, 200), RED);
        // Left edge of its geometric twin stays undrawn
        assert_eq!(pixel(&out, 125, 105), GRAY);
        // Lone geometric box
        assert_eq!(pixel(&out, 249, 80), BLUE);
    }

    #[test]
    fn test_layers_toggle_colors() {
        let layers = OverlayLayers {
            show_cascade: true,
            show_geometric: false,
            show_high_confidence: false,
        };
        let out = draw_detections(&canvas(), &context(), layers).unwrap();

        assert_eq!(pixel(&out, 149, 200), GREEN);
        assert_eq!(pixel(&out, 249, 80), GRAY);
    }

    #[test]
    fn test_source_untouched() {
        let source = canvas();
        draw_detections(&source, &context(), OverlayLayers::default()).unwrap();
        assert_eq!(pixel(&source, 149, 200), GRAY);
    }

    #[test]
    fn test_label_includes_ocr() {
        assert_eq!(with_ocr("H+G", Some("34ABC123")), "H+G: 34ABC123");
        assert_eq!(with_ocr("G", Some("")), "G");
        assert_eq!(with_ocr("H", None), "H");
    }

    #[test]
    fn test_empty_context_returns_copy() {
        let out = draw_detections(&canvas(), &DetectionContext::empty(), OverlayLayers::default())
            .unwrap();
        assert_eq!((out.cols(), out.rows()), (400, 300));
    }
}
