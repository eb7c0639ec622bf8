//! Cross-detector agreement
//!
//! Marks cascade hits that a geometric candidate independently confirms.
//! Nothing here removes or merges candidates; the result is an annotation
//! over the existing list.

use opencv::core::Rect;
use serde::{Deserialize, Serialize};

use crate::constants::agreement::IOU_THRESHOLD;
use crate::detection::{DetectionCandidate, DetectionMethod};

/// Intersection-over-union of two rectangles
///
/// Symmetric and always in `[0, 1]`; disjoint or empty rectangles give 0.
pub fn iou(a: &Rect, b: &Rect) -> f64 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let intersection = i64::from(x2 - x1) * i64::from(y2 - y1);
    let area_a = i64::from(a.width) * i64::from(a.height);
    let area_b = i64::from(b.width) * i64::from(b.height);
    let union = area_a + area_b - intersection;

    if union <= 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Cascade rectangles confirmed by at least one geometric candidate
///
/// Uses the default IoU threshold. Each cascade rectangle appears once, in
/// candidate order.
pub fn find_high_confidence(candidates: &[DetectionCandidate]) -> Vec<Rect> {
    find_high_confidence_with_threshold(candidates, IOU_THRESHOLD)
}

/// As [`find_high_confidence`] with an explicit IoU threshold (strict `>`)
pub fn find_high_confidence_with_threshold(
    candidates: &[DetectionCandidate],
    threshold: f64,
) -> Vec<Rect> {
    let (cascade, geometric): (Vec<_>, Vec<_>) = candidates
        .iter()
        .partition(|c| c.method == DetectionMethod::Cascade);

    let mut confirmed: Vec<Rect> = Vec::new();
    for hit in cascade {
        let agrees = geometric
            .iter()
            .any(|geo| iou(&hit.bounds, &geo.bounds) > threshold);
        if agrees && !confirmed.contains(&hit.bounds) {
            confirmed.push(hit.bounds);
        }
    }
    confirmed
}

/// Whether `candidate` is part of a corroborated pair
///
/// Cascade candidates match the high-confidence set directly; geometric ones
/// match when they overlap a confirmed rectangle above the threshold.
pub fn is_corroborated(candidate: &DetectionCandidate, high_confidence: &[Rect]) -> bool {
    match candidate.method {
        DetectionMethod::Cascade => high_confidence.contains(&candidate.bounds),
        DetectionMethod::Geometric => high_confidence
            .iter()
            .any(|rect| iou(rect, &candidate.bounds) > IOU_THRESHOLD),
    }
}

/// Per-pass counters shown alongside an overlay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionStats {
    pub cascade: usize,
    pub geometric: usize,
    pub high_confidence: usize,
}

impl DetectionStats {
    pub fn from_candidates(candidates: &[DetectionCandidate], high_confidence: &[Rect]) -> Self {
        let cascade = candidates
            .iter()
            .filter(|c| c.method == DetectionMethod::Cascade)
            .count();
        Self {
            cascade,
            geometric: candidates.len() - cascade,
            high_confidence: high_confidence.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.cascade + self.geometric
    }
}

impl std::fmt::Display for DetectionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Haar: {} | Geo: {} | Overlap: {}",
            self.cascade, self.geometric, self.high_confidence
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cascade(x: i32, y: i32, w: i32, h: i32) -> DetectionCandidate {
        DetectionCandidate::new(Rect::new(x, y, w, h), DetectionMethod::Cascade)
    }

    fn geometric(x: i32, y: i32, w: i32, h: i32) -> DetectionCandidate {
        DetectionCandidate::new(Rect::new(x, y, w, h), DetectionMethod::Geometric)
    }

    #[test]
    fn test_iou_identity_and_disjoint() {
        let a = Rect::new(10, 10, 100, 40);
        assert_eq!(iou(&a, &a), 1.0);
        assert_eq!(iou(&a, &Rect::new(500, 500, 10, 10)), 0.0);
        // Touching edges share no area
        assert_eq!(iou(&a, &Rect::new(110, 10, 50, 40)), 0.0);
    }

    #[test]
    fn test_iou_symmetric_and_bounded() {
        let rects = [
            Rect::new(0, 0, 100, 50),
            Rect::new(50, 25, 100, 50),
            Rect::new(10, 10, 20, 20),
            Rect::new(-20, -10, 60, 30),
            Rect::new(0, 0, 0, 0),
        ];
        for a in &rects {
            for b in &rects {
                let ab = iou(a, b);
                assert_eq!(ab, iou(b, a));
                assert!((0.0..=1.0).contains(&ab));
            }
        }
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 0, 100, 100);
        // 5000 / 15000
        assert!((iou(&a, &b) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_find_high_confidence_scenario() {
        let candidates = vec![
            cascade(100, 100, 200, 50),
            geometric(105, 102, 195, 48),
            geometric(400, 400, 50, 50),
        ];

        let confirmed = find_high_confidence(&candidates);
        assert_eq!(confirmed, vec![Rect::new(100, 100, 200, 50)]);
        assert!(!confirmed.contains(&Rect::new(400, 400, 50, 50)));
    }

    #[test]
    fn test_find_high_confidence_deduplicates() {
        let candidates = vec![
            cascade(100, 100, 200, 50),
            geometric(100, 100, 200, 50),
            geometric(102, 101, 198, 49),
        ];
        assert_eq!(find_high_confidence(&candidates).len(), 1);
    }

    #[test]
    fn test_single_method_has_no_agreement() {
        let only_geo = vec![geometric(0, 0, 100, 25), geometric(0, 0, 100, 25)];
        assert!(find_high_confidence(&only_geo).is_empty());

        let only_cascade = vec![cascade(0, 0, 100, 25)];
        assert!(find_high_confidence(&only_cascade).is_empty());
    }

    #[test]
    fn test_threshold_is_strict() {
        let candidates = vec![cascade(0, 0, 100, 100), geometric(50, 0, 100, 100)];
        assert!(find_high_confidence_with_threshold(&candidates, 1.0 / 3.0).is_empty());
        assert_eq!(find_high_confidence_with_threshold(&candidates, 0.3).len(), 1);
    }

    #[test]
    fn test_is_corroborated() {
        let hit = cascade(100, 100, 200, 50);
        let geo = geometric(105, 102, 195, 48);
        let lone = geometric(400, 400, 50, 50);
        let confirmed = find_high_confidence(&[hit.clone(), geo.clone(), lone.clone()]);

        assert!(is_corroborated(&hit, &confirmed));
        assert!(is_corroborated(&geo, &confirmed));
        assert!(!is_corroborated(&lone, &confirmed));
    }

    #[test]
    fn test_stats() {
        let candidates = vec![
            cascade(100, 100, 200, 50),
            geometric(105, 102, 195, 48),
            geometric(400, 400, 50, 50),
        ];
        let confirmed = find_high_confidence(&candidates);
        let stats = DetectionStats::from_candidates(&candidates, &confirmed);

        assert_eq!(
            stats,
            DetectionStats {
                cascade: 1,
                geometric: 2,
                high_confidence: 1
            }
        );
        assert_eq!(stats.total(), 3);
        assert_eq!(stats.to_string(), "Haar: 1 | Geo: 2 | Overlap: 1");
    }
}
