//! Detection orchestration
//!
//! [`DetectionEngine`] runs one pass: preprocess, both detectors, agreement.
//! Each pass returns its own [`DetectionContext`]; the engine keeps no
//! per-image state between calls. Use one engine per thread.

use std::path::Path;

use opencv::core::{Mat, Rect};
use tracing::{info, instrument, warn};

use crate::agreement::{find_high_confidence, is_corroborated, DetectionStats};
use crate::config::ParameterSet;
use crate::detection::{
    detect_cascade, CandidateSummary, CascadeDetector, DetectionCandidate, DetectionMethod,
    GeometricDetector,
};
use crate::error::{DetectionError, Result};
use crate::preprocess::{PreprocessingArtifacts, Preprocessor};

/// Everything one detection pass produced
#[derive(Debug, Clone, Default)]
pub struct DetectionContext {
    /// Intermediate buffers, `None` when the input was rejected
    pub artifacts: Option<PreprocessingArtifacts>,
    /// Cascade candidates first, then geometric ones
    pub candidates: Vec<DetectionCandidate>,
    /// Cascade rectangles confirmed by a geometric candidate
    pub high_confidence: Vec<Rect>,
}

impl DetectionContext {
    /// Context for a pass that found nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// No candidates, which means "plate not found", not failure
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates_by(
        &self,
        method: DetectionMethod,
    ) -> impl Iterator<Item = &DetectionCandidate> {
        self.candidates.iter().filter(move |c| c.method == method)
    }

    /// Mutable access for attaching OCR results
    pub fn candidates_mut(&mut self) -> &mut [DetectionCandidate] {
        &mut self.candidates
    }

    pub fn is_high_confidence(&self, candidate: &DetectionCandidate) -> bool {
        is_corroborated(candidate, &self.high_confidence)
    }

    pub fn stats(&self) -> DetectionStats {
        DetectionStats::from_candidates(&self.candidates, &self.high_confidence)
    }

    /// Serializable per-candidate view
    pub fn summaries(&self) -> Vec<CandidateSummary> {
        self.candidates
            .iter()
            .map(|c| CandidateSummary::new(c, self.is_high_confidence(c)))
            .collect()
    }
}

/// Plate detection engine
///
/// Holds the tunable parameters and both detectors. The cascade path is
/// optional; without a model only geometric detection runs.
#[derive(Debug)]
pub struct DetectionEngine {
    params: ParameterSet,
    preprocessor: Preprocessor,
    cascade: Option<CascadeDetector>,
    geometric: GeometricDetector,
}

impl DetectionEngine {
    /// Engine with geometric detection only
    ///
    /// # Errors
    ///
    /// Returns `DetectionError::InvalidParameter` if `params` fail validation.
    pub fn new(params: ParameterSet) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            preprocessor: Preprocessor::new(),
            cascade: None,
            geometric: GeometricDetector::new(),
        })
    }

    /// Engine with the cascade model at `model_path`
    ///
    /// A missing or unreadable model is reported once here and disables the
    /// cascade path for the life of the engine; construction still succeeds.
    pub fn with_cascade(params: ParameterSet, model_path: &Path) -> Result<Self> {
        let mut engine = Self::new(params)?;
        engine.cascade = match CascadeDetector::load(model_path) {
            Ok(detector) => Some(detector),
            Err(err @ DetectionError::ResourceUnavailable { .. }) => {
                warn!(%err, "Cascade detection disabled; continuing with geometric detection only");
                None
            }
            Err(err) => return Err(err),
        };
        Ok(engine)
    }

    /// Replace the geometric detector (custom area band or cap)
    pub fn with_geometric(mut self, geometric: GeometricDetector) -> Self {
        self.geometric = geometric;
        self
    }

    pub fn has_cascade(&self) -> bool {
        self.cascade.is_some()
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Re-parameterize subsequent passes
    pub fn set_params(&mut self, params: ParameterSet) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// Run preprocessing alone
    pub fn preprocess(&self, image: &Mat) -> Result<PreprocessingArtifacts> {
        self.preprocessor.preprocess(image, &self.params)
    }

    /// Run a full detection pass
    ///
    /// An empty or non-BGR image yields an empty context, not an error.
    /// Backend failures propagate.
    #[instrument(skip_all, fields(cascade = self.cascade.is_some()))]
    pub fn detect_all(&mut self, image: &Mat) -> Result<DetectionContext> {
        let artifacts = match self.preprocessor.preprocess(image, &self.params) {
            Ok(artifacts) => artifacts,
            Err(DetectionError::InvalidInput { reason }) => {
                warn!(%reason, "Skipping detection pass");
                return Ok(DetectionContext::empty());
            }
            Err(err) => return Err(err),
        };

        let mut candidates =
            detect_cascade(self.cascade.as_mut(), &artifacts.gray, image, &self.params)?;
        candidates.extend(self.geometric.detect(&artifacts.dilated, image, &self.params)?);

        let high_confidence = find_high_confidence(&candidates);
        let context = DetectionContext {
            artifacts: Some(artifacts),
            candidates,
            high_confidence,
        };

        let stats = context.stats();
        info!(
            cascade = stats.cascade,
            geometric = stats.geometric,
            high_confidence = stats.high_confidence,
            "Detection pass complete"
        );
        Ok(context)
    }
}
