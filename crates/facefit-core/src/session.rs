//! Fitting session: owns the current target and gates every operation that
//! needs one.
//!
//! One target per session, replaced wholesale by `set_target`. A failed
//! target update never leaves a half-updated target behind; the old target
//! is cleared before anything that can fail runs.

use thiserror::Error;

use crate::align::{self, AlignError, AlignOutcome, ImageError};
use crate::control::Control;
use crate::controller::{LandmarkExtractor, ModelController};
use crate::fitter::{self, FitError, FitOutcome};
use crate::types::{Frame, LandmarkSet, Target};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no target set")]
    NoTarget,
    #[error("no face found")]
    NoFaceFound,
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Fit(#[from] FitError),
    #[error(transparent)]
    Align(#[from] AlignError),
}

/// Session state: `NoTarget` until `set_target` succeeds, then fitting and
/// alignment may run repeatedly until the target is replaced.
#[derive(Default)]
pub struct Session {
    target: Option<Target>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Result<&Target, SessionError> {
        self.target.as_ref().ok_or(SessionError::NoTarget)
    }

    /// Install a new target from a decoded photo.
    ///
    /// The photo and the current live frame are reconciled onto a shared
    /// canvas (performed once, here, not during the rotation search), then
    /// landmarks are extracted from the padded photo. On any failure the
    /// session is left with no target. Returns the normalized target frame.
    pub fn set_target(
        &mut self,
        host: &mut dyn ModelController,
        extractor: &mut dyn LandmarkExtractor,
        image: &Frame,
    ) -> Result<Frame, SessionError> {
        self.target = None;

        let live = host.render();
        let (padded, _) = align::center_pad(image, &live)?;
        let landmarks = extractor
            .extract(&padded)
            .ok_or(SessionError::NoFaceFound)?;

        tracing::info!(
            width = padded.width,
            height = padded.height,
            points = landmarks.len(),
            "target set"
        );

        let normalized = padded.clone();
        self.target = Some(Target {
            landmarks,
            image: padded,
            rotation: 0.0,
        });
        Ok(normalized)
    }

    /// Render and extract the current live landmarks.
    pub fn landmarks(
        &self,
        host: &mut dyn ModelController,
        extractor: &mut dyn LandmarkExtractor,
    ) -> Result<LandmarkSet, SessionError> {
        let frame = host.render();
        extractor.extract(&frame).ok_or(SessionError::NoFaceFound)
    }

    /// One coordinate-descent sweep toward the current target, over the
    /// target's own key set.
    pub fn approach(
        &self,
        host: &mut dyn ModelController,
        extractor: &mut dyn LandmarkExtractor,
        values: &mut [(Control, f64)],
        step: f64,
    ) -> Result<FitOutcome, SessionError> {
        let target = self.target.as_ref().ok_or(SessionError::NoTarget)?;
        let keys = target.landmarks.keys();
        fitter::approach(host, extractor, &target.landmarks, values, &keys, step)
            .map_err(Into::into)
    }

    /// Refine the current target's stored rotation against the live face.
    pub fn optimize_rotation(
        &mut self,
        host: &mut dyn ModelController,
        extractor: &mut dyn LandmarkExtractor,
    ) -> Result<AlignOutcome, SessionError> {
        let target = self.target.as_mut().ok_or(SessionError::NoTarget)?;
        align::optimize_rotation(host, extractor, target).map_err(Into::into)
    }
}
