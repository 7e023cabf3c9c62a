//! Greedy sequential coordinate descent over named controls.
//!
//! One sweep probes each control with a three-way finite difference (stay /
//! +step / −step), committing and re-rendering for every trial. There is no
//! line search and no built-in termination: the client keeps calling until
//! the loss trend or the changed-count says it is done. Later controls in the
//! sweep observe earlier controls' committed changes, so the caller's
//! ordering is part of the contract.

use thiserror::Error;

use crate::control::Control;
use crate::controller::{
    write_control, ControllerError, LandmarkExtractor, ModelController,
};
use crate::loss::landmark_loss;
use crate::types::LandmarkSet;

/// Step divisor for camera-rotation pseudo-modifiers, which operate in turns
/// rather than pixel-scale units. A unit-compensation constant, not a
/// tunable.
const ROTATION_STEP_DIVISOR: f64 = 10.0;

#[derive(Error, Debug)]
pub enum FitError {
    #[error("no face detected in the rendered frame")]
    NoFaceDetected,
    #[error(transparent)]
    Controller(#[from] ControllerError),
}

/// Result of one fit sweep.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    /// Controls that ended the sweep at a new value.
    pub changed: usize,
    /// Live landmarks after the final commit.
    pub landmarks: LandmarkSet,
    /// Loss of those landmarks against the target, over the sweep's key set.
    pub loss: f64,
}

fn capture(
    host: &mut dyn ModelController,
    extractor: &mut dyn LandmarkExtractor,
) -> Result<LandmarkSet, FitError> {
    let frame = host.render();
    extractor.extract(&frame).ok_or(FitError::NoFaceDetected)
}

/// Run one coordinate-descent sweep over `values`, in order, against
/// `target` on the selected `keys`.
///
/// Every trial value is committed, rendered, and measured independently; the
/// chosen value is always re-committed at the end of its step, even when
/// unchanged, so the host's render state matches the recorded value. `values`
/// is updated in place with the chosen values.
///
/// With an empty `keys` the loss is constantly zero, neither probe passes the
/// strict-improvement test, and the sweep changes nothing.
pub fn approach(
    host: &mut dyn ModelController,
    extractor: &mut dyn LandmarkExtractor,
    target: &LandmarkSet,
    values: &mut [(Control, f64)],
    keys: &[String],
    step: f64,
) -> Result<FitOutcome, FitError> {
    let mut changed = 0usize;

    for (control, value) in values.iter_mut() {
        let astep = if control.is_camera_rotation() {
            step / ROTATION_STEP_DIVISOR
        } else {
            step
        };

        let v = *value;
        write_control(host, control, v, true)?;
        let live = capture(host, extractor)?;
        let delta = landmark_loss(target, &live, keys);

        let mut nuv = v + astep;
        write_control(host, control, nuv, true)?;
        let live = capture(host, extractor)?;
        let mut nudelta = landmark_loss(target, &live, keys);

        if nudelta >= delta {
            nuv = v - astep;
            write_control(host, control, nuv, true)?;
            let live = capture(host, extractor)?;
            nudelta = landmark_loss(target, &live, keys);
            if nudelta >= delta {
                nuv = v;
            }
        }

        if nuv != v {
            changed += 1;
            tracing::debug!(
                control = %control.name(),
                loss = nudelta,
                value = nuv,
                "control improved"
            );
        }

        // Recommit unconditionally so the final render state matches `nuv`
        // rather than the last trial value.
        write_control(host, control, nuv, true)?;
        *value = nuv;
    }

    let landmarks = capture(host, extractor)?;
    let loss = landmark_loss(target, &landmarks, keys);
    tracing::debug!(loss, changed, "sweep complete");

    Ok(FitOutcome {
        changed,
        landmarks,
        loss,
    })
}
