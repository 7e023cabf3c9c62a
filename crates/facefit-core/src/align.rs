//! Target pre-alignment: size reconciliation and in-plane rotation search.
//!
//! Landmark detectors are sensitive to head tilt, so before the per-control
//! fit loop runs, the target image's effective rotation is found by a coarse
//! grid search: rotate the target about a pivot tracked from the live face,
//! re-detect, and keep the angle with the lowest landmark loss.

use thiserror::Error;

use crate::controller::{LandmarkExtractor, ModelController};
use crate::loss::landmark_loss;
use crate::types::{Frame, LandmarkSet, Target, LANDMARK_SCALE};

/// Rotation scan range: integers -100..=99 read as tenths of a degree,
/// i.e. -10.0° to +9.9° inclusive (200 candidates).
const SCAN_MIN: i32 = -100;
const SCAN_MAX: i32 = 99;
const SCAN_DENOM: f64 = 10.0;

/// Landmark index conventionally closest to the nose tip; its live position
/// is the rotation pivot.
const PIVOT_X_KEY: &str = "X_4";
const PIVOT_Y_KEY: &str = "Y_4";

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("channel count mismatch: {a} vs {b}")]
    ChannelMismatch { a: u32, b: u32 },
}

#[derive(Error, Debug)]
pub enum AlignError {
    #[error("no face detected in the rendered frame")]
    NoFaceDetected,
    #[error("live landmarks are missing the pivot point")]
    MissingPivot,
}

/// Result of one rotation search.
#[derive(Debug, Clone)]
pub struct AlignOutcome {
    /// Best rotation found, in degrees.
    pub angle: f64,
    /// Landmark loss of that rotation against the live set.
    pub loss: f64,
    /// The rotated target image, for client display.
    pub image: Frame,
}

/// Re-center two frames onto a shared zero-filled canvas sized to the
/// elementwise maximum of their dimensions, with integer-truncated offsets.
///
/// Keeps detector coordinates (normalized to image dimensions) comparable
/// between the two. Differing channel counts are a fatal usage error.
pub fn center_pad(a: &Frame, b: &Frame) -> Result<(Frame, Frame), ImageError> {
    if a.channels != b.channels {
        return Err(ImageError::ChannelMismatch {
            a: a.channels,
            b: b.channels,
        });
    }
    let width = a.width.max(b.width);
    let height = a.height.max(b.height);
    Ok((
        center_onto(a, width, height),
        center_onto(b, width, height),
    ))
}

fn center_onto(src: &Frame, width: u32, height: u32) -> Frame {
    let mut out = Frame::black(width, height, src.channels);
    let dx = (width - src.width) / 2;
    let dy = (height - src.height) / 2;
    let row_bytes = (src.width * src.channels) as usize;
    for y in 0..src.height {
        let src_off = src.offset(0, y);
        let dst_off = out.offset(dx, y + dy);
        out.data[dst_off..dst_off + row_bytes]
            .copy_from_slice(&src.data[src_off..src_off + row_bytes]);
    }
    out
}

/// Rotate a frame by `angle_deg` about `pivot` (translate pivot to center,
/// rotate, translate back; net effect is rotation about the pivot).
///
/// Inverse-mapped bilinear resampling; out-of-bounds samples are black.
pub fn rotate_about(frame: &Frame, pivot: (f64, f64), angle_deg: f64) -> Frame {
    let theta = angle_deg.to_radians();
    let (sin, cos) = theta.sin_cos();
    let (px, py) = pivot;
    let channels = frame.channels as usize;

    let mut out = Frame::black(frame.width, frame.height, frame.channels);

    for oy in 0..frame.height {
        for ox in 0..frame.width {
            // Map the output pixel back through the inverse rotation.
            let dx = ox as f64 - px;
            let dy = oy as f64 - py;
            let sx = px + cos * dx + sin * dy;
            let sy = py - sin * dx + cos * dy;

            let x0 = sx.floor() as i64;
            let y0 = sy.floor() as i64;
            let fx = sx - x0 as f64;
            let fy = sy - y0 as f64;

            let sample = |x: i64, y: i64, c: usize| -> f64 {
                if x >= 0 && x < frame.width as i64 && y >= 0 && y < frame.height as i64 {
                    frame.data[frame.offset(x as u32, y as u32) + c] as f64
                } else {
                    0.0
                }
            };

            let out_off = out.offset(ox, oy);
            for c in 0..channels {
                let val = sample(x0, y0, c) * (1.0 - fx) * (1.0 - fy)
                    + sample(x0 + 1, y0, c) * fx * (1.0 - fy)
                    + sample(x0, y0 + 1, c) * (1.0 - fx) * fy
                    + sample(x0 + 1, y0 + 1, c) * fx * fy;
                out.data[out_off + c] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    out
}

/// Search candidate rotations of the target image for the one whose detected
/// landmarks best match the current live landmarks.
///
/// The pivot is taken from the *live* landmark set's nose point, tracking the
/// live face position rather than the target's own, so the search follows the
/// character as it moves. The stored rotation is evaluated once as the baseline;
/// scan candidates replace it only when strictly better. Candidates where
/// detection fails are skipped. On success the target's landmarks and
/// rotation are updated to the best found.
pub fn optimize_rotation(
    host: &mut dyn ModelController,
    extractor: &mut dyn LandmarkExtractor,
    target: &mut Target,
) -> Result<AlignOutcome, AlignError> {
    let frame = host.render();
    let live = extractor
        .extract(&frame)
        .ok_or(AlignError::NoFaceDetected)?;

    let pivot = (
        live.get(PIVOT_X_KEY).ok_or(AlignError::MissingPivot)? / LANDMARK_SCALE
            * target.image.width as f64,
        live.get(PIVOT_Y_KEY).ok_or(AlignError::MissingPivot)? / LANDMARK_SCALE
            * target.image.height as f64,
    );
    let keys = target.landmarks.keys();

    let mut best: Option<(f64, LandmarkSet, Frame)> = None;
    let mut best_angle = target.rotation;

    let baseline = rotate_about(&target.image, pivot, target.rotation);
    if let Some(lm) = extractor.extract(&baseline) {
        let loss = landmark_loss(&lm, &live, &keys);
        best = Some((loss, lm, baseline));
    }

    for i in SCAN_MIN..=SCAN_MAX {
        let angle = f64::from(i) / SCAN_DENOM;
        let rotated = rotate_about(&target.image, pivot, angle);
        let Some(lm) = extractor.extract(&rotated) else {
            continue;
        };
        let loss = landmark_loss(&lm, &live, &keys);
        if best.as_ref().map_or(true, |(b, _, _)| loss < *b) {
            best = Some((loss, lm, rotated));
            best_angle = angle;
        }
    }

    let (loss, landmarks, image) = best.ok_or(AlignError::NoFaceDetected)?;
    target.landmarks = landmarks;
    target.rotation = best_angle;
    tracing::info!(angle = best_angle, loss, "target rotation optimized");

    Ok(AlignOutcome {
        angle: best_angle,
        loss,
        image,
    })
}
