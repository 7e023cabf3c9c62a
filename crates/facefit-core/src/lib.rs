//! facefit-core: fitting a 3D character's face to a photographed target.
//!
//! The core is a derivative-free optimization loop: a greedy coordinate
//! descent over named shape/camera controls ([`fitter`]), a grid search over
//! in-plane target rotation ([`align`]), and a squared-difference landmark
//! loss ([`loss`]). The rendering host and the face-landmark detector are
//! injected behind traits ([`controller`]) so the whole pipeline runs against
//! synthetic hosts in tests.

pub mod align;
pub mod control;
pub mod controller;
pub mod fitter;
pub mod loss;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use control::{Axis, Control};
pub use controller::{ControllerError, LandmarkExtractor, ModelController};
pub use fitter::FitOutcome;
pub use session::{Session, SessionError};
pub use types::{Frame, LandmarkSet, Pose, Target, WindowGeometry};
