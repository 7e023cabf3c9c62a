//! Host collaborator traits.
//!
//! The fitting core never talks to a rendering host or a face detector
//! directly; both are injected behind these traits, which keeps the
//! optimization loops runnable against synthetic hosts in tests.

use thiserror::Error;

use crate::control::{Control, DEGREES_PER_TURN};
use crate::types::{Frame, LandmarkSet, Pose, WindowGeometry};

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("unknown modifier: {0}")]
    UnknownModifier(String),
}

/// Remote-controllable 3D character host: shape modifiers, camera, pose,
/// window, and frame capture.
///
/// Modifier writes are staged; `apply_pending` commits every staged change to
/// the rendered model. Camera and pose writes take effect immediately.
pub trait ModelController {
    fn modifier_names(&self) -> Vec<String>;
    fn applied_targets(&self) -> Vec<String>;

    fn modifier(&self, name: &str) -> Result<f64, ControllerError>;
    fn set_modifier(&mut self, name: &str, value: f64) -> Result<(), ControllerError>;
    fn apply_pending(&mut self);

    fn camera_zoom(&self) -> f64;
    fn set_camera_zoom(&mut self, zoom: f64);

    fn pose(&self) -> Pose;
    fn set_pose(&mut self, pose: Pose);

    fn window_geometry(&self) -> WindowGeometry;
    fn set_window_geometry(&mut self, geometry: WindowGeometry);

    /// Redraw and capture the current frame.
    fn render(&mut self) -> Frame;
}

/// Black-box face landmark detector. `None` means no face was found.
pub trait LandmarkExtractor {
    fn extract(&mut self, frame: &Frame) -> Option<LandmarkSet>;
}

/// Read a control's current value through the host.
///
/// Rotation pseudo-modifiers are reported in turns (host degrees / 180).
pub fn read_control(host: &dyn ModelController, control: &Control) -> Result<f64, ControllerError> {
    Ok(match control {
        Control::Zoom => host.camera_zoom(),
        Control::Rotate(axis) => host.pose().rotation[axis.index()] / DEGREES_PER_TURN,
        Control::Translate(axis) => host.pose().position[axis.index()],
        Control::Shape(name) => host.modifier(name)?,
    })
}

/// Write a control's value through the host, optionally committing all
/// pending modifier changes afterwards.
pub fn write_control(
    host: &mut dyn ModelController,
    control: &Control,
    value: f64,
    apply: bool,
) -> Result<(), ControllerError> {
    match control {
        Control::Zoom => host.set_camera_zoom(value),
        Control::Rotate(axis) => {
            let mut pose = host.pose();
            pose.rotation[axis.index()] = value * DEGREES_PER_TURN;
            host.set_pose(pose);
        }
        Control::Translate(axis) => {
            let mut pose = host.pose();
            pose.position[axis.index()] = value;
            host.set_pose(pose);
        }
        Control::Shape(name) => host.set_modifier(name, value)?,
    }
    if apply {
        host.apply_pending();
    }
    Ok(())
}
