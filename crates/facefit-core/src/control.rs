//! Control addressing: wire names resolved to a tagged variant once, at the
//! API boundary.
//!
//! Clients address everything by name. Ordinary shape modifiers pass through
//! to the host's modifier system; names under `camera/` are pseudo-modifiers
//! mapped onto camera zoom and character pose. Rotation pseudo-values are in
//! turns (host degrees / 180).

use thiserror::Error;

/// Degrees per rotation pseudo-modifier unit ("turn").
pub const DEGREES_PER_TURN: f64 = 180.0;

const CAMERA_PREFIX: &str = "camera/";

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("unknown camera control: {0}")]
    UnknownCamera(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }

    fn from_suffix(s: &str) -> Option<Self> {
        match s {
            "x" => Some(Axis::X),
            "y" => Some(Axis::Y),
            "z" => Some(Axis::Z),
            _ => None,
        }
    }
}

/// A resolved control address: camera zoom, character rotation/translation
/// along one axis, or a named host shape modifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    Zoom,
    Rotate(Axis),
    Translate(Axis),
    Shape(String),
}

impl Control {
    /// Resolve a wire name. Anything outside the `camera/` namespace is a
    /// shape modifier; unknown `camera/` commands are an error.
    pub fn parse(name: &str) -> Result<Self, ControlError> {
        let Some(cmd) = name.strip_prefix(CAMERA_PREFIX) else {
            return Ok(Control::Shape(name.to_string()));
        };
        if cmd == "zoom" {
            return Ok(Control::Zoom);
        }
        if let Some(axis) = cmd.strip_prefix("rot_").and_then(Axis::from_suffix) {
            return Ok(Control::Rotate(axis));
        }
        if let Some(axis) = cmd.strip_prefix("trans_").and_then(Axis::from_suffix) {
            return Ok(Control::Translate(axis));
        }
        Err(ControlError::UnknownCamera(name.to_string()))
    }

    /// The wire name this control was parsed from.
    pub fn name(&self) -> String {
        match self {
            Control::Zoom => format!("{CAMERA_PREFIX}zoom"),
            Control::Rotate(axis) => format!("{CAMERA_PREFIX}rot_{}", axis.suffix()),
            Control::Translate(axis) => format!("{CAMERA_PREFIX}trans_{}", axis.suffix()),
            Control::Shape(name) => name.clone(),
        }
    }

    /// Rotation pseudo-modifiers operate in turns, so the fitter divides the
    /// caller's step by 10 for them.
    pub fn is_camera_rotation(&self) -> bool {
        matches!(self, Control::Rotate(_))
    }
}
