use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Scale applied to the detector's normalized [0, 1] coordinates before they
/// enter a [`LandmarkSet`]. Keeps loss values in a readable pixel-ish range.
pub const LANDMARK_SCALE: f64 = 1000.0;

/// Named facial keypoint coordinates, keyed `X_<i>` / `Y_<i>` / `Z_<i>`.
///
/// Keys are stable across calls for a fixed detector configuration; a fresh
/// set is produced on every extraction. Values are detector-normalized
/// coordinates scaled by [`LANDMARK_SCALE`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet(BTreeMap<String, f64>);

impl LandmarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one detector point under its three coordinate keys,
    /// applying [`LANDMARK_SCALE`].
    pub fn insert_point(&mut self, index: usize, x: f64, y: f64, z: f64) {
        self.0.insert(format!("X_{index}"), x * LANDMARK_SCALE);
        self.0.insert(format!("Y_{index}"), y * LANDMARK_SCALE);
        self.0.insert(format!("Z_{index}"), z * LANDMARK_SCALE);
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    /// The full key set, used as the default loss selection.
    pub fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }
}

/// An interleaved 8-bit pixel buffer captured from the host's render surface
/// (or decoded from a client-supplied photo).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// `width * height * channels` bytes, row-major, channel-interleaved.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl Frame {
    /// Allocate a zero-filled (black) frame.
    ///
    /// Byte-count arithmetic is done in `usize`: client-supplied photos can
    /// be large enough to overflow `u32`.
    pub fn black(width: u32, height: u32, channels: u32) -> Self {
        Self {
            data: vec![0; width as usize * height as usize * channels as usize],
            width,
            height,
            channels,
        }
    }

    /// Byte offset of pixel (x, y), channel 0.
    #[inline]
    pub fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels as usize
    }
}

/// Character placement in the host scene: position and rotation per axis,
/// rotation in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: [f64; 3],
    pub rotation: [f64; 3],
}

/// The reference face being approached: landmarks, the (size-reconciled)
/// source image they came from, and the best-known in-plane rotation
/// correction in degrees. The rotation starts at 0 and is only updated by
/// the aligner.
#[derive(Debug, Clone)]
pub struct Target {
    pub landmarks: LandmarkSet,
    pub image: Frame,
    pub rotation: f64,
}

/// Host main-window placement, used by the maximize operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_point_scales_and_names() {
        let mut lm = LandmarkSet::new();
        lm.insert_point(4, 0.5, 0.25, -0.01);
        assert_eq!(lm.get("X_4"), Some(500.0));
        assert_eq!(lm.get("Y_4"), Some(250.0));
        assert_eq!(lm.get("Z_4"), Some(-10.0));
        assert_eq!(lm.len(), 3);
    }

    #[test]
    fn test_landmark_set_serializes_as_flat_map() {
        let mut lm = LandmarkSet::new();
        lm.insert("X_0", 1.5);
        lm.insert("Y_0", 2.5);
        let json = serde_json::to_value(&lm).unwrap();
        assert_eq!(json, serde_json::json!({"X_0": 1.5, "Y_0": 2.5}));
    }

    #[test]
    fn test_frame_black_size() {
        let f = Frame::black(8, 4, 3);
        assert_eq!(f.data.len(), 8 * 4 * 3);
        assert_eq!(f.offset(2, 1), (8 + 2) * 3);
    }

    #[test]
    fn test_frame_offset_survives_u32_sized_images() {
        // Dimensions whose byte count exceeds u32::MAX; offsets must not wrap.
        let f = Frame {
            data: Vec::new(),
            width: 70_000,
            height: 70_000,
            channels: 3,
        };
        assert_eq!(f.offset(0, 65_536), 65_536usize * 70_000 * 3);
        assert!(f.offset(69_999, 69_999) > u32::MAX as usize);
    }
}
