//! Simulated host: an in-process character model with a synthetic face.
//!
//! Lets the daemon run stand-alone (no GUI application attached) and gives
//! the dispatch tests a real convergence landscape: every landmark is a
//! linear function of the committed control state, so the squared-difference
//! loss is convex in each control.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use facefit_core::{
    ControllerError, Frame, LandmarkExtractor, LandmarkSet, ModelController, Pose,
    WindowGeometry,
};

const SIM_MODIFIERS: [&str; 3] = ["brow/height", "mouth/width", "nose/scale"];
const SIM_FRAME_WIDTH: u32 = 160;
const SIM_FRAME_HEIGHT: u32 = 120;

#[derive(Debug)]
pub struct SimState {
    /// Staged modifier values.
    modifiers: BTreeMap<String, f64>,
    /// Values as of the last apply; the synthetic face renders from these.
    committed: BTreeMap<String, f64>,
    zoom: f64,
    pose: Pose,
    pub window: WindowGeometry,
    /// Toggled off to simulate detection failure.
    pub face_present: bool,
}

impl SimState {
    #[cfg(test)]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    #[cfg(test)]
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Landmarks of the synthetic face, already in detector scale.
    fn landmarks(&self) -> LandmarkSet {
        let mut lm = LandmarkSet::new();
        for (i, value) in self.committed.values().enumerate() {
            let i_f = i as f64;
            lm.insert(format!("X_{i}"), 300.0 + 40.0 * i_f + 25.0 * value);
            lm.insert(format!("Y_{i}"), 300.0 + 30.0 * i_f - 15.0 * value);
            lm.insert(format!("Z_{i}"), 10.0 * value);
        }
        // Camera-coupled point.
        lm.insert(
            "X_3",
            500.0 + 20.0 * (self.zoom - 7.0) + 10.0 * self.pose.position[0],
        );
        lm.insert("Y_3", 500.0 + 10.0 * self.pose.position[1]);
        lm.insert("Z_3", 5.0 * self.pose.position[2]);
        // Nose point, doubling as the rotation pivot.
        lm.insert("X_4", 500.0 + self.pose.rotation[1]);
        lm.insert("Y_4", 500.0 + self.pose.rotation[0]);
        lm.insert("Z_4", self.pose.rotation[2]);
        lm
    }
}

/// [`ModelController`] half of the simulated host.
pub struct SimHost {
    pub state: Arc<Mutex<SimState>>,
}

/// [`LandmarkExtractor`] half; reads the shared state, ignores the pixels.
pub struct SimExtractor {
    pub state: Arc<Mutex<SimState>>,
}

/// Build a connected controller/extractor pair.
pub fn simulated_host() -> (SimHost, SimExtractor) {
    let modifiers: BTreeMap<String, f64> = SIM_MODIFIERS
        .iter()
        .map(|n| (n.to_string(), 0.0))
        .collect();
    let state = Arc::new(Mutex::new(SimState {
        committed: modifiers.clone(),
        modifiers,
        zoom: 7.0,
        pose: Pose::default(),
        window: WindowGeometry {
            x: 40,
            y: 40,
            width: 1280,
            height: 720,
        },
        face_present: true,
    }));
    (
        SimHost {
            state: Arc::clone(&state),
        },
        SimExtractor { state },
    )
}

impl ModelController for SimHost {
    fn modifier_names(&self) -> Vec<String> {
        self.state.lock().unwrap().modifiers.keys().cloned().collect()
    }

    fn applied_targets(&self) -> Vec<String> {
        self.state.lock().unwrap().committed.keys().cloned().collect()
    }

    fn modifier(&self, name: &str) -> Result<f64, ControllerError> {
        self.state
            .lock()
            .unwrap()
            .modifiers
            .get(name)
            .copied()
            .ok_or_else(|| ControllerError::UnknownModifier(name.to_string()))
    }

    fn set_modifier(&mut self, name: &str, value: f64) -> Result<(), ControllerError> {
        let mut state = self.state.lock().unwrap();
        if !state.modifiers.contains_key(name) {
            return Err(ControllerError::UnknownModifier(name.to_string()));
        }
        state.modifiers.insert(name.to_string(), value);
        Ok(())
    }

    fn apply_pending(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.committed = state.modifiers.clone();
    }

    fn camera_zoom(&self) -> f64 {
        self.state.lock().unwrap().zoom
    }

    fn set_camera_zoom(&mut self, zoom: f64) {
        self.state.lock().unwrap().zoom = zoom;
    }

    fn pose(&self) -> Pose {
        self.state.lock().unwrap().pose
    }

    fn set_pose(&mut self, pose: Pose) {
        self.state.lock().unwrap().pose = pose;
    }

    fn window_geometry(&self) -> WindowGeometry {
        self.state.lock().unwrap().window
    }

    fn set_window_geometry(&mut self, geometry: WindowGeometry) {
        self.state.lock().unwrap().window = geometry;
    }

    fn render(&mut self) -> Frame {
        let mut frame = Frame::black(SIM_FRAME_WIDTH, SIM_FRAME_HEIGHT, 3);
        frame.data.fill(128);
        frame
    }
}

impl LandmarkExtractor for SimExtractor {
    fn extract(&mut self, _frame: &Frame) -> Option<LandmarkSet> {
        let state = self.state.lock().unwrap();
        if !state.face_present {
            return None;
        }
        Some(state.landmarks())
    }
}
