//! Shared test doubles: an in-memory host and a state-driven extractor.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::controller::{ControllerError, LandmarkExtractor, ModelController};
use crate::types::{Frame, LandmarkSet, Pose, WindowGeometry};

#[derive(Debug)]
pub struct HostState {
    /// Staged modifier values (what `modifier` reports).
    pub modifiers: BTreeMap<String, f64>,
    /// Modifier values as of the last `apply_pending`.
    pub committed: BTreeMap<String, f64>,
    pub zoom: f64,
    pub pose: Pose,
    pub window: WindowGeometry,
    /// Every modifier/zoom write, in order, as (wire name, value).
    pub writes: Vec<(String, f64)>,
    /// What `render` returns.
    pub frame: Frame,
}

/// In-memory [`ModelController`] sharing its state with test extractors.
pub struct MockHost {
    pub state: Rc<RefCell<HostState>>,
}

impl MockHost {
    pub fn new(modifier_names: &[&str]) -> Self {
        let modifiers: BTreeMap<String, f64> =
            modifier_names.iter().map(|n| (n.to_string(), 0.0)).collect();
        Self {
            state: Rc::new(RefCell::new(HostState {
                committed: modifiers.clone(),
                modifiers,
                zoom: 1.0,
                pose: Pose::default(),
                window: WindowGeometry {
                    x: 0,
                    y: 0,
                    width: 800,
                    height: 480,
                },
                writes: Vec::new(),
                frame: Frame::black(800, 480, 3),
            })),
        }
    }

    pub fn pose(&self) -> Pose {
        self.state.borrow().pose
    }
}

impl ModelController for MockHost {
    fn modifier_names(&self) -> Vec<String> {
        self.state.borrow().modifiers.keys().cloned().collect()
    }

    fn applied_targets(&self) -> Vec<String> {
        self.state.borrow().committed.keys().cloned().collect()
    }

    fn modifier(&self, name: &str) -> Result<f64, ControllerError> {
        self.state
            .borrow()
            .modifiers
            .get(name)
            .copied()
            .ok_or_else(|| ControllerError::UnknownModifier(name.to_string()))
    }

    fn set_modifier(&mut self, name: &str, value: f64) -> Result<(), ControllerError> {
        let mut state = self.state.borrow_mut();
        if !state.modifiers.contains_key(name) {
            return Err(ControllerError::UnknownModifier(name.to_string()));
        }
        state.modifiers.insert(name.to_string(), value);
        state.writes.push((name.to_string(), value));
        Ok(())
    }

    fn apply_pending(&mut self) {
        let mut state = self.state.borrow_mut();
        state.committed = state.modifiers.clone();
    }

    fn camera_zoom(&self) -> f64 {
        self.state.borrow().zoom
    }

    fn set_camera_zoom(&mut self, zoom: f64) {
        let mut state = self.state.borrow_mut();
        state.zoom = zoom;
        state.writes.push(("camera/zoom".to_string(), zoom));
    }

    fn pose(&self) -> Pose {
        self.state.borrow().pose
    }

    fn set_pose(&mut self, pose: Pose) {
        self.state.borrow_mut().pose = pose;
    }

    fn window_geometry(&self) -> WindowGeometry {
        self.state.borrow().window
    }

    fn set_window_geometry(&mut self, geometry: WindowGeometry) {
        self.state.borrow_mut().window = geometry;
    }

    fn render(&mut self) -> Frame {
        self.state.borrow().frame.clone()
    }
}

/// Extractor whose landmarks are a function of the shared host state,
/// giving fitter and session tests a synthetic loss landscape.
pub struct StateExtractor {
    pub state: Rc<RefCell<HostState>>,
    pub map: Box<dyn Fn(&HostState) -> Option<LandmarkSet>>,
    pub calls: usize,
}

impl StateExtractor {
    pub fn new(
        host: &MockHost,
        map: impl Fn(&HostState) -> Option<LandmarkSet> + 'static,
    ) -> Self {
        Self {
            state: Rc::clone(&host.state),
            map: Box::new(map),
            calls: 0,
        }
    }
}

impl LandmarkExtractor for StateExtractor {
    fn extract(&mut self, _frame: &Frame) -> Option<LandmarkSet> {
        self.calls += 1;
        (self.map)(&self.state.borrow())
    }
}
