//! Operation dispatch: the control socket's function table.
//!
//! Thin glue between the wire protocol and the session/host: parameter
//! unpacking, error-string mapping, and the per-name isolation rules for
//! bulk modifier operations (a bad name is logged and skipped, never aborts
//! the batch).

use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde_json::{json, Map, Value};

use facefit_core::align::AlignError;
use facefit_core::controller::{read_control, write_control};
use facefit_core::fitter::FitError;
use facefit_core::{Control, Frame, Pose, SessionError, WindowGeometry};

use crate::engine::Engine;
use crate::protocol::{Request, Response, WireImage};

const NO_FACE: &str = "ERROR: No face found";
const NO_TARGET: &str = "No target set";

/// Host camera zoom restored by `resetCamera`.
const RESET_ZOOM: f64 = 7.0;

const MAXIMIZED: WindowGeometry = WindowGeometry {
    x: 0,
    y: 0,
    width: 1920,
    height: 1080,
};

pub fn dispatch(engine: &mut Engine, req: &Request) -> Response {
    match req.function.as_str() {
        "setTarget" => set_target(engine, req),
        "landmarks" => landmarks(engine),
        "approachTarget" => approach_target(engine, req),
        "optimizeTargetRotation" => optimize_target_rotation(engine),
        "getModifierValue" => get_modifier_value(engine, req),
        "applyModifier" => apply_modifier(engine, req),
        "getAvailableModifierNames" => Response::ok(json!(engine.host.modifier_names())),
        "getAppliedTargets" => Response::ok(json!(engine.host.applied_targets())),
        "snapshot" => snapshot(engine),
        "resetCamera" => reset_camera(engine),
        "maximizeWindow" => maximize_window(engine),
        other => Response::error(format!("Unknown function: {other}")),
    }
}

fn session_error(err: SessionError) -> Response {
    match err {
        SessionError::NoTarget => Response::error(NO_TARGET),
        SessionError::NoFaceFound
        | SessionError::Fit(FitError::NoFaceDetected)
        | SessionError::Align(AlignError::NoFaceDetected) => Response::error(NO_FACE),
        other => Response::error(other.to_string()),
    }
}

fn set_target(engine: &mut Engine, req: &Request) -> Response {
    let Some(data) = req.param("data").and_then(Value::as_str) else {
        return Response::error("Missing image data");
    };
    let bytes = match BASE64_STANDARD.decode(data) {
        Ok(bytes) => bytes,
        Err(err) => return Response::error(format!("Invalid base64 image: {err}")),
    };
    let decoded = match image::load_from_memory(&bytes) {
        Ok(img) => img.to_rgb8(),
        Err(err) => return Response::error(format!("Invalid image: {err}")),
    };
    let frame = Frame {
        width: decoded.width(),
        height: decoded.height(),
        channels: 3,
        data: decoded.into_raw(),
    };

    match engine
        .session
        .set_target(engine.host.as_mut(), engine.extractor.as_mut(), &frame)
    {
        Ok(normalized) => Response::ok(json!(WireImage::from_frame(&normalized))),
        Err(err) => session_error(err),
    }
}

fn landmarks(engine: &mut Engine) -> Response {
    match engine
        .session
        .landmarks(engine.host.as_mut(), engine.extractor.as_mut())
    {
        Ok(lm) => Response::ok(json!(lm)),
        Err(err) => session_error(err),
    }
}

fn approach_target(engine: &mut Engine, req: &Request) -> Response {
    let Some(step) = req.param("step").and_then(Value::as_f64) else {
        return Response::error("Invalid step");
    };
    let names: Vec<String> = match req.param("modifiers") {
        Some(Value::String(all)) if all == "all" => engine.host.modifier_names(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => return Response::error("Invalid modifiers"),
    };

    let mut values = lookup_controls(engine, &names);
    match engine.session.approach(
        engine.host.as_mut(),
        engine.extractor.as_mut(),
        &mut values,
        step,
    ) {
        Ok(out) => Response::ok(json!({
            "count": out.changed,
            "data": out.landmarks,
            "loss": out.loss,
        })),
        Err(err) => session_error(err),
    }
}

fn optimize_target_rotation(engine: &mut Engine) -> Response {
    match engine
        .session
        .optimize_rotation(engine.host.as_mut(), engine.extractor.as_mut())
    {
        Ok(out) => Response::ok(json!({
            "angle": out.angle,
            "loss": out.loss,
            "image": WireImage::from_frame(&out.image),
        })),
        Err(err) => session_error(err),
    }
}

/// Resolve each name to its current value, skipping names the host does not
/// know. Preserves the caller's ordering, which is part of the fit contract.
fn lookup_controls(engine: &Engine, names: &[String]) -> Vec<(Control, f64)> {
    let mut values = Vec::with_capacity(names.len());
    for name in names {
        let control = match Control::parse(name) {
            Ok(control) => control,
            Err(err) => {
                tracing::warn!(name = %name, error = %err, "skipping unknown control");
                continue;
            }
        };
        match read_control(engine.host.as_ref(), &control) {
            Ok(value) => values.push((control, value)),
            Err(err) => tracing::warn!(name = %name, error = %err, "skipping unknown modifier"),
        }
    }
    values
}

fn lookup_one(engine: &Engine, name: &str) -> Option<f64> {
    let control = Control::parse(name).ok()?;
    read_control(engine.host.as_ref(), &control).ok()
}

fn get_modifier_value(engine: &mut Engine, req: &Request) -> Response {
    let Some(name) = req.param("modifier").and_then(Value::as_str) else {
        return Response::error("Missing modifier");
    };
    if name == "all" {
        let mut map = Map::new();
        for name in engine.host.modifier_names() {
            match lookup_one(engine, &name) {
                Some(value) => {
                    map.insert(name, json!(value));
                }
                None => tracing::warn!(name = %name, "skipping unknown modifier"),
            }
        }
        return Response::ok(Value::Object(map));
    }
    match lookup_one(engine, name) {
        Some(value) => {
            let mut map = Map::new();
            map.insert(name.to_string(), json!(value));
            Response::ok(Value::Object(map))
        }
        None => Response::error(format!("Unknown modifier: {name}")),
    }
}

fn apply_modifier(engine: &mut Engine, req: &Request) -> Response {
    let Some(name) = req.param("modifier").and_then(Value::as_str) else {
        return Response::error("Missing modifier");
    };

    if name == "all" {
        let Some(Value::Object(powers)) = req.param("power") else {
            return Response::error("Invalid power map");
        };
        for (name, power) in powers {
            let Some(power) = power.as_f64() else {
                tracing::warn!(name = %name, "skipping non-numeric power");
                continue;
            };
            match Control::parse(name) {
                Ok(control) => {
                    if let Err(err) =
                        write_control(engine.host.as_mut(), &control, power, false)
                    {
                        tracing::warn!(name = %name, error = %err, "skipping unknown modifier");
                    }
                }
                Err(err) => tracing::warn!(name = %name, error = %err, "skipping unknown control"),
            }
        }
        engine.host.apply_pending();
        return Response::ok(json!("OK"));
    }

    let power = match req.param("power") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    };
    let Some(power) = power else {
        return Response::error("No such modifier");
    };
    let Ok(control) = Control::parse(name) else {
        return Response::error("No such modifier");
    };
    match write_control(engine.host.as_mut(), &control, power, true) {
        Ok(()) => Response::ok(json!("OK")),
        Err(err) => Response::error(err.to_string()),
    }
}

fn snapshot(engine: &mut Engine) -> Response {
    let frame = engine.host.render();
    Response::ok(json!(WireImage::from_frame(&frame)))
}

fn reset_camera(engine: &mut Engine) -> Response {
    engine.host.set_pose(Pose::default());
    engine.host.set_camera_zoom(RESET_ZOOM);
    Response::ok(json!("OK"))
}

fn maximize_window(engine: &mut Engine) -> Response {
    let previous = engine.host.window_geometry();
    engine.host.set_window_geometry(MAXIMIZED);
    tracing::debug!(?previous, "window maximized");
    Response::ok(json!("OK"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::simulated_host;
    use std::sync::Arc;

    fn request(value: Value) -> Request {
        serde_json::from_value(value).unwrap()
    }

    fn sim_engine() -> (Engine, Arc<std::sync::Mutex<crate::sim::SimState>>) {
        let (host, extractor) = simulated_host();
        let state = Arc::clone(&host.state);
        (Engine::new(Box::new(host), Box::new(extractor)), state)
    }

    fn png_base64(width: u32, height: u32) -> String {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([100, 120, 140]));
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        BASE64_STANDARD.encode(buf.into_inner())
    }

    #[test]
    fn test_unknown_function() {
        let (mut engine, _) = sim_engine();
        let resp = dispatch(&mut engine, &request(json!({"function": "noSuchOp"})));
        assert!(resp.error.unwrap().contains("noSuchOp"));
    }

    #[test]
    fn test_landmarks_and_no_face_error() {
        let (mut engine, state) = sim_engine();

        let resp = dispatch(&mut engine, &request(json!({"function": "landmarks"})));
        let data = resp.data.unwrap();
        assert!(data.get("X_0").is_some());

        state.lock().unwrap().face_present = false;
        let resp = dispatch(&mut engine, &request(json!({"function": "landmarks"})));
        assert_eq!(resp.error.as_deref(), Some("ERROR: No face found"));
        assert!(resp.data.is_none());
    }

    #[test]
    fn test_approach_without_target() {
        let (mut engine, _) = sim_engine();
        let resp = dispatch(
            &mut engine,
            &request(json!({"function": "approachTarget", "step": 1.0, "modifiers": "all"})),
        );
        assert_eq!(resp.error.as_deref(), Some("No target set"));

        let resp = dispatch(
            &mut engine,
            &request(json!({"function": "optimizeTargetRotation"})),
        );
        assert_eq!(resp.error.as_deref(), Some("No target set"));
    }

    #[test]
    fn test_set_target_then_converge() {
        let (mut engine, _) = sim_engine();

        // Pose the face, capture it as the target, then knock it away.
        let resp = dispatch(
            &mut engine,
            &request(
                json!({"function": "applyModifier", "modifier": "nose/scale", "power": 2.0}),
            ),
        );
        assert_eq!(resp.data, Some(json!("OK")));

        let resp = dispatch(
            &mut engine,
            &request(json!({"function": "setTarget", "data": png_base64(64, 48)})),
        );
        let wire: WireImage = serde_json::from_value(resp.data.unwrap()).unwrap();
        // Photo padded onto the live 160x120 canvas.
        assert_eq!(wire.shape, [120, 160, 3]);

        dispatch(
            &mut engine,
            &request(
                json!({"function": "applyModifier", "modifier": "nose/scale", "power": 0.0}),
            ),
        );

        let mut last = None;
        for _ in 0..3 {
            let resp = dispatch(
                &mut engine,
                &request(json!({
                    "function": "approachTarget",
                    "step": 1.0,
                    "modifiers": ["nose/scale"],
                })),
            );
            last = resp.data;
        }
        let data = last.unwrap();
        assert_eq!(data["loss"], json!(0.0));
        assert_eq!(data["count"], json!(0));

        let resp = dispatch(
            &mut engine,
            &request(json!({"function": "getModifierValue", "modifier": "nose/scale"})),
        );
        assert_eq!(resp.data.unwrap()["nose/scale"], json!(2.0));
    }

    #[test]
    fn test_optimize_rotation_keeps_zero_when_already_matched() {
        let (mut engine, _) = sim_engine();
        dispatch(
            &mut engine,
            &request(json!({"function": "setTarget", "data": png_base64(32, 32)})),
        );
        // The simulated extractor is rotation-insensitive, so the baseline
        // at 0 degrees already has zero loss and the scan cannot beat it.
        let resp = dispatch(
            &mut engine,
            &request(json!({"function": "optimizeTargetRotation"})),
        );
        let data = resp.data.unwrap();
        assert_eq!(data["angle"], json!(0.0));
        assert_eq!(data["loss"], json!(0.0));
        let wire: WireImage = serde_json::from_value(data["image"].clone()).unwrap();
        assert_eq!(wire.shape, [120, 160, 3]);
    }

    #[test]
    fn test_set_target_rejects_bad_payloads() {
        let (mut engine, _) = sim_engine();
        let resp = dispatch(
            &mut engine,
            &request(json!({"function": "setTarget", "data": "!!!not-base64!!!"})),
        );
        assert!(resp.error.unwrap().contains("base64"));

        let resp = dispatch(&mut engine, &request(json!({"function": "setTarget"})));
        assert!(resp.error.is_some());
    }

    #[test]
    fn test_set_target_no_face_leaves_no_target() {
        let (mut engine, state) = sim_engine();
        state.lock().unwrap().face_present = false;
        let resp = dispatch(
            &mut engine,
            &request(json!({"function": "setTarget", "data": png_base64(32, 32)})),
        );
        assert_eq!(resp.error.as_deref(), Some("ERROR: No face found"));
        assert!(!engine.session.has_target());
    }

    #[test]
    fn test_get_modifier_value_all_and_unknown() {
        let (mut engine, _) = sim_engine();
        let resp = dispatch(
            &mut engine,
            &request(json!({"function": "getModifierValue", "modifier": "all"})),
        );
        let map = resp.data.unwrap();
        assert_eq!(map.as_object().unwrap().len(), 3);
        assert_eq!(map["brow/height"], json!(0.0));

        let resp = dispatch(
            &mut engine,
            &request(json!({"function": "getModifierValue", "modifier": "camera/zoom"})),
        );
        assert_eq!(resp.data.unwrap()["camera/zoom"], json!(7.0));

        let resp = dispatch(
            &mut engine,
            &request(json!({"function": "getModifierValue", "modifier": "no/such"})),
        );
        assert!(resp.error.unwrap().contains("no/such"));
    }

    #[test]
    fn test_apply_modifier_bad_power() {
        let (mut engine, _) = sim_engine();
        let resp = dispatch(
            &mut engine,
            &request(
                json!({"function": "applyModifier", "modifier": "nose/scale", "power": "wide"}),
            ),
        );
        assert_eq!(resp.error.as_deref(), Some("No such modifier"));
        // No partial effect.
        assert_eq!(
            engine.host.modifier("nose/scale").unwrap(),
            0.0
        );
    }

    #[test]
    fn test_apply_modifier_all_isolates_bad_names() {
        let (mut engine, _) = sim_engine();
        let resp = dispatch(
            &mut engine,
            &request(json!({
                "function": "applyModifier",
                "modifier": "all",
                "power": {"nose/scale": 1.5, "bogus/name": 2.0, "camera/zoom": 9.0},
            })),
        );
        assert_eq!(resp.data, Some(json!("OK")));
        assert_eq!(engine.host.modifier("nose/scale").unwrap(), 1.5);
        assert_eq!(engine.host.camera_zoom(), 9.0);
    }

    #[test]
    fn test_camera_rotation_values_are_turns_on_the_wire() {
        let (mut engine, state) = sim_engine();
        dispatch(
            &mut engine,
            &request(
                json!({"function": "applyModifier", "modifier": "camera/rot_y", "power": 0.5}),
            ),
        );
        assert_eq!(state.lock().unwrap().pose().rotation[1], 90.0);

        let resp = dispatch(
            &mut engine,
            &request(json!({"function": "getModifierValue", "modifier": "camera/rot_y"})),
        );
        assert_eq!(resp.data.unwrap()["camera/rot_y"], json!(0.5));
    }

    #[test]
    fn test_snapshot_reset_and_maximize() {
        let (mut engine, state) = sim_engine();

        let resp = dispatch(&mut engine, &request(json!({"function": "snapshot"})));
        let wire: WireImage = serde_json::from_value(resp.data.unwrap()).unwrap();
        assert_eq!(wire.shape, [120, 160, 3]);
        let bytes = BASE64_STANDARD.decode(wire.data).unwrap();
        assert_eq!(bytes.len(), 120 * 160 * 3);

        dispatch(
            &mut engine,
            &request(json!({"function": "applyModifier", "modifier": "camera/zoom", "power": 3.0})),
        );
        let resp = dispatch(&mut engine, &request(json!({"function": "resetCamera"})));
        assert_eq!(resp.data, Some(json!("OK")));
        assert_eq!(state.lock().unwrap().zoom(), 7.0);
        assert_eq!(state.lock().unwrap().pose(), Pose::default());

        dispatch(&mut engine, &request(json!({"function": "maximizeWindow"})));
        let window = state.lock().unwrap().window;
        assert_eq!((window.x, window.y), (0, 0));
        assert_eq!((window.width, window.height), (1920, 1080));
    }
}
