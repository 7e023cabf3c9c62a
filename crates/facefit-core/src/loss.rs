//! Landmark dissimilarity: sum of squared per-key coordinate differences.

use crate::types::LandmarkSet;

/// Sum over `keys` of `(b[k] - a[k])^2`. Lower is better, zero is an exact
/// match on the selected keys. No normalization by key count; callers
/// comparing across differently sized key sets must account for that.
///
/// Both sets are expected to contain every selected key; coverage is the
/// caller's contract (keys are normally taken from the target's own set).
pub fn landmark_loss(a: &LandmarkSet, b: &LandmarkSet, keys: &[String]) -> f64 {
    let mut delta = 0.0;
    for key in keys {
        let (Some(va), Some(vb)) = (a.get(key), b.get(key)) else {
            debug_assert!(false, "loss key {key} missing from one landmark set");
            continue;
        };
        let d = vb - va;
        delta += d * d;
    }
    delta
}
