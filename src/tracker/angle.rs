//! Included angle at a joint vertex, gated by landmark confidence.

use crate::joint::JointDefinition;
use crate::pose::JointPoints;

/// Angle at `b` between the rays `b→a` and `b→c`, in degrees within `[0, 180]`.
///
/// Symmetric in `a` and `c`. Coincident points yield 0 (atan2 of a zero vector).
pub fn angle_degrees(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> f32 {
    let radians = (c.1 - b.1).atan2(c.0 - b.0) - (a.1 - b.1).atan2(a.0 - b.0);
    let mut angle = radians.to_degrees().abs();
    if angle > 180.0 {
        angle = 360.0 - angle;
    }
    angle.clamp(0.0, 180.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct AngleResult {
    pub joint_name: String,
    pub degrees: f32,
    pub valid: bool,
}

impl AngleResult {
    pub fn valid(joint_name: &str, degrees: f32) -> Self {
        Self {
            joint_name: joint_name.to_string(),
            degrees,
            valid: true,
        }
    }

    pub fn invalid(joint_name: &str) -> Self {
        Self {
            joint_name: joint_name.to_string(),
            degrees: 0.0,
            valid: false,
        }
    }

    /// The angle, if this frame produced one.
    pub fn degrees(&self) -> Option<f32> {
        self.valid.then_some(self.degrees)
    }
}

/// Computes the joint angle, or `None` when any of the three landmarks is at
/// or below the joint's confidence threshold. Nothing is carried over from
/// earlier frames.
pub fn extract(joint: &JointDefinition, points: &JointPoints) -> Option<f32> {
    if !points.all_valid(joint.confidence_threshold) {
        log::debug!(
            "{}: gated (conf {:.2}/{:.2}/{:.2} <= {:.2})",
            joint.name,
            points.a.confidence,
            points.b.confidence,
            points.c.confidence,
            joint.confidence_threshold
        );
        return None;
    }
    Some(angle_degrees(
        points.a.position(),
        points.b.position(),
        points.c.position(),
    ))
}

/// [`extract`] as a per-frame [`AngleResult`].
pub fn measure(joint: &JointDefinition, points: Option<&JointPoints>) -> AngleResult {
    match points.and_then(|p| extract(joint, p)) {
        Some(degrees) => AngleResult::valid(&joint.name, degrees),
        None => AngleResult::invalid(&joint.name),
    }
}
