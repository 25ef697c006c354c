use crate::joint::{JointTable, Rgb};
use crate::pose::{JointPoints, Pose};

use super::angle::{self, AngleResult};
use super::one_euro::{FilterBank, FilterParams};

/// One joint's outcome for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct JointMeasurement {
    pub result: AngleResult,
    /// Points the angle was computed from (smoothed when smoothing is on).
    /// `None` when the frame was gated or a landmark was missing.
    pub points: Option<JointPoints>,
    pub color: Rgb,
}

/// Per-frame step: pick each joint's landmarks, gate on confidence, smooth, measure.
///
/// Gated frames leave the joint's filters untouched.
pub struct JointAnalyzer {
    joints: JointTable,
    bank: FilterBank,
    smoothing: bool,
}

impl JointAnalyzer {
    pub fn new(joints: JointTable, params: FilterParams, smoothing: bool) -> Self {
        let bank = FilterBank::new(joints.len(), params);
        Self {
            joints,
            bank,
            smoothing,
        }
    }

    pub fn joints(&self) -> &JointTable {
        &self.joints
    }

    pub fn filters(&self) -> &FilterBank {
        &self.bank
    }

    /// `t` must increase from frame to frame for smoothing to take effect.
    pub fn process(&mut self, t: f32, pose: &Pose) -> Vec<JointMeasurement> {
        self.joints
            .iter()
            .enumerate()
            .map(|(id, joint)| {
                let gated = joint.points(pose).filter(|p| {
                    let pass = p.all_valid(joint.confidence_threshold);
                    if !pass {
                        log::debug!("{}: gated at t={}, filters held", joint.name, t);
                    }
                    pass
                });
                let points = match gated {
                    Some(raw) if self.smoothing => Some(self.bank.filter_points(id, t, raw)),
                    other => other,
                };
                let result = angle::measure(joint, points.as_ref());
                JointMeasurement {
                    points,
                    result,
                    color: joint.color,
                }
            })
            .collect()
    }

    /// Starts a new session: every filter forgets its history.
    pub fn reset(&mut self) {
        self.bank.reset();
    }
}
