//! Joint definitions: named landmark triples whose angle at the vertex is measured.

use serde::Deserialize;
use std::collections::HashSet;

use crate::error::ConfigError;
use crate::pose::{JointPoints, KeypointIndex, LandmarkScheme, Pose};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Display colour for right-side joints.
pub const RIGHT_SIDE_COLOR: Rgb = Rgb(147, 112, 219);
/// Display colour for left-side joints.
pub const LEFT_SIDE_COLOR: Rgb = Rgb(255, 165, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, PartialEq)]
pub struct JointDefinition {
    pub name: String,
    /// First end point.
    pub a: usize,
    /// Vertex.
    pub b: usize,
    /// Second end point.
    pub c: usize,
    pub color: Rgb,
    pub confidence_threshold: f32,
}

impl JointDefinition {
    pub fn new(name: impl Into<String>, a: usize, b: usize, c: usize, color: Rgb) -> Self {
        Self {
            name: name.into(),
            a,
            b,
            c,
            color,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn landmarks(&self) -> [usize; 3] {
        [self.a, self.b, self.c]
    }

    /// Picks this joint's three points out of a detected pose.
    pub fn points(&self, pose: &Pose) -> Option<JointPoints> {
        pose.triple(self.a, self.b, self.c)
    }

    fn validate(&self, scheme: LandmarkScheme) -> Result<(), ConfigError> {
        for id in self.landmarks() {
            if !scheme.contains(id) {
                return Err(ConfigError::UnknownLandmark {
                    joint: self.name.clone(),
                    id,
                    scheme: scheme.name(),
                    count: scheme.count(),
                });
            }
        }
        validate_threshold(&self.name, self.confidence_threshold)
    }
}

pub(crate) fn validate_threshold(context: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange {
            context: context.to_string(),
            value,
        })
    }
}

/// Validated, immutable set of joints for one landmark scheme.
///
/// The position of a joint in the table is its id for the filter bank.
#[derive(Debug, Clone)]
pub struct JointTable {
    scheme: LandmarkScheme,
    joints: Vec<JointDefinition>,
}

impl JointTable {
    pub fn new(scheme: LandmarkScheme, joints: Vec<JointDefinition>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for joint in &joints {
            if !seen.insert(joint.name.as_str()) {
                return Err(ConfigError::DuplicateJoint(joint.name.clone()));
            }
            joint.validate(scheme)?;
        }
        Ok(Self { scheme, joints })
    }

    /// Standard knee/hip/elbow/shoulder set for COCO-17, both sides.
    pub fn coco17_default() -> Self {
        use KeypointIndex::*;
        let joint = |name: &str, a: KeypointIndex, b: KeypointIndex, c: KeypointIndex, color: Rgb| {
            JointDefinition::new(name, a as usize, b as usize, c as usize, color)
        };
        Self {
            scheme: LandmarkScheme::Coco17,
            joints: vec![
                joint("right_knee", RightHip, RightKnee, RightAnkle, RIGHT_SIDE_COLOR),
                joint("left_knee", LeftHip, LeftKnee, LeftAnkle, LEFT_SIDE_COLOR),
                joint("right_hip", RightShoulder, RightHip, RightKnee, RIGHT_SIDE_COLOR),
                joint("left_hip", LeftShoulder, LeftHip, LeftKnee, LEFT_SIDE_COLOR),
                joint("right_elbow", RightShoulder, RightElbow, RightWrist, RIGHT_SIDE_COLOR),
                joint("left_elbow", LeftShoulder, LeftElbow, LeftWrist, LEFT_SIDE_COLOR),
                joint("right_shoulder", RightElbow, RightShoulder, RightHip, RIGHT_SIDE_COLOR),
                joint("left_shoulder", LeftElbow, LeftShoulder, LeftHip, LEFT_SIDE_COLOR),
            ],
        }
    }

    /// Keeps only the named joints, in the order given.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, ConfigError> {
        let joints = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get_by_name(name)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownJoint(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(self.scheme, joints)
    }

    pub fn scheme(&self) -> LandmarkScheme {
        self.scheme
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&JointDefinition> {
        self.joints.get(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&JointDefinition> {
        self.joints.iter().find(|j| j.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &JointDefinition> {
        self.joints.iter()
    }
}
