//! Error types for configuration, analysis and playback.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Rejected configuration. Always raised at load time, before any frame is read.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("joint '{joint}' references landmark {id}, but scheme {scheme} only has {count} landmarks")]
    UnknownLandmark {
        joint: String,
        id: usize,
        scheme: &'static str,
        count: usize,
    },

    #[error("confidence threshold {value} for '{context}' is outside [0, 1]")]
    ThresholdOutOfRange { context: String, value: f32 },

    #[error("speed multiplier {value} is not one of {allowed:?}")]
    InvalidSpeed { value: f32, allowed: Vec<f32> },

    #[error("speed set must contain at least one positive multiplier")]
    EmptySpeedSet,

    #[error("duplicate joint name '{0}'")]
    DuplicateJoint(String),

    #[error("selected joint '{0}' is not defined")]
    UnknownJoint(String),

    #[error("filter parameter {name} = {value} is out of range")]
    FilterParameter { name: &'static str, value: f32 },

    #[error("detector reports scheme {detector}, joints are defined for {joints}")]
    SchemeMismatch {
        detector: &'static str,
        joints: &'static str,
    },

    #[error("output codec list is empty")]
    NoCodecs,
}

/// Fatal errors of an analysis run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not open output with any codec (tried {tried:?})")]
    SinkInit { tried: Vec<String> },

    #[error("write failed after {frames_written} frames: {source}")]
    SinkWrite {
        frames_written: usize,
        #[source]
        source: BoxError,
    },

    #[error("failed to read frame {index}: {source}")]
    Source {
        index: usize,
        #[source]
        source: BoxError,
    },

    #[error("pose detection failed on frame {index}: {source}")]
    Detector {
        index: usize,
        #[source]
        source: BoxError,
    },

    #[error("overlay rendering failed on frame {index}: {source}")]
    Render {
        index: usize,
        #[source]
        source: BoxError,
    },
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("frame {index} is outside [0, {total})")]
    FrameOutOfRange { index: usize, total: usize },

    #[error("frame sequence is empty")]
    EmptySequence,

    #[error("source frame rate {0} is not positive")]
    InvalidFps(f32),

    #[error(transparent)]
    Speed(#[from] ConfigError),

    #[error("frame interval for {fps} fps at x{speed} is not representable")]
    IntervalOutOfRange { fps: f32, speed: f32 },

    #[error("failed to read frame {index}: {source}")]
    Source {
        index: usize,
        #[source]
        source: BoxError,
    },

    #[error("frame work failed on frame {index}: {source}")]
    Work {
        index: usize,
        #[source]
        source: BoxError,
    },
}
