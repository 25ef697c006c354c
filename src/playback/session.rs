use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ConfigError, PlaybackError};

const SPEED_EPSILON: f32 = 1e-4;
/// Slowest and fastest multipliers a speed set may contain.
pub const MIN_SPEED: f32 = 0.01;
pub const MAX_SPEED: f32 = 16.0;

/// The enumerated speed multipliers a session may use.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedSet {
    values: Vec<f32>,
}

impl SpeedSet {
    pub fn new(values: Vec<f32>) -> Result<Self, ConfigError> {
        if values.is_empty() {
            return Err(ConfigError::EmptySpeedSet);
        }
        let bad = values
            .iter()
            .copied()
            .find(|v| !(MIN_SPEED..=MAX_SPEED).contains(v));
        if let Some(bad) = bad {
            return Err(ConfigError::InvalidSpeed { value: bad, allowed: values });
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Returns the member of the set equal to `value`.
    pub fn select(&self, value: f32) -> Result<f32, ConfigError> {
        self.values
            .iter()
            .copied()
            .find(|v| (v - value).abs() < SPEED_EPSILON)
            .ok_or_else(|| ConfigError::InvalidSpeed {
                value,
                allowed: self.values.clone(),
            })
    }

    /// Neighbour of `current` in ascending order, `steps` positions away,
    /// saturating at either end. A value outside the set starts from the nearest member.
    pub fn neighbour(&self, current: f32, steps: isize) -> f32 {
        let mut sorted = self.values.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let position = sorted
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - current).abs().total_cmp(&(*b - current).abs()))
            .map_or(0, |(i, _)| i);
        let target = (position as isize + steps).clamp(0, sorted.len() as isize - 1);
        sorted[target as usize]
    }
}

/// 1 / (fps × speed), or an error when that does not fit a `Duration`.
fn frame_interval(fps: f32, speed: f32) -> Result<Duration, PlaybackError> {
    Duration::try_from_secs_f64(1.0 / (fps as f64 * speed as f64))
        .map_err(|_| PlaybackError::IntervalOutOfRange { fps, speed })
}

/// Shared play/pause flag. Clearing it from another thread stops the play
/// loop at the next iteration boundary.
#[derive(Debug, Clone, Default)]
pub struct PlayFlag(Arc<AtomicBool>);

impl PlayFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, playing: bool) {
        self.0.store(playing, Ordering::Release);
    }
}

/// Playback position, speed and play flag.
///
/// Owned by the caller and lent to the scheduler. Starts paused at frame 0.
#[derive(Debug)]
pub struct PlaybackSession {
    total_frames: usize,
    source_fps: f32,
    speed: f32,
    target_interval: Duration,
    current_frame_index: usize,
    playing: PlayFlag,
}

impl PlaybackSession {
    pub fn new(
        total_frames: usize,
        source_fps: f32,
        speeds: &SpeedSet,
        speed: f32,
    ) -> Result<Self, PlaybackError> {
        if total_frames == 0 {
            return Err(PlaybackError::EmptySequence);
        }
        if !(source_fps > 0.0 && source_fps.is_finite()) {
            return Err(PlaybackError::InvalidFps(source_fps));
        }
        let speed = speeds.select(speed)?;
        Ok(Self {
            total_frames,
            source_fps,
            speed,
            target_interval: frame_interval(source_fps, speed)?,
            current_frame_index: 0,
            playing: PlayFlag::default(),
        })
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn source_fps(&self) -> f32 {
        self.source_fps
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speeds: &SpeedSet, speed: f32) -> Result<(), PlaybackError> {
        let speed = speeds.select(speed)?;
        self.target_interval = frame_interval(self.source_fps, speed)?;
        self.speed = speed;
        Ok(())
    }

    pub fn current_frame_index(&self) -> usize {
        self.current_frame_index
    }

    /// Scrub to an absolute frame.
    pub fn seek(&mut self, index: usize) -> Result<(), PlaybackError> {
        if index >= self.total_frames {
            return Err(PlaybackError::FrameOutOfRange {
                index,
                total: self.total_frames,
            });
        }
        self.current_frame_index = index;
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.playing.is_set()
    }

    pub fn play(&self) {
        self.playing.set(true);
    }

    pub fn pause(&self) {
        self.playing.set(false);
    }

    /// Handle for pausing from outside the play loop.
    pub fn play_flag(&self) -> PlayFlag {
        self.playing.clone()
    }

    /// 1 / (fps × speed), fixed whenever the speed changes.
    pub fn target_interval(&self) -> Duration {
        self.target_interval
    }

    pub(crate) fn advance(&mut self) {
        self.current_frame_index += 1;
        if self.current_frame_index >= self.total_frames {
            self.current_frame_index = 0;
        }
    }

    pub(crate) fn rewind(&mut self) {
        self.current_frame_index = 0;
    }
}
