use std::time::{Duration, Instant};

use super::session::PlaybackSession;
use crate::error::{PipelineError, PlaybackError};
use crate::video::FrameSource;

/// Time seam for the scheduler.
pub trait Clock {
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// max(0, target - elapsed)
pub fn frame_wait(target_interval: Duration, elapsed: Duration) -> Duration {
    target_interval.saturating_sub(elapsed)
}

/// Analysis mode: visits every frame once, left to right, without pacing.
///
/// Stops at `total_frames` or at the first end-of-sequence, whichever comes
/// first (a source reporting 0 frames is read until it runs out). Returns the
/// number of frames handed to `work`.
pub fn sweep<S, W>(source: &mut S, mut work: W) -> Result<usize, PipelineError>
where
    S: FrameSource,
    W: FnMut(usize, S::Frame) -> Result<(), PipelineError>,
{
    let total = source.total_frames();
    let mut index = 0;
    while total == 0 || index < total {
        let frame = match source.read(index) {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                return Err(PipelineError::Source {
                    index,
                    source: e.into(),
                })
            }
        };
        work(index, frame)?;
        index += 1;
    }
    Ok(index)
}

/// Result of one scheduler iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    /// The play flag was clear; nothing was read and no time passed.
    Paused,
    /// The source ran out before `total_frames`; the index went back to 0.
    Exhausted,
    Rendered {
        index: usize,
        elapsed: Duration,
        wait: Duration,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    pub frames_rendered: usize,
    pub loops: usize,
    /// Frames whose work took longer than the target interval.
    pub overruns: usize,
}

/// Paces frame work on a caller-owned [`PlaybackSession`].
///
/// Each frame's wait is recomputed from that frame's own elapsed time only;
/// sustained overload slows playback down rather than being caught up later.
pub struct Scheduler<C: Clock = SystemClock> {
    clock: C,
}

impl Scheduler<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for Scheduler<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Paused mode: the frame at the current index, without advancing or sleeping.
    pub fn show_current<S: FrameSource>(
        &self,
        session: &PlaybackSession,
        source: &mut S,
    ) -> Result<Option<S::Frame>, PlaybackError> {
        let index = session.current_frame_index();
        source.read(index).map_err(|e| PlaybackError::Source {
            index,
            source: e.into(),
        })
    }

    /// One Playing iteration: read, work, advance, then sleep the remainder
    /// of the frame interval.
    pub fn step<S, W>(
        &self,
        session: &mut PlaybackSession,
        source: &mut S,
        mut work: W,
    ) -> Result<Iteration, PlaybackError>
    where
        S: FrameSource,
        W: FnMut(usize, S::Frame) -> anyhow::Result<()>,
    {
        if !session.is_playing() {
            return Ok(Iteration::Paused);
        }

        let start = self.clock.now();
        let index = session.current_frame_index();
        let frame = match source.read(index) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                session.rewind();
                return Ok(Iteration::Exhausted);
            }
            Err(e) => {
                return Err(PlaybackError::Source {
                    index,
                    source: e.into(),
                })
            }
        };

        work(index, frame).map_err(|e| PlaybackError::Work {
            index,
            source: e.into(),
        })?;
        session.advance();

        let target = session.target_interval();
        let elapsed = self.clock.now().saturating_duration_since(start);
        let wait = frame_wait(target, elapsed);
        log::debug!(
            "frame {}: elapsed {:.1}ms, wait {:.1}ms",
            index,
            elapsed.as_secs_f64() * 1000.0,
            wait.as_secs_f64() * 1000.0
        );
        if !wait.is_zero() {
            self.clock.sleep(wait);
        }

        Ok(Iteration::Rendered { index, elapsed, wait })
    }

    /// Plays until the session's play flag is cleared. On source exhaustion,
    /// either loops or pauses the session, depending on `loop_on_end`.
    pub fn run<S, W>(
        &self,
        session: &mut PlaybackSession,
        source: &mut S,
        loop_on_end: bool,
        mut work: W,
    ) -> Result<PlaybackStats, PlaybackError>
    where
        S: FrameSource,
        W: FnMut(usize, S::Frame) -> anyhow::Result<()>,
    {
        let mut stats = PlaybackStats::default();
        let mut rendered_since_rewind = true;

        loop {
            match self.step(session, source, &mut work)? {
                Iteration::Paused => break,
                Iteration::Exhausted => {
                    // a source that yields nothing even from frame 0 would spin forever
                    if !loop_on_end || !rendered_since_rewind {
                        session.pause();
                        break;
                    }
                    stats.loops += 1;
                    rendered_since_rewind = false;
                }
                Iteration::Rendered { index, wait, .. } => {
                    stats.frames_rendered += 1;
                    if wait.is_zero() {
                        stats.overruns += 1;
                    }
                    if index + 1 == session.total_frames() {
                        stats.loops += 1;
                        if !loop_on_end {
                            session.pause();
                            break;
                        }
                    }
                    rendered_since_rewind = true;
                }
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::SpeedSet;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Manually advanced clock. Clones share the same timeline.
    #[derive(Clone)]
    struct FakeClock {
        base: Instant,
        offset: Rc<RefCell<Duration>>,
        sleeps: Rc<RefCell<Vec<Duration>>>,
    }

    impl FakeClock {
        fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Rc::new(RefCell::new(Duration::ZERO)),
                sleeps: Rc::new(RefCell::new(Vec::new())),
            }
        }

        fn advance(&self, d: Duration) {
            *self.offset.borrow_mut() += d;
        }

        fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.borrow().clone()
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.borrow()
        }

        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
            self.advance(duration);
        }
    }

    /// Frames are their own indices; `available` can be lower than `total`.
    struct CountingSource {
        total: usize,
        available: usize,
        reads: Vec<usize>,
    }

    impl CountingSource {
        fn new(total: usize) -> Self {
            Self { total, available: total, reads: Vec::new() }
        }
    }

    impl FrameSource for CountingSource {
        type Frame = usize;

        fn total_frames(&self) -> usize {
            self.total
        }

        fn fps(&self) -> f32 {
            10.0
        }

        fn resolution(&self) -> (u32, u32) {
            (64, 48)
        }

        fn read(&mut self, index: usize) -> anyhow::Result<Option<usize>> {
            self.reads.push(index);
            Ok((index < self.available).then_some(index))
        }
    }

    fn session(total_frames: usize, speed: f32) -> PlaybackSession {
        let speeds = SpeedSet::new(vec![0.5, 1.0]).unwrap();
        PlaybackSession::new(total_frames, 10.0, &speeds, speed).unwrap()
    }

    fn approx(d: Duration, secs: f64) -> bool {
        (d.as_secs_f64() - secs).abs() < 1e-6
    }

    #[test]
    fn test_frame_wait_never_negative() {
        let target = Duration::from_millis(33);
        assert_eq!(frame_wait(target, Duration::from_millis(10)), Duration::from_millis(23));
        assert_eq!(frame_wait(target, Duration::from_millis(33)), Duration::ZERO);
        assert_eq!(frame_wait(target, Duration::from_secs(5)), Duration::ZERO);
        assert_eq!(frame_wait(Duration::ZERO, Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_paused_step_does_nothing() {
        let clock = FakeClock::new();
        let scheduler = Scheduler::with_clock(clock.clone());
        let mut session = session(10, 1.0);
        let mut source = CountingSource::new(10);

        let result = scheduler.step(&mut session, &mut source, |_, _| Ok(())).unwrap();
        assert_eq!(result, Iteration::Paused);
        assert!(source.reads.is_empty());
        assert!(clock.sleeps().is_empty());
        assert_eq!(session.current_frame_index(), 0);
    }

    #[test]
    fn test_show_current_reads_without_advancing() {
        let scheduler = Scheduler::with_clock(FakeClock::new());
        let mut session = session(10, 1.0);
        let mut source = CountingSource::new(10);
        session.seek(7).unwrap();

        assert_eq!(scheduler.show_current(&session, &mut source).unwrap(), Some(7));
        assert_eq!(session.current_frame_index(), 7);
    }

    #[test]
    fn test_step_sleeps_remaining_interval() {
        let clock = FakeClock::new();
        let scheduler = Scheduler::with_clock(clock.clone());
        let mut session = session(10, 0.5);
        let mut source = CountingSource::new(10);
        session.play();

        let work_clock = clock.clone();
        let result = scheduler
            .step(&mut session, &mut source, |_, _| {
                work_clock.advance(Duration::from_millis(50));
                Ok(())
            })
            .unwrap();

        // 1 / (10 fps * 0.5) = 200ms, 50ms spent in work
        match result {
            Iteration::Rendered { index, elapsed, wait } => {
                assert_eq!(index, 0);
                assert!(approx(elapsed, 0.05));
                assert!(approx(wait, 0.15));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(clock.sleeps().len(), 1);
        assert_eq!(session.current_frame_index(), 1);
    }

    #[test]
    fn test_overrun_does_not_sleep() {
        let clock = FakeClock::new();
        let scheduler = Scheduler::with_clock(clock.clone());
        let mut session = session(10, 1.0);
        let mut source = CountingSource::new(10);
        session.play();

        let work_clock = clock.clone();
        let result = scheduler
            .step(&mut session, &mut source, |_, _| {
                work_clock.advance(Duration::from_millis(250));
                Ok(())
            })
            .unwrap();
        assert!(matches!(result, Iteration::Rendered { wait, .. } if wait.is_zero()));
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_last_frame_wraps_to_zero() {
        let scheduler = Scheduler::with_clock(FakeClock::new());
        let mut session = session(10, 1.0);
        let mut source = CountingSource::new(10);
        session.seek(9).unwrap();
        session.play();

        scheduler.step(&mut session, &mut source, |_, _| Ok(())).unwrap();
        assert_eq!(session.current_frame_index(), 0);
    }

    #[test]
    fn test_exhausted_source_rewinds() {
        let scheduler = Scheduler::with_clock(FakeClock::new());
        let mut session = session(10, 1.0);
        let mut source = CountingSource { available: 5, ..CountingSource::new(10) };
        session.seek(5).unwrap();
        session.play();

        let result = scheduler.step(&mut session, &mut source, |_, _| Ok(())).unwrap();
        assert_eq!(result, Iteration::Exhausted);
        assert_eq!(session.current_frame_index(), 0);
        assert!(session.is_playing());
    }

    #[test]
    fn test_run_stops_at_end_without_loop() {
        let clock = FakeClock::new();
        let scheduler = Scheduler::with_clock(clock.clone());
        let mut session = session(4, 1.0);
        let mut source = CountingSource::new(4);
        session.play();

        let mut seen = Vec::new();
        let stats = scheduler
            .run(&mut session, &mut source, false, |i, frame| {
                assert_eq!(i, frame);
                seen.push(i);
                Ok(())
            })
            .unwrap();

        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(stats.frames_rendered, 4);
        assert_eq!(stats.loops, 1);
        assert!(!session.is_playing());
        assert_eq!(session.current_frame_index(), 0);
        // every frame got its full 100ms interval
        assert!(clock.sleeps().iter().all(|d| approx(*d, 0.1)));
    }

    #[test]
    fn test_run_loops_until_paused() {
        let scheduler = Scheduler::with_clock(FakeClock::new());
        let mut session = session(3, 1.0);
        let mut source = CountingSource::new(3);
        session.play();
        let flag = session.play_flag();

        let mut seen = Vec::new();
        let stats = scheduler
            .run(&mut session, &mut source, true, |i, _| {
                seen.push(i);
                if seen.len() == 7 {
                    // cooperative pause, observed before the next frame
                    flag.set(false);
                }
                Ok(())
            })
            .unwrap();

        assert_eq!(seen, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(stats.frames_rendered, 7);
        assert_eq!(stats.loops, 2);
        assert_eq!(session.current_frame_index(), 1);
    }

    #[test]
    fn test_run_resumes_after_speed_change() {
        let clock = FakeClock::new();
        let scheduler = Scheduler::with_clock(clock.clone());
        let speeds = SpeedSet::new(vec![0.5, 1.0]).unwrap();
        let mut session = PlaybackSession::new(10, 10.0, &speeds, 1.0).unwrap();
        let mut source = CountingSource::new(10);
        let flag = session.play_flag();
        session.play();

        // work asks for a speed change by clearing the flag
        scheduler
            .run(&mut session, &mut source, true, |i, _| {
                if i == 2 {
                    flag.set(false);
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(session.current_frame_index(), 3);
        assert!(clock.sleeps().iter().all(|d| approx(*d, 0.1)));

        session.set_speed(&speeds, speeds.neighbour(session.speed(), -1)).unwrap();
        session.play();
        let mut seen = Vec::new();
        scheduler
            .run(&mut session, &mut source, true, |i, _| {
                seen.push(i);
                if seen.len() == 2 {
                    flag.set(false);
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec![3, 4]);
        assert!(clock.sleeps()[3..].iter().all(|d| approx(*d, 0.2)));
    }

    #[test]
    fn test_run_short_source_loops() {
        let scheduler = Scheduler::with_clock(FakeClock::new());
        let mut session = session(5, 1.0);
        let mut source = CountingSource { available: 2, ..CountingSource::new(5) };
        session.play();
        let flag = session.play_flag();

        let mut seen = Vec::new();
        scheduler
            .run(&mut session, &mut source, true, |i, _| {
                seen.push(i);
                if seen.len() == 4 {
                    flag.set(false);
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_run_empty_source_pauses() {
        let scheduler = Scheduler::with_clock(FakeClock::new());
        let mut session = session(5, 1.0);
        let mut source = CountingSource { available: 0, ..CountingSource::new(5) };
        session.play();

        let stats = scheduler.run(&mut session, &mut source, true, |_, _| Ok(())).unwrap();
        assert_eq!(stats.frames_rendered, 0);
        assert!(!session.is_playing());
    }

    #[test]
    fn test_sweep_visits_every_frame_once() {
        let mut source = CountingSource::new(6);
        let mut seen = Vec::new();
        let count = sweep(&mut source, |i, frame| {
            assert_eq!(i, frame);
            seen.push(i);
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 6);
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(source.reads, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_sweep_stops_at_end_of_sequence() {
        let mut source = CountingSource { available: 3, ..CountingSource::new(10) };
        assert_eq!(sweep(&mut source, |_, _| Ok(())).unwrap(), 3);

        // unknown length: read until exhausted
        let mut source = CountingSource { total: 0, available: 4, reads: Vec::new() };
        assert_eq!(sweep(&mut source, |_, _| Ok(())).unwrap(), 4);
    }

    #[test]
    fn test_sweep_propagates_work_error() {
        let mut source = CountingSource::new(10);
        let err = sweep(&mut source, |i, _| {
            if i == 2 {
                return Err(PipelineError::SinkWrite {
                    frames_written: 2,
                    source: "disk full".into(),
                });
            }
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, PipelineError::SinkWrite { frames_written: 2, .. }));
        assert_eq!(source.reads, vec![0, 1, 2]);
    }

    #[test]
    fn test_work_error_surfaces() {
        let scheduler = Scheduler::with_clock(FakeClock::new());
        let mut session = session(5, 1.0);
        let mut source = CountingSource::new(5);
        session.play();

        let err = scheduler
            .step(&mut session, &mut source, |_, _| anyhow::bail!("display closed"))
            .unwrap_err();
        assert!(matches!(err, PlaybackError::Work { index: 0, .. }));
        assert_eq!(session.current_frame_index(), 0);
    }
}
