use crate::config::FilterConfig;
use crate::pose::{JointPoints, Keypoint};

/// alpha = 1 / (1 + tau/Te), tau = 1/(2*pi*fc)
fn smoothing_factor(te: f32, cutoff: f32) -> f32 {
    let r = 2.0 * std::f32::consts::PI * cutoff * te;
    r / (r + 1.0)
}

/// Tuning shared by every channel of a bank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub min_cutoff: f32,
    pub beta: f32,
    pub derivative_cutoff: f32,
}

impl FilterParams {
    pub fn new(min_cutoff: f32, beta: f32, derivative_cutoff: f32) -> Self {
        Self {
            min_cutoff,
            beta,
            derivative_cutoff,
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.min_cutoff, config.beta, config.derivative_cutoff)
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        Self::new(0.5, 0.2, 1.0)
    }
}

/// Filter memory for one scalar channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelFilterState {
    pub last_time: f32,
    pub last_value: f32,
    pub last_derivative: f32,
}

impl ChannelFilterState {
    /// First sample passes through unfiltered.
    pub fn seed(t: f32, x: f32) -> Self {
        Self {
            last_time: t,
            last_value: x,
            last_derivative: 0.0,
        }
    }

    /// One One Euro step. Samples with `t <= last_time` return the last
    /// estimate and leave the state untouched.
    pub fn step(&mut self, params: &FilterParams, t: f32, x: f32) -> f32 {
        let dt = t - self.last_time;
        if !(dt > 0.0) {
            log::warn!(
                "rejected sample at t={} (last_time={}), holding {}",
                t, self.last_time, self.last_value
            );
            return self.last_value;
        }

        let raw_derivative = (x - self.last_value) / dt;
        let a_d = smoothing_factor(dt, params.derivative_cutoff);
        let derivative = a_d * raw_derivative + (1.0 - a_d) * self.last_derivative;

        let cutoff = params.min_cutoff + params.beta * derivative.abs();
        let a = smoothing_factor(dt, cutoff);
        let value = a * x + (1.0 - a) * self.last_value;

        self.last_value = value;
        self.last_derivative = derivative;
        self.last_time = t;
        value
    }
}

/// The six scalar coordinates feeding one joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Channel {
    Ax = 0,
    Ay = 1,
    Bx = 2,
    By = 3,
    Cx = 4,
    Cy = 5,
}

impl Channel {
    pub const PER_JOINT: usize = 6;
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    generation: u64,
    state: ChannelFilterState,
}

/// Arena of channel filters, one slot per (joint, channel), allocated up front.
///
/// A slot is live only when its generation matches the bank's, so `reset`
/// just bumps the generation. Slots are seeded on their first live sample.
#[derive(Debug, Clone)]
pub struct FilterBank {
    params: FilterParams,
    generation: u64,
    slots: Vec<Slot>,
}

impl FilterBank {
    pub fn new(joint_count: usize, params: FilterParams) -> Self {
        let empty = Slot {
            generation: 0,
            state: ChannelFilterState::seed(0.0, 0.0),
        };
        Self {
            params,
            generation: 1,
            slots: vec![empty; joint_count * Channel::PER_JOINT],
        }
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    pub fn joint_count(&self) -> usize {
        self.slots.len() / Channel::PER_JOINT
    }

    fn slot_index(joint: usize, channel: Channel) -> usize {
        joint * Channel::PER_JOINT + channel as usize
    }

    /// Filters one sample of one channel.
    ///
    /// Panics if `joint` is not below the bank's joint count.
    pub fn filter(&mut self, joint: usize, channel: Channel, t: f32, x: f32) -> f32 {
        let generation = self.generation;
        let slot = &mut self.slots[Self::slot_index(joint, channel)];
        if slot.generation != generation {
            slot.generation = generation;
            slot.state = ChannelFilterState::seed(t, x);
            return x;
        }
        slot.state.step(&self.params, t, x)
    }

    /// Filters the x/y of all three points of a joint. Confidences are kept as detected.
    pub fn filter_points(&mut self, joint: usize, t: f32, points: JointPoints) -> JointPoints {
        let mut smooth = |kp: Keypoint, cx: Channel, cy: Channel| {
            Keypoint::new(
                self.filter(joint, cx, t, kp.x),
                self.filter(joint, cy, t, kp.y),
                kp.confidence,
            )
        };
        let a = smooth(points.a, Channel::Ax, Channel::Ay);
        let b = smooth(points.b, Channel::Bx, Channel::By);
        let c = smooth(points.c, Channel::Cx, Channel::Cy);
        JointPoints::new(a, b, c)
    }

    pub fn state(&self, joint: usize, channel: Channel) -> Option<&ChannelFilterState> {
        self.slots
            .get(Self::slot_index(joint, channel))
            .filter(|slot| slot.generation == self.generation)
            .map(|slot| &slot.state)
    }

    /// Forgets every channel.
    pub fn reset(&mut self) {
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoothing_factor_bounds() {
        // alpha should be between 0 and 1
        for &cutoff in &[0.1, 1.0, 10.0, 100.0] {
            for &te in &[0.001, 0.01, 0.033, 0.1, 1.0] {
                let alpha = smoothing_factor(te, cutoff);
                assert!(alpha > 0.0 && alpha < 1.0, "alpha={} for te={}, cutoff={}", alpha, te, cutoff);
            }
        }
    }

    #[test]
    fn test_first_sample_passthrough() {
        let mut f = FilterBank::new(1, FilterParams::default());
        assert_eq!(f.filter(0, Channel::Ax, 0.0, 5.0), 5.0);
        let state = f.state(0, Channel::Ax).unwrap();
        assert_eq!(state.last_derivative, 0.0);
        assert_eq!(state.last_time, 0.0);
    }

    #[test]
    fn test_smooths_step() {
        let mut f = FilterBank::new(1, FilterParams::new(1.0, 0.0, 1.0));
        f.filter(0, Channel::Ax, 0.0, 0.0);
        let result = f.filter(0, Channel::Ax, 0.033, 10.0);
        assert!(result < 10.0, "Expected smoothing, got {}", result);
        assert!(result > 0.0, "Expected positive value, got {}", result);
    }

    #[test]
    fn test_matches_hand_computed_step() {
        let params = FilterParams::default();
        let mut f = FilterBank::new(1, params);
        f.filter(0, Channel::Ax, 0.0, 100.0);
        let result = f.filter(0, Channel::Ax, 1.0, 110.0);

        let r_d = 2.0 * std::f32::consts::PI * 1.0;
        let a_d = r_d / (r_d + 1.0);
        let derivative = a_d * 10.0;
        let r = 2.0 * std::f32::consts::PI * (0.5 + 0.2 * derivative);
        let a = r / (r + 1.0);
        let expected = a * 110.0 + (1.0 - a) * 100.0;
        assert!((result - expected).abs() < 1e-4, "{} vs {}", result, expected);
    }

    #[test]
    fn test_high_beta_responsive() {
        // High beta: fast movements should pass through with less filtering
        let mut f_low_beta = FilterBank::new(1, FilterParams::new(1.0, 0.0, 1.0));
        let mut f_high_beta = FilterBank::new(1, FilterParams::new(1.0, 1.0, 1.0));

        f_low_beta.filter(0, Channel::Ax, 0.0, 0.0);
        f_high_beta.filter(0, Channel::Ax, 0.0, 0.0);

        let r_low = f_low_beta.filter(0, Channel::Ax, 0.033, 10.0);
        let r_high = f_high_beta.filter(0, Channel::Ax, 0.033, 10.0);

        assert!(r_high > r_low, "High beta ({}) should be more responsive than low beta ({})", r_high, r_low);
    }

    #[test]
    fn test_converges_to_constant_input() {
        for &seed in &[-500.0, 0.0, 42.0, 1000.0] {
            let mut f = FilterBank::new(1, FilterParams::default());
            f.filter(0, Channel::Ax, 0.0, seed);
            let mut out = seed;
            for i in 1..=600 {
                out = f.filter(0, Channel::Ax, i as f32 / 30.0, 250.0);
            }
            assert!((out - 250.0).abs() < 1e-2, "seed {} converged to {}", seed, out);
        }
    }

    #[test]
    fn test_rejects_non_increasing_time() {
        let mut f = FilterBank::new(1, FilterParams::default());
        f.filter(0, Channel::Ax, 0.0, 1.0);
        let last = f.filter(0, Channel::Ax, 1.0, 3.0);
        let before = *f.state(0, Channel::Ax).unwrap();

        assert_eq!(f.filter(0, Channel::Ax, 1.0, 99.0), last);
        assert_eq!(*f.state(0, Channel::Ax).unwrap(), before);
        assert_eq!(f.filter(0, Channel::Ax, 0.5, -99.0), last);
        assert_eq!(*f.state(0, Channel::Ax).unwrap(), before);
        assert_eq!(f.filter(0, Channel::Ax, f32::NAN, 7.0), last);
        assert_eq!(*f.state(0, Channel::Ax).unwrap(), before);
    }

    #[test]
    fn test_bank_channels_are_independent() {
        let mut bank = FilterBank::new(2, FilterParams::default());
        assert_eq!(bank.joint_count(), 2);

        bank.filter(0, Channel::Ax, 0.0, 10.0);
        bank.filter(0, Channel::Ax, 1.0, 20.0);
        assert!(bank.state(0, Channel::Ay).is_none());
        assert!(bank.state(1, Channel::Ax).is_none());

        // first touch of another joint's channel is a passthrough
        assert_eq!(bank.filter(1, Channel::Ax, 1.0, 500.0), 500.0);
        assert_eq!(bank.state(0, Channel::Ax).unwrap().last_time, 1.0);
    }

    #[test]
    fn test_bank_filter_points_keeps_confidence() {
        let mut bank = FilterBank::new(1, FilterParams::default());
        let points = JointPoints::new(
            Keypoint::new(100.0, 100.0, 0.9),
            Keypoint::new(120.0, 140.0, 0.8),
            Keypoint::new(110.0, 200.0, 0.7),
        );
        assert_eq!(bank.filter_points(0, 0.0, points), points);

        let moved = JointPoints::new(
            Keypoint::new(110.0, 100.0, 0.6),
            Keypoint::new(120.0, 140.0, 0.6),
            Keypoint::new(110.0, 200.0, 0.6),
        );
        let smooth = bank.filter_points(0, 1.0, moved);
        assert!(smooth.a.x > 100.0 && smooth.a.x < 110.0);
        assert_eq!(smooth.b.x, 120.0);
        assert_eq!(smooth.a.confidence, 0.6);
    }

    #[test]
    fn test_bank_reset() {
        let mut bank = FilterBank::new(1, FilterParams::default());
        bank.filter(0, Channel::Cy, 0.0, 1.0);
        bank.filter(0, Channel::Cy, 1.0, 2.0);
        bank.reset();
        assert!(bank.state(0, Channel::Cy).is_none());

        // After reset, first sample should pass through, even at an earlier time
        assert_eq!(bank.filter(0, Channel::Cy, 0.0, 50.0), 50.0);
        assert_eq!(bank.state(0, Channel::Cy).unwrap().last_value, 50.0);
    }
}
