//! Step planning for fades and strobes.
//!
//! Everything here is pure: plans advance the intensity accumulators and tell
//! the channel what happened, but never touch the output or the clock.

use crate::color::Color;

/// Fade tick period in milliseconds (50 Hz).
pub const FADE_TICK_MS: u64 = 20;

/// Number of ticks for a fade lasting `duration_ms`.
///
/// Rounds half up. Durations shorter than one tick yield zero, meaning the
/// fade degenerates into an immediate set.
pub(crate) fn fade_steps(duration_ms: u64) -> u32 {
    if duration_ms < FADE_TICK_MS {
        return 0;
    }
    let steps = duration_ms / FADE_TICK_MS + u64::from(duration_ms % FADE_TICK_MS >= FADE_TICK_MS / 2);
    u32::try_from(steps).unwrap_or(u32::MAX)
}

/// Number of half-periods for a strobe lasting `duration_ms`.
///
/// Rounds half up, then bumps even counts by one so the final half-period is
/// always "off". `half_period_ms` must be non-zero.
pub(crate) fn strobe_steps(duration_ms: u64, half_period_ms: u64) -> u32 {
    let quotient = duration_ms / half_period_ms;
    let remainder = duration_ms % half_period_ms;
    let steps = quotient + u64::from(remainder >= half_period_ms - remainder);
    let steps = u32::try_from(steps).unwrap_or(u32::MAX - 1);

    if steps % 2 == 0 { steps + 1 } else { steps }
}

/// Outcome of advancing a fade by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FadeStep {
    /// More ticks remain in the current leg.
    Continue,
    /// An oscillating leg reached its endpoint and turned around.
    Reversed,
    /// The fade reached its target.
    Finished,
}

/// A linear fade between two intensity triples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FadePlan {
    origin: [f32; 3],
    target: [f32; 3],
    delta: [f32; 3],
    total_steps: u32,
    steps_done: u32,
    oscillate: bool,
}

impl FadePlan {
    /// Plans a fade from `from` to `to` over `total_steps` ticks.
    ///
    /// An oscillating plan never finishes: at each endpoint it swaps origin
    /// and target and runs the leg again in the other direction.
    pub(crate) fn new(from: [f32; 3], to: Color, total_steps: u32, oscillate: bool) -> Self {
        let total_steps = total_steps.max(1);
        let target = to.to_intensities();
        let mut delta = [0.0; 3];
        for i in 0..3 {
            delta[i] = (target[i] - from[i]) / total_steps as f32;
        }

        Self {
            origin: from,
            target,
            delta,
            total_steps,
            steps_done: 0,
            oscillate,
        }
    }

    /// Advances `current` by one tick.
    ///
    /// The last tick of a leg lands exactly on the leg's endpoint instead of
    /// adding the final delta, so floating drift never reaches the output.
    pub(crate) fn advance(&mut self, current: &mut [f32; 3]) -> FadeStep {
        self.steps_done += 1;

        if self.steps_done < self.total_steps {
            for i in 0..3 {
                current[i] += self.delta[i];
            }
            return FadeStep::Continue;
        }

        *current = self.target;

        if self.oscillate {
            core::mem::swap(&mut self.origin, &mut self.target);
            for d in self.delta.iter_mut() {
                *d = -*d;
            }
            self.steps_done = 0;
            FadeStep::Reversed
        } else {
            FadeStep::Finished
        }
    }

    pub(crate) fn total_steps(&self) -> u32 {
        self.total_steps
    }

    pub(crate) fn steps_done(&self) -> u32 {
        self.steps_done
    }
}

/// Outcome of advancing a strobe by one half-period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StrobeStep {
    /// Color to apply for this half-period.
    pub color: Color,
    /// True on the last half-period.
    pub finished: bool,
}

/// An on/off strobe sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StrobePlan {
    color: Color,
    total_steps: u32,
    steps_done: u32,
}

impl StrobePlan {
    pub(crate) fn new(color: Color, total_steps: u32) -> Self {
        Self {
            color,
            total_steps,
            steps_done: 0,
        }
    }

    /// Advances by one half-period. Even ticks are off, odd ticks are on.
    pub(crate) fn advance(&mut self) -> StrobeStep {
        let color = if self.steps_done % 2 == 0 {
            Color::OFF
        } else {
            self.color
        };
        self.steps_done += 1;

        StrobeStep {
            color,
            finished: self.steps_done >= self.total_steps,
        }
    }
}

/// Rounds accumulators to whole intensities, turning negative zero into zero.
pub(crate) fn settle(values: &mut [f32; 3]) {
    for v in values.iter_mut() {
        let rounded = libm::roundf(*v);
        *v = if rounded == 0.0 { 0.0 } else { rounded };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_steps_rounds_half_up() {
        assert_eq!(fade_steps(1000), 50);
        assert_eq!(fade_steps(1010), 51);
        assert_eq!(fade_steps(1009), 50);
        assert_eq!(fade_steps(20), 1);
        assert_eq!(fade_steps(29), 1);
        assert_eq!(fade_steps(30), 2);
    }

    #[test]
    fn fade_steps_is_zero_below_one_tick() {
        assert_eq!(fade_steps(0), 0);
        assert_eq!(fade_steps(10), 0);
        assert_eq!(fade_steps(19), 0);
    }

    #[test]
    fn strobe_steps_are_always_odd() {
        for half_period in 1..40 {
            for duration in 0..400 {
                let steps = strobe_steps(duration, half_period);
                assert_eq!(steps % 2, 1, "duration {duration}, half period {half_period}");
            }
        }
    }

    #[test]
    fn strobe_steps_rounds_then_corrects_even_counts() {
        assert_eq!(strobe_steps(25, 10), 3);
        assert_eq!(strobe_steps(40, 10), 5);
        assert_eq!(strobe_steps(50, 10), 5);
        assert_eq!(strobe_steps(0, 10), 1);
    }

    #[test]
    fn fade_plan_lands_exactly_on_target() {
        let mut current = [0.0; 3];
        let mut plan = FadePlan::new(current, Color::new(90, 0, 0), 50, false);

        let mut steps = 0;
        loop {
            steps += 1;
            if plan.advance(&mut current) == FadeStep::Finished {
                break;
            }
        }

        assert_eq!(steps, 50);
        assert_eq!(current, [90.0, 0.0, 0.0]);
    }

    #[test]
    fn oscillating_plan_reverses_at_each_endpoint() {
        let mut current = [10.0, 0.0, 0.0];
        let mut plan = FadePlan::new(current, Color::new(100, 0, 0), 10, true);

        for _ in 0..9 {
            assert_eq!(plan.advance(&mut current), FadeStep::Continue);
        }
        assert_eq!(plan.advance(&mut current), FadeStep::Reversed);
        assert_eq!(current[0], 100.0);
        assert_eq!(plan.steps_done(), 0);

        for _ in 0..9 {
            assert_eq!(plan.advance(&mut current), FadeStep::Continue);
        }
        assert_eq!(plan.advance(&mut current), FadeStep::Reversed);
        assert_eq!(current[0], 10.0);
        assert_eq!(plan.total_steps(), 10);
    }

    #[test]
    fn strobe_plan_alternates_and_ends_off() {
        let mut plan = StrobePlan::new(Color::WHITE, 3);

        let first = plan.advance();
        assert_eq!(first.color, Color::OFF);
        assert!(!first.finished);

        let second = plan.advance();
        assert_eq!(second.color, Color::WHITE);
        assert!(!second.finished);

        let third = plan.advance();
        assert_eq!(third.color, Color::OFF);
        assert!(third.finished);
    }

    #[test]
    fn settle_removes_negative_zero() {
        let mut values = [-0.0, -0.3, 44.6];
        settle(&mut values);
        assert!(values[0].is_sign_positive());
        assert!(values[1].is_sign_positive());
        assert_eq!(values, [0.0, 0.0, 45.0]);
    }
}
