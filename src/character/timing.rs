//! Timing and blend helpers shared by character controllers and audio

use bevy::math::curve::{Curve, EaseFunction, EasingCurve};
use std::time::Duration;

/// Cross-fade into the walk loop
pub const WALK_BLEND: Duration = Duration::from_millis(500);

/// Cross-fade back to idle after an attack
pub const IDLE_BLEND: Duration = Duration::from_millis(500);

/// Short blend into a swing so the hit reads immediately
pub const ATTACK_BLEND: Duration = Duration::from_millis(100);

/// Vertical offset animation that sinks a corpse below the floor.
///
/// Eases in: the body settles slowly, then drops away.
#[derive(Debug, Clone)]
pub struct SinkTween {
    elapsed: Duration,
    duration: Duration,
    curve: EasingCurve<f32>,
    completed: bool,
}

impl SinkTween {
    pub fn new(duration: Duration, depth: f32) -> Self {
        Self {
            elapsed: Duration::ZERO,
            duration,
            curve: EasingCurve::new(0.0, -depth, EaseFunction::CubicIn),
            completed: false,
        }
    }

    /// Advance the tween. Returns `true` exactly once, on the step that completes it.
    pub fn advance(&mut self, delta: Duration) -> bool {
        if self.completed {
            return false;
        }
        self.elapsed = (self.elapsed + delta).min(self.duration);
        if self.elapsed >= self.duration {
            self.completed = true;
            return true;
        }
        false
    }

    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        self.elapsed.as_secs_f32() / self.duration.as_secs_f32()
    }

    /// Current offset along Y (zero at start, `-depth` when complete)
    pub fn offset(&self) -> f32 {
        self.curve.sample_clamped(self.progress())
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }
}

/// Rate limiter keyed on a caller-supplied clock.
///
/// The first call is always allowed; later calls are allowed once `cooldown`
/// has passed since the last accepted one.
#[derive(Debug, Clone, Default)]
pub struct Throttle {
    cooldown: Duration,
    last: Option<Duration>,
}

impl Throttle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last: None,
        }
    }

    pub fn set_cooldown(&mut self, cooldown: Duration) {
        self.cooldown = cooldown;
    }

    pub fn ready(&self, now: Duration) -> bool {
        match self.last {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.cooldown,
        }
    }

    /// Accept the call if ready and remember it
    pub fn try_fire(&mut self, now: Duration) -> bool {
        if !self.ready(now) {
            return false;
        }
        self.last = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_eases_in() {
        let mut sink = SinkTween::new(Duration::from_secs(4), 10.0);
        assert_eq!(sink.offset(), 0.0);

        sink.advance(Duration::from_secs(2));
        let halfway = sink.offset();
        // Cubic ease-in covers an eighth of the depth by the midpoint
        assert!((halfway + 1.25).abs() < 1e-4);

        sink.advance(Duration::from_secs(1));
        assert!(sink.offset() < halfway);
    }

    #[test]
    fn test_sink_completes_once() {
        let mut sink = SinkTween::new(Duration::from_secs(2), 10.0);
        assert!(!sink.advance(Duration::from_secs(1)));
        assert!(sink.offset() < 0.0 && sink.offset() > -10.0);
        assert!(sink.advance(Duration::from_secs(1)));
        assert!(!sink.advance(Duration::from_secs(1)));
        assert!((sink.offset() + 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_throttle_respects_cooldown() {
        let mut throttle = Throttle::new(Duration::from_millis(300));
        assert!(throttle.try_fire(Duration::from_millis(0)));
        assert!(!throttle.try_fire(Duration::from_millis(200)));
        assert!(throttle.try_fire(Duration::from_millis(300)));
    }
}
