//! Timing curves shared by the phase animations. All pure functions of progress.

use std::time::Duration;

/// Size of a token at rest, as a fraction of its cell.
pub const REST_SCALE: f32 = 0.9;

/// Size of the hovered token.
pub const HOVER_SCALE: f32 = 1.0;

/// Fraction of `length` covered by `elapsed`, not clamped.
#[inline]
pub fn progress(elapsed: Duration, length: Duration) -> f32 {
    if length.is_zero() {
        return 1.0;
    }
    elapsed.as_secs_f32() / length.as_secs_f32()
}

/// 0 → 1 → 0 over one period, `t` in `[0, 1]`.
#[inline]
pub fn triangle(t: f32) -> f32 {
    if t <= 0.5 { t * 2.0 } else { (1.0 - t) * 2.0 }
}

/// Position of `elapsed` inside a repeating period, in `[0, 1)`.
#[inline]
pub fn cycle(elapsed: Duration, period: Duration) -> f32 {
    if period.is_zero() {
        return 0.0;
    }
    let period_ms = period.as_millis().max(1);
    (elapsed.as_millis() % period_ms) as f32 / period_ms as f32
}

/// Hint emphasis: oscillates between the rest scale and full size.
pub fn pulse_scale(elapsed: Duration, period: Duration) -> f32 {
    REST_SCALE + (1.0 - REST_SCALE) * triangle(cycle(elapsed, period))
}

/// How far along the hint gesture the hand is, back and forth.
pub fn hand_fraction(elapsed: Duration, period: Duration) -> f32 {
    triangle(cycle(elapsed, period))
}

/// Explosion and restart: from rest size down to nothing.
pub fn shrink_scale(elapsed: Duration, length: Duration) -> f32 {
    REST_SCALE * (1.0 - progress(elapsed, length)).max(0.0)
}

/// Accepted swap: `(position, wobble)`; position linear, wobble peaks halfway.
pub fn settle_curve(t: f32) -> (f32, f32) {
    let t = t.clamp(0.0, 1.0);
    (t, triangle(t))
}

/// Rejected swap: the pair slides halfway over each other and back, with the
/// wobble peaking once on the way out and once on the way back.
pub fn reject_curve(t: f32) -> (f32, f32) {
    let t = t.clamp(0.0, 1.0);
    if t <= 0.25 {
        (t * 2.0, t * 4.0)
    } else if t <= 0.5 {
        (t * 2.0, (0.5 - t) * 4.0)
    } else if t <= 0.75 {
        ((1.0 - t) * 2.0, (t - 0.5) * 4.0)
    } else {
        ((1.0 - t) * 2.0, (1.0 - t) * 4.0)
    }
}

/// Scale of the token arriving at the grabbed cell.
#[inline]
pub fn incoming_scale(wobble: f32) -> f32 {
    REST_SCALE * (1.0 - wobble / 5.0)
}

/// Scale of the grabbed token leaving its cell.
#[inline]
pub fn outgoing_scale(wobble: f32) -> f32 {
    REST_SCALE * (1.0 + wobble / 10.0)
}

#[inline]
pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}
