//! Easing and clamping helpers for zoom interpolation.
//!
//! Pure scalar functions. Vector interpolation itself goes through
//! `glam::DVec2::lerp`; this module owns the easing curve applied to the
//! interpolation parameter before it reaches the lerp, plus the clamp used
//! for normalized focus coordinates.

/// Cubic ease-in-out over `t` in [0, 1].
///
/// Accelerates through the first half (`4t³`), decelerates through the
/// second (`1 + (2t-2)³/2`). Fixed points: 0 → 0, 0.5 → 0.5, 1 → 1;
/// odd-symmetric about the midpoint.
#[must_use]
pub fn ease_in_out_cubic(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let p = 2.0 * t - 2.0;
        1.0 + p * p * p / 2.0
    }
}

/// Clamp into the normalized [0, 1] range used for focus coordinates.
#[must_use]
pub fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}
