use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec3;

/// Unit direction for a yaw/pitch pair; yaw 0 and pitch 0 face +Z
pub fn spherical_to_cartesian(yaw: f32, pitch: f32) -> Vec3 {
    Vec3::new(pitch.cos() * yaw.sin(), pitch.sin(), pitch.cos() * yaw.cos())
}

/// Wrap an angle into (-π, π]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

pub fn clamp_pitch(pitch: f32) -> f32 {
    pitch.clamp(-FRAC_PI_2, FRAC_PI_2)
}

/// Per-tick easing factor rescaled to an arbitrary frame time.
///
/// `base` is the factor applied once per tick at `reference_rate` ticks per
/// second; the result decays by the same amount per second at any rate.
pub fn easing_factor(base: f32, delta_seconds: f32, reference_rate: f32) -> f32 {
    base.powf(delta_seconds.max(0.0) * reference_rate)
}
