//! Math utilities
//!
//! Re-exports glam with the angle conventions used by the shell

pub use glam::*;

/// Unit direction for a pair of angles in degrees.
///
/// Y is up. Azimuth 0 points along +Z and increases toward +X; elevation
/// 90 points straight up.
pub fn direction_from_angles(azimuth_deg: f32, elevation_deg: f32) -> Vec3 {
    let azimuth = azimuth_deg.to_radians();
    let elevation = elevation_deg.to_radians();
    let (sin_el, cos_el) = elevation.sin_cos();
    let (sin_az, cos_az) = azimuth.sin_cos();
    Vec3::new(cos_el * sin_az, sin_el, cos_el * cos_az).normalize()
}

/// Wrap an angle in degrees into `[0, 360)`.
pub fn wrap_degrees(deg: f32) -> f32 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
