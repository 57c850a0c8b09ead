use nalgebra::Vector3;
use std::f64::consts::PI;

/// Convert degrees to radians
#[inline]
pub fn deg_to_rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

/// Convert radians to degrees
#[inline]
pub fn rad_to_deg(rad: f64) -> f64 {
    rad * 180.0 / PI
}

/// Linear interpolation between two values
#[inline]
pub fn lerp(start: f64, end: f64, factor: f64) -> f64 {
    start + (end - start) * factor.clamp(0.0, 1.0)
}

/// Wrap an angle to the range [-π, π)
#[inline]
pub fn wrap_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

/// Pick a coordinate axis guaranteed not to be colinear with the given vector.
///
/// Returns the axis along which the vector has its smallest component, so the
/// cross product of the two is well conditioned.
pub fn non_colinear_axis(v: &Vector3<f64>) -> Vector3<f64> {
    let (x, y, z) = (v.x.abs(), v.y.abs(), v.z.abs());

    if x <= y && x <= z {
        Vector3::x()
    } else if y <= z {
        Vector3::y()
    } else {
        Vector3::z()
    }
}
