//! Math helpers for the OBJ8 codec
//!
//! The host scene is Z-up, the OBJ8 file format is Y-up. Every position,
//! normal, translation and rotation axis that crosses the file boundary goes
//! through [`to_file`] / [`from_file`], so the axis swap lives in exactly one
//! place.

use glam::{DMat3, DMat4, DVec3};

/// Identity transform in column-major array form (the scene's storage layout)
pub const IDENTITY: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

// ============================================================================
// Axis conversion
// ============================================================================

/// Host (x, y, z) -> file (x, z, -y)
#[inline]
pub fn to_file(v: DVec3) -> DVec3 {
    DVec3::new(v.x, v.z, -v.y)
}

/// File (x, y, z) -> host (x, -z, y)
#[inline]
pub fn from_file(v: DVec3) -> DVec3 {
    DVec3::new(v.x, -v.z, v.y)
}

// ============================================================================
// Rounding
// ============================================================================

/// Round to a fixed number of decimals.
///
/// Negative zero is folded into positive zero so that values which print
/// identically also compare identically.
#[inline]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    let rounded = (value * scale).round() / scale;
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Round each component of a vector
#[inline]
pub fn round_vec3(v: DVec3, decimals: u32) -> DVec3 {
    DVec3::new(
        round_to(v.x, decimals),
        round_to(v.y, decimals),
        round_to(v.z, decimals),
    )
}

/// Pick the representative of `angle` (degrees) that lies in
/// `[previous - 180, previous + 180)`.
///
/// Applied keyframe over keyframe this keeps a rotation path continuous even
/// when its total swing exceeds a full turn.
#[inline]
pub fn continuous_angle(angle: f64, previous: f64) -> f64 {
    (angle - previous + 180.0).rem_euclid(360.0) + previous - 180.0
}

// ============================================================================
// Matrix helpers
// ============================================================================

/// Build a matrix from the scene's column-major storage
#[inline]
pub fn mat4(cols: &[f64; 16]) -> DMat4 {
    DMat4::from_cols_array(cols)
}

/// The 3x3 linear part of an affine transform
#[inline]
pub fn linear_part(m: &DMat4) -> DMat3 {
    DMat3::from_mat4(*m)
}

/// The affine transform with its translation removed
#[inline]
pub fn without_translation(m: &DMat4) -> DMat4 {
    DMat4::from_mat3(linear_part(m))
}

/// Translation component of an affine transform
#[inline]
pub fn translation(m: &DMat4) -> DVec3 {
    m.w_axis.truncate()
}

/// Per-axis scale factors (lengths of the basis vectors)
pub fn axis_scales(m: &DMat4) -> DVec3 {
    DVec3::new(
        m.x_axis.truncate().length(),
        m.y_axis.truncate().length(),
        m.z_axis.truncate().length(),
    )
}

/// Rotation part with per-axis scale divided out.
///
/// Degenerate (zero-length) axes are left untouched.
pub fn normalized_rotation(m: &DMat4) -> DMat3 {
    let scales = axis_scales(m);
    let unscale = |s: f64| if s > f64::EPSILON { 1.0 / s } else { 1.0 };
    DMat3::from_cols(
        m.x_axis.truncate() * unscale(scales.x),
        m.y_axis.truncate() * unscale(scales.y),
        m.z_axis.truncate() * unscale(scales.z),
    )
}

/// True when a transform mirrors geometry, which flips triangle winding
#[inline]
pub fn is_mirrored(m: &DMat4) -> bool {
    linear_part(m).determinant() < 0.0
}

/// Maximum absolute element difference between two matrices
pub fn max_abs_diff(a: &DMat4, b: &DMat4) -> f64 {
    a.to_cols_array()
        .iter()
        .zip(b.to_cols_array().iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_conversion_is_inverse() {
        let v = DVec3::new(1.5, -2.25, 3.0);
        assert_eq!(to_file(v), DVec3::new(1.5, 3.0, 2.25));
        assert_eq!(from_file(to_file(v)), v);
        assert_eq!(to_file(from_file(v)), v);
    }

    #[test]
    fn test_up_axis_maps_to_file_y() {
        assert_eq!(to_file(DVec3::Z), DVec3::Y);
        assert_eq!(from_file(DVec3::Y), DVec3::Z);
    }

    #[test]
    fn test_round_to_folds_negative_zero() {
        let r = round_to(-0.00001, 4);
        assert_eq!(r.to_bits(), 0.0f64.to_bits());
        assert_eq!(round_to(1.23456, 4), 1.2346);
        assert_eq!(round_to(-1.23454, 3), -1.235);
    }

    #[test]
    fn test_continuous_angle_wraps_relative_to_previous() {
        assert_eq!(continuous_angle(-170.0, 170.0), 190.0);
        assert_eq!(continuous_angle(170.0, -170.0), -190.0);
        assert_eq!(continuous_angle(10.0, 350.0), 370.0);
        assert_eq!(continuous_angle(45.0, 0.0), 45.0);
    }

    #[test]
    fn test_mirrored_transform() {
        let m = DMat4::from_scale(DVec3::new(-1.0, 1.0, 1.0));
        assert!(is_mirrored(&m));
        assert!(!is_mirrored(&DMat4::IDENTITY));
    }

    #[test]
    fn test_normalized_rotation_strips_scale() {
        let m = DMat4::from_scale_rotation_translation(
            DVec3::new(2.0, 3.0, 4.0),
            glam::DQuat::from_rotation_z(0.5),
            DVec3::new(1.0, 2.0, 3.0),
        );
        let r = normalized_rotation(&m);
        let expected = DMat3::from_rotation_z(0.5);
        for (a, b) in r.to_cols_array().iter().zip(expected.to_cols_array().iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
