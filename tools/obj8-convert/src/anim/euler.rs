//! Z·Y·X Euler decomposition
//!
//! OBJ8 applies animation commands outermost first, and keyframed rotations
//! are written Z, then Y, then X, so a rotation matrix is decomposed as
//! `R = Rz(z) · Ry(y) · Rx(x)`. At y = ±90° (gimbal lock) only `x - z` or
//! `x + z` is determined; the caller supplies the Z angle to pin it down.

use glam::{DMat3, DQuat, DVec3};

/// Result of decomposing one rotation
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EulerAngles {
    /// (x, y, z) in radians
    Determinate(DVec3),
    /// Y is at ±90° and X/Z are coupled
    Indeterminate(GimbalLock),
}

/// The coupled state at gimbal lock
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GimbalLock {
    /// +π/2 or -π/2
    pub y: f64,
    /// `x - z` when y = +90°, `x + z` when y = -90°
    pub coupled: f64,
}

impl GimbalLock {
    /// Pick the decomposition with the given Z angle
    pub fn resolve(&self, z: f64) -> DVec3 {
        let x = if self.y > 0.0 {
            self.coupled + z
        } else {
            self.coupled - z
        };
        DVec3::new(x, self.y, z)
    }
}

/// Decompose a pure rotation into Z·Y·X Euler angles.
///
/// `tolerance` is how close |sin(y)| must come to 1 before the result is
/// treated as gimbal locked.
pub fn euler_zyx(m: &DMat3, tolerance: f64) -> EulerAngles {
    let m20 = m.x_axis.z;
    if m20.abs() < 1.0 - tolerance {
        let y = -m20.asin();
        let x = m.y_axis.z.atan2(m.z_axis.z);
        let z = m.x_axis.y.atan2(m.x_axis.x);
        EulerAngles::Determinate(DVec3::new(x, y, z))
    } else if m20 < 0.0 {
        EulerAngles::Indeterminate(GimbalLock {
            y: std::f64::consts::FRAC_PI_2,
            coupled: m.y_axis.x.atan2(m.z_axis.x),
        })
    } else {
        EulerAngles::Indeterminate(GimbalLock {
            y: -std::f64::consts::FRAC_PI_2,
            coupled: (-m.y_axis.x).atan2(-m.z_axis.x),
        })
    }
}

/// Rebuild `Rz(z) · Ry(y) · Rx(x)` from (x, y, z) radians
pub fn compose_zyx(angles: DVec3) -> DMat3 {
    DMat3::from_rotation_z(angles.z)
        * DMat3::from_rotation_y(angles.y)
        * DMat3::from_rotation_x(angles.x)
}

/// Halfway rotation between two orientations
pub fn midpoint(a: &DMat3, b: &DMat3) -> DMat3 {
    let qa = DQuat::from_mat3(a).normalize();
    let qb = DQuat::from_mat3(b).normalize();
    DMat3::from_quat(qa.slerp(qb, 0.5))
}
