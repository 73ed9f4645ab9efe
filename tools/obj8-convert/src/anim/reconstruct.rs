//! Parsed keyframes -> per-frame matrices
//!
//! Inside one animation block translations and rotations are keyed by
//! dataref value, possibly out of order and with different key sets per
//! path. On `ANIM_end` the keys are merged into one sorted sequence and every
//! path is sampled at every key.

use glam::{DMat4, DVec3};
use smallvec::SmallVec;
use std::ops::{Add, Mul, Sub};

/// One rotation in the block's chain
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotationAxis {
    /// Host-space axis
    pub axis: DVec3,
    /// Degrees, for a rotation that does not change with the dataref
    pub fixed: Option<f64>,
}

/// One reconstructed keyframe
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe {
    pub value: f64,
    pub matrix: DMat4,
}

/// Keyframe data collected for one open animation block
#[derive(Clone, Debug, Default)]
pub struct KeyframeMaps {
    /// Static pivot the block's paths are relative to
    pub origin: DVec3,
    translations: Vec<(f64, DVec3)>,
    rotations: Vec<(f64, SmallVec<[(usize, f64); 3]>)>,
    axes: Vec<RotationAxis>,
}

impl KeyframeMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a translation keyframe. A repeated value overwrites.
    pub fn add_translation(&mut self, value: f64, t: DVec3) {
        match self.translations.iter_mut().find(|(v, _)| *v == value) {
            Some(entry) => entry.1 = t,
            None => self.translations.push((value, t)),
        }
    }

    /// Start a keyed rotation about `axis`, returning its chain index
    pub fn begin_rotation(&mut self, axis: DVec3) -> usize {
        self.axes.push(RotationAxis { axis, fixed: None });
        self.axes.len() - 1
    }

    /// Record a rotation keyframe on a chain entry from [`begin_rotation`](Self::begin_rotation)
    pub fn add_rotation(&mut self, axis_index: usize, value: f64, degrees: f64) {
        let entry = match self.rotations.iter().position(|(v, _)| *v == value) {
            Some(i) => &mut self.rotations[i].1,
            None => {
                self.rotations.push((value, SmallVec::new()));
                let last = self.rotations.len() - 1;
                &mut self.rotations[last].1
            }
        };
        match entry.iter_mut().find(|(a, _)| *a == axis_index) {
            Some(slot) => slot.1 = degrees,
            None => entry.push((axis_index, degrees)),
        }
    }

    /// Add a rotation that applies at every keyframe
    pub fn add_static_rotation(&mut self, axis: DVec3, degrees: f64) {
        self.axes.push(RotationAxis {
            axis,
            fixed: Some(degrees),
        });
    }

    /// True once any keyed path or rotation has been added
    pub fn has_paths(&self) -> bool {
        !self.translations.is_empty() || !self.axes.is_empty()
    }

    /// Sorted union of every recorded key
    pub fn keys(&self) -> Vec<f64> {
        let mut keys: Vec<f64> = self
            .translations
            .iter()
            .map(|(v, _)| *v)
            .chain(self.rotations.iter().map(|(v, _)| *v))
            .collect();
        keys.sort_by(|a, b| a.total_cmp(b));
        keys.dedup();
        keys
    }

    /// Translation at `value`; flat beyond the recorded keys
    pub fn translation_at(&self, value: f64) -> DVec3 {
        let mut samples = self.translations.clone();
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        sample(&samples, value, false).unwrap_or(DVec3::ZERO)
    }

    /// Angle of chain entry `axis_index` at `value`; linear beyond the
    /// recorded keys
    pub fn angle_at(&self, axis_index: usize, value: f64) -> f64 {
        if let Some(fixed) = self.axes.get(axis_index).and_then(|a| a.fixed) {
            return fixed;
        }
        let mut samples: Vec<(f64, f64)> = self
            .rotations
            .iter()
            .filter_map(|(v, list)| {
                list.iter()
                    .find(|(a, _)| *a == axis_index)
                    .map(|(_, angle)| (*v, *angle))
            })
            .collect();
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        sample(&samples, value, true).unwrap_or(0.0)
    }

    /// Transform of the block at `value`
    pub fn matrix_at(&self, value: f64) -> DMat4 {
        let mut m = DMat4::from_translation(self.origin + self.translation_at(value));
        for (i, axis) in self.axes.iter().enumerate() {
            let angle = self.angle_at(i, value);
            if angle != 0.0 {
                m *= DMat4::from_axis_angle(axis.axis.normalize_or_zero(), angle.to_radians());
            }
        }
        m
    }

    /// One keyframe per distinct key, in ascending key order
    pub fn reconstruct(&self) -> Vec<Keyframe> {
        self.keys()
            .into_iter()
            .map(|value| Keyframe {
                value,
                matrix: self.matrix_at(value),
            })
            .collect()
    }
}

/// Sample a sorted keyed series at `v`.
///
/// An exact key returns its value. Between keys the value is interpolated
/// linearly; beyond the ends it is either held flat or extrapolated from the
/// two nearest keys.
fn sample<T>(samples: &[(f64, T)], v: f64, extrapolate: bool) -> Option<T>
where
    T: Copy + Add<Output = T> + Sub<Output = T> + Mul<f64, Output = T>,
{
    let first = samples.first()?;
    let last = samples.last()?;
    if let Some((_, t)) = samples.iter().find(|(k, _)| *k == v) {
        return Some(*t);
    }
    if samples.len() == 1 {
        return Some(first.1);
    }
    let (a, b) = if v < first.0 {
        if !extrapolate {
            return Some(first.1);
        }
        (&samples[0], &samples[1])
    } else if v > last.0 {
        if !extrapolate {
            return Some(last.1);
        }
        (&samples[samples.len() - 2], &samples[samples.len() - 1])
    } else {
        let i = samples.iter().position(|(k, _)| *k > v)?;
        (&samples[i - 1], &samples[i])
    };
    let f = (v - a.0) / (b.0 - a.0);
    Some(a.1 + (b.1 - a.1) * f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use obj8_shared::math::max_abs_diff;

    #[test]
    fn test_merge_interpolates_missing_translation() {
        let mut maps = KeyframeMaps::new();
        maps.add_translation(2.0, DVec3::new(2.0, 4.0, 6.0));
        maps.add_translation(0.0, DVec3::ZERO);
        let z = maps.begin_rotation(DVec3::Z);
        for (v, a) in [(0.0, 0.0), (1.0, 45.0), (2.0, 90.0)] {
            maps.add_rotation(z, v, a);
        }

        let frames = maps.reconstruct();
        assert_eq!(frames.len(), 3);
        assert_eq!(
            frames.iter().map(|f| f.value).collect::<Vec<_>>(),
            vec![0.0, 1.0, 2.0]
        );
        assert_eq!(maps.translation_at(1.0), DVec3::new(1.0, 2.0, 3.0));

        let expected = DMat4::from_translation(DVec3::new(1.0, 2.0, 3.0))
            * DMat4::from_rotation_z(45f64.to_radians());
        assert!(max_abs_diff(&frames[1].matrix, &expected) < 1e-12);
    }

    #[test]
    fn test_missing_axis_is_interpolated_from_its_own_keys() {
        let mut maps = KeyframeMaps::new();
        let z = maps.begin_rotation(DVec3::Z);
        let x = maps.begin_rotation(DVec3::X);
        for (v, a) in [(0.0, 0.0), (1.0, 10.0), (2.0, 20.0)] {
            maps.add_rotation(z, v, a);
        }
        maps.add_rotation(x, 0.0, 0.0);
        maps.add_rotation(x, 2.0, 60.0);

        assert_eq!(maps.angle_at(x, 1.0), 30.0);
        assert_eq!(maps.angle_at(z, 1.0), 10.0);
    }

    #[test]
    fn test_rotation_extrapolates_linearly() {
        let mut maps = KeyframeMaps::new();
        maps.add_translation(0.0, DVec3::X);
        let y = maps.begin_rotation(DVec3::Y);
        maps.add_rotation(y, 1.0, 10.0);
        maps.add_rotation(y, 2.0, 20.0);
        maps.add_translation(3.0, DVec3::X);

        assert_eq!(maps.keys(), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(maps.angle_at(y, 0.0), 0.0);
        assert_eq!(maps.angle_at(y, 3.0), 30.0);
        // Translation holds flat
        assert_eq!(maps.translation_at(1.5), DVec3::X);
    }

    #[test]
    fn test_translation_holds_flat_at_ends() {
        let mut maps = KeyframeMaps::new();
        maps.add_translation(1.0, DVec3::new(1.0, 0.0, 0.0));
        maps.add_translation(2.0, DVec3::new(3.0, 0.0, 0.0));
        assert_eq!(maps.translation_at(0.0), DVec3::new(1.0, 0.0, 0.0));
        assert_eq!(maps.translation_at(5.0), DVec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_static_rotation_keeps_chain_position() {
        let mut maps = KeyframeMaps::new();
        maps.origin = DVec3::new(0.0, 0.0, 1.0);
        maps.add_static_rotation(DVec3::Z, 30.0);
        let x = maps.begin_rotation(DVec3::X);
        maps.add_rotation(x, 0.0, 0.0);
        maps.add_rotation(x, 1.0, 90.0);

        let frames = maps.reconstruct();
        let expected = DMat4::from_translation(DVec3::new(0.0, 0.0, 1.0))
            * DMat4::from_rotation_z(30f64.to_radians())
            * DMat4::from_rotation_x(90f64.to_radians());
        assert!(max_abs_diff(&frames[1].matrix, &expected) < 1e-12);
    }

    #[test]
    fn test_no_keys_gives_no_frames() {
        let mut maps = KeyframeMaps::new();
        maps.origin = DVec3::X;
        assert!(maps.reconstruct().is_empty());
        assert_eq!(maps.matrix_at(0.0), DMat4::from_translation(DVec3::X));
    }
}
