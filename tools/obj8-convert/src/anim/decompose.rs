//! Keyframe matrices -> animation paths
//!
//! An animated instance carries one transform per keyframe. OBJ8 can only
//! express a translation path followed by rotations about fixed axes, so each
//! keyframe matrix is split into `T(t) · Rz(z) · Ry(y) · Rx(x) · Rest` where
//! `Rest` is the same for every keyframe and is baked into the children.

use glam::{DMat3, DMat4, DVec3};
use obj8_shared::math::{
    continuous_angle, linear_part, mat4, normalized_rotation, round_to, round_vec3, translation,
    without_translation,
};
use obj8_shared::AnimationRecord;
use thiserror::Error;

use super::euler::{euler_zyx, midpoint, EulerAngles};
use super::AnimationNode;
use crate::config::ExportConfig;

/// The instance has nothing the format can animate
#[derive(Debug, Error, PartialEq, Eq)]
#[error("not an animation")]
pub struct NotAnimated;

/// A decomposed animation
#[derive(Debug, Clone)]
pub struct Decomposed {
    /// Paths and bindings; `parent`, `cache_key` and `label` are left for the
    /// caller to fill in
    pub node: AnimationNode,
    /// Transform to apply to the instance's children
    pub rest: DMat4,
}

/// Decompose an animated instance.
///
/// `current` is the instance's own transform, `context` the transform of the
/// container it sits in. With no keyframes the current transform is the only
/// frame.
pub fn decompose(
    record: &AnimationRecord,
    current: &DMat4,
    context: &DMat4,
    config: &ExportConfig,
) -> Result<Decomposed, NotAnimated> {
    let count = record.frame_count();
    let world_current = *context * *current;
    let frames: Vec<DMat4> = if count == 0 {
        vec![world_current]
    } else {
        record.matrices[..count]
            .iter()
            .map(|m| *context * mat4(m))
            .collect()
    };

    let mut translations: Vec<DVec3> = frames
        .iter()
        .map(|w| round_vec3(translation(w), config.position_precision))
        .collect();
    if translations.windows(2).all(|w| w[0] == w[1]) {
        translations.truncate(1);
    }

    let angles = rotation_series(&frames, config);
    let varies = |axis: usize| angles.windows(2).any(|w| w[0][axis] != w[1][axis]);
    let varying = [varies(0), varies(1), varies(2)];

    let mut node = AnimationNode {
        parent: None,
        cache_key: 0,
        dataref: record.dataref.clone(),
        keyframe_values: record.values[..count].to_vec(),
        loop_value: record.loop_value.clone(),
        translations,
        rotation_x: Vec::new(),
        rotation_y: Vec::new(),
        rotation_z: Vec::new(),
        hide_show: record.hide_show.clone(),
        label: String::new(),
    };

    let rest = if !varying.iter().any(|v| *v) {
        if node.translations.len() > 1 {
            without_translation(&world_current)
        } else if !node.hide_show.is_empty() {
            node.translations.clear();
            world_current
        } else {
            return Err(NotAnimated);
        }
    } else {
        // Application order is Z, Y, X. A constant axis ahead of a varying one
        // has to stay in the chain; one behind every varying axis can be
        // folded into the rest transform.
        const CHAIN: [usize; 3] = [2, 1, 0];
        let last_varying = CHAIN.iter().rposition(|&a| varying[a]).unwrap_or(0);
        let mut folded = DMat3::IDENTITY;
        for (pos, &axis) in CHAIN.iter().enumerate() {
            let series: Vec<f64> = angles.iter().map(|a| a[axis]).collect();
            let fixed = series[0];
            let path = if varying[axis] {
                series
            } else if pos < last_varying {
                if fixed != 0.0 {
                    vec![fixed]
                } else {
                    Vec::new()
                }
            } else {
                folded *= axis_rotation(axis, fixed.to_radians());
                Vec::new()
            };
            match axis {
                0 => node.rotation_x = path,
                1 => node.rotation_y = path,
                _ => node.rotation_z = path,
            }
        }
        let scale = normalized_rotation(&world_current).inverse() * linear_part(&world_current);
        DMat4::from_mat3(folded * scale)
    };

    tracing::debug!(
        "Decomposed animation: {} frames, {} translations, rotations x/y/z = {}/{}/{}",
        count,
        node.translations.len(),
        node.rotation_x.len(),
        node.rotation_y.len(),
        node.rotation_z.len()
    );

    Ok(Decomposed { node, rest })
}

/// Rebuild the transform at `frame` from a node's paths and rest transform.
/// Single-entry paths apply to every frame.
pub fn recompose(node: &AnimationNode, rest: &DMat4, frame: usize) -> DMat4 {
    let t = node
        .translations
        .get(frame)
        .or(node.translations.first())
        .copied()
        .unwrap_or(DVec3::ZERO);
    let mut m = DMat4::from_translation(t);
    for (axis, path) in node.rotation_paths() {
        if let Some(angle) = path.get(frame).or(path.first()) {
            m *= DMat4::from_axis_angle(axis, angle.to_radians());
        }
    }
    m * *rest
}

fn axis_rotation(axis: usize, radians: f64) -> DMat3 {
    match axis {
        0 => DMat3::from_rotation_x(radians),
        1 => DMat3::from_rotation_y(radians),
        _ => DMat3::from_rotation_z(radians),
    }
}

/// Per-keyframe (x, y, z) degrees, rounded and unwrapped frame over frame
fn rotation_series(frames: &[DMat4], config: &ExportConfig) -> Vec<DVec3> {
    let rotations: Vec<DMat3> = frames.iter().map(normalized_rotation).collect();
    let precision = config.angle_precision;
    let tolerance = config.gimbal_tolerance;

    let mut series: Vec<DVec3> = Vec::with_capacity(rotations.len());
    let mut previous_raw: Option<DVec3> = None;
    for (k, rotation) in rotations.iter().enumerate() {
        let raw = match euler_zyx(rotation, tolerance) {
            EulerAngles::Determinate(angles) => angles,
            EulerAngles::Indeterminate(lock) => {
                let hint = if config.force_gimbal {
                    previous_raw.map_or(0.0, |p| p.z)
                } else {
                    gimbal_hint(&rotations, k, previous_raw, tolerance)
                };
                tracing::debug!("Gimbal lock at keyframe {}, z = {:.4}", k, hint);
                lock.resolve(hint)
            }
        };
        let degrees = DVec3::new(
            round_to(raw.x.to_degrees(), precision),
            round_to(raw.y.to_degrees(), precision),
            round_to(raw.z.to_degrees(), precision),
        );
        let angles = match series.last() {
            Some(prev) => DVec3::new(
                round_to(continuous_angle(degrees.x, prev.x), precision),
                round_to(continuous_angle(degrees.y, prev.y), precision),
                round_to(continuous_angle(degrees.z, prev.z), precision),
            ),
            None => degrees,
        };
        series.push(angles);
        previous_raw = Some(raw);
    }
    series
}

/// Z angle to use at a locked keyframe: decompose the rotation halfway to a
/// neighbouring keyframe, which is normally not locked
fn gimbal_hint(rotations: &[DMat3], k: usize, previous: Option<DVec3>, tolerance: f64) -> f64 {
    let neighbour = if k > 0 {
        Some(k - 1)
    } else if k + 1 < rotations.len() {
        Some(k + 1)
    } else {
        None
    };
    let fallback = previous.map_or(0.0, |p| p.z);
    match neighbour {
        Some(n) => match euler_zyx(&midpoint(&rotations[n], &rotations[k]), tolerance) {
            EulerAngles::Determinate(angles) => angles.z,
            EulerAngles::Indeterminate(_) => fallback,
        },
        None => fallback,
    }
}
