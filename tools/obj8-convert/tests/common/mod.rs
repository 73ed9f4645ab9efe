//! Scene builders shared by the integration tests

#![allow(dead_code)]

use glam::DMat4;
use obj8_shared::{
    AnimationRecord, Definition, Entity, Face, FaceMesh, Instance, Material, Scene, SurfaceFlags,
};
use std::path::Path;

/// Write a blank power-of-two texture
pub fn write_texture(path: &Path) {
    image::RgbImage::new(64, 64)
        .save(path)
        .expect("Failed to save texture");
}

/// A quad from four corners, counter-clockwise seen from the front
pub fn quad(corners: [[f64; 3]; 4], material: Option<usize>, flags: SurfaceFlags) -> Face {
    let [a, b, c, _] = corners.map(glam::DVec3::from_array);
    let normal = (b - a).cross(c - a).normalize().to_array();
    let mut face = Face {
        mesh: FaceMesh {
            points: corners.to_vec(),
            normals: vec![normal; 4],
            front_uvs: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            back_uvs: vec![],
            triangles: vec![[0, 1, 2], [0, 2, 3]],
        },
        material,
        ..Default::default()
    };
    flags.write(&mut face.attributes);
    face
}

/// Unit cube with every face textured. The top is hard, the bottom is
/// ground (poly-offset).
pub fn textured_cube(texture: &str) -> Scene {
    let hard = SurfaceFlags {
        hard: true,
        ..Default::default()
    };
    let poly = SurfaceFlags {
        poly: true,
        ..Default::default()
    };
    let plain = SurfaceFlags::default();
    let sides = [
        ([[0., 0., 1.], [1., 0., 1.], [1., 1., 1.], [0., 1., 1.]], hard),
        ([[0., 0., 0.], [0., 1., 0.], [1., 1., 0.], [1., 0., 0.]], poly),
        ([[1., 0., 0.], [1., 1., 0.], [1., 1., 1.], [1., 0., 1.]], plain),
        ([[0., 0., 0.], [0., 0., 1.], [0., 1., 1.], [0., 1., 0.]], plain),
        ([[0., 0., 0.], [1., 0., 0.], [1., 0., 1.], [0., 0., 1.]], plain),
        ([[0., 1., 0.], [0., 1., 1.], [1., 1., 1.], [1., 1., 0.]], plain),
    ];
    Scene {
        materials: vec![Material::textured("wood", texture)],
        definitions: vec![],
        entities: sides
            .into_iter()
            .map(|(corners, flags)| Entity::Face(quad(corners, Some(0), flags)))
            .collect(),
    }
}

/// A door panel on a dataref, hinged at x = 2 and swinging 90 degrees
/// about +Z
pub fn animated_door(texture: &str) -> Scene {
    let panel = quad(
        [[0., 0., 0.], [1., 0., 0.], [1., 0., 2.], [0., 0., 2.]],
        Some(0),
        SurfaceFlags::default(),
    );
    let closed = DMat4::from_translation(glam::DVec3::new(2.0, 0.0, 0.0));
    let open = closed * DMat4::from_rotation_z(90f64.to_radians());
    let record = AnimationRecord {
        dataref: Some("sim/door".into()),
        values: vec!["0".into(), "1".into()],
        matrices: vec![closed.to_cols_array(), open.to_cols_array()],
        loop_value: None,
        hide_show: vec![],
    };
    let mut instance = Instance::new(0, closed);
    instance.name = "door".into();
    record.write(&mut instance.attributes);

    Scene {
        materials: vec![Material::textured("wood", texture)],
        definitions: vec![Definition {
            name: "door".into(),
            entities: vec![Entity::Face(panel)],
        }],
        entities: vec![Entity::Instance(instance)],
    }
}

/// Every face in `entities`, with the flags stored on it
pub fn faces(entities: &[Entity]) -> Vec<(&Face, SurfaceFlags)> {
    entities
        .iter()
        .filter_map(|e| match e {
            Entity::Face(face) => Some((face, SurfaceFlags::read(&face.attributes))),
            _ => None,
        })
        .collect()
}
