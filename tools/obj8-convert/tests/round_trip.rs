//! Round trips through the library: scene -> OBJ8 -> scene

mod common;

use obj8_convert::{export_file, import_file, ExportConfig, ImportConfig};
use obj8_shared::math::{mat4, max_abs_diff};
use obj8_shared::{AnimationRecord, Entity, Scene};
use tempfile::tempdir;

/// Export then import a scene through files in `dir`
fn round_trip(scene: &Scene, dir: &std::path::Path) -> Scene {
    let path = dir.join("object.obj");
    export_file(scene, dir, &path, &ExportConfig::default()).expect("Failed to export");
    let mut imported = Scene::default();
    import_file(&path, &mut imported, &ImportConfig::default()).expect("Failed to import");
    imported
}

/// A textured cube keeps its triangles, corners, texture and surface flags
#[test]
fn test_textured_cube_round_trip() {
    let dir = tempdir().expect("Failed to create temp dir");
    common::write_texture(&dir.path().join("wood.png"));
    let cube = common::textured_cube("wood.png");

    let imported = round_trip(&cube, dir.path());
    assert_eq!(imported.triangle_count(), cube.triangle_count());

    let wood = imported
        .material_named("wood")
        .expect("Texture material should be imported");
    assert_eq!(
        imported.materials[wood].texture.as_deref(),
        Some(dir.path().join("wood.png").as_path())
    );

    let faces = common::faces(&imported.entities);
    // One face per side: the two triangles of each quad merge
    assert_eq!(faces.len(), 6);
    for (face, _) in &faces {
        assert_eq!(face.material, Some(wood));
        for p in &face.mesh.points {
            assert!(p.iter().all(|c| *c == 0.0 || *c == 1.0), "{:?}", p);
        }
    }

    let top = faces
        .iter()
        .find(|(face, _)| face.mesh.points.iter().all(|p| p[2] == 1.0))
        .expect("Top face should be imported");
    assert!(top.1.hard);
    assert!(!top.1.poly);

    let bottom = faces
        .iter()
        .find(|(face, _)| face.mesh.points.iter().all(|p| p[2] == 0.0))
        .expect("Bottom face should be imported");
    assert!(bottom.1.poly);
    assert!(!bottom.1.hard);

    let plain = faces.iter().filter(|(_, flags)| !flags.hard && !flags.poly);
    assert_eq!(plain.count(), 4);
}

/// Exporting an imported file again produces the same text
#[test]
fn test_second_export_is_stable() {
    let dir = tempdir().expect("Failed to create temp dir");
    common::write_texture(&dir.path().join("wood.png"));
    let cube = common::textured_cube("wood.png");

    let first = obj8_convert::export_scene(&cube, dir.path(), &ExportConfig::default())
        .expect("Failed to export");
    let imported = round_trip(&cube, dir.path());
    let second = obj8_convert::export_scene(&imported, dir.path(), &ExportConfig::default())
        .expect("Failed to export imported scene");

    assert_eq!(first.report.vertices, second.report.vertices);
    assert_eq!(first.report.indices, second.report.indices);
}

/// An animated component comes back with its dataref, keys and matrices
#[test]
fn test_animated_door_round_trip() {
    let dir = tempdir().expect("Failed to create temp dir");
    common::write_texture(&dir.path().join("wood.png"));
    let door = common::animated_door("wood.png");
    let original = match &door.entities[0] {
        Entity::Instance(instance) => {
            AnimationRecord::read(&instance.attributes).expect("Missing animation")
        }
        _ => unreachable!(),
    };

    let exported = obj8_convert::export_scene(&door, dir.path(), &ExportConfig::default())
        .expect("Failed to export");
    assert_eq!(exported.report.animations, 1);
    assert!(exported.text.contains("ANIM_begin"));
    assert!(exported.text.contains("sim/door"));

    let imported = round_trip(&door, dir.path());
    assert_eq!(imported.entities.len(), 1);
    let Entity::Instance(instance) = &imported.entities[0] else {
        panic!("Expected an animated instance");
    };
    let record = AnimationRecord::read(&instance.attributes).expect("Missing animation");
    assert_eq!(record.dataref.as_deref(), Some("sim/door"));
    assert_eq!(record.values, vec!["0", "1"]);
    for (got, want) in record.matrices.iter().zip(&original.matrices) {
        assert!(max_abs_diff(&mat4(got), &mat4(want)) < 1e-3);
    }
    assert!(max_abs_diff(&instance.matrix(), &mat4(&original.matrices[0])) < 1e-3);

    // Geometry stays in the component's own frame
    let definition = imported
        .definition(instance.definition)
        .expect("Missing definition");
    let faces = common::faces(&definition.entities);
    assert_eq!(faces.len(), 1);
    let mut points = faces[0].0.mesh.points.clone();
    points.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    assert_eq!(
        points,
        vec![[0., 0., 0.], [0., 0., 2.], [1., 0., 0.], [1., 0., 2.]]
    );
}
