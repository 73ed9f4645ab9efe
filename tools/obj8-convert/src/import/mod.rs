//! OBJ8 -> scene
//!
//! [`parser`] reads the command stream, [`mesh`] turns triangle batches into
//! merged faces and [`builder`] stages the new materials, definitions and
//! entities. The target scene is only modified once the whole file has been
//! read without error.

pub mod builder;
pub mod mesh;
pub mod parser;

use obj8_shared::Scene;
use std::path::Path;

pub use self::parser::ImportReport;
use self::parser::Parser;
use crate::config::ImportConfig;
use crate::error::ImportError;

/// Import OBJ8 text into `scene`. Textures are looked up relative to `dir`.
pub fn import_str(
    text: &str,
    dir: &Path,
    scene: &mut Scene,
    config: &ImportConfig,
) -> Result<ImportReport, ImportError> {
    let (edit, report) = Parser::new(scene, dir, config).parse(text)?;
    edit.commit(scene)?;
    Ok(report)
}

/// Import an OBJ8 file into `scene`
pub fn import_file(
    path: &Path,
    scene: &mut Scene,
    config: &ImportConfig,
) -> Result<ImportReport, ImportError> {
    let bytes = std::fs::read(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let report = import_str(&text, dir, scene, config)?;
    tracing::info!(
        "Imported {} triangles and {} animated components from {}",
        report.triangles,
        report.components,
        path.display()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;
    use obj8_shared::{Entity, Material};

    #[test]
    fn test_failed_import_leaves_scene_untouched() {
        let mut scene = Scene {
            materials: vec![Material::textured("old", "old.png")],
            ..Default::default()
        };
        let before = scene.clone();
        let text = "I\n800\nOBJ\nANIM_begin\nVT 0 0 0 0 1 0 0 0\nIDX 0\nTRIS 0 3\n";
        let result = import_str(text, Path::new("."), &mut scene, &ImportConfig::default());
        assert!(matches!(
            result,
            Err(ImportError::Format(FormatError::IndexOutOfRange { .. }))
        ));
        assert_eq!(scene, before);
    }

    #[test]
    fn test_import_file_with_texture() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        image::RgbImage::new(64, 64)
            .save(dir.path().join("wood.png"))
            .expect("Failed to save texture");
        // Referenced as .dds, found as .png
        let obj = "A\n800\nOBJ\n\nTEXTURE wood.dds\nPOINT_COUNTS 3 0 0 3\n\
                   VT 0 0 0 0 1 0 0 0\nVT 1 0 0 0 1 0 1 0\nVT 0 0 -1 0 1 0 0 1\n\
                   IDX 0\nIDX 1\nIDX 2\nTRIS 0 3\n";
        let path = dir.path().join("plank.obj");
        std::fs::write(&path, obj).expect("Failed to write object");

        let mut scene = Scene::default();
        let report =
            import_file(&path, &mut scene, &ImportConfig::default()).expect("Failed to import");
        assert_eq!(report.triangles, 1);
        assert!(report.warnings.is_empty());
        // Texture first, then the back-face material
        assert_eq!(scene.materials.len(), 2);
        assert_eq!(scene.materials[0].name, "wood");
        assert_eq!(scene.materials[1].name, builder::REVERSE_MATERIAL);
        let Entity::Face(face) = &scene.entities[0] else {
            panic!("Expected a face");
        };
        assert_eq!(face.material, Some(0));
        assert_eq!(face.back_material, Some(1));
    }

    #[test]
    fn test_dds_only_texture_is_rejected() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("wood.dds"), b"DDS ").expect("Failed to write dds");
        let path = dir.path().join("plank.obj");
        std::fs::write(&path, "I\n800\nOBJ\nTEXTURE wood.dds\n").expect("Failed to write object");

        let mut scene = Scene::default();
        let result = import_file(&path, &mut scene, &ImportConfig::default());
        assert!(matches!(result, Err(ImportError::Dds { .. })));
        assert!(scene.materials.is_empty());
    }
}
