//! Scene -> OBJ8
//!
//! 1. [`accumulate`] walks the scene into vertices, triangle runs, lights and
//!    animation nodes
//! 2. [`primitive`] sorts the primitives by render state and flattens the
//!    index runs
//! 3. [`writer`] renders the file
//!
//! The file is rendered in memory and written in one go, so a failed export
//! never leaves a partial file behind.

pub mod accumulate;
pub mod primitive;
pub mod writer;

use obj8_common::formats::LIT_SUFFIX;
use obj8_shared::Scene;
use std::io::Write;
use std::path::{Path, PathBuf};

use self::accumulate::{Accumulator, WalkStats};
use self::primitive::{linearize, sort_primitives, Primitive};
use self::writer::{write_obj8, TextureLines, WriteInput};
use crate::config::ExportConfig;
use crate::error::ExportError;

/// Outcome of an export, for the caller to show the user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportReport {
    /// Triangles drawn, counting each reuse of a shared run
    pub triangles: usize,
    pub vertices: usize,
    pub indices: usize,
    pub animations: usize,
    /// Texture named in the file, as referenced by the scene
    pub texture: Option<PathBuf>,
    pub warnings: Vec<String>,
}

/// A rendered file
#[derive(Debug, Clone)]
pub struct Export {
    pub text: String,
    pub report: ExportReport,
}

/// Render a scene to OBJ8 text.
///
/// Relative texture paths are resolved against `scene_dir` when looking for
/// a lit companion texture and checking dimensions.
pub fn export_scene(
    scene: &Scene,
    scene_dir: &Path,
    config: &ExportConfig,
) -> Result<Export, ExportError> {
    let mut walked = Accumulator::new(scene, config).run()?;
    if walked.prims.is_empty() {
        return Err(ExportError::Empty);
    }

    sort_primitives(&mut walked.prims, &walked.arena);
    let index = linearize(&walked.prims, &walked.runs);

    let texture = walked.stats.main_texture().cloned();
    let textures = texture_lines(texture.as_deref(), scene_dir);
    let mut warnings = walk_warnings(&walked.stats, texture.as_deref());
    if let Some(texture) = &texture {
        warnings.extend(check_texture(&resolve(texture, scene_dir)));
    }

    let mut out = Vec::new();
    render(
        &mut out,
        &WriteInput {
            vertices: walked.vertices.vertices(),
            prims: &walked.prims,
            runs: &walked.runs,
            index: &index,
            arena: &walked.arena,
            textures: &textures,
        },
    )?;
    let text = String::from_utf8_lossy(&out).into_owned();

    let triangles = walked
        .prims
        .iter()
        .map(|prim| match prim {
            Primitive::Tris { run, .. } => walked.runs.get(*run).len() / 3,
            Primitive::Light { .. } => 0,
        })
        .sum();

    let report = ExportReport {
        triangles,
        vertices: walked.vertices.len(),
        indices: index.indices.len(),
        animations: walked.arena.len(),
        texture,
        warnings,
    };

    tracing::info!(
        "Exported {} triangles, {} vertices, {} indices, {} animations",
        report.triangles,
        report.vertices,
        report.indices,
        report.animations
    );

    Ok(Export { text, report })
}

/// Export a scene file to an OBJ8 file
pub fn export_file(
    scene: &Scene,
    scene_dir: &Path,
    output: &Path,
    config: &ExportConfig,
) -> Result<ExportReport, ExportError> {
    let export = export_scene(scene, scene_dir, config)?;
    std::fs::write(output, &export.text).map_err(|source| ExportError::Io {
        path: output.to_path_buf(),
        source,
    })?;
    tracing::info!("Wrote {}", output.display());
    Ok(export.report)
}

fn render<W: Write>(w: &mut W, input: &WriteInput) -> Result<(), ExportError> {
    write_obj8(w, input).map_err(ExportError::Render)
}

fn resolve(texture: &Path, scene_dir: &Path) -> PathBuf {
    if texture.is_absolute() {
        texture.to_path_buf()
    } else {
        scene_dir.join(texture)
    }
}

fn texture_lines(texture: Option<&Path>, scene_dir: &Path) -> TextureLines {
    let Some(texture) = texture else {
        return TextureLines::default();
    };
    let name = |p: &Path| {
        p.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    let resolved = resolve(texture, scene_dir);
    let lit = resolved.file_stem().map(|stem| {
        let mut lit_name = stem.to_os_string();
        lit_name.push(LIT_SUFFIX);
        if let Some(ext) = resolved.extension() {
            lit_name.push(".");
            lit_name.push(ext);
        }
        resolved.with_file_name(lit_name)
    });

    TextureLines {
        texture: Some(name(texture)),
        lit: lit.filter(|p| p.is_file()).map(|p| name(&p)),
    }
}

fn walk_warnings(stats: &WalkStats, texture: Option<&Path>) -> Vec<String> {
    let mut warnings = Vec::new();
    if stats.untextured > 0 {
        if stats.untextured == stats.faces {
            warnings.push("All faces are untextured".to_string());
        } else {
            warnings.push(format!("{} faces are untextured", stats.untextured));
        }
    }
    if stats.texture_uses.len() > 1 {
        if let Some(texture) = texture {
            warnings.push(format!(
                "You used multiple texture files. Using file {}",
                texture.display()
            ));
        }
    }
    if stats.bad_triangles > 0 {
        warnings.push(format!(
            "Skipped {} triangles with out of range indices",
            stats.bad_triangles
        ));
    }
    warnings
}

fn check_texture(path: &Path) -> Option<String> {
    match image::image_dimensions(path) {
        Ok((width, height)) if !width.is_power_of_two() || !height.is_power_of_two() => {
            Some(format!(
                "Texture file {} width & height must be powers of two",
                path.display()
            ))
        }
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Can't inspect texture {}: {}", path.display(), e);
            Some(format!("Can't read texture file {}", path.display()))
        }
    }
}
