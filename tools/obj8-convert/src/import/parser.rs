//! OBJ8 text -> staged scene edits
//!
//! A line-oriented state machine. Render state (texture, cull, surface
//! flags) and a stack of open animation blocks are tracked while reading;
//! triangles are buffered and turned into faces whenever a non-geometry
//! command arrives.

use glam::{DVec2, DVec3};
use obj8_common::formats::{ALPHA_OFF, ALPHA_ON, HEADER_ORIGINS, HEADER_VERSION_V6};
use obj8_common::{light_kind, LightKind, LightMarker, HEADER_OBJ, HEADER_VERSION};
use obj8_shared::math::from_file;
use obj8_shared::{
    AnimationRecord, Definition, Entity, HideShow, HideShowMode, Instance, MaterialId,
    SurfaceFlags, Text,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::builder::SceneEdit;
use super::mesh::{build_faces, SourceTriangle};
use crate::anim::KeyframeMaps;
use crate::config::ImportConfig;
use crate::error::{FormatError, ImportError};

/// Outcome of an import, for the caller to show the user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub triangles: usize,
    pub components: usize,
    /// Sorted, each message once
    pub warnings: Vec<String>,
}

/// Commands accepted without effect
const IGNORED: &[&str] = &[
    "TEXTURE_LIT",
    "TEXTURE_NORMAL",
    "TEXTURE_NORMAL_LIT",
    "TEXTURE_DRAPED",
    "ATTR_no_blend",
    "ATTR_shade_flat",
    "ATTR_shade_smooth",
    "ATTR_light_level_reset",
    "ATTR_layer_group",
    "POINT_COUNTS",
];

/// Strip a trailing `//` or `#` comment
fn strip_comment(line: &str) -> &str {
    let end = [line.find("//"), line.find('#')]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());
    line[..end].trim()
}

/// Check the three header lines
pub fn check_header<'t>(lines: &mut impl Iterator<Item = &'t str>) -> Result<(), FormatError> {
    let mut next = || lines.next().map(strip_comment).unwrap_or("");

    if !HEADER_ORIGINS.contains(&next()) {
        return Err(FormatError::NotValid);
    }
    let version = next();
    if version.split_whitespace().next() == Some(HEADER_VERSION_V6) {
        return Err(FormatError::UnsupportedVersion(6));
    }
    if version != HEADER_VERSION {
        return match version.parse::<u32>() {
            Ok(v) => Err(FormatError::UnsupportedVersion(v / 100)),
            Err(_) => Err(FormatError::NotValid),
        };
    }
    if next() != HEADER_OBJ {
        return Err(FormatError::NotValid);
    }
    Ok(())
}

#[derive(Clone, Copy, Debug)]
struct RenderState {
    cull: bool,
    hard: bool,
    deck: bool,
    poly: bool,
    alpha: bool,
    shiny: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            cull: true,
            hard: false,
            deck: false,
            poly: false,
            alpha: false,
            shiny: false,
        }
    }
}

impl RenderState {
    fn flags(&self) -> SurfaceFlags {
        SurfaceFlags {
            hard: self.hard,
            deck: self.deck,
            poly: self.poly,
            alpha: self.alpha,
            shiny: self.shiny,
        }
    }
}

/// One open `ANIM_begin` block
#[derive(Debug)]
struct AnimBlock {
    name: String,
    entities: Vec<Entity>,
    /// Applied to child geometry to compensate for pivot shifts
    offset: DVec3,
    maps: KeyframeMaps,
    dataref: Option<String>,
    loop_value: Option<String>,
    hide_show: Vec<HideShow>,
    /// Chain entry opened by `ANIM_rotate_begin`
    rotation: Option<usize>,
}

enum Flow {
    Continue,
    Stop,
}

pub struct Parser<'a> {
    config: &'a ImportConfig,
    dir: PathBuf,
    edit: SceneEdit,
    line: usize,
    material: Option<MaterialId>,
    state: RenderState,
    vertices: Vec<(DVec3, DVec3, DVec2)>,
    indices: Vec<usize>,
    batch: Vec<SourceTriangle>,
    blocks: Vec<AnimBlock>,
    triangles: usize,
    components: usize,
    warnings: BTreeSet<String>,
}

impl<'a> Parser<'a> {
    /// `scene` is only read, to number new materials and definitions after
    /// the existing ones. `dir` is where textures are looked up.
    pub fn new(scene: &obj8_shared::Scene, dir: &Path, config: &'a ImportConfig) -> Self {
        Self {
            config,
            dir: dir.to_path_buf(),
            edit: SceneEdit::new(scene),
            line: 0,
            material: None,
            state: RenderState::default(),
            vertices: Vec::new(),
            indices: Vec::new(),
            batch: Vec::new(),
            blocks: Vec::new(),
            triangles: 0,
            components: 0,
            warnings: BTreeSet::new(),
        }
    }

    /// Parse a whole file
    pub fn parse(mut self, text: &str) -> Result<(SceneEdit, ImportReport), ImportError> {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let mut lines = text.lines();
        check_header(&mut lines)?;
        self.line = 3;

        let mut stopped = false;
        for raw in lines {
            self.line += 1;
            if let Flow::Stop = self.parse_line(raw)? {
                stopped = true;
                break;
            }
        }
        self.flush();

        if stopped {
            while let Some(block) = self.blocks.pop() {
                self.finish_block(block);
            }
        } else if !self.blocks.is_empty() {
            return Err(FormatError::UnbalancedAnimation { line: self.line }.into());
        }

        for warning in &self.warnings {
            tracing::warn!("{}", warning);
        }
        let report = ImportReport {
            triangles: self.triangles,
            components: self.components,
            warnings: self.warnings.into_iter().collect(),
        };
        Ok((self.edit, report))
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.insert(message.into());
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn malformed(&self, cmd: &str, token: &str) -> FormatError {
        FormatError::Malformed {
            line: self.line,
            command: cmd.to_string(),
            token: token.to_string(),
        }
    }

    fn token<'t>(&self, cmd: &str, args: &[&'t str], i: usize) -> Result<&'t str, FormatError> {
        args.get(i).copied().ok_or_else(|| self.malformed(cmd, ""))
    }

    fn float(&self, cmd: &str, args: &[&str], i: usize) -> Result<f64, FormatError> {
        let token = self.token(cmd, args, i)?;
        token.parse().map_err(|_| self.malformed(cmd, token))
    }

    fn int(&self, cmd: &str, args: &[&str], i: usize) -> Result<usize, FormatError> {
        let token = self.token(cmd, args, i)?;
        token.parse().map_err(|_| self.malformed(cmd, token))
    }

    fn vec3(&self, cmd: &str, args: &[&str], i: usize) -> Result<DVec3, FormatError> {
        Ok(DVec3::new(
            self.float(cmd, args, i)?,
            self.float(cmd, args, i + 1)?,
            self.float(cmd, args, i + 2)?,
        ))
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Offset applied to geometry in the current block
    fn offset(&self) -> DVec3 {
        self.blocks.last().map_or(DVec3::ZERO, |b| b.offset)
    }

    fn block(&mut self) -> Result<&mut AnimBlock, FormatError> {
        let line = self.line;
        self.blocks
            .last_mut()
            .ok_or(FormatError::UnbalancedAnimation { line })
    }

    fn container(&mut self) -> &mut Vec<Entity> {
        match self.blocks.last_mut() {
            Some(block) => &mut block.entities,
            None => &mut self.edit.entities,
        }
    }

    /// Turn buffered triangles into faces in the current container
    fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.batch);
        let reverse = if batch.iter().any(|t| t.material.is_some() && t.cull) {
            self.edit.reverse_material()
        } else {
            0
        };
        let built = build_faces(&batch, reverse, self.config);
        tracing::debug!(
            "Built {} faces from {} triangles",
            built.faces.len(),
            batch.len()
        );
        self.triangles += built.triangles;
        for warning in &built.warnings {
            self.warn(*warning);
        }
        let container = self.container();
        container.extend(built.faces.into_iter().map(Entity::Face));
        container.extend(built.edges.into_iter().map(Entity::Edge));
    }

    fn finish_block(&mut self, block: AnimBlock) {
        let frames = block.maps.reconstruct();
        let transform = frames
            .first()
            .map_or_else(|| block.maps.matrix_at(0.0), |f| f.matrix);
        let record = AnimationRecord {
            dataref: block.dataref,
            values: frames.iter().map(|f| format!("{}", f.value)).collect(),
            matrices: frames.iter().map(|f| f.matrix.to_cols_array()).collect(),
            loop_value: block.loop_value,
            hide_show: block.hide_show,
        };
        tracing::debug!("{}: {} keyframes", block.name, frames.len());

        let definition = self.edit.add_definition(Definition {
            name: block.name,
            entities: block.entities,
        });
        let mut instance = Instance::new(definition, transform);
        record.write(&mut instance.attributes);
        self.components += 1;
        self.container().push(Entity::Instance(instance));
    }

    // ========================================================================
    // Commands
    // ========================================================================

    fn parse_line(&mut self, raw: &str) -> Result<Flow, ImportError> {
        // Alpha markers look like comments to everything else
        let trimmed = raw.trim();
        if trimmed.starts_with(ALPHA_OFF) {
            self.flush();
            self.state.alpha = false;
            return Ok(Flow::Continue);
        }
        if trimmed.starts_with(ALPHA_ON) {
            self.flush();
            self.state.alpha = true;
            return Ok(Flow::Continue);
        }

        let line = strip_comment(raw);
        let mut tokens = line.split_whitespace();
        let Some(cmd) = tokens.next() else {
            return Ok(Flow::Continue);
        };
        let args: Vec<&str> = tokens.collect();

        if cmd != "TRIS" {
            self.flush();
        }

        match cmd {
            "TEXTURE" => {
                let name = line.strip_prefix("TEXTURE").unwrap_or_default().trim();
                self.material = if name.is_empty() {
                    None
                } else {
                    Some(self.load_texture(name)?)
                };
            }
            "VT" => {
                let position = from_file(self.vec3(cmd, &args, 0)?);
                let normal = from_file(self.vec3(cmd, &args, 3)?);
                let uv = DVec2::new(self.float(cmd, &args, 6)?, self.float(cmd, &args, 7)?);
                self.vertices.push((position, normal, uv));
            }
            "IDX" => {
                let i = self.int(cmd, &args, 0)?;
                self.indices.push(i);
            }
            "IDX10" => {
                for i in 0..args.len() {
                    let index = self.int(cmd, &args, i)?;
                    self.indices.push(index);
                }
            }
            "TRIS" => self.tris(cmd, &args)?,

            "ATTR_LOD" => {
                if self.float(cmd, &args, 0)? > 0.0 {
                    self.warn("Ignoring lower level(s) of detail");
                    return Ok(Flow::Stop);
                }
            }
            "ATTR_reset" => self.state = RenderState::default(),
            "ATTR_cull" => self.state.cull = true,
            "ATTR_nocull" | "ATTR_no_cull" => self.state.cull = false,
            "ATTR_hard" => {
                self.state.hard = true;
                self.state.deck = false;
            }
            "ATTR_hard_deck" => {
                self.state.hard = false;
                self.state.deck = true;
            }
            "ATTR_no_hard" => {
                self.state.hard = false;
                self.state.deck = false;
            }
            "ATTR_poly_os" => self.state.poly = self.float(cmd, &args, 0)? > 0.0,
            "ATTR_draped" => self.state.poly = true,
            "ATTR_no_draped" => self.state.poly = false,
            "ATTR_shiny_rat" => self.state.shiny = self.float(cmd, &args, 0)? > 0.0,

            "ANIM_begin" => {
                let offset = self.offset();
                let name = self.edit.next_component_name();
                self.blocks.push(AnimBlock {
                    name,
                    entities: Vec::new(),
                    offset,
                    maps: KeyframeMaps::new(),
                    dataref: None,
                    loop_value: None,
                    hide_show: Vec::new(),
                    rotation: None,
                });
            }
            "ANIM_end" => {
                let line = self.line;
                let block = self
                    .blocks
                    .pop()
                    .ok_or(FormatError::UnbalancedAnimation { line })?;
                self.finish_block(block);
            }
            "ANIM_trans" => self.anim_trans(cmd, &args)?,
            "ANIM_trans_begin" => {
                let dataref = self.token(cmd, &args, 0)?;
                self.block()?.dataref = Some(dataref.to_string());
            }
            "ANIM_trans_key" => {
                let value = self.float(cmd, &args, 0)?;
                let t = from_file(self.vec3(cmd, &args, 1)?);
                let block = self.block()?;
                block.maps.add_translation(value, t + block.offset);
            }
            "ANIM_trans_end" => self.block()?.offset = DVec3::ZERO,
            "ANIM_rotate" => self.anim_rotate(cmd, &args)?,
            "ANIM_rotate_begin" => {
                let axis = from_file(self.vec3(cmd, &args, 0)?);
                let dataref = self.token(cmd, &args, 3)?;
                let block = self.block()?;
                block.dataref = Some(dataref.to_string());
                block.rotation = Some(block.maps.begin_rotation(axis));
            }
            "ANIM_rotate_key" => {
                let value = self.float(cmd, &args, 0)?;
                let angle = self.float(cmd, &args, 1)?;
                let malformed = self.malformed(cmd, "");
                let block = self.block()?;
                let rotation = block.rotation.ok_or(malformed)?;
                block.maps.add_rotation(rotation, value, angle);
            }
            "ANIM_rotate_end" => self.block()?.rotation = None,
            "ANIM_keyframe_loop" => {
                let value = self.float(cmd, &args, 0)?;
                self.block()?.loop_value = Some(format!("{}", value));
            }
            "ANIM_hide" | "ANIM_show" => {
                let mode = if cmd == "ANIM_hide" {
                    HideShowMode::Hide
                } else {
                    HideShowMode::Show
                };
                let from = self.float(cmd, &args, 0)?;
                let to = self.float(cmd, &args, 1)?;
                let dataref = self.token(cmd, &args, 2)?;
                self.block()?.hide_show.push(HideShow {
                    mode,
                    dataref: dataref.to_string(),
                    from: format!("{}", from),
                    to: format!("{}", to),
                });
            }

            "VLINE" | "LINES" => self.warn("Ignoring old-style lines"),
            "VLIGHT" | "LIGHTS" => self.warn("Ignoring old-style lights"),
            _ if IGNORED.contains(&cmd) => {}
            _ => match light_kind(cmd) {
                Some(kind) => self.light(cmd, kind, &args)?,
                None => self.warn(format!("Ignoring command {}", cmd)),
            },
        }
        Ok(Flow::Continue)
    }

    fn load_texture(&mut self, name: &str) -> Result<MaterialId, ImportError> {
        let name = name.replace([':', '\\'], "/");
        let ext = Path::new(&name)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let stem = &name[..name.len() - ext.len()];
        let material_name = stem.rsplit('/').next().unwrap_or(stem);

        let shared_dir = custom_textures_dir(&self.dir);
        for candidate_ext in [ext.as_str(), ".png"] {
            let file = format!("{}{}", stem, candidate_ext);
            let candidates = std::iter::once(self.dir.join(&file))
                .chain(shared_dir.as_ref().map(|d| d.join(&file)));
            for path in candidates {
                if image::image_dimensions(&path).is_ok() {
                    tracing::debug!("Texture {}", path.display());
                    return Ok(self.edit.texture_material(material_name, &path));
                }
            }
        }

        let path = self.dir.join(format!("{}{}", stem, ext));
        if path.is_file() && ext.eq_ignore_ascii_case(".dds") {
            Err(ImportError::Dds { path })
        } else {
            Err(ImportError::Resource { path })
        }
    }

    fn tris(&mut self, cmd: &str, args: &[&str]) -> Result<(), FormatError> {
        let start = self.int(cmd, args, 0)?;
        let count = self.int(cmd, args, 1)?;
        let end = match start.checked_add(count) {
            Some(end) if end <= self.indices.len() => end,
            _ => {
                return Err(FormatError::IndexOutOfRange {
                    line: self.line,
                    index: start.saturating_add(count).saturating_sub(1),
                    count: self.indices.len(),
                });
            }
        };

        let offset = self.offset();
        let flags = self.state.flags();
        let mut i = start;
        while i + 2 < end {
            let corners = [self.indices[i + 2], self.indices[i + 1], self.indices[i]];
            let mut points = [DVec3::ZERO; 3];
            let mut normals = [DVec3::ZERO; 3];
            let mut uvs = [DVec2::ZERO; 3];
            for (c, &index) in corners.iter().enumerate() {
                let &(p, n, uv) =
                    self.vertices
                        .get(index)
                        .ok_or(FormatError::IndexOutOfRange {
                            line: self.line,
                            index,
                            count: self.vertices.len(),
                        })?;
                points[c] = p + offset;
                normals[c] = n;
                uvs[c] = uv;
            }
            self.batch.push(SourceTriangle {
                points,
                normals,
                uvs,
                material: self.material,
                cull: self.state.cull,
                flags,
            });
            i += 3;
        }
        Ok(())
    }

    fn anim_trans(&mut self, cmd: &str, args: &[&str]) -> Result<(), FormatError> {
        let t0 = self.vec3(cmd, args, 0)?;
        let t1 = self.vec3(cmd, args, 3)?;
        if t0 == t1 {
            // Static shift of the pivot
            let t = from_file(t0);
            let block = self.block()?;
            if !block.maps.has_paths() && block.maps.origin == DVec3::ZERO {
                block.maps.origin = t + block.offset;
                block.offset = DVec3::ZERO;
            } else {
                block.offset += t;
            }
            return Ok(());
        }

        let v0 = self.float(cmd, args, 6)?;
        let v1 = self.float(cmd, args, 7)?;
        let dataref = self.token(cmd, args, 8)?;
        let block = self.block()?;
        block.dataref = Some(dataref.to_string());
        block.maps.add_translation(v0, from_file(t0) + block.offset);
        block.maps.add_translation(v1, from_file(t1) + block.offset);
        block.offset = DVec3::ZERO;
        Ok(())
    }

    fn anim_rotate(&mut self, cmd: &str, args: &[&str]) -> Result<(), FormatError> {
        let axis = from_file(self.vec3(cmd, args, 0)?);
        let a0 = self.float(cmd, args, 3)?;
        let a1 = self.float(cmd, args, 4)?;
        let v0 = self.float(cmd, args, 5)?;
        let v1 = self.float(cmd, args, 6)?;
        if a0 == a1 || v0 == v1 {
            self.block()?.maps.add_static_rotation(axis, a0);
            return Ok(());
        }
        let dataref = self.token(cmd, args, 7)?;
        let block = self.block()?;
        block.dataref = Some(dataref.to_string());
        let rotation = block.maps.begin_rotation(axis);
        block.maps.add_rotation(rotation, v0, a0);
        block.maps.add_rotation(rotation, v1, a1);
        Ok(())
    }

    fn light(&mut self, cmd: &str, kind: LightKind, args: &[&str]) -> Result<(), FormatError> {
        let (name, first) = match kind {
            LightKind::Named => (Some(self.token(cmd, args, 0)?.to_string()), 1),
            LightKind::Custom => (None, 0),
        };
        let position = from_file(self.vec3(cmd, args, first)?) + self.offset();
        let marker = LightMarker {
            light_type: cmd.to_string(),
            kind,
            name,
            args: args[first + 3..].iter().map(|s| s.to_string()).collect(),
        };
        self.container().push(Entity::Text(Text {
            text: marker.to_text(),
            position: Some(position.to_array()),
            hidden: false,
        }));
        Ok(())
    }
}

/// `.../custom object textures` next to a `custom objects` folder above `dir`
fn custom_textures_dir(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .filter(|a| {
            a.file_name()
                .is_some_and(|n| n.to_string_lossy().eq_ignore_ascii_case("custom objects"))
        })
        .last()
        .and_then(Path::parent)
        .map(|root| root.join("custom object textures"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use obj8_shared::Scene;

    fn parse(text: &str) -> Result<(SceneEdit, ImportReport), ImportError> {
        let config = ImportConfig::default();
        Parser::new(&Scene::default(), Path::new("."), &config).parse(text)
    }

    fn committed(text: &str) -> (Scene, ImportReport) {
        let (edit, report) = parse(text).expect("Failed to parse");
        let mut scene = Scene::default();
        edit.commit(&mut scene).expect("Failed to commit");
        (scene, report)
    }

    fn header_error(text: &str) -> FormatError {
        match parse(text) {
            Err(ImportError::Format(e)) => e,
            other => panic!("Expected format error, got {:?}", other.map(|(_, r)| r)),
        }
    }

    const QUAD: &str = "\
VT 0 0 0  0 1 0  0 0
VT 1 0 0  0 1 0  0 0
VT 1 0 -1  0 1 0  0 0
VT 0 0 -1  0 1 0  0 0
IDX10 0 1 2 0 2 3 0 0 0 0
";

    #[test]
    fn test_header_rejection() {
        assert_eq!(header_error("X\n800\nOBJ\n"), FormatError::NotValid);
        assert_eq!(header_error("I\n2\nOBJ\n"), FormatError::UnsupportedVersion(6));
        assert_eq!(header_error("I\n700\nOBJ\n"), FormatError::UnsupportedVersion(7));
        assert_eq!(header_error("I\nabc\nOBJ\n"), FormatError::NotValid);
        assert_eq!(header_error("I\n800\nOBX\n"), FormatError::NotValid);
        assert_eq!(header_error(""), FormatError::NotValid);
    }

    #[test]
    fn test_old_mac_line_endings_and_comments() {
        let text = "A\r800 // version\rOBJ\r\rTEXTURE\r# comment\rPOINT_COUNTS 0 0 0 0\r";
        let (_, report) = parse(text).expect("Failed to parse");
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_flat_quad() {
        let text = format!("I\n800\nOBJ\n\nTEXTURE\n{}TRIS 0 6\n", QUAD);
        let (scene, report) = committed(&text);
        assert_eq!(report.triangles, 2);
        // Coplanar and untextured: one face
        let faces: Vec<_> = scene
            .entities
            .iter()
            .filter_map(|e| match e {
                Entity::Face(f) => Some(f),
                _ => None,
            })
            .collect();
        assert_eq!(faces.len(), 1);
        // File -z is host +y
        assert!(faces[0].mesh.points.contains(&[1.0, 1.0, 0.0]));
        assert!(scene.materials.is_empty());
    }

    #[test]
    fn test_render_state_is_applied() {
        let text = format!(
            "I\n800\nOBJ\n{}ATTR_hard\nATTR_poly_os 2\n####_alpha\nATTR_shiny_rat 1\nTRIS 0 3\n\
             ATTR_reset\nTRIS 3 3\n",
            QUAD
        );
        let (scene, _) = committed(&text);
        let flags: Vec<SurfaceFlags> = scene
            .entities
            .iter()
            .filter_map(|e| match e {
                Entity::Face(f) => Some(SurfaceFlags::read(&f.attributes)),
                _ => None,
            })
            .collect();
        assert_eq!(
            flags,
            vec![
                SurfaceFlags {
                    hard: true,
                    deck: false,
                    poly: true,
                    alpha: true,
                    shiny: true,
                },
                SurfaceFlags::default(),
            ]
        );
    }

    #[test]
    fn test_index_out_of_range() {
        let text = format!("I\n800\nOBJ\n{}TRIS 6 6\n", QUAD);
        assert!(matches!(
            header_error(&text),
            FormatError::IndexOutOfRange { line: 9, .. }
        ));
        let text = "I\n800\nOBJ\nVT 0 0 0 0 1 0 0 0\nIDX10 0 1 2 0 0 0 0 0 0 0\nTRIS 0 3\n";
        assert!(matches!(
            header_error(text),
            FormatError::IndexOutOfRange { index: 2, count: 1, .. }
        ));
    }

    #[test]
    fn test_huge_tris_range_is_rejected() {
        let text = "I\n800\nOBJ\nVT 0 0 0 0 1 0 0 0\nIDX 0\nTRIS 18446744073709551615 2\n";
        assert!(matches!(
            header_error(text),
            FormatError::IndexOutOfRange { line: 6, count: 1, .. }
        ));
    }

    #[test]
    fn test_malformed_number() {
        let err = header_error("I\n800\nOBJ\nVT 0 0 zero 0 1 0 0 0\n");
        assert_eq!(
            err,
            FormatError::Malformed {
                line: 4,
                command: "VT".into(),
                token: "zero".into(),
            }
        );
    }

    #[test]
    fn test_unbalanced_animation() {
        assert!(matches!(
            header_error("I\n800\nOBJ\nANIM_end\n"),
            FormatError::UnbalancedAnimation { line: 4 }
        ));
        assert!(matches!(
            header_error("I\n800\nOBJ\nANIM_begin\n"),
            FormatError::UnbalancedAnimation { .. }
        ));
    }

    #[test]
    fn test_warnings_are_sorted_and_unique() {
        let text = "I\n800\nOBJ\nLINES 0 2\nFOO\nFOO\nVLIGHT 0 0 0\nTEXTURE_LIT x_LIT.png\n";
        let (_, report) = parse(text).expect("Failed to parse");
        assert_eq!(
            report.warnings,
            vec![
                "Ignoring command FOO",
                "Ignoring old-style lights",
                "Ignoring old-style lines",
            ]
        );
    }

    #[test]
    fn test_lod_stops_import() {
        let text = format!(
            "I\n800\nOBJ\n{}ATTR_LOD 0 1000\nTRIS 0 3\nATTR_LOD 1000 5000\nTRIS 3 3\n",
            QUAD
        );
        let (_, report) = parse(&text).expect("Failed to parse");
        assert_eq!(report.triangles, 1);
        assert_eq!(report.warnings, vec!["Ignoring lower level(s) of detail"]);
    }

    #[test]
    fn test_lights_become_text_markers() {
        let text = "I\n800\nOBJ\nANIM_begin\nANIM_trans 0 1 0 0 1 0 0 0 none\n\
                    LIGHT_NAMED airplane_beacon 1 0 -2\n\
                    smoke_black 0 0 0 1.5\nANIM_end\n";
        let (scene, _) = committed(text);
        let Entity::Instance(instance) = &scene.entities[0] else {
            panic!("Expected an instance");
        };
        let definition = &scene.definitions[instance.definition];
        assert_eq!(
            definition.entities[0],
            Entity::Text(Text {
                text: "LIGHT_NAMED airplane_beacon".into(),
                position: Some([1.0, 2.0, 0.0]),
                hidden: false,
            })
        );
        assert_eq!(
            definition.entities[1],
            Entity::Text(Text {
                text: "smoke_black 1.5".into(),
                position: Some([0.0, 0.0, 0.0]),
                hidden: false,
            })
        );
        // The pivot moved the instance up
        assert_eq!(instance.matrix().w_axis.z, 1.0);
    }

    #[test]
    fn test_keyframed_rotation_block() {
        let text = "I\n800\nOBJ\nANIM_begin\n\
                    ANIM_rotate_begin 0 1 0 sim/door\n\
                    ANIM_rotate_key 1 90\n\
                    ANIM_rotate_key 0 0\n\
                    ANIM_rotate_end\n\
                    ANIM_keyframe_loop 2\n\
                    ANIM_hide 0 0.5 sim/flag\n\
                    ANIM_end\n";
        let (scene, report) = committed(text);
        assert_eq!(report.components, 1);
        let Entity::Instance(instance) = &scene.entities[0] else {
            panic!("Expected an instance");
        };
        let record = AnimationRecord::read(&instance.attributes).expect("Missing animation");
        assert_eq!(record.dataref.as_deref(), Some("sim/door"));
        assert_eq!(record.values, vec!["0", "1"]);
        assert_eq!(record.loop_value.as_deref(), Some("2"));
        assert_eq!(record.hide_show[0].mode, HideShowMode::Hide);
        assert_eq!(record.hide_show[0].to, "0.5");

        // File +y is host +z
        let quarter = glam::DMat4::from_rotation_z(90f64.to_radians());
        let got = obj8_shared::math::mat4(&record.matrices[1]);
        assert!(obj8_shared::math::max_abs_diff(&got, &quarter) < 1e-12);
    }

    #[test]
    fn test_missing_texture_is_a_resource_error() {
        let result = parse("I\n800\nOBJ\nTEXTURE no_such_texture.png\n");
        assert!(matches!(result, Err(ImportError::Resource { .. })));
    }
}
