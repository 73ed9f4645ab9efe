//! OBJ8 text emission
//!
//! Writes header, texture lines, the vertex and index tables and then the
//! command stream. The command stream is a walk over the sorted primitives
//! that tracks the renderer's state (current attributes, open animation
//! blocks, pending `TRIS` range) and writes only the transitions.

use glam::DVec3;
use obj8_common::formats::{
    ALPHA_OFF, ALPHA_ON, LAYER_DEFAULT, LAYER_GROUND, POLY_OS_GROUND,
};
use obj8_common::{Attrs, LightKind, LightMarker, Vertex, HEADER_OBJ, HEADER_VERSION, IDX_CHUNK};
use obj8_shared::math::to_file;
use std::io::{self, Write};

use super::primitive::{GlobalIndex, IndexRuns, Primitive};
use crate::anim::{AnimArena, AnimId, AnimationNode};

/// Texture lines for the header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureLines {
    /// File name of the day texture, if any
    pub texture: Option<String>,
    /// File name of a `_LIT` companion found next to it
    pub lit: Option<String>,
}

/// Everything needed to write one file
pub struct WriteInput<'a> {
    pub vertices: &'a [Vertex],
    pub prims: &'a [Primitive],
    pub runs: &'a IndexRuns,
    pub index: &'a GlobalIndex,
    pub arena: &'a AnimArena,
    pub textures: &'a TextureLines,
}

/// Write a complete OBJ8 file
pub fn write_obj8<W: Write>(w: &mut W, input: &WriteInput) -> io::Result<()> {
    write_header(w, input)?;
    write_vertices(w, input.vertices)?;
    write_indices(w, &input.index.indices)?;
    CommandWriter::new(w, input).write_all()?;
    writeln!(
        w,
        "\n# Exported with obj8-convert {}.",
        env!("CARGO_PKG_VERSION")
    )
}

fn write_header<W: Write>(w: &mut W, input: &WriteInput) -> io::Result<()> {
    writeln!(w, "I\n{}\n{}\n", HEADER_VERSION, HEADER_OBJ)?;
    match &input.textures.texture {
        Some(texture) => {
            writeln!(w, "TEXTURE\t\t{}", texture)?;
            if let Some(lit) = &input.textures.lit {
                writeln!(w, "TEXTURE_LIT\t{}", lit)?;
            }
            if input.prims.iter().any(|p| p.attrs().is_draped()) {
                writeln!(w, "TEXTURE_DRAPED\t{}", texture)?;
            }
        }
        None => writeln!(w, "TEXTURE\t")?,
    }
    writeln!(
        w,
        "POINT_COUNTS\t{} 0 0 {}\n",
        input.vertices.len(),
        input.index.indices.len()
    )
}

/// Avoid writing `-0.0000`
fn n(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

fn write_vertices<W: Write>(w: &mut W, vertices: &[Vertex]) -> io::Result<()> {
    for v in vertices {
        let p = to_file(v.position);
        let nrm = to_file(v.normal);
        writeln!(
            w,
            "VT\t{:9.4} {:9.4} {:9.4}\t{:6.3} {:6.3} {:6.3}\t{:7.4} {:7.4}",
            n(p.x),
            n(p.y),
            n(p.z),
            n(nrm.x),
            n(nrm.y),
            n(nrm.z),
            n(v.uv.x),
            n(v.uv.y)
        )?;
    }
    writeln!(w)
}

fn write_indices<W: Write>(w: &mut W, indices: &[u32]) -> io::Result<()> {
    let mut chunks = indices.chunks_exact(IDX_CHUNK);
    for chunk in &mut chunks {
        let line: Vec<String> = chunk.iter().map(u32::to_string).collect();
        writeln!(w, "IDX10\t{}", line.join(" "))?;
    }
    for i in chunks.remainder() {
        writeln!(w, "IDX\t{}", i)?;
    }
    writeln!(w)
}

// ============================================================================
// Command stream
// ============================================================================

fn indent(depth: usize) -> String {
    "\t".repeat(depth)
}

struct CommandWriter<'w, 'a, W: Write> {
    w: &'w mut W,
    input: &'a WriteInput<'a>,
    attrs: Attrs,
    anim: Option<AnimId>,
    /// (base, count) of triangles not yet written
    pending: Option<(usize, usize)>,
}

impl<'w, 'a, W: Write> CommandWriter<'w, 'a, W> {
    fn new(w: &'w mut W, input: &'a WriteInput<'a>) -> Self {
        Self {
            w,
            input,
            attrs: Attrs::DEFAULT,
            anim: None,
            pending: None,
        }
    }

    fn write_all(mut self) -> io::Result<()> {
        let input = self.input;
        for prim in input.prims {
            let (attrs, anim) = (prim.attrs(), prim.anim());
            if attrs != self.attrs || anim != self.anim {
                self.flush()?;
                self.transition(attrs, anim)?;
            }
            match prim {
                Primitive::Tris { run, .. } => {
                    let base = input.index.base(*run);
                    let count = input.runs.get(*run).len();
                    match self.pending {
                        Some((b, c)) if b + c == base => self.pending = Some((b, c + count)),
                        Some(_) => {
                            self.flush()?;
                            self.pending = Some((base, count));
                        }
                        None => self.pending = Some((base, count)),
                    }
                }
                Primitive::Light { text, position, .. } => {
                    let depth = input.arena.depth(self.anim);
                    self.write_light(text, *position, depth)?;
                }
            }
        }
        self.flush()?;
        self.transition(self.attrs, None)
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some((base, count)) = self.pending.take() {
            let depth = self.input.arena.depth(self.anim);
            writeln!(self.w, "{}TRIS\t{} {}", indent(depth), base, count)?;
        }
        Ok(())
    }

    /// Close blocks not shared with the new context, switch attributes at the
    /// shared depth, then open the new blocks
    fn transition(&mut self, attrs: Attrs, anim: Option<AnimId>) -> io::Result<()> {
        let arena = self.input.arena;
        let old = arena.chain(self.anim);
        let new = arena.chain(anim);
        let common = old.iter().zip(&new).take_while(|(a, b)| a == b).count();

        for depth in (common..old.len()).rev() {
            writeln!(self.w, "{}ANIM_end", indent(depth))?;
        }
        self.write_attrs(attrs, common)?;
        for (depth, id) in new.iter().enumerate().skip(common) {
            self.write_anim_begin(arena.get(*id), depth)?;
        }

        self.attrs = attrs;
        self.anim = anim;
        Ok(())
    }

    fn write_attrs(&mut self, attrs: Attrs, depth: usize) -> io::Result<()> {
        let old = self.attrs;
        let ins = indent(depth);

        if old.is_poly_offset() != attrs.is_poly_offset() {
            if attrs.is_poly_offset() {
                writeln!(self.w, "{}ATTR_layer_group\t{}", ins, LAYER_GROUND)?;
                writeln!(self.w, "{}ATTR_poly_os\t{}", ins, POLY_OS_GROUND)?;
            } else {
                writeln!(self.w, "{}ATTR_layer_group\t{}", ins, LAYER_DEFAULT)?;
                writeln!(self.w, "{}ATTR_poly_os\t0", ins)?;
            }
        }
        if old.is_draped() != attrs.is_draped() {
            let cmd = if attrs.is_draped() { "ATTR_draped" } else { "ATTR_no_draped" };
            writeln!(self.w, "{}{}", ins, cmd)?;
        }
        if old.contains(Attrs::ALPHA) != attrs.contains(Attrs::ALPHA) {
            let cmd = if attrs.contains(Attrs::ALPHA) { ALPHA_ON } else { ALPHA_OFF };
            writeln!(self.w, "{}{}", ins, cmd)?;
        }
        if old.contains(Attrs::SHINY) != attrs.contains(Attrs::SHINY) {
            let ratio = if attrs.contains(Attrs::SHINY) { 1 } else { 0 };
            writeln!(self.w, "{}ATTR_shiny_rat\t{}", ins, ratio)?;
        }
        let hardness = attrs & Attrs::HARDNESS_MASK;
        if old & Attrs::HARDNESS_MASK != hardness {
            let cmd = if hardness.contains(Attrs::HARD) {
                "ATTR_hard"
            } else if hardness.contains(Attrs::DECK) {
                "ATTR_hard_deck"
            } else {
                "ATTR_no_hard"
            };
            writeln!(self.w, "{}{}", ins, cmd)?;
        }
        Ok(())
    }

    fn write_anim_begin(&mut self, node: &AnimationNode, depth: usize) -> io::Result<()> {
        let outer = indent(depth);
        let ins = indent(depth + 1);
        let dataref = node.dataref.as_deref().unwrap_or("none");

        writeln!(self.w, "{}ANIM_begin", outer)?;
        writeln!(self.w, "{}# {}", ins, node.label)?;

        for rule in &node.hide_show {
            writeln!(
                self.w,
                "{}ANIM_{}\t{} {}\t{}",
                ins,
                rule.mode.as_str(),
                rule.from,
                rule.to,
                rule.dataref
            )?;
        }

        match node.translations.as_slice() {
            [] => {}
            [t] => {
                let t = to_file(*t);
                writeln!(
                    self.w,
                    "{ins}ANIM_trans\t{x:9.4} {y:9.4} {z:9.4}\t{x:9.4} {y:9.4} {z:9.4}\t0 0\tnone",
                    ins = ins,
                    x = n(t.x),
                    y = n(t.y),
                    z = n(t.z)
                )?;
            }
            path => {
                writeln!(self.w, "{}ANIM_trans_begin\t{}", ins, dataref)?;
                for (value, t) in node.keyframe_values.iter().zip(path) {
                    let t = to_file(*t);
                    writeln!(
                        self.w,
                        "{}\tANIM_trans_key\t\t{}\t{:9.4} {:9.4} {:9.4}",
                        ins,
                        value,
                        n(t.x),
                        n(t.y),
                        n(t.z)
                    )?;
                }
                self.write_loop(node, &ins)?;
                writeln!(self.w, "{}ANIM_trans_end", ins)?;
            }
        }

        for (axis, path) in node.rotation_paths() {
            let a = to_file(axis);
            let axis = format!("{} {} {}", a.x as i32, a.y as i32, a.z as i32);
            match path {
                [] => {}
                [angle] => writeln!(
                    self.w,
                    "{ins}ANIM_rotate\t{axis}\t{a:7.2} {a:7.2}\t0 0\tnone",
                    ins = ins,
                    axis = axis,
                    a = n(*angle)
                )?,
                path => {
                    writeln!(self.w, "{}ANIM_rotate_begin\t{}\t{}", ins, axis, dataref)?;
                    for (value, angle) in node.keyframe_values.iter().zip(path) {
                        writeln!(
                            self.w,
                            "{}\tANIM_rotate_key\t\t{}\t{:7.2}",
                            ins,
                            value,
                            n(*angle)
                        )?;
                    }
                    self.write_loop(node, &ins)?;
                    writeln!(self.w, "{}ANIM_rotate_end", ins)?;
                }
            }
        }
        Ok(())
    }

    fn write_loop(&mut self, node: &AnimationNode, ins: &str) -> io::Result<()> {
        if let Some(l) = &node.loop_value {
            writeln!(self.w, "{}\tANIM_keyframe_loop\t{}", ins, l)?;
        }
        Ok(())
    }

    fn write_light(&mut self, text: &str, position: DVec3, depth: usize) -> io::Result<()> {
        let Some(marker) = LightMarker::parse(text) else {
            return Ok(());
        };
        let p = to_file(position);
        let xyz = format!("{:9.4} {:9.4} {:9.4}", n(p.x), n(p.y), n(p.z));
        let args = marker.args.join(" ");
        let ins = indent(depth);
        match (marker.kind, &marker.name) {
            (LightKind::Named, Some(name)) => writeln!(
                self.w,
                "{}{}\t{}\t{}\t{}",
                ins, marker.light_type, name, xyz, args
            ),
            _ => writeln!(self.w, "{}{}\t{}\t{}", ins, marker.light_type, xyz, args),
        }
    }
}
