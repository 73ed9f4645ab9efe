//! Scene walk
//!
//! Flattens the entity tree into vertices, triangle runs, lights and
//! animation nodes. Transforms are composed on the way down; an animated
//! instance starts a new [`AnimationNode`](crate::anim::AnimationNode) and its
//! children are emitted relative to it. Geometry under an animated instance is
//! cached per definition and replayed for later placements.

use glam::{DMat4, DVec2, DVec3};
use hashbrown::HashMap;
use obj8_common::{Attrs, LightMarker, Precision, Vertex, VertexTable};
use obj8_shared::math::{linear_part, max_abs_diff, round_vec3};
use obj8_shared::{
    AnimationRecord, Definition, DefinitionId, Entity, Face, Instance, Material, Scene,
    SurfaceFlags, Text,
};
use std::path::PathBuf;

use super::primitive::{IndexRuns, Primitive};
use crate::anim::{decompose, AnimArena, AnimId, Decomposed, NotAnimated};
use crate::config::ExportConfig;
use crate::error::ExportError;

/// Counters gathered during the walk
#[derive(Debug, Default)]
pub struct WalkStats {
    /// Faces visited
    pub faces: usize,
    /// Faces with no texture on either side
    pub untextured: usize,
    /// Textured sides per texture, in first-seen order
    pub texture_uses: Vec<(PathBuf, usize)>,
    /// Triangles whose indices fall outside their face's point list
    pub bad_triangles: usize,
}

impl WalkStats {
    fn count_texture(&mut self, texture: &PathBuf) {
        match self.texture_uses.iter_mut().find(|(t, _)| t == texture) {
            Some(entry) => entry.1 += 1,
            None => self.texture_uses.push((texture.clone(), 1)),
        }
    }

    /// Most-used texture; the first seen wins a tie
    pub fn main_texture(&self) -> Option<&PathBuf> {
        let mut best: Option<&(PathBuf, usize)> = None;
        for entry in &self.texture_uses {
            match best {
                Some(b) if b.1 >= entry.1 => {}
                _ => best = Some(entry),
            }
        }
        best.map(|(t, _)| t)
    }
}

/// Geometry produced under one animated placement of a definition
#[derive(Debug, Clone)]
struct CachedGeometry {
    root: AnimId,
    rest: DMat4,
    prims: Vec<Primitive>,
}

/// Everything the walk produces
#[derive(Debug)]
pub struct Accumulated {
    pub vertices: VertexTable,
    pub prims: Vec<Primitive>,
    pub runs: IndexRuns,
    pub arena: AnimArena,
    pub stats: WalkStats,
}

pub struct Accumulator<'a> {
    scene: &'a Scene,
    config: &'a ExportConfig,
    precision: Precision,
    vertices: VertexTable,
    prims: Vec<Primitive>,
    runs: IndexRuns,
    arena: AnimArena,
    cache: HashMap<DefinitionId, CachedGeometry>,
    stats: WalkStats,
}

impl<'a> Accumulator<'a> {
    pub fn new(scene: &'a Scene, config: &'a ExportConfig) -> Self {
        Self {
            scene,
            config,
            precision: config.precision(),
            vertices: VertexTable::new(),
            prims: Vec::new(),
            runs: IndexRuns::new(),
            arena: AnimArena::new(),
            cache: HashMap::new(),
            stats: WalkStats::default(),
        }
    }

    /// Walk the whole scene from the root
    pub fn run(mut self) -> Result<Accumulated, ExportError> {
        let scene = self.scene;
        self.accumulate(&scene.entities, None, &DMat4::IDENTITY)?;
        Ok(Accumulated {
            vertices: self.vertices,
            prims: self.prims,
            runs: self.runs,
            arena: self.arena,
            stats: self.stats,
        })
    }

    /// Visit one container: lights, then faces, then groups, then instances.
    /// The container gets its own vertex dedup scope.
    fn accumulate(
        &mut self,
        entities: &[Entity],
        anim: Option<AnimId>,
        transform: &DMat4,
    ) -> Result<(), ExportError> {
        self.vertices.open_scope();

        for entity in entities.iter().filter(|e| !e.is_hidden()) {
            if let Entity::Text(text) = entity {
                self.add_light(text, anim, transform);
            }
        }

        let mirrored = transform.determinant() < 0.0;
        let mut current: Option<(Attrs, Vec<u32>)> = None;
        for entity in entities.iter().filter(|e| !e.is_hidden()) {
            if let Entity::Face(face) = entity {
                let attrs = face_attrs(&SurfaceFlags::read(&face.attributes), anim.is_some());
                if current.as_ref().is_some_and(|(a, _)| *a != attrs) {
                    self.flush_run(current.take(), anim);
                }
                let run = current.get_or_insert_with(|| (attrs, Vec::new()));
                self.add_face(face, transform, mirrored, &mut run.1);
            }
        }
        self.flush_run(current, anim);

        for entity in entities.iter().filter(|e| !e.is_hidden()) {
            if let Entity::Group(group) = entity {
                self.accumulate(&group.entities, anim, &(*transform * group.matrix()))?;
            }
        }

        for entity in entities.iter().filter(|e| !e.is_hidden()) {
            if let Entity::Instance(instance) = entity {
                self.add_instance(instance, anim, transform)?;
            }
        }

        self.vertices.close_scope();
        Ok(())
    }

    fn flush_run(&mut self, run: Option<(Attrs, Vec<u32>)>, anim: Option<AnimId>) {
        if let Some((attrs, indices)) = run {
            if !indices.is_empty() {
                let run = self.runs.push(indices);
                self.prims.push(Primitive::Tris { attrs, anim, run });
            }
        }
    }

    // ========================================================================
    // Faces
    // ========================================================================

    fn add_face(&mut self, face: &Face, transform: &DMat4, mirrored: bool, out: &mut Vec<u32>) {
        let scene = self.scene;
        let front_material = scene.material(face.material);
        let back_material = scene.material(face.back_material);
        let nomats = front_material.is_none() && back_material.is_none();

        self.stats.faces += 1;
        if !front_material.is_some_and(Material::has_texture)
            && !back_material.is_some_and(Material::has_texture)
        {
            self.stats.untextured += 1;
        }

        let normal_matrix = linear_part(transform);
        let mesh = &face.mesh;

        for front in [true, false] {
            let material = if front { front_material } else { back_material };
            if !nomats && !material.is_some_and(|m| m.alpha > 0.0) {
                continue;
            }
            let texture = material.and_then(|m| m.texture.as_ref());
            if let Some(texture) = texture {
                self.stats.count_texture(texture);
            }

            // Shift UVs so the face's smallest coordinate lands in [0, 1)
            let uv_offset = if texture.is_some() {
                let (mut min_u, mut min_v) = (f64::INFINITY, f64::INFINITY);
                for i in 0..mesh.points.len() {
                    let [u, v] = mesh.uv(i, front);
                    min_u = min_u.min(u);
                    min_v = min_v.min(v);
                }
                if min_u.is_finite() {
                    DVec2::new(min_u.floor(), min_v.floor())
                } else {
                    DVec2::ZERO
                }
            } else {
                DVec2::ZERO
            };

            let side: Vec<Vertex> = (0..mesh.points.len())
                .map(|i| {
                    let position = transform.transform_point3(mesh.point(i));
                    let mut normal = (normal_matrix * mesh.normal(i)).normalize_or_zero();
                    if !front {
                        normal = -normal;
                    }
                    let uv = if texture.is_some() {
                        DVec2::from_array(mesh.uv(i, front)) - uv_offset
                    } else {
                        DVec2::ZERO
                    };
                    Vertex::rounded(position, normal, uv, &self.precision)
                })
                .collect();

            // Front faces keep their winding unless mirrored; back faces flip it
            let keep_winding = !(front ^ mirrored);
            for triangle in &mesh.triangles {
                let Some(corners) = triangle
                    .iter()
                    .map(|&p| side.get(p).copied())
                    .collect::<Option<Vec<Vertex>>>()
                else {
                    self.stats.bad_triangles += 1;
                    continue;
                };
                let mut tri = [0u32; 3];
                for (slot, vertex) in tri.iter_mut().zip(corners) {
                    *slot = self.vertices.lookup_or_insert(vertex);
                }
                if !keep_winding {
                    tri.reverse();
                }
                out.extend_from_slice(&tri);
            }
        }
    }

    // ========================================================================
    // Lights
    // ========================================================================

    fn add_light(&mut self, text: &Text, anim: Option<AnimId>, transform: &DMat4) {
        let Some(position) = text.position else {
            return;
        };
        if LightMarker::parse(&text.text).is_none() {
            return;
        }
        let position = round_vec3(
            transform.transform_point3(DVec3::from_array(position)),
            self.precision.position,
        );
        self.prims.push(Primitive::Light {
            anim,
            text: text.text.clone(),
            position,
        });
    }

    // ========================================================================
    // Instances
    // ========================================================================

    fn add_instance(
        &mut self,
        instance: &Instance,
        anim: Option<AnimId>,
        transform: &DMat4,
    ) -> Result<(), ExportError> {
        let scene = self.scene;
        let definition = scene
            .definition(instance.definition)
            .ok_or(ExportError::MissingDefinition(instance.definition))?;

        let decomposed = AnimationRecord::read(&instance.attributes)
            .ok_or(NotAnimated)
            .and_then(|record| decompose(&record, &instance.matrix(), transform, self.config));

        let Decomposed { mut node, rest } = match decomposed {
            Ok(decomposed) => decomposed,
            Err(NotAnimated) => {
                return self.accumulate(
                    &definition.entities,
                    anim,
                    &(*transform * instance.matrix()),
                );
            }
        };

        node.parent = anim;
        node.cache_key = instance.definition;
        node.label = label(instance, definition);
        let id = self.arena.push(node);

        let cached = self
            .cache
            .get(&instance.definition)
            .filter(|c| max_abs_diff(&c.rest, &rest) < 1e-9)
            .cloned();
        match cached {
            Some(cached) => {
                tracing::debug!(
                    "Reusing geometry of {:?} ({} primitives)",
                    definition.name,
                    cached.prims.len()
                );
                self.replay(&cached, id);
            }
            None => {
                let start = self.prims.len();
                self.accumulate(&definition.entities, Some(id), &rest)?;
                self.cache
                    .entry(instance.definition)
                    .or_insert_with(|| CachedGeometry {
                        root: id,
                        rest,
                        prims: self.prims[start..].to_vec(),
                    });
            }
        }
        Ok(())
    }

    /// Append copies of cached primitives under `root`. Nested nodes are
    /// cloned so each placement owns its own subtree.
    fn replay(&mut self, cached: &CachedGeometry, root: AnimId) {
        let mut remap: HashMap<AnimId, AnimId> = HashMap::new();
        remap.insert(cached.root, root);
        for prim in &cached.prims {
            let anim = prim.anim().map(|a| self.remap_anim(a, &mut remap));
            self.prims.push(prim.with_anim(anim));
        }
    }

    fn remap_anim(&mut self, id: AnimId, remap: &mut HashMap<AnimId, AnimId>) -> AnimId {
        if let Some(&mapped) = remap.get(&id) {
            return mapped;
        }
        let parent = self.arena.parent(id).map(|p| self.remap_anim(p, remap));
        let copy = self.arena.reparent_clone(id, parent);
        remap.insert(id, copy);
        copy
    }
}

/// Render state of a face
pub fn face_attrs(flags: &SurfaceFlags, animated: bool) -> Attrs {
    let mut attrs = Attrs::NONE;
    if animated {
        attrs |= Attrs::NOT_POLY | Attrs::NOT_DRAPED;
    } else {
        if !flags.poly {
            attrs |= Attrs::NOT_POLY;
        }
        if flags.hard {
            attrs |= Attrs::HARD;
        } else if flags.deck {
            attrs |= Attrs::DECK;
        }
        if attrs.intersects(Attrs::NOT_POLY | Attrs::DECK | Attrs::HARD) {
            attrs |= Attrs::NOT_DRAPED;
        }
    }
    // Blending and shininess only apply at ground level
    if attrs.is_poly_offset() || attrs.is_draped() {
        if flags.alpha {
            attrs |= Attrs::ALPHA;
        }
        if flags.shiny {
            attrs |= Attrs::SHINY;
        }
    }
    attrs
}

fn label(instance: &Instance, definition: &Definition) -> String {
    if instance.name.is_empty() {
        format!("<{}>", definition.name)
    } else {
        instance.name.clone()
    }
}
