//! Triangle batch -> host faces
//!
//! Triangles read between two non-geometry commands are collected and turned
//! into faces in one go, because the clean-up passes need to see neighbours:
//! duplicate triangles become the back side of the first copy, shared edges
//! are smoothed, and coplanar neighbours with continuous texturing are merged
//! into one face.

use glam::{DVec2, DVec3};
use hashbrown::HashMap;
use obj8_shared::{Edge, Face, FaceMesh, MaterialId, SurfaceFlags};

use crate::config::ImportConfig;

pub const WARN_GEOMETRY: &str = "Ignoring some geometry that couldn't be imported";
pub const WARN_TEXTURE: &str = "Ignoring texture on some faces that couldn't be textured";

/// One triangle as read from the file, in host space
#[derive(Clone, Debug, PartialEq)]
pub struct SourceTriangle {
    pub points: [DVec3; 3],
    pub normals: [DVec3; 3],
    pub uvs: [DVec2; 3],
    /// Texture material in effect
    pub material: Option<MaterialId>,
    /// Back faces are culled
    pub cull: bool,
    pub flags: SurfaceFlags,
}

/// Faces and edges built from one batch
#[derive(Debug, Default)]
pub struct BuiltMesh {
    pub faces: Vec<Face>,
    /// Soft/smooth edges between faces
    pub edges: Vec<Edge>,
    /// Triangles that made it into a face
    pub triangles: usize,
    pub warnings: Vec<&'static str>,
}

#[derive(Clone, Debug)]
struct Tri {
    points: [DVec3; 3],
    normals: [DVec3; 3],
    material: Option<MaterialId>,
    front_uvs: Option<[DVec2; 3]>,
    back_material: Option<MaterialId>,
    back_uvs: Option<[DVec2; 3]>,
    flags: SurfaceFlags,
    /// Unit face normal
    normal: DVec3,
    /// Vertex normals differ, so the surface is smooth shaded
    smooth: bool,
}

impl Tri {
    fn corner(&self, p: DVec3) -> Option<usize> {
        self.points.iter().position(|q| *q == p)
    }

    fn front_uv(&self, p: DVec3) -> Option<DVec2> {
        Some(self.front_uvs?[self.corner(p)?])
    }

    fn back_uv(&self, p: DVec3) -> Option<DVec2> {
        Some(self.back_uvs?[self.corner(p)?])
    }
}

type PointKey = [u64; 3];

fn point_key(p: DVec3) -> PointKey {
    // Fold -0.0 so it keys like 0.0
    [
        (p.x + 0.0).to_bits(),
        (p.y + 0.0).to_bits(),
        (p.z + 0.0).to_bits(),
    ]
}

fn edge_key(a: DVec3, b: DVec3) -> (PointKey, PointKey) {
    let (ka, kb) = (point_key(a), point_key(b));
    if ka <= kb {
        (ka, kb)
    } else {
        (kb, ka)
    }
}

/// Build faces from a batch.
///
/// `reverse` is the material given to the back of culled textured faces.
pub fn build_faces(
    batch: &[SourceTriangle],
    reverse: MaterialId,
    config: &ImportConfig,
) -> BuiltMesh {
    let mut out = BuiltMesh::default();
    let mut tris: Vec<Tri> = Vec::with_capacity(batch.len());
    let mut by_points: HashMap<[PointKey; 3], usize> = HashMap::new();

    for source in batch {
        let [p0, p1, p2] = source.points;
        if p0 == p1 || p0 == p2 || p1 == p2 {
            continue;
        }
        let cross = (p1 - p0).cross(p2 - p0);
        if cross.length() < 1e-12 {
            out.warnings.push(WARN_GEOMETRY);
            continue;
        }

        let mut key = source.points.map(point_key);
        key.sort_unstable();
        if let Some(&existing) = by_points.get(&key) {
            add_back_side(&mut tris[existing], source, config);
            continue;
        }

        let mut tri = Tri {
            points: source.points,
            normals: source.normals,
            material: None,
            front_uvs: None,
            back_material: None,
            back_uvs: None,
            flags: source.flags,
            normal: cross.normalize(),
            smooth: source.normals[0] != source.normals[1]
                || source.normals[0] != source.normals[2]
                || source.normals[1] != source.normals[2],
        };
        let mut uvs = source.uvs;

        // Face the same way as the vertex normals
        if tri.normal.dot(source.normals[0]) < 0.0 {
            tri.points.swap(0, 2);
            tri.normals.swap(0, 2);
            uvs.swap(0, 2);
            tri.normal = -tri.normal;
        }

        if let Some(material) = source.material {
            match place_texture(uvs, config) {
                Some(uvs) => {
                    tri.material = Some(material);
                    tri.front_uvs = Some(uvs);
                    if source.cull {
                        tri.back_material = Some(reverse);
                    } else {
                        tri.back_material = Some(material);
                        tri.back_uvs = Some(uvs);
                    }
                }
                None if uvs.iter().all(|uv| *uv == DVec2::ZERO) => {}
                None => out.warnings.push(WARN_TEXTURE),
            }
        }

        by_points.insert(key, tris.len());
        tris.push(tri);
    }

    out.triangles = tris.len();
    let (groups, soft) = edge_pass(&tris, config);
    out.faces = assemble_faces(&tris, &groups);
    out.edges = soft;
    out
}

/// Texture coordinates for a triangle, or `None` if it can't be textured.
/// Coincident coordinates are nudged apart first.
fn place_texture(mut uvs: [DVec2; 3], config: &ImportConfig) -> Option<[DVec2; 3]> {
    if uvs.iter().all(|uv| *uv == DVec2::ZERO) {
        return None;
    }
    if uvs[1] == uvs[0] {
        uvs[1].x += config.uv_nudge;
    }
    if uvs[2] == uvs[0] {
        uvs[2].y += config.uv_nudge;
    }
    let area = (uvs[1] - uvs[0]).perp_dot(uvs[2] - uvs[0]);
    (area.abs() > 1e-12).then_some(uvs)
}

/// A second triangle over the same points textures the back of the first
fn add_back_side(tri: &mut Tri, source: &SourceTriangle, config: &ImportConfig) {
    let Some(material) = source.material else {
        return;
    };
    let Some(uvs) = place_texture(source.uvs, config) else {
        return;
    };
    let mut back = [DVec2::ZERO; 3];
    for (i, p) in source.points.iter().enumerate() {
        if let Some(c) = tri.corner(*p) {
            back[c] = uvs[i];
        }
    }
    tri.back_material = Some(material);
    tri.back_uvs = Some(back);
}

// ============================================================================
// Edge post-pass
// ============================================================================

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb.max(ra)] = rb.min(ra);
        }
    }
}

/// Group coplanar, continuously textured neighbours and collect soft edges
/// between the resulting faces
fn edge_pass(tris: &[Tri], config: &ImportConfig) -> (Vec<usize>, Vec<Edge>) {
    let mut edges: HashMap<(PointKey, PointKey), (DVec3, DVec3, Vec<usize>)> = HashMap::new();
    let mut order: Vec<(PointKey, PointKey)> = Vec::new();
    for (t, tri) in tris.iter().enumerate() {
        for i in 0..3 {
            let (a, b) = (tri.points[i], tri.points[(i + 1) % 3]);
            let key = edge_key(a, b);
            let entry = edges.entry(key).or_insert_with(|| {
                order.push(key);
                (a, b, Vec::new())
            });
            entry.2.push(t);
        }
    }

    let smooth_angle = config.smooth_angle.to_radians();
    let mut uf = UnionFind::new(tris.len());
    let mut soft = Vec::new();
    for key in &order {
        let (start, end, faces) = &edges[key];
        let [f0, f1] = faces.as_slice() else {
            continue;
        };
        let (t0, t1) = (&tris[*f0], &tris[*f1]);
        let angle = t0.normal.angle_between(t1.normal);
        if angle <= config.planar_angle && can_merge(t0, t1, *start, *end) {
            uf.union(*f0, *f1);
        } else if (t0.smooth || t1.smooth) && angle <= smooth_angle {
            soft.push((*f0, *f1, *start, *end));
        }
    }

    let groups: Vec<usize> = (0..tris.len()).map(|t| uf.find(t)).collect();
    let soft_edges = soft
        .into_iter()
        .filter(|(f0, f1, _, _)| groups[*f0] != groups[*f1])
        .map(|(_, _, start, end)| Edge {
            start: start.to_array(),
            end: end.to_array(),
            soft: true,
            smooth: true,
            hidden: false,
        })
        .collect();
    (groups, soft_edges)
}

/// Removing the shared edge keeps texturing intact
fn can_merge(t0: &Tri, t1: &Tri, start: DVec3, end: DVec3) -> bool {
    if t0.material != t1.material
        || t0.back_material != t1.back_material
        || t0.flags != t1.flags
    {
        return false;
    }
    if t0.front_uvs.is_none() {
        return t1.front_uvs.is_none();
    }
    let same = |f: fn(&Tri, DVec3) -> Option<DVec2>| {
        f(t0, start) == f(t1, start) && f(t0, end) == f(t1, end)
    };
    if !same(Tri::front_uv) || (t0.back_uvs.is_some() && !same(Tri::back_uv)) {
        return false;
    }

    // The texture must not be mirrored about the edge
    let third = |t: &Tri| {
        t.points
            .iter()
            .find(|p| **p != start && **p != end)
            .and_then(|p| t.front_uv(*p))
    };
    let (Some(u0), Some(u1), Some(u2), Some(u3)) =
        (third(t0), third(t1), t0.front_uv(start), t0.front_uv(end))
    else {
        return false;
    };
    (u2 - u0).perp_dot(u2 - u3) * (u2 - u1).perp_dot(u2 - u3) <= 0.0
}

fn assemble_faces(tris: &[Tri], groups: &[usize]) -> Vec<Face> {
    let mut faces: Vec<Face> = Vec::new();
    let mut face_of_group: HashMap<usize, usize> = HashMap::new();
    let mut point_maps: Vec<HashMap<[u64; 7], usize>> = Vec::new();

    for (t, tri) in tris.iter().enumerate() {
        let f = *face_of_group.entry(groups[t]).or_insert_with(|| {
            let mut face = Face {
                material: tri.material,
                back_material: tri.back_material,
                ..Default::default()
            };
            tri.flags.write(&mut face.attributes);
            faces.push(face);
            point_maps.push(HashMap::new());
            faces.len() - 1
        });
        let face = &mut faces[f];
        let points = &mut point_maps[f];

        let mut triangle = [0usize; 3];
        for (c, slot) in triangle.iter_mut().enumerate() {
            let p = tri.points[c];
            let front = tri.front_uvs.map_or(DVec2::ZERO, |uvs| uvs[c]);
            let back = tri.back_uvs.map_or(DVec2::ZERO, |uvs| uvs[c]);
            let pk = point_key(p);
            let key = [
                pk[0],
                pk[1],
                pk[2],
                front.x.to_bits(),
                front.y.to_bits(),
                back.x.to_bits(),
                back.y.to_bits(),
            ];
            *slot = *points.entry(key).or_insert_with(|| {
                let mesh: &mut FaceMesh = &mut face.mesh;
                mesh.points.push(p.to_array());
                mesh.normals.push(tri.normals[c].to_array());
                if tri.front_uvs.is_some() {
                    mesh.front_uvs.push(front.to_array());
                }
                if tri.back_uvs.is_some() {
                    mesh.back_uvs.push(back.to_array());
                }
                mesh.points.len() - 1
            });
        }
        face.mesh.triangles.push(triangle);
    }
    faces
}
