//! Vertex records and the scoped dedup table
//!
//! Vertices are rounded to output precision *before* they are compared, so
//! near-duplicates produced by transforming the same point twice collapse to
//! one table entry. Duplicate lookup is limited to the current scope (one
//! container of the scene walk); vertices are never merged across scopes.

use glam::{DVec2, DVec3};
use hashbrown::HashMap;
use obj8_shared::math::{round_to, round_vec3};

/// Decimal places kept for each vertex field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Precision {
    pub position: u32,
    pub normal: u32,
    pub uv: u32,
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            position: 4,
            normal: 3,
            uv: 4,
        }
    }
}

/// One rounded vertex
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: DVec3,
    pub normal: DVec3,
    pub uv: DVec2,
}

/// Bit pattern of every rounded field
type VertexKey = [u64; 8];

impl Vertex {
    /// Build a vertex, rounding every field to `precision`
    pub fn rounded(position: DVec3, normal: DVec3, uv: DVec2, precision: &Precision) -> Self {
        Self {
            position: round_vec3(position, precision.position),
            normal: round_vec3(normal, precision.normal),
            uv: DVec2::new(round_to(uv.x, precision.uv), round_to(uv.y, precision.uv)),
        }
    }

    fn key(&self) -> VertexKey {
        [
            self.position.x.to_bits(),
            self.position.y.to_bits(),
            self.position.z.to_bits(),
            self.normal.x.to_bits(),
            self.normal.y.to_bits(),
            self.normal.z.to_bits(),
            self.uv.x.to_bits(),
            self.uv.y.to_bits(),
        ]
    }
}

/// Append-only vertex store with per-scope duplicate lookup
#[derive(Debug)]
pub struct VertexTable {
    vertices: Vec<Vertex>,
    root: HashMap<VertexKey, u32>,
    /// One lookup map per open scope; only the innermost is searched
    scopes: Vec<HashMap<VertexKey, u32>>,
}

impl Default for VertexTable {
    fn default() -> Self {
        Self::new()
    }
}

impl VertexTable {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            root: HashMap::new(),
            scopes: Vec::new(),
        }
    }

    /// Start a new dedup scope. Vertices inserted from now on are invisible
    /// to the enclosing scope's lookups and vice versa.
    pub fn open_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Close the innermost scope. The root scope is never closed.
    pub fn close_scope(&mut self) {
        self.scopes.pop();
    }

    /// Index of an equal vertex in the current scope, inserting on a miss
    pub fn lookup_or_insert(&mut self, vertex: Vertex) -> u32 {
        let key = vertex.key();
        let next = self.vertices.len() as u32;
        let scope = match self.scopes.last_mut() {
            Some(scope) => scope,
            None => &mut self.root,
        };
        let index = *scope.entry(key).or_insert(next);
        if index == next {
            self.vertices.push(vertex);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<&Vertex> {
        self.vertices.get(index as usize)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }
}
