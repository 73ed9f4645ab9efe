//! Host scene model
//!
//! A minimal, serializable stand-in for the modelling host's scene graph:
//! a material table, a table of reusable component definitions and a tree of
//! entities. Meshes arrive already tessellated into triangles with per-point
//! normals and per-side UVs.

use anyhow::{Context, Result};
use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::attributes::Attributes;
use crate::math::{mat4, IDENTITY};

/// Index into [`Scene::materials`]
pub type MaterialId = usize;

/// Index into [`Scene::definitions`]
pub type DefinitionId = usize;

fn identity() -> [f64; 16] {
    IDENTITY
}

fn opaque() -> f64 {
    1.0
}

fn is_false(b: &bool) -> bool {
    !*b
}

// ============================================================================
// Scene
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub definitions: Vec<Definition>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl Scene {
    /// Load a scene from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene: {:?}", path))?;
        let scene: Scene = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse scene: {:?}", path))?;
        Ok(scene)
    }

    /// Save the scene as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize scene")?;
        std::fs::write(path, content).with_context(|| format!("Failed to write scene: {:?}", path))
    }

    pub fn material(&self, id: Option<MaterialId>) -> Option<&Material> {
        id.and_then(|id| self.materials.get(id))
    }

    pub fn definition(&self, id: DefinitionId) -> Option<&Definition> {
        self.definitions.get(id)
    }

    /// Find a material by name
    pub fn material_named(&self, name: &str) -> Option<MaterialId> {
        self.materials.iter().position(|m| m.name == name)
    }

    /// Total number of triangles reachable from the root, counting every
    /// instance of a definition
    pub fn triangle_count(&self) -> usize {
        self.count_triangles(&self.entities)
    }

    fn count_triangles(&self, entities: &[Entity]) -> usize {
        entities
            .iter()
            .map(|e| match e {
                Entity::Face(face) => face.mesh.triangles.len(),
                Entity::Group(group) => self.count_triangles(&group.entities),
                Entity::Instance(inst) => self
                    .definition(inst.definition)
                    .map_or(0, |def| self.count_triangles(&def.entities)),
                Entity::Text(_) | Entity::Edge(_) => 0,
            })
            .sum()
    }
}

// ============================================================================
// Materials
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// RGB colour used when untextured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 3]>,
    /// Texture image path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<PathBuf>,
    /// Opacity; a side whose material has zero alpha is not rendered
    #[serde(default = "opaque")]
    pub alpha: f64,
}

impl Material {
    pub fn textured(name: impl Into<String>, texture: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            color: None,
            texture: Some(texture.into()),
            alpha: 1.0,
        }
    }

    pub fn has_texture(&self) -> bool {
        self.texture.is_some()
    }
}

// ============================================================================
// Definitions and entities
// ============================================================================

/// A reusable component definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub name: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

/// Everything the codec knows how to read from or write to a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Entity {
    Face(Face),
    Group(Group),
    Instance(Instance),
    Text(Text),
    Edge(Edge),
}

impl Entity {
    pub fn is_hidden(&self) -> bool {
        match self {
            Entity::Face(f) => f.hidden,
            Entity::Group(g) => g.hidden,
            Entity::Instance(i) => i.hidden,
            Entity::Text(t) => t.hidden,
            Entity::Edge(e) => e.hidden,
        }
    }
}

/// Triangulated surface with per-point normals and per-side UVs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceMesh {
    pub points: Vec<[f64; 3]>,
    pub normals: Vec<[f64; 3]>,
    /// Empty when the front side is untextured
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub front_uvs: Vec<[f64; 2]>,
    /// Empty when the back side is untextured
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub back_uvs: Vec<[f64; 2]>,
    /// Counter-clockwise (front-facing) triangles indexing `points`
    pub triangles: Vec<[usize; 3]>,
}

impl FaceMesh {
    pub fn point(&self, i: usize) -> DVec3 {
        DVec3::from_array(self.points[i])
    }

    pub fn normal(&self, i: usize) -> DVec3 {
        self.normals.get(i).map_or(DVec3::ZERO, |n| DVec3::from_array(*n))
    }

    /// UV of a point on one side, `[0, 0]` when that side has no mapping
    pub fn uv(&self, i: usize, front: bool) -> [f64; 2] {
        let uvs = if front { &self.front_uvs } else { &self.back_uvs };
        uvs.get(i).copied().unwrap_or([0.0, 0.0])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub mesh: FaceMesh,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<MaterialId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_material: Option<MaterialId>,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub name: String,
    #[serde(default = "identity")]
    pub transform: [f64; 16],
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
}

impl Default for Group {
    fn default() -> Self {
        Self {
            name: String::new(),
            transform: IDENTITY,
            entities: Vec::new(),
            hidden: false,
        }
    }
}

impl Group {
    pub fn matrix(&self) -> DMat4 {
        mat4(&self.transform)
    }
}

/// A placement of a component definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    #[serde(default)]
    pub name: String,
    pub definition: DefinitionId,
    #[serde(default = "identity")]
    pub transform: [f64; 16],
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
}

impl Instance {
    pub fn new(definition: DefinitionId, transform: DMat4) -> Self {
        Self {
            name: String::new(),
            definition,
            transform: transform.to_cols_array(),
            attributes: Attributes::default(),
            hidden: false,
        }
    }

    pub fn matrix(&self) -> DMat4 {
        mat4(&self.transform)
    }
}

/// Free text anchored at a point; lights are carried as text markers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
}

/// A shared edge between faces with its display flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub start: [f64; 3],
    pub end: [f64; 3],
    #[serde(default, skip_serializing_if = "is_false")]
    pub soft: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub smooth: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_json_round_trip() {
        let scene = Scene {
            materials: vec![Material::textured("wood", "wood.png")],
            definitions: vec![Definition {
                name: "door".into(),
                entities: vec![Entity::Text(Text {
                    text: "LIGHT_NAMED beacon".into(),
                    position: Some([0.0, 0.0, 1.0]),
                    hidden: false,
                })],
            }],
            entities: vec![Entity::Instance(Instance::new(0, DMat4::IDENTITY))],
        };
        let json = serde_json::to_string(&scene).expect("Failed to serialize");
        let back: Scene = serde_json::from_str(&json).expect("Failed to deserialize");
        assert_eq!(scene, back);
    }

    #[test]
    fn test_missing_transform_defaults_to_identity() {
        let json = r#"{"entities":[{"type":"Group","entities":[]}]}"#;
        let scene: Scene = serde_json::from_str(json).expect("Failed to parse");
        match &scene.entities[0] {
            Entity::Group(g) => assert_eq!(g.matrix(), DMat4::IDENTITY),
            other => panic!("Expected group, got {:?}", other),
        }
    }

    #[test]
    fn test_triangle_count_follows_instances() {
        let face = Face {
            mesh: FaceMesh {
                points: vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                normals: vec![[0.0, 0.0, 1.0]; 3],
                triangles: vec![[0, 1, 2]],
                ..Default::default()
            },
            ..Default::default()
        };
        let scene = Scene {
            materials: vec![],
            definitions: vec![Definition {
                name: "tri".into(),
                entities: vec![Entity::Face(face)],
            }],
            entities: vec![
                Entity::Instance(Instance::new(0, DMat4::IDENTITY)),
                Entity::Instance(Instance::new(0, DMat4::from_translation(DVec3::X))),
            ],
        };
        assert_eq!(scene.triangle_count(), 2);
    }
}
