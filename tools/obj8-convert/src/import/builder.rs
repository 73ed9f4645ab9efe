//! Staged scene edits
//!
//! The parser never touches the target scene directly. Everything it creates
//! is collected here with ids already offset past the scene's existing
//! tables, and [`SceneEdit::commit`] appends it in one step once the whole
//! file has been read.

use obj8_shared::{Definition, DefinitionId, Entity, Material, MaterialId, Scene};
use std::path::Path;

use crate::error::ImportError;

/// Name of the material given to the back of culled faces
pub const REVERSE_MATERIAL: &str = "XPReverse";

/// Magenta, so stray back faces stand out
const REVERSE_COLOR: [u8; 3] = [255, 0, 255];

#[derive(Debug)]
pub struct SceneEdit {
    existing_materials: Vec<Material>,
    definition_base: usize,
    materials: Vec<Material>,
    definitions: Vec<Definition>,
    /// Entities for the root of the scene
    pub entities: Vec<Entity>,
    component_count: usize,
}

impl SceneEdit {
    pub fn new(scene: &Scene) -> Self {
        Self {
            existing_materials: scene.materials.clone(),
            definition_base: scene.definitions.len(),
            materials: Vec::new(),
            definitions: Vec::new(),
            entities: Vec::new(),
            component_count: 0,
        }
    }

    fn find_material(&self, pred: impl Fn(&Material) -> bool) -> Option<MaterialId> {
        self.existing_materials
            .iter()
            .chain(self.materials.iter())
            .position(pred)
    }

    fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        self.existing_materials.len() + self.materials.len() - 1
    }

    /// Material for back faces. An existing untextured, fully transparent
    /// material of that name is reused.
    pub fn reverse_material(&mut self) -> MaterialId {
        let found = self.find_material(|m| {
            m.name == REVERSE_MATERIAL && m.texture.is_none() && m.alpha == 0.0
        });
        match found {
            Some(id) => id,
            None => self.add_material(Material {
                name: REVERSE_MATERIAL.to_string(),
                color: Some(REVERSE_COLOR),
                texture: None,
                alpha: 0.0,
            }),
        }
    }

    /// Material for a texture file, reusing one that already points at it
    pub fn texture_material(&mut self, name: &str, texture: &Path) -> MaterialId {
        let found = self.find_material(|m| m.name == name && m.texture.as_deref() == Some(texture));
        match found {
            Some(id) => id,
            None => self.add_material(Material::textured(name, texture)),
        }
    }

    /// Name for a new animated component
    pub fn next_component_name(&mut self) -> String {
        self.component_count += 1;
        format!("Component#{}", self.component_count)
    }

    pub fn add_definition(&mut self, definition: Definition) -> DefinitionId {
        self.definitions.push(definition);
        self.definition_base + self.definitions.len() - 1
    }

    /// Apply the staged edits.
    ///
    /// Staged ids are only valid against the tables the edit was created
    /// from, so a scene that has grown or shrunk since is rejected untouched.
    pub fn commit(self, scene: &mut Scene) -> Result<(), ImportError> {
        if scene.materials.len() != self.existing_materials.len()
            || scene.definitions.len() != self.definition_base
        {
            return Err(ImportError::Internal(format!(
                "scene changed during import ({} materials, {} definitions; expected {} and {})",
                scene.materials.len(),
                scene.definitions.len(),
                self.existing_materials.len(),
                self.definition_base
            )));
        }
        scene.materials.extend(self.materials);
        scene.definitions.extend(self.definitions);
        scene.entities.extend(self.entities);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obj8_shared::Text;

    #[test]
    fn test_ids_continue_after_existing_tables() {
        let mut scene = Scene {
            materials: vec![Material::textured("old", "old.png")],
            definitions: vec![Definition {
                name: "old".into(),
                entities: vec![],
            }],
            entities: vec![],
        };
        let mut edit = SceneEdit::new(&scene);
        let reverse = edit.reverse_material();
        let wood = edit.texture_material("wood", Path::new("wood.png"));
        let again = edit.texture_material("wood", Path::new("wood.png"));
        let old = edit.texture_material("old", Path::new("old.png"));
        assert_eq!((reverse, wood, again, old), (1, 2, 2, 0));
        assert_eq!(edit.reverse_material(), 1);

        let name = edit.next_component_name();
        let def = edit.add_definition(Definition {
            name,
            entities: vec![],
        });
        assert_eq!(def, 1);
        edit.entities.push(Entity::Text(Text {
            text: "note".into(),
            position: None,
            hidden: false,
        }));

        edit.commit(&mut scene).expect("Failed to commit");
        assert_eq!(scene.materials.len(), 3);
        assert_eq!(scene.materials[1].name, REVERSE_MATERIAL);
        assert_eq!(scene.definitions[1].name, "Component#1");
        assert_eq!(scene.entities.len(), 1);
    }

    #[test]
    fn test_commit_rejects_a_changed_scene() {
        let mut scene = Scene::default();
        let mut edit = SceneEdit::new(&scene);
        edit.texture_material("wood", Path::new("wood.png"));
        scene.materials.push(Material::textured("other", "other.png"));
        let before = scene.clone();

        let result = edit.commit(&mut scene);
        assert!(matches!(result, Err(ImportError::Internal(_))));
        assert_eq!(scene, before);
    }
}
