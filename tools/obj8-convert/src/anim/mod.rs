//! Animation contexts
//!
//! An [`AnimationNode`] is one `ANIM_begin` ... `ANIM_end` block: an
//! optional translation path, up to three single-axis rotation paths and any
//! number of hide/show rules. Nodes live in an [`AnimArena`] owned by one
//! export pass; primitives refer to them by [`AnimId`].
//!
//! - [`euler`] - Z·Y·X Euler decomposition with gimbal-lock handling
//! - [`decompose`] - keyframe matrices -> [`AnimationNode`] + rest transform
//! - [`reconstruct`] - parsed keyframe maps -> per-frame matrices

pub mod decompose;
pub mod euler;
pub mod reconstruct;

pub use decompose::{decompose, Decomposed, NotAnimated};
pub use reconstruct::{KeyframeMaps, RotationAxis};

use glam::DVec3;
use obj8_shared::{DefinitionId, HideShow};

/// Index of a node in its [`AnimArena`]. Ids are handed out in discovery
/// order, which is also the order siblings are written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnimId(pub u32);

/// One animated frame of the hierarchy
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationNode {
    pub parent: Option<AnimId>,
    /// Definition the animated instance places
    pub cache_key: DefinitionId,
    pub dataref: Option<String>,
    /// Dataref value at each keyframe, kept as written
    pub keyframe_values: Vec<String>,
    pub loop_value: Option<String>,
    /// Host-space translations: none, one (fixed pivot) or one per keyframe
    pub translations: Vec<DVec3>,
    /// Degrees: none, one (static) or one per keyframe
    pub rotation_x: Vec<f64>,
    pub rotation_y: Vec<f64>,
    pub rotation_z: Vec<f64>,
    pub hide_show: Vec<HideShow>,
    /// Comment written after `ANIM_begin`
    pub label: String,
}

impl AnimationNode {
    /// Rotation paths in the order they are applied: Z, then Y, then X
    pub fn rotation_paths(&self) -> [(DVec3, &[f64]); 3] {
        [
            (DVec3::Z, self.rotation_z.as_slice()),
            (DVec3::Y, self.rotation_y.as_slice()),
            (DVec3::X, self.rotation_x.as_slice()),
        ]
    }

    /// Nothing to animate
    pub fn is_degenerate(&self) -> bool {
        self.translations.len() <= 1
            && self.rotation_x.is_empty()
            && self.rotation_y.is_empty()
            && self.rotation_z.is_empty()
            && self.hide_show.is_empty()
    }
}

/// Owns every node created during one export pass
#[derive(Debug, Default)]
pub struct AnimArena {
    nodes: Vec<AnimationNode>,
}

impl AnimArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: AnimationNode) -> AnimId {
        let id = AnimId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: AnimId) -> &AnimationNode {
        &self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, id: AnimId) -> Option<AnimId> {
        self.get(id).parent
    }

    /// Number of open blocks while writing this node's contents
    pub fn depth(&self, id: Option<AnimId>) -> usize {
        self.chain(id).len()
    }

    /// Path from the outermost ancestor down to `id` inclusive
    pub fn chain(&self, id: Option<AnimId>) -> Vec<AnimId> {
        let mut chain = Vec::new();
        let mut cur = id;
        while let Some(node) = cur {
            chain.push(node);
            cur = self.parent(node);
        }
        chain.reverse();
        chain
    }

    /// True if `ancestor` is a strict ancestor of `node`
    pub fn is_ancestor(&self, ancestor: AnimId, node: AnimId) -> bool {
        let mut cur = self.parent(node);
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.parent(p);
        }
        false
    }

    /// Copy `id` under a new parent, returning the copy's id
    pub fn reparent_clone(&mut self, id: AnimId, parent: Option<AnimId>) -> AnimId {
        let mut node = self.get(id).clone();
        node.parent = parent;
        self.push(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn node(parent: Option<AnimId>) -> AnimationNode {
        AnimationNode {
            parent,
            cache_key: 0,
            dataref: None,
            keyframe_values: vec![],
            loop_value: None,
            translations: vec![],
            rotation_x: vec![],
            rotation_y: vec![],
            rotation_z: vec![],
            hide_show: vec![],
            label: String::new(),
        }
    }

    #[test]
    fn test_chain_and_ancestry() {
        let mut arena = AnimArena::new();
        let a = arena.push(node(None));
        let b = arena.push(node(Some(a)));
        let c = arena.push(node(Some(b)));
        let d = arena.push(node(None));

        assert_eq!(arena.chain(Some(c)), vec![a, b, c]);
        assert_eq!(arena.depth(None), 0);
        assert_eq!(arena.depth(Some(b)), 2);
        assert!(arena.is_ancestor(a, c));
        assert!(!arena.is_ancestor(c, a));
        assert!(!arena.is_ancestor(d, c));
        assert!(!arena.is_ancestor(a, a));
    }

    #[test]
    fn test_degenerate_node() {
        let mut n = node(None);
        n.translations = vec![DVec3::ZERO];
        assert!(n.is_degenerate());
        n.rotation_z = vec![0.0, 90.0];
        assert!(!n.is_degenerate());
    }
}
