//! Output primitives, their sort order and the global index table

use glam::DVec3;
use obj8_common::Attrs;
use std::cmp::Ordering;

use crate::anim::{AnimArena, AnimId};

/// Index of a triangle index run in [`IndexRuns`]
pub type RunId = usize;

/// One state-homogeneous unit of output
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    /// Triangles sharing render state. Copies replayed from a cached
    /// definition share their run.
    Tris {
        attrs: Attrs,
        anim: Option<AnimId>,
        run: RunId,
    },
    /// A light command at an already-transformed host-space position
    Light {
        anim: Option<AnimId>,
        text: String,
        position: DVec3,
    },
}

impl Primitive {
    pub fn anim(&self) -> Option<AnimId> {
        match self {
            Primitive::Tris { anim, .. } | Primitive::Light { anim, .. } => *anim,
        }
    }

    /// Lights do not change render state
    pub fn attrs(&self) -> Attrs {
        match self {
            Primitive::Tris { attrs, .. } => *attrs,
            Primitive::Light { .. } => Attrs::DEFAULT,
        }
    }

    /// Same primitive under a different animation context
    pub fn with_anim(&self, anim: Option<AnimId>) -> Self {
        let mut prim = self.clone();
        match &mut prim {
            Primitive::Tris { anim: a, .. } | Primitive::Light { anim: a, .. } => *a = anim,
        }
        prim
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Primitive::Light { .. } => 0,
            Primitive::Tris { .. } => 1,
        }
    }
}

/// Triangle index runs, one per [`Primitive::Tris`] created during the walk
#[derive(Debug, Default)]
pub struct IndexRuns {
    runs: Vec<Vec<u32>>,
}

impl IndexRuns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, indices: Vec<u32>) -> RunId {
        self.runs.push(indices);
        self.runs.len() - 1
    }

    pub fn get(&self, run: RunId) -> &[u32] {
        &self.runs[run]
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

// ============================================================================
// Sorting
// ============================================================================

/// Render-state order.
///
/// 1. ground-level bits (poly-offset, draped, alpha, shiny), ground first
/// 2. animation: unanimated first, ancestors before descendants, otherwise
///    discovery order
/// 3. collision bits (hard, deck)
/// 4. lights before triangles
pub fn compare(a: &Primitive, b: &Primitive, arena: &AnimArena) -> Ordering {
    (a.attrs() & Attrs::GROUND_MASK)
        .cmp(&(b.attrs() & Attrs::GROUND_MASK))
        .then_with(|| compare_anim(a.anim(), b.anim(), arena))
        .then_with(|| (a.attrs() & Attrs::HARDNESS_MASK).cmp(&(b.attrs() & Attrs::HARDNESS_MASK)))
        .then_with(|| a.kind_rank().cmp(&b.kind_rank()))
}

fn compare_anim(a: Option<AnimId>, b: Option<AnimId>, arena: &AnimArena) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) if a == b => Ordering::Equal,
        (Some(a), Some(b)) if arena.is_ancestor(a, b) => Ordering::Less,
        (Some(a), Some(b)) if arena.is_ancestor(b, a) => Ordering::Greater,
        (Some(a), Some(b)) => a.cmp(&b),
    }
}

/// Stable sort into write order
pub fn sort_primitives(prims: &mut [Primitive], arena: &AnimArena) {
    prims.sort_by(|a, b| compare(a, b, arena));
}

// ============================================================================
// Global index table
// ============================================================================

/// Flattened index table plus where each run starts in it
#[derive(Debug, Default)]
pub struct GlobalIndex {
    pub indices: Vec<u32>,
    pub bases: Vec<Option<usize>>,
}

impl GlobalIndex {
    pub fn base(&self, run: RunId) -> usize {
        self.bases.get(run).copied().flatten().unwrap_or(0)
    }
}

/// Concatenate runs in primitive order. A run's base is fixed the first time
/// it is reached; later primitives sharing the run reuse it.
pub fn linearize(prims: &[Primitive], runs: &IndexRuns) -> GlobalIndex {
    let mut global = GlobalIndex {
        indices: Vec::new(),
        bases: vec![None; runs.len()],
    };
    for prim in prims {
        if let Primitive::Tris { run, .. } = prim {
            if global.bases[*run].is_none() {
                global.bases[*run] = Some(global.indices.len());
                global.indices.extend_from_slice(runs.get(*run));
            }
        }
    }
    global
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::AnimationNode;

    fn node(parent: Option<AnimId>) -> AnimationNode {
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

    fn tris(attrs: Attrs, anim: Option<AnimId>, run: RunId) -> Primitive {
        Primitive::Tris { attrs, anim, run }
    }

    #[test]
    fn test_poly_offset_sorts_first_regardless_of_input_order() {
        let arena = AnimArena::new();
        let poly = tris(Attrs::NOT_DRAPED, None, 0);
        let plain = tris(Attrs::DEFAULT, None, 1);

        let mut a = vec![plain.clone(), poly.clone()];
        let mut b = vec![poly.clone(), plain.clone()];
        sort_primitives(&mut a, &arena);
        sort_primitives(&mut b, &arena);
        assert_eq!(a, vec![poly.clone(), plain.clone()]);
        assert_eq!(a, b);

        // Sorting a sorted list changes nothing
        let before = a.clone();
        sort_primitives(&mut a, &arena);
        assert_eq!(a, before);
    }

    #[test]
    fn test_ancestor_before_descendant() {
        let mut arena = AnimArena::new();
        let root = arena.push(node(None));
        let child = arena.push(node(Some(root)));
        let other = arena.push(node(None));

        let mut prims = vec![
            tris(Attrs::DEFAULT, Some(child), 0),
            tris(Attrs::DEFAULT, Some(other), 1),
            tris(Attrs::DEFAULT, None, 2),
            tris(Attrs::DEFAULT, Some(root), 3),
        ];
        sort_primitives(&mut prims, &arena);
        let anims: Vec<_> = prims.iter().map(Primitive::anim).collect();
        assert_eq!(anims, vec![None, Some(root), Some(child), Some(other)]);
    }

    #[test]
    fn test_hardness_then_kind() {
        let arena = AnimArena::new();
        let hard = tris(Attrs::DEFAULT | Attrs::HARD, None, 0);
        let soft = tris(Attrs::DEFAULT, None, 1);
        let light = Primitive::Light {
            anim: None,
            text: "LIGHT_NAMED beacon".into(),
            position: DVec3::ZERO,
        };
        let mut prims = vec![hard.clone(), soft.clone(), light.clone()];
        sort_primitives(&mut prims, &arena);
        assert_eq!(prims, vec![light, soft, hard]);
    }

    #[test]
    fn test_shared_run_keeps_first_base() {
        let mut runs = IndexRuns::new();
        let a = runs.push(vec![0, 1, 2]);
        let b = runs.push(vec![3, 4, 5, 5, 4, 6]);
        let prims = vec![
            tris(Attrs::DEFAULT, None, b),
            tris(Attrs::DEFAULT, None, a),
            tris(Attrs::DEFAULT, None, b),
        ];
        let global = linearize(&prims, &runs);
        assert_eq!(global.indices, vec![3, 4, 5, 5, 4, 6, 0, 1, 2]);
        assert_eq!(global.base(b), 0);
        assert_eq!(global.base(a), 6);
    }
}
