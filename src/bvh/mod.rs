//! Bounding-volume hierarchy over the scene's triangles.
//!
//! Flat array layout for GPU traversal:
//! - 32-byte nodes in a preallocated pool of `2 * N` slots
//! - node 0 is the root; slot 1 is never used, so children always come in
//!   adjacent pairs starting at index 2
//! - leaves reference a contiguous range of the triangle permutation
//!
//! ## Architecture
//! ```text
//! TriBounds[] + identity permutation -> binned SAH build -> node pool + reordered permutation
//! ```

mod build;

pub use build::{build_bvh, NUM_BINS};

use crate::util::{Aabb, Error, Result, Vec3};
use bytemuck::{Pod, Zeroable};
use std::time::Duration;

/// Index of the root node.
pub const ROOT: usize = 0;

/// First slot handed out for children.
pub const FIRST_CHILD_SLOT: u32 = 2;

/// Build-time bounding data of one triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriBounds {
    /// Mean of the three corners.
    pub centroid: Vec3,
    pub bound: Aabb,
}

impl TriBounds {
    pub fn from_corners(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self {
            centroid: (v0 + v1 + v2) / 3.0,
            bound: Aabb::from_points([v0, v1, v2]),
        }
    }
}

/// GPU BVH node (32 bytes, matches the tracing kernel's struct).
///
/// `tri_count` is the tag:
/// - Internal node: `tri_count == 0`, `left_first` = left child (right child is `left_first + 1`)
/// - Leaf node: `tri_count > 0`, `left_first` = first entry in the triangle order
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BvhNode {
    pub aabb_min: [f32; 3],
    pub left_first: u32,
    pub aabb_max: [f32; 3],
    pub tri_count: u32,
}

/// Decoded view of a [`BvhNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BvhNodeKind {
    Leaf { first: u32, count: u32 },
    Internal { left: u32 },
}

impl BvhNode {
    /// Leaf covering `count` entries starting at `first`; bounds unset.
    pub fn leaf(first: u32, count: u32) -> Self {
        Self {
            left_first: first,
            tri_count: count,
            ..Self::zeroed()
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.tri_count > 0
    }

    #[inline]
    pub fn kind(&self) -> BvhNodeKind {
        if self.is_leaf() {
            BvhNodeKind::Leaf {
                first: self.left_first,
                count: self.tri_count,
            }
        } else {
            BvhNodeKind::Internal {
                left: self.left_first,
            }
        }
    }

    #[inline]
    pub fn aabb(&self) -> Aabb {
        Aabb::new(Vec3::from(self.aabb_min), Vec3::from(self.aabb_max))
    }

    #[inline]
    pub fn set_aabb(&mut self, b: &Aabb) {
        self.aabb_min = b.min.to_array();
        self.aabb_max = b.max.to_array();
    }
}

/// Build diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BvhStats {
    pub nodes_used: u32,
    pub leaf_count: u32,
    /// Deepest level at which a node was split (root = 0).
    pub max_depth: u32,
    pub max_leaf_size: u32,
    pub build_time: Duration,
}

/// Built hierarchy: the node pool and how much of it is in use.
#[derive(Debug, Clone)]
pub struct Bvh {
    pool: Vec<BvhNode>,
    nodes_used: u32,
    stats: BvhStats,
}

impl Bvh {
    /// Nodes handed out so far (`[0, nodes_used)`); slot 1 is a zeroed gap.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.pool[..self.nodes_used as usize]
    }

    /// Full preallocated pool (`2 * N` slots).
    pub fn pool(&self) -> &[BvhNode] {
        &self.pool
    }

    pub fn nodes_used(&self) -> u32 {
        self.nodes_used
    }

    pub fn root(&self) -> &BvhNode {
        &self.pool[ROOT]
    }

    pub fn stats(&self) -> &BvhStats {
        &self.stats
    }

    /// Give up the node pool, trimmed to the used prefix.
    pub fn into_nodes(mut self) -> Vec<BvhNode> {
        self.pool.truncate(self.nodes_used as usize);
        self.pool
    }

    /// Check the structural invariants against the data the tree was built from.
    ///
    /// - `nodes_used <= 2N`
    /// - `perm` is a bijection on `[0, N)`
    /// - every child box lies inside its parent's box
    /// - every leaf box contains its triangles' boxes
    /// - leaves cover `[0, N)` exactly once
    pub fn validate(&self, bounds: &[TriBounds], perm: &[u32]) -> Result<()> {
        let n = bounds.len();
        if perm.len() != n {
            return Err(Error::invalid_bvh(format!(
                "permutation has {} entries for {n} triangles",
                perm.len()
            )));
        }
        let mut seen = vec![false; n];
        for &t in perm {
            match seen.get_mut(t as usize) {
                Some(s) if !*s => *s = true,
                _ => {
                    return Err(Error::invalid_bvh(format!(
                        "triangle {t} missing from or repeated in permutation"
                    )))
                }
            }
        }

        validate_nodes(self.nodes(), self.pool.len(), n, |first, count, leaf_box| {
            for &t in &perm[first..first + count] {
                if !leaf_box.contains(&bounds[t as usize].bound) {
                    return Err(Error::invalid_bvh(format!(
                        "triangle {t} escapes its leaf box"
                    )));
                }
            }
            Ok(())
        })
    }
}

/// Walk the tree from the root and check node-level invariants; `check_leaf`
/// gets each leaf's `(first, count, box)` for triangle-level checks.
pub(crate) fn validate_nodes<F>(
    nodes: &[BvhNode],
    pool_capacity: usize,
    tri_count: usize,
    mut check_leaf: F,
) -> Result<()>
where
    F: FnMut(usize, usize, &Aabb) -> Result<()>,
{
    if nodes.len() > pool_capacity || pool_capacity > 2 * tri_count.max(1) {
        return Err(Error::invalid_bvh(format!(
            "{} nodes used from a pool of {pool_capacity} for {tri_count} triangles",
            nodes.len()
        )));
    }
    if nodes.is_empty() {
        return Err(Error::invalid_bvh("no root node"));
    }

    let mut covered = vec![false; tri_count];
    let mut visited = vec![false; nodes.len()];
    let mut stack = vec![ROOT];
    while let Some(idx) = stack.pop() {
        if std::mem::replace(&mut visited[idx], true) {
            return Err(Error::invalid_bvh(format!("node {idx} reached twice")));
        }
        let node = &nodes[idx];
        let node_box = node.aabb();
        match node.kind() {
            BvhNodeKind::Internal { left } => {
                let left = left as usize;
                if left < FIRST_CHILD_SLOT as usize || left + 1 >= nodes.len() {
                    return Err(Error::invalid_bvh(format!(
                        "node {idx} links to unallocated child {left}"
                    )));
                }
                for child in [left, left + 1] {
                    if !node_box.contains(&nodes[child].aabb()) {
                        return Err(Error::invalid_bvh(format!(
                            "child {child} escapes parent {idx}"
                        )));
                    }
                    stack.push(child);
                }
            }
            BvhNodeKind::Leaf { first, count } => {
                let (first, count) = (first as usize, count as usize);
                if first + count > tri_count {
                    return Err(Error::invalid_bvh(format!(
                        "leaf {idx} range {first}..{} exceeds {tri_count} triangles",
                        first + count
                    )));
                }
                for c in &mut covered[first..first + count] {
                    if std::mem::replace(c, true) {
                        return Err(Error::invalid_bvh(format!(
                            "leaf {idx} overlaps another leaf"
                        )));
                    }
                }
                check_leaf(first, count, &node_box)?;
            }
        }
    }

    if let Some(missing) = covered.iter().position(|c| !c) {
        return Err(Error::invalid_bvh(format!(
            "triangle slot {missing} is not in any leaf"
        )));
    }
    Ok(())
}
