//! Binned SAH BVH builder.
//!
//! Subdivides from the root, scoring the 7 planes between 8 centroid bins on
//! each axis with `leftCount * leftArea + rightCount * rightArea`. A node stays
//! a leaf when the best plane is no cheaper than `triCount * area`. Only the
//! triangle permutation is reordered; bounds are never moved.

use super::{Bvh, BvhNode, BvhStats, TriBounds, FIRST_CHILD_SLOT, ROOT};
use crate::util::{Aabb, Error, Result};
use bytemuck::Zeroable;
use std::time::Instant;

/// Number of SAH bins per axis.
pub const NUM_BINS: usize = 8;

/// Candidate split plane.
#[derive(Debug, Clone, Copy)]
struct Split {
    axis: usize,
    position: f32,
    cost: f32,
}

/// SAH bin for evaluating split candidates.
#[derive(Clone, Copy)]
struct Bin {
    bounds: Aabb,
    count: u32,
}

impl Bin {
    const EMPTY: Self = Self {
        bounds: Aabb::EMPTY,
        count: 0,
    };
}

/// Build a BVH over `bounds`, reordering `perm` in place.
///
/// `perm` must be a permutation of `[0, N)` (normally the identity); on
/// return every leaf's triangles are the contiguous run
/// `perm[left_first..left_first + tri_count]`.
#[tracing::instrument(skip_all, fields(tri_count = bounds.len()))]
pub fn build_bvh(bounds: &[TriBounds], perm: &mut [u32]) -> Result<Bvh> {
    let n = bounds.len();
    if n == 0 {
        return Err(Error::EmptyScene);
    }
    if n > (u32::MAX / 2) as usize {
        return Err(Error::TooManyTriangles(n));
    }
    if perm.len() != n {
        return Err(Error::invalid_bvh(format!(
            "permutation has {} entries for {n} triangles",
            perm.len()
        )));
    }

    let start = Instant::now();
    let mut builder = BvhBuilder {
        bounds,
        perm,
        nodes: vec![BvhNode::zeroed(); 2 * n],
        nodes_used: FIRST_CHILD_SLOT,
        max_depth: 0,
    };
    builder.nodes[ROOT] = BvhNode::leaf(0, n as u32);
    builder.update_bounds(ROOT);
    builder.subdivide_from_root();

    let BvhBuilder {
        nodes,
        nodes_used,
        max_depth,
        ..
    } = builder;
    let mut bvh = Bvh {
        pool: nodes,
        nodes_used,
        stats: BvhStats {
            nodes_used,
            max_depth,
            build_time: start.elapsed(),
            ..BvhStats::default()
        },
    };
    let mut stack = vec![ROOT];
    while let Some(idx) = stack.pop() {
        let node = bvh.pool[idx];
        if node.is_leaf() {
            bvh.stats.leaf_count += 1;
            bvh.stats.max_leaf_size = bvh.stats.max_leaf_size.max(node.tri_count);
        } else {
            stack.push(node.left_first as usize);
            stack.push(node.left_first as usize + 1);
        }
    }

    tracing::info!(
        "BVH ({} nodes, {} leaves, depth {}) constructed in {:.3}ms",
        bvh.stats.nodes_used,
        bvh.stats.leaf_count,
        bvh.stats.max_depth,
        bvh.stats.build_time.as_secs_f64() * 1000.0
    );
    Ok(bvh)
}

struct BvhBuilder<'a> {
    bounds: &'a [TriBounds],
    perm: &'a mut [u32],
    nodes: Vec<BvhNode>,
    nodes_used: u32,
    max_depth: u32,
}

impl BvhBuilder<'_> {
    /// Tight box over the node's triangles.
    fn update_bounds(&mut self, node_idx: usize) {
        let node = self.nodes[node_idx];
        let first = node.left_first as usize;
        let mut b = Aabb::EMPTY;
        for &t in &self.perm[first..first + node.tri_count as usize] {
            b.grow(&self.bounds[t as usize].bound);
        }
        self.nodes[node_idx].set_aabb(&b);
    }

    /// Depth-first subdivision with an explicit stack; left children are
    /// finished before their right siblings, as with plain recursion.
    fn subdivide_from_root(&mut self) {
        let mut stack = vec![(ROOT, 0u32)];
        while let Some((node_idx, depth)) = stack.pop() {
            if let Some(left) = self.subdivide(node_idx, depth) {
                stack.push((left + 1, depth + 1));
                stack.push((left, depth + 1));
            }
        }
    }

    /// Try to split one node. Returns the left child index if it was split.
    fn subdivide(&mut self, node_idx: usize, depth: u32) -> Option<usize> {
        let node = self.nodes[node_idx];
        let split = self.find_best_split(&node)?;
        let no_split_cost = node.tri_count as f32 * node.aabb().area();
        if split.cost >= no_split_cost {
            return None;
        }

        let first = node.left_first as usize;
        let count = node.tri_count as usize;
        let bounds = self.bounds;
        let left_count = partition(&mut self.perm[first..first + count], |&t| {
            bounds[t as usize].centroid[split.axis] < split.position
        });
        // The binned estimate does not guarantee the plane separates anything.
        if left_count == 0 || left_count == count {
            return None;
        }

        let left = self.nodes_used as usize;
        self.nodes_used += 2;
        self.nodes[left] = BvhNode::leaf(first as u32, left_count as u32);
        self.nodes[left + 1] = BvhNode::leaf((first + left_count) as u32, (count - left_count) as u32);
        self.nodes[node_idx].left_first = left as u32;
        self.nodes[node_idx].tri_count = 0;
        self.update_bounds(left);
        self.update_bounds(left + 1);

        self.max_depth = self.max_depth.max(depth);
        Some(left)
    }

    /// SAH binned split search across all 3 axes.
    ///
    /// Ties keep the first candidate: lower axis, then lower plane.
    fn find_best_split(&self, node: &BvhNode) -> Option<Split> {
        let first = node.left_first as usize;
        let tris = &self.perm[first..first + node.tri_count as usize];
        let mut best: Option<Split> = None;

        for axis in 0..3 {
            let mut lo = f32::INFINITY;
            let mut hi = f32::NEG_INFINITY;
            for &t in tris {
                let c = self.bounds[t as usize].centroid[axis];
                lo = lo.min(c);
                hi = hi.max(c);
            }
            if lo == hi {
                continue; // degenerate axis
            }

            let mut bins = [Bin::EMPTY; NUM_BINS];
            let scale = NUM_BINS as f32 / (hi - lo);
            for &t in tris {
                let tb = &self.bounds[t as usize];
                let bin_id = (((tb.centroid[axis] - lo) * scale) as usize).min(NUM_BINS - 1);
                bins[bin_id].count += 1;
                bins[bin_id].bounds.grow(&tb.bound);
            }

            // Sweep both ends at once: plane i sits between bin i and bin i + 1.
            let mut left_area = [0.0f32; NUM_BINS - 1];
            let mut right_area = [0.0f32; NUM_BINS - 1];
            let mut left_count = [0u32; NUM_BINS - 1];
            let mut right_count = [0u32; NUM_BINS - 1];
            let mut left_box = Aabb::EMPTY;
            let mut right_box = Aabb::EMPTY;
            let mut left_sum = 0;
            let mut right_sum = 0;
            for i in 0..NUM_BINS - 1 {
                left_sum += bins[i].count;
                left_count[i] = left_sum;
                left_box.grow(&bins[i].bounds);
                left_area[i] = left_box.area();

                let r = NUM_BINS - 1 - i;
                right_sum += bins[r].count;
                right_count[r - 1] = right_sum;
                right_box.grow(&bins[r].bounds);
                right_area[r - 1] = right_box.area();
            }

            let step = (hi - lo) / NUM_BINS as f32;
            for i in 0..NUM_BINS - 1 {
                if left_count[i] == 0 || right_count[i] == 0 {
                    continue;
                }
                let cost = left_count[i] as f32 * left_area[i] + right_count[i] as f32 * right_area[i];
                if cost < best.map_or(f32::INFINITY, |b| b.cost) {
                    best = Some(Split {
                        axis,
                        position: lo + step * (i + 1) as f32,
                        cost,
                    });
                }
            }
        }

        best
    }
}

/// Partition slice in-place. Returns count of elements where predicate is true.
fn partition<T, F>(slice: &mut [T], pred: F) -> usize
where
    F: Fn(&T) -> bool,
{
    let mut left = 0;
    let mut right = slice.len();
    while left < right {
        if pred(&slice[left]) {
            left += 1;
        } else {
            right -= 1;
            slice.swap(left, right);
        }
    }
    left
}
