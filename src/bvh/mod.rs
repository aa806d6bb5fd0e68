//! Tree storage, construction entry points, packet traversal and validation.

mod builder;
pub mod node;
pub mod partition;
mod serialize;

use std::collections::HashSet;

use glam::Mat4;
use rdst::{RadixKey, RadixSort};

use crate::{
    error::BuildError,
    ray::{Ray, RayHit},
    simd::LaneF32,
    stack::{TraversalStack, TRAVERSAL_STACK_SIZE},
    triangle::Triangle,
    BuildConfig, Primitive, TraversalStrategy,
};

use builder::{ObjectBuilder, SpatialBuilder};
pub use node::BvhNode;

/// Spatial builds may duplicate references; the index arrays carry this many
/// slots per input primitive.
const INDEX_OVERALLOCATION: usize = 2;
/// Node pool slots per input primitive for spatial builds. Object-split
/// builds need exactly 2.
const SPATIAL_NODE_OVERALLOCATION: usize = 4;

/// A binary BVH (or SBVH) over a set of primitives.
///
/// `nodes[0]` is the root; slot 1 is never allocated so children always sit
/// in contiguous pairs. Leaves reference ranges of `indices`, which holds
/// primitive ids; with spatial splits the same id can occur in several
/// leaves.
#[derive(Debug)]
pub struct Bvh<P: Primitive> {
    pub primitives: Vec<P>,
    pub nodes: Vec<BvhNode>,
    pub indices: Vec<u32>,
    /// Whether this tree was built with spatial splitting. Leaf boxes then
    /// clip their references instead of containing them.
    pub uses_spatial_splits: bool,
    /// Traversal order selection; [`TraversalStrategy::Ordered`] outside of
    /// tests.
    pub strategy: TraversalStrategy,
}

#[derive(Clone, Copy)]
struct CentroidKey {
    index: u32,
    key: f32,
}

impl RadixKey for CentroidKey {
    const LEVELS: usize = 4;

    #[inline]
    fn get_level(&self, level: usize) -> u8 {
        self.key.get_level(level)
    }
}

fn sort_axis<P: Primitive>(primitives: &[P], axis: usize, capacity: usize) -> Vec<u32> {
    let mut keys: Vec<CentroidKey> = primitives
        .iter()
        .enumerate()
        .map(|(index, primitive)| CentroidKey {
            index: index as u32,
            key: primitive.centroid()[axis],
        })
        .collect();
    keys.radix_sort_unstable();

    let mut indices: Vec<u32> = keys.iter().map(|k| k.index).collect();
    indices.resize(capacity, 0);
    indices
}

/// The three per-axis centroid-sorted index permutations, each overallocated
/// to `capacity` slots.
fn sorted_axis_indices<P: Primitive>(primitives: &[P], capacity: usize) -> [Vec<u32>; 3] {
    #[cfg(feature = "parallel")]
    {
        let (x, (y, z)) = rayon::join(
            || sort_axis(primitives, 0, capacity),
            || {
                rayon::join(
                    || sort_axis(primitives, 1, capacity),
                    || sort_axis(primitives, 2, capacity),
                )
            },
        );
        [x, y, z]
    }
    #[cfg(not(feature = "parallel"))]
    {
        [
            sort_axis(primitives, 0, capacity),
            sort_axis(primitives, 1, capacity),
            sort_axis(primitives, 2, capacity),
        ]
    }
}

impl<P: Primitive> Bvh<P> {
    /// Builds a plain SAH object-split tree. Every primitive ends up in
    /// exactly one leaf.
    pub fn build(primitives: Vec<P>, config: &BuildConfig) -> Result<Self, BuildError> {
        if primitives.is_empty() {
            return Err(BuildError::EmptyInput);
        }
        let n = primitives.len();

        let mut indices = sorted_axis_indices(&primitives, n);
        let mut nodes = bytemuck::zeroed_vec::<BvhNode>(2 * n);
        let node_count;
        {
            let mut builder = ObjectBuilder {
                primitives: &primitives,
                indices: &mut indices,
                nodes: &mut nodes[..],
                node_cursor: 2,
                sah: vec![0.0; n],
                temp: vec![0; n],
                leaf_threshold: config.leaf_threshold.max(2),
            };
            builder.subdivide(0, 0, n);
            node_count = builder.node_cursor;
        }
        nodes.truncate(node_count.max(2));

        let [indices_x, _, _] = indices;
        Ok(Self {
            primitives,
            nodes,
            indices: indices_x,
            uses_spatial_splits: false,
            strategy: config.traversal_strategy,
        })
    }

    /// The bounds of the whole tree.
    #[inline(always)]
    pub fn root_aabb(&self) -> crate::aabb::Aabb {
        self.nodes[0].aabb
    }

    /// Number of leaf references. Equals the primitive count without spatial
    /// splits, and exceeds it by the duplication when spatial splits fired.
    #[inline(always)]
    pub fn leaf_total(&self) -> usize {
        self.indices.len()
    }

    #[inline(always)]
    fn visit_left_first(&self, node: &BvhNode, ray: &Ray) -> bool {
        match self.strategy {
            TraversalStrategy::Ordered => node.visit_left_first(ray),
            _ => true,
        }
    }

    /// Closest-hit query: intersects the packet against the tree, blending
    /// the nearest hit per lane into `hit`. `world` maps the frame the ray
    /// lives in to world space for the recorded hit point and normal.
    pub fn trace(&self, ray: &Ray, hit: &mut RayHit, world: &Mat4) {
        if let TraversalStrategy::BruteForce = self.strategy {
            for primitive in &self.primitives {
                primitive.trace(ray, hit, world);
            }
            return;
        }

        let mut stack = TraversalStack::<TRAVERSAL_STACK_SIZE>::default();
        stack.push(0);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];

            // hit.distance shrinks as hits land, tightening every later test.
            let mask = node.aabb.intersect(ray, hit.distance);
            if mask.all_false() {
                continue;
            }

            if node.is_leaf() {
                let first = node.first_or_left as usize;
                let count = node.prim_count() as usize;
                for &primitive_id in &self.indices[first..first + count] {
                    self.primitives[primitive_id as usize].trace(ray, hit, world);
                }
            } else {
                let left = node.first_or_left;
                if self.visit_left_first(node, ray) {
                    stack.push(left + 1);
                    stack.push(left);
                } else {
                    stack.push(left);
                    stack.push(left + 1);
                }
            }
        }
    }

    /// Any-hit (occlusion) query: the lane mask of rays blocked within
    /// `max_distance`. Early-outs as soon as every lane is occluded.
    pub fn intersect(&self, ray: &Ray, max_distance: LaneF32) -> LaneF32 {
        let mut hit = LaneF32::ZERO;

        if let TraversalStrategy::BruteForce = self.strategy {
            for primitive in &self.primitives {
                hit = hit | primitive.intersect(ray, max_distance);
                if hit.all_true() {
                    return hit;
                }
            }
            return hit;
        }

        let mut stack = TraversalStack::<TRAVERSAL_STACK_SIZE>::default();
        stack.push(0);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];

            let mask = node.aabb.intersect(ray, max_distance);
            if mask.all_false() {
                continue;
            }

            if node.is_leaf() {
                let first = node.first_or_left as usize;
                let count = node.prim_count() as usize;
                for &primitive_id in &self.indices[first..first + count] {
                    hit = hit | self.primitives[primitive_id as usize].intersect(ray, max_distance);
                    if hit.all_true() {
                        return hit;
                    }
                }
            } else {
                let left = node.first_or_left;
                if self.visit_left_first(node, ray) {
                    stack.push(left + 1);
                    stack.push(left);
                } else {
                    stack.push(left);
                    stack.push(left + 1);
                }
            }
        }

        hit
    }

    /// Walks the whole tree asserting its structural invariants, returning
    /// summary statistics. Intended for tests and debugging; panics on any
    /// violation.
    pub fn validate(&self) -> ValidationStats {
        // bounds_of pads thin axes, so children may poke out of their parent
        // by up to the pad.
        const TOLERANCE: f32 = 1e-2;

        let mut stats = ValidationStats::default();
        let mut seen_nodes = HashSet::new();
        let mut reference_counts = vec![0usize; self.primitives.len()];

        // (node, depth) traversal recording every invariant along the way.
        let mut stack = vec![(0u32, 1u32)];
        while let Some((index, depth)) = stack.pop() {
            assert!(
                seen_nodes.insert(index),
                "node {index} reachable through two parents"
            );
            let node = &self.nodes[index as usize];
            stats.node_count += 1;
            stats.max_depth = stats.max_depth.max(depth as usize);

            if node.is_leaf() {
                stats.leaf_count += 1;
                assert_eq!(node.count & node::AXIS_MASK, 0, "leaf {index} has axis bits");
                let first = node.first_or_left as usize;
                let count = node.prim_count() as usize;
                assert!(
                    first + count <= self.indices.len(),
                    "leaf {index} references beyond the index array"
                );
                for &primitive_id in &self.indices[first..first + count] {
                    stats.reference_count += 1;
                    reference_counts[primitive_id as usize] += 1;
                    if !self.uses_spatial_splits {
                        let aabb = self.primitives[primitive_id as usize].aabb();
                        assert!(
                            node.aabb.min.cmple(aabb.min + TOLERANCE).all()
                                && node.aabb.max.cmpge(aabb.max - TOLERANCE).all(),
                            "primitive {primitive_id} not contained in leaf {index}"
                        );
                    }
                }
            } else {
                let axis_bits = node.count >> 30;
                assert!(
                    (1..=3).contains(&axis_bits),
                    "inner node {index} axis bits {axis_bits}"
                );
                let left = node.first_or_left as usize;
                assert!(
                    left + 1 < self.nodes.len(),
                    "inner node {index} children out of range"
                );
                if !self.uses_spatial_splits {
                    for child in [left, left + 1] {
                        let child_aabb = &self.nodes[child].aabb;
                        assert!(
                            node.aabb.min.cmple(child_aabb.min + TOLERANCE).all()
                                && node.aabb.max.cmpge(child_aabb.max - TOLERANCE).all(),
                            "child {child} not contained in parent {index}"
                        );
                    }
                }
                stack.push((left as u32, depth + 1));
                stack.push((left as u32 + 1, depth + 1));
            }
        }

        if self.uses_spatial_splits {
            // Duplication allowed, but every primitive must still be
            // reachable.
            for (primitive_id, &count) in reference_counts.iter().enumerate() {
                assert!(count >= 1, "primitive {primitive_id} lost by the build");
            }
            assert!(stats.reference_count >= self.primitives.len());
        } else {
            // The references are a permutation of the input.
            for (primitive_id, &count) in reference_counts.iter().enumerate() {
                assert_eq!(count, 1, "primitive {primitive_id} referenced {count} times");
            }
            assert_eq!(stats.reference_count, self.primitives.len());
        }
        assert_eq!(stats.reference_count, self.indices.len());
        // Children are allocated in pairs from slot 2 up; every slot except
        // the root's reserved sibling is reachable.
        assert_eq!(stats.node_count, self.nodes.len() - 1);
        assert!(
            stats.max_depth < TRAVERSAL_STACK_SIZE,
            "tree depth {} would overflow the traversal stack",
            stats.max_depth
        );

        if stats.max_depth + 1 >= TRAVERSAL_STACK_SIZE {
            log::warn!(
                "bvh depth {} is close to the traversal stack capacity {}",
                stats.max_depth,
                TRAVERSAL_STACK_SIZE
            );
        }

        stats
    }
}

impl Bvh<Triangle> {
    /// Builds a spatial-split tree (SBVH). Straddling triangles may be
    /// referenced from both sides of a split plane unless unsplitting them
    /// onto one side is cheaper, so `leaf_total() >= primitives.len()`.
    pub fn build_spatial(
        primitives: Vec<Triangle>,
        config: &BuildConfig,
    ) -> Result<Self, BuildError> {
        assert!(
            config.spatial_bin_count >= 4,
            "spatial_bin_count must be at least 4"
        );
        if primitives.is_empty() {
            return Err(BuildError::EmptyInput);
        }
        let n = primitives.len();

        #[cfg(debug_assertions)]
        {
            let degenerate = primitives.iter().filter(|t| t.is_degenerate()).count();
            if degenerate > 0 {
                log::warn!("building over {degenerate} degenerate triangles");
            }
        }

        let mut indices = sorted_axis_indices(&primitives, INDEX_OVERALLOCATION * n);
        let mut nodes = bytemuck::zeroed_vec::<BvhNode>(SPATIAL_NODE_OVERALLOCATION * n);
        let root_aabb = partition::bounds_of(&primitives, &indices[0], 0, n);

        let node_count;
        let leaf_total;
        {
            let mut builder = SpatialBuilder {
                triangles: &primitives,
                indices: &mut indices,
                nodes: &mut nodes[..],
                node_cursor: 2,
                // Duplication can push a node's range past the input size, so
                // the sweep scratch covers the whole overallocated span.
                sah: vec![0.0; INDEX_OVERALLOCATION * n],
                going_left: vec![false; n],
                going_right: vec![false; n],
                inv_root_area: 1.0 / root_aabb.surface_area(),
                alpha: config.spatial_split_alpha,
                bin_count: config.spatial_bin_count,
                leaf_threshold: config.leaf_threshold.max(2),
            };
            leaf_total = builder.subdivide(0, 0, n, root_aabb)?;
            node_count = builder.node_cursor;
        }
        nodes.truncate(node_count.max(2));

        let [mut indices_x, _, _] = indices;
        indices_x.truncate(leaf_total);

        log::debug!(
            "spatial build placed {leaf_total} references over {n} triangles ({} duplicated)",
            leaf_total.saturating_sub(n)
        );

        Ok(Self {
            primitives,
            nodes,
            indices: indices_x,
            uses_spatial_splits: true,
            strategy: config.traversal_strategy,
        })
    }
}

/// Counters gathered by [`Bvh::validate`].
#[derive(Default, Debug, Clone, Copy)]
pub struct ValidationStats {
    pub node_count: usize,
    pub leaf_count: usize,
    pub reference_count: usize,
    pub max_depth: usize,
}
