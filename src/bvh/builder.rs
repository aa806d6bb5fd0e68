//! Recursive subdivision: plain SAH object splits, and the spatial-split
//! variant that may duplicate references across leaves.

use crate::{aabb::Aabb, error::BuildError, triangle::Triangle, Primitive};

use super::{
    node::BvhNode,
    partition::{self, bin_range, ObjectSplit, SpatialSplit},
};

/// Object-split subdivision state shared down the recursion.
pub(crate) struct ObjectBuilder<'a, P: Primitive> {
    pub primitives: &'a [P],
    pub indices: &'a mut [Vec<u32>; 3],
    pub nodes: &'a mut [BvhNode],
    /// Next free node slot; children are allocated in pairs.
    pub node_cursor: usize,
    pub sah: Vec<f32>,
    pub temp: Vec<u32>,
    pub leaf_threshold: usize,
}

impl<P: Primitive> ObjectBuilder<'_, P> {
    /// Builds the subtree rooted at `node_index` over
    /// `indices[..][first..first + count]`.
    pub fn subdivide(&mut self, node_index: usize, first: usize, count: usize) {
        let aabb = partition::bounds_of(self.primitives, &self.indices[0], first, first + count);
        self.nodes[node_index].aabb = aabb;

        if count < self.leaf_threshold {
            self.nodes[node_index].make_leaf(first as u32, count as u32);
            return;
        }

        let split = partition::partition_object(
            self.primitives,
            self.indices,
            first,
            count,
            &mut self.sah,
        );

        // The split has to beat leaving this range as one leaf.
        let parent_cost = aabb.surface_area() * count as f32;
        if split.cost >= parent_cost {
            self.nodes[node_index].make_leaf(first as u32, count as u32);
            return;
        }

        let split_pos = self.primitives[self.indices[split.axis][split.index] as usize].centroid()
            [split.axis];
        partition::split_indices(
            self.primitives,
            self.indices,
            first,
            count,
            &mut self.temp,
            split.axis,
            split.index,
            split_pos,
        );

        let left_child = self.node_cursor;
        self.node_cursor += 2;
        debug_assert!(self.node_cursor <= self.nodes.len());
        self.nodes[node_index].make_inner(left_child as u32, split.axis);

        let n_left = split.index - first;
        self.subdivide(left_child, first, n_left);
        self.subdivide(left_child + 1, split.index, count - n_left);
    }
}

/// Spatial-split subdivision state. References may be duplicated, so the
/// index arrays are overallocated and subtrees report how many references
/// they placed.
pub(crate) struct SpatialBuilder<'a> {
    pub triangles: &'a [Triangle],
    pub indices: &'a mut [Vec<u32>; 3],
    pub nodes: &'a mut [BvhNode],
    pub node_cursor: usize,
    pub sah: Vec<f32>,
    /// Per-triangle side lookup tables, indexed by triangle id.
    pub going_left: Vec<bool>,
    pub going_right: Vec<bool>,
    pub inv_root_area: f32,
    pub alpha: f32,
    pub bin_count: usize,
    pub leaf_threshold: usize,
}

impl SpatialBuilder<'_> {
    /// Builds the subtree rooted at `node_index` over
    /// `indices[..][first..first + count]`, whose references are bounded by
    /// `node_aabb` (the clipped box assigned by the parent's split).
    ///
    /// Returns the number of references the subtree placed starting at
    /// `first`, so the caller can put the right child's references directly
    /// after them.
    pub fn subdivide(
        &mut self,
        node_index: usize,
        first: usize,
        count: usize,
        node_aabb: Aabb,
    ) -> Result<usize, BuildError> {
        self.nodes[node_index].aabb = node_aabb;

        if count < self.leaf_threshold {
            self.nodes[node_index].make_leaf(first as u32, count as u32);
            return Ok(count);
        }

        let object = partition::partition_object(
            self.triangles,
            self.indices,
            first,
            count,
            &mut self.sah,
        );

        // Only consider a spatial split when the object split's children
        // overlap a significant fraction of the root.
        let lambda = Aabb::overlap_surface_area(&object.aabb_left, &object.aabb_right);
        // The axis pad can push child areas marginally past the root's, so
        // only the lower bound is exact.
        let ratio = lambda * self.inv_root_area;
        debug_assert!(ratio >= 0.0);

        let spatial = if ratio > self.alpha {
            partition::partition_spatial(
                self.triangles,
                self.indices,
                first,
                count,
                &node_aabb,
                self.bin_count,
            )
        } else {
            None
        };
        let spatial_cost = spatial.as_ref().map_or(f32::INFINITY, |s| s.cost);

        let parent_cost = node_aabb.surface_area() * count as f32;
        if parent_cost <= object.cost && parent_cost <= spatial_cost {
            self.nodes[node_index].make_leaf(first as u32, count as u32);
            return Ok(count);
        }

        if self.node_cursor + 2 > self.nodes.len() {
            return Err(BuildError::PoolExhausted {
                needed: self.node_cursor + 2,
                capacity: self.nodes.len(),
            });
        }
        let left_child = self.node_cursor;
        self.node_cursor += 2;

        let (axis, n_left, n_right, aabb_left, aabb_right, children_right) =
            if object.cost <= spatial_cost {
                self.partition_object_refs(first, count, &object)
            } else {
                self.partition_spatial_refs(first, count, &node_aabb, spatial.unwrap())
            };

        self.nodes[node_index].make_inner(left_child as u32, axis);

        let offset_left = self.subdivide(left_child, first, n_left, aabb_left)?;

        // The right child's references land directly after everything the
        // left subtree placed, keeping subtree references contiguous even
        // under duplication.
        let right_start = first + offset_left;
        if right_start + n_right > self.indices[0].len() {
            return Err(BuildError::PoolExhausted {
                needed: right_start + n_right,
                capacity: self.indices[0].len(),
            });
        }
        for dimension in 0..3 {
            self.indices[dimension][right_start..right_start + n_right]
                .copy_from_slice(&children_right[dimension]);
        }

        let offset_right = self.subdivide(left_child + 1, right_start, n_right, aabb_right)?;

        Ok(offset_left + offset_right)
    }

    /// Object split inside the spatial build: partitions all three axis
    /// arrays by the split coordinate, left halves in place, right halves
    /// into fresh buffers the caller copies back after the left recursion.
    #[allow(clippy::type_complexity)]
    fn partition_object_refs(
        &mut self,
        first: usize,
        count: usize,
        split: &ObjectSplit,
    ) -> (usize, usize, usize, Aabb, Aabb, [Vec<u32>; 3]) {
        let split_pos = self.triangles[self.indices[split.axis][split.index] as usize].centroid()
            [split.axis];

        let mut children_right = [
            Vec::with_capacity(count),
            Vec::with_capacity(count),
            Vec::with_capacity(count),
        ];
        let mut left_counts = [0usize; 3];

        for dimension in 0..3 {
            let mut left_count = 0;
            for i in first..first + count {
                let index = self.indices[dimension][i];
                let coord = self.triangles[index as usize].centroid()[split.axis];
                let mut goes_left = coord < split_pos;

                if coord == split_pos {
                    // Same coordinate as the pivot: resolve by identity
                    // against the equal-coordinate run left of the split.
                    let mut j = split.index as isize - 1;
                    while j >= first as isize {
                        let candidate = self.indices[split.axis][j as usize];
                        if self.triangles[candidate as usize].centroid()[split.axis] != split_pos {
                            break;
                        }
                        if candidate == index {
                            goes_left = true;
                            break;
                        }
                        j -= 1;
                    }
                }

                if goes_left {
                    self.indices[dimension][first + left_count] = index;
                    left_count += 1;
                } else {
                    children_right[dimension].push(index);
                }
            }
            left_counts[dimension] = left_count;
        }

        // The same side decision must have been made on every axis.
        debug_assert_eq!(left_counts[0], left_counts[1]);
        debug_assert_eq!(left_counts[1], left_counts[2]);
        debug_assert_eq!(children_right[0].len(), children_right[1].len());
        debug_assert_eq!(children_right[1].len(), children_right[2].len());

        let n_left = left_counts[0];
        let n_right = children_right[0].len();

        // Object splits never duplicate.
        debug_assert_eq!(first + n_left, split.index);
        debug_assert_eq!(n_left + n_right, count);

        (
            split.axis,
            n_left,
            n_right,
            split.aabb_left,
            split.aabb_right,
            children_right,
        )
    }

    /// Spatial split: classifies every reference against the split plane's
    /// bin, unsplits straddlers when keeping them on one side is cheaper,
    /// and rebuilds all three axis arrays from the side lookup tables.
    #[allow(clippy::type_complexity)]
    fn partition_spatial_refs(
        &mut self,
        first: usize,
        count: usize,
        node_aabb: &Aabb,
        split: SpatialSplit,
    ) -> (usize, usize, usize, Aabb, Aabb, [Vec<u32>; 3]) {
        let axis = split.axis;
        let bounds_min = node_aabb.min[axis];
        let inv_extent = 1.0 / (node_aabb.max[axis] - bounds_min);

        // The child boxes grow as straddlers are unsplit onto one side.
        let mut aabb_left = split.aabb_left;
        let mut aabb_right = split.aabb_right;
        let mut n_1 = split.count_left as f32;
        let mut n_2 = split.count_right as f32;

        let mut rejected_left = 0usize;
        let mut rejected_right = 0usize;
        let mut dropped = 0usize;

        for i in first..first + count {
            let index = self.indices[axis][i];
            let triangle = &self.triangles[index as usize];
            let (bin_min, bin_max) =
                bin_range(&triangle.aabb, axis, bounds_min, inv_extent, self.bin_count);

            let mut goes_left = false;
            let mut goes_right = false;

            if bin_max < split.bin {
                goes_left = true;
            } else if bin_min >= split.bin {
                goes_right = true;
            } else {
                // Straddler. Clipping can leave a reference on one side of
                // the plane without overlapping that child's box at all.
                let valid_left = triangle.aabb.overlap(&aabb_left).is_valid();
                let valid_right = triangle.aabb.overlap(&aabb_right).is_valid();

                if valid_left && valid_right {
                    goes_left = true;
                    goes_right = true;

                    let mut delta_left = aabb_left;
                    delta_left.grow_aabb(&triangle.aabb);
                    let mut delta_right = aabb_right;
                    delta_right.grow_aabb(&triangle.aabb);

                    let area_left = aabb_left.surface_area();
                    let area_right = aabb_right.surface_area();

                    // Cost of duplicating vs. keeping the whole reference on
                    // one side only.
                    let c_split = area_left * n_1 + area_right * n_2;
                    let c_1 = delta_left.surface_area() * n_1 + area_right * (n_2 - 1.0);
                    let c_2 = area_left * (n_1 - 1.0) + delta_right.surface_area() * n_2;

                    if c_1 < c_split {
                        if c_2 < c_1 {
                            goes_left = false;
                            rejected_left += 1;
                            n_1 -= 1.0;
                            aabb_right.grow_aabb(&triangle.aabb);
                        } else {
                            goes_right = false;
                            rejected_right += 1;
                            n_2 -= 1.0;
                            aabb_left.grow_aabb(&triangle.aabb);
                        }
                    } else if c_2 < c_split {
                        goes_left = false;
                        rejected_left += 1;
                        n_1 -= 1.0;
                        aabb_right.grow_aabb(&triangle.aabb);
                    }
                } else if valid_left {
                    goes_left = true;
                    rejected_right += 1;
                } else if valid_right {
                    goes_right = true;
                    rejected_left += 1;
                } else {
                    rejected_left += 1;
                    rejected_right += 1;
                    dropped += 1;
                }
            }

            self.going_left[index as usize] = goes_left;
            self.going_right[index as usize] = goes_right;
        }

        if dropped > 0 {
            log::warn!("spatial split dropped {dropped} references overlapping neither child");
        }

        // Rebuild each axis array from the lookup tables in one stable pass,
        // left halves in place, right halves into fresh buffers.
        let mut children_right = [
            Vec::with_capacity(count),
            Vec::with_capacity(count),
            Vec::with_capacity(count),
        ];
        let mut left_counts = [0usize; 3];

        for dimension in 0..3 {
            let mut left_count = 0;
            for i in first..first + count {
                let index = self.indices[dimension][i];
                if self.going_left[index as usize] {
                    self.indices[dimension][first + left_count] = index;
                    left_count += 1;
                }
                if self.going_right[index as usize] {
                    children_right[dimension].push(index);
                }
            }
            left_counts[dimension] = left_count;
        }

        debug_assert_eq!(left_counts[0], left_counts[1]);
        debug_assert_eq!(left_counts[1], left_counts[2]);
        debug_assert_eq!(children_right[0].len(), children_right[1].len());
        debug_assert_eq!(children_right[1].len(), children_right[2].len());

        let n_left = left_counts[0];
        let n_right = children_right[0].len();

        // Every rejection must be accounted for and both sides must end up
        // populated.
        debug_assert_eq!(n_left, split.count_left - rejected_left);
        debug_assert_eq!(n_right, split.count_right - rejected_right);
        debug_assert!(n_left > 0);
        debug_assert!(n_right > 0);
        debug_assert!(n_left + n_right >= count - dropped);

        (axis, n_left, n_right, aabb_left, aabb_right, children_right)
    }
}
