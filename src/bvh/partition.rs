//! Split search: the object SAH sweep, the chopped-binned spatial split with
//! plane/triangle clipping, and the consistent three-axis index partition.

use glam::Vec3;

use crate::{aabb::Aabb, triangle::Triangle, Primitive};

/// Smallest allowed slab thickness; thinner axes get padded so the slab test
/// and the spatial binning never divide a zero extent.
const MIN_AXIS_EXTENT: f32 = 1e-3;
const AXIS_PAD: f32 = 5e-3;

/// The enclosing AABB of the primitives in `indices[first..last]`, padded so
/// every axis is at least [`MIN_AXIS_EXTENT`] thick.
pub fn bounds_of<P: Primitive>(primitives: &[P], indices: &[u32], first: usize, last: usize) -> Aabb {
    let mut aabb = Aabb::empty();
    for &index in &indices[first..last] {
        aabb.grow_aabb(&primitives[index as usize].aabb());
    }
    for d in 0..3 {
        if aabb.max[d] - aabb.min[d] < MIN_AXIS_EXTENT {
            aabb.max[d] += AXIS_PAD;
        }
    }
    aabb
}

/// Checks the three-axis sorted invariant over a range. Debug-assert helper.
pub fn is_sorted<P: Primitive>(
    primitives: &[P],
    indices: &[Vec<u32>; 3],
    first: usize,
    last: usize,
) -> bool {
    for dimension in 0..3 {
        for i in first + 1..last {
            let prev = primitives[indices[dimension][i - 1] as usize].centroid()[dimension];
            let curr = primitives[indices[dimension][i] as usize].centroid()[dimension];
            if prev > curr {
                return false;
            }
        }
    }
    true
}

/// Best object split found by the full SAH sweep.
#[derive(Clone, Copy, Debug)]
pub struct ObjectSplit {
    pub cost: f32,
    pub axis: usize,
    /// Absolute position of the split in the sorted index arrays: the left
    /// child covers `[first, index)`, the right child `[index, first + n)`.
    pub index: usize,
    pub aabb_left: Aabb,
    pub aabb_right: Aabb,
}

/// Sweeps every split position on every axis, accumulating prefix and suffix
/// AABB surface areas into `sah`, and returns the cheapest
/// `A(L) * n_l + A(R) * n_r`. Ties break toward the lower axis, then the
/// lower position.
pub fn partition_object<P: Primitive>(
    primitives: &[P],
    indices: &[Vec<u32>; 3],
    first: usize,
    count: usize,
    sah: &mut [f32],
) -> ObjectSplit {
    debug_assert!(count >= 2);
    debug_assert!(is_sorted(primitives, indices, first, first + count));

    let mut best = ObjectSplit {
        cost: f32::INFINITY,
        axis: 0,
        index: 0,
        aabb_left: Aabb::empty(),
        aabb_right: Aabb::empty(),
    };

    for dimension in 0..3 {
        let axis_indices = &indices[dimension][first..first + count];

        // Left to right: prefix half of the cost.
        let mut aabb_left = Aabb::empty();
        for i in 0..count - 1 {
            aabb_left.grow_aabb(&primitives[axis_indices[i] as usize].aabb());
            sah[i] = aabb_left.surface_area() * (i + 1) as f32;
        }

        // Right to left: suffix half.
        let mut aabb_right = Aabb::empty();
        for i in (1..count).rev() {
            aabb_right.grow_aabb(&primitives[axis_indices[i] as usize].aabb());
            sah[i - 1] += aabb_right.surface_area() * (count - i) as f32;
        }

        for (i, &cost) in sah[..count - 1].iter().enumerate() {
            if cost < best.cost {
                best.cost = cost;
                best.axis = dimension;
                best.index = first + i + 1;
            }
        }
    }

    // Recover the child AABBs of the winning position.
    let axis_indices = &indices[best.axis][first..first + count];
    let split = best.index - first;
    for &index in &axis_indices[..split] {
        best.aabb_left.grow_aabb(&primitives[index as usize].aabb());
    }
    for &index in &axis_indices[split..] {
        best.aabb_right.grow_aabb(&primitives[index as usize].aabb());
    }

    best
}

/// Best spatial split found by chopped binning.
#[derive(Clone, Copy, Debug)]
pub struct SpatialSplit {
    pub cost: f32,
    pub axis: usize,
    /// References whose max bin is below this go left, whose min bin is at or
    /// above it go right; the rest straddle.
    pub bin: usize,
    /// World position of the splitting plane.
    pub plane: f32,
    pub aabb_left: Aabb,
    pub aabb_right: Aabb,
    pub count_left: usize,
    pub count_right: usize,
}

#[derive(Clone, Copy)]
struct Bin {
    aabb: Aabb,
    entry: usize,
    exit: usize,
}

/// Maps a cached triangle AABB to its clamped bin interval along `axis`.
/// The same mapping is used by the sweep and by the builder's replay so the
/// per-side counts agree.
#[inline(always)]
pub fn bin_range(
    aabb: &Aabb,
    axis: usize,
    bounds_min: f32,
    inv_extent: f32,
    bin_count: usize,
) -> (usize, usize) {
    let scale = bin_count as f32 * inv_extent;
    let bin_min = ((aabb.min[axis] - bounds_min) * scale) as i64;
    let bin_max = ((aabb.max[axis] - bounds_min) * scale) as i64;
    let top = bin_count as i64 - 1;
    (
        bin_min.clamp(0, top) as usize,
        bin_max.clamp(0, top) as usize,
    )
}

/// Bins the range along each axis, clipping every reference to the bins its
/// AABB spans and counting entries and exits, then sweeps the bins like the
/// object sweep to find the cheapest splitting plane.
pub fn partition_spatial(
    triangles: &[Triangle],
    indices: &[Vec<u32>; 3],
    first: usize,
    count: usize,
    bounds: &Aabb,
    bin_count: usize,
) -> Option<SpatialSplit> {
    debug_assert!(bin_count >= 4);

    let mut best: Option<SpatialSplit> = None;
    let mut bin_sah = vec![0.0f32; bin_count];

    for dimension in 0..3 {
        let bounds_min = bounds.min[dimension];
        let bounds_max = bounds.max[dimension];
        let extent = bounds_max - bounds_min;
        let step = extent / bin_count as f32;
        let inv_extent = 1.0 / extent;

        let mut bins = vec![
            Bin {
                aabb: Aabb::empty(),
                entry: 0,
                exit: 0,
            };
            bin_count
        ];

        for &index in &indices[dimension][first..first + count] {
            let triangle = &triangles[index as usize];
            let (bin_min, bin_max) =
                bin_range(&triangle.aabb, dimension, bounds_min, inv_extent, bin_count);

            bins[bin_min].entry += 1;
            bins[bin_max].exit += 1;

            if bin_min == bin_max {
                // Entirely within one bin span; the cached AABB is exact.
                bins[bin_min].aabb.grow_aabb(&triangle.aabb);
            } else {
                for b in bin_min..=bin_max {
                    let lo = bounds_min + step * b as f32;
                    let hi = bounds_min + step * (b + 1) as f32;
                    clip_to_slab(triangle, dimension, lo, hi, &mut bins[b].aabb);
                }
            }
        }

        #[cfg(debug_assertions)]
        for (b, bin) in bins.iter().enumerate() {
            if bin.aabb.is_valid() {
                let lo = bounds_min + step * b as f32;
                let hi = bounds_min + step * (b + 1) as f32;
                debug_assert!(bin.aabb.min[dimension] >= lo - 1e-3);
                debug_assert!(bin.aabb.max[dimension] <= hi + 1e-3);
            }
        }

        // Prefix: a reference is left of plane b iff it enters before it.
        let mut left_aabb = Aabb::empty();
        let mut left_count = 0usize;
        for b in 0..bin_count - 1 {
            left_aabb.grow_aabb(&bins[b].aabb);
            left_count += bins[b].entry;
            bin_sah[b] = left_aabb.surface_area() * left_count as f32;
        }

        // Suffix: a reference is right of plane b iff it exits at or after it.
        let mut right_aabb = Aabb::empty();
        let mut right_count = 0usize;
        for b in (1..bin_count).rev() {
            right_aabb.grow_aabb(&bins[b].aabb);
            right_count += bins[b].exit;
            bin_sah[b - 1] += right_aabb.surface_area() * right_count as f32;
        }

        let mut axis_best: Option<usize> = None;
        let mut axis_cost = best.map(|b| b.cost).unwrap_or(f32::INFINITY);
        for (b, &cost) in bin_sah[..bin_count - 1].iter().enumerate() {
            if cost < axis_cost {
                axis_cost = cost;
                axis_best = Some(b);
            }
        }

        if let Some(b) = axis_best {
            let split_bin = b + 1;
            let mut aabb_left = Aabb::empty();
            let mut aabb_right = Aabb::empty();
            let mut count_left = 0;
            let mut count_right = 0;
            for (i, bin) in bins.iter().enumerate() {
                if i < split_bin {
                    aabb_left.grow_aabb(&bin.aabb);
                    count_left += bin.entry;
                } else {
                    aabb_right.grow_aabb(&bin.aabb);
                    count_right += bin.exit;
                }
            }
            best = Some(SpatialSplit {
                cost: axis_cost,
                axis: dimension,
                bin: split_bin,
                plane: bounds_min + step * split_bin as f32,
                aabb_left,
                aabb_right,
                count_left,
                count_right,
            });
        }
    }

    best
}

/// Which side of an axis-aligned plane a triangle lies on, or the two points
/// where its edges cross the plane.
enum PlaneSide {
    /// All vertices at or below the plane.
    Below,
    /// All vertices at or above the plane.
    Above,
    Crossing([Vec3; 2]),
}

/// Classifies the triangle against the plane `p[axis] == plane` and computes
/// the two edge intersection points when it crosses.
fn plane_triangle_intersection(axis: usize, plane: f32, p0: Vec3, p1: Vec3, p2: Vec3) -> PlaneSide {
    let d0 = p0[axis] - plane;
    let d1 = p1[axis] - plane;
    let d2 = p2[axis] - plane;

    if d0 <= 0.0 && d1 <= 0.0 && d2 <= 0.0 {
        return PlaneSide::Below;
    }
    if d0 >= 0.0 && d1 >= 0.0 && d2 >= 0.0 {
        return PlaneSide::Above;
    }

    let edge10 = p1 - p0;
    let edge20 = p2 - p0;
    let edge21 = p2 - p1;

    // Exactly two of the three edges cross; pick them by rejecting the
    // parameter that falls outside (0, 1).
    let t0 = -d0 / edge10[axis];
    let t1 = -d0 / edge20[axis];
    let t2 = -d1 / edge21[axis];

    let points = if t0 <= 0.0 || t0 >= 1.0 {
        [p0 + t1 * edge20, p1 + t2 * edge21]
    } else if t1 <= 0.0 || t1 >= 1.0 {
        [p0 + t0 * edge10, p1 + t2 * edge21]
    } else {
        [p0 + t0 * edge10, p0 + t1 * edge20]
    };

    PlaneSide::Crossing(points)
}

/// Grows `out` by the part of `triangle` between the two parallel planes
/// `lo` and `hi` along `axis`.
fn clip_to_slab(triangle: &Triangle, axis: usize, lo: f32, hi: f32, out: &mut Aabb) {
    let (p0, p1, p2) = (triangle.p0, triangle.p1, triangle.p2);
    let lo_side = plane_triangle_intersection(axis, lo, p0, p1, p2);
    let hi_side = plane_triangle_intersection(axis, hi, p0, p1, p2);

    match (lo_side, hi_side) {
        // Crosses both planes: the clipped polygon is bounded by the four
        // edge intersections plus any vertex sitting between the planes.
        (PlaneSide::Crossing(a), PlaneSide::Crossing(b)) => {
            out.grow(a[0]);
            out.grow(a[1]);
            out.grow(b[0]);
            out.grow(b[1]);
            for p in [p0, p1, p2] {
                if p[axis] >= lo && p[axis] <= hi {
                    out.grow(p);
                }
            }
        }
        // Ends inside this slab: the two crossing points plus the vertices
        // above the lower plane.
        (PlaneSide::Crossing(a), PlaneSide::Below) => {
            out.grow(a[0]);
            out.grow(a[1]);
            for p in [p0, p1, p2] {
                if p[axis] >= lo {
                    out.grow(p);
                }
            }
        }
        // Starts inside this slab.
        (PlaneSide::Above, PlaneSide::Crossing(b)) => {
            out.grow(b[0]);
            out.grow(b[1]);
            for p in [p0, p1, p2] {
                if p[axis] <= hi {
                    out.grow(p);
                }
            }
        }
        // Entirely within the slab span.
        (PlaneSide::Above, PlaneSide::Below) => {
            out.grow_aabb(&triangle.aabb);
        }
        // Entirely outside; only reachable through rounding at bin edges.
        _ => {}
    }
}

/// Reorders the two non-split index arrays so that references on the left of
/// the chosen split end up in the left half on every axis, keeping each half
/// sorted on its own axis.
///
/// Ties on the split coordinate are resolved by identity: the reference goes
/// left iff it occurs among the equal-coordinate entries directly left of the
/// split position in the split axis order. This is what keeps the three
/// per-axis left counts equal when many centroids coincide.
pub fn split_indices<P: Primitive>(
    primitives: &[P],
    indices: &mut [Vec<u32>; 3],
    first: usize,
    count: usize,
    temp: &mut [u32],
    split_axis: usize,
    split_index: usize,
    split_pos: f32,
) {
    for dimension in 0..3 {
        if dimension == split_axis {
            continue;
        }

        {
            let dim_indices = &indices[dimension];
            let pivot_indices = &indices[split_axis];

            let mut left = first;
            let mut right = split_index;

            for i in first..first + count {
                let index = dim_indices[i];
                let coord = primitives[index as usize].centroid()[split_axis];
                let mut goes_left = coord < split_pos;

                if coord == split_pos {
                    // Scan the equal-coordinate run left of the split for
                    // this exact reference.
                    let mut j = split_index as isize - 1;
                    while j >= first as isize
                        && primitives[pivot_indices[j as usize] as usize].centroid()[split_axis]
                            == split_pos
                    {
                        if pivot_indices[j as usize] == index {
                            goes_left = true;
                            break;
                        }
                        j -= 1;
                    }
                }

                if goes_left {
                    temp[left] = index;
                    left += 1;
                } else {
                    temp[right] = index;
                    right += 1;
                }
            }

            debug_assert_eq!(left, split_index);
            debug_assert_eq!(right, first + count);
        }

        indices[dimension][first..first + count].copy_from_slice(&temp[first..first + count]);
    }

    debug_assert!(is_sorted(primitives, indices, first, split_index));
    debug_assert!(is_sorted(primitives, indices, split_index, first + count));
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;

    fn quad_strip(n: usize) -> Vec<Triangle> {
        // n unit triangles marching along +x.
        (0..n)
            .map(|i| {
                let x = i as f32 * 2.0;
                Triangle::new(
                    vec3(x, 0.0, 0.0),
                    vec3(x + 1.0, 0.0, 0.0),
                    vec3(x, 1.0, 0.0),
                )
            })
            .collect()
    }

    fn sorted_indices(triangles: &[Triangle]) -> [Vec<u32>; 3] {
        let mut out = [Vec::new(), Vec::new(), Vec::new()];
        for (axis, indices) in out.iter_mut().enumerate() {
            let mut v: Vec<u32> = (0..triangles.len() as u32).collect();
            v.sort_by(|&a, &b| {
                triangles[a as usize].centroid()[axis]
                    .total_cmp(&triangles[b as usize].centroid()[axis])
            });
            *indices = v;
        }
        out
    }

    #[test]
    fn bounds_are_padded() {
        let triangles = quad_strip(2);
        let indices: Vec<u32> = vec![0, 1];
        let bounds = bounds_of(&triangles, &indices, 0, 2);
        // Flat in z, so that axis must be padded open.
        assert!(bounds.max.z - bounds.min.z >= 1e-3);
        assert!(bounds.max.x - bounds.min.x > 2.0);
    }

    #[test]
    fn object_split_separates_strip() {
        let triangles = quad_strip(4);
        let indices = sorted_indices(&triangles);
        let mut sah = vec![0.0; triangles.len()];
        let split = partition_object(&triangles, &indices, 0, 4, &mut sah);
        // The strip marches along x: the split axis must be x and the split
        // must be interior.
        assert_eq!(split.axis, 0);
        assert!(split.index > 0 && split.index < 4);
        assert!(split.aabb_left.is_valid() && split.aabb_right.is_valid());
        assert!(split.aabb_left.max.x <= split.aabb_right.min.x + 1e-6);
        assert!(split.cost.is_finite());
    }

    #[test]
    fn split_indices_keeps_axis_counts_equal() {
        let triangles = quad_strip(6);
        let mut indices = sorted_indices(&triangles);
        let mut temp = vec![0u32; triangles.len()];
        let mut sah = vec![0.0; triangles.len()];

        let split = partition_object(&triangles, &indices, 0, 6, &mut sah);
        let split_pos =
            triangles[indices[split.axis][split.index] as usize].centroid()[split.axis];
        split_indices(
            &triangles,
            &mut indices,
            0,
            6,
            &mut temp,
            split.axis,
            split.index,
            split_pos,
        );

        for dimension in 0..3 {
            for &i in &indices[dimension][..split.index] {
                assert!(triangles[i as usize].centroid()[split.axis] < split_pos);
            }
            for &i in &indices[dimension][split.index..6] {
                assert!(triangles[i as usize].centroid()[split.axis] >= split_pos);
            }
        }
    }

    #[test]
    fn split_indices_resolves_ties_by_identity() {
        // Four triangles stacked so every centroid shares x and z; the y
        // split must still move the same identities left on every axis.
        let triangles: Vec<Triangle> = (0..4)
            .map(|i| {
                let y = i as f32;
                Triangle::new(
                    vec3(0.0, y, 0.0),
                    vec3(1.0, y, 0.0),
                    vec3(0.0, y + 0.5, 0.0),
                )
            })
            .collect();
        let mut indices = sorted_indices(&triangles);
        let mut temp = vec![0u32; 4];

        // Split on x where every coordinate ties: position 2 in x order.
        let split_axis = 0;
        let split_index = 2;
        let split_pos = triangles[indices[split_axis][split_index] as usize].centroid()[split_axis];
        let left_ids: Vec<u32> = indices[split_axis][..split_index].to_vec();

        split_indices(
            &triangles,
            &mut indices,
            0,
            4,
            &mut temp,
            split_axis,
            split_index,
            split_pos,
        );

        for dimension in 0..3 {
            let got: Vec<u32> = indices[dimension][..split_index].to_vec();
            let mut got_sorted = got.clone();
            let mut want_sorted = left_ids.clone();
            got_sorted.sort_unstable();
            want_sorted.sort_unstable();
            assert_eq!(got_sorted, want_sorted, "axis {dimension}");
        }
    }

    #[test]
    fn plane_intersection_cases() {
        let p0 = vec3(0.0, 0.0, 0.0);
        let p1 = vec3(2.0, 0.0, 0.0);
        let p2 = vec3(0.0, 2.0, 0.0);

        assert!(matches!(
            plane_triangle_intersection(0, 3.0, p0, p1, p2),
            PlaneSide::Below
        ));
        assert!(matches!(
            plane_triangle_intersection(0, -1.0, p0, p1, p2),
            PlaneSide::Above
        ));
        match plane_triangle_intersection(0, 1.0, p0, p1, p2) {
            PlaneSide::Crossing(points) => {
                for p in points {
                    assert!((p.x - 1.0).abs() < 1e-6);
                }
            }
            _ => panic!("expected a crossing"),
        }
    }

    #[test]
    fn clip_stays_inside_slab() {
        let tri = Triangle::new(
            vec3(0.0, 0.0, 0.0),
            vec3(4.0, 1.0, 0.0),
            vec3(0.0, 2.0, 0.0),
        );
        let mut clipped = Aabb::empty();
        clip_to_slab(&tri, 0, 1.0, 2.0, &mut clipped);
        assert!(clipped.is_valid());
        assert!(clipped.min.x >= 1.0 - 1e-4);
        assert!(clipped.max.x <= 2.0 + 1e-4);
        // The clip must be tighter in y than the full triangle.
        assert!(clipped.max.y < 2.0);
    }

    #[test]
    fn spatial_split_counts_cover_range() {
        let triangles = quad_strip(8);
        let indices = sorted_indices(&triangles);
        let ids: Vec<u32> = (0..8).collect();
        let bounds = bounds_of(&triangles, &ids, 0, 8);
        let split = partition_spatial(&triangles, &indices, 0, 8, &bounds, 16)
            .expect("strip must admit a spatial split");
        assert_eq!(split.axis, 0);
        assert!(split.count_left >= 1 && split.count_right >= 1);
        // Disjoint strip: every reference enters and exits on one side.
        assert!(split.count_left + split.count_right >= 8);
        assert!(split.plane > bounds.min.x && split.plane < bounds.max.x);
        assert!(split.aabb_left.is_valid() && split.aabb_right.is_valid());
    }
}
