//! Packet rays and hit records.

use glam::Mat4;

use crate::simd::{LaneF32, LaneI32, LaneVec3};

/// Minimum accepted hit distance. Rejects self-intersections at the surface a
/// secondary ray starts on.
pub const EPSILON: f32 = 1e-3;

/// Material id lanes start out as this sentinel until a hit is recorded.
pub const INVALID_MATERIAL: i32 = i32::MAX;

/// Computes the inverse of `x` per lane, avoiding division by zero.
///
/// Lanes with `|x| <= f32::EPSILON` map to a large finite value with the sign
/// of `x`, so slab tests stay NaN-free for axis-parallel rays.
#[inline(always)]
pub fn safe_inverse(x: LaneF32) -> LaneF32 {
    let eps = LaneF32::splat(f32::EPSILON);
    let big = LaneF32::splat(1.0 / f32::EPSILON);
    let negative = x.cmp_lt(LaneF32::ZERO);
    let signed_big = LaneF32::blend(big, -big, negative);
    LaneF32::blend(LaneF32::ONE / x, signed_big, x.abs().cmp_le(eps))
}

/// A packet of `LANES` rays traced together.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    /// Starting points, one per lane.
    pub origin: LaneVec3,
    /// Direction vectors, one per lane. Assumed non-zero; not necessarily
    /// normalized (instance transforms may scale them).
    pub direction: LaneVec3,
    /// Safe per-lane inverse of `direction`, precomputed for the slab test.
    pub inv_direction: LaneVec3,
}

impl Ray {
    /// Creates a new `Ray` packet with the given origins and directions.
    #[inline(always)]
    pub fn new(origin: LaneVec3, direction: LaneVec3) -> Self {
        Ray {
            origin,
            direction,
            inv_direction: LaneVec3::new(
                safe_inverse(direction.x),
                safe_inverse(direction.y),
                safe_inverse(direction.z),
            ),
        }
    }

    /// The ray packet mapped through `matrix` (origins as points, directions
    /// as vectors). Directions are not renormalized so hit distances remain
    /// comparable across spaces.
    #[inline(always)]
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Ray::new(
            self.origin.transform_point(matrix),
            self.direction.transform_direction(matrix),
        )
    }
}

/// Per-lane results of a closest-hit query, blended as traversal proceeds.
#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    /// Lanes that have recorded any hit.
    pub hit: LaneF32,
    /// Distance along the ray, `+INF` until a hit is recorded. Shrinks
    /// monotonically during traversal.
    pub distance: LaneF32,
    /// Hit point in world space.
    pub point: LaneVec3,
    /// Interpolated surface normal in world space.
    pub normal: LaneVec3,
    /// Resolved material id per lane.
    pub material_id: LaneI32,
    /// Interpolated texture coordinates.
    pub u: LaneF32,
    pub v: LaneF32,
}

impl RayHit {
    /// A hit record representing no hit on any lane.
    #[inline(always)]
    pub fn none() -> Self {
        Self {
            hit: LaneF32::ZERO,
            distance: LaneF32::splat(f32::INFINITY),
            point: LaneVec3::ZERO,
            normal: LaneVec3::ZERO,
            material_id: LaneI32::splat(INVALID_MATERIAL),
            u: LaneF32::ZERO,
            v: LaneF32::ZERO,
        }
    }
}

impl Default for RayHit {
    fn default() -> Self {
        Self::none()
    }
}
