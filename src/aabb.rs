//! An Axis-Aligned Bounding Box (AABB) represented by its minimum and maximum points.

use std::ops::BitAnd;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::{
    ray::Ray,
    simd::{LaneF32, LaneVec3},
};

/// An Axis-Aligned Bounding Box (AABB) represented by its minimum and maximum
/// points.
///
/// Stored as two unpadded [`Vec3`]s (24 bytes) so a [`crate::bvh::BvhNode`]
/// packs into 32 bytes.
#[derive(Default, Clone, Copy, Debug, PartialEq, Zeroable)]
#[repr(C)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

unsafe impl Pod for Aabb {}

impl Aabb {
    /// The empty AABB: min at positive infinity, max at negative infinity.
    /// Growing it by any point yields that point.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Creates a new AABB with the given minimum and maximum points.
    #[inline(always)]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Returns an empty AABB.
    #[inline(always)]
    pub fn empty() -> Self {
        Self::EMPTY
    }

    /// Creates a new AABB with both min and max set to the given point.
    #[inline(always)]
    pub fn from_point(point: Vec3) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Creates an AABB that bounds the given set of points.
    #[inline(always)]
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut aabb = Aabb::empty();
        for point in points {
            aabb.grow(*point);
        }
        aabb
    }

    /// Extends the AABB to include the given point.
    #[inline(always)]
    pub fn grow(&mut self, point: Vec3) -> &mut Self {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
        self
    }

    /// Extends the AABB to include another AABB.
    #[inline(always)]
    pub fn grow_aabb(&mut self, other: &Self) -> &mut Self {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self
    }

    /// Returns the union of this AABB and another AABB.
    #[inline(always)]
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Returns the overlap of this AABB and another AABB.
    ///
    /// If the AABBs do not overlap, the resulting AABB has min > max on some
    /// axis; check with [`Aabb::is_valid`] before using it.
    #[inline(always)]
    #[must_use]
    pub fn overlap(&self, other: &Self) -> Self {
        Aabb {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    /// Checks if the AABB is valid (i.e., min <= max on all axes).
    #[inline(always)]
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// Surface area `2 (dx dy + dy dz + dz dx)`. Invalid boxes report 0.
    #[inline(always)]
    pub fn surface_area(&self) -> f32 {
        if !self.is_valid() {
            return 0.0;
        }
        let d = self.max - self.min;
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Surface area of the overlap of two AABBs, 0 when they are disjoint.
    #[inline(always)]
    pub fn overlap_surface_area(a: &Self, b: &Self) -> f32 {
        a.overlap(b).surface_area()
    }

    /// Returns the center point of the AABB.
    #[inline(always)]
    pub fn center(&self) -> Vec3 {
        (self.max + self.min) * 0.5
    }

    /// Checks if the AABB contains the given point.
    #[inline(always)]
    pub fn contains_point(&self, point: Vec3) -> bool {
        (point.cmpge(self.min).bitand(point.cmple(self.max))).all()
    }

    /// Checks if this AABB fully contains another.
    #[inline(always)]
    pub fn contains_aabb(&self, other: &Self) -> bool {
        (other.min.cmpge(self.min).bitand(other.max.cmple(self.max))).all()
    }

    /// The world-space AABB of the eight transformed corners.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let mut out = Aabb::empty();
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.grow(matrix.transform_point3(corner));
        }
        out
    }

    /// Slab test of a packet ray against this AABB.
    ///
    /// Returns the lane mask of rays whose slab interval `[t_near, t_far]` is
    /// non-empty with `t_far >= 0` and `t_near < t_max`. The ray carries a
    /// safe inverse direction so zero direction components never produce NaN
    /// false misses for boxes containing the origin.
    #[inline(always)]
    pub fn intersect(&self, ray: &Ray, t_max: LaneF32) -> LaneF32 {
        let t1 = (LaneVec3::splat(self.min) - ray.origin) * ray.inv_direction;
        let t2 = (LaneVec3::splat(self.max) - ray.origin) * ray.inv_direction;

        let t_min = LaneVec3::min(t1, t2);
        let t_far = LaneVec3::max(t1, t2);

        let t_near = t_min.x.max(t_min.y).max(t_min.z);
        let t_far = t_far.x.min(t_far.y).min(t_far.z);

        t_near.cmp_le(t_far) & t_far.cmp_ge(LaneF32::ZERO) & t_near.cmp_lt(t_max)
    }
}
