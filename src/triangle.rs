//! Triangle representation in 3D space.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

use crate::{
    aabb::Aabb,
    ray::{Ray, RayHit, EPSILON},
    simd::{LaneF32, LaneI32, LaneVec3},
};

/// A triangle with vertex positions, shading attributes, an opaque material
/// id and a cached bounding box.
///
/// Immutable during build and query. `repr(C)` without padding so a triangle
/// array round-trips through the serializer byte for byte.
#[derive(Clone, Copy, Default, Debug, PartialEq, Zeroable)]
#[repr(C)]
pub struct Triangle {
    pub p0: Vec3,
    pub p1: Vec3,
    pub p2: Vec3,
    pub n0: Vec3,
    pub n1: Vec3,
    pub n2: Vec3,
    pub t0: Vec2,
    pub t1: Vec2,
    pub t2: Vec2,
    pub material_id: u32,
    pub aabb: Aabb,
}

unsafe impl Pod for Triangle {}

impl Triangle {
    /// Builds a triangle from positions alone: the geometric normal is used
    /// at every vertex and texture coordinates are zero.
    pub fn new(p0: Vec3, p1: Vec3, p2: Vec3) -> Self {
        let n = (p1 - p0).cross(p2 - p0).normalize_or_zero();
        Self {
            p0,
            p1,
            p2,
            n0: n,
            n1: n,
            n2: n,
            t0: Vec2::ZERO,
            t1: Vec2::ZERO,
            t2: Vec2::ZERO,
            material_id: 0,
            aabb: Aabb::from_points(&[p0, p1, p2]),
        }
    }

    #[inline(always)]
    pub fn with_material(mut self, material_id: u32) -> Self {
        self.material_id = material_id;
        self
    }

    /// Center of mass of the three vertices; the build key of every sort and
    /// partition.
    #[inline(always)]
    pub fn centroid(&self) -> Vec3 {
        (self.p0 + self.p1 + self.p2) / 3.0
    }

    /// Recomputes the cached bounding box from the vertex positions.
    #[inline(always)]
    pub fn update_aabb(&mut self) {
        self.aabb = Aabb::from_points(&[self.p0, self.p1, self.p2]);
    }

    /// A triangle with (near-)coincident vertices. Tolerated by the builders
    /// thanks to the AABB pad, but worth flagging upstream.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        (self.p1 - self.p0).cross(self.p2 - self.p0).length_squared() <= f32::EPSILON
    }

    /// Möller–Trumbore closest-hit test of the packet ray against this
    /// triangle. Lanes that hit closer than `hit.distance` get their
    /// distance, world-space point and normal, texture coordinates and
    /// material id blended in. `world` maps the local frame the ray lives in
    /// to world space.
    pub fn trace(&self, ray: &Ray, hit: &mut RayHit, world: &Mat4) {
        let zero = LaneF32::ZERO;
        let one = LaneF32::ONE;

        let edge1 = LaneVec3::splat(self.p1 - self.p0);
        let edge2 = LaneVec3::splat(self.p2 - self.p0);

        let h = LaneVec3::cross(ray.direction, edge2);
        let a = LaneVec3::dot(edge1, h);

        let f = a.rcp();
        let s = ray.origin - LaneVec3::splat(self.p0);
        let u = f * LaneVec3::dot(s, h);

        // A barycentric coordinate outside [0, 1] rules the lane out.
        let mut mask = u.cmp_gt(zero) & u.cmp_lt(one);
        if mask.all_false() {
            return;
        }

        let q = LaneVec3::cross(s, edge1);
        let v = f * LaneVec3::dot(ray.direction, q);

        mask = mask & v.cmp_gt(zero);
        mask = mask & (u + v).cmp_lt(one);
        if mask.all_false() {
            return;
        }

        let t = f * LaneVec3::dot(edge2, q);

        mask = mask & t.cmp_gt(LaneF32::splat(EPSILON));
        mask = mask & t.cmp_lt(hit.distance);
        if mask.all_false() {
            return;
        }

        hit.hit = hit.hit | mask;
        hit.distance = LaneF32::blend(hit.distance, t, mask);

        let point = LaneVec3::madd(ray.direction, t, ray.origin).transform_point(world);
        let normal = LaneVec3::madd(
            LaneVec3::splat(self.n1 - self.n0),
            u,
            LaneVec3::madd(
                LaneVec3::splat(self.n2 - self.n0),
                v,
                LaneVec3::splat(self.n0),
            ),
        )
        .normalize()
        .transform_direction(world);

        hit.point = LaneVec3::blend(hit.point, point, mask);
        hit.normal = LaneVec3::blend(hit.normal, normal, mask);

        let tex_u = LaneF32::splat(self.t1.x - self.t0.x)
            .madd(u, LaneF32::splat(self.t2.x - self.t0.x).madd(v, LaneF32::splat(self.t0.x)));
        let tex_v = LaneF32::splat(self.t1.y - self.t0.y)
            .madd(u, LaneF32::splat(self.t2.y - self.t0.y).madd(v, LaneF32::splat(self.t0.y)));
        hit.u = LaneF32::blend(hit.u, tex_u, mask);
        hit.v = LaneF32::blend(hit.v, tex_v, mask);

        hit.material_id = LaneI32::blend(
            hit.material_id,
            LaneI32::splat(self.material_id as i32),
            mask,
        );
    }

    /// Occlusion test: the lane mask of rays hitting this triangle closer
    /// than `max_distance`. Records nothing.
    pub fn intersect(&self, ray: &Ray, max_distance: LaneF32) -> LaneF32 {
        let zero = LaneF32::ZERO;
        let one = LaneF32::ONE;

        let edge1 = LaneVec3::splat(self.p1 - self.p0);
        let edge2 = LaneVec3::splat(self.p2 - self.p0);

        let h = LaneVec3::cross(ray.direction, edge2);
        let a = LaneVec3::dot(edge1, h);

        let f = a.rcp();
        let s = ray.origin - LaneVec3::splat(self.p0);
        let u = f * LaneVec3::dot(s, h);

        let mut mask = u.cmp_gt(zero) & u.cmp_lt(one);
        if mask.all_false() {
            return mask;
        }

        let q = LaneVec3::cross(s, edge1);
        let v = f * LaneVec3::dot(ray.direction, q);

        mask = mask & v.cmp_gt(zero);
        mask = mask & (u + v).cmp_lt(one);
        if mask.all_false() {
            return mask;
        }

        let t = f * LaneVec3::dot(edge2, q);

        mask & t.cmp_gt(LaneF32::splat(EPSILON)) & t.cmp_lt(max_distance)
    }
}

impl crate::Primitive for Triangle {
    #[inline(always)]
    fn aabb(&self) -> Aabb {
        self.aabb
    }

    #[inline(always)]
    fn centroid(&self) -> Vec3 {
        Triangle::centroid(self)
    }

    #[inline(always)]
    fn trace(&self, ray: &Ray, hit: &mut RayHit, world: &Mat4) {
        Triangle::trace(self, ray, hit, world);
    }

    #[inline(always)]
    fn intersect(&self, ray: &Ray, max_distance: LaneF32) -> LaneF32 {
        Triangle::intersect(self, ray, max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::{mask_all, LANES};
    use glam::vec3;

    fn unit_triangle() -> Triangle {
        Triangle::new(
            vec3(0.0, 0.0, 0.0),
            vec3(1.0, 0.0, 0.0),
            vec3(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn centroid_and_aabb() {
        let tri = unit_triangle();
        assert!((tri.centroid() - vec3(1.0 / 3.0, 1.0 / 3.0, 0.0)).length() < 1e-6);
        assert_eq!(tri.aabb.min, Vec3::ZERO);
        assert_eq!(tri.aabb.max, vec3(1.0, 1.0, 0.0));
    }

    #[test]
    fn trace_records_hit() {
        let tri = unit_triangle().with_material(7);
        let ray = Ray::new(
            LaneVec3::splat(vec3(0.25, 0.25, 1.0)),
            LaneVec3::splat(vec3(0.0, 0.0, -1.0)),
        );
        let mut hit = RayHit::none();
        tri.trace(&ray, &mut hit, &Mat4::IDENTITY);
        assert_eq!(hit.hit.mask(), mask_all());
        for i in 0..LANES {
            assert!((hit.distance.lane(i) - 1.0).abs() < 1e-5);
            assert!((hit.point.lane(i) - vec3(0.25, 0.25, 0.0)).length() < 1e-4);
            assert!((hit.normal.lane(i) - Vec3::Z).length() < 1e-4);
            assert_eq!(hit.material_id.lane(i), 7);
        }
    }

    #[test]
    fn trace_miss_outside_barycentric_range() {
        let tri = unit_triangle();
        let ray = Ray::new(
            LaneVec3::splat(vec3(0.9, 0.9, 1.0)),
            LaneVec3::splat(vec3(0.0, 0.0, -1.0)),
        );
        let mut hit = RayHit::none();
        tri.trace(&ray, &mut hit, &Mat4::IDENTITY);
        assert!(hit.hit.all_false());
        assert_eq!(hit.distance.lane(0), f32::INFINITY);
    }

    #[test]
    fn trace_rejects_farther_hit() {
        let tri = unit_triangle();
        let ray = Ray::new(
            LaneVec3::splat(vec3(0.25, 0.25, 1.0)),
            LaneVec3::splat(vec3(0.0, 0.0, -1.0)),
        );
        let mut hit = RayHit::none();
        hit.distance = LaneF32::splat(0.5);
        tri.trace(&ray, &mut hit, &Mat4::IDENTITY);
        // The triangle is at t = 1.0, beyond the recorded 0.5.
        assert!(hit.hit.all_false());
    }

    #[test]
    fn intersect_respects_max_distance() {
        let tri = unit_triangle();
        let ray = Ray::new(
            LaneVec3::splat(vec3(0.25, 0.25, 2.0)),
            LaneVec3::splat(vec3(0.0, 0.0, -1.0)),
        );
        assert_eq!(
            tri.intersect(&ray, LaneF32::splat(3.0)).mask(),
            mask_all()
        );
        assert!(tri.intersect(&ray, LaneF32::splat(1.0)).all_false());
    }

    #[test]
    fn degenerate_detection() {
        let flat = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::X * 2.0);
        assert!(flat.is_degenerate());
        assert!(!unit_triangle().is_degenerate());
    }

    #[test]
    fn intersect_epsilon_rejects_origin_on_surface() {
        let tri = unit_triangle();
        let ray = Ray::new(
            LaneVec3::splat(vec3(0.25, 0.25, 0.0)),
            LaneVec3::splat(vec3(0.0, 0.0, 1.0)),
        );
        assert!(tri.intersect(&ray, LaneF32::splat(10.0)).all_false());
    }
}
