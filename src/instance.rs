//! The two-level scheme: a world-space tree over instances that each wrap a
//! shared mesh-local tree.

use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::{
    aabb::Aabb,
    bvh::Bvh,
    ray::{Ray, RayHit},
    simd::{LaneF32, LaneI32},
    triangle::Triangle,
    Primitive,
};

/// One placement of a mesh-local tree in the world.
///
/// Rays are transformed into the instance's local frame before traversing the
/// inner tree; recorded hit points and normals come back in world space via
/// the forward transform. Materials are resolved by adding
/// `material_offset` to the triangle's stored id.
#[derive(Clone)]
pub struct Instance {
    pub bvh: Arc<Bvh<Triangle>>,
    pub world: Mat4,
    pub inv_world: Mat4,
    pub material_offset: u32,
    aabb: Aabb,
}

impl Instance {
    pub fn new(bvh: Arc<Bvh<Triangle>>, world: Mat4, material_offset: u32) -> Self {
        let aabb = bvh.root_aabb().transformed(&world);
        Self {
            bvh,
            world,
            inv_world: world.inverse(),
            material_offset,
            aabb,
        }
    }
}

impl Primitive for Instance {
    #[inline(always)]
    fn aabb(&self) -> Aabb {
        self.aabb
    }

    #[inline(always)]
    fn centroid(&self) -> Vec3 {
        self.aabb.center()
    }

    fn trace(&self, ray: &Ray, hit: &mut RayHit, world: &Mat4) {
        let local_ray = ray.transformed(&self.inv_world);
        let to_world = *world * self.world;

        let previous_distance = hit.distance;
        self.bvh.trace(&local_ray, hit, &to_world);

        // Lanes whose distance shrank were hit inside this instance; only
        // those resolve against this instance's material table.
        let updated = hit.distance.cmp_lt(previous_distance);
        hit.material_id = LaneI32::blend(
            hit.material_id,
            hit.material_id + LaneI32::splat(self.material_offset as i32),
            updated,
        );
    }

    #[inline]
    fn intersect(&self, ray: &Ray, max_distance: LaneF32) -> LaneF32 {
        self.bvh
            .intersect(&ray.transformed(&self.inv_world), max_distance)
    }
}
