//! # SAH / spatial-split BVH construction and packet traversal
//!
//! - Full-sweep SAH object splits over three centroid-sorted index
//!   permutations that stay consistent across every subdivision.
//! - Chopped-binned spatial splits ([SBVH](https://www.nvidia.in/docs/IO/77714/sbvh.pdf))
//!   with exact plane/triangle clipping and reference unsplitting.
//! - Packet traversal: `LANES` rays per query (1, 4 or 8, selected by cargo
//!   feature), one lane-parallel slab test per node, ordered descent by ray
//!   sign, and an early-out occlusion query.
//! - A bit-exact serializer for build-once / load-often pipelines, and a
//!   two-level instancing layer over the same traversal core.
//!
//! ## Example
//!
//! ```
//! use glam::{vec3, Mat4, Vec3};
//! use sbvh::{
//!     Bvh, BuildConfig, Ray, RayHit,
//!     simd::LaneVec3,
//!     test_util::geometry::cube,
//! };
//!
//! // Build a spatial-split tree over a cube mesh.
//! let bvh = Bvh::build_spatial(cube(Vec3::ZERO, 1.0), &BuildConfig::default()).unwrap();
//!
//! // Trace a packet of rays against it (every lane identical here).
//! let ray = Ray::new(
//!     LaneVec3::splat(vec3(5.0, 0.1, 0.2)),
//!     LaneVec3::splat(vec3(-1.0, 0.0, 0.0)),
//! );
//! let mut hit = RayHit::none();
//! bvh.trace(&ray, &mut hit, &Mat4::IDENTITY);
//! assert!((hit.distance.lane(0) - 4.0).abs() < 1e-4);
//! ```

pub mod aabb;
pub mod bvh;
pub mod error;
pub mod instance;
pub mod ray;
pub mod simd;
pub mod stack;
pub mod test_util;
pub mod triangle;

pub use aabb::Aabb;
pub use bvh::{Bvh, BvhNode};
pub use error::{BuildError, TreeIoError};
pub use instance::Instance;
pub use ray::{Ray, RayHit};
pub use triangle::Triangle;

use glam::{Mat4, Vec3};

use crate::simd::LaneF32;

/// Anything a tree can organize and a query can hit: triangles at the mesh
/// level, instances at the scene level.
#[cfg(feature = "parallel")]
pub trait Primitive: Send + Sync {
    /// Cached or computed bounds, used by construction and validation.
    fn aabb(&self) -> Aabb;
    /// The point the builder sorts and partitions by.
    fn centroid(&self) -> Vec3;
    /// Closest-hit test, blending nearer lanes into `hit`.
    fn trace(&self, ray: &Ray, hit: &mut RayHit, world: &Mat4);
    /// Occlusion test within `max_distance`, returning the hit lane mask.
    fn intersect(&self, ray: &Ray, max_distance: LaneF32) -> LaneF32;
}

/// Anything a tree can organize and a query can hit: triangles at the mesh
/// level, instances at the scene level.
#[cfg(not(feature = "parallel"))]
pub trait Primitive {
    /// Cached or computed bounds, used by construction and validation.
    fn aabb(&self) -> Aabb;
    /// The point the builder sorts and partitions by.
    fn centroid(&self) -> Vec3;
    /// Closest-hit test, blending nearer lanes into `hit`.
    fn trace(&self, ray: &Ray, hit: &mut RayHit, world: &Mat4);
    /// Occlusion test within `max_distance`, returning the hit lane mask.
    fn intersect(&self, ray: &Ray, max_distance: LaneF32) -> LaneF32;
}

/// Traversal order selection. Everything except `Ordered` exists for tests
/// and debugging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraversalStrategy {
    /// Test every primitive, ignoring the tree.
    BruteForce,
    /// Descend the tree visiting left children first.
    Naive,
    /// Descend front-to-back by the ray's sign on each node's split axis.
    #[default]
    Ordered,
}

/// Build-time tunables.
#[derive(Clone, Copy, Debug)]
pub struct BuildConfig {
    /// Minimum ratio of object-split child overlap to root surface area
    /// before a spatial split is considered. `1.0` disables spatial splits
    /// entirely; `0.0` evaluates them at every node.
    pub spatial_split_alpha: f32,
    /// Number of uniform bins per axis for the spatial sweep. Must be >= 4.
    pub spatial_bin_count: usize,
    /// Ranges smaller than this become leaves without a split search.
    pub leaf_threshold: usize,
    pub traversal_strategy: TraversalStrategy,
}

impl BuildConfig {
    /// Spatial splitting enabled with the usual overlap threshold.
    pub const fn sbvh() -> Self {
        Self {
            spatial_split_alpha: 1e-4,
            spatial_bin_count: 100,
            leaf_threshold: 3,
            traversal_strategy: TraversalStrategy::Ordered,
        }
    }

    /// Object splits only; [`Bvh::build_spatial`] degenerates to the plain
    /// builder's trees.
    pub const fn bvh() -> Self {
        Self {
            spatial_split_alpha: 1.0,
            spatial_bin_count: 100,
            leaf_threshold: 3,
            traversal_strategy: TraversalStrategy::Ordered,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::sbvh()
    }
}
