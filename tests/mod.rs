#[cfg(test)]
mod tests {
    use glam::{vec3, Mat4, Vec3};
    use sbvh::{
        simd::{mask_all, LaneF32, LaneVec3, LANES},
        test_util::{
            geometry::{
                cube, elongated_straddler_scene, open_cube_without_front, random_soup,
                subdivided_plane,
            },
            sampling::hash_point,
        },
        BuildConfig, Bvh, Ray, RayHit, Triangle, TraversalStrategy,
    };

    fn splat_ray(origin: Vec3, direction: Vec3) -> Ray {
        Ray::new(LaneVec3::splat(origin), LaneVec3::splat(direction))
    }

    /// A packet of distinct hashed rays aimed into `[-extent, extent]^3`.
    fn hashed_packet(packet: u32, seed: u32, extent: f32) -> Ray {
        let mut origin = LaneVec3::ZERO;
        let mut direction = LaneVec3::ZERO;
        for lane in 0..LANES {
            let id = packet * LANES as u32 + lane as u32;
            origin.set_lane(lane, hash_point(id, seed, extent * 2.0));
            let target = hash_point(id, seed.wrapping_add(101), extent * 0.5);
            let mut dir = target - origin.lane(lane);
            if dir.length() < 1e-3 {
                dir = Vec3::X;
            }
            direction.set_lane(lane, dir.normalize());
        }
        Ray::new(origin, direction)
    }

    #[test]
    fn cube_closest_hit() {
        let bvh = Bvh::build(cube(Vec3::ZERO, 1.0), &BuildConfig::default()).unwrap();
        bvh.validate();

        // Slightly off the face center so the ray does not run along the
        // face's triangulation diagonal.
        let ray = splat_ray(vec3(5.0, 0.1, 0.2), vec3(-1.0, 0.0, 0.0));
        let mut hit = RayHit::none();
        bvh.trace(&ray, &mut hit, &Mat4::IDENTITY);

        assert_eq!(hit.hit.mask(), mask_all());
        for lane in 0..LANES {
            assert!((hit.distance.lane(lane) - 4.0).abs() < 1e-4);
            assert!((hit.normal.lane(lane) - Vec3::X).length() < 1e-4);
            assert!((hit.point.lane(lane) - vec3(1.0, 0.1, 0.2)).length() < 1e-4);
        }
    }

    #[test]
    fn nested_cubes_report_inner_front_face() {
        // Outer box open toward the ray so the nearest surface along the ray
        // is the inner cube's front face, while the outer back face sits in
        // the tree as a tempting farther hit.
        let mut triangles = open_cube_without_front(Vec3::ZERO, 2.0);
        triangles.extend(cube(Vec3::ZERO, 1.0));

        for config in [BuildConfig::bvh(), BuildConfig::sbvh()] {
            let bvh = Bvh::build_spatial(triangles.clone(), &config).unwrap();
            bvh.validate();

            let ray = splat_ray(vec3(0.3, 0.2, 10.0), vec3(0.0, 0.0, -1.0));
            let mut hit = RayHit::none();
            bvh.trace(&ray, &mut hit, &Mat4::IDENTITY);

            assert_eq!(hit.hit.mask(), mask_all());
            for lane in 0..LANES {
                assert!(
                    (hit.distance.lane(lane) - 9.0).abs() < 1e-4,
                    "expected the inner front face at t = 9, got {}",
                    hit.distance.lane(lane)
                );
                assert!((hit.normal.lane(lane) - Vec3::Z).length() < 1e-4);
            }
        }
    }

    #[test]
    fn coplanar_centroids_build_and_hit() {
        // Rows and columns of the grid share centroid coordinates, forcing
        // the tie-resolution path of the three-axis partition.
        let triangles = subdivided_plane(8);
        let bvh = Bvh::build(triangles, &BuildConfig::default()).unwrap();
        let stats = bvh.validate(); // every reference present exactly once
        assert_eq!(stats.reference_count, 8 * 8 * 2);

        let ray = splat_ray(vec3(0.03, 5.0, 0.11), vec3(0.0, -1.0, 0.0));
        let mut hit = RayHit::none();
        bvh.trace(&ray, &mut hit, &Mat4::IDENTITY);
        assert_eq!(hit.hit.mask(), mask_all());
        for lane in 0..LANES {
            assert!((hit.distance.lane(lane) - 5.0).abs() < 1e-4);
        }
    }

    #[test]
    fn spatial_split_duplicates_references() {
        let sbvh =
            Bvh::build_spatial(elongated_straddler_scene(), &BuildConfig::sbvh()).unwrap();
        sbvh.validate();
        assert!(
            sbvh.leaf_total() > sbvh.primitives.len(),
            "the sliver must be referenced from both sides of the plane"
        );

        let bvh = Bvh::build_spatial(elongated_straddler_scene(), &BuildConfig::bvh()).unwrap();
        assert_eq!(bvh.leaf_total(), bvh.primitives.len());

        // Closest hits of the two builds agree bitwise on material id.
        for packet in 0..10_000 / LANES as u32 {
            let mut ray = hashed_packet(packet, 900, 8.0);
            // Recenter onto the sliver scene.
            ray = Ray::new(
                ray.origin + LaneVec3::splat(vec3(5.0, 5.0, 0.0)),
                ray.direction,
            );

            let mut hit_s = RayHit::none();
            let mut hit_b = RayHit::none();
            sbvh.trace(&ray, &mut hit_s, &Mat4::IDENTITY);
            bvh.trace(&ray, &mut hit_b, &Mat4::IDENTITY);

            assert_eq!(hit_s.hit.mask(), hit_b.hit.mask());
            for lane in 0..LANES {
                assert_eq!(
                    hit_s.material_id.lane(lane),
                    hit_b.material_id.lane(lane),
                    "packet {packet} lane {lane}"
                );
            }
        }
    }

    #[test]
    fn occlusion_masks_are_per_lane() {
        // One big triangle in the z = 0 plane.
        let triangles = vec![Triangle::new(
            vec3(-5.0, -5.0, 0.0),
            vec3(5.0, -5.0, 0.0),
            vec3(0.0, 5.0, 0.0),
        )];
        let bvh = Bvh::build(triangles, &BuildConfig::default()).unwrap();

        if LANES == 1 {
            let behind = splat_ray(vec3(0.1, 0.2, 1.0), Vec3::Z);
            assert!(bvh.intersect(&behind, LaneF32::splat(2.0)).all_false());
            let toward = splat_ray(vec3(0.1, 0.2, -1.0), Vec3::Z);
            assert!(bvh.intersect(&toward, LaneF32::splat(2.0)).all_true());
        } else {
            // Lane 0 starts beyond the plane, every other lane before it.
            let mut origin = LaneVec3::splat(vec3(0.1, 0.2, -1.0));
            origin.set_lane(0, vec3(0.1, 0.2, 1.0));
            let ray = Ray::new(origin, LaneVec3::splat(Vec3::Z));

            let mask = bvh.intersect(&ray, LaneF32::splat(2.0)).mask();
            assert_eq!(mask & 1, 0, "lane 0 points away from the plane");
            assert_eq!(mask, mask_all() & !1, "all other lanes are occluded");
        }
    }

    #[test]
    fn empty_space_misses_everything() {
        let bvh = Bvh::build(cube(Vec3::ZERO, 1.0), &BuildConfig::default()).unwrap();
        let ray = splat_ray(vec3(0.0, 10.0, 0.0), Vec3::Y);
        let mut hit = RayHit::none();
        bvh.trace(&ray, &mut hit, &Mat4::IDENTITY);

        assert!(hit.hit.all_false());
        for lane in 0..LANES {
            assert_eq!(hit.distance.lane(lane), f32::INFINITY);
        }
        assert!(bvh
            .intersect(&ray, LaneF32::splat(f32::INFINITY))
            .all_false());
    }

    #[test]
    fn tree_matches_brute_force() {
        let triangles = random_soup(64, 5, 3.0);

        for build_spatial in [false, true] {
            let bvh = if build_spatial {
                Bvh::build_spatial(triangles.clone(), &BuildConfig::sbvh()).unwrap()
            } else {
                Bvh::build(triangles.clone(), &BuildConfig::default()).unwrap()
            };
            bvh.validate();

            let mut brute = Bvh::build(triangles.clone(), &BuildConfig::default()).unwrap();
            brute.strategy = TraversalStrategy::BruteForce;

            for packet in 0..200 {
                let ray = hashed_packet(packet, 42, 3.0);

                let mut hit_tree = RayHit::none();
                let mut hit_brute = RayHit::none();
                bvh.trace(&ray, &mut hit_tree, &Mat4::IDENTITY);
                brute.trace(&ray, &mut hit_brute, &Mat4::IDENTITY);

                assert_eq!(hit_tree.hit.mask(), hit_brute.hit.mask(), "packet {packet}");
                for lane in 0..LANES {
                    let t_tree = hit_tree.distance.lane(lane);
                    let t_brute = hit_brute.distance.lane(lane);
                    if t_brute.is_finite() {
                        assert!(
                            (t_tree - t_brute).abs() <= 1e-4 * t_brute.max(1.0),
                            "packet {packet} lane {lane}: {t_tree} vs {t_brute}"
                        );
                        assert_eq!(
                            hit_tree.material_id.lane(lane),
                            hit_brute.material_id.lane(lane)
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn closest_hit_is_traversal_order_invariant() {
        let triangles = random_soup(48, 77, 2.0);
        let mut ordered = Bvh::build(triangles.clone(), &BuildConfig::default()).unwrap();
        ordered.strategy = TraversalStrategy::Ordered;
        let mut naive = Bvh::build(triangles, &BuildConfig::default()).unwrap();
        naive.strategy = TraversalStrategy::Naive;

        for packet in 0..100 {
            let ray = hashed_packet(packet, 7, 2.0);

            let mut hit_ordered = RayHit::none();
            let mut hit_naive = RayHit::none();
            ordered.trace(&ray, &mut hit_ordered, &Mat4::IDENTITY);
            naive.trace(&ray, &mut hit_naive, &Mat4::IDENTITY);

            assert_eq!(hit_ordered.hit.mask(), hit_naive.hit.mask());
            for lane in 0..LANES {
                let a = hit_ordered.distance.lane(lane);
                let b = hit_naive.distance.lane(lane);
                if a.is_finite() || b.is_finite() {
                    assert!((a - b).abs() <= 1e-6 * a.abs().max(1.0));
                    assert_eq!(
                        hit_ordered.material_id.lane(lane),
                        hit_naive.material_id.lane(lane)
                    );
                }
            }
        }
    }

    #[test]
    fn slab_test_matches_analytic_reference() {
        for case in 0..500u32 {
            let lo = hash_point(case, 1000, 2.0);
            let size = (hash_point(case, 2000, 1.0) + Vec3::splat(1.1)) * 0.5;
            let aabb = sbvh::Aabb::new(lo, lo + size);

            let ray = hashed_packet(case, 3000, 3.0);
            let mask = aabb.intersect(&ray, LaneF32::splat(f32::INFINITY));

            for lane in 0..LANES {
                let o = ray.origin.lane(lane);
                let d = ray.direction.lane(lane);
                // Keep the reference in plain IEEE arithmetic.
                if d.x.abs() < 1e-3 || d.y.abs() < 1e-3 || d.z.abs() < 1e-3 {
                    continue;
                }
                let mut t_near = f32::NEG_INFINITY;
                let mut t_far = f32::INFINITY;
                for axis in 0..3 {
                    let t1 = (aabb.min[axis] - o[axis]) / d[axis];
                    let t2 = (aabb.max[axis] - o[axis]) / d[axis];
                    t_near = t_near.max(t1.min(t2));
                    t_far = t_far.min(t1.max(t2));
                }
                // Skip grazing cases where the 1/d rounding of the packet
                // path can legitimately flip the verdict.
                let margin = 1e-3 * t_near.abs().max(t_far.abs()).max(1.0);
                if (t_far - t_near).abs() < margin || t_far.abs() < margin {
                    continue;
                }
                let analytic = t_near <= t_far && t_far >= 0.0;
                assert_eq!(
                    mask.mask() >> lane & 1 == 1,
                    analytic,
                    "case {case} lane {lane}"
                );
            }
        }
    }

    #[test]
    fn packet_lanes_diverge_independently() {
        let bvh = Bvh::build(cube(Vec3::ZERO, 1.0), &BuildConfig::default()).unwrap();

        // Half the lanes aim at the cube, the rest fly over it.
        let mut origin = LaneVec3::ZERO;
        for lane in 0..LANES {
            let y = if lane % 2 == 0 { 0.1 } else { 5.0 };
            origin.set_lane(lane, vec3(5.0, y, 0.2));
        }
        let ray = Ray::new(origin, LaneVec3::splat(vec3(-1.0, 0.0, 0.0)));

        let mut hit = RayHit::none();
        bvh.trace(&ray, &mut hit, &Mat4::IDENTITY);
        for lane in 0..LANES {
            if lane % 2 == 0 {
                assert!((hit.distance.lane(lane) - 4.0).abs() < 1e-4, "lane {lane}");
            } else {
                assert_eq!(hit.distance.lane(lane), f32::INFINITY, "lane {lane}");
            }
        }
    }

    #[test]
    fn spatial_tree_round_trips_through_serialization() {
        let bvh =
            Bvh::build_spatial(elongated_straddler_scene(), &BuildConfig::sbvh()).unwrap();
        assert!(bvh.leaf_total() > bvh.primitives.len());

        let mut bytes = Vec::new();
        bvh.save_to(&mut bytes).unwrap();
        let loaded = Bvh::load_from(&mut std::io::Cursor::new(&bytes)).unwrap();
        assert!(loaded.uses_spatial_splits);
        loaded.validate();

        let ray = splat_ray(vec3(1.0, 0.3, 5.0), vec3(0.0, 0.0, -1.0));
        let mut hit_a = RayHit::none();
        let mut hit_b = RayHit::none();
        bvh.trace(&ray, &mut hit_a, &Mat4::IDENTITY);
        loaded.trace(&ray, &mut hit_b, &Mat4::IDENTITY);
        assert_eq!(hit_a.hit.mask(), hit_b.hit.mask());
        for lane in 0..LANES {
            assert_eq!(hit_a.distance.lane(lane), hit_b.distance.lane(lane));
        }
    }

    #[test]
    fn larger_spatial_build_agrees_with_object_build() {
        let triangles = subdivided_plane(16);
        let sbvh = Bvh::build_spatial(triangles.clone(), &BuildConfig::sbvh()).unwrap();
        sbvh.validate();
        let bvh = Bvh::build(triangles, &BuildConfig::default()).unwrap();

        for packet in 0..100 {
            let ray = hashed_packet(packet, 13, 1.5);
            let mut hit_s = RayHit::none();
            let mut hit_b = RayHit::none();
            sbvh.trace(&ray, &mut hit_s, &Mat4::IDENTITY);
            bvh.trace(&ray, &mut hit_b, &Mat4::IDENTITY);
            assert_eq!(hit_s.hit.mask(), hit_b.hit.mask(), "packet {packet}");
            for lane in 0..LANES {
                let a = hit_s.distance.lane(lane);
                let b = hit_b.distance.lane(lane);
                if a.is_finite() || b.is_finite() {
                    assert!((a - b).abs() <= 1e-4 * a.abs().max(1.0));
                }
            }
        }
    }
}
