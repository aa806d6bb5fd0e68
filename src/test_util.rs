//! Scene generators and deterministic sampling for tests and examples.

pub mod sampling {
    use glam::{vec3, Vec3};

    #[inline(always)]
    pub fn uhash(x: u32) -> u32 {
        // from https://nullprogram.com/blog/2018/07/31/
        let mut x = x ^ (x >> 16);
        x = x.overflowing_mul(0x7feb352d).0;
        x = x ^ (x >> 15);
        x = x.overflowing_mul(0x846ca68b).0;
        x = x ^ (x >> 16);
        x
    }

    #[inline(always)]
    pub fn uhash2(a: u32, b: u32) -> u32 {
        uhash((a.overflowing_mul(1597334673).0) ^ (b.overflowing_mul(3812015801).0))
    }

    #[inline(always)]
    pub fn unormf(n: u32) -> f32 {
        n as f32 * (1.0 / 0xffffffffu32 as f32)
    }

    /// Deterministic noise in `[0, 1)` keyed by a coordinate pair and seed.
    #[inline(always)]
    pub fn hash_noise(x: u32, y: u32, seed: u32) -> f32 {
        unormf(uhash2(x, (y << 11).wrapping_add(seed)))
    }

    /// Deterministic point in the cube `[-extent, extent)^3`.
    pub fn hash_point(id: u32, seed: u32, extent: f32) -> Vec3 {
        vec3(
            hash_noise(id, 0, seed) * 2.0 - 1.0,
            hash_noise(id, 1, seed) * 2.0 - 1.0,
            hash_noise(id, 2, seed) * 2.0 - 1.0,
        ) * extent
    }

    /// Deterministic unit direction, never axis-degenerate.
    pub fn hash_direction(id: u32, seed: u32) -> Vec3 {
        let z = hash_noise(id, 3, seed) * 1.8 - 0.9;
        let theta = hash_noise(id, 4, seed) * std::f32::consts::TAU;
        let r = (1.0 - z * z).sqrt();
        vec3(r * theta.cos(), r * theta.sin(), z).normalize()
    }
}

pub mod geometry {
    use glam::{vec3, Vec3};

    use super::sampling::hash_point;
    use crate::triangle::Triangle;

    /// Cube triangle mesh (12 triangles) centered at `center` with the given
    /// half extent, faces wound outward.
    pub fn cube(center: Vec3, half_extent: f32) -> Vec<Triangle> {
        #[rustfmt::skip]
        let corners = [
            [[-1., 1., -1.], [1., 1., 1.], [1., 1., -1.]],
            [[1., 1., 1.], [-1., -1., 1.], [1., -1., 1.]],
            [[-1., 1., 1.], [-1., -1., -1.], [-1., -1., 1.]],
            [[1., -1., -1.], [-1., -1., 1.], [-1., -1., -1.]],
            [[1., 1., -1.], [1., -1., 1.], [1., -1., -1.]],
            [[-1., 1., -1.], [1., -1., -1.], [-1., -1., -1.]],
            [[-1., 1., -1.], [-1., 1., 1.], [1., 1., 1.]],
            [[1., 1., 1.], [-1., 1., 1.], [-1., -1., 1.]],
            [[-1., 1., 1.], [-1., 1., -1.], [-1., -1., -1.]],
            [[1., -1., -1.], [1., -1., 1.], [-1., -1., 1.]],
            [[1., 1., -1.], [1., 1., 1.], [1., -1., 1.]],
            [[-1., 1., -1.], [1., 1., -1.], [1., -1., -1.]],
        ];
        corners
            .iter()
            .map(|t| {
                Triangle::new(
                    center + Vec3::from(t[0]) * half_extent,
                    center + Vec3::from(t[1]) * half_extent,
                    center + Vec3::from(t[2]) * half_extent,
                )
            })
            .collect()
    }

    /// The same cube with the `+z` face left open (10 triangles).
    pub fn open_cube_without_front(center: Vec3, half_extent: f32) -> Vec<Triangle> {
        cube(center, half_extent)
            .into_iter()
            .filter(|t| {
                !(t.p0.z > center.z && t.p1.z > center.z && t.p2.z > center.z)
            })
            .collect()
    }

    /// A flat plane at `y = 0` spanning `[-1, 1]^2`, subdivided into
    /// `resolution^2` cells of two triangles each. Centroids repeat their
    /// coordinates along entire rows and columns, exercising the tie paths
    /// of the partitioner.
    pub fn subdivided_plane(resolution: usize) -> Vec<Triangle> {
        let mut triangles = Vec::with_capacity(resolution * resolution * 2);
        for z in 0..resolution {
            for x in 0..resolution {
                let fx = (x as f32 / resolution as f32) * 2.0 - 1.0;
                let fz = (z as f32 / resolution as f32) * 2.0 - 1.0;
                let fx2 = ((x + 1) as f32 / resolution as f32) * 2.0 - 1.0;
                let fz2 = ((z + 1) as f32 / resolution as f32) * 2.0 - 1.0;

                let v00 = vec3(fx, 0.0, fz);
                let v10 = vec3(fx2, 0.0, fz);
                let v01 = vec3(fx, 0.0, fz2);
                let v11 = vec3(fx2, 0.0, fz2);

                triangles.push(Triangle::new(v00, v01, v10));
                triangles.push(Triangle::new(v10, v01, v11));
            }
        }
        triangles
    }

    /// Two compact triangles in opposite corners with one thin sliver
    /// running diagonally between them. Any object split drags the sliver's
    /// full box into a child, so the children overlap almost the whole root;
    /// a spatial split down the middle is far cheaper and references the
    /// sliver from both sides.
    pub fn elongated_straddler_scene() -> Vec<Triangle> {
        vec![
            Triangle::new(
                vec3(0.5, 0.0, 0.0),
                vec3(1.5, 0.0, 0.0),
                vec3(1.0, 1.0, 0.0),
            )
            .with_material(0),
            Triangle::new(
                vec3(8.5, 9.0, 0.0),
                vec3(9.5, 9.0, 0.0),
                vec3(9.0, 10.0, 0.0),
            )
            .with_material(1),
            Triangle::new(
                vec3(0.0, 0.0, 0.0),
                vec3(10.0, 10.0, 0.1),
                vec3(10.0, 10.0, -0.1),
            )
            .with_material(2),
        ]
    }

    /// A deterministic soup of small random triangles inside
    /// `[-extent, extent]^3`.
    pub fn random_soup(count: usize, seed: u32, extent: f32) -> Vec<Triangle> {
        (0..count)
            .map(|i| {
                let id = i as u32 * 3;
                let base = hash_point(id, seed, extent);
                Triangle::new(
                    base,
                    base + hash_point(id + 1, seed.wrapping_add(17), extent * 0.2),
                    base + hash_point(id + 2, seed.wrapping_add(31), extent * 0.2),
                )
                .with_material(i as u32)
            })
            .collect()
    }
}
