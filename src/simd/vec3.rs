//! A 3-vector of lane packets: `LANES` points or directions processed together.

use std::ops::{Add, Div, Mul, Neg, Sub};

use glam::{Mat4, Vec3};

use super::LaneF32;

/// `LANES` 3D vectors in structure-of-arrays form.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LaneVec3 {
    pub x: LaneF32,
    pub y: LaneF32,
    pub z: LaneF32,
}

impl LaneVec3 {
    pub const ZERO: Self = Self {
        x: LaneF32::ZERO,
        y: LaneF32::ZERO,
        z: LaneF32::ZERO,
    };

    #[inline(always)]
    pub fn new(x: LaneF32, y: LaneF32, z: LaneF32) -> Self {
        Self { x, y, z }
    }

    /// Broadcasts one scalar vector across all lanes.
    #[inline(always)]
    pub fn splat(v: Vec3) -> Self {
        Self {
            x: LaneF32::splat(v.x),
            y: LaneF32::splat(v.y),
            z: LaneF32::splat(v.z),
        }
    }

    #[inline(always)]
    pub fn lane(self, i: usize) -> Vec3 {
        Vec3::new(self.x.lane(i), self.y.lane(i), self.z.lane(i))
    }

    #[inline(always)]
    pub fn set_lane(&mut self, i: usize, v: Vec3) {
        self.x.set_lane(i, v.x);
        self.y.set_lane(i, v.y);
        self.z.set_lane(i, v.z);
    }

    #[inline(always)]
    pub fn dot(a: Self, b: Self) -> LaneF32 {
        a.x.madd(b.x, a.y.madd(b.y, a.z * b.z))
    }

    #[inline(always)]
    pub fn cross(a: Self, b: Self) -> Self {
        Self {
            x: a.y.msub(b.z, a.z * b.y),
            y: a.z.msub(b.x, a.x * b.z),
            z: a.x.msub(b.y, a.y * b.x),
        }
    }

    #[inline(always)]
    pub fn length_squared(self) -> LaneF32 {
        Self::dot(self, self)
    }

    #[inline(always)]
    pub fn length(self) -> LaneF32 {
        self.length_squared().sqrt()
    }

    #[inline(always)]
    pub fn normalize(self) -> Self {
        let inv_length = self.length_squared().rsqrt();
        Self {
            x: self.x * inv_length,
            y: self.y * inv_length,
            z: self.z * inv_length,
        }
    }

    #[inline(always)]
    pub fn rcp(self) -> Self {
        Self {
            x: self.x.rcp(),
            y: self.y.rcp(),
            z: self.z.rcp(),
        }
    }

    #[inline(always)]
    pub fn min(a: Self, b: Self) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            z: a.z.min(b.z),
        }
    }

    #[inline(always)]
    pub fn max(a: Self, b: Self) -> Self {
        Self {
            x: a.x.max(b.x),
            y: a.y.max(b.y),
            z: a.z.max(b.z),
        }
    }

    /// Componentwise select of `case_true` where the lane mask is set.
    #[inline(always)]
    pub fn blend(case_false: Self, case_true: Self, mask: LaneF32) -> Self {
        Self {
            x: LaneF32::blend(case_false.x, case_true.x, mask),
            y: LaneF32::blend(case_false.y, case_true.y, mask),
            z: LaneF32::blend(case_false.z, case_true.z, mask),
        }
    }

    /// `a * b + c` componentwise, `b` broadcast.
    #[inline(always)]
    pub fn madd(a: Self, b: LaneF32, c: Self) -> Self {
        Self {
            x: a.x.madd(b, c.x),
            y: a.y.madd(b, c.y),
            z: a.z.madd(b, c.z),
        }
    }

    /// `a * b - c` componentwise, `b` broadcast.
    #[inline(always)]
    pub fn msub(a: Self, b: LaneF32, c: Self) -> Self {
        Self {
            x: a.x.msub(b, c.x),
            y: a.y.msub(b, c.y),
            z: a.z.msub(b, c.z),
        }
    }

    /// Transforms all lanes as points (`w = 1`).
    #[inline(always)]
    pub fn transform_point(self, m: &Mat4) -> Self {
        let mut out = Self::splat(m.w_axis.truncate());
        out = Self::madd(Self::splat(m.x_axis.truncate()), self.x, out);
        out = Self::madd(Self::splat(m.y_axis.truncate()), self.y, out);
        Self::madd(Self::splat(m.z_axis.truncate()), self.z, out)
    }

    /// Transforms all lanes as directions (`w = 0`, no translation).
    #[inline(always)]
    pub fn transform_direction(self, m: &Mat4) -> Self {
        let mut out = Self::madd(
            Self::splat(m.x_axis.truncate()),
            self.x,
            Self::splat(m.y_axis.truncate()) * self.y,
        );
        out = Self::madd(Self::splat(m.z_axis.truncate()), self.z, out);
        out
    }
}

impl Neg for LaneVec3 {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl Add for LaneVec3 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl Sub for LaneVec3 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl Mul for LaneVec3 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        Self {
            x: self.x * rhs.x,
            y: self.y * rhs.y,
            z: self.z * rhs.z,
        }
    }
}

impl Mul<LaneF32> for LaneVec3 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: LaneF32) -> Self {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

impl Div for LaneVec3 {
    type Output = Self;
    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        Self {
            x: self.x / rhs.x,
            y: self.y / rhs.y,
            z: self.z / rhs.z,
        }
    }
}

impl Div<LaneF32> for LaneVec3 {
    type Output = Self;
    #[inline(always)]
    fn div(self, rhs: LaneF32) -> Self {
        let inv = rhs.rcp();
        Self {
            x: self.x * inv,
            y: self.y * inv,
            z: self.z * inv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::LANES;
    use glam::{vec3, Mat4, Quat, Vec3};

    #[test]
    fn dot_cross_basis() {
        let x = LaneVec3::splat(Vec3::X);
        let y = LaneVec3::splat(Vec3::Y);
        assert!(LaneVec3::dot(x, y).all_false() || LaneVec3::dot(x, y).lane(0) == 0.0);
        let z = LaneVec3::cross(x, y);
        for i in 0..LANES {
            assert_eq!(z.lane(i), Vec3::Z);
        }
    }

    #[test]
    fn normalize_unit_length() {
        let v = LaneVec3::splat(vec3(3.0, 4.0, 12.0));
        let n = v.normalize();
        for i in 0..LANES {
            assert!((n.lane(i).length() - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn transforms_match_glam() {
        let m = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::from_rotation_y(0.7),
            vec3(1.0, -2.0, 3.0),
        );
        let p = vec3(0.3, 0.5, -0.2);
        let lanes = LaneVec3::splat(p);
        let tp = lanes.transform_point(&m);
        let td = lanes.transform_direction(&m);
        for i in 0..LANES {
            assert!((tp.lane(i) - m.transform_point3(p)).length() < 1e-4);
            assert!((td.lane(i) - m.transform_vector3(p)).length() < 1e-4);
        }
    }
}
