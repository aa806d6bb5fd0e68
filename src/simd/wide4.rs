//! Four-lane packets over [`wide::f32x4`] / [`wide::i32x4`].

use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Neg, Not, Sub};

use wide::{f32x4, i32x4, CmpEq, CmpGe, CmpGt, CmpLe, CmpLt, CmpNe};

pub const LANES: usize = 4;

/// Four f32 lanes. Doubles as a four-lane mask.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(transparent)]
pub struct LaneF32(f32x4);

impl LaneF32 {
    pub const ZERO: Self = Self(f32x4::ZERO);
    pub const ONE: Self = Self(f32x4::ONE);

    #[inline(always)]
    pub fn splat(v: f32) -> Self {
        Self(f32x4::splat(v))
    }

    #[inline(always)]
    pub fn from_array(v: [f32; LANES]) -> Self {
        Self(f32x4::from(v))
    }

    #[inline(always)]
    pub fn to_array(self) -> [f32; LANES] {
        self.0.to_array()
    }

    #[inline(always)]
    pub fn lane(self, i: usize) -> f32 {
        self.0.as_array_ref()[i]
    }

    #[inline(always)]
    pub fn set_lane(&mut self, i: usize, v: f32) {
        self.0.as_array_mut()[i] = v;
    }

    #[inline(always)]
    pub fn min(self, other: Self) -> Self {
        Self(self.0.fast_min(other.0))
    }

    #[inline(always)]
    pub fn max(self, other: Self) -> Self {
        Self(self.0.fast_max(other.0))
    }

    #[inline(always)]
    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    #[inline(always)]
    pub fn sqrt(self) -> Self {
        Self(self.0.sqrt())
    }

    #[inline(always)]
    pub fn rsqrt(self) -> Self {
        Self(f32x4::ONE / self.0.sqrt())
    }

    #[inline(always)]
    pub fn rcp(self) -> Self {
        Self(f32x4::ONE / self.0)
    }

    #[inline(always)]
    pub fn floor(self) -> Self {
        Self(self.0.floor())
    }

    #[inline(always)]
    pub fn ceil(self) -> Self {
        Self(self.0.ceil())
    }

    /// `v - m * floor(v / m)`
    #[inline(always)]
    pub fn modulo(self, m: Self) -> Self {
        self - m * (self / m).floor()
    }

    #[inline(always)]
    pub fn clamp(self, lo: Self, hi: Self) -> Self {
        self.max(lo).min(hi)
    }

    /// `self * b + c`
    #[inline(always)]
    pub fn madd(self, b: Self, c: Self) -> Self {
        Self(self.0.mul_add(b.0, c.0))
    }

    /// `self * b - c`
    #[inline(always)]
    pub fn msub(self, b: Self, c: Self) -> Self {
        Self(self.0.mul_sub(b.0, c.0))
    }

    #[inline(always)]
    pub fn cmp_eq(self, other: Self) -> Self {
        Self(self.0.cmp_eq(other.0))
    }

    #[inline(always)]
    pub fn cmp_ne(self, other: Self) -> Self {
        Self(self.0.cmp_ne(other.0))
    }

    #[inline(always)]
    pub fn cmp_lt(self, other: Self) -> Self {
        Self(self.0.cmp_lt(other.0))
    }

    #[inline(always)]
    pub fn cmp_le(self, other: Self) -> Self {
        Self(self.0.cmp_le(other.0))
    }

    #[inline(always)]
    pub fn cmp_gt(self, other: Self) -> Self {
        Self(self.0.cmp_gt(other.0))
    }

    #[inline(always)]
    pub fn cmp_ge(self, other: Self) -> Self {
        Self(self.0.cmp_ge(other.0))
    }

    /// Selects `case_true` in lanes where the sign bit of `mask` is set.
    #[inline(always)]
    pub fn blend(case_false: Self, case_true: Self, mask: Self) -> Self {
        Self(mask.0.blend(case_true.0, case_false.0))
    }

    /// `(!a) & b`
    #[inline(always)]
    pub fn andnot(a: Self, b: Self) -> Self {
        Self(!a.0 & b.0)
    }

    /// Sign-bit reduction, one bit per lane.
    #[inline(always)]
    pub fn mask(self) -> u32 {
        self.0.move_mask() as u32
    }

    #[inline(always)]
    pub fn all_true(self) -> bool {
        self.mask() == 0xF
    }

    #[inline(always)]
    pub fn all_false(self) -> bool {
        self.mask() == 0
    }

    #[inline(always)]
    pub fn round_int(self) -> LaneI32 {
        LaneI32(i32x4::from(self.0.to_array().map(|v| v.round() as i32)))
    }

    #[inline(always)]
    pub fn sin(self) -> Self {
        Self(self.0.sin())
    }

    #[inline(always)]
    pub fn cos(self) -> Self {
        Self(self.0.cos())
    }

    #[inline(always)]
    pub fn tan(self) -> Self {
        Self(self.0.tan())
    }

    #[inline(always)]
    pub fn asin(self) -> Self {
        Self(self.0.asin())
    }

    #[inline(always)]
    pub fn acos(self) -> Self {
        Self(self.0.acos())
    }

    #[inline(always)]
    pub fn atan(self) -> Self {
        Self(self.0.atan())
    }

    #[inline(always)]
    pub fn atan2(self, x: Self) -> Self {
        Self(self.0.atan2(x.0))
    }

    #[inline(always)]
    pub fn exp(self) -> Self {
        Self(self.0.exp())
    }
}

impl Neg for LaneF32 {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Add for LaneF32 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for LaneF32 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul for LaneF32 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}

impl Div for LaneF32 {
    type Output = Self;
    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        Self(self.0 / rhs.0)
    }
}

impl BitAnd for LaneF32 {
    type Output = Self;
    #[inline(always)]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for LaneF32 {
    type Output = Self;
    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitXor for LaneF32 {
    type Output = Self;
    #[inline(always)]
    fn bitxor(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl Not for LaneF32 {
    type Output = Self;
    #[inline(always)]
    fn not(self) -> Self {
        Self(!self.0)
    }
}

/// Four i32 lanes.
#[derive(Clone, Copy, Debug, Default)]
#[repr(transparent)]
pub struct LaneI32(i32x4);

impl LaneI32 {
    #[inline(always)]
    pub fn splat(v: i32) -> Self {
        Self(i32x4::splat(v))
    }

    #[inline(always)]
    pub fn from_array(v: [i32; LANES]) -> Self {
        Self(i32x4::from(v))
    }

    #[inline(always)]
    pub fn lane(self, i: usize) -> i32 {
        self.0.as_array_ref()[i]
    }

    #[inline(always)]
    pub fn set_lane(&mut self, i: usize, v: i32) {
        self.0.as_array_mut()[i] = v;
    }

    #[inline(always)]
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    #[inline(always)]
    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }

    /// Selects `case_true` in lanes where the sign bit of `mask` is set.
    #[inline(always)]
    pub fn blend(case_false: Self, case_true: Self, mask: LaneF32) -> Self {
        let bits = mask.mask();
        let f = case_false.0.to_array();
        let t = case_true.0.to_array();
        let mut out = [0i32; LANES];
        for i in 0..LANES {
            out[i] = if bits & (1 << i) != 0 { t[i] } else { f[i] };
        }
        Self(i32x4::from(out))
    }

    #[inline(always)]
    pub fn to_float(self) -> LaneF32 {
        LaneF32(f32x4::from(self.0.to_array().map(|v| v as f32)))
    }
}

impl Neg for LaneI32 {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Add for LaneI32 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for LaneI32 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul for LaneI32 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}
