//! Packet lane primitives.
//!
//! The crate processes `LANES` rays at a time. The lane width is fixed at
//! compile time through cargo features: `lanes_1` (scalar reference),
//! `lanes_4` (SSE-width via [`wide`]) or `lanes_8` (AVX-width via [`wide`]).
//! When several width features are enabled the widest wins.
//!
//! Comparisons produce *mask packets*: a [`LaneF32`] whose lanes are either
//! all-ones or all-zero bit patterns. Masks combine with `&`/`|`/`^`, select
//! with [`LaneF32::blend`] and reduce with [`LaneF32::mask`],
//! [`LaneF32::all_true`] and [`LaneF32::all_false`]. The scalar module keeps
//! the same bit-level contract and is always compiled so wider widths can be
//! tested against it.

pub mod scalar;
pub mod vec3;

#[cfg(feature = "lanes_8")]
mod wide8;
#[cfg(feature = "lanes_8")]
pub use wide8::{LaneF32, LaneI32, LANES};

#[cfg(all(feature = "lanes_4", not(feature = "lanes_8")))]
mod wide4;
#[cfg(all(feature = "lanes_4", not(feature = "lanes_8")))]
pub use wide4::{LaneF32, LaneI32, LANES};

#[cfg(all(not(feature = "lanes_4"), not(feature = "lanes_8")))]
pub use scalar::{LaneF32, LaneI32, LANES};

pub use vec3::LaneVec3;

/// Mask with every lane set.
#[inline(always)]
pub fn mask_all() -> u32 {
    (1u32 << LANES) - 1
}
