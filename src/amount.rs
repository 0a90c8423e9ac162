use core::fmt::{Debug, Display};
use core::iter::Sum;
use core::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};

use num_bigint::BigUint;
use num_traits::{CheckedAdd, One, Zero};

/// A trait representing a non-negative transfer amount.
///
/// Currency amounts routinely exceed the range of native integer types, so
/// the reference implementation is [`BigUint`]. Fixed-width unsigned types
/// are supported for small deployments; the solver guards their
/// accumulations with [`CheckedAdd`] instead of wrapping.
pub trait Amount:
    Clone
    + Sum<Self>
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Ord
    + AddAssign
    + SubAssign
    + CheckedAdd
    + Zero
    + One
    + From<u32>
    + Debug
    + Display
    + Default
{
}

impl Amount for BigUint {}

impl Amount for u64 {}

impl Amount for u128 {}
