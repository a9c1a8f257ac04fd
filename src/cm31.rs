//! CM31 — complex extension of M31
//!
//! `CM31 = M31[i] / (i² + 1)`. Elements are written `a + b·i`. Since
//! p = 2^31 - 1 ≡ 3 (mod 4), −1 is a non-residue and the extension is a
//! field.

use core::fmt::{self, Display};
use core::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use num_traits::{One, Zero};

use crate::fields::Field;
use crate::m31::M31;

/// An element `a + b·i` of the complex extension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CM31(pub M31, pub M31);

impl CM31 {
    pub const ZERO: Self = Self(M31::ZERO, M31::ZERO);
    pub const ONE: Self = Self(M31::ONE, M31::ZERO);

    #[inline]
    pub const fn from_u32_unchecked(a: u32, b: u32) -> Self {
        Self(M31::from_u32_unchecked(a), M31::from_u32_unchecked(b))
    }

    #[inline]
    pub const fn from_m31(a: M31, b: M31) -> Self {
        Self(a, b)
    }

    /// Complex conjugate `a - b·i`.
    #[inline]
    pub fn conjugate(self) -> Self {
        Self(self.0, -self.1)
    }

    /// `a² + b²`, the norm down to M31.
    #[inline]
    pub fn norm(self) -> M31 {
        self.0.square() + self.1.square()
    }

    /// Fast path for multiplying by a base-field element.
    #[inline]
    pub fn mul_m31(self, rhs: M31) -> Self {
        Self(self.0 * rhs, self.1 * rhs)
    }
}

impl Field for CM31 {
    const ZERO: Self = Self::ZERO;
    const ONE: Self = Self::ONE;

    /// `(a + bi)^-1 = (a - bi) / (a² + b²)`.
    ///
    /// # Panics
    /// Panics in debug builds if `self` is zero.
    fn inverse(self) -> Self {
        self.conjugate().mul_m31(self.norm().inverse())
    }
}

impl Display for CM31 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}i", self.0, self.1)
    }
}

impl From<M31> for CM31 {
    #[inline]
    fn from(x: M31) -> Self {
        Self(x, M31::ZERO)
    }
}

impl Add for CM31 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0, self.1 + rhs.1)
    }
}

impl Sub for CM31 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0, self.1 - rhs.1)
    }
}

impl Mul for CM31 {
    type Output = Self;
    /// `(a + bi)(c + di) = (ac - bd) + (ad + bc)i`.
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self(
            self.0 * rhs.0 - self.1 * rhs.1,
            self.0 * rhs.1 + self.1 * rhs.0,
        )
    }
}

impl Neg for CM31 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self(-self.0, -self.1)
    }
}

impl AddAssign for CM31 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for CM31 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for CM31 {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Mul<M31> for CM31 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: M31) -> Self {
        self.mul_m31(rhs)
    }
}

impl Sub<M31> for CM31 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: M31) -> Self {
        Self(self.0 - rhs, self.1)
    }
}

impl Zero for CM31 {
    #[inline]
    fn zero() -> Self {
        Self::ZERO
    }
    #[inline]
    fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl One for CM31 {
    #[inline]
    fn one() -> Self {
        Self::ONE
    }
}
