//! Exact physical measures.
//!
//! Dimensions are fixed-point integers (millimetres), so restoring a panel after a
//! cancelled cut is a literal equality rather than a float approximation.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Serialize};

const MM_PER_METRE: f64 = 1_000.0;
const MM2_PER_SQUARE_METRE: f64 = 1_000_000.0;

/// A linear dimension in millimetres.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Length(i64);

impl Length {
    pub const ZERO: Length = Length(0);

    pub const fn from_mm(mm: i64) -> Self {
        Self(mm)
    }

    /// Convert from metres, rounding to the nearest millimetre.
    pub fn from_metres(metres: f64) -> Self {
        Self((metres * MM_PER_METRE).round() as i64)
    }

    pub const fn as_mm(self) -> i64 {
        self.0
    }

    pub fn as_metres(self) -> f64 {
        self.0 as f64 / MM_PER_METRE
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_sub(self, rhs: Length) -> Option<Length> {
        self.0.checked_sub(rhs.0).map(Length)
    }

    pub fn checked_add(self, rhs: Length) -> Option<Length> {
        self.0.checked_add(rhs.0).map(Length)
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}mm", self.0)
    }
}

impl Add for Length {
    type Output = Length;

    fn add(self, rhs: Length) -> Length {
        Length(self.0 + rhs.0)
    }
}

impl Sub for Length {
    type Output = Length;

    fn sub(self, rhs: Length) -> Length {
        Length(self.0 - rhs.0)
    }
}

impl Mul for Length {
    type Output = Area;

    fn mul(self, rhs: Length) -> Area {
        Area(self.0 as i128 * rhs.0 as i128)
    }
}

/// A surface in square millimetres.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Area(i128);

impl Area {
    pub const ZERO: Area = Area(0);

    pub const fn from_mm2(mm2: i128) -> Self {
        Self(mm2)
    }

    /// Convert from square metres, rounding to the nearest square millimetre.
    pub fn from_square_metres(square_metres: f64) -> Self {
        Self((square_metres * MM2_PER_SQUARE_METRE).round() as i128)
    }

    pub const fn as_mm2(self) -> i128 {
        self.0
    }

    pub fn as_square_metres(self) -> f64 {
        self.0 as f64 / MM2_PER_SQUARE_METRE
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// `self / rhs` as a float ratio; zero when `rhs` is zero.
    pub fn ratio_of(self, rhs: Area) -> f64 {
        if rhs.0 == 0 {
            return 0.0;
        }
        self.0 as f64 / rhs.0 as f64
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}m²", self.as_square_metres())
    }
}

impl Add for Area {
    type Output = Area;

    fn add(self, rhs: Area) -> Area {
        Area(self.0 + rhs.0)
    }
}

impl AddAssign for Area {
    fn add_assign(&mut self, rhs: Area) {
        self.0 += rhs.0;
    }
}

impl Sub for Area {
    type Output = Area;

    fn sub(self, rhs: Area) -> Area {
        Area(self.0 - rhs.0)
    }
}

impl Mul<u32> for Area {
    type Output = Area;

    fn mul(self, rhs: u32) -> Area {
        Area(self.0 * rhs as i128)
    }
}

impl Sum for Area {
    fn sum<I: Iterator<Item = Area>>(iter: I) -> Area {
        iter.fold(Area::ZERO, Add::add)
    }
}

/// A count of discrete stock units (materials, tools).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    pub const fn new(units: i64) -> Self {
        Self(units)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_sub(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_sub(rhs.0).map(Quantity)
    }

    pub fn checked_add(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_add(rhs.0).map(Quantity)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn metres_convert_to_millimetres() {
        assert_eq!(Length::from_metres(2.5).as_mm(), 2_500);
        assert_eq!(Length::from_metres(0.0004).as_mm(), 0);
        assert_eq!(Area::from_square_metres(0.5).as_mm2(), 500_000);
    }

    #[test]
    fn length_product_is_area() {
        let area = Length::from_metres(10.0) * Length::from_metres(5.0);
        assert_eq!(area, Area::from_square_metres(50.0));
        assert_eq!(area.to_string(), "50.000000m²");
    }

    #[test]
    fn ratio_of_zero_area_is_zero() {
        assert_eq!(Area::from_mm2(5).ratio_of(Area::ZERO), 0.0);
    }

    proptest! {
        /// Subtracting then adding the same length is lossless.
        #[test]
        fn sub_then_add_restores_length(a in 0i64..10_000_000, b in 0i64..10_000_000) {
            let start = Length::from_mm(a);
            let delta = Length::from_mm(b);
            prop_assert_eq!(start - delta + delta, start);
        }
    }
}
