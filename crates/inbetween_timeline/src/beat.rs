// SPDX-License-Identifier: MIT OR Apache-2.0
//! Exact rational beat positions.
//!
//! Loop arithmetic runs over many cycles during playback, so positions are kept as reduced
//! fractions instead of floats.

use crate::error::{TimelineError, TimelineResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

/// A rational position on the timeline, measured in beats.
///
/// Always stored reduced with a positive denominator, so the derived equality and hashing are
/// structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Beat {
    num: i64,
    den: i64,
}

impl Beat {
    /// Beat zero
    pub const ZERO: Beat = Beat { num: 0, den: 1 };

    /// Create a beat from a numerator and denominator
    pub fn new(num: i64, den: i64) -> TimelineResult<Self> {
        if den == 0 {
            return Err(TimelineError::InvalidBeat(format!("{num}/0")));
        }
        Self::reduced(i128::from(num), i128::from(den))
            .ok_or_else(|| TimelineError::InvalidBeat(format!("{num}/{den}")))
    }

    /// Create a whole-beat position
    pub const fn whole(beats: i64) -> Self {
        Self { num: beats, den: 1 }
    }

    /// Numerator of the reduced fraction
    pub fn numer(&self) -> i64 {
        self.num
    }

    /// Denominator of the reduced fraction (always positive)
    pub fn denom(&self) -> i64 {
        self.den
    }

    /// Check for zero
    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    /// Check for a strictly negative value
    pub fn is_negative(&self) -> bool {
        self.num < 0
    }

    /// Sum, or `None` when the reduced result does not fit in `i64`
    pub fn checked_add(self, rhs: Beat) -> Option<Beat> {
        let den = i128::from(self.den) * i128::from(rhs.den);
        let num = i128::from(self.num) * i128::from(rhs.den) + i128::from(rhs.num) * i128::from(self.den);
        Self::reduced(num, den)
    }

    /// Difference, or `None` on overflow
    pub fn checked_sub(self, rhs: Beat) -> Option<Beat> {
        self.checked_add(rhs.checked_neg()?)
    }

    /// Negation, or `None` for the most negative numerator
    pub fn checked_neg(self) -> Option<Beat> {
        Some(Self {
            num: self.num.checked_neg()?,
            den: self.den,
        })
    }

    /// Integer multiple, or `None` on overflow
    pub fn checked_mul(self, rhs: i64) -> Option<Beat> {
        Self::reduced(i128::from(self.num) * i128::from(rhs), i128::from(self.den))
    }

    /// Largest integer `q` with `q * rhs <= self`.
    ///
    /// Fails with [`TimelineError::ZeroLoopLength`] unless `rhs` is positive, and with
    /// [`TimelineError::Overflow`] when `q` does not fit in `i64`.
    pub fn div_floor(&self, rhs: Beat) -> TimelineResult<i64> {
        if rhs.num <= 0 {
            return Err(TimelineError::ZeroLoopLength);
        }
        let n = i128::from(self.num) * i128::from(rhs.den);
        let d = i128::from(self.den) * i128::from(rhs.num);
        i64::try_from(n.div_euclid(d))
            .map_err(|_| TimelineError::Overflow(format!("{self} / {rhs}")))
    }

    /// Remainder of [`Beat::div_floor`], in `[0, rhs)`.
    pub fn rem_euclid(&self, rhs: Beat) -> TimelineResult<Beat> {
        let q = self.div_floor(rhs)?;
        rhs.checked_mul(q)
            .and_then(|whole| self.checked_sub(whole))
            .ok_or_else(|| TimelineError::Overflow(format!("{self} mod {rhs}")))
    }

    /// Lossy conversion used by the spline evaluator
    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    fn reduced(num: i128, den: i128) -> Option<Self> {
        let (mut num, mut den) = if den < 0 { (-num, -den) } else { (num, den) };
        let g = gcd(num.unsigned_abs(), den.unsigned_abs()) as i128;
        if g > 1 {
            num /= g;
            den /= g;
        }
        Some(Self {
            num: i64::try_from(num).ok()?,
            den: i64::try_from(den).ok()?,
        })
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.max(1)
}

impl Default for Beat {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<i64> for Beat {
    fn from(beats: i64) -> Self {
        Self::whole(beats)
    }
}

impl Add for Beat {
    type Output = Beat;

    /// # Panics
    ///
    /// Panics when the result does not fit; use [`Beat::checked_add`] on untrusted input.
    fn add(self, rhs: Beat) -> Beat {
        self.checked_add(rhs)
            .unwrap_or_else(|| panic!("overflow when adding beats {self} and {rhs}"))
    }
}

impl Sub for Beat {
    type Output = Beat;

    /// # Panics
    ///
    /// Panics when the result does not fit; use [`Beat::checked_sub`] on untrusted input.
    fn sub(self, rhs: Beat) -> Beat {
        self.checked_sub(rhs)
            .unwrap_or_else(|| panic!("overflow when subtracting beats {self} and {rhs}"))
    }
}

impl Neg for Beat {
    type Output = Beat;

    fn neg(self) -> Beat {
        self.checked_neg()
            .unwrap_or_else(|| panic!("overflow when negating beat {self}"))
    }
}

impl Mul<i64> for Beat {
    type Output = Beat;

    /// # Panics
    ///
    /// Panics when the result does not fit; use [`Beat::checked_mul`] on untrusted input.
    fn mul(self, rhs: i64) -> Beat {
        self.checked_mul(rhs)
            .unwrap_or_else(|| panic!("overflow when multiplying beat {self} by {rhs}"))
    }
}

impl Ord for Beat {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = i128::from(self.num) * i128::from(other.den);
        let rhs = i128::from(other.num) * i128::from(self.den);
        lhs.cmp(&rhs)
    }
}

impl PartialOrd for Beat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Beat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl FromStr for Beat {
    type Err = TimelineError;

    fn from_str(s: &str) -> TimelineResult<Self> {
        let invalid = || TimelineError::InvalidBeat(s.to_string());
        let s = s.trim();
        match s.split_once('/') {
            Some((num, den)) => {
                let num = num.trim().parse::<i64>().map_err(|_| invalid())?;
                let den = den.trim().parse::<i64>().map_err(|_| invalid())?;
                Beat::new(num, den)
            }
            None => s.parse::<i64>().map(Beat::whole).map_err(|_| invalid()),
        }
    }
}

impl TryFrom<String> for Beat {
    type Error = TimelineError;

    fn try_from(value: String) -> TimelineResult<Self> {
        value.parse()
    }
}

impl From<Beat> for String {
    fn from(beat: Beat) -> Self {
        beat.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(num: i64, den: i64) -> Beat {
        Beat::new(num, den).unwrap()
    }

    #[test]
    fn test_reduction_and_sign() {
        assert_eq!(b(2, 4), b(1, 2));
        assert_eq!(b(3, -6), b(-1, 2));
        assert_eq!(b(-3, -6).denom(), 2);
        assert_eq!(b(0, 7), Beat::ZERO);
        assert!(Beat::new(1, 0).is_err());
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(b(1, 2) + b(1, 3), b(5, 6));
        assert_eq!(b(1, 2) - b(3, 4), b(-1, 4));
        assert_eq!(b(3, 4) * 4, Beat::whole(3));
        assert!(b(1, 3) < b(1, 2));
        assert!(b(-1, 2) < Beat::ZERO);
    }

    #[test]
    fn test_div_floor_handles_negatives() {
        let four = Beat::whole(4);
        assert_eq!(b(9, 2).div_floor(four).unwrap(), 1);
        assert_eq!(b(-1, 2).div_floor(four).unwrap(), -1);
        assert_eq!(Beat::whole(-4).div_floor(four).unwrap(), -1);
        assert_eq!(b(-1, 2).rem_euclid(four).unwrap(), b(7, 2));
        assert_eq!(Beat::whole(8).rem_euclid(four).unwrap(), Beat::ZERO);
        assert_eq!(Beat::whole(1).div_floor(Beat::ZERO), Err(TimelineError::ZeroLoopLength));
    }

    #[test]
    fn test_overflow_is_reported() {
        let max = Beat::whole(i64::MAX);
        assert_eq!(max.checked_add(Beat::whole(1)), None);
        assert_eq!(max.checked_mul(2), None);
        assert_eq!(Beat::whole(i64::MIN).checked_neg(), None);
        assert_eq!(Beat::whole(i64::MIN).checked_sub(Beat::whole(1)), None);
        assert!(Beat::new(1, i64::MIN).is_err());

        // Coprime denominators whose product leaves i64
        let p = b(1, 4_294_967_311);
        let q = b(1, 4_294_967_357);
        assert_eq!(p.checked_add(q), None);

        let tiny = b(1, i64::MAX);
        assert!(matches!(max.div_floor(tiny), Err(TimelineError::Overflow(_))));
        assert_eq!(max.checked_add(Beat::whole(-1)), Some(Beat::whole(i64::MAX - 1)));
    }

    #[test]
    #[should_panic(expected = "overflow when adding beats")]
    fn test_operator_overflow_panics() {
        let _ = Beat::whole(i64::MAX) + Beat::whole(1);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("3/2".parse::<Beat>().unwrap(), b(3, 2));
        assert_eq!(" 5 ".parse::<Beat>().unwrap(), Beat::whole(5));
        assert_eq!(b(6, 4).to_string(), "3/2");
        assert_eq!(Beat::whole(-2).to_string(), "-2");
        assert!("1/x".parse::<Beat>().is_err());
        assert!("2/0".parse::<Beat>().is_err());
    }

    #[test]
    fn test_serialization() {
        let ron_str = ron::to_string(&b(7, 3)).unwrap();
        assert_eq!(ron_str, "\"7/3\"");
        let loaded: Beat = ron::from_str(&ron_str).unwrap();
        assert_eq!(loaded, b(7, 3));
    }
}
