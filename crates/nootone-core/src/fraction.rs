//! Exact rational arithmetic for rhythmic time values
//!
//! Onsets and durations in the score are kept as fractions of a whole note so
//! that beat and measure sums can be compared exactly. [`decimal_to_fraction`]
//! is the one place where a continuous time value is snapped onto a notatable
//! grid.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A rational number `n/d`. The denominator is always positive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Fraction {
    pub n: i64,
    pub d: i64,
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl Fraction {
    pub const ZERO: Fraction = Fraction { n: 0, d: 1 };
    pub const ONE: Fraction = Fraction { n: 1, d: 1 };

    /// Build a reduced fraction. Panics if `d` is zero.
    pub fn new(n: i64, d: i64) -> Self {
        assert!(d != 0, "fraction denominator must be non-zero");
        Self { n, d }.reduce()
    }

    pub fn from_integer(n: i64) -> Self {
        Self { n, d: 1 }
    }

    /// Divide out the greatest common divisor and move the sign to the numerator.
    pub fn reduce(self) -> Self {
        let sign = if self.d < 0 { -1 } else { 1 };
        let divisor = gcd(self.n, self.d).max(1);
        Self {
            n: sign * self.n / divisor,
            d: sign * self.d / divisor,
        }
    }

    pub fn to_f64(self) -> f64 {
        self.n as f64 / self.d as f64
    }

    pub fn is_zero(self) -> bool {
        self.n == 0
    }

    /// Real-valued remainder of `self / rhs`, quantized back onto the given denominators.
    pub fn modulo(self, rhs: Fraction, denominators: &[u32]) -> Fraction {
        decimal_to_fraction(self.to_f64() % rhs.to_f64(), denominators)
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.n, self.d)
    }
}

impl PartialEq for Fraction {
    fn eq(&self, other: &Self) -> bool {
        self.n as i128 * other.d as i128 == other.n as i128 * self.d as i128
    }
}

impl Eq for Fraction {}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.n as i128 * other.d as i128).cmp(&(other.n as i128 * self.d as i128))
    }
}

impl Add for Fraction {
    type Output = Fraction;

    fn add(self, rhs: Fraction) -> Fraction {
        Fraction::new(self.n * rhs.d + rhs.n * self.d, self.d * rhs.d)
    }
}

impl Sub for Fraction {
    type Output = Fraction;

    fn sub(self, rhs: Fraction) -> Fraction {
        Fraction::new(self.n * rhs.d - rhs.n * self.d, self.d * rhs.d)
    }
}

impl Mul for Fraction {
    type Output = Fraction;

    fn mul(self, rhs: Fraction) -> Fraction {
        Fraction::new(self.n * rhs.n, self.d * rhs.d)
    }
}

impl Div for Fraction {
    type Output = Fraction;

    fn div(self, rhs: Fraction) -> Fraction {
        assert!(rhs.n != 0, "division by a zero fraction");
        Fraction::new(self.n * rhs.d, self.d * rhs.n)
    }
}

impl Neg for Fraction {
    type Output = Fraction;

    fn neg(self) -> Fraction {
        Fraction { n: -self.n, d: self.d }
    }
}

impl Sum for Fraction {
    fn sum<I: Iterator<Item = Fraction>>(iter: I) -> Fraction {
        iter.fold(Fraction::ZERO, |acc, f| acc + f)
    }
}

/// Snap a real value to the closest fraction whose denominator is one of `denominators`.
///
/// The denominator minimizing `|d·frac − round(d·frac)|` wins; on a tie the
/// first candidate is kept. With no usable candidates the value is rounded to
/// a whole number. Panics on a non-finite value.
pub fn decimal_to_fraction(value: f64, denominators: &[u32]) -> Fraction {
    assert!(value.is_finite(), "cannot quantize a non-finite value");

    let sign = if value < 0.0 { -1 } else { 1 };
    let magnitude = value.abs();
    let whole = magnitude.floor();
    let frac = magnitude - whole;

    let mut best_d = 1_i64;
    let mut best_error = f64::INFINITY;
    for &d in denominators.iter().filter(|&&d| d > 0) {
        let scaled = d as f64 * frac;
        let error = (scaled - scaled.round()).abs();
        if error < best_error {
            best_error = error;
            best_d = d as i64;
        }
    }

    let numerator = (best_d as f64 * frac).round() as i64;
    Fraction::new(sign * (whole as i64 * best_d + numerator), best_d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_removes_common_factors() {
        let f = Fraction { n: 6, d: 8 }.reduce();
        assert_eq!((f.n, f.d), (3, 4));

        let f = Fraction { n: 3, d: -9 }.reduce();
        assert_eq!((f.n, f.d), (-1, 3));

        let f = Fraction { n: 0, d: 5 }.reduce();
        assert_eq!((f.n, f.d), (0, 1));
    }

    #[test]
    fn test_arithmetic() {
        let a = Fraction::new(1, 4);
        let b = Fraction::new(1, 6);
        assert_eq!(a + b, Fraction::new(5, 12));
        assert_eq!(a - b, Fraction::new(1, 12));
        assert_eq!(a * b, Fraction::new(1, 24));
        assert_eq!(a / b, Fraction::new(3, 2));
        assert_eq!(-a, Fraction::new(-1, 4));
    }

    #[test]
    fn test_arithmetic_is_associative_and_commutative() {
        let values = [
            Fraction::new(1, 3),
            Fraction::new(-5, 8),
            Fraction::new(7, 16),
            Fraction::new(2, 1),
        ];
        for &a in &values {
            for &b in &values {
                assert_eq!(a + b, b + a);
                assert_eq!(a * b, b * a);
                for &c in &values {
                    assert_eq!((a + b) + c, a + (b + c));
                    assert_eq!((a * b) * c, a * (b * c));
                }
            }
        }
    }

    #[test]
    fn test_results_are_reduced() {
        let sum = Fraction::new(1, 8) + Fraction::new(3, 8);
        assert_eq!((sum.n, sum.d), (1, 2));
        assert_eq!(gcd(sum.n, sum.d), 1);
    }

    #[test]
    fn test_comparisons() {
        let half = Fraction::new(1, 2);
        let third = Fraction::new(1, 3);
        assert!(third < half);
        assert!(half <= Fraction::new(2, 4));
        assert!(half >= Fraction::new(2, 4));
        assert!(half > third);
        assert_eq!(half.min(third), third);
        assert_eq!(half.max(third), half);
        assert_eq!(Fraction::new(2, 4), Fraction::new(1, 2));
    }

    #[test]
    fn test_sum() {
        let total: Fraction = [Fraction::new(1, 8), Fraction::new(1, 8), Fraction::new(1, 4)]
            .into_iter()
            .sum();
        assert_eq!(total, Fraction::new(1, 2));
    }

    #[test]
    fn test_decimal_to_fraction_round_trip() {
        let fractions = [
            Fraction::new(3, 4),
            Fraction::new(-7, 3),
            Fraction::new(5, 16),
            Fraction::new(9, 2),
            Fraction::new(0, 1),
        ];
        for f in fractions {
            let denominator = f.d as u32;
            assert_eq!(decimal_to_fraction(f.to_f64(), &[denominator]), f.reduce());
        }
    }

    #[test]
    fn test_decimal_to_fraction_picks_closest_denominator() {
        // 0.33 fits thirds better than quarters
        assert_eq!(decimal_to_fraction(0.33, &[4, 3]), Fraction::new(1, 3));
        // snaps to the nearest sixteenth
        assert_eq!(decimal_to_fraction(0.26, &[16]), Fraction::new(1, 4));
        assert_eq!(decimal_to_fraction(-0.25, &[16]), Fraction::new(-1, 4));
        // no candidates rounds to whole numbers
        assert_eq!(decimal_to_fraction(2.6, &[]), Fraction::new(3, 1));
    }

    #[test]
    fn test_modulo() {
        let a = Fraction::new(7, 4);
        let b = Fraction::new(1, 2);
        assert_eq!(a.modulo(b, &[1000]), Fraction::new(1, 4));
    }

    #[test]
    #[should_panic]
    fn test_zero_denominator_panics() {
        let _ = Fraction::new(1, 0);
    }
}
