//! Exact rational arithmetic for durations, meters and note lengths
//!
//! Every duration computation in the formatter and the context interpreter
//! goes through this type; floating point is only used at the display
//! boundary (`to_f64`). Values are always stored in lowest terms with the
//! sign on the numerator. A denominator of zero encodes signed infinity,
//! which duration math uses for multi-measure rests (a bar that can never
//! be filled further); infinite values are never serialized to output.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Maximum denominator admitted by `from_float`'s continued-fraction search.
const MAX_FROM_FLOAT_DENOMINATOR: i64 = 10_000;

/// An exact fraction, normalized on construction.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rational {
    num: i64,
    den: i64,
}

impl Default for Rational {
    /// The zero value. Not derived: a derived default would be 0/0,
    /// which this type reserves for signed infinity.
    fn default() -> Self {
        Self::zero()
    }
}

impl Rational {
    /// Create a rational, reducing by GCD and normalizing the sign onto
    /// the numerator. A zero denominator yields signed infinity.
    pub fn new(num: i64, den: i64) -> Self {
        if den == 0 {
            // Signed infinity: keep only the sign of the numerator.
            return Self {
                num: if num < 0 { -1 } else { 1 },
                den: 0,
            };
        }
        let sign = if (num < 0) != (den < 0) { -1 } else { 1 };
        let num = num.abs();
        let den = den.abs();
        let g = gcd(num, den);
        Self {
            num: sign * (num / g),
            den: den / g,
        }
    }

    /// The rational 0/1.
    pub fn zero() -> Self {
        Self { num: 0, den: 1 }
    }

    /// The rational 1/1.
    pub fn one() -> Self {
        Self { num: 1, den: 1 }
    }

    pub fn from_integer(n: i64) -> Self {
        Self { num: n, den: 1 }
    }

    pub fn numerator(&self) -> i64 {
        self.num
    }

    pub fn denominator(&self) -> i64 {
        self.den
    }

    /// True for the reserved denominator-zero encoding.
    pub fn is_infinite(&self) -> bool {
        self.den == 0
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0 && self.den != 0
    }

    pub fn add(&self, other: &Rational) -> Rational {
        if self.is_infinite() {
            return *self;
        }
        if other.is_infinite() {
            return *other;
        }
        Rational::new(self.num * other.den + other.num * self.den, self.den * other.den)
    }

    pub fn subtract(&self, other: &Rational) -> Rational {
        if self.is_infinite() {
            return *self;
        }
        if other.is_infinite() {
            return Rational { num: -other.num, den: 0 };
        }
        Rational::new(self.num * other.den - other.num * self.den, self.den * other.den)
    }

    pub fn multiply(&self, other: &Rational) -> Rational {
        if self.is_infinite() || other.is_infinite() {
            let sign = sign_of(self.num) * sign_of(other.num);
            return Rational { num: if sign < 0 { -1 } else { 1 }, den: 0 };
        }
        Rational::new(self.num * other.num, self.den * other.den)
    }

    /// Division by a zero-valued rational yields signed infinity rather
    /// than an error; bar-length accumulation relies on this for
    /// whole-measure rests.
    pub fn divide(&self, other: &Rational) -> Rational {
        if other.is_zero() {
            return Rational { num: if self.num < 0 { -1 } else { 1 }, den: 0 };
        }
        if other.is_infinite() {
            return Rational::zero();
        }
        if self.is_infinite() {
            let sign = sign_of(self.num) * sign_of(other.num);
            return Rational { num: if sign < 0 { -1 } else { 1 }, den: 0 };
        }
        Rational::new(self.num * other.den, self.den * other.num)
    }

    /// Three-way comparison. Positive infinity sorts above every finite
    /// value, negative infinity below.
    pub fn compare(&self, other: &Rational) -> Ordering {
        match (self.is_infinite(), other.is_infinite()) {
            (true, true) => self.num.cmp(&other.num),
            (true, false) => {
                if self.num > 0 {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (false, true) => {
                if other.num > 0 {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (false, false) => (self.num * other.den).cmp(&(other.num * self.den)),
        }
    }

    /// Equality after normalization (construction already normalizes, so
    /// this is field equality).
    pub fn equal(&self, other: &Rational) -> bool {
        self == other
    }

    pub fn to_f64(&self) -> f64 {
        if self.den == 0 {
            if self.num < 0 {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            }
        } else {
            self.num as f64 / self.den as f64
        }
    }

    /// Approximate a float as a rational.
    ///
    /// Short decimal literals (up to four fractional digits) convert
    /// exactly via a power-of-ten denominator; anything else falls back to
    /// a continued-fraction expansion bounded by a maximum denominator.
    pub fn from_float(value: f64) -> Rational {
        if !value.is_finite() {
            return Rational {
                num: if value < 0.0 { -1 } else { 1 },
                den: 0,
            };
        }
        // Fast path: short decimals like 0.75 or 1.5 are exact in 10^4.
        let scaled = value * 10_000.0;
        if (scaled - scaled.round()).abs() < 1e-9 {
            return Rational::new(scaled.round() as i64, 10_000);
        }

        let negative = value < 0.0;
        let mut x = value.abs();
        let (mut h0, mut h1) = (0i64, 1i64);
        let (mut k0, mut k1) = (1i64, 0i64);
        for _ in 0..64 {
            let a = x.floor() as i64;
            let h2 = a * h1 + h0;
            let k2 = a * k1 + k0;
            if k2 > MAX_FROM_FLOAT_DENOMINATOR {
                break;
            }
            h0 = h1;
            h1 = h2;
            k0 = k1;
            k1 = k2;
            let frac = x - x.floor();
            if frac.abs() < 1e-12 {
                break;
            }
            x = 1.0 / frac;
        }
        Rational::new(if negative { -h1 } else { h1 }, k1)
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 0 {
            write!(f, "{}inf", if self.num < 0 { "-" } else { "" })
        } else if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    if a == 0 {
        1
    } else {
        a
    }
}

fn sign_of(n: i64) -> i64 {
    if n < 0 {
        -1
    } else {
        1
    }
}
