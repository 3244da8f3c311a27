/*!
    Rational number type for time bases and frame rates.
*/

use std::cmp::Ordering;
use std::fmt;

/**
    A rational number represented as a numerator and denominator.

    Used for time bases (e.g., 1/90000 for MPEG-TS) and frame rates
    (e.g., 24000/1001 for 23.976 fps).

    Equality is structural (`1/2 != 2/4`). Use [`Rational::cmp_value`] to
    compare the represented values.
*/
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    /**
        Create a new rational number.

        # Panics

        Panics if `den` is zero.
    */
    #[inline]
    pub const fn new(num: i32, den: i32) -> Self {
        assert!(den != 0, "denominator cannot be zero");
        Self { num, den }
    }

    /**
        Convert to f64.
    */
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /**
        Invert the rational (swap numerator and denominator).

        # Panics

        Panics if numerator is zero.
    */
    #[inline]
    pub const fn invert(self) -> Self {
        assert!(self.num != 0, "cannot invert zero");
        Self {
            num: self.den,
            den: self.num,
        }
    }

    /**
        Invert the rational, or `None` if the numerator is zero.
    */
    #[inline]
    pub const fn checked_invert(self) -> Option<Self> {
        if self.num == 0 {
            return None;
        }
        Some(Self {
            num: self.den,
            den: self.num,
        })
    }

    /**
        Numerator and denominator widened to `i128`, with the sign moved
        onto the numerator.
    */
    #[inline]
    fn widened(self) -> (i128, i128) {
        if self.den < 0 {
            (-(self.num as i128), -(self.den as i128))
        } else {
            (self.num as i128, self.den as i128)
        }
    }

    /**
        Approximate a floating point value with a rational whose numerator
        and denominator both stay within `max`.

        Walks the continued fraction expansion of `value` and keeps the last
        convergent that fits. Non-finite input maps to `0/1`.
    */
    pub fn from_f64(value: f64, max: i64) -> Self {
        if !value.is_finite() || max <= 0 {
            return Self::new(0, 1);
        }
        let max = max.min(i32::MAX as i64);
        let negative = value < 0.0;
        let mut x = value.abs();

        // Convergents h(n)/k(n), seeded with h(-1)/k(-1) = 1/0 and h(-2)/k(-2) = 0/1
        let (mut h_prev, mut h) = (0i64, 1i64);
        let (mut k_prev, mut k) = (1i64, 0i64);
        let mut best = (0i64, 1i64);

        for _ in 0..64 {
            let a = x.floor();
            if a > max as f64 {
                break;
            }
            let a = a as i64;
            let h_next = a.saturating_mul(h).saturating_add(h_prev);
            let k_next = a.saturating_mul(k).saturating_add(k_prev);
            if h_next > max || k_next > max {
                break;
            }
            (h_prev, h) = (h, h_next);
            (k_prev, k) = (k, k_next);
            best = (h, k);

            let frac = x - a as f64;
            if frac < 1e-12 {
                break;
            }
            x = 1.0 / frac;
        }

        let (num, den) = best;
        let num = if negative { -num } else { num };
        Self::new(num as i32, den.max(1) as i32)
    }

    /**
        Rescale `value` expressed in `from` units into `to` units,
        rounding to the nearest integer (halfway cases away from zero).

        Computes `value * from / to` in 128-bit arithmetic, so no
        intermediate product overflows for 64-bit inputs. Results outside
        the `i64` range saturate.
    */
    pub fn rescale(value: i64, from: Rational, to: Rational) -> i64 {
        let (from_num, from_den) = from.widened();
        let (to_num, to_den) = to.widened();

        let numerator = value as i128 * from_num * to_den;
        let denominator = from_den * to_num;
        if denominator == 0 {
            return 0;
        }
        let (numerator, denominator) = if denominator < 0 {
            (-numerator, -denominator)
        } else {
            (numerator, denominator)
        };

        let half = denominator / 2;
        let rounded = if numerator >= 0 {
            (numerator + half) / denominator
        } else {
            -((-numerator + half) / denominator)
        };
        rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    /**
        Compare the represented values exactly, by cross-multiplying in
        128-bit arithmetic.
    */
    pub fn cmp_value(self, other: Rational) -> Ordering {
        let (a_num, a_den) = self.widened();
        let (b_num, b_den) = other.widened();
        (a_num * b_den).cmp(&(b_num * a_den))
    }

    /**
        Index of the entry in `candidates` closest to `self`.

        Distances are compared exactly. Ties go to the earlier entry.
        Returns `None` for an empty slice.
    */
    pub fn nearest_index(self, candidates: &[Rational]) -> Option<usize> {
        let (num, den) = self.widened();
        let mut best: Option<(usize, i128, i128)> = None;

        for (idx, candidate) in candidates.iter().enumerate() {
            let (c_num, c_den) = candidate.widened();
            if c_den == 0 {
                continue;
            }
            // |num/den - c_num/c_den| = |num*c_den - c_num*den| / (den*c_den)
            let dist_num = (num * c_den - c_num * den).abs();
            let dist_den = den * c_den;
            let closer = match best {
                None => true,
                Some((_, best_num, best_den)) => dist_num * best_den < best_num * dist_den,
            };
            if closer {
                best = Some((idx, dist_num, dist_den));
            }
        }

        best.map(|(idx, _, _)| idx)
    }
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl From<(i32, i32)> for Rational {
    fn from((num, den): (i32, i32)) -> Self {
        Self::new(num, den)
    }
}

impl From<i32> for Rational {
    fn from(num: i32) -> Self {
        Self::new(num, 1)
    }
}
