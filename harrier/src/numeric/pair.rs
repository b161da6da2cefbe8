use rug::Rational;
use std::{cmp::Ordering, fmt, ops};

/// A lexicographically ordered pair of rationals.
///
/// Bound handling uses these as values of the form `x + y·δ`, where `δ` is an arbitrarily small
/// positive symbolic amount: the `x` component is the actual bound, and the `y` component encodes
/// strictness. Arithmetic is component-wise, and the ordering is lexicographic, which is exactly
/// the ordering of `x + y·δ` for a small enough `δ`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LexPair {
    pub x: Rational,
    pub y: Rational,
}

impl LexPair {
    pub fn new(x: impl Into<Rational>, y: impl Into<Rational>) -> Self {
        Self { x: x.into(), y: y.into() }
    }

    pub fn is_zero(&self) -> bool {
        self.x.is_zero() && self.y.is_zero()
    }

    /// A pair is an integer when its first component is an integer and the infinitesimal
    /// component vanishes.
    pub fn is_int(&self) -> bool {
        self.x.is_integer() && self.y.is_zero()
    }

    /// The largest integer not above the pair. The infinitesimal component only matters when the
    /// first component is itself an integer.
    pub fn floor(&self) -> Rational {
        if self.x.is_integer() {
            if self.y >= 0 {
                self.x.clone()
            } else {
                self.x.clone() - 1
            }
        } else {
            self.x.clone().floor()
        }
    }

    /// The smallest integer not below the pair. Symmetric to [`LexPair::floor`].
    pub fn ceil(&self) -> Rational {
        if self.x.is_integer() {
            if self.y <= 0 {
                self.x.clone()
            } else {
                self.x.clone() + 1
            }
        } else {
            self.x.clone().ceil()
        }
    }
}

impl From<Rational> for LexPair {
    fn from(x: Rational) -> Self {
        Self { x, y: Rational::new() }
    }
}

impl PartialOrd for LexPair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LexPair {
    fn cmp(&self, other: &Self) -> Ordering {
        self.x.cmp(&other.x).then_with(|| self.y.cmp(&other.y))
    }
}

impl ops::Add for LexPair {
    type Output = LexPair;

    fn add(self, rhs: LexPair) -> LexPair {
        LexPair {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl ops::Sub for LexPair {
    type Output = LexPair;

    fn sub(self, rhs: LexPair) -> LexPair {
        LexPair {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl ops::Neg for LexPair {
    type Output = LexPair;

    fn neg(self) -> LexPair {
        LexPair { x: -self.x, y: -self.y }
    }
}

impl ops::Mul<&Rational> for LexPair {
    type Output = LexPair;

    fn mul(self, rhs: &Rational) -> LexPair {
        LexPair {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl fmt::Display for LexPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.y.is_zero() {
            write!(f, "{}", self.x)
        } else {
            write!(f, "{} + {}*delta", self.x, self.y)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(x: i32, y: i32) -> LexPair {
        LexPair::new(x, y)
    }

    #[test]
    fn test_lex_order() {
        assert!(pair(1, 0) < pair(2, 0));
        assert!(pair(1, 5) < pair(2, -5));
        assert!(pair(1, -1) < pair(1, 0));
        assert!(pair(1, 0) < pair(1, 1));
        assert_eq!(pair(3, 2), pair(3, 2));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(pair(1, 2) + pair(3, 4), pair(4, 6));
        assert_eq!(pair(1, 2) - pair(3, 4), pair(-2, -2));
        assert_eq!(-pair(1, -2), pair(-1, 2));
        assert_eq!(pair(2, 3) * &Rational::from(2), pair(4, 6));
    }

    #[test]
    fn test_floor_ceil() {
        // A strict upper bound `x < 2` is encoded as `2 - delta`; its floor over the integers
        // is 1, not 2
        assert_eq!(pair(2, -1).floor(), 1);
        assert_eq!(pair(2, 0).floor(), 2);
        assert_eq!(pair(2, 1).floor(), 2);
        assert_eq!(pair(2, 1).ceil(), 3);
        assert_eq!(pair(2, -1).ceil(), 2);

        let half = LexPair::new(Rational::from((5, 2)), Rational::new());
        assert_eq!(half.floor(), 2);
        assert_eq!(half.ceil(), 3);

        assert!(pair(2, 0).is_int());
        assert!(!pair(2, -1).is_int());
    }
}
