//! Extended naturals (ℕ ∪ {∞}) and closed ranges over them.
//!
//! Infinity compares greater than every finite value and absorbs under
//! addition and multiplication, except `0 * ∞ = 0`. Finite arithmetic that
//! overflows `u128` widens to infinity; every overflow site in this crate
//! is an upper bound, where widening is sound.

use std::cmp::Ordering;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Cardinality {
    Fin(u128),
    Infinity,
}

impl Cardinality {
    pub const ZERO: Cardinality = Cardinality::Fin(0);
    pub const ONE: Cardinality = Cardinality::Fin(1);
    pub const INFINITY: Cardinality = Cardinality::Infinity;

    pub fn fin(v: u128) -> Cardinality {
        Cardinality::Fin(v)
    }

    pub fn is_finite(self) -> bool {
        matches!(self, Cardinality::Fin(_))
    }

    pub fn is_zero(self) -> bool {
        self == Cardinality::ZERO
    }

    /// The finite value; panics on infinity.
    pub fn finite(self) -> u128 {
        match self {
            Cardinality::Fin(v) => v,
            Cardinality::Infinity => panic!("finite() on an infinite cardinality"),
        }
    }

    pub fn add(self, other: Cardinality) -> Cardinality {
        match (self, other) {
            (Cardinality::Fin(a), Cardinality::Fin(b)) => match a.checked_add(b) {
                Some(v) => Cardinality::Fin(v),
                None => Cardinality::Infinity,
            },
            _ => Cardinality::Infinity,
        }
    }

    pub fn mul(self, other: Cardinality) -> Cardinality {
        if self.is_zero() || other.is_zero() {
            return Cardinality::ZERO;
        }
        match (self, other) {
            (Cardinality::Fin(a), Cardinality::Fin(b)) => match a.checked_mul(b) {
                Some(v) => Cardinality::Fin(v),
                None => Cardinality::Infinity,
            },
            _ => Cardinality::Infinity,
        }
    }

    /// Subtraction. The subtrahend must be finite and no greater than the
    /// minuend; anything else is a programming error.
    pub fn sub(self, other: Cardinality) -> Cardinality {
        match (self, other) {
            (_, Cardinality::Infinity) => panic!("cannot subtract an infinite cardinality"),
            (Cardinality::Infinity, Cardinality::Fin(_)) => Cardinality::Infinity,
            (Cardinality::Fin(a), Cardinality::Fin(b)) => {
                assert!(b <= a, "cardinality underflow: {a} - {b}");
                Cardinality::Fin(a - b)
            }
        }
    }
}

impl PartialOrd for Cardinality {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cardinality {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Cardinality::Infinity, Cardinality::Infinity) => Ordering::Equal,
            (Cardinality::Infinity, Cardinality::Fin(_)) => Ordering::Greater,
            (Cardinality::Fin(_), Cardinality::Infinity) => Ordering::Less,
            (Cardinality::Fin(a), Cardinality::Fin(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::Fin(v) => write!(f, "{v}"),
            Cardinality::Infinity => write!(f, "inf"),
        }
    }
}

impl From<u64> for Cardinality {
    fn from(v: u64) -> Self {
        Cardinality::Fin(v as u128)
    }
}

/// A closed interval `[lower, upper]` over extended naturals.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CardRange {
    pub lower: Cardinality,
    pub upper: Cardinality,
}

impl CardRange {
    pub const FULL: CardRange = CardRange {
        lower: Cardinality::ZERO,
        upper: Cardinality::Infinity,
    };

    pub fn new(lower: Cardinality, upper: Cardinality) -> CardRange {
        CardRange { lower, upper }
    }

    pub fn point(v: Cardinality) -> CardRange {
        CardRange { lower: v, upper: v }
    }

    pub fn is_empty(self) -> bool {
        self.lower > self.upper
    }

    pub fn is_point(self) -> bool {
        self.lower == self.upper
    }

    pub fn contains(self, v: Cardinality) -> bool {
        self.lower <= v && v <= self.upper
    }

    /// Intersection of two ranges; may come out empty.
    pub fn meet(self, other: CardRange) -> CardRange {
        CardRange {
            lower: self.lower.max(other.lower),
            upper: self.upper.min(other.upper),
        }
    }

    /// Split at the midpoint. `shift_lower = true` keeps the upper half
    /// `[mid, upper]`, otherwise the lower half `[lower, mid]`; the
    /// midpoint belongs to both. Requires a finite upper bound and a
    /// nondegenerate range, and strictly shrinks the range until
    /// `upper - lower <= 1`.
    pub fn bisect(self, shift_lower: bool) -> CardRange {
        let lo = self.lower.finite();
        let hi = match self.upper {
            Cardinality::Fin(v) => v,
            Cardinality::Infinity => panic!("bisect requires a finite upper bound"),
        };
        assert!(lo <= hi, "bisect on an empty range");
        let mid = lo + (hi - lo) / 2;
        if shift_lower {
            CardRange::new(Cardinality::Fin(mid), Cardinality::Fin(hi))
        } else {
            CardRange::new(Cardinality::Fin(lo), Cardinality::Fin(mid))
        }
    }
}

impl fmt::Display for CardRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}
