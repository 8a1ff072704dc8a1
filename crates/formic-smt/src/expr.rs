//! Backend expression tree with folding smart constructors.
//!
//! An embedding emits these trees; the symbolic-execution layer hands
//! them to the actual backend. The smart constructors do the obvious
//! literal folding so that ground coercions collapse to ground values,
//! which is what the model decoder depends on: a coercion of a literal
//! must evaluate to a literal without a solver round trip.

use crate::sort::{DatatypeId, SortId};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BExpr {
    BoolLit(bool),
    IntLit(i128),
    /// A rational literal `num / den`, `den >= 1`.
    RealLit { num: i128, den: u64 },
    BvLit { value: u64, width: u32 },
    /// A free constant of the given sort, named by the caller.
    Var(String, SortId),

    Construct(DatatypeId, u32, Vec<BExpr>),
    /// `(is-ctor e)`.
    Tester(DatatypeId, u32, Box<BExpr>),
    /// `(field_k e)` of constructor `ctor`.
    Accessor(DatatypeId, u32, u32, Box<BExpr>),

    Not(Box<BExpr>),
    And(Vec<BExpr>),
    Or(Vec<BExpr>),
    Eq(Box<BExpr>, Box<BExpr>),
    Le(Box<BExpr>, Box<BExpr>),
    Lt(Box<BExpr>, Box<BExpr>),

    Add(Vec<BExpr>),
    Mul(Vec<BExpr>),
    Sub(Box<BExpr>, Box<BExpr>),
    Neg(Box<BExpr>),
    /// Euclidean integer division.
    Div(Box<BExpr>, Box<BExpr>),
    /// Euclidean remainder.
    Mod(Box<BExpr>, Box<BExpr>),
    /// True iff a Real value is integral.
    IsInt(Box<BExpr>),
    /// Real-to-Int conversion (floor).
    ToInt(Box<BExpr>),
    /// Int-to-Real conversion.
    ToReal(Box<BExpr>),
    /// Integer-valued view of a bit-vector (unsigned).
    BvToInt(Box<BExpr>),
    /// Truncating unsigned integer-to-bit-vector conversion.
    IntToBv(u32, Box<BExpr>),

    Ite(Box<BExpr>, Box<BExpr>, Box<BExpr>),
}

impl BExpr {
    pub const TRUE: BExpr = BExpr::BoolLit(true);
    pub const FALSE: BExpr = BExpr::BoolLit(false);

    pub fn int(v: i128) -> BExpr {
        BExpr::IntLit(v)
    }

    pub fn real(num: i128, den: u64) -> BExpr {
        assert!(den >= 1, "zero denominator");
        BExpr::RealLit { num, den }
    }

    pub fn bv(value: u64, width: u32) -> BExpr {
        debug_assert!(width >= 1 && (width >= 64 || value < (1u64 << width)));
        BExpr::BvLit { value, width }
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            BExpr::BoolLit(_) | BExpr::IntLit(_) | BExpr::RealLit { .. } | BExpr::BvLit { .. }
        ) || matches!(self, BExpr::Construct(_, _, args) if args.iter().all(BExpr::is_literal))
    }

    /// A literal whose structural equality is value equality: any literal
    /// with no rational inside.
    fn is_exact_literal(&self) -> bool {
        match self {
            BExpr::BoolLit(_) | BExpr::IntLit(_) | BExpr::BvLit { .. } => true,
            BExpr::Construct(_, _, args) => args.iter().all(BExpr::is_exact_literal),
            _ => false,
        }
    }

    pub fn not(e: BExpr) -> BExpr {
        match e {
            BExpr::BoolLit(b) => BExpr::BoolLit(!b),
            BExpr::Not(inner) => *inner,
            other => BExpr::Not(Box::new(other)),
        }
    }

    pub fn and(parts: Vec<BExpr>) -> BExpr {
        let mut flat = Vec::with_capacity(parts.len());
        for p in parts {
            match p {
                BExpr::BoolLit(true) => {}
                BExpr::BoolLit(false) => return BExpr::FALSE,
                BExpr::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => BExpr::TRUE,
            1 => flat.pop().expect("len checked"),
            _ => BExpr::And(flat),
        }
    }

    pub fn or(parts: Vec<BExpr>) -> BExpr {
        let mut flat = Vec::with_capacity(parts.len());
        for p in parts {
            match p {
                BExpr::BoolLit(false) => {}
                BExpr::BoolLit(true) => return BExpr::TRUE,
                BExpr::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => BExpr::FALSE,
            1 => flat.pop().expect("len checked"),
            _ => BExpr::Or(flat),
        }
    }

    pub fn eq(a: BExpr, b: BExpr) -> BExpr {
        if a == b && a.is_literal() {
            return BExpr::TRUE;
        }
        match (&a, &b) {
            (BExpr::IntLit(x), BExpr::IntLit(y)) => BExpr::BoolLit(x == y),
            (BExpr::BvLit { value: x, .. }, BExpr::BvLit { value: y, .. }) => {
                BExpr::BoolLit(x == y)
            }
            (BExpr::BoolLit(x), BExpr::BoolLit(y)) => BExpr::BoolLit(x == y),
            // Datatype constructors are free, so structurally unequal
            // ground values are distinct. Rationals are excluded: their
            // literals are not normalized.
            _ if a.is_exact_literal() && b.is_exact_literal() => BExpr::BoolLit(a == b),
            _ => BExpr::Eq(Box::new(a), Box::new(b)),
        }
    }

    pub fn le(a: BExpr, b: BExpr) -> BExpr {
        match (&a, &b) {
            (BExpr::IntLit(x), BExpr::IntLit(y)) => BExpr::BoolLit(x <= y),
            _ => BExpr::Le(Box::new(a), Box::new(b)),
        }
    }

    pub fn lt(a: BExpr, b: BExpr) -> BExpr {
        match (&a, &b) {
            (BExpr::IntLit(x), BExpr::IntLit(y)) => BExpr::BoolLit(x < y),
            _ => BExpr::Lt(Box::new(a), Box::new(b)),
        }
    }

    pub fn ge(a: BExpr, b: BExpr) -> BExpr {
        BExpr::le(b, a)
    }

    pub fn gt(a: BExpr, b: BExpr) -> BExpr {
        BExpr::lt(b, a)
    }

    pub fn add(parts: Vec<BExpr>) -> BExpr {
        // Fold only when the sum stays representable; otherwise keep the
        // symbolic node.
        if parts.iter().all(|p| matches!(p, BExpr::IntLit(_))) {
            let sum = parts.iter().try_fold(0i128, |acc, p| match p {
                BExpr::IntLit(v) => acc.checked_add(*v),
                _ => unreachable!(),
            });
            if let Some(sum) = sum {
                return BExpr::IntLit(sum);
            }
        }
        match parts.len() {
            1 => parts.into_iter().next().expect("len checked"),
            _ => BExpr::Add(parts),
        }
    }

    pub fn sub(a: BExpr, b: BExpr) -> BExpr {
        if let (BExpr::IntLit(x), BExpr::IntLit(y)) = (&a, &b) {
            if let Some(d) = x.checked_sub(*y) {
                return BExpr::IntLit(d);
            }
        }
        BExpr::Sub(Box::new(a), Box::new(b))
    }

    pub fn mul(parts: Vec<BExpr>) -> BExpr {
        if parts.iter().all(|p| matches!(p, BExpr::IntLit(_))) {
            let product = parts.iter().try_fold(1i128, |acc, p| match p {
                BExpr::IntLit(v) => acc.checked_mul(*v),
                _ => unreachable!(),
            });
            if let Some(product) = product {
                return BExpr::IntLit(product);
            }
        }
        match parts.len() {
            1 => parts.into_iter().next().expect("len checked"),
            _ => BExpr::Mul(parts),
        }
    }

    pub fn neg(e: BExpr) -> BExpr {
        match e {
            BExpr::IntLit(v) if v != i128::MIN => BExpr::IntLit(-v),
            BExpr::Neg(inner) => *inner,
            other => BExpr::Neg(Box::new(other)),
        }
    }

    /// Euclidean division; folds on literals (divisor must be nonzero).
    pub fn div(a: BExpr, b: BExpr) -> BExpr {
        match (&a, &b) {
            (BExpr::IntLit(x), BExpr::IntLit(y)) if *y != 0 => BExpr::IntLit(x.div_euclid(*y)),
            _ => BExpr::Div(Box::new(a), Box::new(b)),
        }
    }

    pub fn modulo(a: BExpr, b: BExpr) -> BExpr {
        match (&a, &b) {
            (BExpr::IntLit(x), BExpr::IntLit(y)) if *y != 0 => BExpr::IntLit(x.rem_euclid(*y)),
            _ => BExpr::Mod(Box::new(a), Box::new(b)),
        }
    }

    pub fn is_int(e: BExpr) -> BExpr {
        match &e {
            BExpr::RealLit { num, den } => BExpr::BoolLit(num % (*den as i128) == 0),
            BExpr::IntLit(_) => BExpr::TRUE,
            _ => BExpr::IsInt(Box::new(e)),
        }
    }

    pub fn to_int(e: BExpr) -> BExpr {
        match &e {
            BExpr::RealLit { num, den } => BExpr::IntLit(num.div_euclid(*den as i128)),
            BExpr::IntLit(v) => BExpr::IntLit(*v),
            _ => BExpr::ToInt(Box::new(e)),
        }
    }

    pub fn to_real(e: BExpr) -> BExpr {
        match &e {
            BExpr::IntLit(v) => BExpr::RealLit { num: *v, den: 1 },
            BExpr::RealLit { .. } => e,
            _ => BExpr::ToReal(Box::new(e)),
        }
    }

    pub fn bv_to_int(e: BExpr) -> BExpr {
        match e {
            BExpr::BvLit { value, .. } => BExpr::IntLit(value as i128),
            other => BExpr::BvToInt(Box::new(other)),
        }
    }

    pub fn int_to_bv(width: u32, e: BExpr) -> BExpr {
        match e {
            BExpr::IntLit(v) if v >= 0 && (width >= 64 || (v as u128) < (1u128 << width)) => {
                BExpr::BvLit {
                    value: v as u64,
                    width,
                }
            }
            other => BExpr::IntToBv(width, Box::new(other)),
        }
    }

    pub fn ite(cond: BExpr, then: BExpr, els: BExpr) -> BExpr {
        match cond {
            BExpr::BoolLit(true) => then,
            BExpr::BoolLit(false) => els,
            c => BExpr::Ite(Box::new(c), Box::new(then), Box::new(els)),
        }
    }

    pub fn construct(dt: DatatypeId, ctor: u32, args: Vec<BExpr>) -> BExpr {
        BExpr::Construct(dt, ctor, args)
    }

    pub fn tester(dt: DatatypeId, ctor: u32, e: BExpr) -> BExpr {
        match &e {
            BExpr::Construct(edt, ector, _) if *edt == dt => BExpr::BoolLit(*ector == ctor),
            _ => BExpr::Tester(dt, ctor, Box::new(e)),
        }
    }

    pub fn accessor(dt: DatatypeId, ctor: u32, field: u32, e: BExpr) -> BExpr {
        match e {
            BExpr::Construct(edt, ector, args) if edt == dt && ector == ctor => {
                args.into_iter()
                    .nth(field as usize)
                    .expect("accessor field index in range")
            }
            other => BExpr::Accessor(dt, ctor, field, Box::new(other)),
        }
    }
}
