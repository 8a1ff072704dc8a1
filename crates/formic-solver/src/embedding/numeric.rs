//! Bijections between the numeric sub-range sorts and the backend integers.
//!
//! Natural, PosInteger, and NegInteger denote infinite subsets of ℤ, so
//! each is backed by an *unconstrained* backend Int through a bijection
//! rather than a bounded sort:
//!
//! ```text
//! PosInteger  1  2  3  4  5 …   ↔   0  1 −1  2 −2 …
//! NegInteger −1 −2 −3 −4 −5 …   ↔   0 −1  1 −2  2 …
//! Natural     0  1  2  3  4 …   ↔   0  1 −1  2 −2 …
//! ```
//!
//! The value-level functions ground and decode model literals; the
//! expression-level ones build the same mapping symbolically for tests and
//! coercions.

use formic_smt::BExpr;

/// PosInteger value (≥ 1) to its backend code.
pub fn pos_encode(v: i128) -> i128 {
    debug_assert!(v >= 1);
    if v % 2 == 0 { v / 2 } else { -((v - 1) / 2) }
}

/// Backend code to its PosInteger value.
pub fn pos_decode(z: i128) -> i128 {
    if z > 0 {
        2 * z
    } else if z == 0 {
        1
    } else {
        1 - 2 * z
    }
}

/// Natural value (≥ 0) to its backend code.
pub fn nat_encode(v: i128) -> i128 {
    debug_assert!(v >= 0);
    pos_encode(v + 1)
}

pub fn nat_decode(z: i128) -> i128 {
    pos_decode(z) - 1
}

/// NegInteger value (≤ −1) to its backend code: the PosInteger scheme
/// mirrored, so codes carry the opposite parity.
pub fn neg_encode(v: i128) -> i128 {
    debug_assert!(v <= -1);
    -pos_encode(-v)
}

pub fn neg_decode(z: i128) -> i128 {
    -pos_decode(-z)
}

/// Symbolic PosInteger decode: code expression to value expression.
pub fn pos_decode_expr(z: BExpr) -> BExpr {
    BExpr::ite(
        BExpr::ge(z.clone(), BExpr::int(1)),
        BExpr::mul(vec![BExpr::int(2), z.clone()]),
        BExpr::ite(
            BExpr::eq(z.clone(), BExpr::int(0)),
            BExpr::int(1),
            BExpr::sub(BExpr::int(1), BExpr::mul(vec![BExpr::int(2), z])),
        ),
    )
}

/// Symbolic PosInteger encode: value expression (assumed ≥ 1) to code.
pub fn pos_encode_expr(v: BExpr) -> BExpr {
    BExpr::ite(
        BExpr::eq(BExpr::modulo(v.clone(), BExpr::int(2)), BExpr::int(0)),
        BExpr::div(v.clone(), BExpr::int(2)),
        BExpr::neg(BExpr::div(BExpr::sub(v, BExpr::int(1)), BExpr::int(2))),
    )
}

pub fn nat_decode_expr(z: BExpr) -> BExpr {
    BExpr::sub(pos_decode_expr(z), BExpr::int(1))
}

pub fn nat_encode_expr(v: BExpr) -> BExpr {
    pos_encode_expr(BExpr::add(vec![v, BExpr::int(1)]))
}

pub fn neg_decode_expr(z: BExpr) -> BExpr {
    BExpr::neg(pos_decode_expr(BExpr::neg(z)))
}

pub fn neg_encode_expr(v: BExpr) -> BExpr {
    BExpr::neg(pos_encode_expr(BExpr::neg(v)))
}
