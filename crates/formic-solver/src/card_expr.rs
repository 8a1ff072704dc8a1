//! Symbolic cardinality expressions and constraints.
//!
//! Expressions are built through the `sum`/`prod` constructors, which apply
//! the algebraic identities eagerly: empty sum is 0, empty product is 1, a
//! zero factor collapses a product, infinity absorbs, and constants fold
//! together. Evaluation against a variable-range table is monotone in every
//! variable, which is what the propagation loop's binary search relies on.

use crate::cardinality::{CardRange, Cardinality};
use formic_terms::SymbolId;
use rustc_hash::FxHashMap;
use std::fmt;

/// A cardinality variable: either the LFP count of a symbol (terms provably
/// derivable in the partial model's closure) or its non-LFP count (terms
/// that may appear anywhere as a subterm).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardVar {
    pub sym: SymbolId,
    pub lfp: bool,
}

impl CardVar {
    pub fn lfp(sym: SymbolId) -> CardVar {
        CardVar { sym, lfp: true }
    }

    pub fn non_lfp(sym: SymbolId) -> CardVar {
        CardVar { sym, lfp: false }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CardExpr {
    Const(Cardinality),
    Var(CardVar),
    /// Disjoint union: counts add.
    Sum(Vec<CardExpr>),
    /// Cartesian product: counts multiply.
    Prod(Vec<CardExpr>),
}

impl CardExpr {
    pub const ZERO: CardExpr = CardExpr::Const(Cardinality::ZERO);
    pub const ONE: CardExpr = CardExpr::Const(Cardinality::ONE);
    pub const INFINITY: CardExpr = CardExpr::Const(Cardinality::Infinity);

    pub fn constant(v: Cardinality) -> CardExpr {
        CardExpr::Const(v)
    }

    pub fn var(v: CardVar) -> CardExpr {
        CardExpr::Var(v)
    }

    /// Disjoint-union sum with eager identities.
    pub fn sum(parts: Vec<CardExpr>) -> CardExpr {
        let mut constant = Cardinality::ZERO;
        let mut rest: Vec<CardExpr> = Vec::new();
        for p in parts {
            match p {
                CardExpr::Const(c) => constant = constant.add(c),
                CardExpr::Sum(inner) => {
                    for q in inner {
                        match q {
                            CardExpr::Const(c) => constant = constant.add(c),
                            other => rest.push(other),
                        }
                    }
                }
                other => rest.push(other),
            }
        }
        if constant == Cardinality::Infinity {
            return CardExpr::INFINITY;
        }
        if !constant.is_zero() || rest.is_empty() {
            rest.push(CardExpr::Const(constant));
        }
        if rest.len() == 1 {
            rest.pop().expect("len checked")
        } else {
            CardExpr::Sum(rest)
        }
    }

    /// Cartesian-product with eager identities.
    pub fn prod(parts: Vec<CardExpr>) -> CardExpr {
        let mut constant = Cardinality::ONE;
        let mut rest: Vec<CardExpr> = Vec::new();
        for p in parts {
            match p {
                CardExpr::Const(c) if c.is_zero() => return CardExpr::ZERO,
                CardExpr::Const(c) => constant = constant.mul(c),
                CardExpr::Prod(inner) => {
                    for q in inner {
                        match q {
                            CardExpr::Const(c) if c.is_zero() => return CardExpr::ZERO,
                            CardExpr::Const(c) => constant = constant.mul(c),
                            other => rest.push(other),
                        }
                    }
                }
                other => rest.push(other),
            }
        }
        if constant != Cardinality::ONE || rest.is_empty() {
            rest.push(CardExpr::Const(constant));
        }
        if rest.len() == 1 {
            rest.pop().expect("len checked")
        } else {
            CardExpr::Prod(rest)
        }
    }

    /// Collect every variable mentioned, without duplicates.
    pub fn variables(&self, out: &mut Vec<CardVar>) {
        match self {
            CardExpr::Const(_) => {}
            CardExpr::Var(v) => {
                if !out.contains(v) {
                    out.push(*v);
                }
            }
            CardExpr::Sum(parts) | CardExpr::Prod(parts) => {
                for p in parts {
                    p.variables(out);
                }
            }
        }
    }

    /// Interval evaluation against the variable-range table. Monotone in
    /// each variable. Unknown variables evaluate to the full range.
    pub fn eval(&self, ranges: &FxHashMap<CardVar, CardRange>) -> CardRange {
        match self {
            CardExpr::Const(c) => CardRange::point(*c),
            CardExpr::Var(v) => ranges.get(v).copied().unwrap_or(CardRange::FULL),
            CardExpr::Sum(parts) => {
                let mut lower = Cardinality::ZERO;
                let mut upper = Cardinality::ZERO;
                for p in parts {
                    let r = p.eval(ranges);
                    lower = lower.add(r.lower);
                    upper = upper.add(r.upper);
                }
                CardRange::new(lower, upper)
            }
            CardExpr::Prod(parts) => {
                let mut lower = Cardinality::ONE;
                let mut upper = Cardinality::ONE;
                for p in parts {
                    let r = p.eval(ranges);
                    lower = lower.mul(r.lower);
                    upper = upper.mul(r.upper);
                }
                CardRange::new(lower, upper)
            }
        }
    }

    /// Evaluate with one variable pinned to a point value; every other
    /// variable takes its table range. Used by the propagation bisection.
    pub fn eval_pinned(
        &self,
        ranges: &FxHashMap<CardVar, CardRange>,
        pinned: CardVar,
        value: Cardinality,
    ) -> CardRange {
        match self {
            CardExpr::Var(v) if *v == pinned => CardRange::point(value),
            CardExpr::Const(_) | CardExpr::Var(_) => self.eval(ranges),
            CardExpr::Sum(parts) => {
                let mut lower = Cardinality::ZERO;
                let mut upper = Cardinality::ZERO;
                for p in parts {
                    let r = p.eval_pinned(ranges, pinned, value);
                    lower = lower.add(r.lower);
                    upper = upper.add(r.upper);
                }
                CardRange::new(lower, upper)
            }
            CardExpr::Prod(parts) => {
                let mut lower = Cardinality::ONE;
                let mut upper = Cardinality::ONE;
                for p in parts {
                    let r = p.eval_pinned(ranges, pinned, value);
                    lower = lower.mul(r.lower);
                    upper = upper.mul(r.upper);
                }
                CardRange::new(lower, upper)
            }
        }
    }
}

impl fmt::Display for CardExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardExpr::Const(c) => write!(f, "{c}"),
            CardExpr::Var(v) => {
                write!(f, "{}#{}", if v.lfp { "lfp" } else { "all" }, v.sym.0)
            }
            CardExpr::Sum(parts) => {
                write!(f, "(")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " + ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
            CardExpr::Prod(parts) => {
                write!(f, "(")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " * ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Direction of a constraint.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CardRel {
    /// `var <= expr`
    Le,
    /// `var >= expr`
    Ge,
}

/// One constraint of the system: `lhs rel rhs`.
#[derive(Clone, Debug)]
pub struct CardConstraint {
    pub lhs: CardVar,
    pub rel: CardRel,
    pub rhs: CardExpr,
}

impl CardConstraint {
    pub fn le(lhs: CardVar, rhs: CardExpr) -> CardConstraint {
        CardConstraint {
            lhs,
            rel: CardRel::Le,
            rhs,
        }
    }

    pub fn ge(lhs: CardVar, rhs: CardExpr) -> CardConstraint {
        CardConstraint {
            lhs,
            rel: CardRel::Ge,
            rhs,
        }
    }

    /// Every variable this constraint mentions, lhs included.
    pub fn variables(&self) -> Vec<CardVar> {
        let mut out = vec![self.lhs];
        self.rhs.variables(&mut out);
        out
    }
}

impl fmt::Display for CardConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rel = match self.rel {
            CardRel::Le => "<=",
            CardRel::Ge => ">=",
        };
        write!(
            f,
            "{}#{} {} {}",
            if self.lhs.lfp { "lfp" } else { "all" },
            self.lhs.sym.0,
            rel,
            self.rhs
        )
    }
}
