//! Canonical unions: the normalized form of every type expression.
//!
//! A canonical union is a set of closed integer ranges plus a set of
//! non-range atomic members (base sorts, user sort symbols, literal
//! constants). Ranges are kept sorted, disjoint, and maximally coalesced;
//! atoms are kept sorted and deduplicated. Integer constants stay atomic —
//! whether a finite integer set is "a range" or "constants" is decided by
//! how it was written, and the distinction drives factorization downstream.

use crate::intern::{TermId, TermStore};
use crate::interner::Atom;
use crate::symbols::{BaseSort, SymbolId, SymbolKind, SymbolTable};

/// A non-range atomic member of a canonical union.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AtomMember {
    Base(BaseSort),
    /// A user constructor's or named union's sort symbol.
    UserSort(SymbolId),
    IntConst(i128),
    StrConst(Atom),
}

/// A type expression decomposed into ranges plus atomic members.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CanonicalUnion {
    ranges: Vec<(i128, i128)>,
    atoms: Vec<AtomMember>,
}

impl CanonicalUnion {
    pub fn empty() -> Self {
        CanonicalUnion::default()
    }

    pub fn base(sort: BaseSort) -> Self {
        CanonicalUnion {
            ranges: Vec::new(),
            atoms: vec![AtomMember::Base(sort)],
        }
    }

    pub fn user_sort(sym: SymbolId) -> Self {
        CanonicalUnion {
            ranges: Vec::new(),
            atoms: vec![AtomMember::UserSort(sym)],
        }
    }

    pub fn int_const(v: i128) -> Self {
        CanonicalUnion {
            ranges: Vec::new(),
            atoms: vec![AtomMember::IntConst(v)],
        }
    }

    pub fn str_const(atom: Atom) -> Self {
        CanonicalUnion {
            ranges: Vec::new(),
            atoms: vec![AtomMember::StrConst(atom)],
        }
    }

    pub fn range(lo: i128, hi: i128) -> Self {
        assert!(lo <= hi, "inverted range {lo}..{hi}");
        CanonicalUnion {
            ranges: vec![(lo, hi)],
            atoms: Vec::new(),
        }
    }

    /// Build from raw parts and normalize.
    pub fn from_parts(ranges: Vec<(i128, i128)>, atoms: Vec<AtomMember>) -> Self {
        let mut u = CanonicalUnion { ranges, atoms };
        u.normalize();
        u
    }

    pub fn ranges(&self) -> &[(i128, i128)] {
        &self.ranges
    }

    pub fn atoms(&self) -> &[AtomMember] {
        &self.atoms
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty() && self.atoms.is_empty()
    }

    /// Sort, coalesce adjacent/overlapping ranges, dedup atoms, and drop
    /// integer constants already covered by a range or by a covering
    /// numeric base sort.
    pub fn normalize(&mut self) {
        self.ranges.sort_unstable();
        let mut merged: Vec<(i128, i128)> = Vec::with_capacity(self.ranges.len());
        for &(lo, hi) in &self.ranges {
            match merged.last_mut() {
                Some(&mut (_, ref mut phi)) if lo <= phi.saturating_add(1) => {
                    *phi = (*phi).max(hi);
                }
                _ => merged.push((lo, hi)),
            }
        }
        self.ranges = merged;

        self.atoms.sort_unstable();
        self.atoms.dedup();
        let ranges = std::mem::take(&mut self.ranges);
        let covered_by_base = |v: i128, atoms: &[AtomMember]| {
            atoms.iter().any(|a| match a {
                AtomMember::Base(b) => b.contains_int(v),
                _ => false,
            })
        };
        let atoms_snapshot = self.atoms.clone();
        self.atoms.retain(|a| match a {
            AtomMember::IntConst(v) => {
                !ranges.iter().any(|&(lo, hi)| lo <= *v && *v <= hi)
                    && !covered_by_base(*v, &atoms_snapshot)
            }
            _ => true,
        });
        self.ranges = ranges;
    }

    pub fn union_with(&self, other: &CanonicalUnion) -> CanonicalUnion {
        let mut ranges = self.ranges.clone();
        ranges.extend_from_slice(&other.ranges);
        let mut atoms = self.atoms.clone();
        atoms.extend_from_slice(&other.atoms);
        CanonicalUnion::from_parts(ranges, atoms)
    }

    /// Set intersection. `None` means the intersection is empty — an
    /// ordinary result, not an error.
    ///
    /// Base sorts intersect numerically via the widening order; a base sort
    /// against a range/constant keeps the part of the range the sort
    /// contains. User sorts intersect nominally.
    pub fn intersect(&self, other: &CanonicalUnion) -> Option<CanonicalUnion> {
        let mut ranges: Vec<(i128, i128)> = Vec::new();
        let mut atoms: Vec<AtomMember> = Vec::new();

        // range ∩ range
        for &(alo, ahi) in &self.ranges {
            for &(blo, bhi) in &other.ranges {
                let lo = alo.max(blo);
                let hi = ahi.min(bhi);
                if lo <= hi {
                    ranges.push((lo, hi));
                }
            }
        }
        // range ∩ base-sort (either direction)
        for (rs, os) in [(&self.ranges, &other.atoms), (&other.ranges, &self.atoms)] {
            for &(lo, hi) in rs.iter() {
                for atom in os.iter() {
                    match atom {
                        AtomMember::Base(b) => {
                            if let Some(clipped) = clip_range_to_sort(lo, hi, *b) {
                                ranges.push(clipped);
                            }
                        }
                        AtomMember::IntConst(v) => {
                            if lo <= *v && *v <= hi {
                                atoms.push(AtomMember::IntConst(*v));
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        // atom ∩ atom
        for a in &self.atoms {
            for b in &other.atoms {
                match (a, b) {
                    (AtomMember::Base(x), AtomMember::Base(y)) => {
                        if x.widens_to(*y) {
                            atoms.push(AtomMember::Base(*x));
                        } else if y.widens_to(*x) {
                            atoms.push(AtomMember::Base(*y));
                        } else if let Some(meet) = numeric_meet(*x, *y) {
                            atoms.push(AtomMember::Base(meet));
                        }
                    }
                    (AtomMember::Base(x), AtomMember::IntConst(v))
                    | (AtomMember::IntConst(v), AtomMember::Base(x)) => {
                        if x.contains_int(*v) {
                            atoms.push(AtomMember::IntConst(*v));
                        }
                    }
                    (AtomMember::Base(BaseSort::String), AtomMember::StrConst(s))
                    | (AtomMember::StrConst(s), AtomMember::Base(BaseSort::String)) => {
                        atoms.push(AtomMember::StrConst(*s));
                    }
                    (AtomMember::UserSort(x), AtomMember::UserSort(y)) if x == y => {
                        atoms.push(AtomMember::UserSort(*x));
                    }
                    (AtomMember::IntConst(x), AtomMember::IntConst(y)) if x == y => {
                        atoms.push(AtomMember::IntConst(*x));
                    }
                    (AtomMember::StrConst(x), AtomMember::StrConst(y)) if x == y => {
                        atoms.push(AtomMember::StrConst(*x));
                    }
                    _ => {}
                }
            }
        }

        let out = CanonicalUnion::from_parts(ranges, atoms);
        if out.is_empty() { None } else { Some(out) }
    }

    /// True if every member of `self` is a member of `other`.
    pub fn is_subset_of(&self, other: &CanonicalUnion) -> bool {
        for &(lo, hi) in &self.ranges {
            if !other.covers_range(lo, hi) {
                return false;
            }
        }
        self.atoms.iter().all(|a| other.covers_atom(a))
    }

    fn covers_range(&self, lo: i128, hi: i128) -> bool {
        // A range is covered if base sorts / ranges jointly include it.
        // Ranges are disjoint and sorted, so walk the gap left to right.
        let mut cursor = lo;
        loop {
            let mut advanced = false;
            for &(rlo, rhi) in &self.ranges {
                if rlo <= cursor && cursor <= rhi {
                    if rhi >= hi {
                        return true;
                    }
                    cursor = rhi + 1;
                    advanced = true;
                }
            }
            for atom in &self.atoms {
                match atom {
                    AtomMember::Base(b) => {
                        if let Some((clo, chi)) = clip_range_to_sort(cursor, hi, *b) {
                            if clo == cursor {
                                if chi >= hi {
                                    return true;
                                }
                                cursor = chi + 1;
                                advanced = true;
                            }
                        }
                    }
                    AtomMember::IntConst(v) if *v == cursor => {
                        if cursor == hi {
                            return true;
                        }
                        cursor += 1;
                        advanced = true;
                    }
                    _ => {}
                }
            }
            if !advanced {
                return false;
            }
        }
    }

    fn covers_atom(&self, a: &AtomMember) -> bool {
        match a {
            AtomMember::Base(x) => self.atoms.iter().any(|b| match b {
                AtomMember::Base(y) => x.widens_to(*y),
                _ => false,
            }),
            AtomMember::UserSort(s) => self.atoms.contains(&AtomMember::UserSort(*s)),
            AtomMember::IntConst(v) => {
                self.ranges.iter().any(|&(lo, hi)| lo <= *v && *v <= hi)
                    || self.atoms.iter().any(|b| match b {
                        AtomMember::Base(y) => y.contains_int(*v),
                        AtomMember::IntConst(w) => v == w,
                        _ => false,
                    })
            }
            AtomMember::StrConst(s) => self.atoms.iter().any(|b| {
                matches!(b, AtomMember::Base(BaseSort::String))
                    || matches!(b, AtomMember::StrConst(t) if t == s)
            }),
        }
    }

    /// Number of inhabitants if finite; `None` if any base or user sort
    /// member makes the count unknown/infinite at this layer.
    pub fn finite_size(&self) -> Option<u128> {
        let mut total: u128 = 0;
        for &(lo, hi) in &self.ranges {
            total = total.checked_add((hi - lo) as u128 + 1)?;
        }
        for atom in &self.atoms {
            match atom {
                AtomMember::IntConst(_) | AtomMember::StrConst(_) => total += 1,
                AtomMember::Base(_) | AtomMember::UserSort(_) => return None,
            }
        }
        Some(total)
    }

    /// The smallest base-sort cover of the numeric/string part, with user
    /// sorts preserved. Used by representation selection for the exact
    /// lookup of a widened form.
    pub fn widen(&self) -> CanonicalUnion {
        let mut atoms: Vec<AtomMember> = Vec::new();
        let mut numeric: Option<BaseSort> = None;
        let mut widen_num = |sort: BaseSort, numeric: &mut Option<BaseSort>| {
            *numeric = Some(match numeric {
                None => sort,
                Some(cur) => numeric_join(*cur, sort),
            });
        };
        for &(lo, hi) in &self.ranges {
            widen_num(int_cover(lo, hi), &mut numeric);
        }
        for atom in &self.atoms {
            match atom {
                AtomMember::Base(b) if *b != BaseSort::String => widen_num(*b, &mut numeric),
                AtomMember::IntConst(v) => widen_num(int_cover(*v, *v), &mut numeric),
                AtomMember::Base(BaseSort::String) | AtomMember::StrConst(_) => {
                    atoms.push(AtomMember::Base(BaseSort::String));
                }
                AtomMember::UserSort(s) => atoms.push(AtomMember::UserSort(*s)),
                AtomMember::Base(_) => unreachable!(),
            }
        }
        if let Some(sort) = numeric {
            atoms.push(AtomMember::Base(sort));
        }
        CanonicalUnion::from_parts(Vec::new(), atoms)
    }
}

/// Clip `[lo,hi]` to the values `sort` contains; `None` if nothing is left.
fn clip_range_to_sort(lo: i128, hi: i128, sort: BaseSort) -> Option<(i128, i128)> {
    let (slo, shi) = match sort {
        BaseSort::Real | BaseSort::Integer => (i128::MIN, i128::MAX),
        BaseSort::Natural => (0, i128::MAX),
        BaseSort::PosInteger => (1, i128::MAX),
        BaseSort::NegInteger => (i128::MIN, -1),
        BaseSort::String => return None,
    };
    let clo = lo.max(slo);
    let chi = hi.min(shi);
    if clo <= chi { Some((clo, chi)) } else { None }
}

/// Greatest lower bound of two numeric base sorts, if nonempty.
fn numeric_meet(a: BaseSort, b: BaseSort) -> Option<BaseSort> {
    use BaseSort::*;
    match (a, b) {
        (Natural, PosInteger) | (PosInteger, Natural) => Some(PosInteger),
        (Natural | PosInteger, NegInteger) | (NegInteger, Natural | PosInteger) => None,
        (String, _) | (_, String) => None,
        // Remaining pairs are ordered by widening and handled by the caller.
        _ => None,
    }
}

/// Least upper bound of two numeric base sorts.
fn numeric_join(a: BaseSort, b: BaseSort) -> BaseSort {
    use BaseSort::*;
    if a.widens_to(b) {
        return b;
    }
    if b.widens_to(a) {
        return a;
    }
    match (a, b) {
        (Real, _) | (_, Real) => Real,
        _ => Integer,
    }
}

/// Smallest numeric base sort containing every integer in `[lo,hi]`.
fn int_cover(lo: i128, hi: i128) -> BaseSort {
    if lo >= 1 {
        BaseSort::PosInteger
    } else if lo >= 0 {
        BaseSort::Natural
    } else if hi <= -1 {
        BaseSort::NegInteger
    } else {
        BaseSort::Integer
    }
}

/// Interpret a type term as a canonical union.
///
/// Accepted shapes: a base-sort symbol, a user constructor/union symbol
/// (nullary occurrence names its sort), an integer or string literal, a
/// `Range(lo, hi)` application, or a `UnionOp(a, b)` application. Anything
/// else is a construction bug upstream and panics.
pub fn type_term_to_union(table: &SymbolTable, terms: &TermStore, t: TermId) -> CanonicalUnion {
    match table.kind(terms.sym(t)) {
        SymbolKind::Base(sort) => CanonicalUnion::base(*sort),
        SymbolKind::Constructor { .. } | SymbolKind::Map { .. } | SymbolKind::Union => {
            CanonicalUnion::user_sort(terms.sym(t))
        }
        SymbolKind::IntLiteral(v) => CanonicalUnion::int_const(*v),
        SymbolKind::StrLiteral(atom) => CanonicalUnion::str_const(*atom),
        SymbolKind::RangeOp => {
            let args = terms.args(t);
            let lo = int_literal_value(table, terms, args[0]);
            let hi = int_literal_value(table, terms, args[1]);
            CanonicalUnion::range(lo, hi)
        }
        SymbolKind::UnionOp => {
            let args = terms.args(t);
            let a = type_term_to_union(table, terms, args[0]);
            let b = type_term_to_union(table, terms, args[1]);
            a.union_with(&b)
        }
        SymbolKind::Variable => panic!("variable in type position"),
    }
}

fn int_literal_value(table: &SymbolTable, terms: &TermStore, t: TermId) -> i128 {
    match table.kind(terms.sym(t)) {
        SymbolKind::IntLiteral(v) => *v,
        other => panic!("range endpoint is not an integer literal: {other:?}"),
    }
}

/// Expand a union's `UserSort` members that name *named unions* into their
/// member sets, to a fixpoint. Constructor sorts stay atomic.
pub fn flatten_named_unions(table: &SymbolTable, u: &CanonicalUnion) -> CanonicalUnion {
    let mut out = CanonicalUnion {
        ranges: u.ranges.clone(),
        atoms: Vec::new(),
    };
    let mut work: Vec<AtomMember> = u.atoms.clone();
    let mut seen: Vec<SymbolId> = Vec::new();
    while let Some(atom) = work.pop() {
        match atom {
            AtomMember::UserSort(s) if matches!(table.kind(s), SymbolKind::Union) => {
                if seen.contains(&s) {
                    continue;
                }
                seen.push(s);
                let members = table
                    .info(s)
                    .members
                    .as_ref()
                    .unwrap_or_else(|| panic!("union symbol {} has no member set", table.name(s)));
                out.ranges.extend_from_slice(&members.ranges);
                work.extend(members.atoms.iter().copied());
            }
            other => out.atoms.push(other),
        }
    }
    out.normalize();
    out
}
