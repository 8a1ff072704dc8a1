//! Grounding, membership tests, and subtype narrowing per embedding
//! variant.
//!
//! `mk_ground` maps a term to the backend literal of its embedding;
//! `unground` inverts it on fully evaluated model values. `mk_test` builds
//! a backend boolean saying "this value inhabits that type". All four
//! operations dispatch exhaustively on [`EmbeddingKind`]; a value shape
//! they cannot accept is a construction bug upstream.

use crate::embedder::TypeEmbedder;
use crate::embedding::numeric::{
    nat_decode, nat_decode_expr, nat_encode, neg_decode, neg_decode_expr, neg_encode, pos_decode,
    pos_decode_expr, pos_encode,
};
use crate::embedding::{EmbeddingId, EmbeddingKind};
use formic_smt::BExpr;
use formic_terms::{
    AtomMember, BaseSort, CanonicalUnion, SymbolKind, SymbolTable, TermId, TermStore,
    flatten_named_unions, type_term_to_union,
};

/// The smallest canonical union containing one ground value term.
pub(crate) fn value_union(table: &SymbolTable, terms: &TermStore, t: TermId) -> CanonicalUnion {
    match table.kind(terms.sym(t)) {
        SymbolKind::IntLiteral(v) => CanonicalUnion::int_const(*v),
        SymbolKind::StrLiteral(s) => CanonicalUnion::str_const(*s),
        SymbolKind::Constructor { .. } | SymbolKind::Map { .. } => {
            CanonicalUnion::user_sort(terms.sym(t))
        }
        other => panic!("not a ground value term: {other:?}"),
    }
}

pub(crate) fn int_value(table: &SymbolTable, terms: &TermStore, t: TermId) -> i128 {
    match table.kind(terms.sym(t)) {
        SymbolKind::IntLiteral(v) => *v,
        other => panic!("expected integer literal term, found {other:?}"),
    }
}

pub(crate) fn str_value(table: &SymbolTable, terms: &TermStore, t: TermId) -> String {
    match table.kind(terms.sym(t)) {
        SymbolKind::StrLiteral(s) => table.resolve_name(*s).to_owned(),
        other => panic!("expected string literal term, found {other:?}"),
    }
}

impl TypeEmbedder {
    /// Encode a ground term as a backend literal of `emb`.
    pub fn mk_ground(
        &self,
        table: &SymbolTable,
        terms: &TermStore,
        emb: EmbeddingId,
        t: TermId,
    ) -> BExpr {
        let data = self.embedding(emb);
        match &data.kind {
            EmbeddingKind::Real => BExpr::real(int_value(table, terms, t), 1),
            EmbeddingKind::Integer => BExpr::int(int_value(table, terms, t)),
            EmbeddingKind::Natural { dt } => {
                let v = int_value(table, terms, t);
                BExpr::construct(*dt, 0, vec![BExpr::int(nat_encode(v))])
            }
            EmbeddingKind::PosInteger { dt } => {
                let v = int_value(table, terms, t);
                BExpr::construct(*dt, 0, vec![BExpr::int(pos_encode(v))])
            }
            EmbeddingKind::NegInteger { dt } => {
                let v = int_value(table, terms, t);
                BExpr::construct(*dt, 0, vec![BExpr::int(neg_encode(v))])
            }
            EmbeddingKind::IntRange { lo, hi, width, dt } => {
                let v = int_value(table, terms, t);
                assert!(*lo <= v && v <= *hi, "{v} outside range {lo}..{hi}");
                BExpr::construct(*dt, 0, vec![BExpr::bv((v - lo) as u64, *width)])
            }
            EmbeddingKind::Enum { members, width, dt } => {
                let idx = members
                    .iter()
                    .position(|&m| m == t)
                    .unwrap_or_else(|| panic!("term not a member of this enum"));
                BExpr::construct(*dt, 0, vec![BExpr::bv(idx as u64, *width)])
            }
            EmbeddingKind::Singleton { value, dt } => {
                assert!(*value == t, "term is not this singleton's constant");
                BExpr::construct(*dt, 0, vec![])
            }
            EmbeddingKind::Str { dt, nonempty } => {
                let s = str_value(table, terms, t);
                ground_string(&s, *dt, *nonempty)
            }
            EmbeddingKind::Ctor { sym, dt, fields } => {
                assert!(
                    terms.sym(t) == *sym,
                    "term head does not match constructor embedding"
                );
                let args: Vec<BExpr> = terms
                    .args(t)
                    .iter()
                    .zip(fields.iter())
                    .map(|(&arg, &femb)| self.mk_ground(table, terms, femb, arg))
                    .collect();
                BExpr::construct(*dt, 0, args)
            }
            EmbeddingKind::Union { dt, boxes } => {
                let vu = value_union(table, terms, t);
                let chosen = boxes
                    .iter()
                    .find(|b| vu.is_subset_of(&self.embedding(b.emb).union))
                    .unwrap_or_else(|| panic!("no union box accepts the value"));
                let inner = self.mk_ground(table, terms, chosen.emb, t);
                BExpr::construct(*dt, chosen.ctor, vec![inner])
            }
        }
    }

    /// Decode a fully evaluated backend value of `emb` back into a term.
    pub fn unground(
        &self,
        table: &mut SymbolTable,
        terms: &mut TermStore,
        emb: EmbeddingId,
        e: &BExpr,
    ) -> TermId {
        let kind = self.embedding(emb).kind.clone();
        match (&kind, e) {
            (EmbeddingKind::Real, BExpr::RealLit { num, den }) => {
                assert!(*den == 1, "non-integral real model value {num}/{den}");
                let sym = table.int_literal(*num);
                terms.atom(sym)
            }
            (EmbeddingKind::Integer, BExpr::IntLit(v)) => {
                let sym = table.int_literal(*v);
                terms.atom(sym)
            }
            (EmbeddingKind::Natural { dt }, BExpr::Construct(edt, 0, args))
                if edt == dt && args.len() == 1 =>
            {
                let sym = table.int_literal(nat_decode(int_lit(&args[0])));
                terms.atom(sym)
            }
            (EmbeddingKind::PosInteger { dt }, BExpr::Construct(edt, 0, args))
                if edt == dt && args.len() == 1 =>
            {
                let sym = table.int_literal(pos_decode(int_lit(&args[0])));
                terms.atom(sym)
            }
            (EmbeddingKind::NegInteger { dt }, BExpr::Construct(edt, 0, args))
                if edt == dt && args.len() == 1 =>
            {
                let sym = table.int_literal(neg_decode(int_lit(&args[0])));
                terms.atom(sym)
            }
            (EmbeddingKind::IntRange { lo, .. }, BExpr::Construct(_, 0, args))
                if args.len() == 1 =>
            {
                let offset = bv_lit(&args[0]) as i128;
                let sym = table.int_literal(lo + offset);
                terms.atom(sym)
            }
            (EmbeddingKind::Enum { members, .. }, BExpr::Construct(_, 0, args))
                if args.len() == 1 =>
            {
                let idx = bv_lit(&args[0]) as usize;
                // Slack slots decode to member 0.
                if idx < members.len() {
                    members[idx]
                } else {
                    members[0]
                }
            }
            (EmbeddingKind::Singleton { value, .. }, _) => *value,
            (EmbeddingKind::Str { dt, nonempty }, _) => {
                let s = unground_string(e, *dt, *nonempty);
                let sym = table.str_literal(&s);
                terms.atom(sym)
            }
            (EmbeddingKind::Ctor { sym, dt, fields }, BExpr::Construct(edt, 0, args))
                if edt == dt && args.len() == fields.len() =>
            {
                let arg_terms: Vec<TermId> = args
                    .iter()
                    .zip(fields.clone())
                    .map(|(a, femb)| self.unground(table, terms, femb, a))
                    .collect();
                terms.mk(*sym, &arg_terms)
            }
            (EmbeddingKind::Union { dt, boxes }, BExpr::Construct(edt, ctor, args))
                if edt == dt && args.len() == 1 =>
            {
                let b = boxes
                    .iter()
                    .find(|b| b.ctor == *ctor)
                    .unwrap_or_else(|| panic!("unknown union box constructor {ctor}"));
                self.unground(table, terms, b.emb, &args[0])
            }
            (kind, other) => panic!("not a ground backend value for {kind:?}: {other:?}"),
        }
    }

    /// A backend boolean: true iff `value` (in `emb`'s representation)
    /// satisfies the type term `ty`.
    pub fn mk_test(
        &self,
        table: &SymbolTable,
        terms: &TermStore,
        emb: EmbeddingId,
        value: &BExpr,
        ty: TermId,
    ) -> BExpr {
        let ty_union = flatten_named_unions(table, &type_term_to_union(table, terms, ty));
        self.mk_test_union(table, terms, emb, value, &ty_union)
    }

    pub(crate) fn mk_test_union(
        &self,
        table: &SymbolTable,
        terms: &TermStore,
        emb: EmbeddingId,
        value: &BExpr,
        ty_union: &CanonicalUnion,
    ) -> BExpr {
        let data = self.embedding(emb);
        if data.union.is_subset_of(ty_union) {
            return BExpr::TRUE;
        }
        match &data.kind {
            EmbeddingKind::Real => real_test(value.clone(), ty_union),
            EmbeddingKind::Integer => int_test(value.clone(), ty_union, None),
            EmbeddingKind::Natural { dt } => {
                let decoded = nat_decode_expr(BExpr::accessor(*dt, 0, 0, value.clone()));
                int_test(decoded, ty_union, Some(BaseSort::Natural))
            }
            EmbeddingKind::PosInteger { dt } => {
                let decoded = pos_decode_expr(BExpr::accessor(*dt, 0, 0, value.clone()));
                int_test(decoded, ty_union, Some(BaseSort::PosInteger))
            }
            EmbeddingKind::NegInteger { dt } => {
                let decoded = neg_decode_expr(BExpr::accessor(*dt, 0, 0, value.clone()));
                int_test(decoded, ty_union, Some(BaseSort::NegInteger))
            }
            EmbeddingKind::IntRange { lo, dt, .. } => {
                let decoded = BExpr::add(vec![
                    BExpr::int(*lo),
                    BExpr::bv_to_int(BExpr::accessor(*dt, 0, 0, value.clone())),
                ]);
                int_test(decoded, ty_union, None)
            }
            EmbeddingKind::Enum { members, .. } => {
                let mut parts = Vec::new();
                for &m in members {
                    if value_union(table, terms, m).is_subset_of(ty_union) {
                        parts.push(BExpr::eq(
                            value.clone(),
                            self.mk_ground(table, terms, emb, m),
                        ));
                    }
                }
                BExpr::or(parts)
            }
            EmbeddingKind::Singleton { value: v, .. } => {
                BExpr::BoolLit(value_union(table, terms, *v).is_subset_of(ty_union))
            }
            EmbeddingKind::Str { .. } => {
                let mut parts = Vec::new();
                for atom in ty_union.atoms() {
                    match atom {
                        AtomMember::Base(BaseSort::String) => return BExpr::TRUE,
                        AtomMember::StrConst(s) => {
                            let (dt, nonempty) = self.string_parts;
                            let text = table.resolve_name(*s);
                            parts.push(BExpr::eq(
                                value.clone(),
                                ground_string(text, dt, nonempty),
                            ));
                        }
                        _ => {}
                    }
                }
                BExpr::or(parts)
            }
            EmbeddingKind::Ctor { sym, .. } => {
                BExpr::BoolLit(ty_union.atoms().contains(&AtomMember::UserSort(*sym)))
            }
            EmbeddingKind::Union { dt, boxes } => {
                let mut parts = Vec::new();
                for b in boxes {
                    let inner_data = self.embedding(b.emb);
                    let tester = BExpr::tester(*dt, b.ctor, value.clone());
                    if inner_data.union.is_subset_of(ty_union) {
                        parts.push(tester);
                    } else if inner_data.union.intersect(ty_union).is_some() {
                        let inner_value = BExpr::accessor(*dt, b.ctor, 0, value.clone());
                        let inner_test =
                            self.mk_test_union(table, terms, b.emb, &inner_value, ty_union);
                        parts.push(BExpr::and(vec![tester, inner_test]));
                    }
                }
                BExpr::or(parts)
            }
        }
    }

    /// Narrow a backend literal to the smallest term-representable type
    /// containing it: the constant itself for scalars and strings, the
    /// constructor's sort for datatype values.
    pub fn get_subtype(
        &self,
        table: &mut SymbolTable,
        terms: &mut TermStore,
        emb: EmbeddingId,
        e: &BExpr,
    ) -> TermId {
        let kind = self.embedding(emb).kind.clone();
        match &kind {
            EmbeddingKind::Real => {
                if let BExpr::RealLit { den, .. } = e {
                    if *den != 1 {
                        // Not representable as an integer constant; the
                        // tightest expressible type is Real itself.
                        return terms.atom(table.base_sort(BaseSort::Real));
                    }
                }
                self.unground(table, terms, emb, e)
            }
            EmbeddingKind::Integer
            | EmbeddingKind::Natural { .. }
            | EmbeddingKind::PosInteger { .. }
            | EmbeddingKind::NegInteger { .. }
            | EmbeddingKind::IntRange { .. }
            | EmbeddingKind::Enum { .. }
            | EmbeddingKind::Singleton { .. }
            | EmbeddingKind::Str { .. } => self.unground(table, terms, emb, e),
            EmbeddingKind::Ctor { sym, .. } => terms.atom(*sym),
            EmbeddingKind::Union { dt, boxes } => match e {
                BExpr::Construct(edt, ctor, args) if edt == dt && args.len() == 1 => {
                    let b = boxes
                        .iter()
                        .find(|b| b.ctor == *ctor)
                        .unwrap_or_else(|| panic!("unknown union box constructor {ctor}"));
                    self.get_subtype(table, terms, b.emb, &args[0])
                }
                other => panic!("not a ground union value: {other:?}"),
            },
        }
    }
}

fn int_lit(e: &BExpr) -> i128 {
    match e {
        BExpr::IntLit(v) => *v,
        other => panic!("expected integer literal, found {other:?}"),
    }
}

fn bv_lit(e: &BExpr) -> u64 {
    match e {
        BExpr::BvLit { value, .. } => *value,
        other => panic!("expected bit-vector literal, found {other:?}"),
    }
}

/// Build the recursive string encoding of `s`.
pub(crate) fn ground_string(
    s: &str,
    dt: formic_smt::sort::DatatypeId,
    nonempty: formic_smt::sort::DatatypeId,
) -> BExpr {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return BExpr::construct(dt, 0, vec![]);
    }
    let mut acc = BExpr::construct(nonempty, 0, vec![BExpr::bv(bytes[0] as u64, 8)]);
    for &b in &bytes[1..] {
        acc = BExpr::construct(nonempty, 1, vec![acc, BExpr::bv(b as u64, 8)]);
    }
    BExpr::construct(dt, 1, vec![acc])
}

fn unground_string(
    e: &BExpr,
    dt: formic_smt::sort::DatatypeId,
    nonempty: formic_smt::sort::DatatypeId,
) -> String {
    match e {
        BExpr::Construct(edt, 0, args) if *edt == dt && args.is_empty() => String::new(),
        BExpr::Construct(edt, 1, args) if *edt == dt && args.len() == 1 => {
            let mut bytes = Vec::new();
            collect_bytes(&args[0], nonempty, &mut bytes);
            String::from_utf8(bytes).expect("string model value is valid utf-8")
        }
        other => panic!("not a ground string value: {other:?}"),
    }
}

fn collect_bytes(e: &BExpr, nonempty: formic_smt::sort::DatatypeId, out: &mut Vec<u8>) {
    match e {
        BExpr::Construct(edt, 0, args) if *edt == nonempty && args.len() == 1 => {
            out.push(bv_lit(&args[0]) as u8);
        }
        BExpr::Construct(edt, 1, args) if *edt == nonempty && args.len() == 2 => {
            collect_bytes(&args[0], nonempty, out);
            out.push(bv_lit(&args[1]) as u8);
        }
        other => panic!("not a ground string segment: {other:?}"),
    }
}

/// Membership of an integer-valued expression in a canonical union.
/// `src` is the sort the value is statically known to inhabit, enabling
/// subset shortcuts for base-sort members.
fn int_test(decoded: BExpr, ty_union: &CanonicalUnion, src: Option<BaseSort>) -> BExpr {
    let mut parts = Vec::new();
    for &(lo, hi) in ty_union.ranges() {
        parts.push(BExpr::and(vec![
            BExpr::ge(decoded.clone(), BExpr::int(lo)),
            BExpr::le(decoded.clone(), BExpr::int(hi)),
        ]));
    }
    for atom in ty_union.atoms() {
        match atom {
            AtomMember::IntConst(c) => {
                parts.push(BExpr::eq(decoded.clone(), BExpr::int(*c)));
            }
            AtomMember::Base(b) => {
                if src.is_some_and(|s| s.widens_to(*b)) {
                    return BExpr::TRUE;
                }
                match b {
                    BaseSort::Real | BaseSort::Integer => return BExpr::TRUE,
                    BaseSort::Natural => parts.push(BExpr::ge(decoded.clone(), BExpr::int(0))),
                    BaseSort::PosInteger => {
                        parts.push(BExpr::ge(decoded.clone(), BExpr::int(1)));
                    }
                    BaseSort::NegInteger => {
                        parts.push(BExpr::le(decoded.clone(), BExpr::int(-1)));
                    }
                    BaseSort::String => {}
                }
            }
            AtomMember::UserSort(_) | AtomMember::StrConst(_) => {}
        }
    }
    BExpr::or(parts)
}

/// Membership of a real-valued expression in a canonical union.
fn real_test(value: BExpr, ty_union: &CanonicalUnion) -> BExpr {
    let mut parts = Vec::new();
    for &(lo, hi) in ty_union.ranges() {
        parts.push(BExpr::and(vec![
            BExpr::is_int(value.clone()),
            BExpr::ge(value.clone(), BExpr::real(lo, 1)),
            BExpr::le(value.clone(), BExpr::real(hi, 1)),
        ]));
    }
    for atom in ty_union.atoms() {
        match atom {
            AtomMember::IntConst(c) => {
                parts.push(BExpr::eq(value.clone(), BExpr::real(*c, 1)));
            }
            AtomMember::Base(b) => match b {
                BaseSort::Real => return BExpr::TRUE,
                BaseSort::Integer => parts.push(BExpr::is_int(value.clone())),
                BaseSort::Natural => parts.push(BExpr::and(vec![
                    BExpr::is_int(value.clone()),
                    BExpr::ge(value.clone(), BExpr::real(0, 1)),
                ])),
                BaseSort::PosInteger => parts.push(BExpr::and(vec![
                    BExpr::is_int(value.clone()),
                    BExpr::ge(value.clone(), BExpr::real(1, 1)),
                ])),
                BaseSort::NegInteger => parts.push(BExpr::and(vec![
                    BExpr::is_int(value.clone()),
                    BExpr::le(value.clone(), BExpr::real(-1, 1)),
                ])),
                BaseSort::String => {}
            },
            AtomMember::UserSort(_) | AtomMember::StrConst(_) => {}
        }
    }
    BExpr::or(parts)
}
