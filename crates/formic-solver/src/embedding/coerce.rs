//! Total coercion between embeddings.
//!
//! `mk_coercion` builds a backend expression of the target embedding's
//! sort from a value of the source embedding. It is total: where the two
//! types do not overlap, or the value falls outside the target, the result
//! is the target's resolved default member. Union sources are unboxed with
//! a tester chain and union targets are boxed before any scalar recoding
//! happens, so the scalar arms below never see a union on either side.

use crate::embedder::TypeEmbedder;
use crate::embedding::numeric::{
    nat_decode_expr, nat_encode_expr, neg_decode_expr, neg_encode_expr, pos_decode_expr,
    pos_encode_expr,
};
use crate::embedding::ops::{ground_string, value_union};
use crate::embedding::{EmbeddingId, EmbeddingKind};
use formic_smt::BExpr;
use formic_terms::{SymbolKind, SymbolTable, TermStore};

impl TypeEmbedder {
    /// Coerce `value`, a backend expression of `source`'s sort, into an
    /// expression of `target`'s sort.
    pub fn mk_coercion(
        &self,
        table: &SymbolTable,
        terms: &TermStore,
        target: EmbeddingId,
        source: EmbeddingId,
        value: &BExpr,
    ) -> BExpr {
        if target == source {
            return value.clone();
        }

        // Unbox union sources first: coerce each box's payload and select
        // with the testers. Boxes never hold unions themselves, so the
        // recursion bottoms out in one step.
        if let EmbeddingKind::Union { dt, boxes } = &self.embedding(source).kind {
            let mut acc = self.embedding(target).default_expr().clone();
            for b in boxes {
                let payload = BExpr::accessor(*dt, b.ctor, 0, value.clone());
                let coerced = self.mk_coercion(table, terms, target, b.emb, &payload);
                acc = BExpr::ite(BExpr::tester(*dt, b.ctor, value.clone()), coerced, acc);
            }
            return acc;
        }

        // Box union targets: pick the box whose type the source value
        // satisfies, preferring cheaper boxes when several overlap.
        if let EmbeddingKind::Union { dt, boxes } = &self.embedding(target).kind {
            let src_union = self.embedding(source).union.clone();
            let mut acc = self.embedding(target).default_expr().clone();
            let mut overlapping: Vec<_> = boxes
                .iter()
                .filter(|b| self.embedding(b.emb).union.intersect(&src_union).is_some())
                .collect();
            // Reverse cost order so the cheapest box ends up outermost.
            overlapping.sort_by_key(|b| std::cmp::Reverse(self.embedding(b.emb).cost));
            for b in overlapping {
                let inner = self.embedding(b.emb);
                let cond = self.mk_test_union(table, terms, source, value, &inner.union);
                let boxed = BExpr::construct(
                    *dt,
                    b.ctor,
                    vec![self.mk_coercion(table, terms, b.emb, source, value)],
                );
                acc = BExpr::ite(cond, boxed, acc);
            }
            return acc;
        }

        self.coerce_scalar(table, terms, target, source, value)
    }

    fn coerce_scalar(
        &self,
        table: &SymbolTable,
        terms: &TermStore,
        target: EmbeddingId,
        source: EmbeddingId,
        value: &BExpr,
    ) -> BExpr {
        let tgt = self.embedding(target);
        let default = tgt.default_expr().clone();
        let src_union = self.embedding(source).union.clone();
        let disjoint = src_union.intersect(&tgt.union).is_none();
        if disjoint {
            return default;
        }
        let src_subset = src_union.is_subset_of(&tgt.union);

        match &tgt.kind {
            EmbeddingKind::Integer => match self.int_view(table, terms, source, value) {
                Some(i) => i,
                None => match &self.embedding(source).kind {
                    EmbeddingKind::Real => BExpr::ite(
                        BExpr::is_int(value.clone()),
                        BExpr::to_int(value.clone()),
                        default,
                    ),
                    _ => default,
                },
            },
            EmbeddingKind::Real => match self.int_view(table, terms, source, value) {
                Some(i) => BExpr::to_real(i),
                None => default,
            },
            EmbeddingKind::Natural { dt } => {
                self.coerce_to_boxed_int(table, terms, source, value, *dt, 0, src_subset, default, nat_encode_expr)
            }
            EmbeddingKind::PosInteger { dt } => {
                self.coerce_to_boxed_int(table, terms, source, value, *dt, 1, src_subset, default, pos_encode_expr)
            }
            EmbeddingKind::NegInteger { dt } => {
                let dt = *dt;
                match self.int_view(table, terms, source, value) {
                    Some(i) => {
                        let boxed =
                            BExpr::construct(dt, 0, vec![neg_encode_expr(i.clone())]);
                        if src_subset {
                            boxed
                        } else {
                            BExpr::ite(BExpr::le(i, BExpr::int(-1)), boxed, default)
                        }
                    }
                    None => default,
                }
            }
            EmbeddingKind::IntRange { lo, hi, width, dt } => {
                match self.int_view(table, terms, source, value) {
                    Some(i) => {
                        let boxed = BExpr::construct(
                            *dt,
                            0,
                            vec![BExpr::int_to_bv(
                                *width,
                                BExpr::sub(i.clone(), BExpr::int(*lo)),
                            )],
                        );
                        if src_subset {
                            boxed
                        } else {
                            let in_range = BExpr::and(vec![
                                BExpr::ge(i.clone(), BExpr::int(*lo)),
                                BExpr::le(i, BExpr::int(*hi)),
                            ]);
                            BExpr::ite(in_range, boxed, default)
                        }
                    }
                    None => default,
                }
            }
            EmbeddingKind::Enum { members, .. } => {
                let members = members.clone();
                let mut acc = default;
                for &m in &members {
                    let cond = match table.kind(terms.sym(m)) {
                        SymbolKind::IntLiteral(v) => self
                            .int_view(table, terms, source, value)
                            .map(|i| BExpr::eq(i, BExpr::int(*v))),
                        SymbolKind::StrLiteral(_) => {
                            let vu = value_union(table, terms, m);
                            match &self.embedding(source).kind {
                                EmbeddingKind::Str { .. }
                                | EmbeddingKind::Singleton { .. }
                                | EmbeddingKind::Enum { .. } => Some(self.mk_test_union(
                                    table, terms, source, value, &vu,
                                )),
                                _ => None,
                            }
                        }
                        other => panic!("enum member is not a constant: {other:?}"),
                    };
                    if let Some(cond) = cond {
                        let hit = self.mk_ground(table, terms, target, m);
                        acc = BExpr::ite(cond, hit, acc);
                    }
                }
                acc
            }
            // A singleton sort has exactly one inhabitant, which is also
            // its default, so every coercion into it is that value.
            EmbeddingKind::Singleton { dt, .. } => BExpr::construct(*dt, 0, vec![]),
            EmbeddingKind::Str { .. } => match &self.embedding(source).kind {
                EmbeddingKind::Str { .. } => value.clone(),
                EmbeddingKind::Singleton { value: v, .. } => match table.kind(terms.sym(*v)) {
                    SymbolKind::StrLiteral(s) => {
                        let (dt, ne) = self.string_parts;
                        ground_string(table.resolve_name(*s), dt, ne)
                    }
                    _ => default,
                },
                EmbeddingKind::Enum { members, .. } => {
                    let members = members.clone();
                    let mut acc = default;
                    for &m in &members {
                        if let SymbolKind::StrLiteral(s) = table.kind(terms.sym(m)) {
                            let (dt, ne) = self.string_parts;
                            let text = ground_string(table.resolve_name(*s), dt, ne);
                            let cond = BExpr::eq(
                                value.clone(),
                                self.mk_ground(table, terms, source, m),
                            );
                            acc = BExpr::ite(cond, text, acc);
                        }
                    }
                    acc
                }
                _ => default,
            },
            // Distinct constructor embeddings never overlap, so the
            // disjointness check above already returned the default.
            EmbeddingKind::Ctor { .. } => default,
            EmbeddingKind::Union { .. } => {
                unreachable!("union targets are boxed before scalar coercion")
            }
        }
    }

    fn coerce_to_boxed_int(
        &self,
        table: &SymbolTable,
        terms: &TermStore,
        source: EmbeddingId,
        value: &BExpr,
        dt: formic_smt::sort::DatatypeId,
        min: i128,
        src_subset: bool,
        default: BExpr,
        encode: fn(BExpr) -> BExpr,
    ) -> BExpr {
        match self.int_view(table, terms, source, value) {
            Some(i) => {
                let boxed = BExpr::construct(dt, 0, vec![encode(i.clone())]);
                if src_subset {
                    boxed
                } else {
                    BExpr::ite(BExpr::ge(i, BExpr::int(min)), boxed, default)
                }
            }
            None => default,
        }
    }

    /// The source value as a mathematical-integer expression, when the
    /// source embedding carries integers. `None` for reals, strings, and
    /// datatypes.
    fn int_view(
        &self,
        table: &SymbolTable,
        terms: &TermStore,
        source: EmbeddingId,
        value: &BExpr,
    ) -> Option<BExpr> {
        match &self.embedding(source).kind {
            EmbeddingKind::Integer => Some(value.clone()),
            EmbeddingKind::Natural { dt } => {
                Some(nat_decode_expr(BExpr::accessor(*dt, 0, 0, value.clone())))
            }
            EmbeddingKind::PosInteger { dt } => {
                Some(pos_decode_expr(BExpr::accessor(*dt, 0, 0, value.clone())))
            }
            EmbeddingKind::NegInteger { dt } => {
                Some(neg_decode_expr(BExpr::accessor(*dt, 0, 0, value.clone())))
            }
            EmbeddingKind::IntRange { lo, dt, .. } => Some(BExpr::add(vec![
                BExpr::int(*lo),
                BExpr::bv_to_int(BExpr::accessor(*dt, 0, 0, value.clone())),
            ])),
            EmbeddingKind::Singleton { value: v, .. } => match table.kind(terms.sym(*v)) {
                SymbolKind::IntLiteral(c) => Some(BExpr::int(*c)),
                _ => None,
            },
            EmbeddingKind::Enum { members, .. } => {
                let first = *members.first()?;
                let SymbolKind::IntLiteral(c0) = table.kind(terms.sym(first)) else {
                    return None;
                };
                let mut acc = BExpr::int(*c0);
                for &m in &members.clone()[1..] {
                    let SymbolKind::IntLiteral(c) = table.kind(terms.sym(m)) else {
                        return None;
                    };
                    let cond =
                        BExpr::eq(value.clone(), self.mk_ground(table, terms, source, m));
                    acc = BExpr::ite(cond, BExpr::int(*c), acc);
                }
                Some(acc)
            }
            EmbeddingKind::Real
            | EmbeddingKind::Str { .. }
            | EmbeddingKind::Ctor { .. } => None,
            EmbeddingKind::Union { .. } => {
                unreachable!("union sources are unboxed before scalar coercion")
            }
        }
    }
}
