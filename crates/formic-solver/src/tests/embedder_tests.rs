use crate::embedder::{EmbedderConfig, TypeEmbedder};
use crate::embedding::EmbeddingKind;
use formic_smt::BExpr;
use formic_terms::{AtomMember, BaseSort, CanonicalUnion, SymbolTable, TermId, TermStore};

fn const_set(vals: &[i128]) -> CanonicalUnion {
    CanonicalUnion::from_parts(
        Vec::new(),
        vals.iter().map(|&v| AtomMember::IntConst(v)).collect(),
    )
}

fn int_term(table: &mut SymbolTable, terms: &mut TermStore, v: i128) -> TermId {
    let sym = table.int_literal(v);
    terms.atom(sym)
}

/// Nil, Cons(Integer, List), List ::= Cons + Nil. The recursive-list
/// fixture most scenarios below share.
fn list_program() -> (
    SymbolTable,
    TermStore,
    formic_terms::SymbolId,
    formic_terms::SymbolId,
    formic_terms::SymbolId,
) {
    let mut table = SymbolTable::new();
    let terms = TermStore::new();
    let nil = table.declare_constructor("Nil", vec![]);
    let cons = table.declare_constructor(
        "Cons",
        vec![CanonicalUnion::base(BaseSort::Integer), CanonicalUnion::empty()],
    );
    let list = table.declare_union(
        "List",
        CanonicalUnion::from_parts(
            Vec::new(),
            vec![AtomMember::UserSort(cons), AtomMember::UserSort(nil)],
        ),
    );
    table.set_arg_union(cons, 1, CanonicalUnion::user_sort(list));
    (table, terms, nil, cons, list)
}

#[test]
fn test_constant_set_becomes_one_enum() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    table.declare_constructor("F", vec![const_set(&[1, 2, 3, 4])]);

    let emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());
    let id = emb.choose_representation(&const_set(&[1, 2, 3, 4]));
    match &emb.embedding(id).kind {
        EmbeddingKind::Enum { members, width, .. } => {
            assert_eq!(members.len(), 4);
            assert_eq!(*width, 2);
        }
        other => panic!("expected an enum embedding, found {other:?}"),
    }
}

#[test]
fn test_enum_with_slack_decodes_slack_to_first_member() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    table.declare_constructor("F", vec![const_set(&[1, 2, 3])]);

    let emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());
    let id = emb.choose_representation(&const_set(&[1, 2, 3]));
    let EmbeddingKind::Enum { members, width, dt } = emb.embedding(id).kind.clone() else {
        panic!("expected an enum embedding");
    };
    assert_eq!(width, 2);

    // Index 3 is the unused fourth slot of the width-2 vector.
    let slack = BExpr::construct(dt, 0, vec![BExpr::bv(3, 2)]);
    let decoded = emb.unground(&mut table, &mut terms, id, &slack);
    assert_eq!(decoded, members[0]);
}

#[test]
fn test_declared_range_splits_into_pow2_pieces() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    table.declare_constructor("G", vec![CanonicalUnion::range(1, 6)]);

    let emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());
    for (_, data) in emb.iter() {
        if let EmbeddingKind::IntRange { lo, hi, .. } = data.kind {
            let size = (hi - lo) as u128 + 1;
            assert!(size.is_power_of_two(), "piece {lo}..{hi} not 2^n sized");
        }
    }
    // 1..6 factors as {1}, 2..3, 4..5, {6}.
    let pick = emb.choose_representation(&CanonicalUnion::range(2, 3));
    assert!(matches!(
        emb.embedding(pick).kind,
        EmbeddingKind::IntRange { lo: 2, hi: 3, width: 1, .. }
    ));
    assert!(matches!(
        emb.embedding(emb.choose_representation(&const_set(&[6]))).kind,
        EmbeddingKind::Singleton { .. }
    ));
}

#[test]
fn test_ground_round_trips_scalars() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());

    let int = emb.base_embedding(BaseSort::Integer);
    let t = int_term(&mut table, &mut terms, 42);
    let e = emb.mk_ground(&table, &terms, int, t);
    assert_eq!(e, BExpr::int(42));
    assert_eq!(emb.unground(&mut table, &mut terms, int, &e), t);

    let nat = emb.base_embedding(BaseSort::Natural);
    for v in 0..8 {
        let t = int_term(&mut table, &mut terms, v);
        let e = emb.mk_ground(&table, &terms, nat, t);
        assert_eq!(emb.unground(&mut table, &mut terms, nat, &e), t);
    }

    let neg = emb.base_embedding(BaseSort::NegInteger);
    let t = int_term(&mut table, &mut terms, -7);
    let e = emb.mk_ground(&table, &terms, neg, t);
    assert_eq!(emb.unground(&mut table, &mut terms, neg, &e), t);
}

#[test]
fn test_ground_round_trips_strings() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());
    let string = emb.base_embedding(BaseSort::String);

    for text in ["", "a", "hello"] {
        let sym = table.str_literal(text);
        let t = terms.atom(sym);
        let e = emb.mk_ground(&table, &terms, string, t);
        assert_eq!(emb.unground(&mut table, &mut terms, string, &e), t);
    }
}

#[test]
fn test_ground_round_trips_constructor_values() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let point = table.declare_constructor(
        "Point",
        vec![CanonicalUnion::range(0, 3), CanonicalUnion::range(0, 3)],
    );
    let emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());

    let x = int_term(&mut table, &mut terms, 1);
    let y = int_term(&mut table, &mut terms, 2);
    let t = terms.mk(point, &[x, y]);
    let id = emb.embedding_of_symbol(point);
    let e = emb.mk_ground(&table, &terms, id, t);
    assert!(e.is_literal());
    assert_eq!(emb.unground(&mut table, &mut terms, id, &e), t);
}

#[test]
fn test_ground_round_trips_union_values() {
    let (mut table, mut terms, nil, cons, list) = list_program();
    let emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());

    let list_emb = emb.embedding_of_symbol(list);
    assert!(matches!(
        emb.embedding(list_emb).kind,
        EmbeddingKind::Union { .. }
    ));

    let nil_t = terms.atom(nil);
    let one = int_term(&mut table, &mut terms, 1);
    let t = terms.mk(cons, &[one, nil_t]);
    let e = emb.mk_ground(&table, &terms, list_emb, t);
    assert_eq!(emb.unground(&mut table, &mut terms, list_emb, &e), t);
    let e_nil = emb.mk_ground(&table, &terms, list_emb, nil_t);
    assert_eq!(emb.unground(&mut table, &mut terms, list_emb, &e_nil), nil_t);
}

#[test]
fn test_recursive_defaults_resolve_through_the_base_case() {
    let (mut table, mut terms, nil, cons, list) = list_program();
    let emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());

    let nil_t = terms.atom(nil);
    assert_eq!(emb.embedding(emb.embedding_of_symbol(list)).default_term(), nil_t);

    let zero = int_term(&mut table, &mut terms, 0);
    let cons_default = terms.mk(cons, &[zero, nil_t]);
    assert_eq!(
        emb.embedding(emb.embedding_of_symbol(cons)).default_term(),
        cons_default
    );
}

#[test]
fn test_choose_representation_prefers_cheapest_superset() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    table.declare_constructor("G", vec![CanonicalUnion::range(0, 3)]);
    let emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());

    // 1..2 has no exact embedding; the 0..3 range beats Natural/Integer
    // on cost.
    let id = emb.choose_representation(&CanonicalUnion::range(1, 2));
    assert!(matches!(
        emb.embedding(id).kind,
        EmbeddingKind::IntRange { lo: 0, hi: 3, .. }
    ));

    // Nothing registered covers -9..9 except Integer itself.
    let wide = emb.choose_representation(&CanonicalUnion::range(-9, 9));
    assert_eq!(wide, emb.base_embedding(BaseSort::Integer));
}

#[test]
fn test_mk_test_folds_on_ground_values() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());
    let int = emb.base_embedding(BaseSort::Integer);

    let ty = table.mk_range_term(&mut terms, 4, 7);
    let inside = emb.mk_test(&table, &terms, int, &BExpr::int(5), ty);
    assert_eq!(inside, BExpr::TRUE);
    let outside = emb.mk_test(&table, &terms, int, &BExpr::int(9), ty);
    assert_eq!(outside, BExpr::FALSE);
}

#[test]
fn test_intersection_is_memoized_and_empty_is_none() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let mut emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());

    let a = table.mk_range_term(&mut terms, 0, 5);
    let b = table.mk_range_term(&mut terms, 3, 9);
    let c = table.mk_range_term(&mut terms, 20, 30);

    let i = emb.intersect_types(&table, &terms, a, b).expect("overlap");
    assert_eq!(i.ranges(), &[(3, 5)]);
    // Symmetric key: the flipped query hits the cache.
    let j = emb.intersect_types(&table, &terms, b, a).expect("overlap");
    assert_eq!(i, j);
    assert_eq!(emb.intersect_types(&table, &terms, a, c), None);
}

// ---- coercions -------------------------------------------------------

#[test]
fn test_coercion_is_identity_on_same_embedding() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());
    let int = emb.base_embedding(BaseSort::Integer);

    let v = BExpr::Var("x".into(), emb.embedding(int).sort);
    assert_eq!(emb.mk_coercion(&table, &terms, int, int, &v), v);
}

#[test]
fn test_coercion_range_to_integer_preserves_values() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    table.declare_constructor("G", vec![CanonicalUnion::range(4, 7)]);
    let emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());

    let range = emb.choose_representation(&CanonicalUnion::range(4, 7));
    let int = emb.base_embedding(BaseSort::Integer);
    for v in 4..=7 {
        let t = int_term(&mut table, &mut terms, v);
        let ground = emb.mk_ground(&table, &terms, range, t);
        let coerced = emb.mk_coercion(&table, &terms, int, range, &ground);
        assert_eq!(coerced, BExpr::int(v));
    }
}

#[test]
fn test_coercion_into_range_defaults_outside_the_intersection() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    table.declare_constructor("G", vec![CanonicalUnion::range(4, 7)]);
    let emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());

    let range = emb.choose_representation(&CanonicalUnion::range(4, 7));
    let int = emb.base_embedding(BaseSort::Integer);

    // Inside: values survive the round trip.
    let coerced = emb.mk_coercion(&table, &terms, range, int, &BExpr::int(6));
    let six = int_term(&mut table, &mut terms, 6);
    assert_eq!(emb.unground(&mut table, &mut terms, range, &coerced), six);

    // Outside: still a valid member of the target, the default.
    let coerced = emb.mk_coercion(&table, &terms, range, int, &BExpr::int(20));
    let four = int_term(&mut table, &mut terms, 4);
    assert_eq!(emb.unground(&mut table, &mut terms, range, &coerced), four);
}

#[test]
fn test_coercion_boxes_into_union_targets() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let two_ranges = CanonicalUnion::from_parts(vec![(1, 2), (5, 6)], Vec::new());
    table.declare_constructor("H", vec![two_ranges.clone()]);
    let emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());

    let target = emb.choose_representation(&two_ranges);
    assert!(matches!(
        emb.embedding(target).kind,
        EmbeddingKind::Union { .. }
    ));
    let int = emb.base_embedding(BaseSort::Integer);

    for v in [1i128, 2, 5, 6] {
        let coerced = emb.mk_coercion(&table, &terms, target, int, &BExpr::int(v));
        let t = int_term(&mut table, &mut terms, v);
        assert_eq!(emb.unground(&mut table, &mut terms, target, &coerced), t);
    }
}

#[test]
fn test_coercion_unboxes_union_sources() {
    let (mut table, mut terms, nil, cons, list) = list_program();
    let emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());

    let list_emb = emb.embedding_of_symbol(list);
    let cons_emb = emb.embedding_of_symbol(cons);
    let nil_t = terms.atom(nil);
    let one = int_term(&mut table, &mut terms, 1);
    let t = terms.mk(cons, &[one, nil_t]);

    let boxed = emb.mk_ground(&table, &terms, list_emb, t);
    let coerced = emb.mk_coercion(&table, &terms, cons_emb, list_emb, &boxed);
    assert_eq!(emb.unground(&mut table, &mut terms, cons_emb, &coerced), t);
}

#[test]
fn test_coercion_between_numeric_sorts_recodes() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());

    let nat = emb.base_embedding(BaseSort::Natural);
    let pos = emb.base_embedding(BaseSort::PosInteger);

    // 3 is in Natural ∩ PosInteger; the codes differ but the value must
    // survive.
    let three = int_term(&mut table, &mut terms, 3);
    let as_pos = emb.mk_ground(&table, &terms, pos, three);
    let as_nat = emb.mk_coercion(&table, &terms, nat, pos, &as_pos);
    assert_eq!(emb.unground(&mut table, &mut terms, nat, &as_nat), three);

    // 0 is a Natural but not a PosInteger: coercion falls back to the
    // target default, which is 1.
    let zero = int_term(&mut table, &mut terms, 0);
    let as_nat = emb.mk_ground(&table, &terms, nat, zero);
    let back = emb.mk_coercion(&table, &terms, pos, nat, &as_nat);
    let one = int_term(&mut table, &mut terms, 1);
    assert_eq!(emb.unground(&mut table, &mut terms, pos, &back), one);
}

#[test]
fn test_get_subtype_narrows_to_the_constant() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());
    let int = emb.base_embedding(BaseSort::Integer);

    let t = int_term(&mut table, &mut terms, 17);
    let e = emb.mk_ground(&table, &terms, int, t);
    assert_eq!(emb.get_subtype(&mut table, &mut terms, int, &e), t);
}

#[test]
fn test_get_subtype_of_a_constructor_value_is_its_sort() {
    let (mut table, mut terms, nil, cons, list) = list_program();
    let emb = TypeEmbedder::build(&mut table, &mut terms, EmbedderConfig::default());

    let list_emb = emb.embedding_of_symbol(list);
    let nil_t = terms.atom(nil);
    let one = int_term(&mut table, &mut terms, 1);
    let t = terms.mk(cons, &[one, nil_t]);
    let e = emb.mk_ground(&table, &terms, list_emb, t);

    let cons_sort = terms.atom(cons);
    assert_eq!(emb.get_subtype(&mut table, &mut terms, list_emb, &e), cons_sort);
}
