use crate::card_system::CardSystem;
use crate::cardinality::Cardinality;
use crate::model::PartialModel;
use formic_terms::{
    AtomMember, BaseSort, CanonicalUnion, CardContract, ContractKind, MapProps, SymbolId,
    SymbolTable, TermId, TermStore,
};

fn list_program() -> (SymbolTable, TermStore, SymbolId, SymbolId, SymbolId) {
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

fn cons_fact(table: &mut SymbolTable, terms: &mut TermStore, cons: SymbolId, nil: SymbolId, v: i128) -> TermId {
    let head = terms.atom(table.int_literal(v));
    let tail = terms.atom(nil);
    terms.mk(cons, &[head, tail])
}

#[test]
fn test_recursive_constructor_has_unbounded_nonlfp() {
    crate::tests::init_tracing();
    let (table, mut terms, nil, cons, _) = list_program();
    let pm = PartialModel::new(None);
    let mut sys = CardSystem::build(&table, &mut terms, &pm);
    assert!(sys.propagate(None));
    assert!(!sys.is_unsat());

    assert_eq!(sys.range_of(cons, false).upper, Cardinality::Infinity);
    // A nullary constructor has exactly one possible term.
    assert_eq!(sys.range_of(nil, false).upper, Cardinality::ONE);
}

#[test]
fn test_full_width_range_argument_counts_as_infinite() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let w = table.declare_constructor(
        "W",
        vec![CanonicalUnion::range(i128::MIN, i128::MAX)],
    );
    let pm = PartialModel::new(None);
    let mut sys = CardSystem::build(&table, &mut terms, &pm);
    assert!(sys.propagate(None));
    assert!(!sys.is_unsat());
    assert_eq!(sys.range_of(w, false).upper, Cardinality::Infinity);
}

#[test]
fn test_ground_fact_forces_lfp_lower_bound() {
    let (mut table, mut terms, nil, cons, _) = list_program();
    let mut pm = PartialModel::new(None);
    let f = cons_fact(&mut table, &mut terms, cons, nil, 1);
    pm.assert_fact(&table, &terms, f);

    let mut sys = CardSystem::build(&table, &mut terms, &pm);
    assert!(sys.propagate(None));
    assert!(!sys.is_unsat());
    assert!(sys.range_of(cons, true).lower >= Cardinality::ONE);
    assert_eq!(sys.range_of(cons, true).upper, Cardinality::Infinity);
}

#[test]
fn test_duplicate_ground_facts_count_once() {
    let (mut table, mut terms, nil, cons, _) = list_program();
    let mut pm = PartialModel::new(None);
    let f = cons_fact(&mut table, &mut terms, cons, nil, 1);
    pm.assert_fact(&table, &terms, f);
    pm.assert_fact(&table, &terms, f);
    let g = cons_fact(&mut table, &mut terms, cons, nil, 2);
    pm.assert_fact(&table, &terms, g);

    let mut sys = CardSystem::build(&table, &mut terms, &pm);
    assert!(sys.propagate(None));
    assert_eq!(sys.range_of(cons, true).lower, Cardinality::fin(2));
}

#[test]
fn test_non_ground_fact_subsumed_by_ground_instance() {
    let (mut table, mut terms, nil, cons, _) = list_program();
    let mut pm = PartialModel::new(None);
    let g = cons_fact(&mut table, &mut terms, cons, nil, 1);
    pm.assert_fact(&table, &terms, g);

    // Cons(x, Nil) already has the ground instance Cons(1, Nil).
    let x = table.fresh_variable("x");
    let xt = terms.atom(x);
    let tail = terms.atom(nil);
    let f = terms.mk(cons, &[xt, tail]);
    pm.assert_fact(&table, &terms, f);

    let mut sys = CardSystem::build(&table, &mut terms, &pm);
    assert!(sys.propagate(None));
    assert_eq!(sys.range_of(cons, true).lower, Cardinality::ONE);
}

#[test]
fn test_unifiable_non_ground_facts_count_once() {
    let (mut table, mut terms, nil, cons, _) = list_program();
    let mut pm = PartialModel::new(None);
    let tail = terms.atom(nil);
    for name in ["x", "y"] {
        let v = table.fresh_variable(name);
        let vt = terms.atom(v);
        let f = terms.mk(cons, &[vt, tail]);
        pm.assert_fact(&table, &terms, f);
    }

    let mut sys = CardSystem::build(&table, &mut terms, &pm);
    assert!(sys.propagate(None));
    assert_eq!(sys.range_of(cons, true).lower, Cardinality::ONE);
}

#[test]
fn test_atmost_contract_bounds_every_member_constructor() {
    let (mut table, mut terms, nil, cons, list) = list_program();
    let model = table.declare_model("M", None);
    table.add_contract(
        model,
        CardContract { kind: ContractKind::AtMost, bound: 2, ty: list },
    );
    let pm = PartialModel::new(Some(model));

    let mut sys = CardSystem::build(&table, &mut terms, &pm);
    assert!(sys.propagate(None));
    assert_eq!(sys.range_of(cons, true).upper, Cardinality::fin(2));
    // Nil's structural bound of 1 is tighter than the contract's 2.
    assert_eq!(sys.range_of(nil, true).upper, Cardinality::ONE);
}

#[test]
fn test_contracts_are_visible_through_extends() {
    let (mut table, mut terms, _, cons, list) = list_program();
    let base = table.declare_model("Base", None);
    table.add_contract(
        base,
        CardContract { kind: ContractKind::AtMost, bound: 3, ty: list },
    );
    let derived = table.declare_model("Derived", Some(base));
    let pm = PartialModel::new(Some(derived));

    let mut sys = CardSystem::build(&table, &mut terms, &pm);
    assert!(sys.propagate(None));
    assert_eq!(sys.range_of(cons, true).upper, Cardinality::fin(3));
}

#[test]
fn test_some_contract_records_degrees_of_freedom() {
    let (mut table, mut terms, _, cons, _) = list_program();
    let model = table.declare_model("M", None);
    table.add_contract(
        model,
        CardContract { kind: ContractKind::Some, bound: 4, ty: cons },
    );
    let pm = PartialModel::new(Some(model));

    let mut sys = CardSystem::build(&table, &mut terms, &pm);
    assert!(sys.propagate(None));
    assert_eq!(sys.forced_dof(cons), 4);
    // A `some` contract never tightens the range itself.
    assert_eq!(sys.range_of(cons, true).upper, Cardinality::Infinity);
}

#[test]
fn test_conflicting_bound_and_fact_is_unsat() {
    let (mut table, mut terms, nil, cons, _) = list_program();
    let model = table.declare_model("M", None);
    table.add_contract(
        model,
        CardContract { kind: ContractKind::AtMost, bound: 0, ty: cons },
    );
    let mut pm = PartialModel::new(Some(model));
    let f = cons_fact(&mut table, &mut terms, cons, nil, 1);
    pm.assert_fact(&table, &terms, f);

    let mut sys = CardSystem::build(&table, &mut terms, &pm);
    assert!(!sys.propagate(None));
    assert!(sys.is_unsat());
}

#[test]
fn test_total_map_requires_a_full_domain() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let m = table.declare_map(
        "M",
        vec![CanonicalUnion::range(0, 1), CanonicalUnion::range(0, 3)],
        1,
        MapProps::TOTAL,
    );
    let pm = PartialModel::new(None);
    let mut sys = CardSystem::build(&table, &mut terms, &pm);
    assert!(sys.propagate(None));

    let r = sys.range_of(m, true);
    // Totality forces both domain values to be mapped; the structural
    // product caps the table at 2 * 4 entries.
    assert_eq!(r.lower, Cardinality::fin(2));
    assert_eq!(r.upper, Cardinality::fin(8));
}

#[test]
fn test_injective_map_is_bounded_by_its_codomain() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let m = table.declare_map(
        "M",
        vec![CanonicalUnion::base(BaseSort::Integer), CanonicalUnion::range(0, 3)],
        1,
        MapProps::INJECTIVE,
    );
    let pm = PartialModel::new(None);
    let mut sys = CardSystem::build(&table, &mut terms, &pm);
    assert!(sys.propagate(None));
    assert_eq!(sys.range_of(m, true).upper, Cardinality::fin(4));
}

#[test]
fn test_propagation_narrows_through_variable_constraints() {
    // lfp(A) >= 3 must pull nonLFP(A)'s lower bound up through
    // lfp(A) <= nonLFP(A).
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let a = table.declare_constructor("A", vec![CanonicalUnion::base(BaseSort::Integer)]);
    let model = table.declare_model("M", None);
    table.add_contract(
        model,
        CardContract { kind: ContractKind::AtLeast, bound: 3, ty: a },
    );
    let pm = PartialModel::new(Some(model));

    let mut sys = CardSystem::build(&table, &mut terms, &pm);
    assert!(sys.propagate(None));
    assert_eq!(sys.range_of(a, true).lower, Cardinality::fin(3));
    assert_eq!(sys.range_of(a, false).lower, Cardinality::fin(3));
}

#[test]
fn test_propagation_is_monotone_and_idempotent() {
    let (mut table, mut terms, nil, cons, list) = list_program();
    let model = table.declare_model("M", None);
    table.add_contract(
        model,
        CardContract { kind: ContractKind::AtMost, bound: 5, ty: list },
    );
    let mut pm = PartialModel::new(Some(model));
    let f = cons_fact(&mut table, &mut terms, cons, nil, 1);
    pm.assert_fact(&table, &terms, f);

    let mut sys = CardSystem::build(&table, &mut terms, &pm);
    assert!(sys.propagate(None));
    let first: Vec<_> = [(cons, true), (cons, false), (nil, true), (nil, false)]
        .iter()
        .map(|&(s, l)| sys.range_of(s, l))
        .collect();
    // A second run has nothing left to tighten.
    assert!(sys.propagate(None));
    let second: Vec<_> = [(cons, true), (cons, false), (nil, true), (nil, false)]
        .iter()
        .map(|&(s, l)| sys.range_of(s, l))
        .collect();
    assert_eq!(first, second);
}

#[test]
fn test_cancelled_propagation_leaves_system_satisfiable() {
    use std::sync::atomic::{AtomicBool, Ordering};
    let (table, mut terms, _, cons, _) = list_program();
    let pm = PartialModel::new(None);
    let mut sys = CardSystem::build(&table, &mut terms, &pm);

    let cancel = AtomicBool::new(true);
    assert!(sys.propagate(Some(&cancel)));
    assert!(!sys.is_unsat());
    // Nothing ran: ranges are untouched.
    assert_eq!(sys.range_of(cons, false), crate::cardinality::CardRange::FULL);

    cancel.store(false, Ordering::Relaxed);
    assert!(sys.propagate(Some(&cancel)));
}
