use crate::intern::TermStore;
use crate::symbols::{BaseSort, SymbolTable};
use crate::unify::{apply, matches, unify};
use crate::union::CanonicalUnion;

fn list_fixture(table: &mut SymbolTable) -> (crate::symbols::SymbolId, crate::symbols::SymbolId) {
    let nil = table.declare_constructor("Nil", vec![]);
    let cons = table.declare_constructor(
        "Cons",
        vec![
            CanonicalUnion::base(BaseSort::Integer),
            CanonicalUnion::user_sort(nil),
        ],
    );
    (nil, cons)
}

#[test]
fn test_unify_ground_terms() {
    crate::tests::init_tracing();
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let (nil, cons) = list_fixture(&mut table);

    let nil_t = terms.atom(nil);
    let one_t = terms.atom(table.int_literal(1));
    let a = terms.mk(cons, &[one_t, nil_t]);
    let b = terms.mk(cons, &[one_t, nil_t]);

    let subst = unify(&table, &mut terms, a, b).expect("identical terms unify");
    assert!(subst.is_empty());

    let two_t = terms.atom(table.int_literal(2));
    let c = terms.mk(cons, &[two_t, nil_t]);
    assert!(unify(&table, &mut terms, a, c).is_none());
}

#[test]
fn test_unify_binds_variable() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let (nil, cons) = list_fixture(&mut table);

    let x = table.fresh_variable("x");
    let x_t = terms.atom(x);
    let nil_t = terms.atom(nil);
    let one_t = terms.atom(table.int_literal(1));

    let pattern = terms.mk(cons, &[x_t, nil_t]);
    let subject = terms.mk(cons, &[one_t, nil_t]);

    let subst = unify(&table, &mut terms, pattern, subject).expect("unifies");
    assert_eq!(subst.get(x), Some(one_t));
    assert_eq!(apply(&table, &mut terms, &subst, pattern), subject);
}

#[test]
fn test_unify_two_variables_produces_mgu() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let (nil, cons) = list_fixture(&mut table);

    let x = table.fresh_variable("x");
    let y = table.fresh_variable("y");
    let x_t = terms.atom(x);
    let y_t = terms.atom(y);
    let nil_t = terms.atom(nil);

    // Cons(x, Nil) ~ Cons(y, Nil): x and y are aliased, neither is forced
    // to a ground term.
    let a = terms.mk(cons, &[x_t, nil_t]);
    let b = terms.mk(cons, &[y_t, nil_t]);
    let subst = unify(&table, &mut terms, a, b).expect("unifies");

    let a2 = apply(&table, &mut terms, &subst, a);
    let b2 = apply(&table, &mut terms, &subst, b);
    assert_eq!(a2, b2);
}

#[test]
fn test_aliased_variables_share_later_bindings() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let pair = table.declare_constructor(
        "Pair",
        vec![
            CanonicalUnion::base(BaseSort::Integer),
            CanonicalUnion::base(BaseSort::Integer),
        ],
    );

    let x = table.fresh_variable("x");
    let y = table.fresh_variable("y");
    let x_t = terms.atom(x);
    let y_t = terms.atom(y);
    let one_t = terms.atom(table.int_literal(1));

    // Pair(x, y) ~ Pair(y, 1): x and y are first merged into one class,
    // then the whole class is bound through the second position.
    let a = terms.mk(pair, &[x_t, y_t]);
    let b = terms.mk(pair, &[y_t, one_t]);
    let subst = unify(&table, &mut terms, a, b).expect("unifies");

    assert_eq!(subst.get(x), Some(one_t));
    assert_eq!(subst.get(y), Some(one_t));
    let ground = terms.mk(pair, &[one_t, one_t]);
    assert_eq!(apply(&table, &mut terms, &subst, a), ground);
    assert_eq!(apply(&table, &mut terms, &subst, b), ground);
}

#[test]
fn test_occurs_check_rejects_cyclic_binding() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let (_, cons) = list_fixture(&mut table);

    let x = table.fresh_variable("x");
    let x_t = terms.atom(x);
    let one_t = terms.atom(table.int_literal(1));
    let wrapped = terms.mk(cons, &[one_t, x_t]);

    assert!(unify(&table, &mut terms, x_t, wrapped).is_none());
}

#[test]
fn test_matching_is_one_sided() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let (nil, cons) = list_fixture(&mut table);

    let x = table.fresh_variable("x");
    let x_t = terms.atom(x);
    let nil_t = terms.atom(nil);
    let one_t = terms.atom(table.int_literal(1));

    let pattern = terms.mk(cons, &[x_t, nil_t]);
    let ground = terms.mk(cons, &[one_t, nil_t]);

    let bindings = matches(&table, &terms, pattern, ground).expect("pattern matches");
    assert_eq!(bindings.get(&x), Some(&one_t));

    // The ground term does not match the pattern in the other direction.
    assert!(matches(&table, &terms, ground, pattern).is_none());
}

#[test]
fn test_matching_requires_consistent_bindings() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();
    let pair = table.declare_constructor(
        "Pair",
        vec![
            CanonicalUnion::base(BaseSort::Integer),
            CanonicalUnion::base(BaseSort::Integer),
        ],
    );

    let x = table.fresh_variable("x");
    let x_t = terms.atom(x);
    let one_t = terms.atom(table.int_literal(1));
    let two_t = terms.atom(table.int_literal(2));

    let pattern = terms.mk(pair, &[x_t, x_t]);
    let same = terms.mk(pair, &[one_t, one_t]);
    let diff = terms.mk(pair, &[one_t, two_t]);

    assert!(matches(&table, &terms, pattern, same).is_some());
    assert!(matches(&table, &terms, pattern, diff).is_none());
}
