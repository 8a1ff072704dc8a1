use crate::intern::TermStore;
use crate::symbols::SymbolTable;
use crate::union::CanonicalUnion;

#[test]
fn test_term_hash_consing() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();

    let one = table.int_literal(1);
    let nil = table.declare_constructor("Nil", vec![]);
    let cons = table.declare_constructor(
        "Cons",
        vec![CanonicalUnion::range(0, 3), CanonicalUnion::user_sort(nil)],
    );

    let one_t = terms.atom(one);
    let nil_t = terms.atom(nil);
    let a = terms.mk(cons, &[one_t, nil_t]);
    let b = terms.mk(cons, &[one_t, nil_t]);
    assert_eq!(a, b);
    assert_eq!(terms.len(), 3);

    let two = table.int_literal(2);
    let two_t = terms.atom(two);
    let c = terms.mk(cons, &[two_t, nil_t]);
    assert_ne!(a, c);
}

#[test]
fn test_subterm_sharing_and_occurs() {
    let mut table = SymbolTable::new();
    let mut terms = TermStore::new();

    let nil = table.declare_constructor("Nil", vec![]);
    let cons = table.declare_constructor(
        "Cons",
        vec![
            CanonicalUnion::base(crate::symbols::BaseSort::Integer),
            CanonicalUnion::user_sort(nil),
        ],
    );

    let nil_t = terms.atom(nil);
    let one_t = terms.atom(table.int_literal(1));
    let inner = terms.mk(cons, &[one_t, nil_t]);
    let outer = terms.mk(cons, &[one_t, inner]);

    assert!(terms.occurs(inner, outer));
    assert!(terms.occurs(nil_t, outer));
    assert!(!terms.occurs(outer, inner));
}

#[test]
fn test_literal_symbols_are_deduplicated() {
    let mut table = SymbolTable::new();
    assert_eq!(table.int_literal(42), table.int_literal(42));
    assert_ne!(table.int_literal(42), table.int_literal(43));
    assert_eq!(table.str_literal("hi"), table.str_literal("hi"));
}

#[test]
fn test_symbol_lookup_by_name() {
    let mut table = SymbolTable::new();
    let foo = table.declare_constructor("Foo", vec![]);
    assert_eq!(table.lookup("Foo"), Some(foo));
    assert_eq!(table.lookup("Bar"), None);
    assert_eq!(table.name(foo), "Foo");
}

#[test]
fn test_user_symbols_keep_declaration_order() {
    let mut table = SymbolTable::new();
    let a = table.declare_constructor("A", vec![]);
    let b = table.declare_constructor("B", vec![]);
    let c = table.declare_constructor("C", vec![]);
    let order: Vec<_> = table.user_symbols().map(|(id, _)| id).collect();
    assert_eq!(order, vec![a, b, c]);
}
