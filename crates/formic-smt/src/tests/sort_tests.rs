use crate::sort::{CtorDecl, DatatypeDecl, Sort, SortRef, SortStore};

#[test]
fn test_scalar_sorts_are_interned() {
    let mut sorts = SortStore::new();
    assert_eq!(sorts.int(), sorts.int());
    assert_eq!(sorts.bitvec(8), sorts.bitvec(8));
    assert_ne!(sorts.bitvec(8), sorts.bitvec(16));
    assert_ne!(sorts.int(), sorts.real());
}

#[test]
fn test_declare_recursive_group() {
    let mut sorts = SortStore::new();
    let int = sorts.int();

    // List = Nil | Cons(Int, List); Tree = Leaf(Int) | Node(List)
    let group = sorts.declare_group(vec![
        DatatypeDecl {
            name: "List".into(),
            ctors: vec![
                CtorDecl::nullary("Nil"),
                CtorDecl {
                    name: "Cons".into(),
                    fields: vec![
                        ("head".into(), SortRef::Sort(int)),
                        ("tail".into(), SortRef::Recursive(0)),
                    ],
                },
            ],
        },
        DatatypeDecl {
            name: "Tree".into(),
            ctors: vec![
                CtorDecl::unary("Leaf", "v", SortRef::Sort(int)),
                CtorDecl::unary("Node", "kids", SortRef::Recursive(0)),
            ],
        },
    ]);

    assert_eq!(group.len(), 2);
    let (list_dt, list_sort) = group[0];
    let (tree_dt, _) = group[1];

    let list = sorts.datatype(list_dt);
    assert_eq!(list.ctors.len(), 2);
    // The recursive tail field resolved to List's own sort.
    assert_eq!(list.ctors[1].fields[1].1, list_sort);
    // Tree's Node field resolved to List (group member 0).
    assert_eq!(sorts.datatype(tree_dt).ctors[1].fields[0].1, list_sort);

    assert_eq!(sorts.get(list_sort), Sort::Datatype(list_dt));
}

#[test]
#[should_panic(expected = "zero-width bit-vector")]
fn test_zero_width_bitvec_is_rejected() {
    let mut sorts = SortStore::new();
    let _ = sorts.bitvec(0);
}
