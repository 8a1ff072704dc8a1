use crate::graph::DepGraph;

#[test]
fn test_sccs_of_a_dag_are_singletons_in_reverse_topo_order() {
    // 0 -> 1 -> 2
    let mut g = DepGraph::new(3);
    g.add_edge(0, 1);
    g.add_edge(1, 2);

    let sccs = g.sccs();
    assert_eq!(sccs, vec![vec![2], vec![1], vec![0]]);
}

#[test]
fn test_scc_groups_cycle_members() {
    // 0 -> 1 -> 2 -> 0, 2 -> 3
    let mut g = DepGraph::new(4);
    g.add_edge(0, 1);
    g.add_edge(1, 2);
    g.add_edge(2, 0);
    g.add_edge(2, 3);

    let sccs = g.sccs();
    assert_eq!(sccs.len(), 2);
    // 3 has no outgoing edges, so it comes first.
    assert_eq!(sccs[0], vec![3]);
    assert_eq!(sccs[1], vec![0, 1, 2]);

    assert!(g.on_cycle(0, &sccs));
    assert!(g.on_cycle(2, &sccs));
    assert!(!g.on_cycle(3, &sccs));
}

#[test]
fn test_self_loop_is_a_cycle() {
    let mut g = DepGraph::new(2);
    g.add_edge(0, 0);
    let sccs = g.sccs();
    assert!(g.on_cycle(0, &sccs));
    assert!(!g.on_cycle(1, &sccs));
}

#[test]
fn test_reverse_topological_property_holds() {
    // Diamond: 0 -> {1, 2} -> 3
    let mut g = DepGraph::new(4);
    g.add_edge(0, 1);
    g.add_edge(0, 2);
    g.add_edge(1, 3);
    g.add_edge(2, 3);

    let sccs = g.sccs();
    let pos = |node: u32| sccs.iter().position(|c| c.contains(&node)).unwrap();
    // Every edge points at a component emitted earlier.
    for from in 0..4u32 {
        for &to in g.successors(from) {
            assert!(pos(to) < pos(from), "edge {from}->{to} violates order");
        }
    }

    let topo = g.sccs_topological();
    assert_eq!(topo[0], vec![0]);
    assert_eq!(topo.last().unwrap(), &vec![3]);
}

#[test]
fn test_disconnected_nodes_each_form_a_component() {
    let g = DepGraph::new(3);
    assert_eq!(g.sccs().len(), 3);
}
