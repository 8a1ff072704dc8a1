//! Dependency graphs over dense node indexes, with Tarjan SCC.
//!
//! Callers map their `SymbolId`s (or embedding ids) to dense `u32` node
//! indexes and back. `sccs` returns components in reverse-topological
//! order: every edge leaving a component points at a component emitted
//! earlier.

use fixedbitset::FixedBitSet;

#[derive(Clone, Debug, Default)]
pub struct DepGraph {
    edges: Vec<Vec<u32>>,
}

impl DepGraph {
    pub fn new(nodes: usize) -> Self {
        DepGraph {
            edges: vec![Vec::new(); nodes],
        }
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn add_edge(&mut self, from: u32, to: u32) {
        let out = &mut self.edges[from as usize];
        if !out.contains(&to) {
            out.push(to);
        }
    }

    pub fn successors(&self, node: u32) -> &[u32] {
        &self.edges[node as usize]
    }

    pub fn has_edge(&self, from: u32, to: u32) -> bool {
        self.edges[from as usize].contains(&to)
    }

    /// True if `node` sits on a cycle (a nontrivial SCC or a self-loop).
    pub fn on_cycle(&self, node: u32, sccs: &[Vec<u32>]) -> bool {
        if self.has_edge(node, node) {
            return true;
        }
        sccs.iter()
            .any(|c| c.len() > 1 && c.contains(&node))
    }

    /// Tarjan's algorithm, iterative. Components come out in
    /// reverse-topological order of the condensation.
    pub fn sccs(&self) -> Vec<Vec<u32>> {
        let n = self.edges.len();
        let mut index = vec![u32::MAX; n];
        let mut lowlink = vec![0u32; n];
        let mut on_stack = FixedBitSet::with_capacity(n);
        let mut stack: Vec<u32> = Vec::new();
        let mut next_index = 0u32;
        let mut out: Vec<Vec<u32>> = Vec::new();

        // Explicit call frames: (node, next successor position).
        let mut frames: Vec<(u32, usize)> = Vec::new();
        for root in 0..n as u32 {
            if index[root as usize] != u32::MAX {
                continue;
            }
            frames.push((root, 0));
            while let Some(&(v, pos)) = frames.last() {
                let vi = v as usize;
                if index[vi] == u32::MAX {
                    index[vi] = next_index;
                    lowlink[vi] = next_index;
                    next_index += 1;
                    stack.push(v);
                    on_stack.insert(vi);
                }
                if let Some(&w) = self.edges[vi].get(pos) {
                    frames.last_mut().expect("frame present").1 = pos + 1;
                    let wi = w as usize;
                    if index[wi] == u32::MAX {
                        frames.push((w, 0));
                    } else if on_stack.contains(wi) {
                        lowlink[vi] = lowlink[vi].min(index[wi]);
                    }
                    continue;
                }
                // All successors visited; pop the frame.
                frames.pop();
                if let Some(&(parent, _)) = frames.last() {
                    let pi = parent as usize;
                    lowlink[pi] = lowlink[pi].min(lowlink[vi]);
                }
                if lowlink[vi] == index[vi] {
                    let mut component = Vec::new();
                    loop {
                        let w = stack.pop().expect("tarjan stack underflow");
                        on_stack.set(w as usize, false);
                        component.push(w);
                        if w == v {
                            break;
                        }
                    }
                    component.sort_unstable();
                    out.push(component);
                }
            }
        }
        out
    }

    /// Components in topological order (dependencies last).
    pub fn sccs_topological(&self) -> Vec<Vec<u32>> {
        let mut components = self.sccs();
        components.reverse();
        components
    }
}
