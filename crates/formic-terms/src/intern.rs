//! Hash-consed term storage.
//!
//! Terms are immutable (symbol, args) nodes interned into a single arena.
//! Every structurally equal term maps to the same `TermId`, so equality and
//! hashing are `u32` comparisons and subterm sharing is free.

use crate::symbols::SymbolId;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Index of an interned term in its [`TermStore`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(pub u32);

impl TermId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

type ArgList = SmallVec<[TermId; 4]>;

/// One interned node: a symbol applied to ordered argument terms.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TermData {
    pub sym: SymbolId,
    pub args: ArgList,
}

/// Arena of interned terms with a canonicalization map from
/// `(symbol, args)` to index.
#[derive(Debug, Default)]
pub struct TermStore {
    nodes: Vec<TermData>,
    canon: FxHashMap<TermData, TermId>,
}

impl TermStore {
    pub fn new() -> Self {
        TermStore::default()
    }

    /// Intern `sym(args...)`, returning the canonical id.
    pub fn mk(&mut self, sym: SymbolId, args: &[TermId]) -> TermId {
        let data = TermData {
            sym,
            args: ArgList::from_slice(args),
        };
        if let Some(&id) = self.canon.get(&data) {
            return id;
        }
        let id = TermId(self.nodes.len() as u32);
        self.nodes.push(data.clone());
        self.canon.insert(data, id);
        id
    }

    /// Intern a nullary application of `sym`.
    pub fn atom(&mut self, sym: SymbolId) -> TermId {
        self.mk(sym, &[])
    }

    pub fn get(&self, id: TermId) -> &TermData {
        &self.nodes[id.index()]
    }

    pub fn sym(&self, id: TermId) -> SymbolId {
        self.nodes[id.index()].sym
    }

    pub fn args(&self, id: TermId) -> &[TermId] {
        &self.nodes[id.index()].args
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True if `needle` occurs anywhere in `haystack` (including as the
    /// whole term). Sharing makes this a simple DFS over node ids.
    pub fn occurs(&self, needle: TermId, haystack: TermId) -> bool {
        if needle == haystack {
            return true;
        }
        let mut stack: SmallVec<[TermId; 16]> = SmallVec::new();
        stack.push(haystack);
        while let Some(t) = stack.pop() {
            if t == needle {
                return true;
            }
            stack.extend(self.args(t).iter().copied());
        }
        false
    }
}
