//! Symbol table: base sorts, user constructors, maps, unions, literal
//! symbols, variables, and model composition with cardinality contracts.
//!
//! Symbols are numbered in declaration order. That numbering is stable and
//! is what the embedder uses to index the joint backend datatype group, so
//! both maps here are insertion-ordered.

use crate::intern::{TermId, TermStore};
use crate::interner::{Atom, StringInterner};
use crate::union::CanonicalUnion;
use bitflags::bitflags;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

/// Index of a symbol in its [`SymbolTable`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The built-in numeric and string sorts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BaseSort {
    Real,
    Integer,
    Natural,
    PosInteger,
    NegInteger,
    String,
}

impl BaseSort {
    pub const ALL: [BaseSort; 6] = [
        BaseSort::Real,
        BaseSort::Integer,
        BaseSort::Natural,
        BaseSort::PosInteger,
        BaseSort::NegInteger,
        BaseSort::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BaseSort::Real => "Real",
            BaseSort::Integer => "Integer",
            BaseSort::Natural => "Natural",
            BaseSort::PosInteger => "PosInteger",
            BaseSort::NegInteger => "NegInteger",
            BaseSort::String => "String",
        }
    }

    /// True if `self` is a (non-strict) numeric subtype of `other` in the
    /// widening order `PosInteger ⊂ Natural ⊂ Integer ⊂ Real`,
    /// `NegInteger ⊂ Integer ⊂ Real`. This relation is consulted explicitly
    /// because it is not derivable from the canonical-union representation.
    pub fn widens_to(self, other: BaseSort) -> bool {
        use BaseSort::*;
        if self == other {
            return true;
        }
        match (self, other) {
            (PosInteger, Natural | Integer | Real) => true,
            (Natural, Integer | Real) => true,
            (NegInteger, Integer | Real) => true,
            (Integer, Real) => true,
            _ => false,
        }
    }

    /// True if the integer `v` inhabits this sort. `String` and `Real`
    /// contain every integer value only in the `Real` case.
    pub fn contains_int(self, v: i128) -> bool {
        match self {
            BaseSort::Real | BaseSort::Integer => true,
            BaseSort::Natural => v >= 0,
            BaseSort::PosInteger => v >= 1,
            BaseSort::NegInteger => v <= -1,
            BaseSort::String => false,
        }
    }
}

bitflags! {
    /// Declared properties of a map symbol.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MapProps: u8 {
        const TOTAL = 1 << 0;
        const INJECTIVE = 1 << 1;
        const SURJECTIVE = 1 << 2;
    }
}

/// What a symbol is. The set is closed; every consumer matches exhaustively.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Base(BaseSort),
    /// User data constructor with the given arity.
    Constructor { arity: u32 },
    /// Map (relation with functional structure): the first `dom_arity`
    /// argument positions form the domain.
    Map { arity: u32, dom_arity: u32, props: MapProps },
    /// Named union; its member set lives in `SymbolInfo::members`.
    Union,
    /// Built-in binary range-interval type former `Range(lo, hi)`.
    RangeOp,
    /// Built-in binary union type former `UnionOp(a, b)`.
    UnionOp,
    IntLiteral(i128),
    StrLiteral(Atom),
    /// Unification variable (nullary).
    Variable,
}

#[derive(Clone, Debug)]
pub struct SymbolInfo {
    pub name: Atom,
    pub kind: SymbolKind,
    /// Per-argument canonical unions for constructors and maps.
    pub arg_unions: Vec<CanonicalUnion>,
    /// Member union for `Union` symbols.
    pub members: Option<CanonicalUnion>,
}

impl SymbolInfo {
    pub fn arity(&self) -> u32 {
        match self.kind {
            SymbolKind::Constructor { arity } | SymbolKind::Map { arity, .. } => arity,
            SymbolKind::RangeOp | SymbolKind::UnionOp => 2,
            _ => 0,
        }
    }

    pub fn is_user_symbol(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Constructor { .. } | SymbolKind::Map { .. }
        )
    }
}

/// Index of a model declaration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelId(pub u32);

/// Kind of a user-authored cardinality contract.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContractKind {
    AtMost,
    AtLeast,
    /// `requires some N`: forces N degrees of freedom rather than bounding
    /// a range.
    Some,
}

/// `requires atmost/atleast/some N` on a named type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CardContract {
    pub kind: ContractKind,
    pub bound: u64,
    /// The constructor or union symbol the contract names.
    pub ty: SymbolId,
}

/// A model in the composition (`extends`) graph, with its contracts.
#[derive(Clone, Debug)]
pub struct ModelDecl {
    pub name: Atom,
    pub extends: Option<ModelId>,
    pub contracts: Vec<CardContract>,
}

/// The symbol table. Base sorts and the type formers are pre-registered;
/// user symbols, literals, and variables are minted on demand.
#[derive(Debug)]
pub struct SymbolTable {
    strings: StringInterner,
    symbols: Vec<SymbolInfo>,
    by_name: IndexMap<Atom, SymbolId>,
    int_literals: FxHashMap<i128, SymbolId>,
    str_literals: FxHashMap<Atom, SymbolId>,
    base: [SymbolId; 6],
    range_op: SymbolId,
    union_op: SymbolId,
    models: Vec<ModelDecl>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = SymbolTable {
            strings: StringInterner::new(),
            symbols: Vec::new(),
            by_name: IndexMap::new(),
            int_literals: FxHashMap::default(),
            str_literals: FxHashMap::default(),
            base: [SymbolId(0); 6],
            range_op: SymbolId(0),
            union_op: SymbolId(0),
            models: Vec::new(),
        };
        for (i, sort) in BaseSort::ALL.into_iter().enumerate() {
            table.base[i] = table.declare(sort.name(), SymbolKind::Base(sort), Vec::new(), None);
        }
        table.range_op = table.declare("..", SymbolKind::RangeOp, Vec::new(), None);
        table.union_op = table.declare("+", SymbolKind::UnionOp, Vec::new(), None);
        table
    }

    fn declare(
        &mut self,
        name: &str,
        kind: SymbolKind,
        arg_unions: Vec<CanonicalUnion>,
        members: Option<CanonicalUnion>,
    ) -> SymbolId {
        let atom = self.strings.intern(name);
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(SymbolInfo {
            name: atom,
            kind,
            arg_unions,
            members,
        });
        self.by_name.insert(atom, id);
        id
    }

    pub fn intern_name(&mut self, name: &str) -> Atom {
        self.strings.intern(name)
    }

    pub fn resolve_name(&self, atom: Atom) -> &str {
        self.strings.resolve(atom)
    }

    pub fn base_sort(&self, sort: BaseSort) -> SymbolId {
        self.base[BaseSort::ALL.iter().position(|&s| s == sort).unwrap()]
    }

    pub fn range_op(&self) -> SymbolId {
        self.range_op
    }

    pub fn union_op(&self) -> SymbolId {
        self.union_op
    }

    /// Declare a user data constructor with its per-argument unions.
    pub fn declare_constructor(&mut self, name: &str, args: Vec<CanonicalUnion>) -> SymbolId {
        let arity = args.len() as u32;
        self.declare(name, SymbolKind::Constructor { arity }, args, None)
    }

    /// Declare a map symbol. The first `dom_arity` positions are the domain.
    pub fn declare_map(
        &mut self,
        name: &str,
        args: Vec<CanonicalUnion>,
        dom_arity: u32,
        props: MapProps,
    ) -> SymbolId {
        let arity = args.len() as u32;
        debug_assert!(dom_arity <= arity);
        self.declare(name, SymbolKind::Map { arity, dom_arity, props }, args, None)
    }

    /// Declare a named union over an already-normalized member set.
    pub fn declare_union(&mut self, name: &str, members: CanonicalUnion) -> SymbolId {
        self.declare(name, SymbolKind::Union, Vec::new(), Some(members))
    }

    /// Patch one argument union after declaration. Recursive signatures
    /// are declared in two passes: the symbols first, then the argument
    /// unions that reference them.
    pub fn set_arg_union(&mut self, sym: SymbolId, index: usize, u: CanonicalUnion) {
        let info = &mut self.symbols[sym.index()];
        debug_assert!(info.is_user_symbol());
        info.arg_unions[index] = u;
    }

    /// Mint a fresh unification variable.
    pub fn fresh_variable(&mut self, name: &str) -> SymbolId {
        let atom = self.strings.intern(name);
        let id = SymbolId(self.symbols.len() as u32);
        // Variables are deliberately not name-resolvable: distinct variables
        // may share a printable name.
        self.symbols.push(SymbolInfo {
            name: atom,
            kind: SymbolKind::Variable,
            arg_unions: Vec::new(),
            members: None,
        });
        id
    }

    /// The symbol for an integer literal, minted on first use.
    pub fn int_literal(&mut self, v: i128) -> SymbolId {
        if let Some(&id) = self.int_literals.get(&v) {
            return id;
        }
        let name = v.to_string();
        let atom = self.strings.intern(&name);
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(SymbolInfo {
            name: atom,
            kind: SymbolKind::IntLiteral(v),
            arg_unions: Vec::new(),
            members: None,
        });
        self.int_literals.insert(v, id);
        id
    }

    /// The symbol for a string literal, minted on first use.
    pub fn str_literal(&mut self, s: &str) -> SymbolId {
        let atom = self.strings.intern(s);
        if let Some(&id) = self.str_literals.get(&atom) {
            return id;
        }
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(SymbolInfo {
            name: atom,
            kind: SymbolKind::StrLiteral(atom),
            arg_unions: Vec::new(),
            members: None,
        });
        self.str_literals.insert(atom, id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        let atom = self.strings.get(name)?;
        self.by_name.get(&atom).copied()
    }

    pub fn lookup_name(&self, atom: Atom) -> Option<SymbolId> {
        self.by_name.get(&atom).copied()
    }

    pub fn info(&self, id: SymbolId) -> &SymbolInfo {
        &self.symbols[id.index()]
    }

    pub fn kind(&self, id: SymbolId) -> &SymbolKind {
        &self.symbols[id.index()].kind
    }

    pub fn name(&self, id: SymbolId) -> &str {
        self.strings.resolve(self.symbols[id.index()].name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// All symbols in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &SymbolInfo)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, info)| (SymbolId(i as u32), info))
    }

    /// User constructors and maps in declaration order (the stable numbering
    /// used for the joint backend datatype group).
    pub fn user_symbols(&self) -> impl Iterator<Item = (SymbolId, &SymbolInfo)> {
        self.iter().filter(|(_, info)| info.is_user_symbol())
    }

    /// Named unions in declaration order.
    pub fn unions(&self) -> impl Iterator<Item = (SymbolId, &SymbolInfo)> {
        self.iter()
            .filter(|(_, info)| matches!(info.kind, SymbolKind::Union))
    }

    // ---- models & contracts ----

    pub fn declare_model(&mut self, name: &str, extends: Option<ModelId>) -> ModelId {
        let atom = self.strings.intern(name);
        let id = ModelId(self.models.len() as u32);
        self.models.push(ModelDecl {
            name: atom,
            extends,
            contracts: Vec::new(),
        });
        id
    }

    pub fn add_contract(&mut self, model: ModelId, contract: CardContract) {
        self.models[model.0 as usize].contracts.push(contract);
    }

    pub fn model(&self, id: ModelId) -> &ModelDecl {
        &self.models[id.0 as usize]
    }

    /// The contracts visible from `model`, walking its `extends` chain from
    /// the model itself up to the root.
    pub fn visible_contracts(&self, model: ModelId) -> Vec<CardContract> {
        let mut out = Vec::new();
        let mut cur = Some(model);
        while let Some(id) = cur {
            let decl = &self.models[id.0 as usize];
            out.extend(decl.contracts.iter().copied());
            cur = decl.extends;
        }
        out
    }

    // ---- type terms ----

    /// Build the type term for a closed integer range `lo..hi`.
    pub fn mk_range_term(&mut self, terms: &mut TermStore, lo: i128, hi: i128) -> TermId {
        debug_assert!(lo <= hi);
        let lo_sym = self.int_literal(lo);
        let hi_sym = self.int_literal(hi);
        let lo_t = terms.atom(lo_sym);
        let hi_t = terms.atom(hi_sym);
        terms.mk(self.range_op, &[lo_t, hi_t])
    }

    /// Build a right-nested union type term over `parts` (at least one).
    pub fn mk_union_term(&mut self, terms: &mut TermStore, parts: &[TermId]) -> TermId {
        assert!(!parts.is_empty(), "union term over empty part list");
        let mut it = parts.iter().rev().copied();
        let mut acc = it.next().unwrap();
        for part in it {
            acc = terms.mk(self.union_op, &[part, acc]);
        }
        acc
    }

    /// Whether the term is ground (contains no variables).
    pub fn is_ground(&self, terms: &TermStore, t: TermId) -> bool {
        if matches!(self.kind(terms.sym(t)), SymbolKind::Variable) {
            return false;
        }
        terms.args(t).iter().all(|&a| self.is_ground(terms, a))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}
