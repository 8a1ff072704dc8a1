//! Term and symbol layer for the formic solver.
//!
//! This crate owns the immutable data the rest of the pipeline reasons over:
//!
//! - **Interned strings** (`Atom`) and **hash-consed terms** (`TermId`), so
//!   structural equality is an integer comparison.
//! - The **symbol table**: constructors, maps, unions, base sorts, literal
//!   symbols, model composition, and cardinality contracts.
//! - **Canonical unions**: type expressions normalized into sorted disjoint
//!   integer ranges plus atomic members, the working unit for all
//!   set-algebraic reasoning.
//! - **Unification** (mgu and one-sided matching) and a Tarjan **SCC**
//!   utility over symbol dependency graphs.

pub mod graph;
pub mod intern;
pub mod interner;
pub mod symbols;
pub mod unify;
pub mod union;

#[cfg(test)]
mod tests;

pub use graph::DepGraph;
pub use intern::{TermData, TermId, TermStore};
pub use interner::{Atom, StringInterner};
pub use symbols::{
    BaseSort, CardContract, ContractKind, MapProps, ModelDecl, ModelId, SymbolId, SymbolInfo,
    SymbolKind, SymbolTable,
};
pub use unify::{Substitution, apply, matches, unify};
pub use union::{AtomMember, CanonicalUnion, flatten_named_unions, type_term_to_union};
