//! The decision-procedure backend *vocabulary*.
//!
//! This crate defines the sorts, datatype declarations, and expression tree
//! the embeddings target. It deliberately stops at the interface: there is
//! no solving here, only the typed terms a backend query is made of.
//! Satisfiability and model extraction belong to the symbolic-execution
//! layer that owns the actual backend session.

pub mod expr;
pub mod sort;

#[cfg(test)]
mod tests;

pub use expr::BExpr;
pub use sort::{CtorDecl, DatatypeDecl, DatatypeId, Sort, SortId, SortRef, SortStore};
