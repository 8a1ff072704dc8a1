//! Type embedding and cardinality bounding.
//!
//! Two pieces live here, sharing the symbol/term layer from
//! `formic-terms` and the backend IR from `formic-smt`:
//!
//! - [`TypeEmbedder`] maps every program type onto a decision-procedure
//!   sort (bit-vectors, integers, reals, one joint recursive datatype
//!   group) and builds the total ground/unground/test/coercion functions
//!   over those sorts.
//! - [`CardSystem`] derives a constraint system over symbolic
//!   per-constructor term counts from the type structure, the model's
//!   cardinality contracts, and the partial model's facts, then
//!   propagates interval bounds to a fixed point or to unsatisfiability.

pub mod card_expr;
pub mod card_system;
pub mod cardinality;
mod defaults;
pub mod embedder;
pub mod embedding;
pub mod factorize;
pub mod model;

#[cfg(test)]
mod tests;

pub use card_expr::{CardConstraint, CardExpr, CardRel, CardVar};
pub use card_system::CardSystem;
pub use cardinality::{CardRange, Cardinality};
pub use embedder::{EmbedderConfig, TypeEmbedder};
pub use embedding::{EmbeddingData, EmbeddingId, EmbeddingKind, UnionBox};
pub use model::PartialModel;
