//! Embedding variants: the closed set of representation strategies.
//!
//! Each embedding owns exactly one backend sort and records the type it
//! encodes as both a term and a canonical union. The operations over
//! embeddings (test, coercion, grounding, subtype narrowing) live in
//! [`ops`] and [`coerce`] as `TypeEmbedder` methods, dispatching on
//! [`EmbeddingKind`] with exhaustive matches: adding a representation is a
//! compile-checked change across every consumer.

pub mod coerce;
pub mod numeric;
pub mod ops;

use formic_smt::sort::{DatatypeId, SortId};
use formic_smt::BExpr;
use formic_terms::{CanonicalUnion, SymbolId, TermId};

/// Index of an embedding in its `TypeEmbedder`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmbeddingId(pub u32);

/// One boxing constructor of a union embedding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnionBox {
    /// Constructor index inside the union's datatype.
    pub ctor: u32,
    /// The embedding whose values this constructor boxes.
    pub emb: EmbeddingId,
}

#[derive(Clone, Debug)]
pub enum EmbeddingKind {
    /// Backend Real sort.
    Real,
    /// Backend Int sort, identity encoding.
    Integer,
    /// A one-constructor datatype over an unconstrained Int, carrying the
    /// code of the bijection 0,1,2,3,… ↔ 0,1,−1,2,…
    Natural { dt: DatatypeId },
    /// As `Natural`, via the bijection 1,2,3,4,5,… ↔ 0,1,−1,2,−2,…
    PosInteger { dt: DatatypeId },
    /// As `PosInteger`, mirrored with the opposite parity.
    NegInteger { dt: DatatypeId },
    /// `[lo, hi]` boxed as a one-constructor datatype over a width-`width`
    /// bit-vector; `hi - lo + 1 == 2^width`, `width >= 1`.
    IntRange {
        lo: i128,
        hi: i128,
        width: u32,
        dt: DatatypeId,
    },
    /// A finite constant set boxed over a bit-vector index into `members`.
    /// The slot count `2^width` may exceed `members.len()`; slack indexes
    /// decode to member 0.
    Enum {
        members: Vec<TermId>,
        width: u32,
        dt: DatatypeId,
    },
    /// A single constant as a zero-argument datatype constructor.
    Singleton { value: TermId, dt: DatatypeId },
    /// Strings as `Str = Empty | Box(NonEmpty)`,
    /// `NonEmpty = Char(bv8) | Append(NonEmpty, bv8)`.
    Str { dt: DatatypeId, nonempty: DatatypeId },
    /// A user data constructor as one backend datatype constructor whose
    /// field sorts are other embeddings' sorts.
    Ctor {
        sym: SymbolId,
        dt: DatatypeId,
        fields: Vec<EmbeddingId>,
    },
    /// A canonical union as a multi-constructor datatype, one boxing
    /// constructor per indivisible fragment.
    Union { dt: DatatypeId, boxes: Vec<UnionBox> },
}

#[derive(Clone, Debug)]
pub struct EmbeddingData {
    pub kind: EmbeddingKind,
    /// The one backend sort this embedding owns.
    pub sort: SortId,
    /// The encoded type, as a term.
    pub ty: TermId,
    /// The encoded type, as a canonical union (named unions flattened).
    pub union: CanonicalUnion,
    /// Relative encoding cost; lower is preferred by representation
    /// selection.
    pub cost: u32,
    /// A guaranteed inhabitant, as a term/backend-expression pair. Filled
    /// during default-member resolution for `Ctor` and `Union`; immediate
    /// for every other variant.
    pub default_member: Option<(TermId, BExpr)>,
}

impl EmbeddingData {
    pub fn default_term(&self) -> TermId {
        self.default_member
            .as_ref()
            .expect("default member resolved during construction")
            .0
    }

    pub fn default_expr(&self) -> &BExpr {
        &self
            .default_member
            .as_ref()
            .expect("default member resolved during construction")
            .1
    }
}
