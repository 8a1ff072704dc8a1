//! Embedding construction and representation selection.
//!
//! `TypeEmbedder::build` runs the whole pipeline for one program: base
//! sorts, constant/range factorization, the joint recursive datatype group
//! for user constructors and unions, and default-member resolution. The
//! instance then answers `choose_representation` / `get_embedding` queries
//! for the symbolic executor, with every cache owned by the instance and
//! dying with it.

use crate::defaults::resolve_defaults;
use crate::embedding::{EmbeddingData, EmbeddingId, EmbeddingKind, UnionBox};
use crate::factorize::{index_width, slot_count, split_pow2_aligned};
use formic_smt::sort::{CtorDecl, DatatypeDecl, DatatypeId, SortId, SortRef, SortStore};
use formic_smt::BExpr;
use formic_terms::{
    AtomMember, BaseSort, CanonicalUnion, SymbolId, SymbolKind, SymbolTable, TermId, TermStore,
    flatten_named_unions,
};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

/// Relative encoding costs. Lower cost wins when a type is representable
/// several ways.
#[derive(Clone, Debug)]
pub struct EmbedderConfig {
    pub cost_singleton: u32,
    pub cost_range: u32,
    pub cost_enum: u32,
    pub cost_ctor: u32,
    pub cost_union: u32,
    pub cost_pos_integer: u32,
    pub cost_neg_integer: u32,
    pub cost_natural: u32,
    pub cost_integer: u32,
    pub cost_string: u32,
    pub cost_real: u32,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        EmbedderConfig {
            cost_singleton: 5,
            cost_range: 10,
            cost_enum: 15,
            cost_ctor: 20,
            cost_union: 25,
            cost_pos_integer: 30,
            cost_neg_integer: 30,
            cost_natural: 40,
            cost_integer: 50,
            cost_string: 50,
            cost_real: 60,
        }
    }
}

impl EmbedderConfig {
    fn base_cost(&self, sort: BaseSort) -> u32 {
        match sort {
            BaseSort::Real => self.cost_real,
            BaseSort::Integer => self.cost_integer,
            BaseSort::Natural => self.cost_natural,
            BaseSort::PosInteger => self.cost_pos_integer,
            BaseSort::NegInteger => self.cost_neg_integer,
            BaseSort::String => self.cost_string,
        }
    }
}

/// One entry of the joint datatype group under construction.
enum GroupEntry {
    Ctor(SymbolId),
    NamedUnion(SymbolId),
    ArgUnion(CanonicalUnion),
}

/// How a constructor field is represented: an already-registered embedding
/// or a member of the group being declared.
#[derive(Copy, Clone)]
enum FieldRep {
    Existing(EmbeddingId),
    Group(usize),
}

pub struct TypeEmbedder {
    pub sorts: SortStore,
    config: EmbedderConfig,
    embeddings: Vec<EmbeddingData>,
    by_sort: FxHashMap<SortId, EmbeddingId>,
    by_union: FxHashMap<CanonicalUnion, EmbeddingId>,
    by_symbol: FxHashMap<SymbolId, EmbeddingId>,
    atom_index: FxHashMap<AtomMember, Vec<EmbeddingId>>,
    range_index: Vec<(i128, i128, EmbeddingId)>,
    base: [EmbeddingId; 6],
    /// (Str, NonEmpty) datatypes of the string encoding.
    pub(crate) string_parts: (DatatypeId, DatatypeId),
    intersect_cache: FxHashMap<(TermId, TermId), Option<CanonicalUnion>>,
}

impl TypeEmbedder {
    /// Build the full embedding set for a program's type system.
    pub fn build(
        table: &mut SymbolTable,
        terms: &mut TermStore,
        config: EmbedderConfig,
    ) -> TypeEmbedder {
        let mut embedder = TypeEmbedder {
            sorts: SortStore::new(),
            config,
            embeddings: Vec::new(),
            by_sort: FxHashMap::default(),
            by_union: FxHashMap::default(),
            by_symbol: FxHashMap::default(),
            atom_index: FxHashMap::default(),
            range_index: Vec::new(),
            base: [EmbeddingId(0); 6],
            string_parts: (DatatypeId(0), DatatypeId(0)),
            intersect_cache: FxHashMap::default(),
        };
        embedder.register_base_sorts(table, terms);
        embedder.factorize_constants(table, terms);
        embedder.build_joint_datatypes(table, terms);
        resolve_defaults(&mut embedder, table, terms);
        debug!(
            embeddings = embedder.embeddings.len(),
            datatypes = embedder.sorts.datatype_count(),
            "type embedding construction complete"
        );
        embedder
    }

    // ---- registration -------------------------------------------------

    fn register(&mut self, data: EmbeddingData) -> EmbeddingId {
        let id = EmbeddingId(self.embeddings.len() as u32);
        let prev = self.by_sort.insert(data.sort, id);
        assert!(
            prev.is_none(),
            "backend sort {:?} already owned by embedding {:?}",
            data.sort,
            prev
        );
        self.by_union.insert(data.union.clone(), id);
        for atom in data.union.atoms() {
            self.atom_index.entry(*atom).or_default().push(id);
        }
        for &(lo, hi) in data.union.ranges() {
            self.range_index.push((lo, hi, id));
        }
        self.embeddings.push(data);
        id
    }

    fn register_base_sorts(&mut self, table: &mut SymbolTable, terms: &mut TermStore) {
        // String first: its two datatypes are a self-contained group.
        let byte = self.sorts.bitvec(8);
        let group = self.sorts.declare_group(vec![
            DatatypeDecl {
                name: "Str".into(),
                ctors: vec![
                    CtorDecl::nullary("StrEmpty"),
                    CtorDecl::unary("StrBox", "chars", SortRef::Recursive(1)),
                ],
            },
            DatatypeDecl {
                name: "StrNonEmpty".into(),
                ctors: vec![
                    CtorDecl::unary("StrChar", "char", SortRef::Sort(byte)),
                    CtorDecl {
                        name: "StrAppend".into(),
                        fields: vec![
                            ("prefix".into(), SortRef::Recursive(1)),
                            ("last".into(), SortRef::Sort(byte)),
                        ],
                    },
                ],
            },
        ]);
        self.string_parts = (group[0].0, group[1].0);

        for sort in BaseSort::ALL {
            let ty = terms.atom(table.base_sort(sort));
            let cost = self.config.base_cost(sort);
            let (kind, backend_sort, default) = match sort {
                BaseSort::Real => {
                    let zero = terms.atom(table.int_literal(0));
                    (EmbeddingKind::Real, self.sorts.real(), (zero, BExpr::real(0, 1)))
                }
                BaseSort::Integer => {
                    let zero = terms.atom(table.int_literal(0));
                    (EmbeddingKind::Integer, self.sorts.int(), (zero, BExpr::int(0)))
                }
                BaseSort::Natural => {
                    let (dt, s) = self.boxed_int_sort("Natural");
                    let zero = terms.atom(table.int_literal(0));
                    // nat_encode(0) == 0
                    let expr = BExpr::construct(dt, 0, vec![BExpr::int(0)]);
                    (EmbeddingKind::Natural { dt }, s, (zero, expr))
                }
                BaseSort::PosInteger => {
                    let (dt, s) = self.boxed_int_sort("PosInteger");
                    let one = terms.atom(table.int_literal(1));
                    // pos_encode(1) == 0
                    let expr = BExpr::construct(dt, 0, vec![BExpr::int(0)]);
                    (EmbeddingKind::PosInteger { dt }, s, (one, expr))
                }
                BaseSort::NegInteger => {
                    let (dt, s) = self.boxed_int_sort("NegInteger");
                    let minus_one = terms.atom(table.int_literal(-1));
                    // neg_encode(-1) == 0
                    let expr = BExpr::construct(dt, 0, vec![BExpr::int(0)]);
                    (EmbeddingKind::NegInteger { dt }, s, (minus_one, expr))
                }
                BaseSort::String => {
                    let (str_dt, nonempty) = self.string_parts;
                    let empty = terms.atom(table.str_literal(""));
                    let expr = BExpr::construct(str_dt, 0, vec![]);
                    (
                        EmbeddingKind::Str { dt: str_dt, nonempty },
                        self.sorts
                            .datatype(str_dt)
                            .sort,
                        (empty, expr),
                    )
                }
            };
            let id = self.register(EmbeddingData {
                kind,
                sort: backend_sort,
                ty,
                union: CanonicalUnion::base(sort),
                cost,
                default_member: Some(default),
            });
            self.base[BaseSort::ALL.iter().position(|&s| s == sort).expect("known sort")] = id;
        }
    }

    /// A one-constructor datatype boxing an unconstrained backend Int.
    /// Keeps the sort-to-embedding mapping a bijection even though three
    /// numeric sub-range sorts all encode through Int.
    fn boxed_int_sort(&mut self, name: &str) -> (DatatypeId, SortId) {
        let int = self.sorts.int();
        self.sorts.declare_datatype(DatatypeDecl {
            name: name.into(),
            ctors: vec![CtorDecl::unary(format!("Mk{name}"), "code", SortRef::Sort(int))],
        })
    }

    // ---- constant/range factorization ---------------------------------

    /// Partition every argument position's ranges into power-of-two-aligned
    /// sub-ranges and its constants into power-of-two-slot batches,
    /// registering one embedding per piece. Pieces are shared across
    /// positions through the `by_union` map.
    fn factorize_constants(&mut self, table: &mut SymbolTable, terms: &mut TermStore) {
        let mut positions: Vec<CanonicalUnion> = Vec::new();
        for (_, info) in table.iter() {
            if info.is_user_symbol() {
                positions.extend(info.arg_unions.iter().cloned());
            }
            if let Some(members) = &info.members {
                positions.push(members.clone());
            }
        }
        let flattened: Vec<CanonicalUnion> = positions
            .iter()
            .map(|u| flatten_named_unions(table, u))
            .collect();
        for u in flattened {
            self.factorize_union(table, terms, &u);
        }
    }

    fn factorize_union(
        &mut self,
        table: &mut SymbolTable,
        terms: &mut TermStore,
        u: &CanonicalUnion,
    ) {
        for &(lo, hi) in u.ranges() {
            for (slo, shi) in split_pow2_aligned(lo, hi) {
                self.register_subrange(table, terms, slo, shi);
            }
        }
        let int_consts: Vec<i128> = u
            .atoms()
            .iter()
            .filter_map(|a| match a {
                AtomMember::IntConst(v) => Some(*v),
                _ => None,
            })
            .collect();
        if !int_consts.is_empty() {
            let members: Vec<TermId> = int_consts
                .iter()
                .map(|&v| {
                    let sym = table.int_literal(v);
                    terms.atom(sym)
                })
                .collect();
            let union = CanonicalUnion::from_parts(
                Vec::new(),
                int_consts.iter().map(|&v| AtomMember::IntConst(v)).collect(),
            );
            self.register_batch(table, terms, members, union);
        }
        let str_consts: Vec<formic_terms::Atom> = u
            .atoms()
            .iter()
            .filter_map(|a| match a {
                AtomMember::StrConst(s) => Some(*s),
                _ => None,
            })
            .collect();
        if !str_consts.is_empty() {
            let members: Vec<TermId> = str_consts
                .iter()
                .map(|&s| {
                    let text = table.resolve_name(s).to_owned();
                    let sym = table.str_literal(&text);
                    terms.atom(sym)
                })
                .collect();
            let union = CanonicalUnion::from_parts(
                Vec::new(),
                str_consts.iter().map(|&s| AtomMember::StrConst(s)).collect(),
            );
            self.register_batch(table, terms, members, union);
        }
    }

    fn register_subrange(
        &mut self,
        table: &mut SymbolTable,
        terms: &mut TermStore,
        lo: i128,
        hi: i128,
    ) -> EmbeddingId {
        let union = CanonicalUnion::range(lo, hi);
        if let Some(&id) = self.by_union.get(&union) {
            return id;
        }
        let size = (hi - lo) as u128 + 1;
        if size == 1 {
            let sym = table.int_literal(lo);
            let value = terms.atom(sym);
            return self.register_singleton(value, CanonicalUnion::int_const(lo));
        }
        debug_assert!(size.is_power_of_two(), "sub-range {lo}..{hi} not 2^n sized");
        let width = index_width(size as usize);
        let bv = self.sorts.bitvec(width);
        let (dt, sort) = self.sorts.declare_datatype(DatatypeDecl {
            name: format!("Range_{lo}_{hi}"),
            ctors: vec![CtorDecl::unary("MkRange", "offset", SortRef::Sort(bv))],
        });
        let ty = table.mk_range_term(terms, lo, hi);
        let lo_term = terms.atom(table.int_literal(lo));
        let default = (lo_term, BExpr::construct(dt, 0, vec![BExpr::bv(0, width)]));
        trace!(lo, hi, width, "registered sub-range embedding");
        self.register(EmbeddingData {
            kind: EmbeddingKind::IntRange { lo, hi, width, dt },
            sort,
            ty,
            union: CanonicalUnion::range(lo, hi),
            cost: self.config.cost_range,
            default_member: Some(default),
        })
    }

    fn register_singleton(&mut self, value: TermId, union: CanonicalUnion) -> EmbeddingId {
        if let Some(&id) = self.by_union.get(&union) {
            return id;
        }
        let (dt, sort) = self.sorts.declare_datatype(DatatypeDecl {
            name: format!("Singleton_{}", value.0),
            ctors: vec![CtorDecl::nullary("MkSingleton")],
        });
        let default = (value, BExpr::construct(dt, 0, vec![]));
        self.register(EmbeddingData {
            kind: EmbeddingKind::Singleton { value, dt },
            sort,
            ty: value,
            union,
            cost: self.config.cost_singleton,
            default_member: Some(default),
        })
    }

    /// Register one constant batch: Singleton if one member, else an Enum
    /// over the smallest power-of-two slot count.
    fn register_batch(
        &mut self,
        table: &mut SymbolTable,
        terms: &mut TermStore,
        members: Vec<TermId>,
        union: CanonicalUnion,
    ) -> EmbeddingId {
        if let Some(&id) = self.by_union.get(&union) {
            return id;
        }
        if members.len() == 1 {
            return self.register_singleton(members[0], union);
        }
        let width = index_width(members.len());
        debug_assert!(width >= 1);
        let bv = self.sorts.bitvec(width);
        let (dt, sort) = self.sorts.declare_datatype(DatatypeDecl {
            name: format!("Enum{}_{}", self.embeddings.len(), members.len()),
            ctors: vec![CtorDecl::unary("MkEnum", "index", SortRef::Sort(bv))],
        });
        let ty = table.mk_union_term(terms, &members);
        let default = (members[0], BExpr::construct(dt, 0, vec![BExpr::bv(0, width)]));
        trace!(
            members = members.len(),
            slots = slot_count(width),
            width,
            "registered enum embedding"
        );
        self.register(EmbeddingData {
            kind: EmbeddingKind::Enum { members, width, dt },
            sort,
            ty,
            union,
            cost: self.config.cost_enum,
            default_member: Some(default),
        })
    }

    // ---- joint datatype construction ----------------------------------

    /// Declare every user constructor and union as one mutually recursive
    /// backend datatype group, indexed by declaration order.
    fn build_joint_datatypes(&mut self, table: &mut SymbolTable, terms: &mut TermStore) {
        let mut entries: Vec<GroupEntry> = Vec::new();
        let mut entry_of_symbol: FxHashMap<SymbolId, usize> = FxHashMap::default();
        let mut entry_of_union: Vec<(CanonicalUnion, usize)> = Vec::new();

        for (sym, info) in table.iter() {
            if info.is_user_symbol() {
                entry_of_symbol.insert(sym, entries.len());
                entries.push(GroupEntry::Ctor(sym));
            } else if matches!(info.kind, SymbolKind::Union) {
                entry_of_symbol.insert(sym, entries.len());
                entries.push(GroupEntry::NamedUnion(sym));
            }
        }

        // Field representation per constructor argument; anonymous unions
        // for argument positions no single embedding covers.
        let mut ctor_fields: FxHashMap<SymbolId, Vec<FieldRep>> = FxHashMap::default();
        let user_syms: Vec<SymbolId> = table
            .user_symbols()
            .map(|(sym, _)| sym)
            .collect();
        for sym in user_syms {
            let arg_unions: Vec<CanonicalUnion> = table.info(sym).arg_unions.clone();
            let mut fields = Vec::with_capacity(arg_unions.len());
            for arg in &arg_unions {
                fields.push(self.field_rep(
                    table,
                    arg,
                    &entry_of_symbol,
                    &mut entry_of_union,
                    &mut entries,
                ));
            }
            ctor_fields.insert(sym, fields);
        }

        // Box lists for union entries (named and anonymous), resolved to
        // existing embeddings or group indexes.
        let mut union_fragments: Vec<Option<Vec<FieldRep>>> = vec![None; entries.len()];
        for idx in 0..entries.len() {
            let flat = match &entries[idx] {
                GroupEntry::NamedUnion(sym) => {
                    let members = table
                        .info(*sym)
                        .members
                        .clone()
                        .unwrap_or_else(|| panic!("union {} without members", table.name(*sym)));
                    Some(flatten_named_unions(table, &members))
                }
                GroupEntry::ArgUnion(u) => Some(u.clone()),
                GroupEntry::Ctor(_) => None,
            };
            if let Some(flat) = flat {
                union_fragments[idx] =
                    Some(self.union_boxes(&flat, &entry_of_symbol));
            }
        }

        // Declare the group.
        let first_emb = self.embeddings.len() as u32;
        let mut decls: Vec<DatatypeDecl> = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            let decl = match entry {
                GroupEntry::Ctor(sym) => {
                    let fields = &ctor_fields[sym];
                    DatatypeDecl {
                        name: table.name(*sym).to_owned(),
                        ctors: vec![CtorDecl {
                            name: format!("Mk{}", table.name(*sym)),
                            fields: fields
                                .iter()
                                .enumerate()
                                .map(|(i, rep)| (format!("arg{i}"), self.sort_ref(*rep)))
                                .collect(),
                        }],
                    }
                }
                GroupEntry::NamedUnion(sym) => DatatypeDecl {
                    name: table.name(*sym).to_owned(),
                    ctors: self.box_ctors(
                        union_fragments[idx].as_ref().expect("union entry"),
                        table.name(*sym),
                    ),
                },
                GroupEntry::ArgUnion(_) => DatatypeDecl {
                    name: format!("AnonUnion{idx}"),
                    ctors: self.box_ctors(
                        union_fragments[idx].as_ref().expect("union entry"),
                        &format!("AnonUnion{idx}"),
                    ),
                },
            };
            decls.push(decl);
        }
        let declared = self.sorts.declare_group(decls);

        // Materialize embeddings in entry order.
        for (idx, entry) in entries.into_iter().enumerate() {
            let (dt, sort) = declared[idx];
            let resolve = |rep: FieldRep| match rep {
                FieldRep::Existing(id) => id,
                FieldRep::Group(j) => EmbeddingId(first_emb + j as u32),
            };
            let mut named: Option<SymbolId> = None;
            let data = match entry {
                GroupEntry::Ctor(sym) => {
                    let fields: Vec<EmbeddingId> =
                        ctor_fields[&sym].iter().map(|&rep| resolve(rep)).collect();
                    let ty = terms.atom(sym);
                    EmbeddingData {
                        kind: EmbeddingKind::Ctor { sym, dt, fields },
                        sort,
                        ty,
                        union: CanonicalUnion::user_sort(sym),
                        cost: self.config.cost_ctor,
                        default_member: None,
                    }
                }
                GroupEntry::NamedUnion(sym) => {
                    named = Some(sym);
                    let boxes: Vec<UnionBox> = union_fragments[idx]
                        .as_ref()
                        .expect("union entry")
                        .iter()
                        .enumerate()
                        .map(|(ctor, &rep)| UnionBox {
                            ctor: ctor as u32,
                            emb: resolve(rep),
                        })
                        .collect();
                    let members = table.info(sym).members.clone().expect("checked above");
                    let flat = flatten_named_unions(table, &members);
                    let ty = terms.atom(sym);
                    EmbeddingData {
                        kind: EmbeddingKind::Union { dt, boxes },
                        sort,
                        ty,
                        union: flat,
                        cost: self.config.cost_union,
                        default_member: None,
                    }
                }
                GroupEntry::ArgUnion(u) => {
                    let boxes: Vec<UnionBox> = union_fragments[idx]
                        .as_ref()
                        .expect("union entry")
                        .iter()
                        .enumerate()
                        .map(|(ctor, &rep)| UnionBox {
                            ctor: ctor as u32,
                            emb: resolve(rep),
                        })
                        .collect();
                    let ty = self.union_type_term(table, terms, &u);
                    EmbeddingData {
                        kind: EmbeddingKind::Union { dt, boxes },
                        sort,
                        ty,
                        union: u,
                        cost: self.config.cost_union,
                        default_member: None,
                    }
                }
            };
            let id = self.register(data);
            if let EmbeddingKind::Ctor { sym, .. } = &self.embeddings[id.0 as usize].kind {
                let sym = *sym;
                self.by_symbol.insert(sym, id);
            }
            if let Some(sym) = named {
                self.by_symbol.insert(sym, id);
            }
        }
    }

    /// Representation of one constructor argument position.
    fn field_rep(
        &mut self,
        table: &SymbolTable,
        arg: &CanonicalUnion,
        entry_of_symbol: &FxHashMap<SymbolId, usize>,
        entry_of_union: &mut Vec<(CanonicalUnion, usize)>,
        entries: &mut Vec<GroupEntry>,
    ) -> FieldRep {
        let flat = flatten_named_unions(table, arg);
        // A position naming exactly one constructor or one named union is
        // represented by that group member directly.
        if flat.ranges().is_empty() && flat.atoms().len() == 1 {
            if let AtomMember::UserSort(sym) = flat.atoms()[0] {
                return FieldRep::Group(entry_of_symbol[&sym]);
            }
        }
        if arg.ranges().is_empty() && arg.atoms().len() == 1 {
            if let AtomMember::UserSort(sym) = arg.atoms()[0] {
                return FieldRep::Group(entry_of_symbol[&sym]);
            }
        }
        if let Some(&id) = self.by_union.get(&flat) {
            return FieldRep::Existing(id);
        }
        // Reuse an anonymous union already created for an equal position.
        if let Some((_, idx)) = entry_of_union.iter().find(|(u, _)| *u == flat) {
            return FieldRep::Group(*idx);
        }
        let idx = entries.len();
        entries.push(GroupEntry::ArgUnion(flat.clone()));
        entry_of_union.push((flat, idx));
        FieldRep::Group(idx)
    }

    /// The indivisible fragments of a union, deduplicated by target.
    fn union_boxes(
        &mut self,
        flat: &CanonicalUnion,
        entry_of_symbol: &FxHashMap<SymbolId, usize>,
    ) -> Vec<FieldRep> {
        let mut out: Vec<FieldRep> = Vec::new();
        let mut push = |rep: FieldRep, out: &mut Vec<FieldRep>| {
            let dup = out.iter().any(|r| match (r, &rep) {
                (FieldRep::Existing(a), FieldRep::Existing(b)) => a == b,
                (FieldRep::Group(a), FieldRep::Group(b)) => a == b,
                _ => false,
            });
            if !dup {
                out.push(rep);
            }
        };
        for &(lo, hi) in flat.ranges() {
            for (slo, shi) in split_pow2_aligned(lo, hi) {
                let u = if slo == shi {
                    CanonicalUnion::int_const(slo)
                } else {
                    CanonicalUnion::range(slo, shi)
                };
                let id = *self
                    .by_union
                    .get(&u)
                    .unwrap_or_else(|| panic!("sub-range {slo}..{shi} not factorized"));
                push(FieldRep::Existing(id), &mut out);
            }
        }
        let int_consts: Vec<AtomMember> = flat
            .atoms()
            .iter()
            .filter(|a| matches!(a, AtomMember::IntConst(_)))
            .copied()
            .collect();
        if !int_consts.is_empty() {
            let u = CanonicalUnion::from_parts(Vec::new(), int_consts);
            let id = *self
                .by_union
                .get(&u)
                .unwrap_or_else(|| panic!("constant batch not factorized"));
            push(FieldRep::Existing(id), &mut out);
        }
        let str_consts: Vec<AtomMember> = flat
            .atoms()
            .iter()
            .filter(|a| matches!(a, AtomMember::StrConst(_)))
            .copied()
            .collect();
        if !str_consts.is_empty() {
            let u = CanonicalUnion::from_parts(Vec::new(), str_consts);
            let id = *self
                .by_union
                .get(&u)
                .unwrap_or_else(|| panic!("constant batch not factorized"));
            push(FieldRep::Existing(id), &mut out);
        }
        for atom in flat.atoms() {
            match atom {
                AtomMember::Base(sort) => {
                    push(FieldRep::Existing(self.base_embedding(*sort)), &mut out);
                }
                AtomMember::UserSort(sym) => {
                    push(FieldRep::Group(entry_of_symbol[sym]), &mut out);
                }
                AtomMember::IntConst(_) | AtomMember::StrConst(_) => {}
            }
        }
        out
    }

    fn box_ctors(&self, fragments: &[FieldRep], union_name: &str) -> Vec<CtorDecl> {
        fragments
            .iter()
            .enumerate()
            .map(|(i, rep)| CtorDecl::unary(
                format!("{union_name}Box{i}"),
                "boxed",
                self.sort_ref(*rep),
            ))
            .collect()
    }

    fn sort_ref(&self, rep: FieldRep) -> SortRef {
        match rep {
            FieldRep::Existing(id) => SortRef::Sort(self.embeddings[id.0 as usize].sort),
            FieldRep::Group(idx) => SortRef::Recursive(idx),
        }
    }

    fn union_type_term(
        &self,
        table: &mut SymbolTable,
        terms: &mut TermStore,
        u: &CanonicalUnion,
    ) -> TermId {
        let mut parts: Vec<TermId> = Vec::new();
        for &(lo, hi) in u.ranges() {
            parts.push(table.mk_range_term(terms, lo, hi));
        }
        for atom in u.atoms() {
            let t = match atom {
                AtomMember::Base(sort) => terms.atom(table.base_sort(*sort)),
                AtomMember::UserSort(sym) => terms.atom(*sym),
                AtomMember::IntConst(v) => {
                    let sym = table.int_literal(*v);
                    terms.atom(sym)
                }
                AtomMember::StrConst(s) => {
                    let text = table.resolve_name(*s).to_owned();
                    let sym = table.str_literal(&text);
                    terms.atom(sym)
                }
            };
            parts.push(t);
        }
        table.mk_union_term(terms, &parts)
    }

    // ---- queries ------------------------------------------------------

    pub fn base_embedding(&self, sort: BaseSort) -> EmbeddingId {
        self.base[BaseSort::ALL.iter().position(|&s| s == sort).expect("known sort")]
    }

    pub fn embedding(&self, id: EmbeddingId) -> &EmbeddingData {
        &self.embeddings[id.0 as usize]
    }

    pub(crate) fn embedding_mut(&mut self, id: EmbeddingId) -> &mut EmbeddingData {
        &mut self.embeddings[id.0 as usize]
    }

    pub fn embedding_count(&self) -> usize {
        self.embeddings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EmbeddingId, &EmbeddingData)> {
        self.embeddings
            .iter()
            .enumerate()
            .map(|(i, d)| (EmbeddingId(i as u32), d))
    }

    /// The embedding owning a backend sort. A miss is a construction bug.
    pub fn embedding_by_sort(&self, sort: SortId) -> EmbeddingId {
        *self
            .by_sort
            .get(&sort)
            .unwrap_or_else(|| panic!("no embedding registered for backend sort {sort:?}"))
    }

    /// The embedding of a user constructor or named union symbol.
    pub fn embedding_of_symbol(&self, sym: SymbolId) -> EmbeddingId {
        *self
            .by_symbol
            .get(&sym)
            .unwrap_or_else(|| panic!("no embedding registered for symbol #{}", sym.0))
    }

    /// Choose the minimum-cost embedding whose type covers `u`.
    ///
    /// An exact match of the union itself wins; otherwise every candidate
    /// reachable through the atom and range indexes (including the widened
    /// form's registered embedding) is filtered for coverage and ranked by
    /// cost.
    pub fn choose_representation(&self, u: &CanonicalUnion) -> EmbeddingId {
        assert!(!u.is_empty(), "choose_representation on the empty type");
        if let Some(&id) = self.by_union.get(u) {
            return id;
        }
        let widened = u.widen();

        let mut candidates: Vec<EmbeddingId> = Vec::new();
        let mut consider = |id: EmbeddingId, candidates: &mut Vec<EmbeddingId>| {
            if !candidates.contains(&id) {
                candidates.push(id);
            }
        };
        // The widened form's embedding is a superset like any other
        // candidate; a cheaper registered sub-range must still beat it.
        if let Some(&id) = self.by_union.get(&widened) {
            consider(id, &mut candidates);
        }
        for atom in u.atoms().iter().chain(widened.atoms().iter()) {
            if let Some(ids) = self.atom_index.get(atom) {
                for &id in ids {
                    consider(id, &mut candidates);
                }
            }
        }
        for &(lo, hi) in u.ranges() {
            for &(rlo, rhi, id) in &self.range_index {
                if rlo <= lo && hi <= rhi {
                    consider(id, &mut candidates);
                }
            }
        }
        for &id in &self.base {
            consider(id, &mut candidates);
        }

        candidates
            .into_iter()
            .filter(|&id| u.is_subset_of(&self.embeddings[id.0 as usize].union))
            .min_by_key(|&id| (self.embeddings[id.0 as usize].cost, id))
            .unwrap_or_else(|| panic!("no registered embedding covers type {u:?}"))
    }

    /// Memoized intersection of two type terms. `None` is the empty
    /// intersection, an ordinary result.
    pub fn intersect_types(
        &mut self,
        table: &SymbolTable,
        terms: &TermStore,
        a: TermId,
        b: TermId,
    ) -> Option<CanonicalUnion> {
        let key = if a <= b { (a, b) } else { (b, a) };
        if let Some(cached) = self.intersect_cache.get(&key) {
            return cached.clone();
        }
        let ua = flatten_named_unions(table, &formic_terms::type_term_to_union(table, terms, a));
        let ub = flatten_named_unions(table, &formic_terms::type_term_to_union(table, terms, b));
        let result = ua.intersect(&ub);
        self.intersect_cache.insert(key, result.clone());
        result
    }
}

