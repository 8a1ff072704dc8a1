//! Backend sorts and recursive datatype declarations.
//!
//! Scalar sorts (Bool, Int, Real, BitVec) are interned by structure.
//! Datatypes are declared in *groups*: a group is one mutually recursive
//! `declare-datatypes` batch whose members may reference each other through
//! [`SortRef::Recursive`] before any of them has a `SortId`.

use rustc_hash::FxHashMap;

/// Index of a declared sort.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SortId(pub u32);

/// Index of a declared datatype.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatatypeId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Sort {
    Bool,
    Int,
    Real,
    BitVec(u32),
    Datatype(DatatypeId),
}

/// A field sort inside a datatype group under declaration: either an
/// already-declared sort or the group member at the given position.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SortRef {
    Sort(SortId),
    Recursive(usize),
}

/// One constructor of a datatype under declaration.
#[derive(Clone, Debug)]
pub struct CtorDecl {
    pub name: String,
    pub fields: Vec<(String, SortRef)>,
}

impl CtorDecl {
    pub fn nullary(name: impl Into<String>) -> Self {
        CtorDecl {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn unary(name: impl Into<String>, field: impl Into<String>, sort: SortRef) -> Self {
        CtorDecl {
            name: name.into(),
            fields: vec![(field.into(), sort)],
        }
    }
}

/// A datatype under declaration.
#[derive(Clone, Debug)]
pub struct DatatypeDecl {
    pub name: String,
    pub ctors: Vec<CtorDecl>,
}

/// A declared datatype with every field sort resolved.
#[derive(Clone, Debug)]
pub struct Datatype {
    pub name: String,
    pub sort: SortId,
    pub ctors: Vec<ResolvedCtor>,
}

#[derive(Clone, Debug)]
pub struct ResolvedCtor {
    pub name: String,
    pub fields: Vec<(String, SortId)>,
}

/// Owner of every sort and datatype declared for one backend session.
#[derive(Debug, Default)]
pub struct SortStore {
    sorts: Vec<Sort>,
    by_shape: FxHashMap<Sort, SortId>,
    datatypes: Vec<Datatype>,
}

impl SortStore {
    pub fn new() -> Self {
        SortStore::default()
    }

    fn intern(&mut self, sort: Sort) -> SortId {
        if let Some(&id) = self.by_shape.get(&sort) {
            return id;
        }
        let id = SortId(self.sorts.len() as u32);
        self.sorts.push(sort);
        self.by_shape.insert(sort, id);
        id
    }

    pub fn bool(&mut self) -> SortId {
        self.intern(Sort::Bool)
    }

    pub fn int(&mut self) -> SortId {
        self.intern(Sort::Int)
    }

    pub fn real(&mut self) -> SortId {
        self.intern(Sort::Real)
    }

    pub fn bitvec(&mut self, width: u32) -> SortId {
        assert!(width >= 1, "zero-width bit-vector");
        self.intern(Sort::BitVec(width))
    }

    pub fn get(&self, id: SortId) -> Sort {
        self.sorts[id.0 as usize]
    }

    /// Declare one mutually recursive datatype group. Returns the
    /// (datatype, sort) id pair of each member, in declaration order.
    pub fn declare_group(&mut self, decls: Vec<DatatypeDecl>) -> Vec<(DatatypeId, SortId)> {
        let base = self.datatypes.len();
        // Assign ids first so Recursive references can be resolved.
        let ids: Vec<(DatatypeId, SortId)> = (0..decls.len())
            .map(|i| {
                let dt = DatatypeId((base + i) as u32);
                let sort = self.intern(Sort::Datatype(dt));
                (dt, sort)
            })
            .collect();
        for (i, decl) in decls.into_iter().enumerate() {
            let ctors = decl
                .ctors
                .into_iter()
                .map(|ctor| ResolvedCtor {
                    name: ctor.name,
                    fields: ctor
                        .fields
                        .into_iter()
                        .map(|(name, sref)| {
                            let sort = match sref {
                                SortRef::Sort(s) => s,
                                SortRef::Recursive(j) => {
                                    ids.get(j)
                                        .unwrap_or_else(|| {
                                            panic!("recursive sort ref {j} outside group")
                                        })
                                        .1
                                }
                            };
                            (name, sort)
                        })
                        .collect(),
                })
                .collect();
            self.datatypes.push(Datatype {
                name: decl.name,
                sort: ids[i].1,
                ctors,
            });
        }
        ids
    }

    /// Declare a single non-recursive datatype.
    pub fn declare_datatype(&mut self, decl: DatatypeDecl) -> (DatatypeId, SortId) {
        self.declare_group(vec![decl])[0]
    }

    pub fn datatype(&self, id: DatatypeId) -> &Datatype {
        &self.datatypes[id.0 as usize]
    }

    pub fn datatype_count(&self) -> usize {
        self.datatypes.len()
    }

    pub fn ctor(&self, dt: DatatypeId, ctor: u32) -> &ResolvedCtor {
        &self.datatypes[dt.0 as usize].ctors[ctor as usize]
    }
}
