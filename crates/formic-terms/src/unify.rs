//! First-order syntactic unification over interned terms.
//!
//! Variable bindings live in an `ena` unification table; the driver walks
//! the two term structures, binding unbound variables (with an occurs
//! check) and recursing through bound ones. The result is extracted as a
//! most-general unifier mapping variable symbols to terms.

use crate::intern::{TermId, TermStore};
use crate::symbols::{SymbolId, SymbolKind, SymbolTable};
use ena::unify::{EqUnifyValue, InPlaceUnificationTable, UnifyKey};
use rustc_hash::FxHashMap;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct TermVar(u32);

impl UnifyKey for TermVar {
    type Value = Option<TermId>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(i: u32) -> Self {
        TermVar(i)
    }

    fn tag() -> &'static str {
        "TermVar"
    }
}

impl EqUnifyValue for TermId {}

/// A most-general unifier: variable symbol to (variable-free or partially
/// instantiated) term.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Substitution {
    map: FxHashMap<SymbolId, TermId>,
}

impl Substitution {
    pub fn get(&self, var: SymbolId) -> Option<TermId> {
        self.map.get(&var).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, TermId)> + '_ {
        self.map.iter().map(|(&v, &t)| (v, t))
    }
}

struct Unifier<'a> {
    table: &'a SymbolTable,
    terms: &'a mut TermStore,
    vars: InPlaceUnificationTable<TermVar>,
    keys: FxHashMap<SymbolId, TermVar>,
}

impl<'a> Unifier<'a> {
    fn new(table: &'a SymbolTable, terms: &'a mut TermStore) -> Self {
        Unifier {
            table,
            terms,
            vars: InPlaceUnificationTable::new(),
            keys: FxHashMap::default(),
        }
    }

    fn key_for(&mut self, var: SymbolId) -> TermVar {
        if let Some(&k) = self.keys.get(&var) {
            return k;
        }
        let k = self.vars.new_key(None);
        self.keys.insert(var, k);
        k
    }

    fn var_of(&self, t: TermId) -> Option<SymbolId> {
        let sym = self.terms.sym(t);
        matches!(self.table.kind(sym), SymbolKind::Variable).then_some(sym)
    }

    fn unify(&mut self, a: TermId, b: TermId) -> bool {
        let a = self.resolve_root(a);
        let b = self.resolve_root(b);
        if a == b {
            return true;
        }
        match (self.var_of(a), self.var_of(b)) {
            (Some(va), Some(vb)) => {
                let (ka, kb) = (self.key_for(va), self.key_for(vb));
                // Both classes may already carry bindings; a value conflict
                // fails the unification.
                self.vars.unify_var_var(ka, kb).is_ok()
            }
            (Some(va), None) => self.bind(va, b),
            (None, Some(vb)) => self.bind(vb, a),
            (None, None) => {
                if self.terms.sym(a) != self.terms.sym(b) {
                    return false;
                }
                let n = self.terms.args(a).len();
                debug_assert_eq!(n, self.terms.args(b).len());
                for i in 0..n {
                    let (x, y) = (self.terms.args(a)[i], self.terms.args(b)[i]);
                    if !self.unify(x, y) {
                        return false;
                    }
                }
                true
            }
        }
    }

    /// Chase a variable to its binding, if any.
    fn resolve_root(&mut self, t: TermId) -> TermId {
        let mut cur = t;
        loop {
            let Some(v) = self.var_of(cur) else { return cur };
            let k = self.key_for(v);
            match self.vars.probe_value(k) {
                Some(bound) => cur = bound,
                None => return cur,
            }
        }
    }

    fn bind(&mut self, var: SymbolId, t: TermId) -> bool {
        // Occurs check against the fully resolved term.
        let resolved = self.resolve_deep(t);
        let var_term = self.terms.atom(var);
        if self.terms.occurs(var_term, resolved) {
            return false;
        }
        let k = self.key_for(var);
        self.vars
            .unify_var_value(k, Some(resolved))
            .expect("binding an unbound unification variable cannot conflict");
        true
    }

    /// Apply current bindings throughout `t`.
    fn resolve_deep(&mut self, t: TermId) -> TermId {
        let root = self.resolve_root(t);
        if self.var_of(root).is_some() {
            return root;
        }
        let sym = self.terms.sym(root);
        let args: Vec<TermId> = self.terms.args(root).to_vec();
        let resolved: Vec<TermId> = args.into_iter().map(|a| self.resolve_deep(a)).collect();
        self.terms.mk(sym, &resolved)
    }

    fn extract(mut self) -> Substitution {
        let mut map = FxHashMap::default();
        let mut reps: FxHashMap<TermVar, SymbolId> = FxHashMap::default();
        let vars: Vec<SymbolId> = self.keys.keys().copied().collect();
        for var in vars {
            let var_term = self.terms.atom(var);
            let resolved = self.resolve_deep(var_term);
            if resolved != var_term {
                map.insert(var, resolved);
                continue;
            }
            // Unbound: alias the equivalence class to one representative
            // so the mgu still identifies unified variables.
            let root = self.vars.find(self.keys[&var]);
            let rep = *reps.entry(root).or_insert(var);
            if rep != var {
                let rep_term = self.terms.atom(rep);
                map.insert(var, rep_term);
            }
        }
        Substitution { map }
    }
}

/// Unify two terms, returning the most-general unifier if one exists.
pub fn unify(
    table: &SymbolTable,
    terms: &mut TermStore,
    a: TermId,
    b: TermId,
) -> Option<Substitution> {
    let mut unifier = Unifier::new(table, terms);
    if unifier.unify(a, b) {
        let subst = unifier.extract();
        tracing::trace!(bindings = subst.len(), "unification succeeded");
        Some(subst)
    } else {
        tracing::trace!("unification failed");
        None
    }
}

/// One-sided matching: bind variables in `pattern` so it equals `subject`.
/// Variables in `subject` are treated as constants.
pub fn matches(
    table: &SymbolTable,
    terms: &TermStore,
    pattern: TermId,
    subject: TermId,
) -> Option<FxHashMap<SymbolId, TermId>> {
    let mut bindings = FxHashMap::default();
    fn go(
        table: &SymbolTable,
        terms: &TermStore,
        pattern: TermId,
        subject: TermId,
        bindings: &mut FxHashMap<SymbolId, TermId>,
    ) -> bool {
        let psym = terms.sym(pattern);
        if matches!(table.kind(psym), SymbolKind::Variable) {
            return match bindings.get(&psym) {
                Some(&prev) => prev == subject,
                None => {
                    bindings.insert(psym, subject);
                    true
                }
            };
        }
        if psym != terms.sym(subject) {
            return false;
        }
        terms
            .args(pattern)
            .to_vec()
            .iter()
            .zip(terms.args(subject).to_vec().iter())
            .all(|(&p, &s)| go(table, terms, p, s, bindings))
    }
    go(table, terms, pattern, subject, &mut bindings).then_some(bindings)
}

/// Apply a substitution throughout a term.
pub fn apply(
    table: &SymbolTable,
    terms: &mut TermStore,
    subst: &Substitution,
    t: TermId,
) -> TermId {
    let sym = terms.sym(t);
    if matches!(table.kind(sym), SymbolKind::Variable) {
        if let Some(bound) = subst.get(sym) {
            // Bindings may themselves mention bound variables.
            return apply(table, terms, subst, bound);
        }
        return t;
    }
    let args: Vec<TermId> = terms.args(t).to_vec();
    let mapped: Vec<TermId> = args
        .into_iter()
        .map(|a| apply(table, terms, subst, a))
        .collect();
    terms.mk(sym, &mapped)
}
