//! The cardinality constraint system.
//!
//! Built once from the symbol table, the model's contracts, and the partial
//! model's facts, then iterated to a fixed point by [`CardSystem::propagate`].
//! Each user symbol gets two variables: `nonLFP` bounds how many distinct
//! terms of that constructor can occur anywhere as subterms, `LFP` bounds
//! how many are provably derivable in the model. Constraints relate these
//! through the type structure, map properties, user contracts, and the
//! asserted facts. Unsatisfiability is a legitimate analysis outcome, not
//! an error: it is latched in `is_unsat` and reported to the caller.

use crate::card_expr::{CardConstraint, CardExpr, CardRel, CardVar};
use crate::cardinality::{CardRange, Cardinality};
use crate::model::PartialModel;
use formic_terms::{
    AtomMember, CanonicalUnion, DepGraph, MapProps, SymbolId, SymbolKind, SymbolTable, TermStore,
    flatten_named_unions, unify,
};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

pub struct CardSystem {
    constraints: Vec<CardConstraint>,
    /// Constraint indexes touching each variable, for re-enqueueing.
    by_var: FxHashMap<CardVar, Vec<usize>>,
    ranges: FxHashMap<CardVar, CardRange>,
    /// Forced degrees of freedom per constructor, from `requires some N`.
    dof: FxHashMap<SymbolId, u64>,
    unsat: bool,
}

/// Outcome of narrowing one right-hand variable.
enum Narrow {
    Skip,
    Unsat,
    Lower(Cardinality),
    Upper(Cardinality),
}

impl CardSystem {
    /// Build the full constraint system: type-structure constraints, then
    /// contract constraints, then fact-derived lower bounds.
    pub fn build(table: &SymbolTable, terms: &mut TermStore, model: &PartialModel) -> CardSystem {
        let mut sys = CardSystem {
            constraints: Vec::new(),
            by_var: FxHashMap::default(),
            ranges: FxHashMap::default(),
            dof: FxHashMap::default(),
            unsat: false,
        };
        sys.build_type_system_constraints(table);
        sys.build_cardinality_requires(table, model);
        sys.build_partial_model_lower_bounds(table, terms, model);
        debug!(
            constraints = sys.constraints.len(),
            variables = sys.ranges.len(),
            "cardinality system built"
        );
        sys
    }

    fn add_constraint(&mut self, c: CardConstraint) {
        trace!(constraint = %c, "add constraint");
        let idx = self.constraints.len();
        for v in c.variables() {
            self.by_var.entry(v).or_default().push(idx);
            self.ranges.entry(v).or_insert(CardRange::FULL);
        }
        self.constraints.push(c);
    }

    /// Per-symbol structural constraints: `nonLFP <= product over argument
    /// unions` and `LFP <= nonLFP`, plus map-property constraints against
    /// domain/codomain-only products. A user sort occurring inside its own
    /// strongly-connected component contributes an infinite factor, since
    /// recursion makes the subterm universe unbounded.
    fn build_type_system_constraints(&mut self, table: &SymbolTable) {
        let users: Vec<SymbolId> = table.user_symbols().map(|(id, _)| id).collect();
        let dense: FxHashMap<SymbolId, usize> =
            users.iter().enumerate().map(|(i, &s)| (s, i)).collect();

        let mut flat_args: Vec<Vec<CanonicalUnion>> = Vec::with_capacity(users.len());
        let mut graph = DepGraph::new(users.len());
        for (i, &sym) in users.iter().enumerate() {
            let args: Vec<CanonicalUnion> = table
                .info(sym)
                .arg_unions
                .iter()
                .map(|u| flatten_named_unions(table, u))
                .collect();
            for u in &args {
                for atom in u.atoms() {
                    if let AtomMember::UserSort(dep) = atom {
                        if let Some(&j) = dense.get(dep) {
                            graph.add_edge(i as u32, j as u32);
                        }
                    }
                }
            }
            flat_args.push(args);
        }
        let sccs = graph.sccs();
        let mut comp_of = vec![usize::MAX; users.len()];
        for (c, comp) in sccs.iter().enumerate() {
            for &n in comp {
                comp_of[n as usize] = c;
            }
        }

        for (i, &sym) in users.iter().enumerate() {
            // An edge into the same component is a recursive occurrence:
            // either a self-loop or a larger cycle through other symbols.
            let recursive =
                |dep: SymbolId| dense.get(&dep).is_some_and(|&j| comp_of[j] == comp_of[i]);

            let factors: Vec<CardExpr> = flat_args[i]
                .iter()
                .map(|u| union_card_expr(u, false, &recursive))
                .collect();
            self.add_constraint(CardConstraint::le(
                CardVar::non_lfp(sym),
                CardExpr::prod(factors),
            ));
            self.add_constraint(CardConstraint::le(
                CardVar::lfp(sym),
                CardExpr::var(CardVar::non_lfp(sym)),
            ));

            if let SymbolKind::Map { dom_arity, props, .. } = *table.kind(sym) {
                let dom: Vec<CardExpr> = flat_args[i][..dom_arity as usize]
                    .iter()
                    .map(|u| union_card_expr(u, true, &recursive))
                    .collect();
                let cod: Vec<CardExpr> = flat_args[i][dom_arity as usize..]
                    .iter()
                    .map(|u| union_card_expr(u, true, &recursive))
                    .collect();
                if props.contains(MapProps::TOTAL) {
                    self.add_constraint(CardConstraint::ge(
                        CardVar::lfp(sym),
                        CardExpr::prod(dom),
                    ));
                }
                if props.contains(MapProps::INJECTIVE) {
                    self.add_constraint(CardConstraint::le(
                        CardVar::lfp(sym),
                        CardExpr::prod(cod.clone()),
                    ));
                }
                if props.contains(MapProps::SURJECTIVE) {
                    self.add_constraint(CardConstraint::ge(
                        CardVar::lfp(sym),
                        CardExpr::prod(cod),
                    ));
                }
            }
        }
    }

    /// Contracts from the model's `extends` chain. `at most`/`at least`
    /// bound each concrete constructor enumerable under the named type
    /// independently; `requires some` only forces degrees of freedom.
    fn build_cardinality_requires(&mut self, table: &SymbolTable, model: &PartialModel) {
        let Some(mid) = model.model else {
            return;
        };
        for contract in table.visible_contracts(mid) {
            let ctors = constructors_under(table, contract.ty);
            for ctor in ctors {
                match contract.kind {
                    formic_terms::ContractKind::AtMost => {
                        self.add_constraint(CardConstraint::le(
                            CardVar::lfp(ctor),
                            CardExpr::constant(Cardinality::fin(contract.bound as u128)),
                        ));
                    }
                    formic_terms::ContractKind::AtLeast => {
                        self.add_constraint(CardConstraint::ge(
                            CardVar::lfp(ctor),
                            CardExpr::constant(Cardinality::fin(contract.bound as u128)),
                        ));
                    }
                    formic_terms::ContractKind::Some => {
                        *self.dof.entry(ctor).or_default() += contract.bound;
                    }
                }
            }
        }
    }

    /// Fact-derived lower bounds: for each head symbol, the ground facts
    /// plus the minimal elements of the non-ground facts under the
    /// unification quasi-order are distinct derivable terms.
    fn build_partial_model_lower_bounds(
        &mut self,
        table: &SymbolTable,
        terms: &mut TermStore,
        model: &PartialModel,
    ) {
        let by_sym = model.facts_by_symbol(table, terms);
        let mut entries: Vec<_> = by_sym.into_iter().collect();
        entries.sort_unstable_by_key(|(sym, _)| *sym);

        for (sym, facts) in entries {
            // A non-ground fact is non-minimal if a ground fact is one of
            // its instances, or if it unifies with a fact already kept.
            // Unifiability is symmetric, so one greedy scan reaches the
            // pairwise fixpoint.
            let mut minimal: Vec<formic_terms::TermId> = Vec::new();
            'next: for &f in &facts.non_ground {
                for &g in &facts.ground {
                    if formic_terms::matches(table, terms, f, g).is_some() {
                        continue 'next;
                    }
                }
                for &k in &minimal {
                    if unify(table, terms, k, f).is_some() {
                        continue 'next;
                    }
                }
                minimal.push(f);
            }
            let lower = facts.ground.len() + minimal.len();
            trace!(
                symbol = table.name(sym),
                ground = facts.ground.len(),
                minimal = minimal.len(),
                "partial-model lower bound"
            );
            if lower > 0 {
                self.add_constraint(CardConstraint::ge(
                    CardVar::lfp(sym),
                    CardExpr::constant(Cardinality::fin(lower as u128)),
                ));
            }
        }
    }

    /// Worklist interval propagation to a local fixed point. Returns false
    /// when the system is unsatisfiable. The cancellation flag is polled
    /// only at entry; once started, the loop runs to the fixed point since
    /// partial propagation state is not resumable.
    pub fn propagate(&mut self, cancel: Option<&AtomicBool>) -> bool {
        if self.unsat {
            return false;
        }
        if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
            return true;
        }
        let mut queued = vec![true; self.constraints.len()];
        let mut worklist: VecDeque<usize> = (0..self.constraints.len()).collect();
        let mut steps = 0usize;
        while let Some(ci) = worklist.pop_front() {
            queued[ci] = false;
            steps += 1;
            let c = self.constraints[ci].clone();
            let Some(changed) = self.apply_constraint(&c) else {
                debug!(constraint = %c, "unsatisfiable");
                self.unsat = true;
                return false;
            };
            for v in changed {
                trace!(var = %CardExpr::var(v), range = %self.ranges[&v], "narrowed");
                if let Some(deps) = self.by_var.get(&v) {
                    for &di in deps {
                        if !queued[di] {
                            queued[di] = true;
                            worklist.push_back(di);
                        }
                    }
                }
            }
        }
        debug!(steps, "propagation reached fixed point");
        true
    }

    /// Apply one constraint; returns the variables whose ranges changed,
    /// or None on unsatisfiability.
    fn apply_constraint(&mut self, c: &CardConstraint) -> Option<Vec<CardVar>> {
        let mut changed = Vec::new();
        let r = c.rhs.eval(&self.ranges);
        let mut lr = self.ranges[&c.lhs];
        match c.rel {
            CardRel::Le => {
                // No rhs assignment reaches the lhs lower bound.
                if r.upper < lr.lower {
                    return None;
                }
                if r.upper < lr.upper {
                    lr.upper = r.upper;
                    self.ranges.insert(c.lhs, lr);
                    changed.push(c.lhs);
                }
                if r.lower < lr.lower {
                    self.narrow_rhs(c, lr.lower, true, &mut changed)?;
                }
            }
            CardRel::Ge => {
                if r.lower > lr.upper {
                    return None;
                }
                if r.lower > lr.lower {
                    lr.lower = r.lower;
                    self.ranges.insert(c.lhs, lr);
                    changed.push(c.lhs);
                }
                if r.upper > lr.upper {
                    self.narrow_rhs(c, lr.upper, false, &mut changed)?;
                }
            }
        }
        Some(changed)
    }

    /// Narrow each rhs variable by monotone binary search. With `raise`
    /// set (a `<=` constraint), each variable's lower bound is lifted to
    /// the least value whose pinned evaluation can still reach `target`;
    /// otherwise (`>=`) each upper bound is cut to the greatest value
    /// whose pinned evaluation can still stay within `target`.
    fn narrow_rhs(
        &mut self,
        c: &CardConstraint,
        target: Cardinality,
        raise: bool,
        changed: &mut Vec<CardVar>,
    ) -> Option<()> {
        let mut vars = Vec::new();
        c.rhs.variables(&mut vars);
        for v in vars {
            if v == c.lhs {
                continue;
            }
            let vr = self.ranges[&v];
            let step = {
                let ranges = &self.ranges;
                let rhs = &c.rhs;
                if raise {
                    let pred = |x: Cardinality| rhs.eval_pinned(ranges, v, x).upper >= target;
                    if pred(vr.lower) {
                        Narrow::Skip
                    } else {
                        // pred holds at vr.upper: the full evaluation's
                        // upper already reached target.
                        match (vr.upper, target) {
                            (Cardinality::Fin(_), _) => Narrow::Lower(least_satisfying(
                                CardRange::new(vr.lower, vr.upper),
                                pred,
                            )),
                            (Cardinality::Infinity, Cardinality::Fin(_)) => {
                                if pred(target) {
                                    Narrow::Lower(least_satisfying(
                                        CardRange::new(vr.lower, target),
                                        pred,
                                    ))
                                } else if pred(Cardinality::Infinity) {
                                    Narrow::Lower(Cardinality::Infinity)
                                } else {
                                    Narrow::Unsat
                                }
                            }
                            // Only an infinite pin could reach an infinite
                            // target; no finite least value exists.
                            (Cardinality::Infinity, Cardinality::Infinity) => Narrow::Skip,
                        }
                    }
                } else {
                    let pred = |x: Cardinality| rhs.eval_pinned(ranges, v, x).lower <= target;
                    if pred(vr.upper) {
                        Narrow::Skip
                    } else {
                        // pred holds at vr.lower: the full evaluation's
                        // lower stayed within target. An infinite target
                        // satisfies pred everywhere, so target is finite
                        // here and bounds the search window.
                        let hi = match vr.upper {
                            Cardinality::Fin(_) => vr.upper.min(target),
                            Cardinality::Infinity => target,
                        };
                        Narrow::Upper(greatest_satisfying(CardRange::new(vr.lower, hi), pred))
                    }
                }
            };
            match step {
                Narrow::Skip => {}
                Narrow::Unsat => return None,
                Narrow::Lower(x) => {
                    if x > vr.lower {
                        self.ranges.insert(v, CardRange::new(x, vr.upper));
                        changed.push(v);
                    }
                }
                Narrow::Upper(x) => {
                    if x < vr.upper {
                        self.ranges.insert(v, CardRange::new(vr.lower, x));
                        changed.push(v);
                    }
                }
            }
        }
        Some(())
    }

    pub fn is_unsat(&self) -> bool {
        self.unsat
    }

    /// The derived range of a symbol's LFP or non-LFP count.
    pub fn range_of(&self, sym: SymbolId, lfp: bool) -> CardRange {
        let var = CardVar { sym, lfp };
        self.ranges.get(&var).copied().unwrap_or(CardRange::FULL)
    }

    /// Degrees of freedom forced by `requires some` contracts.
    pub fn forced_dof(&self, sym: SymbolId) -> u64 {
        self.dof.get(&sym).copied().unwrap_or(0)
    }

    pub fn constraints(&self) -> &[CardConstraint] {
        &self.constraints
    }
}

/// Symbolic cardinality of one canonical union. Base sorts are infinite;
/// user sorts contribute their count variable, except recursive
/// occurrences, which are unbounded.
fn union_card_expr(
    u: &CanonicalUnion,
    lfp: bool,
    recursive: &impl Fn(SymbolId) -> bool,
) -> CardExpr {
    let mut parts = Vec::new();
    for &(lo, hi) in u.ranges() {
        // The span is exact modulo 2^128; a range covering all of i128
        // widens to infinity like any other count overflow.
        let span = hi.wrapping_sub(lo) as u128;
        let card = match span.checked_add(1) {
            Some(n) => Cardinality::fin(n),
            None => Cardinality::Infinity,
        };
        parts.push(CardExpr::constant(card));
    }
    for atom in u.atoms() {
        match atom {
            AtomMember::IntConst(_) | AtomMember::StrConst(_) => parts.push(CardExpr::ONE),
            AtomMember::Base(_) => parts.push(CardExpr::INFINITY),
            AtomMember::UserSort(dep) => {
                if recursive(*dep) {
                    parts.push(CardExpr::INFINITY);
                } else {
                    let var = if lfp {
                        CardVar::lfp(*dep)
                    } else {
                        CardVar::non_lfp(*dep)
                    };
                    parts.push(CardExpr::var(var));
                }
            }
        }
    }
    CardExpr::sum(parts)
}

/// The concrete constructors enumerable under a contract's named type.
fn constructors_under(table: &SymbolTable, ty: SymbolId) -> Vec<SymbolId> {
    match table.kind(ty) {
        SymbolKind::Constructor { .. } | SymbolKind::Map { .. } => vec![ty],
        SymbolKind::Union => {
            let members = table
                .info(ty)
                .members
                .as_ref()
                .expect("union symbol has a member set");
            let flat = flatten_named_unions(table, members);
            flat.atoms()
                .iter()
                .filter_map(|a| match a {
                    AtomMember::UserSort(s) => Some(*s),
                    _ => None,
                })
                .collect()
        }
        other => panic!("contract names a non-type symbol: {other:?}"),
    }
}

/// Least value in `window` satisfying a monotone nondecreasing predicate.
/// Requires the predicate to hold at `window.upper`.
fn least_satisfying(window: CardRange, pred: impl Fn(Cardinality) -> bool) -> Cardinality {
    let mut w = window;
    while let (Cardinality::Fin(lo), Cardinality::Fin(hi)) = (w.lower, w.upper) {
        if hi - lo < 2 {
            break;
        }
        let mid = Cardinality::Fin(lo + (hi - lo) / 2);
        // pred at the midpoint keeps the lower half (the midpoint itself
        // remains a candidate), otherwise the upper half.
        w = w.bisect(!pred(mid));
    }
    if pred(w.lower) { w.lower } else { w.upper }
}

/// Greatest value in `window` satisfying a monotone nonincreasing
/// predicate. Requires the predicate to hold at `window.lower`.
fn greatest_satisfying(window: CardRange, pred: impl Fn(Cardinality) -> bool) -> Cardinality {
    let mut w = window;
    while let (Cardinality::Fin(lo), Cardinality::Fin(hi)) = (w.lower, w.upper) {
        if hi - lo < 2 {
            break;
        }
        let mid = Cardinality::Fin(lo + (hi - lo) / 2);
        w = w.bisect(pred(mid));
    }
    if pred(w.upper) { w.upper } else { w.lower }
}
