//! Partial models: a set of asserted facts against a model declaration,
//! split into ground facts and non-ground ones (facts whose subterms
//! contain variables).

use formic_terms::{ModelId, SymbolId, SymbolTable, TermId, TermStore};
use rustc_hash::FxHashMap;

/// Facts supplied to the cardinality analysis. A fact is a term whose head
/// is a constructor or map symbol; facts containing variables constrain
/// the least-fixed-point lower bounds without fixing values.
#[derive(Debug, Default, Clone)]
pub struct PartialModel {
    /// The model declaration these facts belong to, when one is in scope.
    /// Its visible contracts apply to the analysis.
    pub model: Option<ModelId>,
    facts: Vec<TermId>,
}

impl PartialModel {
    pub fn new(model: Option<ModelId>) -> Self {
        PartialModel { model, facts: Vec::new() }
    }

    pub fn assert_fact(&mut self, table: &SymbolTable, terms: &TermStore, fact: TermId) {
        let kind = table.kind(terms.sym(fact));
        assert!(
            matches!(
                kind,
                formic_terms::SymbolKind::Constructor { .. }
                    | formic_terms::SymbolKind::Map { .. }
            ),
            "fact head must be a constructor or map symbol, found {kind:?}"
        );
        self.facts.push(fact);
    }

    pub fn facts(&self) -> &[TermId] {
        &self.facts
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Partition facts by head symbol, separating ground facts from those
    /// containing variables.
    pub fn facts_by_symbol(
        &self,
        table: &SymbolTable,
        terms: &TermStore,
    ) -> FxHashMap<SymbolId, SymbolFacts> {
        let mut out: FxHashMap<SymbolId, SymbolFacts> = FxHashMap::default();
        for &f in &self.facts {
            let entry = out.entry(terms.sym(f)).or_default();
            if table.is_ground(terms, f) {
                entry.ground.push(f);
            } else {
                entry.non_ground.push(f);
            }
        }
        // Ground facts are terms; hash-consing already deduplicated
        // structurally equal ones at assertion time, but the same fact may
        // have been asserted twice.
        for facts in out.values_mut() {
            facts.ground.sort_unstable();
            facts.ground.dedup();
        }
        out
    }
}

/// Facts sharing a head symbol.
#[derive(Debug, Default, Clone)]
pub struct SymbolFacts {
    pub ground: Vec<TermId>,
    pub non_ground: Vec<TermId>,
}
