//! Default-member resolution for constructor and union embeddings.
//!
//! Every embedding must carry one guaranteed-ground inhabitant. Scalar
//! variants get theirs at registration; constructors and unions may depend
//! on each other, possibly cyclically. The resolution is two-phase: first
//! compute SCCs of the dependency graph (constructor -> every field,
//! union -> every box), then run a readiness-counted worklist per
//! component in dependency-first order. A constructor is ready when all of
//! its fields have defaults; a union is ready when any box has one. A
//! component that never produces a ready member describes an uninhabited
//! recursive type, which the type checker is supposed to have rejected.

use crate::embedder::TypeEmbedder;
use crate::embedding::{EmbeddingId, EmbeddingKind};
use formic_smt::BExpr;
use formic_terms::{DepGraph, SymbolTable, TermStore};
use rustc_hash::FxHashMap;
use tracing::trace;

pub(crate) fn resolve_defaults(
    embedder: &mut TypeEmbedder,
    table: &SymbolTable,
    terms: &mut TermStore,
) {
    // Dense numbering of the embeddings that still need a default.
    let pending: Vec<EmbeddingId> = embedder
        .iter()
        .filter(|(_, d)| d.default_member.is_none())
        .map(|(id, _)| id)
        .collect();
    if pending.is_empty() {
        return;
    }
    let node_of: FxHashMap<EmbeddingId, u32> = pending
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i as u32))
        .collect();

    let mut graph = DepGraph::new(pending.len());
    for (i, &id) in pending.iter().enumerate() {
        for dep in dependencies(embedder, id) {
            if let Some(&j) = node_of.get(&dep) {
                graph.add_edge(i as u32, j);
            }
        }
    }

    // Components come out dependency-first, so by the time a component
    // starts, everything it needs outside itself is already resolved.
    for component in graph.sccs() {
        let mut worklist: Vec<u32> = Vec::new();
        let mut counts: FxHashMap<u32, usize> = FxHashMap::default();
        for &node in &component {
            match readiness(embedder, pending[node as usize]) {
                Readiness::Ready => worklist.push(node),
                Readiness::Blocked(n) => {
                    counts.insert(node, n);
                }
            }
        }
        let mut resolved_here = 0usize;
        while let Some(node) = worklist.pop() {
            let id = pending[node as usize];
            if embedder.embedding(id).default_member.is_some() {
                continue;
            }
            resolve_one(embedder, table, terms, id);
            resolved_here += 1;
            // Propagate the completed default to dependents in this
            // component.
            for &dep_node in &component {
                if embedder
                    .embedding(pending[dep_node as usize])
                    .default_member
                    .is_some()
                {
                    continue;
                }
                if !graph.has_edge(dep_node, node) {
                    continue;
                }
                match embedder.embedding(pending[dep_node as usize]).kind {
                    EmbeddingKind::Union { .. } => worklist.push(dep_node),
                    EmbeddingKind::Ctor { .. } => {
                        let c = counts.entry(dep_node).or_insert(0);
                        if *c > 0 {
                            *c -= 1;
                        }
                        if *c == 0 {
                            worklist.push(dep_node);
                        }
                    }
                    _ => unreachable!("only constructors and unions lack defaults"),
                }
            }
        }
        if resolved_here < component.len() {
            let stuck: Vec<_> = component
                .iter()
                .filter(|&&n| {
                    embedder
                        .embedding(pending[n as usize])
                        .default_member
                        .is_none()
                })
                .map(|&n| pending[n as usize])
                .collect();
            panic!("uninhabited recursive type group: no default member for {stuck:?}");
        }
    }
}

enum Readiness {
    Ready,
    Blocked(usize),
}

/// Whether an embedding can be resolved right now, and if not, how many
/// of its dependencies still need defaults.
fn readiness(embedder: &TypeEmbedder, id: EmbeddingId) -> Readiness {
    match &embedder.embedding(id).kind {
        EmbeddingKind::Ctor { fields, .. } => {
            let mut blocked = 0usize;
            let mut seen: Vec<EmbeddingId> = Vec::new();
            for &f in fields {
                if embedder.embedding(f).default_member.is_none() && !seen.contains(&f) {
                    seen.push(f);
                    blocked += 1;
                }
            }
            if blocked == 0 {
                Readiness::Ready
            } else {
                Readiness::Blocked(blocked)
            }
        }
        EmbeddingKind::Union { boxes, .. } => {
            if boxes
                .iter()
                .any(|b| embedder.embedding(b.emb).default_member.is_some())
            {
                Readiness::Ready
            } else {
                Readiness::Blocked(1)
            }
        }
        _ => unreachable!("only constructors and unions lack defaults"),
    }
}

fn dependencies(embedder: &TypeEmbedder, id: EmbeddingId) -> Vec<EmbeddingId> {
    match &embedder.embedding(id).kind {
        EmbeddingKind::Ctor { fields, .. } => fields.clone(),
        EmbeddingKind::Union { boxes, .. } => boxes.iter().map(|b| b.emb).collect(),
        _ => Vec::new(),
    }
}

fn resolve_one(
    embedder: &mut TypeEmbedder,
    table: &SymbolTable,
    terms: &mut TermStore,
    id: EmbeddingId,
) {
    let kind = embedder.embedding(id).kind.clone();
    let resolved = match kind {
        EmbeddingKind::Ctor { sym, dt, fields } => {
            let mut arg_terms = Vec::with_capacity(fields.len());
            let mut arg_exprs = Vec::with_capacity(fields.len());
            for f in fields {
                let d = embedder.embedding(f);
                arg_terms.push(d.default_term());
                arg_exprs.push(d.default_expr().clone());
            }
            let term = terms.mk(sym, &arg_terms);
            trace!(ctor = table.name(sym), "resolved default member");
            (term, BExpr::construct(dt, 0, arg_exprs))
        }
        EmbeddingKind::Union { dt, boxes } => {
            let chosen = boxes
                .iter()
                .filter(|b| embedder.embedding(b.emb).default_member.is_some())
                .min_by_key(|b| embedder.embedding(b.emb).cost)
                .expect("readiness guaranteed a resolved box");
            let inner = embedder.embedding(chosen.emb);
            (
                inner.default_term(),
                BExpr::construct(dt, chosen.ctor, vec![inner.default_expr().clone()]),
            )
        }
        _ => unreachable!("only constructors and unions lack defaults"),
    };
    embedder.embedding_mut(id).default_member = Some(resolved);
}
