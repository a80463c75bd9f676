//! Live variable analysis over locals and parameters.
//!
//! A variable is *live* at the start of a block if some path from there reads it before
//! writing it. The engine forgets the values of variables that are dead on entry to the next
//! block, so that paths which differ only in dead variables merge.
//!
//! # Algorithm
//!
//! A backward data flow analysis over the exception-aware successors:
//!
//! - `USE[B]` = variables read in B before any write in B
//! - `DEF[B]` = variables written in B
//! - `OUT[B]` = ∪{IN[S] | S is a successor of B}
//! - `IN[B]` = USE[B] ∪ (OUT[B] - DEF[B])
//!
//! Blocks are evaluated in execution order, where the target of an assignment is visited
//! before the assigned value. Simple-assignment targets therefore count as a write at the
//! assignment, not as a read; compound assignments, increments and decrements are a read
//! followed by a write. Declaration patterns write the declared local.

use std::collections::HashSet;

use crate::{
    analysis::cfg::{ControlFlowGraph, OperationId, OperationKind, SymbolId, SymbolKind},
    utils::{
        graph::{NodeId, Successors},
        BitSet,
    },
};

/// Per-block liveness of locals and parameters.
#[derive(Clone, Debug)]
pub struct LiveVariables {
    live_in: Vec<BitSet>,
    live_out: Vec<BitSet>,
    tracked: BitSet,
}

impl LiveVariables {
    /// Computes liveness for every block of `graph`.
    #[must_use]
    pub fn new(graph: &ControlFlowGraph) -> Self {
        let symbols = graph.symbol_count();
        let blocks = graph.block_count();

        let mut tracked = BitSet::new(symbols);
        for index in 0..symbols {
            let kind = graph.symbol(SymbolId::new(index as u32)).kind;
            if matches!(kind, SymbolKind::Local | SymbolKind::Parameter) {
                tracked.insert(index);
            }
        }

        let mut use_sets = Vec::with_capacity(blocks);
        let mut def_sets = Vec::with_capacity(blocks);
        for block in 0..blocks {
            let (uses, defs) = block_effects(graph, block, &tracked);
            use_sets.push(uses);
            def_sets.push(defs);
        }

        let mut live_in: Vec<BitSet> = use_sets.clone();
        let mut live_out: Vec<BitSet> = (0..blocks).map(|_| BitSet::new(symbols)).collect();

        let mut changed = true;
        while changed {
            changed = false;
            for block in (0..blocks).rev() {
                let mut out = BitSet::new(symbols);
                for successor in graph.successors(NodeId::new(block)) {
                    out.union_with(&live_in[successor.index()]);
                }

                let mut input = out.clone();
                input.difference_with(&def_sets[block]);
                input.union_with(&use_sets[block]);

                if input != live_in[block] {
                    live_in[block] = input;
                    changed = true;
                }
                live_out[block] = out;
            }
        }

        Self {
            live_in,
            live_out,
            tracked,
        }
    }

    /// Returns `true` if `symbol` is a local or parameter, the only symbols liveness covers.
    #[must_use]
    pub fn is_tracked(&self, symbol: SymbolId) -> bool {
        self.tracked.contains(symbol.index())
    }

    /// Returns `true` if `symbol` may be read after entering `block`.
    ///
    /// Symbols liveness does not cover are always reported live.
    #[must_use]
    pub fn is_live_in(&self, block: usize, symbol: SymbolId) -> bool {
        !self.is_tracked(symbol) || self.live_in[block].contains(symbol.index())
    }

    /// Returns the variables live on entry to `block`.
    #[must_use]
    pub fn live_in(&self, block: usize) -> &BitSet {
        &self.live_in[block]
    }

    /// Returns the variables live on exit from `block`.
    #[must_use]
    pub fn live_out(&self, block: usize) -> &BitSet {
        &self.live_out[block]
    }
}

fn block_effects(graph: &ControlFlowGraph, block: usize, tracked: &BitSet) -> (BitSet, BitSet) {
    let mut uses = BitSet::new(tracked.len());
    let mut defs = BitSet::new(tracked.len());
    let order = graph.execution_order(block);

    let assignment_targets: HashSet<OperationId> = order
        .iter()
        .filter_map(|&id| match graph.operation(id).kind() {
            OperationKind::SimpleAssignment { target, .. } => Some(*target),
            _ => None,
        })
        .collect();

    let variable = |id: OperationId| match graph.operation(id).kind() {
        OperationKind::LocalReference(symbol) | OperationKind::ParameterReference(symbol)
            if tracked.contains(symbol.index()) =>
        {
            Some(symbol.index())
        }
        _ => None,
    };

    for &id in order.iter() {
        match graph.operation(id).kind() {
            OperationKind::LocalReference(_) | OperationKind::ParameterReference(_) => {
                if !assignment_targets.contains(&id) {
                    if let Some(index) = variable(id) {
                        if !defs.contains(index) {
                            uses.insert(index);
                        }
                    }
                }
            }
            OperationKind::SimpleAssignment { target, .. }
            | OperationKind::CompoundAssignment { target, .. }
            | OperationKind::Increment { target }
            | OperationKind::Decrement { target } => {
                if let Some(index) = variable(*target) {
                    defs.insert(index);
                }
            }
            OperationKind::IsPattern { pattern, .. } => {
                if let Some(symbol) = pattern.declared_symbol() {
                    if tracked.contains(symbol.index()) {
                        defs.insert(symbol.index());
                    }
                }
            }
            _ => {}
        }
    }
    (uses, defs)
}
