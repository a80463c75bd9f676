//! The validated control-flow graph of one procedure.

use std::sync::Arc;

use crate::{
    analysis::cfg::{
        BasicBlock, ControlFlowRegion, Operation, OperationId, OperationRef, RegionKind, Symbol,
        SymbolId,
    },
    utils::graph::{GraphBase, NodeId, RootedGraph, Successors},
};

/// The control-flow graph of a single procedure, as consumed by the symbolic execution engine.
///
/// Instances are created through [`ControlFlowGraphBuilder`](crate::analysis::cfg::ControlFlowGraphBuilder),
/// which validates every cross reference. All accessors may therefore index without checks and
/// panic only when handed identifiers from a different graph.
///
/// Besides the raw structure the graph keeps two derived tables:
///
/// - the *execution order* of every block: the operation trees of the block flattened
///   children-first, so that operands are evaluated before the operations consuming them
/// - the *exception-aware successors* of every block, which add the entries of the handlers
///   a block is protected by and the continuations of `finally` regions to the regular
///   branch destinations
///
/// The graph implements [`Successors`] over the exception-aware table, so the loop detector and
/// the live-variable analysis see cycles that only exist through exception handling.
#[derive(Debug)]
pub struct ControlFlowGraph {
    pub(crate) name: String,
    pub(crate) operations: Vec<Operation>,
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) blocks: Vec<BasicBlock>,
    pub(crate) regions: Vec<ControlFlowRegion>,
    pub(crate) execution_orders: Vec<Arc<[OperationId]>>,
    pub(crate) exceptional_successors: Vec<Vec<usize>>,
    pub(crate) captured_variables: Vec<SymbolId>,
}

impl ControlFlowGraph {
    /// Returns the name of the procedure.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns all blocks, by ordinal.
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the block with the given ordinal.
    ///
    /// # Panics
    ///
    /// Panics if `ordinal` is out of range.
    #[must_use]
    pub fn block(&self, ordinal: usize) -> &BasicBlock {
        &self.blocks[ordinal]
    }

    /// Returns the entry block.
    #[must_use]
    pub fn entry_block(&self) -> &BasicBlock {
        &self.blocks[0]
    }

    /// Returns the exit block.
    #[must_use]
    pub fn exit_block(&self) -> &BasicBlock {
        &self.blocks[self.blocks.len() - 1]
    }

    /// Returns all regions; the root region has ordinal 0.
    #[must_use]
    pub fn regions(&self) -> &[ControlFlowRegion] {
        &self.regions
    }

    /// Returns the region with the given ordinal.
    #[must_use]
    pub fn region(&self, ordinal: usize) -> &ControlFlowRegion {
        &self.regions[ordinal]
    }

    /// Returns a view of an operation.
    #[must_use]
    pub fn operation(&self, id: OperationId) -> OperationRef<'_> {
        OperationRef::new(self, id)
    }

    pub(crate) fn operation_data(&self, id: OperationId) -> &Operation {
        &self.operations[id.index()]
    }

    /// Returns the number of operations in the arena.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Returns a symbol.
    #[must_use]
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    /// Returns the number of symbols.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Returns the operations of a block in execution order, including the branch value.
    #[must_use]
    pub fn execution_order(&self, block: usize) -> &Arc<[OperationId]> {
        &self.execution_orders[block]
    }

    /// Returns the locals and parameters captured by lambdas or local functions.
    #[must_use]
    pub fn captured_variables(&self) -> &[SymbolId] {
        &self.captured_variables
    }

    /// Iterates over the regions containing `block`, innermost first, ending with the root.
    pub fn enclosing_regions(&self, block: usize) -> impl Iterator<Item = &ControlFlowRegion> {
        self.region_ancestors(self.blocks[block].enclosing_region)
    }

    /// Iterates over `region` and its ancestors, ending with the root.
    pub fn region_ancestors(&self, region: usize) -> impl Iterator<Item = &ControlFlowRegion> {
        std::iter::successors(Some(&self.regions[region]), move |current| {
            current.enclosing.map(|parent| &self.regions[parent])
        })
    }

    /// Returns the innermost region of the given kind containing `block`.
    #[must_use]
    pub fn enclosing_region_of_kind(
        &self,
        block: usize,
        kind: RegionKind,
    ) -> Option<&ControlFlowRegion> {
        self.enclosing_regions(block).find(|region| region.kind == kind)
    }

    /// Returns the sibling handler regions of a `try` region, in declaration order.
    ///
    /// For a `try` grouped in a [`RegionKind::TryAndCatch`] these are the catch and
    /// filter-and-handler regions, for a [`RegionKind::TryAndFinally`] the finally region.
    /// Any other region has no handlers.
    pub fn handlers_of(&self, try_region: usize) -> impl Iterator<Item = &ControlFlowRegion> {
        let region = &self.regions[try_region];
        let siblings: &[usize] = match (region.kind, region.enclosing) {
            (RegionKind::Try, Some(parent)) => &self.regions[parent].nested,
            _ => &[],
        };
        siblings
            .iter()
            .filter(move |&&sibling| sibling != try_region)
            .map(|&sibling| &self.regions[sibling])
    }

    /// Returns `true` if any region enclosing `block` is a `try`.
    #[must_use]
    pub fn is_protected(&self, block: usize) -> bool {
        self.enclosing_region_of_kind(block, RegionKind::Try).is_some()
    }
}

impl GraphBase for ControlFlowGraph {
    fn node_count(&self) -> usize {
        self.blocks.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.blocks.len()).map(NodeId::new)
    }
}

impl Successors for ControlFlowGraph {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.exceptional_successors[node.index()]
            .iter()
            .copied()
            .map(NodeId::new)
    }
}

impl RootedGraph for ControlFlowGraph {
    fn entry(&self) -> NodeId {
        NodeId::new(0)
    }
}
