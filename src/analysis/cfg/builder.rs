//! Construction and validation of control-flow graphs.
//!
//! Front ends describe a procedure block by block: operations are added to an arena, pushed as
//! roots of blocks, and blocks are connected with one of the branch helpers. Regions are
//! declared with their block range and enclosing region. [`ControlFlowGraphBuilder::build`]
//! then checks every cross reference, derives the innermost region of each block and the
//! region transitions of each branch, and flattens the operation trees into execution order.
//!
//! # Example
//!
//! ```rust
//! use symflow::analysis::cfg::*;
//!
//! # fn main() -> symflow::Result<()> {
//! let types = TypeTable::with_core_types();
//! let object = types.get(known::OBJECT);
//!
//! let mut builder = ControlFlowGraphBuilder::new("Sample");
//! let x = builder.add_symbol(Symbol::parameter("x", object));
//!
//! let entry = builder.add_block(BlockKind::Entry);
//! let body = builder.add_block(BlockKind::Block);
//! let exit = builder.add_block(BlockKind::Exit);
//!
//! let reference = builder.add_operation(Operation::new(OperationKind::ParameterReference(x)));
//! builder.goto(entry, body);
//! builder.return_value(body, exit, Some(reference));
//!
//! let graph = builder.build()?;
//! assert_eq!(graph.block_count(), 3);
//! assert_eq!(graph.execution_order(body).len(), 1);
//! # Ok(())
//! # }
//! ```

use std::{collections::HashSet, sync::Arc};

use crate::{
    analysis::cfg::{
        BasicBlock, BlockKind, BranchSemantics, CaptureId, ConditionKind, ControlFlowBranch,
        ControlFlowGraph, ControlFlowRegion, Operation, OperationId, RegionKind, Symbol, SymbolId,
        TypeId,
    },
    Result,
};

/// Ordinal of the root region every builder starts with.
pub const ROOT_REGION: usize = 0;

#[derive(Debug)]
struct PendingBlock {
    kind: BlockKind,
    operations: Vec<OperationId>,
    branch_value: Option<OperationId>,
    condition_kind: ConditionKind,
    conditional: Option<usize>,
    fall_through: Option<(Option<usize>, BranchSemantics)>,
}

#[derive(Debug)]
struct PendingRegion {
    kind: RegionKind,
    enclosing: Option<usize>,
    first_block: usize,
    last_block: usize,
    exception_type: Option<TypeId>,
}

/// Incrementally describes a procedure and validates it into a [`ControlFlowGraph`].
#[derive(Debug)]
pub struct ControlFlowGraphBuilder {
    name: String,
    operations: Vec<Operation>,
    symbols: Vec<Symbol>,
    blocks: Vec<PendingBlock>,
    regions: Vec<PendingRegion>,
    region_captures: Vec<(usize, CaptureId)>,
    captured_variables: Vec<SymbolId>,
}

impl ControlFlowGraphBuilder {
    /// Creates a builder for the procedure `name`, holding only the root region.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            operations: Vec::new(),
            symbols: Vec::new(),
            blocks: Vec::new(),
            regions: vec![PendingRegion {
                kind: RegionKind::Root,
                enclosing: None,
                first_block: 0,
                last_block: 0,
                exception_type: None,
            }],
            region_captures: Vec::new(),
            captured_variables: Vec::new(),
        }
    }

    /// Declares a symbol.
    pub fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        self.symbols.push(symbol);
        SymbolId((self.symbols.len() - 1) as u32)
    }

    /// Adds an operation to the arena. It becomes part of a block once it is pushed as a root
    /// or referenced by another operation.
    pub fn add_operation(&mut self, operation: Operation) -> OperationId {
        self.operations.push(operation);
        OperationId((self.operations.len() - 1) as u32)
    }

    /// Appends a block and returns its ordinal.
    pub fn add_block(&mut self, kind: BlockKind) -> usize {
        self.blocks.push(PendingBlock {
            kind,
            operations: Vec::new(),
            branch_value: None,
            condition_kind: ConditionKind::None,
            conditional: None,
            fall_through: None,
        });
        self.blocks.len() - 1
    }

    /// Appends a root operation to `block`.
    ///
    /// # Panics
    ///
    /// Panics if `block` was not returned by [`Self::add_block`].
    pub fn push_operation(&mut self, block: usize, operation: OperationId) {
        self.blocks[block].operations.push(operation);
    }

    /// Adds an operation and appends it as a root of `block` in one step.
    pub fn push_new_operation(&mut self, block: usize, operation: Operation) -> OperationId {
        let id = self.add_operation(operation);
        self.push_operation(block, id);
        id
    }

    fn set_fall_through(&mut self, block: usize, destination: Option<usize>, semantics: BranchSemantics) {
        self.blocks[block].fall_through = Some((destination, semantics));
    }

    /// Unconditionally continues from `from` to `to`.
    pub fn goto(&mut self, from: usize, to: usize) {
        self.set_fall_through(from, Some(to), BranchSemantics::Regular);
    }

    /// Ends `block` with a two-way branch on `condition`.
    ///
    /// # Arguments
    ///
    /// * `block` - The branching block
    /// * `condition` - Boolean operation evaluated last in the block
    /// * `kind` - Whether `conditional` is taken when the condition is `true` or `false`
    /// * `conditional` - Destination taken according to `kind`
    /// * `fall_through` - Destination taken otherwise
    pub fn branch(
        &mut self,
        block: usize,
        condition: OperationId,
        kind: ConditionKind,
        conditional: usize,
        fall_through: usize,
    ) {
        let pending = &mut self.blocks[block];
        pending.branch_value = Some(condition);
        pending.condition_kind = kind;
        pending.conditional = Some(conditional);
        self.set_fall_through(block, Some(fall_through), BranchSemantics::Regular);
    }

    /// Returns from the procedure, optionally with a value.
    pub fn return_value(&mut self, block: usize, exit: usize, value: Option<OperationId>) {
        self.blocks[block].branch_value = value;
        self.set_fall_through(block, Some(exit), BranchSemantics::Return);
    }

    /// Ends `block` with `throw exception`.
    pub fn throw(&mut self, block: usize, exception: OperationId) {
        self.blocks[block].branch_value = Some(exception);
        self.set_fall_through(block, None, BranchSemantics::Throw);
    }

    /// Ends a catch-handler block with `throw;`.
    pub fn rethrow(&mut self, block: usize) {
        self.set_fall_through(block, None, BranchSemantics::Rethrow);
    }

    /// Ends the last block of a `finally` region, or of a filter with its filter condition.
    pub fn end_handler(&mut self, block: usize, filter_condition: Option<OperationId>) {
        self.blocks[block].branch_value = filter_condition;
        self.set_fall_through(block, None, BranchSemantics::StructuredExceptionHandling);
    }

    /// Ends `block` with process termination.
    pub fn terminate(&mut self, block: usize) {
        self.set_fall_through(block, None, BranchSemantics::ProgramTermination);
    }

    /// Declares a region covering `first_block..=last_block`.
    ///
    /// Regions must be declared after their enclosing region.
    pub fn add_region(
        &mut self,
        kind: RegionKind,
        enclosing: usize,
        first_block: usize,
        last_block: usize,
    ) -> usize {
        self.regions.push(PendingRegion {
            kind,
            enclosing: Some(enclosing),
            first_block,
            last_block,
            exception_type: None,
        });
        self.regions.len() - 1
    }

    /// Declares a catch handler or filter; `exception_type` of `None` catches everything.
    pub fn add_handler_region(
        &mut self,
        kind: RegionKind,
        enclosing: usize,
        first_block: usize,
        last_block: usize,
        exception_type: Option<TypeId>,
    ) -> usize {
        let region = self.add_region(kind, enclosing, first_block, last_block);
        self.regions[region].exception_type = exception_type;
        region
    }

    /// Scopes the flow capture `capture` to `region`: leaving the region releases it.
    ///
    /// Captures not scoped to any region live until the end of the procedure.
    pub fn add_region_capture(&mut self, region: usize, capture: CaptureId) {
        if !self.region_captures.contains(&(region, capture)) {
            self.region_captures.push((region, capture));
        }
    }

    /// Marks a local or parameter as captured by a lambda or local function.
    pub fn capture_variable(&mut self, symbol: SymbolId) {
        if !self.captured_variables.contains(&symbol) {
            self.captured_variables.push(symbol);
        }
    }

    /// Validates the description and produces the graph.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidGraph`] if the graph has no entry or exit block, a block
    /// other than the exit has no fall-through successor, any block, operation, symbol or
    /// region reference dangles, an operation is reachable twice within one block, or a region
    /// is not nested within its enclosing region.
    pub fn build(self) -> Result<ControlFlowGraph> {
        self.validate_blocks()?;
        self.validate_operations()?;
        let regions = self.build_regions()?;

        let depths = region_depths(&regions);
        let innermost: Vec<usize> = (0..self.blocks.len())
            .map(|block| {
                regions
                    .iter()
                    .filter(|region| region.contains(block))
                    .max_by_key(|region| depths[region.ordinal])
                    .map_or(ROOT_REGION, |region| region.ordinal)
            })
            .collect();

        let mut blocks = Vec::with_capacity(self.blocks.len());
        for (ordinal, pending) in self.blocks.iter().enumerate() {
            let make_branch = |destination: Option<usize>, semantics, is_conditional| {
                branch_between(&regions, &innermost, ordinal, destination, semantics, is_conditional)
            };
            blocks.push(BasicBlock {
                ordinal,
                kind: pending.kind,
                operations: pending.operations.clone(),
                branch_value: pending.branch_value,
                condition_kind: pending.condition_kind,
                conditional_successor: pending
                    .conditional
                    .map(|target| make_branch(Some(target), BranchSemantics::Regular, true)),
                fall_through_successor: pending
                    .fall_through
                    .map(|(target, semantics)| make_branch(target, semantics, false)),
                enclosing_region: innermost[ordinal],
            });
        }

        let execution_orders = blocks
            .iter()
            .map(|block| execution_order(&self.operations, block))
            .collect::<Result<Vec<_>>>()?;
        let exceptional_successors = exceptional_successors(&blocks, &regions);

        Ok(ControlFlowGraph {
            name: self.name,
            operations: self.operations,
            symbols: self.symbols,
            blocks,
            regions,
            execution_orders,
            exceptional_successors,
            captured_variables: self.captured_variables,
        })
    }

    fn validate_blocks(&self) -> Result<()> {
        let count = self.blocks.len();
        if count < 2 {
            return Err(invalid_graph!(
                "graph '{}' needs an entry and an exit block, found {} blocks",
                self.name,
                count
            ));
        }
        for (ordinal, block) in self.blocks.iter().enumerate() {
            let expected = match ordinal {
                0 => BlockKind::Entry,
                o if o == count - 1 => BlockKind::Exit,
                _ => BlockKind::Block,
            };
            if block.kind != expected {
                return Err(invalid_graph!(
                    "block {} is {:?}, expected {:?}",
                    ordinal,
                    block.kind,
                    expected
                ));
            }
            if block.kind != BlockKind::Block && !block.operations.is_empty() {
                return Err(invalid_graph!("{:?} block {} holds operations", block.kind, ordinal));
            }

            match (block.kind, block.fall_through) {
                (BlockKind::Exit, None) => {}
                (BlockKind::Exit, Some(_)) => {
                    return Err(invalid_graph!("exit block {} has successors", ordinal))
                }
                (_, None) => {
                    return Err(invalid_graph!("block {} has no fall-through successor", ordinal))
                }
                (_, Some((destination, _))) => {
                    if destination.is_some_and(|d| d >= count) {
                        return Err(invalid_graph!("block {} branches to a missing block", ordinal));
                    }
                }
            }

            if let Some(conditional) = block.conditional {
                if conditional >= count {
                    return Err(invalid_graph!("block {} branches to a missing block", ordinal));
                }
                if block.condition_kind == ConditionKind::None || block.branch_value.is_none() {
                    return Err(invalid_graph!(
                        "block {} has a conditional successor without a condition",
                        ordinal
                    ));
                }
            }
        }
        Ok(())
    }

    fn validate_operations(&self) -> Result<()> {
        let operation_count = self.operations.len();
        let check_operation = |id: OperationId| {
            if id.index() < operation_count {
                Ok(())
            } else {
                Err(invalid_graph!("operation {} does not exist", id))
            }
        };

        for operation in &self.operations {
            for child in operation.kind.children() {
                check_operation(child)?;
            }
            for symbol in operation.kind.referenced_symbols() {
                if symbol.index() >= self.symbols.len() {
                    return Err(invalid_graph!("symbol {} does not exist", symbol));
                }
            }
        }
        for block in &self.blocks {
            for &root in block.operations.iter().chain(block.branch_value.iter()) {
                check_operation(root)?;
            }
        }
        if let Some(symbol) = self
            .captured_variables
            .iter()
            .find(|symbol| symbol.index() >= self.symbols.len())
        {
            return Err(invalid_graph!("captured symbol {} does not exist", symbol));
        }
        Ok(())
    }

    fn build_regions(&self) -> Result<Vec<ControlFlowRegion>> {
        let last_block = self.blocks.len() - 1;
        let mut regions: Vec<ControlFlowRegion> = Vec::with_capacity(self.regions.len());

        for (ordinal, pending) in self.regions.iter().enumerate() {
            let (first_block, last) = if ordinal == ROOT_REGION {
                (0, last_block)
            } else {
                (pending.first_block, pending.last_block)
            };
            if first_block > last || last > last_block {
                return Err(invalid_graph!(
                    "region {} covers invalid block range {}..={}",
                    ordinal,
                    first_block,
                    last
                ));
            }
            if let Some(enclosing) = pending.enclosing {
                let Some(parent) = regions.get(enclosing) else {
                    return Err(invalid_graph!(
                        "region {} is declared before its enclosing region {}",
                        ordinal,
                        enclosing
                    ));
                };
                if !(parent.contains(first_block) && parent.contains(last)) {
                    return Err(invalid_graph!(
                        "region {} is not nested within region {}",
                        ordinal,
                        enclosing
                    ));
                }
            }

            regions.push(ControlFlowRegion {
                ordinal,
                kind: pending.kind,
                enclosing: pending.enclosing,
                first_block,
                last_block: last,
                exception_type: pending.exception_type,
                nested: Vec::new(),
                capture_ids: Vec::new(),
            });
            if let Some(enclosing) = pending.enclosing {
                regions[enclosing].nested.push(ordinal);
            }
        }

        for &(region, capture) in &self.region_captures {
            let Some(region) = regions.get_mut(region) else {
                return Err(invalid_graph!("capture {} is scoped to missing region {}", capture, region));
            };
            region.capture_ids.push(capture);
        }

        for ordinal in 0..regions.len() {
            let mut nested = std::mem::take(&mut regions[ordinal].nested);
            nested.sort_by_key(|&child| regions[child].first_block);
            regions[ordinal].nested = nested;
        }
        Ok(regions)
    }
}

fn region_depths(regions: &[ControlFlowRegion]) -> Vec<usize> {
    let mut depths = vec![0; regions.len()];
    // Enclosing regions always precede the regions they contain.
    for region in regions {
        if let Some(parent) = region.enclosing {
            depths[region.ordinal] = depths[parent] + 1;
        }
    }
    depths
}

fn region_chain(regions: &[ControlFlowRegion], innermost: usize) -> Vec<usize> {
    std::iter::successors(Some(innermost), |&current| regions[current].enclosing).collect()
}

fn branch_between(
    regions: &[ControlFlowRegion],
    innermost: &[usize],
    source: usize,
    destination: Option<usize>,
    semantics: BranchSemantics,
    is_conditional: bool,
) -> ControlFlowBranch {
    let mut branch = ControlFlowBranch {
        source,
        destination,
        semantics,
        is_conditional,
        entering_regions: Vec::new(),
        leaving_regions: Vec::new(),
        finally_regions: Vec::new(),
    };
    let Some(destination) = destination else {
        return branch;
    };

    branch.leaving_regions = region_chain(regions, innermost[source])
        .into_iter()
        .filter(|&region| !regions[region].contains(destination))
        .collect();
    branch.entering_regions = region_chain(regions, innermost[destination])
        .into_iter()
        .filter(|&region| !regions[region].contains(source))
        .collect();
    branch.entering_regions.reverse();

    branch.finally_regions = branch
        .leaving_regions
        .iter()
        .filter(|&&region| regions[region].kind == RegionKind::Try)
        .filter_map(|&region| {
            let parent = &regions[regions[region].enclosing?];
            if parent.kind != RegionKind::TryAndFinally {
                return None;
            }
            parent
                .nested
                .iter()
                .copied()
                .find(|&sibling| regions[sibling].kind == RegionKind::Finally)
        })
        .collect();
    branch
}

/// Flattens the operation trees of `block` children-first, branch value last.
fn execution_order(operations: &[Operation], block: &BasicBlock) -> Result<Arc<[OperationId]>> {
    let mut order = Vec::new();
    let mut seen = HashSet::new();

    for &root in block.operations.iter().chain(block.branch_value.iter()) {
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if !seen.insert(id) {
                return Err(invalid_graph!(
                    "operation {} is reached twice in block {}",
                    id,
                    block.ordinal
                ));
            }
            stack.push((id, true));
            for child in operations[id.index()].kind.children().into_iter().rev() {
                stack.push((child, false));
            }
        }
    }
    Ok(order.into())
}

fn exceptional_successors(blocks: &[BasicBlock], regions: &[ControlFlowRegion]) -> Vec<Vec<usize>> {
    // Continuations of each finally region: the next finally of the chain, or the destination.
    let mut finally_exits: Vec<Vec<usize>> = vec![Vec::new(); regions.len()];
    for branch in blocks.iter().flat_map(|block| block.successors()) {
        let Some(destination) = branch.destination else {
            continue;
        };
        for (position, &finally) in branch.finally_regions.iter().enumerate() {
            let next = branch
                .finally_regions
                .get(position + 1)
                .map_or(destination, |&next| regions[next].first_block);
            finally_exits[finally].push(next);
        }
    }

    blocks
        .iter()
        .map(|block| {
            let mut successors = Vec::new();
            for branch in block.successors() {
                match branch.finally_regions.first() {
                    Some(&finally) => successors.push(regions[finally].first_block),
                    None => successors.extend(branch.destination),
                }
            }

            for region in region_chain(regions, block.enclosing_region) {
                let region = &regions[region];
                let Some(parent) = region.enclosing else {
                    continue;
                };
                match region.kind {
                    RegionKind::Try => successors.extend(
                        regions[parent]
                            .nested
                            .iter()
                            .filter(|&&sibling| sibling != region.ordinal)
                            .map(|&sibling| regions[sibling].first_block),
                    ),
                    RegionKind::Finally | RegionKind::Filter
                        if block.fall_through_semantics()
                            == BranchSemantics::StructuredExceptionHandling
                            && region.last_block == block.ordinal =>
                    {
                        if region.kind == RegionKind::Finally {
                            successors.extend(finally_exits[region.ordinal].iter().copied());
                        } else {
                            successors.extend(
                                regions[parent]
                                    .nested
                                    .iter()
                                    .filter(|&&sibling| regions[sibling].kind == RegionKind::Catch)
                                    .map(|&sibling| regions[sibling].first_block),
                            );
                        }
                    }
                    _ => {}
                }
            }

            successors.sort_unstable();
            successors.dedup();
            successors
        })
        .collect()
}
