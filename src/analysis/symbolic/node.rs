//! Nodes of the exploded graph.
//!
//! An [`ExplodedNode`] pairs a program point with the state reaching it. The program point is
//! a block ordinal plus the index of the next operation in the block's execution order; an
//! index equal to the number of operations denotes the end of the block, where the branch is
//! taken.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::{
    analysis::{
        cfg::{ControlFlowGraph, OperationId, OperationRef},
        symbolic::{FinallyPoint, ProgramState},
    },
    Error, Result,
};

/// Bits of the program-point hash holding the operation index.
pub const INDEX_BITS: u32 = 22;

/// Bits of the program-point hash holding the block ordinal.
pub const BLOCK_BITS: u32 = 32 - INDEX_BITS;

/// Largest supported number of blocks in a graph.
pub const MAX_BLOCKS: usize = 1 << BLOCK_BITS;

/// Largest supported number of operations (plus the end-of-block point) in a block.
pub const MAX_OPERATIONS: usize = 1 << INDEX_BITS;

/// Packs a program point into 32 bits.
#[must_use]
pub const fn program_point_hash(block: usize, index: usize) -> u32 {
    ((block as u32) << INDEX_BITS) | (index as u32 & (MAX_OPERATIONS as u32 - 1))
}

/// Verifies that every program point of `graph` has a distinct hash.
///
/// # Errors
///
/// Returns [`Error::UnsupportedGraph`] for graphs with more than [`MAX_BLOCKS`] blocks and
/// [`Error::TooManyOperations`] for a block whose execution order does not leave room for the
/// end-of-block point.
pub fn check_program_point_limits(graph: &ControlFlowGraph) -> Result<()> {
    if graph.block_count() > MAX_BLOCKS {
        return Err(Error::UnsupportedGraph {
            blocks: graph.block_count(),
            max: MAX_BLOCKS,
        });
    }
    for block in 0..graph.block_count() {
        let operations = graph.execution_order(block).len();
        if operations >= MAX_OPERATIONS {
            return Err(Error::TooManyOperations {
                block,
                operations,
                max: MAX_OPERATIONS - 1,
            });
        }
    }
    Ok(())
}

/// A program point together with the state reaching it.
#[derive(Clone)]
pub struct ExplodedNode {
    block: usize,
    operations: Arc<[OperationId]>,
    index: usize,
    state: ProgramState,
    finally_point: Option<Arc<FinallyPoint>>,
    program_point: u32,
}

impl ExplodedNode {
    /// Creates the node at the start of `block`.
    #[must_use]
    pub fn new(
        graph: &ControlFlowGraph,
        block: usize,
        state: ProgramState,
        finally_point: Option<Arc<FinallyPoint>>,
    ) -> Self {
        Self {
            block,
            operations: Arc::clone(graph.execution_order(block)),
            index: 0,
            state,
            finally_point,
            program_point: program_point_hash(block, 0),
        }
    }

    /// Creates the node for the next operation of the same block, carrying `state`.
    #[must_use]
    pub fn create_next(&self, state: ProgramState) -> Self {
        let index = self.index + 1;
        Self {
            block: self.block,
            operations: Arc::clone(&self.operations),
            index,
            state,
            finally_point: self.finally_point.clone(),
            program_point: program_point_hash(self.block, index),
        }
    }

    /// Records a visit of this program point in the node's state and returns the new count.
    pub fn add_visit(&mut self) -> u32 {
        self.state = self.state.add_visit(self.program_point);
        self.state.visit_count(self.program_point)
    }

    /// Returns the operation evaluated at this point, or `None` at the end of the block.
    #[must_use]
    pub fn operation<'g>(&self, graph: &'g ControlFlowGraph) -> Option<OperationRef<'g>> {
        self.operations
            .get(self.index)
            .map(|&operation| graph.operation(operation))
    }

    /// Returns the block ordinal.
    #[must_use]
    pub fn block(&self) -> usize {
        self.block
    }

    /// Returns the index of the next operation within the block's execution order.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns `true` once every operation of the block has been evaluated.
    #[must_use]
    pub fn is_block_end(&self) -> bool {
        self.index >= self.operations.len()
    }

    /// Returns the state reaching this point.
    #[must_use]
    pub fn state(&self) -> &ProgramState {
        &self.state
    }

    /// Returns the pending `finally` chain.
    #[must_use]
    pub fn finally_point(&self) -> Option<&Arc<FinallyPoint>> {
        self.finally_point.as_ref()
    }

    /// Returns the packed program point.
    #[must_use]
    pub fn program_point_hash(&self) -> u32 {
        self.program_point
    }
}

impl PartialEq for ExplodedNode {
    fn eq(&self, other: &Self) -> bool {
        self.program_point == other.program_point
            && self.state == other.state
            && self.finally_point == other.finally_point
    }
}

impl Eq for ExplodedNode {}

impl Hash for ExplodedNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.program_point.hash(state);
        self.state.hash(state);
        self.finally_point.hash(state);
    }
}

impl fmt::Debug for ExplodedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplodedNode")
            .field("block", &self.block)
            .field("index", &self.index)
            .field("finally", &self.finally_point.as_ref().map(|point| point.region()))
            .finish_non_exhaustive()
    }
}
