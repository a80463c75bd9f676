//! What a check sees at one program point.

use crate::analysis::{
    cfg::{ControlFlowGraph, OperationRef, SemanticModel, SymbolId},
    symbolic::ProgramState,
};

/// The operation being evaluated together with the state before (or after) it.
///
/// Contexts are cheap to create: everything but the state is borrowed from the engine, and
/// states share structure.
#[derive(Clone)]
pub struct SymbolicContext<'g> {
    graph: &'g ControlFlowGraph,
    semantic: &'g dyn SemanticModel,
    operation: Option<OperationRef<'g>>,
    state: ProgramState,
    visit_count: u32,
    is_loop_condition: bool,
}

impl<'g> SymbolicContext<'g> {
    /// Creates a context for `operation` in `state`.
    #[must_use]
    pub fn new(
        graph: &'g ControlFlowGraph,
        semantic: &'g dyn SemanticModel,
        operation: Option<OperationRef<'g>>,
        state: ProgramState,
        visit_count: u32,
        is_loop_condition: bool,
    ) -> Self {
        Self {
            graph,
            semantic,
            operation,
            state,
            visit_count,
            is_loop_condition,
        }
    }

    /// Returns the procedure being analyzed.
    #[must_use]
    pub fn graph(&self) -> &'g ControlFlowGraph {
        self.graph
    }

    /// Returns the type oracle.
    #[must_use]
    pub fn semantic(&self) -> &'g dyn SemanticModel {
        self.semantic
    }

    /// Returns the operation being evaluated; `None` at the exit block.
    #[must_use]
    pub fn operation(&self) -> Option<OperationRef<'g>> {
        self.operation
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &ProgramState {
        &self.state
    }

    /// How often the current program point was visited on this path, including this visit.
    #[must_use]
    pub fn visit_count(&self) -> u32 {
        self.visit_count
    }

    /// Returns `true` if the operation is the branch condition of a block inside a loop.
    #[must_use]
    pub fn is_loop_condition(&self) -> bool {
        self.is_loop_condition
    }

    /// Returns the locals and parameters captured by lambdas or local functions.
    ///
    /// Their values may change behind the analysis' back whenever a delegate runs.
    #[must_use]
    pub fn captured_variables(&self) -> &'g [SymbolId] {
        self.graph.captured_variables()
    }

    /// Returns a context for the same operation in a different state.
    #[must_use]
    pub fn with_state(&self, state: ProgramState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    /// Consumes the context, returning its state.
    #[must_use]
    pub fn into_state(self) -> ProgramState {
        self.state
    }
}
