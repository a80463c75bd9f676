//! Shared helpers for unit tests.
//!
//! [`GraphFactory`] builds small procedures whose single body block holds the operations
//! under test. [`RecordingCheck`] remembers the callbacks the engine issued, so tests can
//! assert on exit states and completion after the check list was moved into the engine.

use std::sync::{Arc, Mutex};

use crate::analysis::{
    cfg::{
        known, BlockKind, ControlFlowGraph, ControlFlowGraphBuilder, Operation, OperationId,
        OperationKind, Symbol, SymbolId, TypeId, TypeShape, TypeTable,
    },
    symbolic::{ExecutionOutcome, ProgramState, SymbolicCheck, SymbolicContext},
};

/// Name of the class [`GraphFactory::object_type`] declares.
pub const OWNER_TYPE: &str = "App.Owner";

/// Builds `entry -> body -> exit` procedures around a set of operations.
pub struct GraphFactory {
    builder: ControlFlowGraphBuilder,
    types: TypeTable,
}

impl GraphFactory {
    pub fn new() -> Self {
        Self {
            builder: ControlFlowGraphBuilder::new("Test"),
            types: TypeTable::with_core_types(),
        }
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn local(&mut self, name: &str) -> SymbolId {
        self.builder.add_symbol(Symbol::local(name, None))
    }

    pub fn parameter(&mut self, name: &str) -> SymbolId {
        self.builder.add_symbol(Symbol::parameter(name, None))
    }

    pub fn symbol(&mut self, symbol: Symbol) -> SymbolId {
        self.builder.add_symbol(symbol)
    }

    pub fn operation(&mut self, kind: OperationKind) -> OperationId {
        self.builder.add_operation(Operation::new(kind))
    }

    pub fn add(&mut self, operation: Operation) -> OperationId {
        self.builder.add_operation(operation)
    }

    /// Declares the class [`OWNER_TYPE`], deriving from `object`.
    pub fn object_type(&mut self) -> TypeId {
        let object = self.types.get(known::OBJECT);
        self.types.define(OWNER_TYPE, TypeShape::Class, object)
    }

    /// Declares method `name` on the type `type_name`, declaring the type if needed.
    pub fn method(&mut self, type_name: &str, name: &str) -> SymbolId {
        let ty = match self.types.get(type_name) {
            Some(ty) => ty,
            None => {
                let object = self.types.get(known::OBJECT);
                self.types.define(type_name, TypeShape::Class, object)
            }
        };
        self.builder.add_symbol(Symbol::method(name, None, ty))
    }

    /// Places `roots` in block 1, between the entry block 0 and the exit block 2.
    pub fn linear_graph(mut self, roots: Vec<OperationId>) -> ControlFlowGraph {
        let entry = self.builder.add_block(BlockKind::Entry);
        let body = self.builder.add_block(BlockKind::Block);
        let exit = self.builder.add_block(BlockKind::Exit);
        for root in roots {
            self.builder.push_operation(body, root);
        }
        self.builder.goto(entry, body);
        self.builder.goto(body, exit);
        self.builder.build().expect("test graph must be valid")
    }
}

#[derive(Default)]
struct Recording {
    exit_states: Vec<ProgramState>,
    completions: Vec<ExecutionOutcome>,
}

/// A check that only records; clones share one recording.
#[derive(Clone, Default)]
pub struct RecordingCheck {
    recording: Arc<Mutex<Recording>>,
}

impl RecordingCheck {
    pub fn exits(&self) -> usize {
        lock!(self.recording).exit_states.len()
    }

    pub fn exit_states(&self) -> Vec<ProgramState> {
        lock!(self.recording).exit_states.clone()
    }

    pub fn completions(&self) -> Vec<ExecutionOutcome> {
        lock!(self.recording).completions.clone()
    }
}

impl SymbolicCheck for RecordingCheck {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn exit_reached(&mut self, context: &SymbolicContext<'_>) {
        lock!(self.recording).exit_states.push(context.state().clone());
    }

    fn execution_completed(&mut self, outcome: ExecutionOutcome) {
        lock!(self.recording).completions.push(outcome);
    }
}
