//! Control-flow graph model.
//!
//! The symbolic execution engine consumes a control-flow graph in which every block holds
//! *operation trees* rather than flat instructions, and exception handling is described by
//! nested [regions](ControlFlowRegion). The model mirrors what a compiler front end produces
//! after lowering short-circuit operators, `?.`, `??`, `using` and `lock` into explicit
//! branches and flow captures.
//!
//! # Key Components
//!
//! - [`ControlFlowGraphBuilder`] - Describes a procedure and validates it
//! - [`ControlFlowGraph`] - The validated graph, with execution orders and exception-aware successors
//! - [`BasicBlock`] / [`ControlFlowBranch`] - Blocks and the branches leaving them
//! - [`ControlFlowRegion`] - `try`, `catch`, `finally` and filter regions
//! - [`Operation`] / [`OperationKind`] / [`OperationRef`] - Operation trees
//! - [`Symbol`] - Locals, parameters and members referenced by operations
//! - [`SemanticModel`] / [`TypeTable`] - Type queries answered by the host

mod block;
mod builder;
mod graph;
mod operation;
mod region;
mod semantic;
mod symbol;

pub use block::{BasicBlock, BlockKind, BranchSemantics, ConditionKind, ControlFlowBranch};
pub use builder::{ControlFlowGraphBuilder, ROOT_REGION};
pub use graph::ControlFlowGraph;
pub use operation::{
    BinaryOperator, CaptureId, ConstantValue, Operation, OperationId, OperationKind,
    OperationRef, Pattern, SyntaxLocation, UnaryOperator,
};
pub use region::{ControlFlowRegion, RegionKind};
pub use semantic::{known, SemanticModel, TypeId, TypeShape, TypeTable};
pub use symbol::{Symbol, SymbolFlags, SymbolId, SymbolKind};
