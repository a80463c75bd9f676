//! # symflow Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the symflow library. Import it to describe a procedure, plug in checks and run the
//! engine without spelling out module paths.
//!
//! ```rust
//! use symflow::prelude::*;
//!
//! let config = ExecutionConfig::default().with_max_steps(10_000);
//! assert_eq!(config.max_steps, 10_000);
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all symflow operations
pub use crate::Error;

/// The result type used throughout symflow
pub use crate::Result;

// ================================================================================================
// Graph Model
// ================================================================================================

/// Building and inspecting control-flow graphs
pub use crate::analysis::cfg::{
    known, BasicBlock, BinaryOperator, BlockKind, BranchSemantics, CaptureId, ConditionKind, ConstantValue,
    ControlFlowBranch, ControlFlowGraph, ControlFlowGraphBuilder, ControlFlowRegion, Operation,
    OperationId, OperationKind, OperationRef, Pattern, RegionKind, SemanticModel, Symbol,
    SymbolFlags, SymbolId, SymbolKind, TypeId, TypeShape, TypeTable, UnaryOperator, ROOT_REGION,
};

// ================================================================================================
// Symbolic Execution
// ================================================================================================

/// Running the engine
pub use crate::analysis::symbolic::{
    execute_batch, ExecutionConfig, ExecutionOutcome, ExecutionResult, ExecutionStatistics,
    SymbolicExecution,
};

/// Abstract values and states
pub use crate::analysis::symbolic::{
    Constraint, ConstraintKind, ExceptionState, ProgramState, SymbolicValue,
};

/// Writing checks
pub use crate::analysis::symbolic::{
    CollectingSink, Diagnostic, DiagnosticSink, IssueReporter, States, SymbolicCheck,
    SymbolicCheckList, SymbolicContext,
};
