//! Path-sensitive symbolic execution.
//!
//! The engine explores the *exploded graph* of a procedure: every reachable pair of a
//! program point and an abstract [`ProgramState`]. States map operations and symbols to
//! [`SymbolicValue`]s, sets of [`Constraint`]s such as "not null" or "true". Operations
//! transform states through the [`OperationDispatcher`]; branches learn the facts their
//! condition implies and drop edges that contradict what is known.
//!
//! # Architecture
//!
//! - [`constraints`] and [`value`] - Constraint families and canonical symbolic values
//! - [`state`] - The persistent program state, shared structurally between paths
//! - [`processors`] - Abstract semantics of each operation kind
//! - [`exception_candidate`] - Which exception an operation may throw in a given state
//! - [`loops`] and [`liveness`] - Graph analyses run once per procedure
//! - [`node`] and [`finally_point`] - Program points of the exploded graph
//! - [`check`], [`context`] and [`states`] - The protocol for rules hooked into the walk
//! - [`engine`] - The breadth-first driver
//! - [`batch`] - Parallel exploration of many procedures
//!
//! # Usage
//!
//! ```rust,no_run
//! use symflow::analysis::cfg::{ControlFlowGraph, TypeTable};
//! use symflow::analysis::symbolic::{
//!     ExecutionConfig, SymbolicCheck, SymbolicCheckList, SymbolicContext, SymbolicExecution,
//! };
//!
//! struct CountExits(usize);
//!
//! impl SymbolicCheck for CountExits {
//!     fn name(&self) -> &'static str {
//!         "count-exits"
//!     }
//!
//!     fn exit_reached(&mut self, _context: &SymbolicContext<'_>) {
//!         self.0 += 1;
//!     }
//! }
//!
//! fn explore(graph: &ControlFlowGraph, types: &TypeTable) -> symflow::Result<()> {
//!     let checks = SymbolicCheckList::new(vec![Box::new(CountExits(0))]);
//!     let mut engine = SymbolicExecution::new(graph, types, checks, ExecutionConfig::default())?;
//!     let result = engine.execute();
//!     println!("{} distinct exit states", result.statistics.exit_states);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod check;
pub mod config;
pub mod constraints;
pub mod context;
pub mod engine;
pub mod exception;
pub mod exception_candidate;
pub mod finally_point;
pub mod liveness;
pub mod loops;
pub mod methods;
pub mod node;
pub mod processors;
pub mod report;
pub mod state;
pub mod states;
pub mod value;

pub use batch::execute_batch;
pub use check::{SymbolicCheck, SymbolicCheckList};
pub use config::ExecutionConfig;
pub use constraints::{
    BoolConstraint, Constraint, ConstraintKind, LockConstraint, NumberConstraint, ObjectConstraint,
};
pub use context::SymbolicContext;
pub use engine::{ExecutionOutcome, ExecutionResult, ExecutionStatistics, SymbolicExecution};
pub use exception::ExceptionState;
pub use exception_candidate::exception_candidate;
pub use finally_point::FinallyPoint;
pub use liveness::LiveVariables;
pub use loops::LoopDetector;
pub use methods::KnownMethod;
pub use node::{
    check_program_point_limits, program_point_hash, ExplodedNode, BLOCK_BITS, INDEX_BITS, MAX_BLOCKS,
    MAX_OPERATIONS,
};
pub use processors::OperationDispatcher;
pub use report::{CollectingSink, Diagnostic, DiagnosticSink, IssueReporter};
pub use state::ProgramState;
pub use states::States;
pub use value::SymbolicValue;
