// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![allow(clippy::too_many_arguments)]

//! # symflow
//!
//! Path-sensitive symbolic execution over the control-flow graph of a single procedure.
//!
//! `symflow` walks the *exploded graph* of a procedure: every pair of a program point
//! (block, operation index) and an abstract [`ProgramState`](analysis::symbolic::ProgramState).
//! Each state maps operations and program symbols to [`SymbolicValue`](analysis::symbolic::SymbolicValue)s,
//! which carry a small set of constraints (null-ness, boolean truth, numeric zero-ness, lock
//! state). Pluggable [`SymbolicCheck`](analysis::symbolic::SymbolicCheck)s observe the walk and
//! raise diagnostics when a property is violated on some path.
//!
//! ## Features
//!
//! - **Immutable program states** backed by persistent maps, forked in O(1)
//! - **Canonical symbolic values** shared process-wide through a concurrent cache
//! - **Exception-aware exploration** through catch, filter and finally regions
//! - **Bounded exploration** with step and per-program-point visit budgets
//! - **Loop detection** and live-variable cleanup to help exploration converge
//! - **Parallel batch analysis** of many procedures with per-procedure isolation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use symflow::prelude::*;
//!
//! fn analyze(graph: &ControlFlowGraph, types: &TypeTable) -> symflow::Result<()> {
//!     let checks = SymbolicCheckList::new(Vec::new());
//!     let mut engine = SymbolicExecution::new(graph, types, checks, ExecutionConfig::default())?;
//!     let result = engine.execute();
//!     println!("{:?} after {} steps", result.outcome, result.statistics.steps);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`analysis::cfg`] - The control-flow graph model consumed by the engine, with a validating builder
//! - [`analysis::symbolic`] - Constraints, values, program states and the exploration engine
//! - [`utils`] - Bit sets and graph traversal traits shared by the analyses
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! Invalid graphs are rejected while building them, graphs too large for the program-point
//! encoding are rejected when the engine is created. Exhausting an exploration budget is not an
//! error; it is reported through [`ExecutionOutcome`](analysis::symbolic::ExecutionOutcome).
//!
//! ```rust,no_run
//! use symflow::prelude::*;
//!
//! fn run(graph: &ControlFlowGraph, types: &TypeTable) {
//!     match SymbolicExecution::new(graph, types, SymbolicCheckList::default(), ExecutionConfig::default()) {
//!         Ok(mut engine) => drop(engine.execute()),
//!         Err(Error::UnsupportedGraph { blocks, .. }) => println!("skipping, {blocks} blocks"),
//!         Err(e) => println!("Other error: {e}"),
//!     }
//! }
//! ```

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
pub mod prelude;

/// Control-flow graph model and symbolic execution.
pub mod analysis;

/// Shared data structures and graph abstractions.
pub mod utils;

pub use error::Error;

/// The result type used throughout `symflow`.
pub type Result<T> = std::result::Result<T, Error>;
