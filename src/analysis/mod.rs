//! Program analyses.
//!
//! - [`cfg`] - The control-flow graph of one procedure: blocks, branches, exception regions
//!   and the operation trees inside each block
//! - [`symbolic`] - Path-sensitive symbolic execution over that graph
//!
//! The control-flow graph is produced by a front end outside this crate. It is handed to the
//! engine through [`cfg::ControlFlowGraphBuilder`], which validates it once so that the engine
//! can index into it without further checks.

pub mod cfg;
pub mod symbolic;
