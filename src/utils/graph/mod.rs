//! Graph abstractions.
//!
//! The control-flow analyses (loop detection, live variables) are written against the small
//! trait set in [`traits`] rather than against the concrete graph type, so that the
//! exception-aware view of a control-flow graph can be traversed like any other graph.

mod node;
mod traits;

pub use node::NodeId;
pub use traits::{GraphBase, RootedGraph, Successors};
