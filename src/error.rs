use thiserror::Error;

macro_rules! invalid_graph {
    // Single string version
    ($msg:expr) => {
        crate::Error::InvalidGraph {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::InvalidGraph {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which covers all errors this library can return.
///
/// Only caller mistakes and unsupported inputs are errors. Running out of an exploration
/// budget is a normal outcome of symbolic execution and is reported through
/// [`ExecutionOutcome`](crate::analysis::symbolic::ExecutionOutcome) instead.
///
/// # Error Categories
///
/// - [`Error::InvalidGraph`] - The control-flow graph handed to the builder is inconsistent
/// - [`Error::UnsupportedGraph`] - The graph has more blocks than a program point can encode
/// - [`Error::TooManyOperations`] - A block has more operations than a program point can encode
/// - [`Error::AnalysisPanicked`] - Exploring one procedure of a batch panicked
///
/// # Examples
///
/// ```rust
/// use symflow::analysis::cfg::{BlockKind, ControlFlowGraphBuilder};
/// use symflow::Error;
///
/// let mut builder = ControlFlowGraphBuilder::new("Empty");
/// builder.add_block(BlockKind::Entry);
///
/// match builder.build() {
///     Ok(_) => println!("graph accepted"),
///     Err(Error::InvalidGraph { message, file, line }) => {
///         eprintln!("Invalid graph: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The control-flow graph is inconsistent and cannot be explored.
    ///
    /// Raised by [`ControlFlowGraphBuilder::build`](crate::analysis::cfg::ControlFlowGraphBuilder::build)
    /// for dangling block, operation, symbol or region references, a missing entry or exit
    /// block, or regions that do not nest. The error records the source location where the
    /// inconsistency was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the inconsistency
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Invalid graph - {file}:{line}: {message}")]
    InvalidGraph {
        /// The message to be printed for the InvalidGraph error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The graph has more blocks than the program-point encoding supports.
    ///
    /// Callers should skip symbolic execution for this procedure rather than analyze a
    /// truncated graph.
    #[error("Control-flow graph has {blocks} blocks, at most {max} are supported")]
    UnsupportedGraph {
        /// Number of blocks in the rejected graph
        blocks: usize,
        /// Largest supported number of blocks
        max: usize,
    },

    /// A single block has more operations than the program-point encoding supports.
    #[error("Block {block} has {operations} operations, at most {max} are supported")]
    TooManyOperations {
        /// Ordinal of the offending block
        block: usize,
        /// Number of operations in execution order
        operations: usize,
        /// Largest supported number of operations per block
        max: usize,
    },

    /// Exploring a procedure panicked.
    ///
    /// Only produced by the batch runner, which isolates every procedure so that one failure
    /// never blocks the analysis of the others.
    #[error("Analysis of '{procedure}' panicked: {message}")]
    AnalysisPanicked {
        /// Name of the procedure whose exploration panicked
        procedure: String,
        /// The panic payload, if it was a string
        message: String,
    },
}
