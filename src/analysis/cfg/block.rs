//! Basic blocks and the branches leaving them.

use crate::analysis::cfg::OperationId;

/// Role of a block in the graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BlockKind {
    /// The unique entry block; holds no operations
    Entry,
    /// The unique exit block; holds no operations and has no successors
    Exit,
    /// Any other block
    Block,
}

/// When the conditional successor of a block is taken.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum ConditionKind {
    /// The block has no conditional successor
    #[default]
    None,
    /// Taken when the branch value is `false`
    WhenFalse,
    /// Taken when the branch value is `true`
    WhenTrue,
}

/// What a branch does when it is taken.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum BranchSemantics {
    /// No branch (the exit block)
    #[default]
    None,
    /// A regular jump to the destination
    Regular,
    /// A `return`, targeting the exit block; the branch value is the returned value
    Return,
    /// End of a `finally` or filter region; control continues wherever the handler was
    /// entered from
    StructuredExceptionHandling,
    /// Process termination (for example `Environment.FailFast`)
    ProgramTermination,
    /// `throw x`; the branch value is the thrown exception
    Throw,
    /// `throw;` inside a catch handler
    Rethrow,
    /// Unreachable code after a compile error
    Error,
}

/// A branch from one block to another.
///
/// The region lists are computed by the builder from the region tree: a branch leaving a
/// `try` with a `finally` has to run the `finally` before reaching its destination.
#[derive(Clone, PartialEq, Debug)]
pub struct ControlFlowBranch {
    /// The block the branch leaves
    pub source: usize,
    /// The destination block, `None` for throws and handler exits
    pub destination: Option<usize>,
    /// What the branch does
    pub semantics: BranchSemantics,
    /// `true` for the conditional successor
    pub is_conditional: bool,
    /// Regions entered by the branch, outermost first
    pub entering_regions: Vec<usize>,
    /// Regions left by the branch, innermost first
    pub leaving_regions: Vec<usize>,
    /// `finally` regions run before reaching the destination, innermost first
    pub finally_regions: Vec<usize>,
}

/// A basic block.
#[derive(Clone, PartialEq, Debug)]
pub struct BasicBlock {
    /// Index of the block within the graph
    pub ordinal: usize,
    /// Role of the block
    pub kind: BlockKind,
    /// Root operations, in source order
    pub operations: Vec<OperationId>,
    /// The condition, returned value or thrown exception evaluated at the end of the block
    pub branch_value: Option<OperationId>,
    /// When the conditional successor is taken
    pub condition_kind: ConditionKind,
    /// Successor taken depending on the branch value
    pub conditional_successor: Option<ControlFlowBranch>,
    /// Successor taken otherwise
    pub fall_through_successor: Option<ControlFlowBranch>,
    /// Ordinal of the innermost region containing the block
    pub enclosing_region: usize,
}

impl BasicBlock {
    /// Returns the semantics of the fall-through successor.
    #[must_use]
    pub fn fall_through_semantics(&self) -> BranchSemantics {
        self.fall_through_successor
            .as_ref()
            .map_or(BranchSemantics::None, |branch| branch.semantics)
    }

    /// Returns both successors, the conditional one first.
    pub fn successors(&self) -> impl Iterator<Item = &ControlFlowBranch> {
        self.conditional_successor
            .iter()
            .chain(self.fall_through_successor.iter())
    }
}
