//! Exception and lifetime regions.
//!
//! Regions form a tree rooted at a single [`RegionKind::Root`] region that spans every block.
//! Each region covers a contiguous range of block ordinals. Exception handling is expressed by
//! grouping regions:
//!
//! ```text
//! TryAndCatch                 TryAndFinally
//! ├── Try                     ├── Try
//! ├── Catch (IOException)     └── Finally
//! ├── FilterAndHandler
//! │   ├── Filter
//! │   └── Catch
//! └── Catch (catch-all)
//! ```

use crate::analysis::cfg::{CaptureId, TypeId};

/// Kind of a [`ControlFlowRegion`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RegionKind {
    /// The outermost region, spanning the whole procedure
    Root,
    /// Scope of locals; no control-flow meaning
    LocalLifetime,
    /// A protected `try` block
    Try,
    /// A `when` filter of a catch clause
    Filter,
    /// A catch handler
    Catch,
    /// Groups a [`RegionKind::Filter`] with its [`RegionKind::Catch`] handler
    FilterAndHandler,
    /// Groups a [`RegionKind::Try`] with its handlers
    TryAndCatch,
    /// A `finally` handler
    Finally,
    /// Groups a [`RegionKind::Try`] with its [`RegionKind::Finally`]
    TryAndFinally,
}

impl RegionKind {
    /// Returns `true` for regions entered only when an exception is raised.
    #[must_use]
    pub const fn is_handler(self) -> bool {
        matches!(
            self,
            RegionKind::Catch | RegionKind::Filter | RegionKind::FilterAndHandler
        )
    }
}

/// A region of the control-flow graph.
#[derive(Clone, PartialEq, Debug)]
pub struct ControlFlowRegion {
    /// Index of the region within the graph
    pub ordinal: usize,
    /// Region kind
    pub kind: RegionKind,
    /// Ordinal of the directly enclosing region, `None` for the root
    pub enclosing: Option<usize>,
    /// First block covered by the region
    pub first_block: usize,
    /// Last block covered by the region (inclusive)
    pub last_block: usize,
    /// Type caught by a [`RegionKind::Catch`] or filtered by a [`RegionKind::Filter`];
    /// `None` catches everything
    pub exception_type: Option<TypeId>,
    /// Ordinals of the directly nested regions, in block order
    pub nested: Vec<usize>,
    /// Flow captures whose values live only while control is inside the region
    pub capture_ids: Vec<CaptureId>,
}

impl ControlFlowRegion {
    /// Returns `true` if `block` lies within this region.
    #[must_use]
    pub fn contains(&self, block: usize) -> bool {
        self.first_block <= block && block <= self.last_block
    }
}
