//! Detection of blocks that take part in a cycle.
//!
//! The engine uses this to tell loop cut-offs from other visit-budget cut-offs and to flag
//! loop conditions for checks. Only membership matters here, so the detector does not build
//! a loop forest. It runs a depth-first search that keeps the current path: an edge back to
//! a block on the path closes a cycle made of the path suffix starting at that block.
//!
//! A depth-first search visits each block once, so a cycle reached through an
//! already-finished block would be missed. To cover it, an edge to a finished block that
//! belongs to a known cycle also adds the current path, from the first block that belongs
//! to that cycle, to the cycle.
//!
//! Successors are exception-aware: a block inside a `try` may continue in any of its
//! handlers, so a `catch` that jumps back to the loop header forms a cycle as well.

use crate::utils::{
    graph::{NodeId, RootedGraph},
    BitSet,
};

/// Blocks of a graph that belong to at least one cycle.
#[derive(Clone, Debug)]
pub struct LoopDetector {
    in_loop: BitSet,
    loop_count: usize,
}

struct Frame {
    node: NodeId,
    successors: Vec<NodeId>,
    next: usize,
}

impl LoopDetector {
    /// Runs the detection over every block reachable from the entry of `graph`.
    #[must_use]
    pub fn new<G: RootedGraph>(graph: &G) -> Self {
        let count = graph.node_count();
        let mut loops: Vec<BitSet> = Vec::new();
        let mut visited = BitSet::new(count);
        let mut on_path = BitSet::new(count);
        let mut path: Vec<NodeId> = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();

        let entry = graph.entry();
        if entry.index() < count {
            visited.insert(entry.index());
            on_path.insert(entry.index());
            path.push(entry);
            stack.push(Frame {
                node: entry,
                successors: graph.successors(entry).collect(),
                next: 0,
            });
        }

        while let Some(frame) = stack.last_mut() {
            let Some(&successor) = frame.successors.get(frame.next) else {
                on_path.remove(frame.node.index());
                path.pop();
                stack.pop();
                continue;
            };
            frame.next += 1;

            if on_path.contains(successor.index()) {
                let mut cycle = BitSet::new(count);
                let start = path.iter().rposition(|&node| node == successor).unwrap_or(0);
                for node in &path[start..] {
                    cycle.insert(node.index());
                }
                loops.push(cycle);
            } else if visited.contains(successor.index()) {
                for cycle in loops
                    .iter_mut()
                    .filter(|cycle| cycle.contains(successor.index()) && cycle.intersects(&on_path))
                {
                    if let Some(start) = path.iter().position(|node| cycle.contains(node.index())) {
                        for node in &path[start..] {
                            cycle.insert(node.index());
                        }
                    }
                }
            } else {
                visited.insert(successor.index());
                on_path.insert(successor.index());
                path.push(successor);
                stack.push(Frame {
                    node: successor,
                    successors: graph.successors(successor).collect(),
                    next: 0,
                });
            }
        }

        let mut in_loop = BitSet::new(count);
        for cycle in &loops {
            in_loop.union_with(cycle);
        }
        Self {
            in_loop,
            loop_count: loops.len(),
        }
    }

    /// Returns `true` if `block` belongs to a cycle.
    #[must_use]
    pub fn is_in_loop(&self, block: usize) -> bool {
        self.in_loop.contains(block)
    }

    /// Returns the set of blocks belonging to a cycle.
    #[must_use]
    pub fn loop_blocks(&self) -> &BitSet {
        &self.in_loop
    }

    /// Returns the number of back edges found, counting each closing edge once.
    #[must_use]
    pub fn back_edge_count(&self) -> usize {
        self.loop_count
    }
}
