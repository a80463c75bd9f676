//! Shared utilities for the analyses.
//!
//! - [`BitSet`] - compact sets of small integers, used for block and symbol sets
//! - [`graph`] - node identifiers and the traversal traits the analyses are written against

mod bitset;
pub mod graph;

pub use bitset::{BitSet, BitSetIter};
