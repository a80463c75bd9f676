//! Pending `finally` regions.
//!
//! A branch that leaves one or more `try` regions with a `finally` runs those `finally`
//! regions, innermost first, before reaching its destination. An exception unwinding through
//! a `try` with a `finally` runs the `finally` and then keeps unwinding. A [`FinallyPoint`]
//! records which of these is in progress, so that the end of a `finally` region knows where
//! to continue. An unwinding point also remembers its exception: code inside the `finally`
//! may raise and handle exceptions of its own, and the pending one resumes afterwards.
//!
//! Finally points are immutable and linked through [`Arc`]: entering a nested `try` inside a
//! `finally` pushes a new point whose `previous` is the outer one.

use std::{
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::analysis::symbolic::ExceptionState;

/// A position in a chain of `finally` regions to be executed.
#[derive(Clone, Debug)]
pub struct FinallyPoint {
    previous: Option<Arc<FinallyPoint>>,
    finally_regions: Arc<[usize]>,
    index: usize,
    destination: Option<usize>,
    exception: Option<ExceptionState>,
}

impl FinallyPoint {
    /// Starts running `finally_regions` (innermost first) on the way to `destination`.
    ///
    /// Returns `None` if `finally_regions` is empty.
    #[must_use]
    pub fn new(
        previous: Option<Arc<FinallyPoint>>,
        finally_regions: Arc<[usize]>,
        destination: usize,
    ) -> Option<Self> {
        (!finally_regions.is_empty()).then(|| Self {
            previous,
            finally_regions,
            index: 0,
            destination: Some(destination),
            exception: None,
        })
    }

    /// Starts running a single `finally` region entered by an unwinding `exception`. After
    /// the `finally` the engine continues searching for a handler of `exception`.
    #[must_use]
    pub fn for_exception(
        previous: Option<Arc<FinallyPoint>>,
        finally_region: usize,
        exception: ExceptionState,
    ) -> Self {
        Self {
            previous,
            finally_regions: Arc::from([finally_region]),
            index: 0,
            destination: None,
            exception: Some(exception),
        }
    }

    /// Returns the ordinal of the `finally` region currently executing.
    #[must_use]
    pub fn region(&self) -> usize {
        self.finally_regions[self.index]
    }

    /// Returns the block reached after the last `finally`, `None` while unwinding.
    #[must_use]
    pub fn destination(&self) -> Option<usize> {
        self.destination
    }

    /// Returns `true` while an exception is unwinding through this point.
    #[must_use]
    pub fn is_unwinding(&self) -> bool {
        self.exception.is_some()
    }

    /// Returns the exception that resumes unwinding after the `finally`.
    #[must_use]
    pub fn exception(&self) -> Option<ExceptionState> {
        self.exception
    }

    /// Returns the enclosing point, restored once this chain completes.
    #[must_use]
    pub fn previous(&self) -> Option<&Arc<FinallyPoint>> {
        self.previous.as_ref()
    }

    /// Returns `true` if another `finally` region follows the current one.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.index + 1 < self.finally_regions.len()
    }

    /// Advances to the next `finally` region, or `None` at the end of the chain.
    #[must_use]
    pub fn create_next(&self) -> Option<Self> {
        self.has_next().then(|| Self {
            previous: self.previous.clone(),
            finally_regions: Arc::clone(&self.finally_regions),
            index: self.index + 1,
            destination: self.destination,
            exception: self.exception,
        })
    }

    /// The current and all following `finally` regions.
    fn remaining(&self) -> &[usize] {
        &self.finally_regions[self.index..]
    }

    /// Iterates over this point and its predecessors.
    pub fn chain(&self) -> impl Iterator<Item = &FinallyPoint> {
        std::iter::successors(Some(self), |point| point.previous.as_deref())
    }
}

impl PartialEq for FinallyPoint {
    fn eq(&self, other: &Self) -> bool {
        let mut left = self.chain();
        let mut right = other.chain();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some(a), Some(b)) => {
                    if std::ptr::eq(a, b) {
                        return true;
                    }
                    if a.remaining() != b.remaining()
                        || a.destination != b.destination
                        || a.exception != b.exception
                    {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }
}

impl Eq for FinallyPoint {}

impl Hash for FinallyPoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for point in self.chain() {
            point.remaining().hash(state);
            point.destination.hash(state);
            point.exception.hash(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_advances_innermost_first() {
        let point = FinallyPoint::new(None, Arc::from([4, 2]), 9).unwrap();
        assert_eq!(point.region(), 4);
        assert!(point.has_next());

        let next = point.create_next().unwrap();
        assert_eq!(next.region(), 2);
        assert_eq!(next.destination(), Some(9));
        assert!(!next.has_next());
        assert!(next.create_next().is_none());
    }

    #[test]
    fn test_equality_compares_whole_chain() {
        let outer_a = Arc::new(FinallyPoint::for_exception(None, 1, ExceptionState::Unknown));
        let outer_b = Arc::new(FinallyPoint::for_exception(None, 1, ExceptionState::Unknown));
        let outer_c = Arc::new(FinallyPoint::new(None, Arc::from([1]), 5).unwrap());

        let a = FinallyPoint::new(Some(outer_a), Arc::from([3]), 7).unwrap();
        let b = FinallyPoint::new(Some(outer_b), Arc::from([3]), 7).unwrap();
        let c = FinallyPoint::new(Some(outer_c), Arc::from([3]), 7).unwrap();
        let d = FinallyPoint::new(None, Arc::from([3]), 7).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_ne!(d, a);

        let hash = |point: &FinallyPoint| {
            use std::collections::hash_map::DefaultHasher;
            let mut hasher = DefaultHasher::new();
            point.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash(&a), hash(&b));
    }

    #[test]
    fn test_equality_compares_pending_regions() {
        let advanced = FinallyPoint::new(None, Arc::from([2, 6]), 8).unwrap()
            .create_next()
            .unwrap();
        let direct = FinallyPoint::new(None, Arc::from([6]), 8).unwrap();
        let longer = FinallyPoint::new(None, Arc::from([6, 7]), 8).unwrap();
        assert_eq!(advanced, direct);
        assert_ne!(direct, longer);
        assert!(!direct.is_unwinding());
    }

    #[test]
    fn test_empty_chain_is_rejected() {
        assert!(FinallyPoint::new(None, Arc::from([]), 3).is_none());
    }

    #[test]
    fn test_unwinding_point_remembers_exception() {
        let types = crate::analysis::cfg::TypeTable::with_core_types();
        let invalid_operation =
            ExceptionState::named(&types, crate::analysis::cfg::known::INVALID_OPERATION_EXCEPTION);
        let unwinding = FinallyPoint::for_exception(None, 2, invalid_operation);
        let unknown = FinallyPoint::for_exception(None, 2, ExceptionState::Unknown);

        assert!(unwinding.is_unwinding());
        assert_eq!(unwinding.exception(), Some(invalid_operation));
        assert_eq!(unwinding.destination(), None);
        assert_ne!(unwinding, unknown);
        assert!(unwinding.create_next().is_none());
    }
}
