//! Exceptions in flight along a path.

use std::fmt;

use crate::analysis::cfg::{SemanticModel, TypeId};

/// An exception in flight.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ExceptionState {
    /// Some exception of a type the analysis cannot know, typically thrown by a call
    Unknown,
    /// An exception of the given type
    Known(TypeId),
}

impl ExceptionState {
    /// Resolves a well-known exception type, degrading to [`ExceptionState::Unknown`] when the
    /// semantic model does not know the name.
    #[must_use]
    pub fn named(semantic: &dyn SemanticModel, name: &str) -> Self {
        semantic
            .type_by_name(name)
            .map_or(ExceptionState::Unknown, ExceptionState::Known)
    }

    /// Returns the exception type, if known.
    #[must_use]
    pub const fn type_id(self) -> Option<TypeId> {
        match self {
            ExceptionState::Unknown => None,
            ExceptionState::Known(ty) => Some(ty),
        }
    }

    /// Returns `true` for [`ExceptionState::Unknown`].
    #[must_use]
    pub const fn is_unknown(self) -> bool {
        matches!(self, ExceptionState::Unknown)
    }
}

impl fmt::Display for ExceptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExceptionState::Unknown => f.write_str("Unknown"),
            ExceptionState::Known(ty) => write!(f, "{ty:?}"),
        }
    }
}
