//! Constraints: atomic facts attached to symbolic values.
//!
//! Every constraint belongs to exactly one [`ConstraintKind`], and a value carries at most one
//! constraint per kind. Each constraint has an opposite within its kind, which is what branch
//! learning uses to detect contradictions: learning `Null` about a value already known to be
//! `NotNull` means the branch is infeasible.

use std::fmt;

use strum::{EnumCount, EnumIter};

/// The family a constraint belongs to. A value holds at most one constraint of each kind.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, EnumCount, EnumIter)]
pub enum ConstraintKind {
    /// Null-ness of references
    Object,
    /// Truth of booleans
    Bool,
    /// Whether a synchronization object is held
    Lock,
    /// Whether an integral value is zero
    Number,
}

impl ConstraintKind {
    /// Slot of this kind in a value's constraint array.
    #[must_use]
    pub(crate) const fn slot(self) -> usize {
        self as usize
    }
}

/// Null-ness of a reference.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ObjectConstraint {
    /// The value is `null`
    Null,
    /// The value is not `null`
    NotNull,
}

/// Truth of a boolean.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum BoolConstraint {
    /// `true`
    True,
    /// `false`
    False,
}

impl BoolConstraint {
    /// Converts a Rust boolean.
    #[must_use]
    pub const fn from_bool(value: bool) -> Self {
        if value {
            BoolConstraint::True
        } else {
            BoolConstraint::False
        }
    }

    /// Returns `true` for [`BoolConstraint::True`].
    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, BoolConstraint::True)
    }
}

/// State of a synchronization object.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum LockConstraint {
    /// The lock is held by the current thread
    Held,
    /// The lock is not held
    NotHeld,
}

/// Zero-ness of an integral value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum NumberConstraint {
    /// The value is `0`
    Zero,
    /// The value is not `0`
    NotZero,
}

/// A fact about a symbolic value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Constraint {
    /// Null-ness
    Object(ObjectConstraint),
    /// Boolean truth
    Bool(BoolConstraint),
    /// Lock state
    Lock(LockConstraint),
    /// Zero-ness
    Number(NumberConstraint),
}

impl Constraint {
    /// The value is `null`.
    pub const NULL: Constraint = Constraint::Object(ObjectConstraint::Null);
    /// The value is not `null`.
    pub const NOT_NULL: Constraint = Constraint::Object(ObjectConstraint::NotNull);
    /// The value is `true`.
    pub const TRUE: Constraint = Constraint::Bool(BoolConstraint::True);
    /// The value is `false`.
    pub const FALSE: Constraint = Constraint::Bool(BoolConstraint::False);
    /// The lock is held.
    pub const HELD: Constraint = Constraint::Lock(LockConstraint::Held);
    /// The lock is not held.
    pub const NOT_HELD: Constraint = Constraint::Lock(LockConstraint::NotHeld);
    /// The value is zero.
    pub const ZERO: Constraint = Constraint::Number(NumberConstraint::Zero);
    /// The value is not zero.
    pub const NOT_ZERO: Constraint = Constraint::Number(NumberConstraint::NotZero);

    /// Returns the boolean constraint for `value`.
    #[must_use]
    pub const fn from_bool(value: bool) -> Self {
        Constraint::Bool(BoolConstraint::from_bool(value))
    }

    /// Returns the kind of this constraint.
    #[must_use]
    pub const fn kind(self) -> ConstraintKind {
        match self {
            Constraint::Object(_) => ConstraintKind::Object,
            Constraint::Bool(_) => ConstraintKind::Bool,
            Constraint::Lock(_) => ConstraintKind::Lock,
            Constraint::Number(_) => ConstraintKind::Number,
        }
    }

    /// Returns the negation of this constraint within its kind.
    #[must_use]
    pub const fn opposite(self) -> Constraint {
        match self {
            Constraint::Object(ObjectConstraint::Null) => Self::NOT_NULL,
            Constraint::Object(ObjectConstraint::NotNull) => Self::NULL,
            Constraint::Bool(BoolConstraint::True) => Self::FALSE,
            Constraint::Bool(BoolConstraint::False) => Self::TRUE,
            Constraint::Lock(LockConstraint::Held) => Self::NOT_HELD,
            Constraint::Lock(LockConstraint::NotHeld) => Self::HELD,
            Constraint::Number(NumberConstraint::Zero) => Self::NOT_ZERO,
            Constraint::Number(NumberConstraint::NotZero) => Self::ZERO,
        }
    }

    /// Returns `true` if the constraint survives
    /// [`ProgramState::reset_field_constraints`](crate::analysis::symbolic::ProgramState::reset_field_constraints).
    ///
    /// Calls to unknown code may reassign fields, so facts about fields are dropped after
    /// them. Lock state is the exception: whoever holds a lock keeps holding it.
    #[must_use]
    pub const fn preserve_on_field_reset(self) -> bool {
        matches!(self, Constraint::Lock(_))
    }

    /// Returns `true` if this constraint can only hold for non-null values.
    #[must_use]
    pub(crate) const fn implies_not_null(self) -> bool {
        !matches!(self, Constraint::Object(_))
    }
}

impl From<ObjectConstraint> for Constraint {
    fn from(value: ObjectConstraint) -> Self {
        Constraint::Object(value)
    }
}

impl From<BoolConstraint> for Constraint {
    fn from(value: BoolConstraint) -> Self {
        Constraint::Bool(value)
    }
}

impl From<LockConstraint> for Constraint {
    fn from(value: LockConstraint) -> Self {
        Constraint::Lock(value)
    }
}

impl From<NumberConstraint> for Constraint {
    fn from(value: NumberConstraint) -> Self {
        Constraint::Number(value)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Constraint::Object(ObjectConstraint::Null) => "Null",
            Constraint::Object(ObjectConstraint::NotNull) => "NotNull",
            Constraint::Bool(BoolConstraint::True) => "True",
            Constraint::Bool(BoolConstraint::False) => "False",
            Constraint::Lock(LockConstraint::Held) => "LockHeld",
            Constraint::Lock(LockConstraint::NotHeld) => "LockReleased",
            Constraint::Number(NumberConstraint::Zero) => "Zero",
            Constraint::Number(NumberConstraint::NotZero) => "NotZero",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Constraint; 8] = [
        Constraint::NULL,
        Constraint::NOT_NULL,
        Constraint::TRUE,
        Constraint::FALSE,
        Constraint::HELD,
        Constraint::NOT_HELD,
        Constraint::ZERO,
        Constraint::NOT_ZERO,
    ];

    #[test]
    fn test_opposite_is_an_involution_within_the_kind() {
        for constraint in ALL {
            let opposite = constraint.opposite();
            assert_ne!(opposite, constraint);
            assert_eq!(opposite.kind(), constraint.kind());
            assert_eq!(opposite.opposite(), constraint);
        }
    }

    #[test]
    fn test_only_lock_state_survives_field_reset() {
        let preserved: Vec<_> = ALL
            .into_iter()
            .filter(|c| c.preserve_on_field_reset())
            .collect();
        assert_eq!(preserved, vec![Constraint::HELD, Constraint::NOT_HELD]);
    }

    #[test]
    fn test_kind_slots_are_dense() {
        use strum::IntoEnumIterator;
        let slots: Vec<_> = ConstraintKind::iter().map(ConstraintKind::slot).collect();
        assert_eq!(slots, (0..ConstraintKind::COUNT).collect::<Vec<_>>());
    }
}
