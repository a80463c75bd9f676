//! Symbolic values.
//!
//! A [`SymbolicValue`] is an immutable bag of at most one [`Constraint`] per
//! [`ConstraintKind`]. Values are compared and hashed constantly while the engine decides
//! whether two exploded nodes are equal, so the common shapes (no constraint, one constraint,
//! two constraints) are canonicalized through a process-wide cache: equal small values share
//! one allocation and compare by pointer.
//!
//! Two invariants hold for every value, whatever sequence of operations produced it:
//!
//! - a `Bool`, `Lock` or `Number` constraint implies `NotNull`
//! - `Null` excludes every other constraint
//!
//! # Thread Safety
//!
//! Values are `Send + Sync`. The cache is a [`DashMap`] shared by all engines running in the
//! process, and is never cleared.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{Arc, OnceLock},
};

use dashmap::DashMap;
use strum::EnumCount;

use crate::analysis::symbolic::{
    BoolConstraint, Constraint, ConstraintKind, LockConstraint, NumberConstraint,
    ObjectConstraint,
};

type Slots = [Option<Constraint>; ConstraintKind::COUNT];

/// Normalized key of a value with at most two constraints, lower kind first.
type CacheKey = (Option<Constraint>, Option<Constraint>);

fn cache() -> &'static DashMap<CacheKey, SymbolicValue> {
    static CACHE: OnceLock<DashMap<CacheKey, SymbolicValue>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

/// An abstract value: the set of facts known about a runtime value.
#[derive(Clone)]
pub struct SymbolicValue(Arc<Slots>);

impl SymbolicValue {
    fn from_slots(slots: Slots) -> Self {
        let mut present = slots.iter().flatten().copied();
        let first = present.next();
        let second = present.next();
        if present.next().is_some() {
            return SymbolicValue(Arc::new(slots));
        }

        let key = (first, second);
        if let Some(cached) = cache().get(&key) {
            return cached.clone();
        }
        cache()
            .entry(key)
            .or_insert_with(|| SymbolicValue(Arc::new(slots)))
            .clone()
    }

    /// The value nothing is known about.
    #[must_use]
    pub fn constraintless() -> Self {
        Self::from_slots([None; ConstraintKind::COUNT])
    }

    /// A value known to be `null`.
    #[must_use]
    pub fn null() -> Self {
        Self::constraintless().with_constraint(Constraint::NULL)
    }

    /// A value known not to be `null`.
    #[must_use]
    pub fn not_null() -> Self {
        Self::constraintless().with_constraint(Constraint::NOT_NULL)
    }

    /// The boolean `true`.
    #[must_use]
    pub fn true_value() -> Self {
        Self::constraintless().with_constraint(Constraint::TRUE)
    }

    /// The boolean `false`.
    #[must_use]
    pub fn false_value() -> Self {
        Self::constraintless().with_constraint(Constraint::FALSE)
    }

    /// The boolean `value`.
    #[must_use]
    pub fn from_bool(value: bool) -> Self {
        Self::constraintless().with_constraint(Constraint::from_bool(value))
    }

    /// A value carrying exactly `constraint` (plus `NotNull` where implied).
    #[must_use]
    pub fn from_constraint(constraint: Constraint) -> Self {
        Self::constraintless().with_constraint(constraint)
    }

    /// Returns a value with `constraint` added, replacing any constraint of the same kind.
    ///
    /// Adding `Null` drops every other constraint; adding a `Bool`, `Lock` or `Number`
    /// constraint replaces `Null` with `NotNull`.
    #[must_use]
    pub fn with_constraint(&self, constraint: Constraint) -> Self {
        if self.has_constraint(constraint) {
            return self.clone();
        }

        let mut slots = *self.0;
        if constraint == Constraint::NULL {
            slots = [None; ConstraintKind::COUNT];
        } else if constraint.implies_not_null() {
            slots[ConstraintKind::Object.slot()] = Some(Constraint::NOT_NULL);
        }
        slots[constraint.kind().slot()] = Some(constraint);
        Self::from_slots(slots)
    }

    /// Returns a value without `constraint`. Values not carrying it are returned unchanged.
    #[must_use]
    pub fn without_constraint(&self, constraint: Constraint) -> Self {
        if self.has_constraint(constraint) {
            self.without_kind(constraint.kind())
        } else {
            self.clone()
        }
    }

    /// Returns a value without any constraint of `kind`.
    ///
    /// Removing the `Object` kind also removes the constraints that imply `NotNull`.
    #[must_use]
    pub fn without_kind(&self, kind: ConstraintKind) -> Self {
        if self.0[kind.slot()].is_none() {
            return self.clone();
        }
        let slots = if kind == ConstraintKind::Object {
            [None; ConstraintKind::COUNT]
        } else {
            let mut slots = *self.0;
            slots[kind.slot()] = None;
            slots
        };
        Self::from_slots(slots)
    }

    /// Returns the value left after a field reset: only constraints that are
    /// [preserved](Constraint::preserve_on_field_reset) remain, with `NotNull` kept if one of
    /// them implies it.
    #[must_use]
    pub fn retain_preserved_on_field_reset(&self) -> Self {
        let mut slots = [None; ConstraintKind::COUNT];
        for constraint in self.constraints() {
            if constraint.preserve_on_field_reset() {
                slots[constraint.kind().slot()] = Some(constraint);
                if constraint.implies_not_null() {
                    slots[ConstraintKind::Object.slot()] = Some(Constraint::NOT_NULL);
                }
            }
        }
        if slots == *self.0 {
            return self.clone();
        }
        Self::from_slots(slots)
    }

    /// Returns `true` if the value carries `constraint`.
    #[must_use]
    pub fn has_constraint(&self, constraint: Constraint) -> bool {
        self.0[constraint.kind().slot()] == Some(constraint)
    }

    /// Returns the constraint of `kind`, if any.
    #[must_use]
    pub fn constraint(&self, kind: ConstraintKind) -> Option<Constraint> {
        self.0[kind.slot()]
    }

    /// Returns `true` if `constraint` contradicts what the value already carries.
    #[must_use]
    pub fn contradicts(&self, constraint: Constraint) -> bool {
        if self.constraint(constraint.kind()) == Some(constraint.opposite()) {
            return true;
        }
        constraint.implies_not_null() && self.has_constraint(Constraint::NULL)
    }

    /// Iterates over the constraints, ordered by kind.
    pub fn constraints(&self) -> impl Iterator<Item = Constraint> + '_ {
        self.0.iter().flatten().copied()
    }

    /// Returns `true` if nothing is known about the value.
    #[must_use]
    pub fn is_constraintless(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// Returns the null-ness constraint.
    #[must_use]
    pub fn object(&self) -> Option<ObjectConstraint> {
        match self.constraint(ConstraintKind::Object) {
            Some(Constraint::Object(c)) => Some(c),
            _ => None,
        }
    }

    /// Returns the boolean constraint.
    #[must_use]
    pub fn boolean(&self) -> Option<BoolConstraint> {
        match self.constraint(ConstraintKind::Bool) {
            Some(Constraint::Bool(c)) => Some(c),
            _ => None,
        }
    }

    /// Returns the lock constraint.
    #[must_use]
    pub fn lock(&self) -> Option<LockConstraint> {
        match self.constraint(ConstraintKind::Lock) {
            Some(Constraint::Lock(c)) => Some(c),
            _ => None,
        }
    }

    /// Returns the zero-ness constraint.
    #[must_use]
    pub fn number(&self) -> Option<NumberConstraint> {
        match self.constraint(ConstraintKind::Number) {
            Some(Constraint::Number(c)) => Some(c),
            _ => None,
        }
    }

    /// Returns `true` if both values share one allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for SymbolicValue {
    fn default() -> Self {
        Self::constraintless()
    }
}

impl PartialEq for SymbolicValue {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0 == *other.0
    }
}

impl Eq for SymbolicValue {}

impl Hash for SymbolicValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Display for SymbolicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_constraintless() {
            return f.write_str("No constraints");
        }
        let mut first = true;
        for constraint in self.constraints() {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{constraint}")?;
            first = false;
        }
        Ok(())
    }
}

impl fmt::Debug for SymbolicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolicValue({self})")
    }
}
