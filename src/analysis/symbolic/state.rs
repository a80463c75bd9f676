//! Immutable program states.
//!
//! A [`ProgramState`] is one snapshot of everything the engine knows at a program point:
//!
//! - the value of every evaluated operation of the current statement
//! - the value of every tracked program symbol (locals, parameters, fields of `this`, statics)
//! - the operation held by every live flow capture
//! - the symbols exempt from bulk removal
//! - the exceptions in flight, innermost last
//! - how many times each program point was visited on the way here
//!
//! All fields are [`imbl`] persistent collections, so deriving a new state from an existing one
//! shares structure and costs O(1) to clone. Every mutator returns a new state; no state is
//! ever changed after it was created.
//!
//! # Identity
//!
//! Two states are equal if everything but the visit counts is equal. Visit counts are
//! bookkeeping for exploration budgets and would otherwise prevent states from different
//! iterations of a loop from ever merging. Maps and sets hash independently of their
//! iteration order; the exception stack hashes in order. The hash is computed at most once
//! per state.

use std::{
    collections::{hash_map::DefaultHasher, HashSet},
    fmt,
    hash::{Hash, Hasher},
    sync::OnceLock,
};

use imbl::{HashMap as ImHashMap, HashSet as ImHashSet, Vector};

use crate::analysis::{
    cfg::{CaptureId, ControlFlowGraph, OperationId, OperationKind, OperationRef, SymbolId, TypeId},
    symbolic::{Constraint, ConstraintKind, ExceptionState, SymbolicValue},
};

/// An immutable snapshot of the abstract program state.
#[derive(Clone, Default)]
pub struct ProgramState {
    /// Values of the operations evaluated since the last statement boundary.
    operation_values: ImHashMap<OperationId, SymbolicValue>,
    /// Values of tracked program symbols.
    symbol_values: ImHashMap<SymbolId, SymbolicValue>,
    /// Operation whose value each flow capture holds.
    captures: ImHashMap<CaptureId, OperationId>,
    /// Symbols [`ProgramState::remove_symbols`] never removes.
    preserved_symbols: ImHashSet<SymbolId>,
    /// Visit counts keyed by program-point hash; excluded from equality.
    visit_counts: ImHashMap<u32, u32>,
    /// Exceptions in flight, innermost last.
    exceptions: Vector<ExceptionState>,
    /// Lazily computed structural hash.
    hash: OnceLock<u64>,
}

impl ProgramState {
    /// The state at the entry of a procedure: nothing known, nothing in flight.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Clones the state for modification. The cached hash is dropped since `f` may change
    /// semantic content.
    fn derive(&self, f: impl FnOnce(&mut Self)) -> Self {
        let mut next = Self {
            hash: OnceLock::new(),
            ..self.clone()
        };
        f(&mut next);
        next
    }

    // ---------------------------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------------------------

    /// Returns the value of an operation.
    ///
    /// Flow-capture references are resolved first. Operations without a value of their own
    /// fall back to the value of the symbol they denote, so reading a local gives the local's
    /// value without the processors copying it around.
    #[must_use]
    pub fn value(&self, operation: OperationRef<'_>) -> Option<&SymbolicValue> {
        let operation = self.resolve_capture(operation);
        self.operation_values.get(&operation.id()).or_else(|| {
            operation
                .tracked_symbol()
                .and_then(|symbol| self.symbol_values.get(&symbol))
        })
    }

    /// Returns the value stored for exactly this operation, without capture resolution or
    /// symbol fallback.
    #[must_use]
    pub fn operation_value(&self, operation: OperationId) -> Option<&SymbolicValue> {
        self.operation_values.get(&operation)
    }

    /// Returns the value of a symbol.
    #[must_use]
    pub fn symbol_value(&self, symbol: SymbolId) -> Option<&SymbolicValue> {
        self.symbol_values.get(&symbol)
    }

    /// Returns the constraint of `kind` on the value of an operation.
    #[must_use]
    pub fn constraint(&self, operation: OperationRef<'_>, kind: ConstraintKind) -> Option<Constraint> {
        self.value(operation).and_then(|value| value.constraint(kind))
    }

    /// Returns `true` if the value of an operation carries `constraint`.
    #[must_use]
    pub fn has_constraint(&self, operation: OperationRef<'_>, constraint: Constraint) -> bool {
        self.value(operation)
            .is_some_and(|value| value.has_constraint(constraint))
    }

    /// Returns `true` if the value of a symbol carries `constraint`.
    #[must_use]
    pub fn symbol_has_constraint(&self, symbol: SymbolId, constraint: Constraint) -> bool {
        self.symbol_value(symbol)
            .is_some_and(|value| value.has_constraint(constraint))
    }

    /// Iterates over all symbol values, in no particular order.
    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &SymbolicValue)> {
        self.symbol_values.iter().map(|(symbol, value)| (*symbol, value))
    }

    /// Iterates over all operation values, in no particular order.
    pub fn operations(&self) -> impl Iterator<Item = (OperationId, &SymbolicValue)> {
        self.operation_values.iter().map(|(operation, value)| (*operation, value))
    }

    /// Returns `true` if `symbol` is exempt from [`ProgramState::remove_symbols`].
    #[must_use]
    pub fn is_preserved(&self, symbol: SymbolId) -> bool {
        self.preserved_symbols.contains(&symbol)
    }

    // ---------------------------------------------------------------------------------------
    // Values
    // ---------------------------------------------------------------------------------------

    /// Sets the value of an operation; `None` forgets it.
    #[must_use]
    pub fn set_operation_value(&self, operation: OperationRef<'_>, value: Option<SymbolicValue>) -> Self {
        let id = self.resolve_capture(operation).id();
        match value {
            Some(value) if self.operation_values.get(&id) == Some(&value) => self.clone(),
            Some(value) => self.derive(|state| {
                state.operation_values.insert(id, value);
            }),
            None if !self.operation_values.contains_key(&id) => self.clone(),
            None => self.derive(|state| {
                state.operation_values.remove(&id);
            }),
        }
    }

    /// Sets the value of an operation and, if it denotes a tracked symbol, of that symbol.
    #[must_use]
    pub fn set_operation_and_symbol_value(
        &self,
        operation: OperationRef<'_>,
        value: Option<SymbolicValue>,
    ) -> Self {
        let resolved = self.resolve_capture(operation);
        let state = self.set_operation_value(resolved, value.clone());
        match resolved.tracked_symbol() {
            Some(symbol) => state.set_symbol_value(symbol, value),
            None => state,
        }
    }

    /// Sets the value of a symbol; `None` forgets it.
    #[must_use]
    pub fn set_symbol_value(&self, symbol: SymbolId, value: Option<SymbolicValue>) -> Self {
        match value {
            Some(value) if self.symbol_values.get(&symbol) == Some(&value) => self.clone(),
            Some(value) => self.derive(|state| {
                state.symbol_values.insert(symbol, value);
            }),
            None if !self.symbol_values.contains_key(&symbol) => self.clone(),
            None => self.derive(|state| {
                state.symbol_values.remove(&symbol);
            }),
        }
    }

    /// Adds `constraint` to the value of an operation.
    #[must_use]
    pub fn set_operation_constraint(&self, operation: OperationRef<'_>, constraint: Constraint) -> Self {
        let value = self.value(operation).cloned().unwrap_or_default();
        self.set_operation_value(operation, Some(value.with_constraint(constraint)))
    }

    /// Adds `constraint` to the value of a symbol.
    #[must_use]
    pub fn set_symbol_constraint(&self, symbol: SymbolId, constraint: Constraint) -> Self {
        let value = self.symbol_value(symbol).cloned().unwrap_or_default();
        self.set_symbol_value(symbol, Some(value.with_constraint(constraint)))
    }

    /// Adds `constraint` to the value of an operation and of the symbol it denotes.
    #[must_use]
    pub fn set_operation_and_symbol_constraint(
        &self,
        operation: OperationRef<'_>,
        constraint: Constraint,
    ) -> Self {
        let resolved = self.resolve_capture(operation);
        let state = self.set_operation_constraint(resolved, constraint);
        match resolved.tracked_symbol() {
            Some(symbol) => state.set_symbol_constraint(symbol, constraint),
            None => state,
        }
    }

    // ---------------------------------------------------------------------------------------
    // Flow captures
    // ---------------------------------------------------------------------------------------

    /// Records that `capture` holds the value of `operation`.
    #[must_use]
    pub fn set_capture(&self, capture: CaptureId, operation: OperationId) -> Self {
        if self.captures.get(&capture) == Some(&operation) {
            return self.clone();
        }
        self.derive(|state| {
            state.captures.insert(capture, operation);
        })
    }

    /// Releases `capture`. The captured operation's value goes with the next
    /// [`ProgramState::reset_operations`].
    #[must_use]
    pub fn remove_capture(&self, capture: CaptureId) -> Self {
        if !self.captures.contains_key(&capture) {
            return self.clone();
        }
        self.derive(|state| {
            state.captures.remove(&capture);
        })
    }

    /// Returns the operation a capture holds.
    #[must_use]
    pub fn captured_operation(&self, capture: CaptureId) -> Option<OperationId> {
        self.captures.get(&capture).copied()
    }

    /// Resolves one level of flow capture: a capture reference becomes the captured operation,
    /// anything else is returned unchanged.
    #[must_use]
    pub fn resolve_capture<'g>(&self, operation: OperationRef<'g>) -> OperationRef<'g> {
        match operation.kind() {
            OperationKind::FlowCaptureReference { id } => self
                .captures
                .get(id)
                .map_or(operation, |&captured| operation.child(captured)),
            _ => operation,
        }
    }

    /// Follows flow captures and conversions until reaching an operation that is neither.
    ///
    /// Capture chains are bounded by the number of operations in the graph, so a malformed
    /// self-referencing capture ends the walk instead of looping.
    #[must_use]
    pub fn resolve_capture_and_unwrap_conversion<'g>(&self, operation: OperationRef<'g>) -> OperationRef<'g> {
        let mut current = operation;
        for _ in 0..=operation.graph().operation_count() {
            let next = match current.kind() {
                OperationKind::FlowCaptureReference { .. } => self.resolve_capture(current),
                OperationKind::Conversion { operand, .. } => current.child(*operand),
                _ => return current,
            };
            if next == current {
                return current;
            }
            current = next;
        }
        current
    }

    /// Forgets every operation value except those still held by a flow capture.
    ///
    /// Called at statement boundaries so that the operation map does not grow along a path.
    #[must_use]
    pub fn reset_operations(&self) -> Self {
        if self.operation_values.is_empty() {
            return self.clone();
        }
        let captured: HashSet<OperationId> = self.captures.values().copied().collect();
        if self
            .operation_values
            .keys()
            .all(|operation| captured.contains(operation))
        {
            return self.clone();
        }
        self.derive(|state| {
            state
                .operation_values
                .retain(|operation, _| captured.contains(operation));
        })
    }

    // ---------------------------------------------------------------------------------------
    // Symbols
    // ---------------------------------------------------------------------------------------

    /// Exempts `symbol` from [`ProgramState::remove_symbols`].
    #[must_use]
    pub fn preserve_symbol(&self, symbol: SymbolId) -> Self {
        if self.preserved_symbols.contains(&symbol) {
            return self.clone();
        }
        self.derive(|state| {
            state.preserved_symbols.insert(symbol);
        })
    }

    /// Forgets the values of all symbols matching `predicate`, except preserved ones.
    #[must_use]
    pub fn remove_symbols(&self, predicate: impl Fn(SymbolId) -> bool) -> Self {
        let removable = |symbol: &SymbolId| predicate(*symbol) && !self.preserved_symbols.contains(symbol);
        if !self.symbol_values.keys().any(removable) {
            return self.clone();
        }
        let preserved = self.preserved_symbols.clone();
        self.derive(|state| {
            state
                .symbol_values
                .retain(|symbol, _| preserved.contains(symbol) || !predicate(*symbol));
        })
    }

    /// Drops every constraint that is not
    /// [preserved on field reset](Constraint::preserve_on_field_reset) from the symbols
    /// matching `predicate`.
    ///
    /// Used after calls that may reassign fields. The caller decides which symbols are fields
    /// the call can reach.
    #[must_use]
    pub fn reset_field_constraints(&self, predicate: impl Fn(SymbolId) -> bool) -> Self {
        let changed: Vec<(SymbolId, SymbolicValue)> = self
            .symbol_values
            .iter()
            .filter(|(symbol, _)| predicate(**symbol))
            .filter_map(|(symbol, value)| {
                let reset = value.retain_preserved_on_field_reset();
                (reset != *value).then_some((*symbol, reset))
            })
            .collect();
        if changed.is_empty() {
            return self.clone();
        }
        self.derive(|state| {
            for (symbol, value) in changed {
                state.symbol_values.insert(symbol, value);
            }
        })
    }

    /// Resets the constraints of the static fields declared in `containing_type`.
    #[must_use]
    pub fn reset_static_field_constraints(&self, graph: &ControlFlowGraph, containing_type: TypeId) -> Self {
        self.reset_field_constraints(|symbol| {
            let symbol = graph.symbol(symbol);
            symbol.is_field() && symbol.is_static() && symbol.containing_type == Some(containing_type)
        })
    }

    // ---------------------------------------------------------------------------------------
    // Exceptions
    // ---------------------------------------------------------------------------------------

    /// Replaces the innermost exception, or pushes one if none is in flight.
    #[must_use]
    pub fn set_exception(&self, exception: ExceptionState) -> Self {
        if self.exceptions.back() == Some(&exception) {
            return self.clone();
        }
        self.derive(|state| {
            state.exceptions.pop_back();
            state.exceptions.push_back(exception);
        })
    }

    /// Pushes a nested exception.
    #[must_use]
    pub fn push_exception(&self, exception: ExceptionState) -> Self {
        self.derive(|state| state.exceptions.push_back(exception))
    }

    /// Pops the innermost exception. Popping an empty stack returns the state unchanged.
    #[must_use]
    pub fn pop_exception(&self) -> Self {
        if self.exceptions.is_empty() {
            return self.clone();
        }
        self.derive(|state| {
            state.exceptions.pop_back();
        })
    }

    /// Returns the innermost exception in flight.
    #[must_use]
    pub fn exception(&self) -> Option<ExceptionState> {
        self.exceptions.back().copied()
    }

    /// Iterates over the exceptions in flight, outermost first.
    pub fn exceptions(&self) -> impl Iterator<Item = ExceptionState> + '_ {
        self.exceptions.iter().copied()
    }

    // ---------------------------------------------------------------------------------------
    // Visits
    // ---------------------------------------------------------------------------------------

    /// Records one more visit of a program point. Does not affect equality.
    #[must_use]
    pub fn add_visit(&self, program_point: u32) -> Self {
        let mut next = self.clone();
        let count = next.visit_count(program_point) + 1;
        next.visit_counts.insert(program_point, count);
        next
    }

    /// Returns how often a program point was visited on the way to this state.
    #[must_use]
    pub fn visit_count(&self, program_point: u32) -> u32 {
        self.visit_counts.get(&program_point).copied().unwrap_or(0)
    }

    fn structural_hash(&self) -> u64 {
        *self.hash.get_or_init(|| {
            let mut hasher = DefaultHasher::new();
            unordered_hash(self.operation_values.iter()).hash(&mut hasher);
            unordered_hash(self.symbol_values.iter()).hash(&mut hasher);
            unordered_hash(self.captures.iter()).hash(&mut hasher);
            unordered_hash(self.preserved_symbols.iter()).hash(&mut hasher);
            for exception in &self.exceptions {
                exception.hash(&mut hasher);
            }
            self.exceptions.len().hash(&mut hasher);
            hasher.finish()
        })
    }
}

fn unordered_hash<T: Hash>(items: impl Iterator<Item = T>) -> u64 {
    items.fold(0u64, |acc, item| {
        let mut hasher = DefaultHasher::new();
        item.hash(&mut hasher);
        acc.wrapping_add(hasher.finish())
    })
}

impl PartialEq for ProgramState {
    fn eq(&self, other: &Self) -> bool {
        self.structural_hash() == other.structural_hash()
            && self.exceptions == other.exceptions
            && self.operation_values == other.operation_values
            && self.symbol_values == other.symbol_values
            && self.captures == other.captures
            && self.preserved_symbols == other.preserved_symbols
    }
}

impl Eq for ProgramState {}

impl Hash for ProgramState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.structural_hash());
    }
}

impl fmt::Display for ProgramState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.exceptions.is_empty() {
            writeln!(f, "Exceptions:")?;
            for exception in self.exceptions.iter().rev() {
                writeln!(f, "  {exception}")?;
            }
        }
        if !self.symbol_values.is_empty() {
            writeln!(f, "Symbols:")?;
            let mut symbols: Vec<_> = self.symbol_values.iter().collect();
            symbols.sort_by_key(|(symbol, _)| **symbol);
            for (symbol, value) in symbols {
                writeln!(f, "  {symbol}: {value}")?;
            }
        }
        if !self.operation_values.is_empty() {
            writeln!(f, "Operations:")?;
            let mut operations: Vec<_> = self.operation_values.iter().collect();
            operations.sort_by_key(|(operation, _)| **operation);
            for (operation, value) in operations {
                writeln!(f, "  {operation}: {value}")?;
            }
        }
        if !self.captures.is_empty() {
            writeln!(f, "Captures:")?;
            let mut captures: Vec<_> = self.captures.iter().collect();
            captures.sort_by_key(|(capture, _)| **capture);
            for (capture, operation) in captures {
                writeln!(f, "  {capture}: {operation}")?;
            }
        }
        if self.exceptions.is_empty() && self.symbol_values.is_empty() && self.operation_values.is_empty() {
            writeln!(f, "Empty")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ProgramState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
