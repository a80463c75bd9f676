//! Abstract semantics of operations.
//!
//! [`OperationDispatcher::process`] evaluates one operation in one state and returns the
//! successor states. Most operations have exactly one successor, where the operation's
//! value (and possibly the value of the symbol it writes) is updated. Boolean-producing
//! operations whose outcome is not determined yet fork: each successor carries one outcome
//! together with the facts that outcome implies, and outcomes contradicting what is already
//! known are discarded.
//!
//! # Processors
//!
//! - [`literal`] - Constants, `default`, `this` and object creation
//! - [`references`] - Member, array element and `Nullable<T>.HasValue` accesses
//! - [`assignment`] - Assignments, flow captures and caught exceptions
//! - [`conversion`] - Conversions and `await`
//! - [`binary`] - Binary and unary operators, including equality learning
//! - [`patterns`] - `IsNull`, `is T` and `is <pattern>`
//! - [`invocation`] - Method calls, including lock methods and assertions

mod assignment;
mod binary;
mod conversion;
mod invocation;
mod literal;
mod patterns;
mod references;

use log::trace;

use crate::analysis::{
    cfg::{OperationKind, OperationRef},
    symbolic::{Constraint, ProgramState, States, SymbolicContext, SymbolicValue},
};

/// Routes an operation to the processor implementing its semantics.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationDispatcher;

impl OperationDispatcher {
    /// Evaluates the context's operation in the context's state.
    ///
    /// Returns no state if the operation cannot complete in this state (for example a
    /// dereference of a value known to be `null`, or `Debug.Assert(false)`).
    #[must_use]
    pub fn process(context: &SymbolicContext<'_>) -> States<ProgramState> {
        let Some(operation) = context.operation() else {
            return States::One(context.state().clone());
        };
        match operation.kind() {
            OperationKind::Literal(_)
            | OperationKind::DefaultValue
            | OperationKind::TypeOf
            | OperationKind::NameOf
            | OperationKind::SizeOf
            | OperationKind::InstanceReference
            | OperationKind::ObjectCreation { .. }
            | OperationKind::ArrayCreation { .. }
            | OperationKind::AnonymousObjectCreation { .. }
            | OperationKind::DelegateCreation { .. } => States::One(literal::process(context, operation)),

            OperationKind::FieldReference { .. }
            | OperationKind::PropertyReference { .. }
            | OperationKind::EventReference { .. }
            | OperationKind::MethodReference { .. }
            | OperationKind::ArrayElementReference { .. } => references::process(context, operation),

            OperationKind::SimpleAssignment { .. }
            | OperationKind::CompoundAssignment { .. }
            | OperationKind::Increment { .. }
            | OperationKind::Decrement { .. }
            | OperationKind::FlowCapture { .. }
            | OperationKind::CaughtException => States::One(assignment::process(context, operation)),

            OperationKind::Conversion { .. } | OperationKind::Await { .. } => {
                States::One(conversion::process(context, operation))
            }

            OperationKind::Binary { .. } | OperationKind::Unary { .. } => binary::process(context, operation),

            OperationKind::IsNull { .. } | OperationKind::IsType { .. } | OperationKind::IsPattern { .. } => {
                patterns::process(context, operation)
            }

            OperationKind::Invocation { .. } => invocation::process(context, operation),

            // Reads resolve through the state: a local's value is the symbol's value and a
            // capture reference's value is the captured operation's value.
            OperationKind::LocalReference(_)
            | OperationKind::ParameterReference(_)
            | OperationKind::FlowCaptureReference { .. } => States::One(context.state().clone()),

            OperationKind::DynamicInvocation { .. }
            | OperationKind::DynamicMemberReference { .. }
            | OperationKind::DynamicIndexerAccess { .. }
            | OperationKind::DynamicObjectCreation { .. }
            | OperationKind::Other { .. } => {
                trace!("{}: no symbolic semantics", operation.id());
                States::One(context.state().clone())
            }
        }
    }
}

/// Adds `constraint` to `operation` and to what it denotes (the symbol it reads, and the
/// operation behind captures and conversions). Returns `None` if the constraint contradicts
/// what is already known.
pub(crate) fn learn(
    state: &ProgramState,
    operation: OperationRef<'_>,
    constraint: Constraint,
) -> Option<ProgramState> {
    let source = state.resolve_capture_and_unwrap_conversion(operation);
    let contradicts = |op: OperationRef<'_>| {
        state
            .value(op)
            .is_some_and(|value| value.contradicts(constraint))
    };
    if contradicts(operation) || contradicts(source) {
        return None;
    }
    let mut next = state.set_operation_and_symbol_constraint(operation, constraint);
    if source != operation {
        next = next.set_operation_and_symbol_constraint(source, constraint);
    }
    Some(next)
}

/// The successor states of a boolean-producing operation, one per feasible outcome.
#[derive(Debug)]
pub(crate) struct Outcomes {
    pub(crate) when_true: Option<ProgramState>,
    pub(crate) when_false: Option<ProgramState>,
}

impl Outcomes {
    /// Exactly one outcome is possible.
    pub(crate) fn certain(state: &ProgramState, value: bool) -> Self {
        if value {
            Self::fork(Some(state.clone()), None)
        } else {
            Self::fork(None, Some(state.clone()))
        }
    }

    /// Both outcomes are possible, and nothing is learned from either.
    pub(crate) fn unknown(state: &ProgramState) -> Self {
        Self::fork(Some(state.clone()), Some(state.clone()))
    }

    pub(crate) fn fork(when_true: Option<ProgramState>, when_false: Option<ProgramState>) -> Self {
        Self {
            when_true,
            when_false,
        }
    }

    /// Learns `constraint` about `tested` in the true outcome and its opposite in the false
    /// outcome, unless the value of `tested` already decides the outcome.
    pub(crate) fn test(state: &ProgramState, tested: OperationRef<'_>, constraint: Constraint) -> Self {
        match state.value(tested) {
            Some(value) if value.has_constraint(constraint) => Self::certain(state, true),
            Some(value) if value.contradicts(constraint) => Self::certain(state, false),
            _ => Self::fork(
                learn(state, tested, constraint),
                learn(state, tested, constraint.opposite()),
            ),
        }
    }

    /// Swaps the outcomes.
    pub(crate) fn negate(self) -> Self {
        Self::fork(self.when_false, self.when_true)
    }

    /// Applies `f` to the true outcome only.
    pub(crate) fn map_true(self, f: impl FnOnce(ProgramState) -> Option<ProgramState>) -> Self {
        Self::fork(self.when_true.and_then(f), self.when_false)
    }

    /// Stores each outcome as the value of `operation`.
    pub(crate) fn into_states(self, operation: OperationRef<'_>) -> States<ProgramState> {
        let mut states = States::Empty;
        if let Some(state) = self.when_true {
            states.push(state.set_operation_value(operation, Some(SymbolicValue::true_value())));
        }
        if let Some(state) = self.when_false {
            states.push(state.set_operation_value(operation, Some(SymbolicValue::false_value())));
        }
        states
    }
}

/// Returns `true` if `operation` cannot be `null` because of its static type.
pub(crate) fn is_non_nullable_value(context: &SymbolicContext<'_>, operation: OperationRef<'_>) -> bool {
    let semantic = context.semantic();
    operation
        .ty()
        .is_some_and(|ty| !semantic.is_reference_type(ty) && !semantic.is_nullable_value_type(ty))
}

/// Learns that a dereferenced instance is not `null`. Dereferencing `this` or a value type
/// teaches nothing; dereferencing a value known to be `null` has no normal successor.
pub(crate) fn learn_dereferenced(
    context: &SymbolicContext<'_>,
    state: &ProgramState,
    instance: OperationRef<'_>,
) -> Option<ProgramState> {
    if instance.is_instance_reference() || is_non_nullable_value(context, instance) {
        return Some(state.clone());
    }
    learn(state, instance, Constraint::NOT_NULL)
}
