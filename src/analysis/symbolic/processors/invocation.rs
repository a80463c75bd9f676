//! Method calls.
//!
//! A call returns normally only if its receiver was not `null`. Calls to unknown code may
//! reassign fields: instance fields when the receiver is `this` (or the call is static), and
//! the static fields of the called method's type in every case. Lock state survives those
//! resets, and lock objects passed to lock methods are kept alive in the state so that the
//! lock state reaches the exit.

use crate::analysis::{
    cfg::{OperationKind, OperationRef, SymbolId},
    symbolic::{
        processors::{learn, learn_dereferenced, Outcomes},
        Constraint, KnownMethod, ProgramState, States, SymbolicContext,
    },
};

pub(super) fn process(context: &SymbolicContext<'_>, operation: OperationRef<'_>) -> States<ProgramState> {
    let OperationKind::Invocation {
        method,
        instance,
        arguments,
    } = operation.kind()
    else {
        return States::One(context.state().clone());
    };
    let instance = instance.map(|instance| operation.child(instance));
    let state = match instance {
        Some(instance) => learn_dereferenced(context, context.state(), instance),
        None => Some(context.state().clone()),
    };
    let Some(state) = state else {
        return States::Empty;
    };
    let argument = |index: usize| arguments.get(index).map(|&argument| operation.child(argument));

    match KnownMethod::classify(context.graph(), context.semantic(), *method) {
        KnownMethod::MonitorEnter => set_lock(&state, argument(0), Constraint::HELD, operation),
        KnownMethod::MonitorExit => set_lock(&state, argument(0), Constraint::NOT_HELD, operation),
        KnownMethod::LockAcquire => set_lock(&state, instance, Constraint::HELD, operation),
        KnownMethod::LockRelease => set_lock(&state, instance, Constraint::NOT_HELD, operation),
        KnownMethod::MonitorIsEntered => States::One(state.set_operation_value(operation, None)),
        KnownMethod::DebugAssert => {
            let asserted = match argument(0) {
                Some(condition) => learn(&state, condition, Constraint::TRUE),
                None => Some(state),
            };
            asserted
                .map(|state| state.set_operation_value(operation, None))
                .into_iter()
                .collect()
        }
        KnownMethod::StringIsNullOrEmpty => match argument(0) {
            Some(text) if state.has_constraint(text, Constraint::NULL) => {
                Outcomes::certain(&state, true).into_states(operation)
            }
            // An empty string is not null, so only the false outcome learns something.
            Some(text) => {
                Outcomes::fork(Some(state.clone()), learn(&state, text, Constraint::NOT_NULL)).into_states(operation)
            }
            None => Outcomes::unknown(&state).into_states(operation),
        },
        KnownMethod::Other => {
            States::One(reset_fields(context, &state, *method, instance).set_operation_value(operation, None))
        }
    }
}

fn set_lock(
    state: &ProgramState,
    lock: Option<OperationRef<'_>>,
    constraint: Constraint,
    operation: OperationRef<'_>,
) -> States<ProgramState> {
    let state = match lock {
        Some(lock) => {
            let lock = state.resolve_capture_and_unwrap_conversion(lock);
            let next = state.set_operation_and_symbol_constraint(lock, constraint);
            match lock.tracked_symbol() {
                Some(symbol) => next.preserve_symbol(symbol),
                None => next,
            }
        }
        None => state.clone(),
    };
    States::One(state.set_operation_value(operation, None))
}

fn reset_fields(
    context: &SymbolicContext<'_>,
    state: &ProgramState,
    method: SymbolId,
    instance: Option<OperationRef<'_>>,
) -> ProgramState {
    let graph = context.graph();
    let on_this = instance.map_or(true, |instance| instance.is_instance_reference());
    let state = if on_this {
        state.reset_field_constraints(|symbol| {
            let symbol = graph.symbol(symbol);
            symbol.is_field() && !symbol.is_static()
        })
    } else {
        state.clone()
    };
    match graph.symbol(method).containing_type {
        Some(ty) => state.reset_static_field_constraints(graph, ty),
        None => state,
    }
}
