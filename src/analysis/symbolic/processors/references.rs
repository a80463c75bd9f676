//! Member and array element accesses.
//!
//! Reaching the successor of an access means the receiver was not `null`. Fields of `this`
//! and static fields are tracked symbols, so reading them needs no work here: their value is
//! the symbol's value.

use crate::analysis::{
    cfg::{known, OperationKind, OperationRef},
    symbolic::{
        processors::{learn_dereferenced, Outcomes},
        Constraint, ProgramState, States, SymbolicContext,
    },
};

pub(super) fn process(context: &SymbolicContext<'_>, operation: OperationRef<'_>) -> States<ProgramState> {
    let state = context.state();
    match operation.kind() {
        OperationKind::PropertyReference {
            property,
            instance: Some(instance),
            ..
        } if is_has_value(context, *property) => {
            let instance = operation.child(*instance);
            Outcomes::test(state, instance, Constraint::NOT_NULL).into_states(operation)
        }
        OperationKind::FieldReference {
            instance: Some(instance),
            ..
        }
        | OperationKind::PropertyReference {
            instance: Some(instance),
            ..
        }
        | OperationKind::EventReference {
            instance: Some(instance),
            ..
        }
        | OperationKind::MethodReference {
            instance: Some(instance),
            ..
        } => learn_dereferenced(context, state, operation.child(*instance)).into_iter().collect(),
        OperationKind::ArrayElementReference { array, .. } => {
            learn_dereferenced(context, state, operation.child(*array)).into_iter().collect()
        }
        _ => States::One(state.clone()),
    }
}

/// `Nullable<T>.HasValue`
fn is_has_value(context: &SymbolicContext<'_>, property: crate::analysis::cfg::SymbolId) -> bool {
    let symbol = context.graph().symbol(property);
    symbol.name == "HasValue"
        && symbol
            .containing_type
            .is_some_and(|ty| context.semantic().is_type(ty, known::NULLABLE))
}
