//! Operations whose value follows from the operation alone.

use crate::analysis::{
    cfg::{known, ConstantValue, OperationKind, OperationRef},
    symbolic::{Constraint, ProgramState, SymbolicContext, SymbolicValue},
};

pub(super) fn process(context: &SymbolicContext<'_>, operation: OperationRef<'_>) -> ProgramState {
    let state = context.state();
    let value = match operation.kind() {
        OperationKind::Literal(constant) => Some(literal_value(constant)),
        OperationKind::DefaultValue => default_value(context, operation),
        OperationKind::SizeOf => Some(SymbolicValue::from_constraint(Constraint::NOT_ZERO)),
        OperationKind::TypeOf
        | OperationKind::NameOf
        | OperationKind::InstanceReference
        | OperationKind::ObjectCreation { .. }
        | OperationKind::ArrayCreation { .. }
        | OperationKind::AnonymousObjectCreation { .. }
        | OperationKind::DelegateCreation { .. } => Some(SymbolicValue::not_null()),
        _ => None,
    };
    match value {
        Some(value) => state.set_operation_value(operation, Some(value)),
        None => state.clone(),
    }
}

fn literal_value(constant: &ConstantValue) -> SymbolicValue {
    match constant {
        ConstantValue::Null => SymbolicValue::null(),
        ConstantValue::Bool(value) => SymbolicValue::from_bool(*value),
        ConstantValue::Int(0) => SymbolicValue::from_constraint(Constraint::ZERO),
        ConstantValue::Int(_) => SymbolicValue::from_constraint(Constraint::NOT_ZERO),
        ConstantValue::String(_) | ConstantValue::Other => SymbolicValue::not_null(),
    }
}

/// `default(T)`: `null` for reference and nullable types, `false` for booleans, zero for
/// integral types. Other structs carry no constraint.
fn default_value(context: &SymbolicContext<'_>, operation: OperationRef<'_>) -> Option<SymbolicValue> {
    let semantic = context.semantic();
    let ty = operation.ty()?;
    if semantic.is_reference_type(ty) || semantic.is_nullable_value_type(ty) {
        Some(SymbolicValue::null())
    } else if semantic.is_type(ty, known::BOOLEAN) {
        Some(SymbolicValue::false_value())
    } else if semantic.is_integral(ty) {
        Some(SymbolicValue::from_constraint(Constraint::ZERO))
    } else {
        None
    }
}
