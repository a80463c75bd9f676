//! Writes: assignments, flow captures and the exception object of a catch handler.

use crate::analysis::{
    cfg::{OperationKind, OperationRef},
    symbolic::{ProgramState, SymbolicContext, SymbolicValue},
};

pub(super) fn process(context: &SymbolicContext<'_>, operation: OperationRef<'_>) -> ProgramState {
    let state = context.state();
    match operation.kind() {
        OperationKind::SimpleAssignment { target, value } => {
            let value = state.value(operation.child(*value)).cloned();
            state
                .set_operation_and_symbol_value(operation.child(*target), value.clone())
                .set_operation_value(operation, value)
        }
        // The new value of the target is not tracked.
        OperationKind::CompoundAssignment { target, .. }
        | OperationKind::Increment { target }
        | OperationKind::Decrement { target } => state
            .set_operation_and_symbol_value(operation.child(*target), None)
            .set_operation_value(operation, None),
        OperationKind::FlowCapture { id, value } => state.set_capture(*id, *value),
        OperationKind::CaughtException => state.set_operation_value(operation, Some(SymbolicValue::not_null())),
        _ => state.clone(),
    }
}
