//! Conversions and `await`.

use crate::analysis::{
    cfg::{OperationKind, OperationRef},
    symbolic::{Constraint, ProgramState, SymbolicContext, SymbolicValue},
};

pub(super) fn process(context: &SymbolicContext<'_>, operation: OperationRef<'_>) -> ProgramState {
    let state = context.state();
    match operation.kind() {
        OperationKind::Conversion {
            operand,
            is_try_cast: false,
        } => {
            let value = state.value(operation.child(*operand)).cloned();
            state.set_operation_value(operation, value)
        }
        OperationKind::Conversion {
            operand,
            is_try_cast: true,
        } => {
            let operand = operation.child(*operand);
            let value = state.value(operand);
            let value = if value.is_some_and(|value| value.has_constraint(Constraint::NULL)) {
                Some(SymbolicValue::null())
            } else if always_succeeds(context, operand, operation) {
                value.cloned()
            } else {
                None
            };
            state.set_operation_value(operation, value)
        }
        // The awaited task may run arbitrary code, including code assigning fields.
        OperationKind::Await { .. } => {
            let graph = context.graph();
            state
                .reset_field_constraints(|symbol| graph.symbol(symbol).is_field())
                .set_operation_value(operation, None)
        }
        _ => state.clone(),
    }
}

fn always_succeeds(context: &SymbolicContext<'_>, operand: OperationRef<'_>, conversion: OperationRef<'_>) -> bool {
    match (operand.ty(), conversion.ty()) {
        (Some(source), Some(target)) => context.semantic().derives_or_implements(source, target),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{
            cfg::{known, Operation, Symbol, TypeShape, TypeTable},
            symbolic::OperationDispatcher,
        },
        test::GraphFactory,
    };

    #[test]
    fn test_try_cast() {
        let mut factory = GraphFactory::new();
        let mut types: TypeTable = factory.types().clone();
        let object = types.get(known::OBJECT).unwrap();
        let string = types.get(known::STRING).unwrap();
        let stream = types.define("System.IO.Stream", TypeShape::Class, Some(object));
        let o = factory.local("o");
        let s = factory.local("s");
        let widen_operand = factory.add(Operation::new(OperationKind::LocalReference(s)).with_type(string));
        let widen = factory.add(
            Operation::new(OperationKind::Conversion {
                operand: widen_operand,
                is_try_cast: true,
            })
            .with_type(object),
        );
        let narrow_operand = factory.add(Operation::new(OperationKind::LocalReference(o)).with_type(object));
        let narrow = factory.add(
            Operation::new(OperationKind::Conversion {
                operand: narrow_operand,
                is_try_cast: true,
            })
            .with_type(stream),
        );
        let graph = factory.linear_graph(vec![widen, narrow]);

        let state = ProgramState::empty()
            .set_symbol_value(s, Some(SymbolicValue::not_null()))
            .set_symbol_value(o, Some(SymbolicValue::not_null()));
        let process = |state: ProgramState, id| {
            let context = SymbolicContext::new(&graph, &types, Some(graph.operation(id)), state, 1, false);
            OperationDispatcher::process(&context).into_iter().next().unwrap()
        };

        let state = process(state, widen);
        assert_eq!(state.operation_value(widen), Some(&SymbolicValue::not_null()));
        let state = process(state, narrow);
        assert_eq!(state.operation_value(narrow), None);

        let null = ProgramState::empty().set_symbol_value(o, Some(SymbolicValue::null()));
        let state = process(null, narrow);
        assert_eq!(state.operation_value(narrow), Some(&SymbolicValue::null()));
    }

    #[test]
    fn test_await_resets_fields_but_keeps_locks() {
        let mut factory = GraphFactory::new();
        let owner = factory.object_type();
        let cache = factory.symbol(Symbol::field("cache", None, owner));
        let sync = factory.symbol(Symbol::field("sync", None, owner));
        let task = factory.operation(OperationKind::Other { children: Vec::new() });
        let awaited = factory.operation(OperationKind::Await { operation: task });
        let types = factory.types().clone();
        let graph = factory.linear_graph(vec![awaited]);

        let state = ProgramState::empty()
            .set_symbol_constraint(cache, Constraint::NOT_NULL)
            .set_symbol_constraint(sync, Constraint::HELD);
        let context = SymbolicContext::new(&graph, &types, Some(graph.operation(awaited)), state, 1, false);
        let state = OperationDispatcher::process(&context).into_iter().next().unwrap();

        assert!(!state.symbol_has_constraint(cache, Constraint::NOT_NULL));
        assert!(state.symbol_has_constraint(sync, Constraint::HELD));
    }
}
