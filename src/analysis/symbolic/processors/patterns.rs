//! Null tests, type tests and pattern matching.

use crate::analysis::{
    cfg::{OperationKind, OperationRef, Pattern, SymbolId, TypeId},
    symbolic::{
        processors::{binary::equality, is_non_nullable_value, learn, Outcomes},
        Constraint, ProgramState, States, SymbolicContext,
    },
};

pub(super) fn process(context: &SymbolicContext<'_>, operation: OperationRef<'_>) -> States<ProgramState> {
    let state = context.state();
    let outcomes = match operation.kind() {
        OperationKind::IsNull { operand } => Some(Outcomes::test(state, operation.child(*operand), Constraint::NULL)),
        OperationKind::IsType { operand, target_type } => {
            Some(type_test(context, state, operation.child(*operand), *target_type))
        }
        OperationKind::IsPattern { value, pattern } => matches(context, state, operation.child(*value), pattern),
        _ => None,
    };
    match outcomes {
        Some(outcomes) => outcomes.into_states(operation),
        None => States::One(state.set_operation_value(operation, None)),
    }
}

/// Outcomes of `value is pattern`, or `None` if nothing can be learned from the match.
fn matches(
    context: &SymbolicContext<'_>,
    state: &ProgramState,
    value: OperationRef<'_>,
    pattern: &Pattern,
) -> Option<Outcomes> {
    match pattern {
        Pattern::Constant(constant) => equality(context, state, value, value.child(*constant)),
        Pattern::Type(ty) => Some(type_test(context, state, value, *ty)),
        Pattern::Declaration { ty: None, symbol } => {
            // `var x` always matches, `null` included.
            let matched = match symbol {
                Some(symbol) => state.set_symbol_value(*symbol, state.value(value).cloned()),
                None => state.clone(),
            };
            Some(Outcomes::certain(&matched, true))
        }
        Pattern::Declaration { ty: Some(ty), symbol } => Some(
            type_test(context, state, value, *ty).map_true(|state| Some(declare(&state, value, *symbol))),
        ),
        Pattern::Not(pattern) => matches(context, state, value, pattern).map(Outcomes::negate),
        Pattern::Discard => Some(Outcomes::certain(state, true)),
    }
}

/// `operand is T`: `null` never matches; a non-null operand whose static type converts to `T`
/// always matches. Otherwise only the true outcome learns something.
fn type_test(context: &SymbolicContext<'_>, state: &ProgramState, operand: OperationRef<'_>, target: TypeId) -> Outcomes {
    if state.has_constraint(operand, Constraint::NULL) {
        return Outcomes::certain(state, false);
    }
    let converts = operand
        .ty()
        .is_some_and(|source| context.semantic().derives_or_implements(source, target));
    if converts && is_non_nullable_value(context, operand) {
        Outcomes::certain(state, true)
    } else if converts {
        Outcomes::test(state, operand, Constraint::NOT_NULL)
    } else {
        Outcomes::fork(learn(state, operand, Constraint::NOT_NULL), Some(state.clone()))
    }
}

/// The designation of a typed pattern receives the matched, hence non-null, value.
fn declare(state: &ProgramState, value: OperationRef<'_>, symbol: Option<SymbolId>) -> ProgramState {
    let Some(symbol) = symbol else {
        return state.clone();
    };
    let matched = state
        .value(value)
        .cloned()
        .unwrap_or_default()
        .with_constraint(Constraint::NOT_NULL);
    state.set_symbol_value(symbol, Some(matched))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{
            cfg::{known, ConstantValue, Operation, TypeShape},
            symbolic::{OperationDispatcher, SymbolicValue},
        },
        test::GraphFactory,
    };

    #[test]
    fn test_is_null_forks() {
        let mut factory = GraphFactory::new();
        let types = factory.types().clone();
        let p = factory.parameter("p");
        let read = factory.operation(OperationKind::ParameterReference(p));
        let is_null = factory.operation(OperationKind::IsNull { operand: read });
        let graph = factory.linear_graph(vec![is_null]);

        let context = SymbolicContext::new(&graph, &types, Some(graph.operation(is_null)), ProgramState::empty(), 1, false);
        let states: Vec<_> = OperationDispatcher::process(&context).into_iter().collect();
        assert_eq!(states.len(), 2);
        assert!(states[0].symbol_has_constraint(p, Constraint::NULL));
        assert!(states[1].symbol_has_constraint(p, Constraint::NOT_NULL));
    }

    #[test]
    fn test_type_pattern_declares_not_null_symbol() {
        let mut factory = GraphFactory::new();
        let mut types = factory.types().clone();
        let object = types.get(known::OBJECT).unwrap();
        let stream = types.define("System.IO.Stream", TypeShape::Class, Some(object));
        let o = factory.parameter("o");
        let s = factory.local("s");
        let read = factory.add(Operation::new(OperationKind::ParameterReference(o)).with_type(object));
        let test = factory.operation(OperationKind::IsPattern {
            value: read,
            pattern: Pattern::Declaration {
                ty: Some(stream),
                symbol: Some(s),
            },
        });
        let graph = factory.linear_graph(vec![test]);
        let op = graph.operation(test);

        let context = SymbolicContext::new(&graph, &types, Some(op), ProgramState::empty(), 1, false);
        let states: Vec<_> = OperationDispatcher::process(&context).into_iter().collect();
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].value(op), Some(&SymbolicValue::true_value()));
        assert!(states[0].symbol_has_constraint(s, Constraint::NOT_NULL));
        assert!(states[0].symbol_has_constraint(o, Constraint::NOT_NULL));
        assert_eq!(states[1].value(op), Some(&SymbolicValue::false_value()));
        assert!(states[1].symbol_value(o).is_none());

        let null = context.with_state(ProgramState::empty().set_symbol_value(o, Some(SymbolicValue::null())));
        let states: Vec<_> = OperationDispatcher::process(&null).into_iter().collect();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].value(op), Some(&SymbolicValue::false_value()));
    }

    #[test]
    fn test_not_null_constant_pattern() {
        let mut factory = GraphFactory::new();
        let types = factory.types().clone();
        let x = factory.local("x");
        let read = factory.operation(OperationKind::LocalReference(x));
        let null = factory.operation(OperationKind::Literal(ConstantValue::Null));
        let test = factory.operation(OperationKind::IsPattern {
            value: read,
            pattern: Pattern::Not(Box::new(Pattern::Constant(null))),
        });
        let graph = factory.linear_graph(vec![test]);

        let state = ProgramState::empty().set_operation_value(graph.operation(null), Some(SymbolicValue::null()));
        let context = SymbolicContext::new(&graph, &types, Some(graph.operation(test)), state, 1, false);
        let states: Vec<_> = OperationDispatcher::process(&context).into_iter().collect();
        assert_eq!(states.len(), 2);
        assert!(states[0].symbol_has_constraint(x, Constraint::NOT_NULL));
        assert!(states[1].symbol_has_constraint(x, Constraint::NULL));
    }
}
