//! Binary and unary operators.
//!
//! Equality against a constant is the main source of learned facts: `x == null`, `b == true`
//! and `n == 0` fork into one state per outcome, each knowing the corresponding fact about
//! the other operand. Boolean operators combine known truth values, and integral division
//! teaches that the divisor was not zero.

use crate::analysis::{
    cfg::{BinaryOperator, OperationKind, OperationRef, UnaryOperator},
    symbolic::{
        processors::{learn, Outcomes},
        BoolConstraint, Constraint, ConstraintKind, ProgramState, States, SymbolicContext, SymbolicValue,
    },
};

pub(super) fn process(context: &SymbolicContext<'_>, operation: OperationRef<'_>) -> States<ProgramState> {
    match operation.kind() {
        OperationKind::Binary { operator, left, right } => {
            binary(context, operation, *operator, operation.child(*left), operation.child(*right))
        }
        OperationKind::Unary { operator, operand } => unary(context, operation, *operator, operation.child(*operand)),
        _ => States::One(context.state().clone()),
    }
}

fn binary(
    context: &SymbolicContext<'_>,
    operation: OperationRef<'_>,
    operator: BinaryOperator,
    left: OperationRef<'_>,
    right: OperationRef<'_>,
) -> States<ProgramState> {
    let state = context.state();
    match operator {
        BinaryOperator::Equals | BinaryOperator::NotEquals => {
            let Some(outcomes) =
                equality(context, state, left, right).or_else(|| equality(context, state, right, left))
            else {
                return States::One(state.set_operation_value(operation, None));
            };
            let outcomes = if operator == BinaryOperator::NotEquals {
                outcomes.negate()
            } else {
                outcomes
            };
            outcomes.into_states(operation)
        }
        BinaryOperator::And
        | BinaryOperator::Or
        | BinaryOperator::ExclusiveOr
        | BinaryOperator::ConditionalAnd
        | BinaryOperator::ConditionalOr => {
            let left = state.value(left).and_then(SymbolicValue::boolean);
            let right = state.value(right).and_then(SymbolicValue::boolean);
            let value = logical(operator, left, right).map(SymbolicValue::from_bool);
            States::One(state.set_operation_value(operation, value))
        }
        operator if operator.is_division() && is_integral(context, right) => {
            // The normal successor of an integral division exists only for a non-zero divisor.
            learn(state, right, Constraint::NOT_ZERO)
                .map(|state| state.set_operation_value(operation, None))
                .into_iter()
                .collect()
        }
        _ => States::One(state.set_operation_value(operation, None)),
    }
}

/// Compares `tested` against `constant` if the latter's value is a single known constant.
///
/// A `Nullable<T>` operand that is `null` compares unequal to every non-null constant, so the
/// false outcome of `b == true` or `n == 0` learns nothing about such an operand.
pub(super) fn equality(
    context: &SymbolicContext<'_>,
    state: &ProgramState,
    tested: OperationRef<'_>,
    constant: OperationRef<'_>,
) -> Option<Outcomes> {
    let value = state.value(constant)?;
    let expected = if value.has_constraint(Constraint::NULL) {
        Constraint::NULL
    } else if let Some(boolean) = value.boolean() {
        Constraint::Bool(boolean)
    } else if value.has_constraint(Constraint::ZERO) {
        Constraint::ZERO
    } else {
        return None;
    };
    let outcomes = Outcomes::test(state, tested, expected);
    if expected != Constraint::NULL && is_nullable_value(context, state, tested) {
        return Some(Outcomes::fork(outcomes.when_true, outcomes.when_false.map(|_| state.clone())));
    }
    Some(outcomes)
}

fn is_nullable_value(context: &SymbolicContext<'_>, state: &ProgramState, operand: OperationRef<'_>) -> bool {
    let semantic = context.semantic();
    [operand, state.resolve_capture_and_unwrap_conversion(operand)]
        .iter()
        .filter_map(|operand| operand.ty())
        .any(|ty| semantic.is_nullable_value_type(ty))
}

fn logical(operator: BinaryOperator, left: Option<BoolConstraint>, right: Option<BoolConstraint>) -> Option<bool> {
    let left = left.map(BoolConstraint::is_true);
    let right = right.map(BoolConstraint::is_true);
    match operator {
        BinaryOperator::And | BinaryOperator::ConditionalAnd => match (left, right) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        BinaryOperator::Or | BinaryOperator::ConditionalOr => match (left, right) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
        BinaryOperator::ExclusiveOr => Some(left? != right?),
        _ => None,
    }
}

fn unary(
    context: &SymbolicContext<'_>,
    operation: OperationRef<'_>,
    operator: UnaryOperator,
    operand: OperationRef<'_>,
) -> States<ProgramState> {
    let state = context.state();
    match operator {
        UnaryOperator::Not => match state.value(operand).and_then(SymbolicValue::boolean) {
            Some(boolean) => {
                States::One(state.set_operation_value(operation, Some(SymbolicValue::from_bool(!boolean.is_true()))))
            }
            // `!flag` on a tracked flag: each outcome knows the flag's value.
            None if state.resolve_capture_and_unwrap_conversion(operand).tracked_symbol().is_some() => {
                Outcomes::test(state, operand, Constraint::FALSE).into_states(operation)
            }
            None => States::One(state.set_operation_value(operation, None)),
        },
        UnaryOperator::Minus | UnaryOperator::Plus => {
            let value = state
                .constraint(operand, ConstraintKind::Number)
                .map(SymbolicValue::from_constraint);
            States::One(state.set_operation_value(operation, value))
        }
        UnaryOperator::BitwiseNegation => States::One(state.set_operation_value(operation, None)),
    }
}

fn is_integral(context: &SymbolicContext<'_>, operand: OperationRef<'_>) -> bool {
    operand.ty().is_some_and(|ty| context.semantic().is_integral(ty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{
            cfg::{known, ConstantValue, ControlFlowGraph, Operation, OperationId, Symbol, SymbolId, TypeTable},
            symbolic::OperationDispatcher,
        },
        test::GraphFactory,
    };

    fn outcomes(graph: &ControlFlowGraph, types: &TypeTable, id: OperationId, state: ProgramState) -> Vec<ProgramState> {
        let order = graph.execution_order(1);
        let mut states = vec![state];
        for &current in order.iter() {
            states = states
                .into_iter()
                .flat_map(|state| {
                    let context = SymbolicContext::new(graph, types, Some(graph.operation(current)), state, 1, false);
                    OperationDispatcher::process(&context)
                })
                .collect();
            if current == id {
                break;
            }
        }
        states
    }

    #[test]
    fn test_null_equality_forks_and_learns() {
        let mut factory = GraphFactory::new();
        let types = factory.types().clone();
        let x = factory.local("x");
        let read = factory.operation(OperationKind::LocalReference(x));
        let null = factory.operation(OperationKind::Literal(ConstantValue::Null));
        let equals = factory.operation(OperationKind::Binary {
            operator: BinaryOperator::NotEquals,
            left: read,
            right: null,
        });
        let graph = factory.linear_graph(vec![equals]);

        let states = outcomes(&graph, &types, equals, ProgramState::empty());
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].operation_value(equals), Some(&SymbolicValue::true_value()));
        assert!(states[0].symbol_has_constraint(x, Constraint::NOT_NULL));
        assert_eq!(states[1].operation_value(equals), Some(&SymbolicValue::false_value()));
        assert!(states[1].symbol_has_constraint(x, Constraint::NULL));

        let known = ProgramState::empty().set_symbol_value(x, Some(SymbolicValue::null()));
        let states = outcomes(&graph, &types, equals, known);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].operation_value(equals), Some(&SymbolicValue::false_value()));
    }

    #[test]
    fn test_zero_comparison_and_division() {
        let mut factory = GraphFactory::new();
        let types = factory.types().clone();
        let int = types.get(known::INT32).unwrap();
        let n = factory.local("n");
        let read = factory.add(Operation::new(OperationKind::LocalReference(n)).with_type(int));
        let zero = factory.add(Operation::new(OperationKind::Literal(ConstantValue::Int(0))).with_type(int));
        let equals = factory.operation(OperationKind::Binary {
            operator: BinaryOperator::Equals,
            left: zero,
            right: read,
        });
        let graph = factory.linear_graph(vec![equals]);
        let states = outcomes(&graph, &types, equals, ProgramState::empty());
        assert_eq!(states.len(), 2);
        assert!(states[0].symbol_has_constraint(n, Constraint::ZERO));
        assert!(states[1].symbol_has_constraint(n, Constraint::NOT_ZERO));

        let mut factory = GraphFactory::new();
        let n = factory.local("n");
        let one = factory.add(Operation::new(OperationKind::Literal(ConstantValue::Int(1))).with_type(int));
        let divisor = factory.add(Operation::new(OperationKind::LocalReference(n)).with_type(int));
        let divide = factory.add(
            Operation::new(OperationKind::Binary {
                operator: BinaryOperator::Divide,
                left: one,
                right: divisor,
            })
            .with_type(int),
        );
        let graph = factory.linear_graph(vec![divide]);
        let states = outcomes(&graph, &types, divide, ProgramState::empty());
        assert_eq!(states.len(), 1);
        assert!(states[0].symbol_has_constraint(n, Constraint::NOT_ZERO));

        let zero = ProgramState::empty().set_symbol_constraint(n, Constraint::ZERO);
        assert!(outcomes(&graph, &types, divide, zero).is_empty());
    }

    /// `operand == constant` on a `Nullable<T>` local.
    fn nullable_comparison(
        constant: ConstantValue,
    ) -> (ControlFlowGraph, TypeTable, SymbolId, OperationId, OperationId) {
        let mut factory = GraphFactory::new();
        let types = factory.types().clone();
        let nullable = types.get(known::NULLABLE).unwrap();
        let x = factory.symbol(Symbol::local("x", Some(nullable)));
        let read = factory.add(Operation::new(OperationKind::LocalReference(x)).with_type(nullable));
        let literal = factory.operation(OperationKind::Literal(constant));
        let equals = factory.operation(OperationKind::Binary {
            operator: BinaryOperator::Equals,
            left: read,
            right: literal,
        });
        (factory.linear_graph(vec![equals]), types, x, read, equals)
    }

    #[test]
    fn test_nullable_bool_comparison_keeps_null_possible() {
        let (graph, types, b, read, equals) = nullable_comparison(ConstantValue::Bool(true));
        let states = outcomes(&graph, &types, equals, ProgramState::empty());
        assert_eq!(states.len(), 2);
        assert!(states[0].symbol_has_constraint(b, Constraint::TRUE));
        assert_eq!(states[1].operation_value(equals), Some(&SymbolicValue::false_value()));
        assert!(states[1].symbol_value(b).is_none());

        // `b == null` after `b == true` failed still has both outcomes.
        let null_test = Outcomes::test(&states[1], graph.operation(read), Constraint::NULL);
        assert!(null_test.when_true.is_some() && null_test.when_false.is_some());

        let null = ProgramState::empty().set_symbol_value(b, Some(SymbolicValue::null()));
        let states = outcomes(&graph, &types, equals, null);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].operation_value(equals), Some(&SymbolicValue::false_value()));
    }

    #[test]
    fn test_nullable_int_comparison_keeps_null_possible() {
        let (graph, types, n, _, equals) = nullable_comparison(ConstantValue::Int(0));
        let states = outcomes(&graph, &types, equals, ProgramState::empty());
        assert_eq!(states.len(), 2);
        assert!(states[0].symbol_has_constraint(n, Constraint::ZERO));
        assert!(!states[1].symbol_has_constraint(n, Constraint::NOT_ZERO));
        assert!(!states[1].symbol_has_constraint(n, Constraint::NOT_NULL));
    }

    #[test]
    fn test_logical_operators() {
        use BoolConstraint::{False, True};
        assert_eq!(logical(BinaryOperator::And, Some(False), None), Some(false));
        assert_eq!(logical(BinaryOperator::ConditionalAnd, Some(True), None), None);
        assert_eq!(logical(BinaryOperator::Or, None, Some(True)), Some(true));
        assert_eq!(logical(BinaryOperator::ExclusiveOr, Some(True), Some(True)), Some(false));
        assert_eq!(logical(BinaryOperator::ExclusiveOr, Some(True), None), None);
    }

    #[test]
    fn test_not_forks_on_tracked_flag() {
        let mut factory = GraphFactory::new();
        let types = factory.types().clone();
        let flag = factory.local("flag");
        let read = factory.operation(OperationKind::LocalReference(flag));
        let not = factory.operation(OperationKind::Unary {
            operator: UnaryOperator::Not,
            operand: read,
        });
        let graph = factory.linear_graph(vec![not]);

        let states = outcomes(&graph, &types, not, ProgramState::empty());
        assert_eq!(states.len(), 2);
        assert!(states[0].symbol_has_constraint(flag, Constraint::FALSE));
        assert!(states[1].symbol_has_constraint(flag, Constraint::TRUE));

        let known = ProgramState::empty().set_symbol_value(flag, Some(SymbolicValue::true_value()));
        let states = outcomes(&graph, &types, not, known);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].operation_value(not), Some(&SymbolicValue::false_value()));
    }
}
