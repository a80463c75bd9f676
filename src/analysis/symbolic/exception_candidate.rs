//! Exceptions an operation may raise.
//!
//! The engine asks [`exception_candidate`] before evaluating every operation inside a
//! protected region. A `Some` result produces an additional successor that enters the
//! matching handler with the pre-operation state, since the operation did not complete.

use crate::analysis::{
    cfg::{known, OperationKind, OperationRef, SemanticModel},
    symbolic::{methods, Constraint, ExceptionState, KnownMethod, ProgramState},
};

/// Returns the exception `operation` may throw in `state`, or `None` if it cannot throw.
#[must_use]
pub fn exception_candidate(
    state: &ProgramState,
    operation: OperationRef<'_>,
    semantic: &dyn SemanticModel,
) -> Option<ExceptionState> {
    let graph = operation.graph();
    match operation.kind() {
        OperationKind::FieldReference { field: member, instance }
        | OperationKind::EventReference { event: member, instance }
        | OperationKind::MethodReference { method: member, instance } => {
            if graph.symbol(*member).is_static() {
                return None;
            }
            instance.and_then(|instance| null_dereference(state, operation.child(instance), semantic))
        }
        OperationKind::PropertyReference {
            property, instance, ..
        } => {
            if graph.symbol(*property).is_static()
                || methods::is_lock_held_property(graph, semantic, *property)
            {
                return None;
            }
            instance.and_then(|instance| null_dereference(state, operation.child(instance), semantic))
        }
        OperationKind::ArrayElementReference { indices, .. } => {
            let by_range = indices.iter().any(|&index| {
                operation
                    .child(index)
                    .ty()
                    .is_some_and(|ty| semantic.is_type(ty, known::RANGE))
            });
            let name = if by_range {
                known::ARGUMENT_OUT_OF_RANGE_EXCEPTION
            } else {
                known::INDEX_OUT_OF_RANGE_EXCEPTION
            };
            Some(ExceptionState::named(semantic, name))
        }
        OperationKind::Conversion {
            operand,
            is_try_cast,
        } => {
            if operation.is_implicit() || *is_try_cast {
                return None;
            }
            let operand = operation.child(*operand);
            if state.has_constraint(operand, Constraint::NULL) {
                return None;
            }
            let (Some(source), Some(target)) = (operand.ty(), operation.ty()) else {
                return None;
            };
            let is_reference_or_unboxing =
                semantic.is_reference_type(source) || semantic.is_reference_type(target);
            (is_reference_or_unboxing && !semantic.derives_or_implements(source, target))
                .then(|| ExceptionState::named(semantic, known::INVALID_CAST_EXCEPTION))
        }
        OperationKind::Binary {
            operator, right, ..
        } if operator.is_division() => {
            let divisor = operation.child(*right);
            let is_integral = divisor
                .ty()
                .or(operation.ty())
                .is_some_and(|ty| semantic.is_integral(ty));
            (is_integral && !state.has_constraint(divisor, Constraint::NOT_ZERO))
                .then(|| ExceptionState::named(semantic, known::DIVIDE_BY_ZERO_EXCEPTION))
        }
        OperationKind::Invocation { method, .. } => {
            if KnownMethod::classify(graph, semantic, *method).never_throws() {
                None
            } else {
                Some(ExceptionState::Unknown)
            }
        }
        OperationKind::ObjectCreation { .. }
        | OperationKind::DynamicInvocation { .. }
        | OperationKind::DynamicMemberReference { .. }
        | OperationKind::DynamicIndexerAccess { .. }
        | OperationKind::DynamicObjectCreation { .. } => Some(ExceptionState::Unknown),
        _ => None,
    }
}

fn null_dereference(
    state: &ProgramState,
    instance: OperationRef<'_>,
    semantic: &dyn SemanticModel,
) -> Option<ExceptionState> {
    let resolved = state.resolve_capture_and_unwrap_conversion(instance);
    if resolved.is_instance_reference() || state.has_constraint(instance, Constraint::NOT_NULL) {
        return None;
    }
    let is_value_type = instance
        .ty()
        .is_some_and(|ty| !semantic.is_reference_type(ty) && !semantic.is_nullable_value_type(ty));
    if is_value_type {
        return None;
    }
    Some(ExceptionState::named(semantic, known::NULL_REFERENCE_EXCEPTION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::cfg::{BinaryOperator, ConstantValue, Operation, Symbol, TypeTable},
        analysis::symbolic::SymbolicValue,
        test::GraphFactory,
    };

    fn known(types: &TypeTable, name: &str) -> Option<ExceptionState> {
        Some(ExceptionState::Known(types.get(name).unwrap()))
    }

    #[test]
    fn test_range_index_raises_argument_out_of_range() {
        let mut factory = GraphFactory::new();
        let types = factory.types().clone();
        let array = factory.parameter("array");
        let array_ref = factory.operation(OperationKind::ParameterReference(array));
        let range = factory.add(Operation::new(OperationKind::Other { children: Vec::new() })
            .with_type(types.get(known::RANGE).unwrap()));
        let index = factory.add(Operation::new(OperationKind::Literal(ConstantValue::Int(1)))
            .with_type(types.get(known::INT32).unwrap()));
        let by_range = factory.operation(OperationKind::ArrayElementReference {
            array: array_ref,
            indices: vec![range],
        });
        let array_ref2 = factory.operation(OperationKind::ParameterReference(array));
        let by_index = factory.operation(OperationKind::ArrayElementReference {
            array: array_ref2,
            indices: vec![index],
        });
        let graph = factory.linear_graph(vec![by_range, by_index]);
        let state = ProgramState::empty();

        assert_eq!(
            exception_candidate(&state, graph.operation(by_range), &types),
            known(&types, known::ARGUMENT_OUT_OF_RANGE_EXCEPTION)
        );
        assert_eq!(
            exception_candidate(&state, graph.operation(by_index), &types),
            known(&types, known::INDEX_OUT_OF_RANGE_EXCEPTION)
        );
    }

    #[test]
    fn test_member_access_on_unknown_instance_raises_null_reference() {
        let mut factory = GraphFactory::new();
        let types = factory.types().clone();
        let owner = factory.object_type();
        let field = factory.symbol(Symbol::field("value", None, owner));
        let target = factory.parameter("target");
        let instance = factory.operation(OperationKind::ParameterReference(target));
        let access = factory.operation(OperationKind::FieldReference {
            field,
            instance: Some(instance),
        });
        let this = factory.operation(OperationKind::InstanceReference);
        let own = factory.operation(OperationKind::FieldReference {
            field,
            instance: Some(this),
        });
        let graph = factory.linear_graph(vec![access, own]);

        let unknown = ProgramState::empty();
        assert_eq!(
            exception_candidate(&unknown, graph.operation(access), &types),
            known(&types, known::NULL_REFERENCE_EXCEPTION)
        );
        assert_eq!(exception_candidate(&unknown, graph.operation(own), &types), None);

        let checked = unknown.set_symbol_value(target, Some(SymbolicValue::not_null()));
        assert_eq!(exception_candidate(&checked, graph.operation(access), &types), None);
    }

    #[test]
    fn test_division_requires_non_zero_divisor() {
        let mut factory = GraphFactory::new();
        let types = factory.types().clone();
        let int = types.get(known::INT32).unwrap();
        let a = factory.local("a");
        let b = factory.local("b");
        let left = factory.add(Operation::new(OperationKind::LocalReference(a)).with_type(int));
        let right = factory.add(Operation::new(OperationKind::LocalReference(b)).with_type(int));
        let divide = factory.add(
            Operation::new(OperationKind::Binary {
                operator: BinaryOperator::Divide,
                left,
                right,
            })
            .with_type(int),
        );
        let graph = factory.linear_graph(vec![divide]);

        let state = ProgramState::empty();
        assert_eq!(
            exception_candidate(&state, graph.operation(divide), &types),
            known(&types, known::DIVIDE_BY_ZERO_EXCEPTION)
        );
        let state = state.set_symbol_constraint(b, Constraint::NOT_ZERO);
        assert_eq!(exception_candidate(&state, graph.operation(divide), &types), None);
    }

    #[test]
    fn test_explicit_downcast_may_fail() {
        let mut factory = GraphFactory::new();
        let types = factory.types().clone();
        let object = types.get(known::OBJECT).unwrap();
        let string = types.get(known::STRING).unwrap();
        let o = factory.local("o");
        let operand = factory.add(Operation::new(OperationKind::LocalReference(o)).with_type(object));
        let cast = factory.add(
            Operation::new(OperationKind::Conversion {
                operand,
                is_try_cast: false,
            })
            .with_type(string),
        );
        let graph = factory.linear_graph(vec![cast]);

        let state = ProgramState::empty();
        assert_eq!(
            exception_candidate(&state, graph.operation(cast), &types),
            known(&types, known::INVALID_CAST_EXCEPTION)
        );
        let state = state.set_symbol_value(o, Some(SymbolicValue::null()));
        assert_eq!(exception_candidate(&state, graph.operation(cast), &types), None);
    }

    #[test]
    fn test_missing_exception_type_degrades_to_unknown() {
        let mut factory = GraphFactory::new();
        let array = factory.parameter("array");
        let array_ref = factory.operation(OperationKind::ParameterReference(array));
        let element = factory.operation(OperationKind::ArrayElementReference {
            array: array_ref,
            indices: Vec::new(),
        });
        let graph = factory.linear_graph(vec![element]);

        assert_eq!(
            exception_candidate(&ProgramState::empty(), graph.operation(element), &TypeTable::new()),
            Some(ExceptionState::Unknown)
        );
    }
}
