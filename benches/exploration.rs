//! Benchmarks for symbolic exploration.
//!
//! Measures the engine on synthetic procedures that stress its main costs:
//! - Chains of independent null checks (state forking and merging at joins)
//! - Nested loops (visit budgets and merging of equal loop states)
//! - Batches of procedures on the rayon pool

extern crate symflow;

use criterion::{criterion_group, criterion_main, Criterion};
use simplelog::{Config, LevelFilter, SimpleLogger};
use std::hint::black_box;
use symflow::prelude::*;

/// `if (p0 == null) {} ... if (pN == null) {} return;`
fn null_check_chain(types: &TypeTable, checks: usize) -> ControlFlowGraph {
    let object = types.get(known::OBJECT);
    let mut builder = ControlFlowGraphBuilder::new("NullCheckChain");
    let entry = builder.add_block(BlockKind::Entry);
    let tests: Vec<(usize, usize)> = (0..checks)
        .map(|_| (builder.add_block(BlockKind::Block), builder.add_block(BlockKind::Block)))
        .collect();
    let last = builder.add_block(BlockKind::Block);
    let exit = builder.add_block(BlockKind::Exit);

    builder.goto(entry, tests.first().map_or(last, |&(test, _)| test));
    for (i, &(test, taken)) in tests.iter().enumerate() {
        let next = tests.get(i + 1).map_or(last, |&(next, _)| next);
        let parameter = builder.add_symbol(Symbol::parameter(&format!("p{i}"), object));
        let read = builder.add_operation(Operation::new(OperationKind::ParameterReference(parameter)));
        let null = builder.add_operation(Operation::new(OperationKind::Literal(ConstantValue::Null)));
        let condition = builder.add_operation(Operation::new(OperationKind::Binary {
            operator: BinaryOperator::Equals,
            left: read,
            right: null,
        }));
        builder.branch(test, condition, ConditionKind::WhenTrue, taken, next);
        builder.goto(taken, next);
    }
    builder.return_value(last, exit, None);
    builder.build().unwrap()
}

/// `while (a) { while (b) { } }`
fn nested_loops(types: &TypeTable) -> ControlFlowGraph {
    let boolean = types.get(known::BOOLEAN);
    let mut builder = ControlFlowGraphBuilder::new("NestedLoops");
    let a = builder.add_symbol(Symbol::parameter("a", boolean));
    let b = builder.add_symbol(Symbol::parameter("b", boolean));
    let entry = builder.add_block(BlockKind::Entry);
    let outer = builder.add_block(BlockKind::Block);
    let inner = builder.add_block(BlockKind::Block);
    let inner_body = builder.add_block(BlockKind::Block);
    let after = builder.add_block(BlockKind::Block);
    let exit = builder.add_block(BlockKind::Exit);

    let outer_condition = builder.add_operation(Operation::new(OperationKind::ParameterReference(a)));
    let inner_condition = builder.add_operation(Operation::new(OperationKind::ParameterReference(b)));
    builder.goto(entry, outer);
    builder.branch(outer, outer_condition, ConditionKind::WhenTrue, inner, after);
    builder.branch(inner, inner_condition, ConditionKind::WhenTrue, inner_body, outer);
    builder.goto(inner_body, inner);
    builder.return_value(after, exit, None);
    builder.build().unwrap()
}

fn explore(graph: &ControlFlowGraph, types: &TypeTable, config: ExecutionConfig) -> ExecutionResult {
    let mut engine = SymbolicExecution::new(graph, types, SymbolicCheckList::default(), config).unwrap();
    engine.execute()
}

/// Benchmark ten independent null checks, whose paths collapse at every join.
fn bench_null_check_chain(c: &mut Criterion) {
    let types = TypeTable::with_core_types();
    let graph = null_check_chain(&types, 10);

    c.bench_function("explore_null_check_chain_10", |b| {
        b.iter(|| black_box(explore(black_box(&graph), &types, ExecutionConfig::default())));
    });
}

/// Benchmark the same chain without live-variable analysis, where paths never collapse.
fn bench_null_check_chain_without_liveness(c: &mut Criterion) {
    let types = TypeTable::with_core_types();
    let graph = null_check_chain(&types, 10);
    let config = ExecutionConfig::default().with_live_variable_analysis(false);

    c.bench_function("explore_null_check_chain_10_no_liveness", |b| {
        b.iter(|| black_box(explore(black_box(&graph), &types, config.clone())));
    });
}

/// Benchmark nested loops with the thorough configuration.
fn bench_nested_loops(c: &mut Criterion) {
    let types = TypeTable::with_core_types();
    let graph = nested_loops(&types);

    c.bench_function("explore_nested_loops", |b| {
        b.iter(|| black_box(explore(black_box(&graph), &types, ExecutionConfig::thorough())));
    });
}

/// Benchmark a batch of 64 procedures.
fn bench_batch(c: &mut Criterion) {
    // Surfaces panicked procedures, which the batch runner only logs.
    let _ = SimpleLogger::init(LevelFilter::Warn, Config::default());
    let types = TypeTable::with_core_types();
    let graphs: Vec<_> = (0..64).map(|_| null_check_chain(&types, 6)).collect();
    let config = ExecutionConfig::default();

    c.bench_function("explore_batch_64", |b| {
        b.iter(|| {
            let results = execute_batch(black_box(&graphs), &types, &config, |_| SymbolicCheckList::default());
            black_box(results)
        });
    });
}

criterion_group!(
    benches,
    bench_null_check_chain,
    bench_null_check_chain_without_liveness,
    bench_nested_loops,
    bench_batch
);
criterion_main!(benches);
