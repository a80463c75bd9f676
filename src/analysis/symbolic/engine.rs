//! The exploration driver.
//!
//! [`SymbolicExecution`] walks the exploded graph of one procedure breadth first. Every node
//! is a program point (block, operation index, pending `finally` chain) plus the state
//! reaching it. Expanding a node either evaluates the next operation of its block or, at
//! the end of the block, takes the block's branches.
//!
//! # Termination
//!
//! Three mechanisms keep the walk finite:
//!
//! - nodes equal to an already expanded node are merged instead of expanded again
//! - a program point is expanded at most [`ExecutionConfig::max_operation_visits`] times
//!   along one path
//! - the whole walk stops after [`ExecutionConfig::max_steps`] dequeued nodes
//!
//! Checks learn how the walk ended through [`SymbolicCheck::execution_completed`], which is
//! called exactly once per [`SymbolicExecution::execute`].
//!
//! # Exceptions
//!
//! Inside `try` regions every operation that may throw forks an exceptional path from the
//! state before the operation. Exceptional paths, `throw` and `throw;` search the enclosing
//! regions for handlers: a catch whose type certainly matches ends the search, a catch that
//! may match is entered and the search continues, a filter is entered and resumes the search
//! if it rejects the exception, and a `finally` is entered with a [`FinallyPoint`] that
//! resumes the search once the `finally` completes. Unhandled exceptions reach the exit
//! block with the exception still in the state.
//!
//! Every throw pushes onto the exception stack of the state. An exception raised and handled
//! inside a `catch` or `finally` is popped again when its handler ends, leaving the exception
//! underneath in flight. One that escapes the handler replaces the exception the handler was
//! dealing with.
//!
//! [`SymbolicCheck::execution_completed`]: crate::analysis::symbolic::SymbolicCheck::execution_completed

use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};

use log::{debug, info, trace};

use crate::{
    analysis::{
        cfg::{
            BranchSemantics, ConditionKind, ControlFlowBranch, ControlFlowGraph, OperationRef, RegionKind,
            SemanticModel, SymbolId, TypeId,
        },
        symbolic::{
            check_program_point_limits, exception_candidate, processors::learn, Constraint,
            ExceptionState, ExecutionConfig, ExplodedNode, FinallyPoint, LiveVariables, LoopDetector,
            OperationDispatcher, ProgramState, SymbolicCheckList, SymbolicContext,
        },
    },
    Result,
};

/// How an exploration ended.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ExecutionOutcome {
    /// Every reachable node was expanded or merged
    Completed,
    /// The step budget ran out before the worklist was empty
    StepBudgetExceeded,
}

/// Counters collected during one exploration.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ExecutionStatistics {
    /// Nodes taken from the worklist
    pub steps: usize,
    /// Nodes equal to an already expanded node
    pub merged_nodes: usize,
    /// Nodes dropped by the visit budget inside a loop
    pub loop_cutoffs: usize,
    /// Nodes dropped by the visit budget outside of loops
    pub visit_cutoffs: usize,
    /// Distinct states that reached the exit block
    pub exit_states: usize,
    /// Exceptional paths forked from operations that may throw
    pub exception_paths: usize,
}

/// Result of [`SymbolicExecution::execute`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ExecutionResult {
    /// How the exploration ended
    pub outcome: ExecutionOutcome,
    /// What happened on the way
    pub statistics: ExecutionStatistics,
}

/// How certainly a catch clause handles an exception.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum CatchMatch {
    Certain,
    Possible,
    Never,
}

/// Symbolic execution of one procedure.
pub struct SymbolicExecution<'g> {
    graph: &'g ControlFlowGraph,
    semantic: &'g dyn SemanticModel,
    checks: SymbolicCheckList,
    config: ExecutionConfig,
    loops: LoopDetector,
    liveness: Option<LiveVariables>,
    captured: HashSet<SymbolId>,
    statistics: ExecutionStatistics,
}

impl<'g> SymbolicExecution<'g> {
    /// Prepares the exploration of `graph`, running loop detection and (if enabled)
    /// live-variable analysis once.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnsupportedGraph`] or [`crate::Error::TooManyOperations`] if a
    /// program point of `graph` cannot be encoded.
    pub fn new(
        graph: &'g ControlFlowGraph,
        semantic: &'g dyn SemanticModel,
        checks: SymbolicCheckList,
        config: ExecutionConfig,
    ) -> Result<Self> {
        check_program_point_limits(graph)?;
        let liveness = config.live_variable_analysis.then(|| LiveVariables::new(graph));
        Ok(Self {
            graph,
            semantic,
            checks,
            loops: LoopDetector::new(graph),
            liveness,
            captured: graph.captured_variables().iter().copied().collect(),
            config,
            statistics: ExecutionStatistics::default(),
        })
    }

    /// Returns the configuration of this run.
    #[must_use]
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Returns the checks, for example to read what they collected.
    #[must_use]
    pub fn checks(&self) -> &SymbolicCheckList {
        &self.checks
    }

    /// Explores the procedure until the worklist is empty or the step budget runs out.
    pub fn execute(&mut self) -> ExecutionResult {
        self.statistics = ExecutionStatistics::default();
        let mut queue = VecDeque::new();
        let mut visited: HashSet<ExplodedNode> = HashSet::new();
        let mut exit_states: HashSet<ProgramState> = HashSet::new();
        let mut outcome = ExecutionOutcome::Completed;

        queue.push_back(ExplodedNode::new(self.graph, 0, ProgramState::empty(), None));
        while let Some(mut node) = queue.pop_front() {
            if self.statistics.steps == self.config.max_steps {
                info!(
                    "{}: step budget of {} exhausted, {} nodes left",
                    self.graph.name(),
                    self.config.max_steps,
                    queue.len() + 1
                );
                outcome = ExecutionOutcome::StepBudgetExceeded;
                break;
            }
            self.statistics.steps += 1;
            if visited.contains(&node) {
                self.statistics.merged_nodes += 1;
                debug!("merged node at block {} index {}", node.block(), node.index());
                continue;
            }
            visited.insert(node.clone());

            if node.add_visit() > self.config.max_operation_visits {
                if self.loops.is_in_loop(node.block()) {
                    self.statistics.loop_cutoffs += 1;
                } else {
                    self.statistics.visit_cutoffs += 1;
                    debug!(
                        "visit budget cut-off outside of loops at block {} index {}",
                        node.block(),
                        node.index()
                    );
                }
                continue;
            }
            trace!("{:?}", node);

            let successors = if node.block() == self.graph.block_count() - 1 {
                self.process_exit(&node, &mut exit_states);
                Vec::new()
            } else if node.is_block_end() {
                self.process_branching(&node)
            } else {
                self.process_operation(&node)
            };
            queue.extend(successors);
        }

        self.checks.execution_completed(outcome);
        ExecutionResult {
            outcome,
            statistics: self.statistics,
        }
    }

    fn context(&self, operation: Option<OperationRef<'g>>, node: &ExplodedNode, state: ProgramState) -> SymbolicContext<'g> {
        let visit_count = node.state().visit_count(node.program_point_hash());
        let block = self.graph.block(node.block());
        let is_loop_condition = self.loops.is_in_loop(node.block())
            && operation.is_some_and(|operation| Some(operation.id()) == block.branch_value);
        SymbolicContext::new(self.graph, self.semantic, operation, state, visit_count, is_loop_condition)
    }

    fn process_exit(&mut self, node: &ExplodedNode, exit_states: &mut HashSet<ProgramState>) {
        let state = node.state().reset_operations();
        if !exit_states.insert(state.clone()) {
            return;
        }
        self.statistics.exit_states += 1;
        debug!("{}: exit reached with\n{}", self.graph.name(), state);
        let context = self.context(None, node, state);
        self.checks.exit_reached(&context);
    }

    fn process_operation(&mut self, node: &ExplodedNode) -> Vec<ExplodedNode> {
        let Some(operation) = node.operation(self.graph) else {
            return Vec::new();
        };
        let mut successors = Vec::new();

        if self.config.track_exceptions && self.graph.is_protected(node.block()) {
            if let Some(exception) = exception_candidate(node.state(), operation, self.semantic) {
                self.statistics.exception_paths += 1;
                let state = node.state().reset_operations().push_exception(exception);
                let start = self.graph.block(node.block()).enclosing_region;
                successors.extend(self.search_handlers(state, start, None, node.finally_point().cloned()));
            }
        }

        let context = self.context(Some(operation), node, node.state().clone());
        for state in self.checks.pre_process(&context) {
            for state in OperationDispatcher::process(&context.with_state(state)) {
                for state in self.checks.post_process(&context.with_state(state)) {
                    successors.push(node.create_next(state));
                }
            }
        }
        successors
    }

    fn process_branching(&mut self, node: &ExplodedNode) -> Vec<ExplodedNode> {
        let graph = self.graph;
        let block = graph.block(node.block());
        let state = node.state();
        match block.fall_through_semantics() {
            BranchSemantics::Throw => {
                let exception = block
                    .branch_value
                    .and_then(|value| graph.operation(value).ty())
                    .map_or(ExceptionState::Unknown, ExceptionState::Known);
                let state = state.reset_operations().push_exception(exception);
                self.search_handlers(state, block.enclosing_region, None, node.finally_point().cloned())
            }
            BranchSemantics::Rethrow => {
                let exception = state.exception().unwrap_or(ExceptionState::Unknown);
                let state = state.reset_operations().push_exception(exception);
                self.search_handlers(state, block.enclosing_region, None, node.finally_point().cloned())
            }
            BranchSemantics::StructuredExceptionHandling => self.process_handler_end(node),
            BranchSemantics::ProgramTermination | BranchSemantics::Error | BranchSemantics::None => Vec::new(),
            BranchSemantics::Regular | BranchSemantics::Return => {
                let mut successors = Vec::new();
                for branch in block.successors() {
                    let Some(state) = self.evaluate_condition(node, branch) else {
                        continue;
                    };
                    successors.extend(self.follow_branch(node, branch, state));
                }
                successors
            }
        }
    }

    /// The truth value of the branch condition under which `branch` is taken, if it depends
    /// on the condition at all.
    fn expected_condition(&self, node: &ExplodedNode, branch: &ControlFlowBranch) -> Option<bool> {
        let block = self.graph.block(node.block());
        let when_true = match block.condition_kind {
            ConditionKind::None => return None,
            ConditionKind::WhenTrue => true,
            ConditionKind::WhenFalse => false,
        };
        Some(if branch.is_conditional { when_true } else { !when_true })
    }

    /// Learns the branch condition for `branch` and consults the checks. Returns `None` if the
    /// branch cannot be taken.
    fn evaluate_condition(&mut self, node: &ExplodedNode, branch: &ControlFlowBranch) -> Option<ProgramState> {
        let Some(expected) = self.expected_condition(node, branch) else {
            return Some(node.state().clone());
        };
        let block = self.graph.block(node.block());
        let condition = self.graph.operation(block.branch_value?);
        self.learn_condition(node, condition, expected)
    }

    fn learn_condition(&mut self, node: &ExplodedNode, condition: OperationRef<'g>, expected: bool) -> Option<ProgramState> {
        let state = learn(node.state(), condition, Constraint::from_bool(expected))?;
        let context = self.context(Some(condition), node, state);
        self.checks.condition_evaluated(&context)
    }

    /// Takes a regular branch: forgets operation values and dead variables, pops the
    /// exceptions of left catch handlers and enters pending `finally` regions.
    fn follow_branch(&self, node: &ExplodedNode, branch: &ControlFlowBranch, state: ProgramState) -> Option<ExplodedNode> {
        let destination = branch.destination?;
        let graph = self.graph;
        let left_handlers = branch
            .leaving_regions
            .iter()
            .filter(|&&region| graph.region(region).kind == RegionKind::Catch)
            .count();
        let state = branch
            .leaving_regions
            .iter()
            .fold(state, |state, &region| self.release_captures(state, region));
        let state = (0..left_handlers).fold(state.reset_operations(), |state, _| state.pop_exception());

        let pending = FinallyPoint::new(
            node.finally_point().cloned(),
            Arc::from(branch.finally_regions.as_slice()),
            destination,
        );
        let (target, finally_point) = match pending {
            Some(point) => (graph.region(point.region()).first_block, Some(Arc::new(point))),
            None => (destination, node.finally_point().cloned()),
        };
        Some(self.enter(target, state, finally_point))
    }

    /// Drops the flow captures scoped to `region`.
    fn release_captures(&self, state: ProgramState, region: usize) -> ProgramState {
        self.graph
            .region(region)
            .capture_ids
            .iter()
            .fold(state, |state, &capture| state.remove_capture(capture))
    }

    /// Creates the node at the start of `block`, dropping variables dead on entry.
    fn enter(&self, block: usize, state: ProgramState, finally_point: Option<Arc<FinallyPoint>>) -> ExplodedNode {
        let state = match &self.liveness {
            Some(liveness) => state.remove_symbols(|symbol| {
                liveness.is_tracked(symbol)
                    && !liveness.is_live_in(block, symbol)
                    && !self.captured.contains(&symbol)
            }),
            None => state,
        };
        ExplodedNode::new(self.graph, block, state, finally_point)
    }

    /// The end of a `finally` or filter region.
    fn process_handler_end(&mut self, node: &ExplodedNode) -> Vec<ExplodedNode> {
        let graph = self.graph;
        let Some(region) = graph
            .enclosing_regions(node.block())
            .find(|region| matches!(region.kind, RegionKind::Finally | RegionKind::Filter))
        else {
            return Vec::new();
        };
        if region.kind == RegionKind::Filter {
            return self.process_filter_end(node, region.ordinal);
        }

        let Some(point) = node.finally_point().filter(|point| point.region() == region.ordinal) else {
            debug!("finally region {} completed without a pending finally point", region.ordinal);
            return Vec::new();
        };
        let state = self
            .release_captures(node.state().clone(), region.ordinal)
            .reset_operations();
        if let Some(next) = point.create_next() {
            let first_block = graph.region(next.region()).first_block;
            return vec![self.enter(first_block, state, Some(Arc::new(next)))];
        }
        let previous = point.previous().cloned();
        match point.destination() {
            Some(destination) => vec![self.enter(destination, state, previous)],
            None => {
                // The exception keeps unwinding outside of the try-finally.
                let Some(group) = region.enclosing else {
                    return Vec::new();
                };
                let Some(start) = graph.region(group).enclosing else {
                    return Vec::new();
                };
                let state = self.release_captures(state, group);
                let state = match point.exception() {
                    Some(pending) if state.exception() != Some(pending) => state.push_exception(pending),
                    _ => state,
                };
                self.search_handlers(state, start, None, previous)
            }
        }
    }

    fn process_filter_end(&mut self, node: &ExplodedNode, filter: usize) -> Vec<ExplodedNode> {
        let graph = self.graph;
        let Some(group) = graph.region(filter).enclosing else {
            return Vec::new();
        };
        let handler = graph
            .region(group)
            .nested
            .iter()
            .copied()
            .find(|&region| graph.region(region).kind == RegionKind::Catch);
        let try_region = graph.region(group).enclosing.and_then(|try_and_catch| {
            graph
                .region(try_and_catch)
                .nested
                .iter()
                .copied()
                .find(|&region| graph.region(region).kind == RegionKind::Try)
        });
        let condition = graph.block(node.block()).branch_value.map(|value| graph.operation(value));

        let mut successors = Vec::new();
        for expected in [true, false] {
            let state = match condition {
                Some(condition) => self.learn_condition(node, condition, expected),
                None => Some(node.state().clone()),
            };
            let Some(state) = state.map(|state| self.release_captures(state, filter).reset_operations()) else {
                continue;
            };
            match (expected, handler, try_region) {
                (true, Some(handler), _) => {
                    let first_block = graph.region(handler).first_block;
                    successors.push(self.enter(first_block, state, node.finally_point().cloned()));
                }
                (false, _, Some(try_region)) => {
                    successors.extend(self.search_handlers(
                        state,
                        try_region,
                        Some(group),
                        node.finally_point().cloned(),
                    ));
                }
                _ => {}
            }
        }
        successors
    }

    /// Routes the innermost exception of `state` to the handlers enclosing `start`.
    ///
    /// When `after` is set, the handlers of the first `try` up to and including `after` were
    /// already tried.
    fn search_handlers(
        &mut self,
        mut state: ProgramState,
        start: usize,
        mut after: Option<usize>,
        mut finally_point: Option<Arc<FinallyPoint>>,
    ) -> Vec<ExplodedNode> {
        let graph = self.graph;
        let exception = state.exception().unwrap_or(ExceptionState::Unknown);
        let mut successors = Vec::new();

        for region in graph.region_ancestors(start) {
            // Handlers lie outside the try, so every region visited here is left.
            state = self.release_captures(state, region.ordinal).reset_operations();
            match region.kind {
                RegionKind::Try => {
                    let mut skipping = after.is_some();
                    for handler in graph.handlers_of(region.ordinal) {
                        if skipping {
                            skipping = Some(handler.ordinal) != after;
                            continue;
                        }
                        match handler.kind {
                            RegionKind::Finally => {
                                let point =
                                    FinallyPoint::for_exception(finally_point.clone(), handler.ordinal, exception);
                                successors.push(self.enter(handler.first_block, state, Some(Arc::new(point))));
                                return successors;
                            }
                            RegionKind::Catch => match self.catch_match(exception, handler.exception_type) {
                                CatchMatch::Certain => {
                                    successors.push(self.enter(handler.first_block, state, finally_point));
                                    return successors;
                                }
                                CatchMatch::Possible => {
                                    successors.push(self.enter(handler.first_block, state.clone(), finally_point.clone()));
                                }
                                CatchMatch::Never => {}
                            },
                            RegionKind::FilterAndHandler => {
                                let filtered = handler
                                    .nested
                                    .iter()
                                    .map(|&nested| graph.region(nested))
                                    .find(|nested| nested.kind == RegionKind::Filter)
                                    .and_then(|filter| filter.exception_type);
                                // A rejecting filter resumes the search itself.
                                if self.catch_match(exception, filtered) != CatchMatch::Never {
                                    successors.push(self.enter(handler.first_block, state, finally_point));
                                    return successors;
                                }
                            }
                            _ => {}
                        }
                    }
                    after = None;
                }
                RegionKind::Catch => {
                    // Escaping a handler replaces the exception it caught.
                    state = state.pop_exception().set_exception(exception);
                }
                RegionKind::Finally => {
                    if let Some(point) = finally_point.take() {
                        if point.region() != region.ordinal {
                            finally_point = Some(point);
                        } else {
                            if point.is_unwinding() {
                                // The new exception supersedes the one the finally was unwinding.
                                state = state.pop_exception().pop_exception().push_exception(exception);
                            }
                            finally_point = point.previous().cloned();
                        }
                    }
                }
                _ => {}
            }
        }

        debug!("{}: unhandled {} reaches the exit", graph.name(), exception);
        successors.push(ExplodedNode::new(graph, graph.block_count() - 1, state, None));
        successors
    }

    fn catch_match(&self, exception: ExceptionState, caught: Option<TypeId>) -> CatchMatch {
        let Some(caught) = caught else {
            return CatchMatch::Certain;
        };
        match exception {
            ExceptionState::Unknown => CatchMatch::Possible,
            ExceptionState::Known(thrown) if self.semantic.derives_or_implements(thrown, caught) => {
                CatchMatch::Certain
            }
            ExceptionState::Known(thrown) if self.semantic.derives_or_implements(caught, thrown) => {
                CatchMatch::Possible
            }
            ExceptionState::Known(_) => CatchMatch::Never,
        }
    }
}

impl std::fmt::Debug for SymbolicExecution<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolicExecution")
            .field("procedure", &self.graph.name())
            .field("checks", &self.checks)
            .field("config", &self.config)
            .field("statistics", &self.statistics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{
            cfg::{
                known, BinaryOperator, BlockKind, CaptureId, ConstantValue, ControlFlowGraphBuilder, Operation,
                OperationId, OperationKind, Symbol, TypeTable, ROOT_REGION,
            },
            symbolic::SymbolicCheck,
        },
        test::RecordingCheck,
    };
    use test_log::test;

    fn run(graph: &ControlFlowGraph, types: &TypeTable, config: ExecutionConfig) -> (ExecutionResult, RecordingCheck) {
        let recorder = RecordingCheck::default();
        let checks = SymbolicCheckList::new(vec![Box::new(recorder.clone()) as Box<dyn SymbolicCheck>]);
        let mut engine = SymbolicExecution::new(graph, types, checks, config).unwrap();
        (engine.execute(), recorder)
    }

    /// `if (p == null) { p = new object(); } return;`, without the assignment if `reassign`
    /// is `false`.
    fn null_check_join(types: &TypeTable, reassign: bool) -> ControlFlowGraph {
        let object = types.get(known::OBJECT);
        let mut builder = ControlFlowGraphBuilder::new("NullCheck");
        let p = builder.add_symbol(Symbol::parameter("p", object));
        let entry = builder.add_block(BlockKind::Entry);
        let test = builder.add_block(BlockKind::Block);
        let assign = builder.add_block(BlockKind::Block);
        let join = builder.add_block(BlockKind::Block);
        let exit = builder.add_block(BlockKind::Exit);

        let read = builder.add_operation(Operation::new(OperationKind::ParameterReference(p)));
        let null = builder.add_operation(Operation::new(OperationKind::Literal(ConstantValue::Null)));
        let condition = builder.add_operation(Operation::new(OperationKind::Binary {
            operator: BinaryOperator::Equals,
            left: read,
            right: null,
        }));
        builder.goto(entry, test);
        builder.branch(test, condition, ConditionKind::WhenFalse, join, assign);

        if reassign {
            let target = builder.add_operation(Operation::new(OperationKind::ParameterReference(p)));
            let creation = builder.add_operation(Operation::new(OperationKind::ObjectCreation {
                constructor: None,
                arguments: Vec::new(),
            }));
            builder.push_new_operation(
                assign,
                Operation::new(OperationKind::SimpleAssignment {
                    target,
                    value: creation,
                }),
            );
        }
        builder.goto(assign, join);
        builder.return_value(join, exit, None);
        builder.build().unwrap()
    }

    #[test]
    fn test_null_check_join_collapses_when_variable_dies() {
        let types = TypeTable::with_core_types();
        let graph = null_check_join(&types, false);
        let (result, recorder) = run(&graph, &types, ExecutionConfig::default());
        assert_eq!(result.outcome, ExecutionOutcome::Completed);
        assert_eq!(result.statistics.exit_states, 1);
        assert_eq!(recorder.exits(), 1);
        assert_eq!(recorder.completions(), vec![ExecutionOutcome::Completed]);
    }

    #[test]
    fn test_null_check_join_keeps_both_states_without_liveness() {
        let types = TypeTable::with_core_types();
        let graph = null_check_join(&types, false);
        let config = ExecutionConfig::default().with_live_variable_analysis(false);
        let (result, recorder) = run(&graph, &types, config);
        assert_eq!(result.statistics.exit_states, 2);
        assert_eq!(recorder.exits(), 2);
        assert_eq!(recorder.completions().len(), 1);
    }

    #[test]
    fn test_reassigned_paths_merge_on_equal_states() {
        let types = TypeTable::with_core_types();
        let graph = null_check_join(&types, true);
        let config = ExecutionConfig::default().with_live_variable_analysis(false);
        let (result, recorder) = run(&graph, &types, config);
        assert_eq!(result.statistics.exit_states, 1);
        assert!(result.statistics.merged_nodes >= 1);
        let exits = recorder.exit_states();
        assert!(exits[0]
            .symbols()
            .all(|(_, value)| value.has_constraint(Constraint::NOT_NULL)));
    }

    #[test]
    fn test_step_budget_ends_exploration_once() {
        let types = TypeTable::with_core_types();
        let graph = null_check_join(&types, true);
        let (result, recorder) = run(&graph, &types, ExecutionConfig::default().with_max_steps(3));
        assert_eq!(result.outcome, ExecutionOutcome::StepBudgetExceeded);
        assert_eq!(result.statistics.steps, 3);
        assert_eq!(recorder.exits(), 0);
        assert_eq!(recorder.completions(), vec![ExecutionOutcome::StepBudgetExceeded]);
    }

    #[test]
    fn test_throw_without_handler_reaches_exit() {
        let types = TypeTable::with_core_types();
        let exception = types.get(known::INVALID_OPERATION_EXCEPTION).unwrap();
        let mut builder = ControlFlowGraphBuilder::new("Throw");
        let entry = builder.add_block(BlockKind::Entry);
        let body = builder.add_block(BlockKind::Block);
        builder.add_block(BlockKind::Exit);
        let created = builder.add_operation(
            Operation::new(OperationKind::ObjectCreation {
                constructor: None,
                arguments: Vec::new(),
            })
            .with_type(exception),
        );
        builder.goto(entry, body);
        builder.throw(body, created);
        let graph = builder.build().unwrap();

        let (result, recorder) = run(&graph, &types, ExecutionConfig::default());
        assert_eq!(result.outcome, ExecutionOutcome::Completed);
        assert_eq!(recorder.exits(), 1);
        assert_eq!(recorder.exit_states()[0].exception(), Some(ExceptionState::Known(exception)));
    }

    /// `entry -> scoped -> after -> exit`, where `scoped` captures a literal. With `scope`, the
    /// capture belongs to a local lifetime region around `scoped`.
    fn capture_graph(scope: bool) -> (ControlFlowGraph, OperationId) {
        let mut builder = ControlFlowGraphBuilder::new("Capture");
        let entry = builder.add_block(BlockKind::Entry);
        let scoped = builder.add_block(BlockKind::Block);
        let after = builder.add_block(BlockKind::Block);
        let exit = builder.add_block(BlockKind::Exit);

        let id = CaptureId(0);
        let literal = builder.add_operation(Operation::new(OperationKind::Literal(ConstantValue::Bool(true))));
        builder.push_new_operation(scoped, Operation::new(OperationKind::FlowCapture { id, value: literal }));
        builder.goto(entry, scoped);
        builder.goto(scoped, after);
        builder.return_value(after, exit, None);
        if scope {
            let lifetime = builder.add_region(RegionKind::LocalLifetime, ROOT_REGION, scoped, scoped);
            builder.add_region_capture(lifetime, id);
        }
        (builder.build().unwrap(), literal)
    }

    #[test]
    fn test_capture_released_when_leaving_its_region() {
        let types = TypeTable::with_core_types();

        let (graph, literal) = capture_graph(true);
        let (_, recorder) = run(&graph, &types, ExecutionConfig::default());
        let exits = recorder.exit_states();
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].captured_operation(CaptureId(0)), None);
        assert!(exits[0].operation_value(literal).is_none());

        let (graph, literal) = capture_graph(false);
        let (_, recorder) = run(&graph, &types, ExecutionConfig::default());
        let exits = recorder.exit_states();
        assert_eq!(exits[0].captured_operation(CaptureId(0)), Some(literal));
        assert!(exits[0].operation_value(literal).is_some());
    }

    #[test]
    fn test_catch_match() {
        let types = TypeTable::with_core_types();
        let graph = null_check_join(&types, false);
        let engine = SymbolicExecution::new(&graph, &types, SymbolicCheckList::default(), ExecutionConfig::default())
            .unwrap();
        let get = |name| types.get(name).unwrap();
        let nre = ExceptionState::Known(get(known::NULL_REFERENCE_EXCEPTION));

        assert_eq!(engine.catch_match(nre, None), CatchMatch::Certain);
        assert_eq!(engine.catch_match(nre, Some(get(known::EXCEPTION))), CatchMatch::Certain);
        assert_eq!(
            engine.catch_match(ExceptionState::Known(get(known::EXCEPTION)), Some(get(known::INVALID_CAST_EXCEPTION))),
            CatchMatch::Possible
        );
        assert_eq!(engine.catch_match(nre, Some(get(known::INVALID_CAST_EXCEPTION))), CatchMatch::Never);
        assert_eq!(
            engine.catch_match(ExceptionState::Unknown, Some(get(known::EXCEPTION))),
            CatchMatch::Possible
        );
    }
}
