//! Checks hooked into symbolic execution.
//!
//! A check observes every operation before and after the engine evaluates it, every branch
//! condition, every exit state and the end of the run. It may also change the course of
//! the exploration: returning no state from [`SymbolicCheck::pre_process`] ends the path,
//! returning several states forks it, and returning `None` from
//! [`SymbolicCheck::condition_evaluated`] prunes the edge.
//!
//! # Composition
//!
//! A [`SymbolicCheckList`] runs its checks in order. The states produced by one check are
//! the input of the next, so a fork in the first check is seen by every later check once
//! per branch.

use crate::analysis::symbolic::{ExecutionOutcome, ProgramState, States, SymbolicContext};

/// A rule or analysis running on top of symbolic execution.
///
/// Checks are created per procedure and owned by the engine, so they may keep mutable
/// per-procedure state.
pub trait SymbolicCheck: Send {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Called before an operation is evaluated. The default keeps the state unchanged.
    fn pre_process(&mut self, context: &SymbolicContext<'_>) -> States<ProgramState> {
        States::One(context.state().clone())
    }

    /// Called after an operation was evaluated. The default keeps the state unchanged.
    fn post_process(&mut self, context: &SymbolicContext<'_>) -> States<ProgramState> {
        States::One(context.state().clone())
    }

    /// Called when a branch is taken, with the branch value's constraint already learned.
    /// Returning `None` drops the branch.
    fn condition_evaluated(&mut self, context: &SymbolicContext<'_>) -> Option<ProgramState> {
        Some(context.state().clone())
    }

    /// Called once for every distinct state reaching the exit block.
    fn exit_reached(&mut self, _context: &SymbolicContext<'_>) {}

    /// Called exactly once when exploration ends, however it ends.
    fn execution_completed(&mut self, _outcome: ExecutionOutcome) {}
}

#[derive(Clone, Copy)]
enum Phase {
    Pre,
    Post,
}

/// An ordered list of checks, run as one.
#[derive(Default)]
pub struct SymbolicCheckList {
    checks: Vec<Box<dyn SymbolicCheck>>,
}

impl SymbolicCheckList {
    /// Creates a list running `checks` in order.
    #[must_use]
    pub fn new(checks: Vec<Box<dyn SymbolicCheck>>) -> Self {
        Self { checks }
    }

    /// Appends a check.
    pub fn push(&mut self, check: Box<dyn SymbolicCheck>) {
        self.checks.push(check);
    }

    /// Returns the number of checks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Returns `true` if the list has no checks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Returns the names of all checks, in order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.checks.iter().map(|check| check.name())
    }

    /// Runs [`SymbolicCheck::pre_process`] of every check.
    pub fn pre_process(&mut self, context: &SymbolicContext<'_>) -> States<ProgramState> {
        self.thread(context, Phase::Pre)
    }

    /// Runs [`SymbolicCheck::post_process`] of every check.
    pub fn post_process(&mut self, context: &SymbolicContext<'_>) -> States<ProgramState> {
        self.thread(context, Phase::Post)
    }

    fn thread(&mut self, context: &SymbolicContext<'_>, phase: Phase) -> States<ProgramState> {
        let mut states = States::One(context.state().clone());
        for check in &mut self.checks {
            let mut next = States::Empty;
            for state in states {
                let context = context.with_state(state);
                next = next
                    + match phase {
                        Phase::Pre => check.pre_process(&context),
                        Phase::Post => check.post_process(&context),
                    };
            }
            if next.is_empty() {
                return next;
            }
            states = next;
        }
        states
    }

    /// Runs [`SymbolicCheck::condition_evaluated`] of every check, stopping at the first veto.
    pub fn condition_evaluated(&mut self, context: &SymbolicContext<'_>) -> Option<ProgramState> {
        let mut state = context.state().clone();
        for check in &mut self.checks {
            state = check.condition_evaluated(&context.with_state(state))?;
        }
        Some(state)
    }

    /// Runs [`SymbolicCheck::exit_reached`] of every check.
    pub fn exit_reached(&mut self, context: &SymbolicContext<'_>) {
        for check in &mut self.checks {
            check.exit_reached(context);
        }
    }

    /// Runs [`SymbolicCheck::execution_completed`] of every check.
    pub fn execution_completed(&mut self, outcome: ExecutionOutcome) {
        for check in &mut self.checks {
            check.execution_completed(outcome);
        }
    }
}

impl std::fmt::Debug for SymbolicCheckList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl From<Vec<Box<dyn SymbolicCheck>>> for SymbolicCheckList {
    fn from(checks: Vec<Box<dyn SymbolicCheck>>) -> Self {
        Self::new(checks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{
            cfg::TypeTable,
            symbolic::{Constraint, SymbolicValue},
        },
        test::GraphFactory,
    };

    /// Forks every state into one with `flag` true and one with `flag` false.
    struct Fork(crate::analysis::cfg::SymbolId);

    impl SymbolicCheck for Fork {
        fn name(&self) -> &'static str {
            "fork"
        }

        fn pre_process(&mut self, context: &SymbolicContext<'_>) -> States<ProgramState> {
            let state = context.state();
            States::Two(
                state.set_symbol_value(self.0, Some(SymbolicValue::true_value())),
                state.set_symbol_value(self.0, Some(SymbolicValue::false_value())),
            )
        }
    }

    /// Drops states in which `flag` is false, and vetoes every condition.
    struct DropFalse {
        flag: crate::analysis::cfg::SymbolId,
        seen: usize,
    }

    impl SymbolicCheck for DropFalse {
        fn name(&self) -> &'static str {
            "drop-false"
        }

        fn pre_process(&mut self, context: &SymbolicContext<'_>) -> States<ProgramState> {
            self.seen += 1;
            if context.state().symbol_has_constraint(self.flag, Constraint::FALSE) {
                States::Empty
            } else {
                States::One(context.state().clone())
            }
        }

        fn condition_evaluated(&mut self, _context: &SymbolicContext<'_>) -> Option<ProgramState> {
            None
        }
    }

    #[test]
    fn test_states_thread_through_checks() {
        let mut factory = GraphFactory::new();
        let flag = factory.local("flag");
        let graph = factory.linear_graph(Vec::new());
        let types = TypeTable::with_core_types();
        let context = SymbolicContext::new(&graph, &types, None, ProgramState::empty(), 1, false);

        let mut checks = SymbolicCheckList::new(vec![
            Box::new(Fork(flag)),
            Box::new(DropFalse { flag, seen: 0 }),
        ]);
        let states = checks.pre_process(&context);
        assert_eq!(states.len(), 1);
        assert!(states
            .iter()
            .all(|state| state.symbol_has_constraint(flag, Constraint::TRUE)));

        assert!(checks.condition_evaluated(&context).is_none());
        assert_eq!(checks.post_process(&context).len(), 1);
        assert_eq!(checks.names().collect::<Vec<_>>(), vec!["fork", "drop-false"]);
    }

    #[test]
    fn test_empty_list_is_identity() {
        let graph = GraphFactory::new().linear_graph(Vec::new());
        let types = TypeTable::new();
        let context = SymbolicContext::new(&graph, &types, None, ProgramState::empty(), 1, false);
        let mut checks = SymbolicCheckList::default();

        assert_eq!(checks.pre_process(&context), States::One(ProgramState::empty()));
        assert_eq!(checks.condition_evaluated(&context), Some(ProgramState::empty()));
    }
}
