//! Exploring many procedures in parallel.
//!
//! Procedures are independent: each exploration owns its check list and shares only the
//! read-only graph and semantic model. [`execute_batch`] runs them on the rayon pool and
//! isolates every run, so a panic while exploring one procedure is reported as an error for
//! that procedure while the others complete normally.

use std::panic::{catch_unwind, AssertUnwindSafe};

use log::warn;
use rayon::prelude::*;

use crate::{
    analysis::{
        cfg::{ControlFlowGraph, SemanticModel},
        symbolic::{ExecutionConfig, ExecutionResult, SymbolicCheckList, SymbolicExecution},
    },
    Error, Result,
};

/// Explores every graph of `graphs` with a fresh check list from `make_checks`.
///
/// Results are returned in the order of `graphs`.
///
/// # Errors
///
/// An entry is an error if its graph exceeds the program-point limits, or
/// [`Error::AnalysisPanicked`] if its exploration panicked.
pub fn execute_batch<F>(
    graphs: &[ControlFlowGraph],
    semantic: &dyn SemanticModel,
    config: &ExecutionConfig,
    make_checks: F,
) -> Vec<Result<ExecutionResult>>
where
    F: Fn(&ControlFlowGraph) -> SymbolicCheckList + Sync,
{
    graphs
        .par_iter()
        .map(|graph| {
            let run = || -> Result<ExecutionResult> {
                let mut engine = SymbolicExecution::new(graph, semantic, make_checks(graph), config.clone())?;
                Ok(engine.execute())
            };
            match catch_unwind(AssertUnwindSafe(run)) {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!("Symbolic execution of '{}' panicked: {}", graph.name(), message);
                    Err(Error::AnalysisPanicked {
                        procedure: graph.name().to_string(),
                        message,
                    })
                }
            }
        })
        .collect()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
