//! Reporting issues found by checks.
//!
//! Symbolic execution visits the same operation once per distinct state, so a check that
//! finds a problem at an operation typically finds it several times. [`IssueReporter`]
//! forwards each rule's finding to the [`DiagnosticSink`] at most once per location.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use crate::analysis::cfg::SyntaxLocation;

/// One finding of a rule.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Diagnostic {
    /// Identifier of the rule that raised the issue
    pub rule: &'static str,
    /// Human-readable message
    pub message: String,
    /// Where the issue was found
    pub location: SyntaxLocation,
}

/// Receives diagnostics from checks. Implementations must be shareable across the engines of
/// a batch run.
pub trait DiagnosticSink: Send + Sync {
    /// Records one diagnostic.
    fn report(&self, diagnostic: Diagnostic);
}

/// A [`DiagnosticSink`] that keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the diagnostics collected so far.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        lock!(self.diagnostics).clone()
    }

    /// Removes and returns the diagnostics collected so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *lock!(self.diagnostics))
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        lock!(self.diagnostics).push(diagnostic);
    }
}

/// Forwards a rule's findings to a sink, once per location.
pub struct IssueReporter {
    rule: &'static str,
    sink: Arc<dyn DiagnosticSink>,
    reported: HashSet<SyntaxLocation>,
}

impl IssueReporter {
    /// Creates a reporter for `rule`.
    #[must_use]
    pub fn new(rule: &'static str, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            rule,
            sink,
            reported: HashSet::new(),
        }
    }

    /// Reports an issue at `location`. Returns `false` if this reporter already reported one
    /// there.
    pub fn report(&mut self, location: SyntaxLocation, message: impl Into<String>) -> bool {
        if !self.reported.insert(location) {
            return false;
        }
        self.sink.report(Diagnostic {
            rule: self.rule,
            message: message.into(),
            location,
        });
        true
    }

    /// Returns `true` if an issue was reported at `location`.
    #[must_use]
    pub fn is_reported(&self, location: SyntaxLocation) -> bool {
        self.reported.contains(&location)
    }

    /// Returns the rule identifier.
    #[must_use]
    pub fn rule(&self) -> &'static str {
        self.rule
    }
}

impl std::fmt::Debug for IssueReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueReporter")
            .field("rule", &self.rule)
            .field("reported", &self.reported.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_once_per_location() {
        let sink = Arc::new(CollectingSink::new());
        let mut reporter = IssueReporter::new("S2259", sink.clone());

        assert!(reporter.report(SyntaxLocation::new(10, 14), "'x' is null"));
        assert!(!reporter.report(SyntaxLocation::new(10, 14), "'x' is null"));
        assert!(reporter.report(SyntaxLocation::new(20, 24), "'y' is null"));
        assert!(reporter.is_reported(SyntaxLocation::new(20, 24)));

        let diagnostics = sink.take();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].rule, "S2259");
        assert_eq!(diagnostics[1].message, "'y' is null");
        assert!(sink.diagnostics().is_empty());
    }
}
